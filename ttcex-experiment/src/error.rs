use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum WaypointError {
    #[error("cannot read waypoint file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed waypoint file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("waypoint file {path} has {count} waypoints, at least 2 are needed")]
    TooFewWaypoints { path: PathBuf, count: usize },
    #[error("waypoint {index} in {path} is not finite")]
    NonFinite { path: PathBuf, index: usize },
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read trial file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed trial file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("trial {trial} object {object}: unknown object type `{obj_type}`")]
    UnknownObjectType {
        trial: u32,
        object: usize,
        obj_type: String,
    },
    #[error("trial {trial} object {object}: {reason}")]
    InvalidObject {
        trial: u32,
        object: usize,
        reason: String,
    },
    #[error("trial {trial} object {object}: {source}")]
    Waypoints {
        trial: u32,
        object: usize,
        #[source]
        source: WaypointError,
    },
}

/// Per-object problems that skip the object but keep the trial running.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KinematicsError {
    #[error("velocity {0} is not a positive finite number")]
    NonPositiveVelocity(f32),
    #[error("start and end positions coincide")]
    ZeroDistance,
    #[error("custom motion duration {0} is not a positive finite number")]
    NonPositiveDuration(f32),
    #[error("tick rate {0} is not a positive finite number")]
    NonPositiveTickRate(f32),
    #[error("resolved positions are not finite")]
    NonFinitePosition,
}

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("cannot write results to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot serialize results: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Recorder(#[from] RecorderError),
    #[error("object type `{0}` is not registered")]
    UnknownObjectType(String),
}
