pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod kinematics;
pub mod lifecycle;
pub mod recorder;
pub mod response;
pub mod runtime;
pub mod waypoints;

pub use catalog::TrialCatalog;
pub use config::ExperimentConfig;
pub use coordinator::{InitOutcome, ShutdownReport, TrialCoordinator};
pub use engine::Engine;
pub use error::{
    CatalogError, ConfigError, ExperimentError, KinematicsError, RecorderError, WaypointError,
};
pub use kinematics::{HideThreshold, Kinematics, KinematicsContext};
pub use lifecycle::{ObjectRuntimeState, StepOutcome};
pub use recorder::{JsonResultRecorder, MemoryRecorder, ResultRecorder, RunMetadata, RunStatus};
pub use response::{
    ControlSurface, ControllerInput, GateAction, ResponseGate, ResponseSide, TrialTiming,
};
pub use runtime::{TrialEnding, TrialRuntimeState};
pub use waypoints::{Waypoint, WaypointPath};
