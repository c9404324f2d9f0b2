use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use ttcex_cache::PrefabRegistry;
use ttcex_core::{FeedbackColor, Vec3};

/// Experiment-wide settings read from `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExperimentConfig {
    pub subj_num: u32,
    pub subj_sex: u32,
    /// Trial definition file; relative paths resolve against the config file.
    pub data_file: PathBuf,
    pub init_camera_pos: Vec3,
    /// Trial coordinates are head-relative and follow the head pose at trial start.
    #[serde(alias = "targetCamera")]
    pub camera_lock: bool,
    pub track_head_pos: bool,
    /// Global switch for the per-axis leading-face offsets.
    pub offset_obj: bool,
    pub show_feedback: bool,
    pub canvas_pos: Vec3,
    pub feedback_size: u32,
    pub feedback_color: FeedbackColor,
    pub collect_confidence: bool,
    pub debugging: bool,
    pub tick_rate: f32,
    pub pose_sample_every: u32,
    /// Unanswered trials end after this many times their longest time-visible.
    pub response_timeout_factor: Option<f32>,
    pub results_dir: PathBuf,
    /// Extra object types with their unit bounding sizes.
    pub prefabs: BTreeMap<String, [f32; 3]>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            subj_num: 0,
            subj_sex: 0,
            data_file: PathBuf::from("trials.json"),
            init_camera_pos: Vec3::new(0.0, 1.6, 0.0),
            camera_lock: false,
            track_head_pos: false,
            offset_obj: true,
            show_feedback: false,
            canvas_pos: Vec3::new(0.0, 6.0, 100.0),
            feedback_size: 24,
            feedback_color: FeedbackColor::Black,
            collect_confidence: false,
            debugging: false,
            tick_rate: 90.0,
            pose_sample_every: 1,
            response_timeout_factor: None,
            results_dir: PathBuf::from("Results"),
            prefabs: BTreeMap::new(),
        }
    }
}

impl ExperimentConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        if let Some(dir) = path.parent() {
            config.resolve_relative_to(dir);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tick_rate.is_finite() && self.tick_rate > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "tickRate must be positive, got {}",
                self.tick_rate
            )));
        }
        if let Some(f) = self.response_timeout_factor {
            if !(f.is_finite() && f > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "responseTimeoutFactor must be positive, got {f}"
                )));
            }
        }
        for (name, extents) in &self.prefabs {
            if extents.iter().any(|e| !e.is_finite() || *e < 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "prefab `{name}` has invalid extents {extents:?}"
                )));
            }
        }
        Ok(())
    }

    fn resolve_relative_to(&mut self, dir: &Path) {
        if self.data_file.is_relative() {
            self.data_file = dir.join(&self.data_file);
        }
        if self.results_dir.is_relative() {
            self.results_dir = dir.join(&self.results_dir);
        }
    }

    /// Built-in primitives plus the prefabs declared here.
    pub fn prefab_registry(&self) -> PrefabRegistry {
        let mut registry = PrefabRegistry::with_builtins();
        for (name, extents) in &self.prefabs {
            registry.register(name, *extents);
        }
        registry
    }

    pub fn tick_interval_secs(&self) -> f64 {
        1.0 / f64::from(self.tick_rate)
    }
}
