use crate::error::CatalogError;
use crate::waypoints::WaypointPath;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use ttcex_cache::PrefabRegistry;
use ttcex_core::{ObjectSpec, TrialSpec, Vec3};

#[derive(Debug, Deserialize)]
struct TrialFile {
    trials: Vec<TrialSpec>,
}

/// Validated trial list, plus every waypoint file the trials refer to.
///
/// Immutable after load. Everything that can be checked before the first trial
/// is checked here, so a bad file fails the run up front.
#[derive(Debug, Clone)]
pub struct TrialCatalog {
    source: Option<PathBuf>,
    trials: Vec<TrialSpec>,
    waypoints: HashMap<PathBuf, WaypointPath>,
}

fn invalid(trial: u32, object: usize, reason: impl Into<String>) -> CatalogError {
    CatalogError::InvalidObject {
        trial,
        object,
        reason: reason.into(),
    }
}

impl TrialCatalog {
    pub fn load(path: impl AsRef<Path>, prefabs: &PrefabRegistry) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: TrialFile = serde_json::from_str(&text).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut catalog = Self::from_trials(file.trials, base_dir, prefabs)?;
        catalog.source = Some(path.to_path_buf());
        info!(
            trials = catalog.len(),
            waypoint_files = catalog.waypoints.len(),
            path = %path.display(),
            "trial catalog loaded"
        );
        Ok(catalog)
    }

    /// Validates already-parsed trials. Waypoint paths resolve against `base_dir`.
    pub fn from_trials(
        mut trials: Vec<TrialSpec>,
        base_dir: &Path,
        prefabs: &PrefabRegistry,
    ) -> Result<Self, CatalogError> {
        let mut waypoints = HashMap::new();
        let mut seen = HashSet::new();

        for trial in trials.iter_mut() {
            if !seen.insert(trial.trial_num) {
                warn!(trial = trial.trial_num, "duplicate trial number");
            }
            let trial_num = trial.trial_num;
            for (idx, obj) in trial.objects.iter_mut().enumerate() {
                Self::validate_object(trial_num, idx, obj, prefabs)?;

                let Some(custom) = obj.custom_motion.as_mut() else {
                    continue;
                };
                if !(custom.duration.is_finite() && custom.duration > 0.0) {
                    return Err(invalid(
                        trial_num,
                        idx,
                        format!("custom motion duration {} is not positive", custom.duration),
                    ));
                }
                let resolved = base_dir.join(&custom.file);
                custom.file = resolved.clone();
                if !waypoints.contains_key(&resolved) {
                    let path = WaypointPath::load(&resolved).map_err(|source| {
                        CatalogError::Waypoints {
                            trial: trial_num,
                            object: idx,
                            source,
                        }
                    })?;
                    waypoints.insert(resolved.clone(), path);
                }
                if let Some(path) = waypoints.get(&resolved) {
                    warn_on_endpoint_mismatch(trial_num, idx, obj.start_pos, obj.end_pos, path);
                }
            }
        }

        if trials.is_empty() {
            warn!("trial catalog is empty");
        }

        Ok(Self {
            source: None,
            trials,
            waypoints,
        })
    }

    fn validate_object(
        trial: u32,
        idx: usize,
        obj: &ObjectSpec,
        prefabs: &PrefabRegistry,
    ) -> Result<(), CatalogError> {
        if prefabs.resolve(&obj.obj_type).is_none() {
            return Err(CatalogError::UnknownObjectType {
                trial,
                object: idx,
                obj_type: obj.obj_type.clone(),
            });
        }
        let vectors = [
            ("objScale", obj.obj_scale),
            ("objRot", obj.obj_rot),
            ("startPos", obj.start_pos),
            ("endPos", obj.end_pos),
            ("rotationSpeed", obj.rotation_speed.per_tick()),
        ];
        if let Some((name, _)) = vectors.iter().find(|(_, v)| !v.is_finite()) {
            return Err(invalid(trial, idx, format!("{name} is not finite")));
        }
        if !obj.time_visible.is_finite() {
            return Err(invalid(trial, idx, "timeVisible is not finite"));
        }
        if obj.custom_motion.is_none() && !(obj.velocity.is_finite() && obj.velocity > 0.0) {
            warn!(
                trial,
                object = idx,
                velocity = obj.velocity,
                "object cannot move and will be skipped"
            );
        }
        Ok(())
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn trial(&self, index: usize) -> Option<&TrialSpec> {
        self.trials.get(index)
    }

    pub fn trials(&self) -> &[TrialSpec] {
        &self.trials
    }

    /// Loaded waypoints for a custom-motion object.
    pub fn waypoints_for(&self, obj: &ObjectSpec) -> Option<&WaypointPath> {
        obj.custom_motion
            .as_ref()
            .and_then(|c| self.waypoints.get(&c.file))
    }
}

fn warn_on_endpoint_mismatch(trial: u32, idx: usize, start: Vec3, end: Vec3, path: &WaypointPath) {
    const TOLERANCE: f32 = 1e-3;
    let first = path.first().position;
    let last = path.last().position;
    if first.distance(start) > TOLERANCE || last.distance(end) > TOLERANCE {
        warn!(
            trial,
            object = idx,
            ?start,
            ?first,
            ?end,
            ?last,
            "startPos/endPos do not match the first/last waypoint"
        );
    }
}
