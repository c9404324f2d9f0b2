use crate::error::WaypointError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use ttcex_core::{Pose, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
}

#[derive(Debug, Deserialize)]
struct WaypointFile {
    waypoints: Vec<Waypoint>,
}

/// Ordered custom-motion trajectory, at least two waypoints long.
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointPath {
    waypoints: Vec<Waypoint>,
}

impl WaypointPath {
    pub fn load(path: &Path) -> Result<Self, WaypointError> {
        let text = fs::read_to_string(path).map_err(|source| WaypointError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: WaypointFile =
            serde_json::from_str(&text).map_err(|source| WaypointError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::new(file.waypoints, path)
    }

    pub fn new(waypoints: Vec<Waypoint>, origin: &Path) -> Result<Self, WaypointError> {
        if waypoints.len() < 2 {
            return Err(WaypointError::TooFewWaypoints {
                path: origin.to_path_buf(),
                count: waypoints.len(),
            });
        }
        if let Some(index) = waypoints
            .iter()
            .position(|w| !(w.position.is_finite() && w.rotation.is_finite()))
        {
            return Err(WaypointError::NonFinite {
                path: origin.to_path_buf(),
                index,
            });
        }
        Ok(Self { waypoints })
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn segments(&self) -> usize {
        self.waypoints.len() - 1
    }

    pub fn first(&self) -> &Waypoint {
        &self.waypoints[0]
    }

    pub fn last(&self) -> &Waypoint {
        &self.waypoints[self.waypoints.len() - 1]
    }

    /// Same path with every position mapped through `f`.
    pub fn map_positions(&self, f: impl Fn(Vec3) -> Vec3) -> Self {
        Self {
            waypoints: self
                .waypoints
                .iter()
                .map(|w| Waypoint {
                    position: f(w.position),
                    rotation: w.rotation,
                })
                .collect(),
        }
    }

    /// Pose after `step` ticks when `frames_per_segment` ticks cover one segment.
    ///
    /// Past the end the object rests on the last waypoint.
    pub fn sample(&self, step: f32, frames_per_segment: f32) -> Pose {
        let last_segment = self.segments() - 1;
        let progress = (step / frames_per_segment).max(0.0);
        let index = (progress.floor() as usize).min(last_segment);
        let t = (progress - index as f32).clamp(0.0, 1.0);
        let a = &self.waypoints[index];
        let b = &self.waypoints[index + 1];
        Pose::new(
            a.position.lerp(b.position, t),
            a.rotation.lerp(b.rotation, t),
        )
    }
}
