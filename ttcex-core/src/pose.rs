use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position plus Euler orientation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub euler: Vec3,
}

impl Pose {
    pub fn new(position: Vec3, euler: Vec3) -> Self {
        Self { position, euler }
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_euler(
            EulerRot::YXZ,
            self.euler.y.to_radians(),
            self.euler.x.to_radians(),
            self.euler.z.to_radians(),
        )
    }

    /// Maps a point given relative to this pose into the parent space.
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation() * local
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.euler.is_finite()
    }
}

/// Head (and controller, when tracked) pose at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoseSample {
    /// Seconds since experiment start.
    pub timestamp: f64,
    pub head: Pose,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<Pose>,
}
