use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Identifies one object of one trial in engine calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub trial_index: usize,
    pub object_index: usize,
}

/// Rotation applied every tick, in degrees.
///
/// Older trial files carry a single number meaning forward rotation about X.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RotationSpeed {
    PerAxis(Vec3),
    Scalar(f32),
}

impl Default for RotationSpeed {
    fn default() -> Self {
        RotationSpeed::PerAxis(Vec3::ZERO)
    }
}

impl RotationSpeed {
    pub fn per_tick(&self) -> Vec3 {
        match *self {
            RotationSpeed::PerAxis(v) => v,
            RotationSpeed::Scalar(s) => Vec3::new(s, 0.0, 0.0),
        }
    }
}

/// Whether the half extent along one axis is added to the stored positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OffsetFlag {
    Flag(bool),
    Magnitude(f32),
}

impl Default for OffsetFlag {
    fn default() -> Self {
        OffsetFlag::Flag(false)
    }
}

impl OffsetFlag {
    /// Raw multiplier of the half extent; not clamped.
    pub fn factor(&self) -> f32 {
        match *self {
            OffsetFlag::Flag(true) => 1.0,
            OffsetFlag::Flag(false) => 0.0,
            OffsetFlag::Magnitude(m) => m,
        }
    }

    pub fn is_set(&self) -> bool {
        self.factor() != 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomMotionRef {
    pub file: PathBuf,
    /// Seconds spent travelling the whole waypoint list.
    pub duration: f32,
}

/// One moving object as declared in the trial file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSpec {
    #[serde(default)]
    pub obj_num: u32,
    pub obj_type: String,
    #[serde(default = "ObjectSpec::default_scale")]
    pub obj_scale: Vec3,
    #[serde(default)]
    pub obj_rot: Vec3,
    pub start_pos: Vec3,
    pub end_pos: Vec3,
    #[serde(default)]
    pub velocity: f32,
    /// Negative means the object is never hidden.
    pub time_visible: f32,
    #[serde(default)]
    pub rotation_speed: RotationSpeed,
    #[serde(default)]
    pub offset_x: OffsetFlag,
    #[serde(default)]
    pub offset_y: OffsetFlag,
    #[serde(default)]
    pub offset_z: OffsetFlag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_motion: Option<CustomMotionRef>,
}

impl ObjectSpec {
    fn default_scale() -> Vec3 {
        Vec3::ONE
    }

    pub fn offsets(&self) -> [OffsetFlag; 3] {
        [self.offset_x, self.offset_y, self.offset_z]
    }

    pub fn never_hides(&self) -> bool {
        self.time_visible < 0.0
    }

    pub fn declared_distance(&self) -> f32 {
        self.start_pos.distance(self.end_pos)
    }
}
