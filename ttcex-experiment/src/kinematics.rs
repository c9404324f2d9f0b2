//! Per-object trajectory resolution.
//!
//! Stored trial positions name object centres. With an axis offset set, both
//! ends of the travel are pushed by the object's half extent away from the
//! end point, so the leading face (not the centre) sits on the authored
//! coordinate. Equal shifts at both ends leave the travel distance unchanged.

use crate::error::KinematicsError;
use crate::waypoints::WaypointPath;
use tracing::warn;
use ttcex_core::{ObjectSpec, OffsetFlag, Pose, Quat, Vec3};

/// Step index after which an object is hidden.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HideThreshold {
    Never,
    AtStep(f32),
}

impl HideThreshold {
    pub fn from_time_visible(time_visible: f32, tick_rate: f32) -> Self {
        if time_visible < 0.0 {
            HideThreshold::Never
        } else {
            HideThreshold::AtStep(time_visible * tick_rate)
        }
    }

    /// True on every step strictly past the threshold.
    pub fn passed(&self, step: u32) -> bool {
        match *self {
            HideThreshold::Never => false,
            HideThreshold::AtStep(at) => step as f32 > at,
        }
    }

    pub fn is_never(&self) -> bool {
        matches!(self, HideThreshold::Never)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct KinematicsContext {
    pub tick_rate: f32,
    pub camera_lock: bool,
    pub apply_offsets: bool,
    /// Head pose at trial start; only used with camera lock.
    pub frame: Pose,
}

impl KinematicsContext {
    pub fn world(tick_rate: f32) -> Self {
        Self {
            tick_rate,
            camera_lock: false,
            apply_offsets: true,
            frame: Pose::default(),
        }
    }

    /// Head-relative point to world space. Only the head's yaw is applied, so
    /// authored distances and heights are kept.
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        if !self.camera_lock {
            return local;
        }
        let yaw = Quat::from_rotation_y(self.frame.euler.y.to_radians());
        self.frame.position + yaw * local
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Motion {
    Linear {
        rotation_per_tick: Vec3,
    },
    Custom {
        path: WaypointPath,
        frames_per_segment: f32,
    },
}

/// Everything the lifecycle needs to move one object.
#[derive(Debug, Clone, PartialEq)]
pub struct Kinematics {
    pub start: Vec3,
    pub end: Vec3,
    pub distance: f32,
    pub velocity: f32,
    /// Distance covered per tick.
    pub step: f32,
    pub final_step: f32,
    pub hide: HideThreshold,
    pub motion: Motion,
}

/// Shifts `start` and `end` along each flagged axis by the signed half extent.
pub fn apply_offsets(
    start: Vec3,
    end: Vec3,
    offsets: [OffsetFlag; 3],
    bounds: [f32; 3],
) -> (Vec3, Vec3) {
    if bounds.iter().any(|b| !b.is_finite()) {
        warn!(?bounds, "bounding size is not finite; skipping offsets");
        return (start, end);
    }
    let mut start = start.to_array();
    let mut end = end.to_array();
    for axis in 0..3 {
        let raw = offsets[axis].factor();
        if raw == 0.0 {
            continue;
        }
        if start[axis] == end[axis] {
            continue;
        }
        let factor = if (-1.0..=1.0).contains(&raw) {
            raw
        } else {
            warn!(axis, factor = raw, "offset factor outside [-1, 1]; clamping");
            raw.clamp(-1.0, 1.0)
        };
        let direction = (start[axis] - end[axis]).signum();
        let offset = bounds[axis] / 2.0 * factor;
        start[axis] += direction * offset;
        end[axis] += direction * offset;
    }
    (Vec3::from_array(start), Vec3::from_array(end))
}

impl Kinematics {
    /// Resolves one object's trajectory.
    ///
    /// `waypoints` must be `Some` for custom-motion objects.
    pub fn resolve(
        spec: &ObjectSpec,
        bounds: [f32; 3],
        waypoints: Option<&WaypointPath>,
        ctx: &KinematicsContext,
    ) -> Result<Self, KinematicsError> {
        let tick_rate = ctx.tick_rate;
        if !(tick_rate.is_finite() && tick_rate > 0.0) {
            return Err(KinematicsError::NonPositiveTickRate(tick_rate));
        }

        let (start, end) = if ctx.apply_offsets {
            apply_offsets(spec.start_pos, spec.end_pos, spec.offsets(), bounds)
        } else {
            (spec.start_pos, spec.end_pos)
        };
        let start = ctx.to_world(start);
        let end = ctx.to_world(end);
        if !(start.is_finite() && end.is_finite()) {
            return Err(KinematicsError::NonFinitePosition);
        }
        let distance = start.distance(end);

        let (final_step, step, motion) = match (&spec.custom_motion, waypoints) {
            (Some(custom), Some(path)) => {
                if !(custom.duration.is_finite() && custom.duration > 0.0) {
                    return Err(KinematicsError::NonPositiveDuration(custom.duration));
                }
                let final_step = custom.duration * tick_rate;
                let path = path.map_positions(|p| ctx.to_world(p));
                let frames_per_segment = final_step / path.segments() as f32;
                let step = if spec.velocity > 0.0 {
                    spec.velocity / tick_rate
                } else {
                    distance / final_step
                };
                (
                    final_step,
                    step,
                    Motion::Custom {
                        path,
                        frames_per_segment,
                    },
                )
            }
            _ => {
                let velocity = spec.velocity;
                if !(velocity.is_finite() && velocity > 0.0) {
                    return Err(KinematicsError::NonPositiveVelocity(velocity));
                }
                if distance <= f32::EPSILON {
                    return Err(KinematicsError::ZeroDistance);
                }
                (
                    (distance / velocity) * tick_rate,
                    velocity / tick_rate,
                    Motion::Linear {
                        rotation_per_tick: spec.rotation_speed.per_tick(),
                    },
                )
            }
        };

        let hide = match HideThreshold::from_time_visible(spec.time_visible, tick_rate) {
            HideThreshold::AtStep(at) if at > final_step => {
                warn!(
                    obj_type = %spec.obj_type,
                    hide_step = at,
                    final_step,
                    "object would hide after reaching its end; hiding at the end instead"
                );
                HideThreshold::AtStep(final_step)
            }
            other => other,
        };

        Ok(Self {
            start,
            end,
            distance,
            velocity: spec.velocity,
            step,
            final_step,
            hide,
            motion,
        })
    }

    pub fn is_custom(&self) -> bool {
        matches!(self.motion, Motion::Custom { .. })
    }
}
