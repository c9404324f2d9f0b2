use crate::error::KinematicsError;
use crate::kinematics::{Kinematics, Motion};
use tracing::warn;
use ttcex_core::{ObjectKey, ObjectPhase, Pose, Vec3};

/// What one tick did to an object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StepOutcome {
    pub moved: bool,
    pub hidden: bool,
    pub deactivated: bool,
    pub pose: Pose,
    pub fault: Option<KinematicsError>,
}

/// Mutable per-trial state of one moving object.
///
/// The step counter is advanced at the top of every tick, so after tick `n`
/// it reads `n`.
#[derive(Debug, Clone)]
pub struct ObjectRuntimeState {
    pub key: ObjectKey,
    pub kinematics: Kinematics,
    phase: ObjectPhase,
    visible: bool,
    step_counter: u32,
    pose: Pose,
    hidden_at_step: Option<u32>,
    hidden_at_ns: Option<u64>,
    deactivated_at_step: Option<u32>,
}

impl ObjectRuntimeState {
    pub fn new(key: ObjectKey, kinematics: Kinematics, rotation: Vec3) -> Self {
        let pose = match &kinematics.motion {
            Motion::Linear { .. } => Pose::new(kinematics.start, rotation),
            Motion::Custom { path, .. } => Pose::new(kinematics.start, path.first().rotation),
        };
        Self {
            key,
            kinematics,
            phase: ObjectPhase::Pending,
            visible: true,
            step_counter: 0,
            pose,
            hidden_at_step: None,
            hidden_at_ns: None,
            deactivated_at_step: None,
        }
    }

    /// Pending → ActiveVisible. Returns false if the object was already started.
    pub fn activate(&mut self) -> bool {
        if self.phase != ObjectPhase::Pending {
            return false;
        }
        self.phase = ObjectPhase::ActiveVisible;
        true
    }

    pub fn phase(&self) -> ObjectPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase.is_active()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn step_counter(&self) -> u32 {
        self.step_counter
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn frac_traveled(&self) -> f32 {
        self.step_counter as f32 / self.kinematics.final_step
    }

    pub fn hidden_at_step(&self) -> Option<u32> {
        self.hidden_at_step
    }

    pub fn hidden_at_ns(&self) -> Option<u64> {
        self.hidden_at_ns
    }

    pub fn deactivated_at_step(&self) -> Option<u32> {
        self.deactivated_at_step
    }

    pub fn note_hidden_at(&mut self, ns: u64) {
        if self.hidden_at_ns.is_none() {
            self.hidden_at_ns = Some(ns);
        }
    }

    /// Hides a visible object whatever its phase. True only on the first hide.
    pub fn force_hide(&mut self) -> bool {
        if !self.visible {
            return false;
        }
        self.visible = false;
        self.hidden_at_step = Some(self.step_counter);
        if let Some(next) = self.phase.hidden() {
            self.phase = next;
        }
        true
    }

    fn deactivate(&mut self) {
        self.phase = ObjectPhase::Inactive;
        self.deactivated_at_step = Some(self.step_counter);
    }

    fn advance_pose(&self) -> Pose {
        match &self.kinematics.motion {
            Motion::Linear { rotation_per_tick } => {
                let t = self.frac_traveled().min(1.0);
                Pose::new(
                    self.kinematics.start.lerp(self.kinematics.end, t),
                    self.pose.euler + *rotation_per_tick,
                )
            }
            Motion::Custom {
                path,
                frames_per_segment,
            } => path.sample(self.step_counter as f32, *frames_per_segment),
        }
    }

    /// Runs one tick. Does nothing unless the object is active.
    pub fn step(&mut self) -> StepOutcome {
        let mut out = StepOutcome {
            pose: self.pose,
            ..StepOutcome::default()
        };
        if !self.phase.is_active() {
            return out;
        }

        self.step_counter += 1;

        if self.phase == ObjectPhase::ActiveVisible
            && self.kinematics.hide.passed(self.step_counter)
        {
            out.hidden = self.force_hide();
        }

        let pose = self.advance_pose();
        if !pose.is_finite() {
            warn!(
                trial = self.key.trial_index,
                object = self.key.object_index,
                step = self.step_counter,
                "object pose became non-finite; retiring it"
            );
            out.hidden |= self.force_hide();
            self.deactivate();
            out.deactivated = true;
            out.fault = Some(KinematicsError::NonFinitePosition);
            return out;
        }
        self.pose = pose;
        out.pose = pose;
        out.moved = true;

        if self.frac_traveled() >= 1.0 {
            if self.phase == ObjectPhase::ActiveVisible && !self.kinematics.hide.is_never() {
                out.hidden |= self.force_hide();
            }
            self.deactivate();
            out.deactivated = true;
        }
        out
    }
}
