//! Turns raw controller input into trial starts and final responses.

use crate::coordinator::InitOutcome;
use crate::error::ExperimentError;
use crate::feedback::CONFIDENCE_PROMPT;
use tracing::{debug, info};

pub const TRIGGER_THRESHOLD: f32 = 0.3;
pub const TOUCHPAD_THRESHOLD: f32 = 0.5;

/// Start time and longest visible duration of the running trial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialTiming {
    pub started_at: u64,
    pub max_time_visible: Option<f32>,
}

/// What the gate is allowed to do to the coordinator.
pub trait ControlSurface {
    fn initialize_trial(&mut self) -> Result<InitOutcome, ExperimentError>;
    /// Returns `false` if there was no trial to complete.
    fn complete_trial(
        &mut self,
        end: u64,
        responded: bool,
        response: Option<String>,
        confidence: Option<String>,
    ) -> bool;
    fn check_trial_running(&self) -> bool;
    fn hide_all_objects(&mut self);
    fn show_prompt(&mut self, text: &str);
    fn clear_prompt(&mut self);
    fn trial_timing(&self) -> Option<TrialTiming>;
}

/// One poll of the hand controller.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControllerInput {
    pub timestamp: u64,
    /// Analog trigger, 0..1.
    pub trigger: f32,
    pub touchpad_pressed: bool,
    /// Horizontal touchpad position, -1..1.
    pub touchpad_x: f32,
    /// Number key pressed this poll, if any.
    pub digit: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSide {
    Left,
    Right,
}

impl ResponseSide {
    pub fn from_touchpad(x: f32) -> Option<Self> {
        if x < -TOUCHPAD_THRESHOLD {
            Some(ResponseSide::Left)
        } else if x > TOUCHPAD_THRESHOLD {
            Some(ResponseSide::Right)
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResponseSide::Left => "Left",
            ResponseSide::Right => "Right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateAction {
    None,
    TrialStarted,
    ExperimentComplete,
    AwaitingConfidence,
    Completed,
    TimedOut,
}

#[derive(Debug, Clone, Copy)]
struct PendingConfidence {
    side: ResponseSide,
    at: u64,
}

#[derive(Debug, Clone)]
pub struct ResponseGate {
    collect_confidence: bool,
    timeout_factor: Option<f32>,
    /// A held trigger starts one trial; it must be released to start another.
    armed: bool,
    pending: Option<PendingConfidence>,
}

impl ResponseGate {
    pub fn new(collect_confidence: bool, timeout_factor: Option<f32>) -> Self {
        Self {
            collect_confidence,
            timeout_factor,
            armed: true,
            pending: None,
        }
    }

    pub fn is_awaiting_confidence(&self) -> bool {
        self.pending.is_some()
    }

    pub fn handle<S: ControlSurface>(
        &mut self,
        input: &ControllerInput,
        surface: &mut S,
    ) -> Result<GateAction, ExperimentError> {
        let pressed = input.trigger > TRIGGER_THRESHOLD;

        if let Some(pending) = self.pending {
            if !surface.check_trial_running() {
                self.pending = None;
            } else {
                self.armed = !pressed;
                return Ok(self.take_confidence(input, pending, surface));
            }
        }

        if !surface.check_trial_running() {
            if !pressed {
                self.armed = true;
                return Ok(GateAction::None);
            }
            if !self.armed {
                return Ok(GateAction::None);
            }
            self.armed = false;
            return Ok(match surface.initialize_trial()? {
                InitOutcome::Started { .. } => GateAction::TrialStarted,
                InitOutcome::ExperimentComplete => GateAction::ExperimentComplete,
                InitOutcome::AlreadyComplete | InitOutcome::AlreadyRunning => GateAction::None,
            });
        }

        self.armed = !pressed;

        if input.touchpad_pressed {
            if let Some(side) = ResponseSide::from_touchpad(input.touchpad_x) {
                return Ok(self.respond(side, input.timestamp, surface));
            }
        }

        if self.timed_out(input.timestamp, surface) {
            info!("no response before the timeout");
            surface.complete_trial(input.timestamp, false, None, None);
            return Ok(GateAction::TimedOut);
        }
        Ok(GateAction::None)
    }

    fn respond<S: ControlSurface>(&mut self, side: ResponseSide, at: u64, surface: &mut S) -> GateAction {
        debug!(side = side.label(), "response received");
        if self.collect_confidence {
            surface.hide_all_objects();
            surface.show_prompt(CONFIDENCE_PROMPT);
            self.pending = Some(PendingConfidence { side, at });
            return GateAction::AwaitingConfidence;
        }
        surface.complete_trial(at, true, Some(side.label().to_string()), None);
        GateAction::Completed
    }

    fn take_confidence<S: ControlSurface>(
        &mut self,
        input: &ControllerInput,
        pending: PendingConfidence,
        surface: &mut S,
    ) -> GateAction {
        let Some(digit) = input.digit.filter(|d| *d <= 9) else {
            return GateAction::None;
        };
        self.pending = None;
        surface.clear_prompt();
        surface.complete_trial(
            pending.at,
            true,
            Some(pending.side.label().to_string()),
            Some(digit.to_string()),
        );
        GateAction::Completed
    }

    fn timed_out<S: ControlSurface>(&self, now: u64, surface: &S) -> bool {
        let (Some(factor), Some(timing)) = (self.timeout_factor, surface.trial_timing()) else {
            return false;
        };
        let Some(visible) = timing.max_time_visible else {
            return false;
        };
        let limit_ns = (f64::from(factor) * f64::from(visible.max(0.0)) * 1e9) as u64;
        now.saturating_sub(timing.started_at) >= limit_ns
    }
}
