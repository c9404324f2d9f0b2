use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ttcex_experiment::{ControllerInput, TrialTiming};

const RATING_DELAY_NS: u64 = 400_000_000;

/// Scripted stand-in for a participant holding the controller.
///
/// Starts each trial after an inter-trial pause, responds some time after the
/// objects disappear and, when asked, rates confidence.
pub struct SimulatedParticipant {
    rng: StdRng,
    iti_ns: u64,
    press_at: Option<u64>,
    respond_at: Option<u64>,
    rate_at: Option<u64>,
}

impl SimulatedParticipant {
    pub fn new(seed: u64, iti_ms: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            iti_ns: iti_ms * 1_000_000,
            press_at: None,
            respond_at: None,
            rate_at: None,
        }
    }

    /// Estimated contact time after the objects vanish, in nanoseconds.
    fn reaction_delay(&mut self, max_time_visible: Option<f32>) -> u64 {
        let visible = f64::from(max_time_visible.unwrap_or(1.0).max(0.0));
        let guess: f64 = self.rng.random_range(0.5..2.5);
        ((visible + guess) * 1e9) as u64
    }

    pub fn poll(
        &mut self,
        now: u64,
        trial: Option<TrialTiming>,
        awaiting_confidence: bool,
    ) -> ControllerInput {
        let mut input = ControllerInput {
            timestamp: now,
            ..ControllerInput::default()
        };

        if awaiting_confidence {
            let at = *self.rate_at.get_or_insert(now + RATING_DELAY_NS);
            if now >= at {
                input.digit = Some(self.rng.random_range(0..=9));
                self.rate_at = None;
            }
            return input;
        }

        match trial {
            None => {
                self.respond_at = None;
                let at = *self.press_at.get_or_insert(now + self.iti_ns);
                if now >= at {
                    input.trigger = 1.0;
                    self.press_at = None;
                }
            }
            Some(timing) => {
                self.press_at = None;
                let at = match self.respond_at {
                    Some(at) => at,
                    None => {
                        let at = timing.started_at + self.reaction_delay(timing.max_time_visible);
                        self.respond_at = Some(at);
                        at
                    }
                };
                if now >= at {
                    input.touchpad_pressed = true;
                    input.touchpad_x = if self.rng.random_bool(0.5) { -0.8 } else { 0.8 };
                    self.respond_at = None;
                }
            }
        }
        input
    }
}
