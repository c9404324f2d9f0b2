//! Participant-facing feedback text.

use ttcex_core::TrialRecord;

pub const COMPLETED_MSG: &str = "Experiment complete";
pub const CONFIDENCE_PROMPT: &str = "How confident?";

/// Two decimals, halves rounded away from zero.
fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Compares the participant's TTC estimate with the theoretical one.
pub fn timing_feedback(estimate: f64, actual: f64) -> String {
    let diff = round2(estimate - actual);
    if diff == 0.0 {
        "Perfect timing".to_string()
    } else if diff < 0.0 {
        format!("{:.2} seconds too fast", -diff)
    } else {
        format!("{:.2} seconds too slow", diff)
    }
}

pub fn choice_feedback(correct: bool) -> &'static str {
    if correct { "Correct" } else { "Incorrect" }
}

/// Feedback for a finished trial, if there is anything to say.
pub fn feedback_for(record: &TrialRecord) -> Option<String> {
    if let Some(correct) = record.correct {
        return Some(choice_feedback(correct).to_string());
    }
    if !record.received_response {
        return None;
    }
    record
        .primary_ttc()
        .map(|(estimate, actual)| timing_feedback(estimate, actual))
}
