use crate::object::ObjectSpec;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// One row of the experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialSpec {
    pub trial_num: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    pub objects: Vec<ObjectSpec>,
}

impl TrialSpec {
    /// Longest time-visible among objects that hide at all.
    pub fn max_time_visible(&self) -> Option<f32> {
        self.objects
            .iter()
            .filter(|o| !o.never_hides())
            .map(|o| o.time_visible)
            .fold(None, |acc, t| Some(acc.map_or(t, |a: f32| a.max(t))))
    }

    pub fn label(&self) -> String {
        if self.name.is_empty() {
            format!("trial {}", self.trial_num)
        } else {
            format!("trial {} ({})", self.trial_num, self.name)
        }
    }
}

/// Recorded outcome for one object of a completed trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRecord {
    pub obj_num: u32,
    pub obj_type: String,
    pub obj_scale: Vec3,
    pub obj_rot: Vec3,
    pub declared_start: Vec3,
    pub declared_end: Vec3,
    pub actual_start: Vec3,
    pub actual_end: Vec3,
    pub distance: f32,
    pub velocity: f32,
    pub time_visible: f32,
    pub rotation_speed: Vec3,
    /// Seconds since experiment start; `None` if the object never hid.
    pub hidden_at: Option<f64>,
    pub ttc_estimate: Option<f64>,
    pub ttc_theoretical: Option<f64>,
    /// Set when kinematics could not be resolved and the object was not run.
    #[serde(default)]
    pub skipped: bool,
}

impl ObjectRecord {
    /// Participant's TTC estimate: response time minus time visible.
    pub fn ttc_estimate(response_time: f64, time_visible: f32) -> Option<f64> {
        (time_visible >= 0.0).then(|| response_time - time_visible as f64)
    }

    /// Time remaining to contact at the moment the object disappeared.
    pub fn ttc_theoretical(distance: f32, velocity: f32, time_visible: f32) -> Option<f64> {
        if time_visible < 0.0 || !(velocity.is_finite() && velocity > 0.0) {
            return None;
        }
        let (d, v, t) = (distance as f64, velocity as f64, time_visible as f64);
        Some((d - t * v) / v)
    }
}

/// Recorded result per trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialRecord {
    pub trial_num: u32,
    pub name: String,
    pub correct_answer: Option<String>,
    pub trial_start: f64,
    pub trial_end: f64,
    pub received_response: bool,
    pub response_time: f64,
    pub response: Option<String>,
    pub confidence: Option<String>,
    pub correct: Option<bool>,
    /// The run ended before this trial was answered.
    #[serde(default)]
    pub partial: bool,
    pub objects: Vec<ObjectRecord>,
}

impl TrialRecord {
    /// First object carrying both TTC figures; drives timing feedback.
    pub fn primary_ttc(&self) -> Option<(f64, f64)> {
        self.objects
            .iter()
            .find_map(|o| Some((o.ttc_estimate?, o.ttc_theoretical?)))
    }
}
