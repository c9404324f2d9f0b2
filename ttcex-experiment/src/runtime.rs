use crate::error::KinematicsError;
use crate::lifecycle::{ObjectRuntimeState, StepOutcome};
use ttcex_core::{ObjectKey, ObjectRecord, Pose, TrialRecord, TrialSpec};
use ttcex_timing::ScheduleHandle;

#[derive(Debug, Clone)]
pub struct TrialTimestamps {
    pub start: u64,
    /// When the last object went inactive.
    pub stepping_done: Option<u64>,
}

/// How a trial ended, as reported to [`TrialRuntimeState::into_record`].
#[derive(Debug, Clone, Default)]
pub struct TrialEnding {
    pub end: u64,
    pub responded: bool,
    pub response: Option<String>,
    pub confidence: Option<String>,
    pub partial: bool,
}

/// Everything owned by the coordinator for the lifetime of one trial.
#[derive(Debug, Clone)]
pub struct TrialRuntimeState {
    pub index: usize,
    pub spec: TrialSpec,
    pub objects: Vec<ObjectRuntimeState>,
    pub skipped: Vec<(usize, KinematicsError)>,
    pub active_count: usize,
    pub timestamps: TrialTimestamps,
    pub step_handle: ScheduleHandle,
    pub track_handle: ScheduleHandle,
    pub head_at_start: Pose,
}

impl TrialRuntimeState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        index: usize,
        spec: TrialSpec,
        objects: Vec<ObjectRuntimeState>,
        skipped: Vec<(usize, KinematicsError)>,
        start: u64,
        step_handle: ScheduleHandle,
        track_handle: ScheduleHandle,
        head_at_start: Pose,
    ) -> Self {
        let active_count = objects.iter().filter(|o| o.is_active()).count();
        Self {
            index,
            spec,
            objects,
            skipped,
            active_count,
            timestamps: TrialTimestamps {
                start,
                stepping_done: None,
            },
            step_handle,
            track_handle,
            head_at_start,
        }
    }

    /// Steps every object once, in declaration order.
    pub fn step_all(&mut self) -> Vec<(ObjectKey, StepOutcome)> {
        let mut outcomes = Vec::with_capacity(self.objects.len());
        for obj in self.objects.iter_mut() {
            let out = obj.step();
            if out.deactivated {
                self.active_count -= 1;
            }
            outcomes.push((obj.key, out));
        }
        outcomes
    }

    pub fn is_stepping_done(&self) -> bool {
        self.active_count == 0
    }

    pub fn object_mut(&mut self, key: ObjectKey) -> Option<&mut ObjectRuntimeState> {
        self.objects.iter_mut().find(|o| o.key == key)
    }

    /// Builds the result entry; `epoch` is the experiment start timestamp.
    pub fn into_record(self, ending: TrialEnding, epoch: u64) -> TrialRecord {
        let secs = |ns: u64| ns.saturating_sub(epoch) as f64 / 1e9;
        let trial_start = secs(self.timestamps.start);
        let trial_end = secs(ending.end);
        let response_time = trial_end - trial_start;

        let objects = self
            .spec
            .objects
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let runtime = self.objects.iter().find(|o| o.key.object_index == i);
                let (actual_start, actual_end, distance) = match runtime {
                    Some(o) => (o.kinematics.start, o.kinematics.end, o.kinematics.distance),
                    None => (spec.start_pos, spec.end_pos, spec.declared_distance()),
                };
                let ttc_estimate = ending
                    .responded
                    .then(|| ObjectRecord::ttc_estimate(response_time, spec.time_visible))
                    .flatten();
                ObjectRecord {
                    obj_num: spec.obj_num,
                    obj_type: spec.obj_type.clone(),
                    obj_scale: spec.obj_scale,
                    obj_rot: spec.obj_rot,
                    declared_start: spec.start_pos,
                    declared_end: spec.end_pos,
                    actual_start,
                    actual_end,
                    distance,
                    velocity: spec.velocity,
                    time_visible: spec.time_visible,
                    rotation_speed: spec.rotation_speed.per_tick(),
                    hidden_at: runtime.and_then(|o| o.hidden_at_ns()).map(secs),
                    ttc_estimate,
                    ttc_theoretical: ObjectRecord::ttc_theoretical(
                        distance,
                        spec.velocity,
                        spec.time_visible,
                    ),
                    skipped: runtime.is_none(),
                }
            })
            .collect();

        let correct = match (&self.spec.correct_answer, &ending.response) {
            (Some(expected), Some(given)) => Some(expected.eq_ignore_ascii_case(given)),
            _ => None,
        };

        TrialRecord {
            trial_num: self.spec.trial_num,
            name: self.spec.name,
            correct_answer: self.spec.correct_answer,
            trial_start,
            trial_end,
            received_response: ending.responded,
            response_time,
            response: ending.response,
            confidence: ending.confidence,
            correct,
            partial: ending.partial,
            objects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::{Kinematics, KinematicsContext};
    use ttcex_core::{ObjectSpec, OffsetFlag, RotationSpeed, Vec3};
    use ttcex_timing::TickScheduler;

    fn spec(correct_answer: Option<&str>) -> TrialSpec {
        let obj = |start: Vec3| ObjectSpec {
            obj_num: 1,
            obj_type: "Cube".into(),
            obj_scale: Vec3::ONE,
            obj_rot: Vec3::ZERO,
            start_pos: start,
            end_pos: Vec3::ZERO,
            velocity: 2.0,
            time_visible: 2.0,
            rotation_speed: RotationSpeed::default(),
            offset_x: OffsetFlag::default(),
            offset_y: OffsetFlag::default(),
            offset_z: OffsetFlag::default(),
            custom_motion: None,
        };
        TrialSpec {
            trial_num: 3,
            name: "pair".into(),
            correct_answer: correct_answer.map(str::to_string),
            objects: vec![obj(Vec3::new(0.0, 0.0, 10.0)), obj(Vec3::ZERO)],
        }
    }

    fn runtime(spec: TrialSpec) -> TrialRuntimeState {
        let mut sched = TickScheduler::<u8>::new();
        let ctx = KinematicsContext::world(90.0);
        let k = Kinematics::resolve(&spec.objects[0], [1.0; 3], None, &ctx).unwrap();
        let key = ObjectKey {
            trial_index: 0,
            object_index: 0,
        };
        let mut obj = ObjectRuntimeState::new(key, k, Vec3::ZERO);
        obj.activate();
        let skipped = vec![(1, KinematicsError::ZeroDistance)];
        TrialRuntimeState::new(
            0,
            spec,
            vec![obj],
            skipped,
            2_000_000_000,
            sched.schedule_repeating(0, 1),
            sched.schedule_repeating(1, 1),
            Pose::default(),
        )
    }

    #[test]
    fn active_count_drops_as_objects_finish() {
        let mut rt = runtime(spec(None));
        assert_eq!(rt.active_count, 1);
        // 10 units at 2 u/s and 90 Hz.
        for _ in 0..449 {
            rt.step_all();
        }
        assert!(!rt.is_stepping_done());
        let last = rt.step_all();
        assert!(last[0].1.deactivated);
        assert!(rt.is_stepping_done());
    }

    #[test]
    fn record_marks_skipped_objects_and_checks_answer() {
        let rt = runtime(spec(Some("left")));
        let ending = TrialEnding {
            end: 6_000_000_000,
            responded: true,
            response: Some("Left".into()),
            ..TrialEnding::default()
        };
        let record = rt.into_record(ending, 1_000_000_000);
        assert_eq!(record.trial_start, 1.0);
        assert_eq!(record.trial_end, 5.0);
        assert_eq!(record.response_time, 4.0);
        assert_eq!(record.correct, Some(true));
        assert!(!record.objects[0].skipped);
        assert_eq!(record.objects[0].ttc_estimate, Some(2.0));
        assert!(record.objects[1].skipped);
        assert_eq!(record.objects[1].distance, 0.0);
    }
}
