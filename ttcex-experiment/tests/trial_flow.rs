use std::path::{Path, PathBuf};
use std::time::Duration;
use ttcex_cache::{Prefab, PrefabRegistry};
use ttcex_core::{
    CoordinatorPhase, CustomMotionRef, FeedbackColor, ObjectKey, ObjectPhase, ObjectSpec,
    OffsetFlag, Pose, RotationSpeed, TrialSpec, Vec3,
};
use ttcex_experiment::{
    ControllerInput, Engine, ExperimentConfig, GateAction, InitOutcome, JsonResultRecorder,
    MemoryRecorder, RecorderError, ResponseGate, ResultRecorder, RunMetadata, RunStatus,
    TrialCatalog, TrialCoordinator,
};
use ttcex_timing::{ManualTimer, Timer};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Spawn(ObjectKey),
    Move(ObjectKey, Pose),
    Hide(ObjectKey),
    Clear,
}

#[derive(Debug, Default)]
struct MockEngine {
    head: Pose,
    calls: Vec<Call>,
    message: Option<String>,
    feedback_color: Option<FeedbackColor>,
}

impl MockEngine {
    fn hides(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, Call::Hide(_))).count()
    }

    fn last_pose(&self, key: ObjectKey) -> Option<Pose> {
        self.calls.iter().rev().find_map(|c| match c {
            Call::Move(k, p) if *k == key => Some(*p),
            _ => None,
        })
    }
}

impl Engine for MockEngine {
    fn head_pose(&self) -> Pose {
        self.head
    }

    fn spawn_object(&mut self, key: ObjectKey, _prefab: &Prefab, _scale: Vec3, _pose: Pose) {
        self.calls.push(Call::Spawn(key));
    }

    fn move_object(&mut self, key: ObjectKey, pose: Pose) {
        self.calls.push(Call::Move(key, pose));
    }

    fn hide_object(&mut self, key: ObjectKey) {
        self.calls.push(Call::Hide(key));
    }

    fn clear_objects(&mut self) {
        self.calls.push(Call::Clear);
    }

    fn configure_feedback(&mut self, _position: Vec3, _size: u32, color: FeedbackColor) {
        self.feedback_color = Some(color);
    }

    fn show_message(&mut self, text: &str) {
        self.message = Some(text.to_string());
    }

    fn clear_message(&mut self) {
        self.message = None;
    }
}

type Coordinator<R> = TrialCoordinator<ManualTimer, MockEngine, R>;

fn object(start: Vec3, end: Vec3, velocity: f32, time_visible: f32) -> ObjectSpec {
    ObjectSpec {
        obj_num: 0,
        obj_type: "Cube".into(),
        obj_scale: Vec3::ONE,
        obj_rot: Vec3::ZERO,
        start_pos: start,
        end_pos: end,
        velocity,
        time_visible,
        rotation_speed: RotationSpeed::default(),
        offset_x: OffsetFlag::default(),
        offset_y: OffsetFlag::default(),
        offset_z: OffsetFlag::default(),
        custom_motion: None,
    }
}

/// 10 units at 2 u/s, hidden after 2 s.
fn approach() -> ObjectSpec {
    object(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, 2.0, 2.0)
}

fn trial(trial_num: u32, objects: Vec<ObjectSpec>) -> TrialSpec {
    TrialSpec {
        trial_num,
        name: String::new(),
        correct_answer: None,
        objects,
    }
}

fn config(tick_rate: f32) -> ExperimentConfig {
    ExperimentConfig {
        tick_rate,
        offset_obj: false,
        ..ExperimentConfig::default()
    }
}

fn build<R: ttcex_experiment::ResultRecorder>(
    cfg: ExperimentConfig,
    trials: Vec<TrialSpec>,
    recorder: R,
) -> (Coordinator<R>, ManualTimer) {
    let catalog =
        TrialCatalog::from_trials(trials, Path::new("."), &PrefabRegistry::with_builtins())
            .unwrap();
    let timer = ManualTimer::new();
    let coordinator =
        TrialCoordinator::new(cfg, catalog, timer.clone(), MockEngine::default(), recorder);
    (coordinator, timer)
}

fn tick<R: ttcex_experiment::ResultRecorder>(c: &mut Coordinator<R>, timer: &ManualTimer, rate: f32) {
    timer.advance(Duration::from_secs_f64(1.0 / f64::from(rate)));
    c.tick();
}

const KEY: ObjectKey = ObjectKey {
    trial_index: 0,
    object_index: 0,
};

#[test]
fn object_hides_at_tick_151_and_stops_at_tick_375() {
    let (mut c, timer) = build(config(75.0), vec![trial(1, vec![approach()])], MemoryRecorder::new());
    assert!(matches!(
        c.initialize_trial().unwrap(),
        InitOutcome::Started { trial_num: 1, objects: 1, skipped: 0 }
    ));
    assert_eq!(c.phase(), CoordinatorPhase::TrialActive);

    let mut hidden_on = None;
    let mut last_counter = 0;
    for n in 1..=374u32 {
        tick(&mut c, &timer, 75.0);
        let obj = &c.current_trial().unwrap().objects[0];
        assert_eq!(obj.step_counter(), n);
        assert!(obj.step_counter() > last_counter);
        last_counter = obj.step_counter();
        if hidden_on.is_none() && c.engine().hides() == 1 {
            hidden_on = Some(n);
        }
        assert!(obj.is_active(), "inactive at tick {n}");
    }
    assert_eq!(hidden_on, Some(151));
    assert!(c.is_stepping());

    tick(&mut c, &timer, 75.0);
    let obj = &c.current_trial().unwrap().objects[0];
    assert_eq!(obj.phase(), ObjectPhase::Inactive);
    assert_eq!(c.engine().last_pose(KEY).unwrap().position, Vec3::ZERO);
    assert!(!c.is_stepping());
    assert_eq!(c.engine().hides(), 1);

    // Stepping is over but the trial keeps running until a response.
    tick(&mut c, &timer, 75.0);
    assert!(c.check_trial_running());
    assert_eq!(c.current_trial().unwrap().objects[0].step_counter(), 375);
}

#[test]
fn never_hide_objects_are_only_hidden_on_completion() {
    let spec = object(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, 3.0, -1.0);
    let (mut c, timer) = build(config(90.0), vec![trial(1, vec![spec])], MemoryRecorder::new());
    c.initialize_trial().unwrap();
    for _ in 0..120 {
        tick(&mut c, &timer, 90.0);
    }
    assert_eq!(c.engine().hides(), 0);
    assert!(!c.is_stepping());

    assert!(c.complete_trial(timer.now(), false, None, None));
    assert_eq!(c.engine().hides(), 1);
    assert_eq!(c.engine().calls.last(), Some(&Call::Clear));
}

#[test]
fn second_complete_records_nothing() {
    let (mut c, timer) = build(config(90.0), vec![trial(1, vec![approach()])], MemoryRecorder::new());
    c.initialize_trial().unwrap();
    tick(&mut c, &timer, 90.0);
    assert!(c.complete_trial(timer.now(), true, Some("Left".into()), None));
    assert!(!c.complete_trial(timer.now(), true, Some("Right".into()), None));
    assert_eq!(c.recorder().trials.len(), 1);
    assert_eq!(c.recorder().trials[0].response.as_deref(), Some("Left"));
    assert_eq!(c.recorder().flushed_pose_trials, vec![1]);
    assert_eq!(c.phase(), CoordinatorPhase::Idle);
    assert_eq!(c.scheduled_tasks(), 0);
}

#[test]
fn record_carries_response_time_and_ttc() {
    let (mut c, timer) = build(config(75.0), vec![trial(1, vec![approach()])], MemoryRecorder::new());
    timer.set(1_000_000_000);
    c.initialize_trial().unwrap();
    for _ in 0..200 {
        c.tick();
    }
    c.complete_trial(6_500_000_000, true, Some("Left".into()), None);

    let record = &c.recorder().trials[0];
    assert!(record.received_response);
    assert!((record.trial_start - 1.0).abs() < 1e-9);
    assert!((record.response_time - 5.5).abs() < 1e-9);
    let obj = &record.objects[0];
    assert_eq!(obj.distance, 10.0);
    assert_eq!(obj.ttc_theoretical, Some(3.0));
    assert!((obj.ttc_estimate.unwrap() - 3.5).abs() < 1e-9);
    assert!(obj.hidden_at.is_some());
    assert!(!obj.skipped);
}

#[test]
fn degenerate_object_is_skipped_and_trial_continues() {
    let still = object(Vec3::ONE, Vec3::ONE, 2.0, 1.0);
    let (mut c, timer) = build(
        config(90.0),
        vec![trial(1, vec![still, approach()])],
        MemoryRecorder::new(),
    );
    assert!(matches!(
        c.initialize_trial().unwrap(),
        InitOutcome::Started { objects: 1, skipped: 1, .. }
    ));
    tick(&mut c, &timer, 90.0);
    let key = ObjectKey {
        trial_index: 0,
        object_index: 1,
    };
    assert!(c.engine().last_pose(key).is_some());
    c.complete_trial(timer.now(), false, None, None);
    let record = &c.recorder().trials[0];
    assert_eq!(record.objects.len(), 2);
    assert!(record.objects[0].skipped);
    assert!(!record.objects[1].skipped);
}

#[test]
fn zero_velocity_object_is_skipped_without_blocking_the_catalog() {
    let parked = object(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, 0.0, 1.0);
    let (mut c, timer) = build(
        config(90.0),
        vec![
            trial(1, vec![approach()]),
            trial(2, vec![approach(), parked]),
        ],
        MemoryRecorder::new(),
    );
    assert_eq!(c.total_trials(), 2);
    c.initialize_trial().unwrap();
    assert!(c.complete_trial(timer.now(), false, None, None));

    assert!(matches!(
        c.initialize_trial().unwrap(),
        InitOutcome::Started { trial_num: 2, objects: 1, skipped: 1 }
    ));
    tick(&mut c, &timer, 90.0);
    assert!(c.is_stepping());
    c.complete_trial(timer.now(), false, None, None);

    let record = &c.recorder().trials[1];
    assert_eq!(record.trial_num, 2);
    assert!(!record.objects[0].skipped);
    assert!(record.objects[1].skipped);
}

#[test]
fn custom_motion_object_follows_waypoints_to_the_end() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("arc.json"),
        r#"{"waypoints": [
            {"position": [0, 0, 6], "rotation": [0, 0, 0]},
            {"position": [1, 0, 3], "rotation": [0, 45, 0]},
            {"position": [0, 0, 0], "rotation": [0, 90, 0]}
        ]}"#,
    )
    .unwrap();
    let mut spec = object(Vec3::new(0.0, 0.0, 6.0), Vec3::ZERO, 0.0, 0.5);
    spec.custom_motion = Some(CustomMotionRef {
        file: "arc.json".into(),
        duration: 2.0,
    });
    let catalog = TrialCatalog::from_trials(
        vec![trial(1, vec![spec])],
        dir.path(),
        &PrefabRegistry::with_builtins(),
    )
    .unwrap();
    let timer = ManualTimer::new();
    let mut c = TrialCoordinator::new(
        config(90.0),
        catalog,
        timer.clone(),
        MockEngine::default(),
        MemoryRecorder::new(),
    );
    c.initialize_trial().unwrap();

    let mut hidden_on = None;
    let mut inactive_on = None;
    for n in 1..=200u32 {
        tick(&mut c, &timer, 90.0);
        if hidden_on.is_none() && c.engine().hides() == 1 {
            hidden_on = Some(n);
        }
        let obj = &c.current_trial().unwrap().objects[0];
        if inactive_on.is_none() && obj.phase() == ObjectPhase::Inactive {
            inactive_on = Some(n);
        }
    }
    assert_eq!(hidden_on, Some(46));
    assert_eq!(inactive_on, Some(180));
    assert_eq!(c.engine().hides(), 1);
    assert!(!c.is_stepping());

    let last = c.engine().last_pose(KEY).unwrap();
    assert!(last.position.length() < 1e-5, "{:?}", last.position);
    assert!((last.euler - Vec3::new(0.0, 90.0, 0.0)).length() < 1e-4);
    assert_eq!(c.current_trial().unwrap().objects[0].step_counter(), 180);
}

/// Keeps records in memory but refuses the first `persist`.
#[derive(Debug, Default)]
struct FlakyRecorder {
    inner: MemoryRecorder,
    failures_left: u32,
}

impl ResultRecorder for FlakyRecorder {
    fn record_trial(&mut self, record: ttcex_core::TrialRecord) {
        self.inner.record_trial(record);
    }

    fn record_pose(&mut self, trial_num: u32, sample: ttcex_core::PoseSample) {
        self.inner.record_pose(trial_num, sample);
    }

    fn end_trial_poses(&mut self, trial_num: u32) -> Result<(), RecorderError> {
        self.inner.end_trial_poses(trial_num)
    }

    fn persist(&mut self, status: RunStatus) -> Result<Option<PathBuf>, RecorderError> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(RecorderError::Io {
                path: PathBuf::from("results.json"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.inner.persist(status)
    }

    fn trial_count(&self) -> usize {
        self.inner.trial_count()
    }
}

#[test]
fn failed_save_at_completion_is_retried_on_shutdown() {
    let recorder = FlakyRecorder {
        failures_left: 1,
        ..FlakyRecorder::default()
    };
    let (mut c, timer) = build(config(90.0), vec![trial(1, vec![approach()])], recorder);
    c.initialize_trial().unwrap();
    c.complete_trial(timer.now(), true, Some("Left".into()), None);
    assert!(c.initialize_trial().is_err());
    assert_eq!(c.phase(), CoordinatorPhase::ExperimentComplete);
    assert!(c.recorder().inner.persisted.is_empty());

    let report = c.shutdown().unwrap();
    assert_eq!(report.status, RunStatus::Complete);
    assert_eq!(report.trials_recorded, 1);
    assert_eq!(c.recorder().inner.persisted, vec![RunStatus::Complete]);
}

#[test]
fn experiment_completion_is_a_one_time_transition() {
    let (mut c, timer) = build(config(90.0), vec![trial(1, vec![approach()])], MemoryRecorder::new());
    c.initialize_trial().unwrap();
    assert_eq!(c.initialize_trial().unwrap(), InitOutcome::AlreadyRunning);
    c.complete_trial(timer.now(), false, None, None);

    assert_eq!(c.initialize_trial().unwrap(), InitOutcome::ExperimentComplete);
    assert_eq!(c.phase(), CoordinatorPhase::ExperimentComplete);
    assert_eq!(c.engine().message.as_deref(), Some("Experiment complete"));
    assert_eq!(c.initialize_trial().unwrap(), InitOutcome::AlreadyComplete);
    assert_eq!(c.recorder().persisted, vec![RunStatus::Complete]);

    let report = c.shutdown().unwrap();
    assert_eq!(report.status, RunStatus::Complete);
    assert_eq!(report.trials_recorded, 1);
    assert_eq!(c.recorder().persisted, vec![RunStatus::Complete]);
}

#[test]
fn forced_shutdown_keeps_completed_trials_and_marks_partial() {
    let (mut c, timer) = build(
        config(90.0),
        vec![trial(1, vec![approach()]), trial(2, vec![approach()]), trial(3, vec![approach()])],
        MemoryRecorder::new(),
    );
    c.initialize_trial().unwrap();
    tick(&mut c, &timer, 90.0);
    c.complete_trial(timer.now(), true, Some("Right".into()), None);
    c.initialize_trial().unwrap();
    for _ in 0..10 {
        tick(&mut c, &timer, 90.0);
    }

    let report = c.shutdown().unwrap();
    assert_eq!(report.status, RunStatus::Partial);
    assert_eq!(report.trials_recorded, 2);
    let trials = &c.recorder().trials;
    assert!(!trials[0].partial && trials[0].received_response);
    assert!(trials[1].partial && !trials[1].received_response);
    assert_eq!(trials[1].trial_num, 2);
    assert_eq!(c.recorder().persisted, vec![RunStatus::Partial]);
    assert!(!c.check_trial_running());
}

#[test]
fn head_pose_is_sampled_every_n_ticks_when_tracking() {
    let cfg = ExperimentConfig {
        track_head_pos: true,
        pose_sample_every: 3,
        ..config(90.0)
    };
    let (mut c, timer) = build(cfg, vec![trial(4, vec![approach()])], MemoryRecorder::new());
    c.initialize_trial().unwrap();
    for _ in 0..9 {
        tick(&mut c, &timer, 90.0);
    }
    assert_eq!(c.recorder().poses[&4].len(), 3);

    let (mut quiet, timer) = build(config(90.0), vec![trial(4, vec![approach()])], MemoryRecorder::new());
    quiet.initialize_trial().unwrap();
    for _ in 0..9 {
        tick(&mut quiet, &timer, 90.0);
    }
    assert!(quiet.recorder().poses.is_empty());
}

#[test]
fn hide_all_keeps_objects_moving() {
    let (mut c, timer) = build(config(90.0), vec![trial(1, vec![approach()])], MemoryRecorder::new());
    c.initialize_trial().unwrap();
    tick(&mut c, &timer, 90.0);
    c.hide_all_objects();
    c.hide_all_objects();
    assert_eq!(c.engine().hides(), 1);
    let before = c.engine().last_pose(KEY).unwrap();
    tick(&mut c, &timer, 90.0);
    let after = c.engine().last_pose(KEY).unwrap();
    assert!(after.position.z < before.position.z);
    assert_eq!(
        c.current_trial().unwrap().objects[0].phase(),
        ObjectPhase::ActiveHidden
    );
}

#[test]
fn camera_lock_follows_head_at_trial_start() {
    let cfg = ExperimentConfig {
        camera_lock: true,
        ..config(90.0)
    };
    let (mut c, timer) = build(cfg, vec![trial(1, vec![approach()])], MemoryRecorder::new());
    c.engine_mut().head = Pose::new(Vec3::new(0.0, 1.6, 0.0), Vec3::new(0.0, 90.0, 0.0));
    c.initialize_trial().unwrap();
    let k = &c.current_trial().unwrap().objects[0].kinematics;
    assert!((k.start - Vec3::new(10.0, 1.6, 0.0)).length() < 1e-4);
    assert!((k.end - Vec3::new(0.0, 1.6, 0.0)).length() < 1e-4);
    tick(&mut c, &timer, 90.0);
}

#[test]
fn gate_drives_a_full_trial_with_confidence_and_feedback() {
    let cfg = ExperimentConfig {
        collect_confidence: true,
        show_feedback: true,
        feedback_color: FeedbackColor::Green,
        ..config(90.0)
    };
    let mut t = trial(1, vec![approach()]);
    t.correct_answer = Some("Left".into());
    let (mut c, timer) = build(cfg, vec![t], MemoryRecorder::new());
    assert_eq!(c.engine().feedback_color, Some(FeedbackColor::Green));
    let mut gate = ResponseGate::new(true, None);

    let press = ControllerInput {
        timestamp: timer.now(),
        trigger: 1.0,
        ..Default::default()
    };
    assert_eq!(gate.handle(&press, &mut c).unwrap(), GateAction::TrialStarted);
    for _ in 0..30 {
        tick(&mut c, &timer, 90.0);
    }
    let touch = ControllerInput {
        timestamp: timer.now(),
        touchpad_pressed: true,
        touchpad_x: -0.8,
        ..Default::default()
    };
    assert_eq!(gate.handle(&touch, &mut c).unwrap(), GateAction::AwaitingConfidence);
    assert_eq!(c.engine().message.as_deref(), Some("How confident?"));
    assert_eq!(c.engine().hides(), 1);

    let rate = ControllerInput {
        timestamp: timer.now(),
        digit: Some(4),
        ..Default::default()
    };
    assert_eq!(gate.handle(&rate, &mut c).unwrap(), GateAction::Completed);
    let record = &c.recorder().trials[0];
    assert_eq!(record.response.as_deref(), Some("Left"));
    assert_eq!(record.confidence.as_deref(), Some("4"));
    assert_eq!(record.correct, Some(true));
    assert_eq!(c.engine().message.as_deref(), Some("Correct"));

    // Releasing, then pressing again runs past the end of the catalog.
    let release = ControllerInput::default();
    gate.handle(&release, &mut c).unwrap();
    assert_eq!(gate.handle(&press, &mut c).unwrap(), GateAction::ExperimentComplete);
}

#[test]
fn partial_results_reach_disk() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(90.0);
    let recorder = JsonResultRecorder::with_stamp(dir.path(), RunMetadata::from(&cfg), "run".into());
    let (mut c, timer) = build(cfg, vec![trial(1, vec![approach()]), trial(2, vec![approach()])], recorder);
    c.initialize_trial().unwrap();
    tick(&mut c, &timer, 90.0);
    c.complete_trial(timer.now(), true, Some("Left".into()), None);
    c.initialize_trial().unwrap();

    let report = c.shutdown().unwrap();
    let path = report.saved_to.unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(json["status"], "partial");
    assert_eq!(json["trials"].as_array().unwrap().len(), 2);
    assert_eq!(json["trials"][1]["partial"], true);
}
