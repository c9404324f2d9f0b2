use crate::catalog::TrialCatalog;
use crate::config::ExperimentConfig;
use crate::engine::Engine;
use crate::error::{ExperimentError, KinematicsError};
use crate::feedback::{feedback_for, COMPLETED_MSG};
use crate::kinematics::{Kinematics, KinematicsContext};
use crate::lifecycle::ObjectRuntimeState;
use crate::recorder::{ResultRecorder, RunStatus};
use crate::response::{ControlSurface, TrialTiming};
use crate::runtime::{TrialEnding, TrialRuntimeState};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use ttcex_cache::PrefabRegistry;
use ttcex_core::{CoordinatorPhase, ObjectKey, PoseSample, TrialRecord};
use ttcex_timing::{ScheduleHandle, TickScheduler, Timer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScheduledTask {
    StepObjects,
    TrackPose,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    Started {
        trial_num: u32,
        objects: usize,
        skipped: usize,
    },
    /// The last trial is done; results were persisted.
    ExperimentComplete,
    AlreadyComplete,
    AlreadyRunning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShutdownReport {
    pub status: RunStatus,
    pub trials_recorded: usize,
    pub saved_to: Option<PathBuf>,
}

/// Drives trials one at a time: spawns objects, steps them on the fixed-rate
/// tick, and hands finished records to the recorder.
pub struct TrialCoordinator<T, E, R>
where
    T: Timer<Timestamp = u64>,
    E: Engine,
    R: ResultRecorder,
{
    config: ExperimentConfig,
    catalog: TrialCatalog,
    prefabs: PrefabRegistry,
    timer: T,
    engine: E,
    recorder: R,
    scheduler: TickScheduler<ScheduledTask>,
    phase: CoordinatorPhase,
    index: usize,
    current: Option<TrialRuntimeState>,
    epoch: u64,
    persisted: bool,
    saved_to: Option<PathBuf>,
}

/// Hides every visible object of `trial`. Returns how many were hidden.
fn hide_visible<E: Engine>(trial: &mut TrialRuntimeState, engine: &mut E, now: u64) -> usize {
    let mut hidden = 0;
    for obj in trial.objects.iter_mut() {
        if obj.force_hide() {
            obj.note_hidden_at(now);
            engine.hide_object(obj.key);
            hidden += 1;
        }
    }
    hidden
}

impl<T, E, R> TrialCoordinator<T, E, R>
where
    T: Timer<Timestamp = u64>,
    E: Engine,
    R: ResultRecorder,
{
    pub fn new(
        config: ExperimentConfig,
        catalog: TrialCatalog,
        timer: T,
        mut engine: E,
        recorder: R,
    ) -> Self {
        engine.configure_feedback(config.canvas_pos, config.feedback_size, config.feedback_color);
        let prefabs = config.prefab_registry();
        let epoch = timer.now();
        Self {
            config,
            catalog,
            prefabs,
            timer,
            engine,
            recorder,
            scheduler: TickScheduler::new(),
            phase: CoordinatorPhase::Idle,
            index: 0,
            current: None,
            epoch,
            persisted: false,
            saved_to: None,
        }
    }

    pub fn initialize_trial(&mut self) -> Result<InitOutcome, ExperimentError> {
        if self.current.is_some() {
            debug!("initialize_trial ignored: a trial is running");
            return Ok(InitOutcome::AlreadyRunning);
        }
        let total = self.catalog.len();
        if self.index > total {
            return Ok(InitOutcome::AlreadyComplete);
        }
        if self.index == total {
            self.index += 1;
            self.finish_experiment()?;
            return Ok(InitOutcome::ExperimentComplete);
        }
        let Some(spec) = self.catalog.trial(self.index).cloned() else {
            return Ok(InitOutcome::AlreadyComplete);
        };
        if let Some(obj) = spec
            .objects
            .iter()
            .find(|o| self.prefabs.resolve(&o.obj_type).is_none())
        {
            return Err(ExperimentError::UnknownObjectType(obj.obj_type.clone()));
        }

        self.engine.clear_message();
        let head = self.engine.head_pose();
        let ctx = KinematicsContext {
            tick_rate: self.config.tick_rate,
            camera_lock: self.config.camera_lock,
            apply_offsets: self.config.offset_obj,
            frame: head,
        };

        let mut objects = Vec::with_capacity(spec.objects.len());
        let mut skipped: Vec<(usize, KinematicsError)> = Vec::new();
        for (i, obj) in spec.objects.iter().enumerate() {
            let key = ObjectKey {
                trial_index: self.index,
                object_index: i,
            };
            let Some(prefab) = self.prefabs.lookup(&obj.obj_type) else {
                continue;
            };
            let bounds = prefab.bounds(obj.obj_scale.to_array());
            match Kinematics::resolve(obj, bounds, self.catalog.waypoints_for(obj), &ctx) {
                Ok(kinematics) => {
                    let mut state = ObjectRuntimeState::new(key, kinematics, obj.obj_rot);
                    self.engine.spawn_object(key, prefab, obj.obj_scale, state.pose());
                    state.activate();
                    objects.push(state);
                }
                Err(err) => {
                    warn!(trial = spec.trial_num, object = i, %err, "skipping object");
                    skipped.push((i, err));
                }
            }
        }

        let step_handle = self
            .scheduler
            .schedule_repeating(ScheduledTask::StepObjects, 1);
        let track_handle = self
            .scheduler
            .schedule_repeating(ScheduledTask::TrackPose, self.config.pose_sample_every);
        let start = self.timer.now();
        let outcome = InitOutcome::Started {
            trial_num: spec.trial_num,
            objects: objects.len(),
            skipped: skipped.len(),
        };
        info!(
            trial = %spec.label(),
            index = self.index,
            objects = objects.len(),
            skipped = skipped.len(),
            "trial started"
        );
        self.current = Some(TrialRuntimeState::new(
            self.index,
            spec,
            objects,
            skipped,
            start,
            step_handle,
            track_handle,
            head,
        ));
        self.phase = CoordinatorPhase::TrialActive;
        self.index += 1;
        Ok(outcome)
    }

    fn finish_experiment(&mut self) -> Result<(), ExperimentError> {
        self.phase = CoordinatorPhase::ExperimentComplete;
        self.scheduler.cancel_all();
        let saved = self.recorder.persist(RunStatus::Complete);
        self.engine.show_message(COMPLETED_MSG);
        self.saved_to = saved?;
        self.persisted = true;
        info!(trials = self.recorder.trial_count(), "experiment complete");
        Ok(())
    }

    /// Runs the tasks due on this tick.
    pub fn tick(&mut self) {
        for (handle, task) in self.scheduler.advance() {
            // An earlier task of this tick may have cancelled it.
            if !self.scheduler.is_active(handle) {
                continue;
            }
            match task {
                ScheduledTask::StepObjects => self.step_objects(handle),
                ScheduledTask::TrackPose => self.track_pose(),
            }
        }
    }

    fn step_objects(&mut self, handle: ScheduleHandle) {
        let now = self.timer.now();
        let Some(trial) = self.current.as_mut() else {
            self.scheduler.cancel(handle);
            return;
        };
        let trial_num = trial.spec.trial_num;
        for (key, out) in trial.step_all() {
            if out.moved {
                self.engine.move_object(key, out.pose);
            }
            if out.hidden {
                if let Some(obj) = trial.object_mut(key) {
                    obj.note_hidden_at(now);
                    debug!(
                        trial = trial_num,
                        object = key.object_index,
                        step = obj.step_counter(),
                        "object hidden"
                    );
                }
                self.engine.hide_object(key);
            }
        }
        if trial.is_stepping_done() {
            trial.timestamps.stepping_done = Some(now);
            self.scheduler.cancel(handle);
            debug!(trial = trial_num, "all objects reached their end");
        }
    }

    fn track_pose(&mut self) {
        if !self.config.track_head_pos {
            return;
        }
        let Some(trial) = self.current.as_ref() else {
            return;
        };
        let sample = PoseSample {
            timestamp: self.timer.now().saturating_sub(self.epoch) as f64 / 1e9,
            head: self.engine.head_pose(),
            controller: self.engine.controller_pose(),
        };
        self.recorder.record_pose(trial.spec.trial_num, sample);
    }

    /// Ends the running trial and records it. A second call is a no-op.
    pub fn complete_trial(
        &mut self,
        end: u64,
        responded: bool,
        response: Option<String>,
        confidence: Option<String>,
    ) -> bool {
        let Some(trial) = self.current.take() else {
            debug!("complete_trial ignored: no trial running");
            return false;
        };
        let record = self.close_trial(
            trial,
            TrialEnding {
                end,
                responded,
                response,
                confidence,
                partial: false,
            },
        );
        info!(
            trial = record.trial_num,
            responded,
            response_time = record.response_time,
            response = record.response.as_deref().unwrap_or("-"),
            "trial complete"
        );
        let feedback = if self.config.show_feedback {
            feedback_for(&record)
        } else {
            None
        };
        let trial_num = record.trial_num;
        self.recorder.record_trial(record);
        if let Err(err) = self.recorder.end_trial_poses(trial_num) {
            warn!(trial = trial_num, %err, "could not write pose samples");
        }
        self.phase = CoordinatorPhase::Idle;
        if let Some(text) = feedback {
            self.engine.show_message(&text);
        }
        true
    }

    fn close_trial(
        &mut self,
        mut trial: TrialRuntimeState,
        ending: TrialEnding,
    ) -> TrialRecord {
        self.scheduler.cancel(trial.step_handle);
        self.scheduler.cancel(trial.track_handle);
        hide_visible(&mut trial, &mut self.engine, ending.end);
        self.engine.clear_objects();
        trial.into_record(ending, self.epoch)
    }

    pub fn check_trial_running(&self) -> bool {
        self.current.is_some()
    }

    /// Hides every still-visible object; motion continues.
    pub fn hide_all_objects(&mut self) {
        let now = self.timer.now();
        if let Some(trial) = self.current.as_mut() {
            let n = hide_visible(trial, &mut self.engine, now);
            debug!(hidden = n, "hid all objects");
        }
    }

    /// Flushes results. Anything short of a finished experiment is saved as
    /// partial, with the running trial recorded unanswered.
    pub fn shutdown(&mut self) -> Result<ShutdownReport, ExperimentError> {
        if self.phase.is_complete() {
            if !self.persisted {
                self.saved_to = self.recorder.persist(RunStatus::Complete)?;
                self.persisted = true;
            }
            info!("experiment finished normally");
            return Ok(ShutdownReport {
                status: RunStatus::Complete,
                trials_recorded: self.recorder.trial_count(),
                saved_to: self.saved_to.clone(),
            });
        }

        if let Some(trial) = self.current.take() {
            let end = self.timer.now();
            let record = self.close_trial(
                trial,
                TrialEnding {
                    end,
                    partial: true,
                    ..TrialEnding::default()
                },
            );
            warn!(trial = record.trial_num, "recording interrupted trial as unanswered");
            self.recorder.record_trial(record);
        }
        self.scheduler.cancel_all();
        self.phase = CoordinatorPhase::Idle;
        let saved_to = self.recorder.persist(RunStatus::Partial)?;
        warn!(
            trials = self.recorder.trial_count(),
            "experiment stopped early; partial results saved"
        );
        self.saved_to = saved_to.clone();
        self.persisted = true;
        Ok(ShutdownReport {
            status: RunStatus::Partial,
            trials_recorded: self.recorder.trial_count(),
            saved_to,
        })
    }

    pub fn phase(&self) -> CoordinatorPhase {
        self.phase
    }

    /// Index of the next trial to start.
    pub fn next_index(&self) -> usize {
        self.index
    }

    pub fn total_trials(&self) -> usize {
        self.catalog.len()
    }

    pub fn current_trial(&self) -> Option<&TrialRuntimeState> {
        self.current.as_ref()
    }

    pub fn scheduled_tasks(&self) -> usize {
        self.scheduler.active_count()
    }

    pub fn is_stepping(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|t| self.scheduler.is_active(t.step_handle))
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }
}

impl<T, E, R> ControlSurface for TrialCoordinator<T, E, R>
where
    T: Timer<Timestamp = u64>,
    E: Engine,
    R: ResultRecorder,
{
    fn initialize_trial(&mut self) -> Result<InitOutcome, ExperimentError> {
        TrialCoordinator::initialize_trial(self)
    }

    fn complete_trial(
        &mut self,
        end: u64,
        responded: bool,
        response: Option<String>,
        confidence: Option<String>,
    ) -> bool {
        TrialCoordinator::complete_trial(self, end, responded, response, confidence)
    }

    fn check_trial_running(&self) -> bool {
        TrialCoordinator::check_trial_running(self)
    }

    fn hide_all_objects(&mut self) {
        TrialCoordinator::hide_all_objects(self)
    }

    fn show_prompt(&mut self, text: &str) {
        self.engine.show_message(text);
    }

    fn clear_prompt(&mut self) {
        self.engine.clear_message();
    }

    fn trial_timing(&self) -> Option<TrialTiming> {
        self.current.as_ref().map(|t| TrialTiming {
            started_at: t.timestamps.start,
            max_time_visible: t.spec.max_time_visible(),
        })
    }
}
