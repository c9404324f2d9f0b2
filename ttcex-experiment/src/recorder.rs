use crate::config::ExperimentConfig;
use crate::error::RecorderError;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use ttcex_core::{FeedbackColor, PoseSample, TrialRecord};

const STAMP_FORMAT: &str = "%Y-%m-%d--%H-%M-%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Complete,
    Partial,
}

/// Session settings stored alongside the trial results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    pub subj_num: u32,
    pub subj_sex: u32,
    pub data_file: String,
    pub tick_rate: f32,
    pub camera_lock: bool,
    pub track_head_pos: bool,
    pub show_feedback: bool,
    pub feedback_color: FeedbackColor,
    pub collect_confidence: bool,
}

impl From<&ExperimentConfig> for RunMetadata {
    fn from(cfg: &ExperimentConfig) -> Self {
        Self {
            subj_num: cfg.subj_num,
            subj_sex: cfg.subj_sex,
            data_file: cfg.data_file.display().to_string(),
            tick_rate: cfg.tick_rate,
            camera_lock: cfg.camera_lock,
            track_head_pos: cfg.track_head_pos,
            show_feedback: cfg.show_feedback,
            feedback_color: cfg.feedback_color,
            collect_confidence: cfg.collect_confidence,
        }
    }
}

/// Sink for trial results and head-tracking samples.
pub trait ResultRecorder {
    fn record_trial(&mut self, record: TrialRecord);
    fn record_pose(&mut self, trial_num: u32, sample: PoseSample);
    /// Called once per trial after its last pose sample.
    fn end_trial_poses(&mut self, trial_num: u32) -> Result<(), RecorderError>;
    /// Writes every recorded trial. Returns where they went, if anywhere.
    fn persist(&mut self, status: RunStatus) -> Result<Option<PathBuf>, RecorderError>;
    fn trial_count(&self) -> usize;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResultFile<'a> {
    #[serde(flatten)]
    meta: &'a RunMetadata,
    status: RunStatus,
    started_at: &'a str,
    trials: &'a [TrialRecord],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PoseFile<'a> {
    trial_num: u32,
    samples: &'a [PoseSample],
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), RecorderError> {
    let io_err = |source| RecorderError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(io_err)?;
    }
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush().map_err(io_err)
}

/// Writes results under `<root>/ParticipantResponse/` and pose samples under
/// `<root>/HeadPos/<stamp>/`, where the stamp is taken when the run starts.
#[derive(Debug)]
pub struct JsonResultRecorder {
    root: PathBuf,
    stamp: String,
    meta: RunMetadata,
    trials: Vec<TrialRecord>,
    poses: BTreeMap<u32, Vec<PoseSample>>,
}

impl JsonResultRecorder {
    pub fn new(root: impl Into<PathBuf>, meta: RunMetadata) -> Self {
        Self::with_stamp(root, meta, Local::now().format(STAMP_FORMAT).to_string())
    }

    pub fn with_stamp(root: impl Into<PathBuf>, meta: RunMetadata, stamp: String) -> Self {
        Self {
            root: root.into(),
            stamp,
            meta,
            trials: Vec::new(),
            poses: BTreeMap::new(),
        }
    }

    pub fn data_path(&self) -> PathBuf {
        self.root
            .join("ParticipantResponse")
            .join(format!("{}_data.json", self.stamp))
    }

    pub fn pose_path(&self, trial_num: u32) -> PathBuf {
        self.root
            .join("HeadPos")
            .join(&self.stamp)
            .join(format!("Trial{trial_num}.json"))
    }

    pub fn trials(&self) -> &[TrialRecord] {
        &self.trials
    }
}

impl ResultRecorder for JsonResultRecorder {
    fn record_trial(&mut self, record: TrialRecord) {
        self.trials.push(record);
    }

    fn record_pose(&mut self, trial_num: u32, sample: PoseSample) {
        self.poses.entry(trial_num).or_default().push(sample);
    }

    fn end_trial_poses(&mut self, trial_num: u32) -> Result<(), RecorderError> {
        let Some(samples) = self.poses.remove(&trial_num) else {
            return Ok(());
        };
        let path = self.pose_path(trial_num);
        write_json(
            &path,
            &PoseFile {
                trial_num,
                samples: &samples,
            },
        )?;
        debug!(trial = trial_num, samples = samples.len(), path = %path.display(), "pose samples written");
        Ok(())
    }

    fn persist(&mut self, status: RunStatus) -> Result<Option<PathBuf>, RecorderError> {
        // Samples of a trial cut short never reached end_trial_poses.
        let pending: Vec<u32> = self.poses.keys().copied().collect();
        for trial_num in pending {
            self.end_trial_poses(trial_num)?;
        }
        let path = self.data_path();
        write_json(
            &path,
            &ResultFile {
                meta: &self.meta,
                status,
                started_at: &self.stamp,
                trials: &self.trials,
            },
        )?;
        info!(trials = self.trials.len(), ?status, path = %path.display(), "results saved");
        Ok(Some(path))
    }

    fn trial_count(&self) -> usize {
        self.trials.len()
    }
}

/// Keeps everything in memory; used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    pub trials: Vec<TrialRecord>,
    pub poses: BTreeMap<u32, Vec<PoseSample>>,
    pub flushed_pose_trials: Vec<u32>,
    pub persisted: Vec<RunStatus>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultRecorder for MemoryRecorder {
    fn record_trial(&mut self, record: TrialRecord) {
        self.trials.push(record);
    }

    fn record_pose(&mut self, trial_num: u32, sample: PoseSample) {
        self.poses.entry(trial_num).or_default().push(sample);
    }

    fn end_trial_poses(&mut self, trial_num: u32) -> Result<(), RecorderError> {
        self.flushed_pose_trials.push(trial_num);
        Ok(())
    }

    fn persist(&mut self, status: RunStatus) -> Result<Option<PathBuf>, RecorderError> {
        self.persisted.push(status);
        Ok(None)
    }

    fn trial_count(&self) -> usize {
        self.trials.len()
    }
}
