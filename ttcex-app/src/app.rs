use crate::cli::Args;
use crate::engine::HeadlessEngine;
use crate::participant::SimulatedParticipant;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use ttcex_experiment::{
    ControlSurface, ExperimentConfig, GateAction, JsonResultRecorder, ResponseGate, RunMetadata,
    RunStatus, TrialCatalog, TrialCoordinator,
};
use ttcex_timing::{FixedRateClock, HighPrecisionTimer, ManualTimer, Timer};

pub struct App {
    args: Args,
    config: ExperimentConfig,
    catalog: TrialCatalog,
    stop: Arc<AtomicBool>,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

impl App {
    pub fn new(args: Args) -> Result<Self> {
        let config = ExperimentConfig::load(&args.config)
            .with_context(|| format!("loading config {}", args.config.display()))?;
        init_logging(args.verbose || config.debugging);

        let prefabs = config.prefab_registry();
        let catalog = TrialCatalog::load(&config.data_file, &prefabs)
            .with_context(|| format!("loading trials {}", config.data_file.display()))?;

        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_ctrlc = stop.clone();
        ctrlc::set_handler(move || {
            stop_for_ctrlc.store(true, Ordering::SeqCst);
        })
        .context("installing Ctrl-C handler")?;

        Ok(Self {
            args,
            config,
            catalog,
            stop,
        })
    }

    pub fn run(self) -> Result<()> {
        info!("=== TIME-TO-CONTACT EXPERIMENT ===");
        info!(
            platform = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            subject = self.config.subj_num,
            trials = self.catalog.len(),
            tick_rate = self.config.tick_rate,
            "starting"
        );
        if self.args.fast {
            self.run_with(ManualTimer::new())
        } else {
            self.run_with(HighPrecisionTimer::new())
        }
    }

    fn run_with<T: Timer<Timestamp = u64>>(self, timer: T) -> Result<()> {
        let App {
            args,
            config,
            catalog,
            stop,
        } = self;

        let recorder = JsonResultRecorder::new(&config.results_dir, RunMetadata::from(&config));
        let engine = HeadlessEngine::new(config.init_camera_pos);
        let mut gate = ResponseGate::new(config.collect_confidence, config.response_timeout_factor);
        let seed = args.seed.unwrap_or_else(rand::random);
        let mut participant = SimulatedParticipant::new(seed, args.iti_ms);
        let mut clock = FixedRateClock::new(timer.clone(), config.tick_rate);
        let max_ticks = args
            .max_seconds
            .map(|s| (s * f64::from(config.tick_rate)).ceil() as u64);
        info!(seed, "simulated participant ready");

        let mut coordinator = TrialCoordinator::new(config, catalog, timer, engine, recorder);

        let mut failure = None;
        loop {
            if stop.load(Ordering::SeqCst) {
                warn!("interrupted");
                break;
            }
            if max_ticks.is_some_and(|limit| clock.ticks() >= limit) {
                warn!(ticks = clock.ticks(), "run time limit reached");
                break;
            }
            let now = clock.wait_next_tick();
            coordinator.tick();
            let input = participant.poll(
                now,
                coordinator.trial_timing(),
                gate.is_awaiting_confidence(),
            );
            match gate.handle(&input, &mut coordinator) {
                Ok(GateAction::ExperimentComplete) => break,
                Ok(GateAction::TimedOut) => warn!("trial timed out"),
                Ok(_) => {}
                Err(err) => {
                    error!(%err, "trial flow failed; saving what was collected");
                    failure = Some(err);
                    break;
                }
            }
        }

        let report = coordinator.shutdown().context("saving results")?;
        if let Some(err) = failure {
            return Err(err.into());
        }
        let stats = clock.stats();
        info!(
            avg_ms = stats.average_frame_time_ns / 1e6,
            jitter_ms = stats.jitter_ns / 1e6,
            min_ms = stats.min_frame_time_ns / 1e6,
            max_ms = stats.max_frame_time_ns / 1e6,
            fps = stats.effective_fps,
            late_ticks = clock.late_ticks(),
            "tick timing"
        );
        match (report.status, &report.saved_to) {
            (RunStatus::Complete, Some(path)) => info!(
                trials = report.trials_recorded,
                path = %path.display(),
                "experiment finished, results saved. Thank you!"
            ),
            (_, path) => warn!(
                trials = report.trials_recorded,
                path = ?path,
                status = ?report.status,
                "experiment ended early"
            ),
        }
        Ok(())
    }
}
