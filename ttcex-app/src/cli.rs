use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Headless time-to-contact experiment runner")]
pub struct Args {
    /// Path to the experiment config JSON
    #[arg(long, default_value = "config.json")]
    pub config: PathBuf,

    /// Use a virtual clock instead of sleeping between ticks
    #[arg(long, default_value_t = false)]
    pub fast: bool,

    /// Stop (and save partial results) after this many seconds of run time
    #[arg(long)]
    pub max_seconds: Option<f64>,

    /// Seed for the simulated participant
    #[arg(long)]
    pub seed: Option<u64>,

    /// Pause of the simulated participant between trials, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub iti_ms: u64,

    /// Debug-level logging
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,
}
