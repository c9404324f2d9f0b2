mod app;
mod cli;
mod engine;
mod participant;

use clap::Parser;
pub use app::App;
pub use cli::Args;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let app = App::new(args)?;
    app.run()?;

    Ok(())
}
