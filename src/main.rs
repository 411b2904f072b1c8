use anyhow::{Context, Result};
use log::info;
use simplelog::{Config, WriteLogger};
use std::fs::File;

use twin_runner::config::Settings;
use twin_runner::{reference_targets, CrosstermKeys, Dashboard, TerminalSurface};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env()?;
    init_logging(&settings)?;
    info!("supervising projects under {}", settings.root.display());

    let surface = TerminalSurface::enter().context("failed to take over the terminal")?;
    let size = surface.size().context("failed to read the terminal size")?;
    let targets = reference_targets(&settings.root);
    let dashboard = Dashboard::new(surface, CrosstermKeys, targets, size)?;
    dashboard
        .run(settings.tick_interval, settings.shutdown_grace)
        .await
}

// The terminal belongs to the panes, so logs go to a file.
fn init_logging(settings: &Settings) -> Result<()> {
    let file = File::create(&settings.log_path)
        .with_context(|| format!("cannot create log file {}", settings.log_path.display()))?;
    WriteLogger::init(settings.log_level, Config::default(), file)
        .context("logger already installed")
}
