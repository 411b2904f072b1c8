use anyhow::{Context, Result};
use log::LevelFilter;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const TICK_MS_VAR: &str = "TWIN_RUNNER_TICK_MS";
pub const SHUTDOWN_GRACE_MS_VAR: &str = "TWIN_RUNNER_SHUTDOWN_GRACE_MS";
pub const LOG_PATH_VAR: &str = "TWIN_RUNNER_LOG";
pub const LOG_LEVEL_VAR: &str = "TWIN_RUNNER_LOG_LEVEL";

const DEFAULT_TICK: Duration = Duration::from_millis(20);
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Everything the binary can be told from outside. There is no config file on purpose: the
/// project list is compiled in, and only the workspace root and a few knobs vary.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Directory holding one subdirectory per project.
    pub root: PathBuf,
    pub tick_interval: Duration,
    pub shutdown_grace: Duration,
    pub log_path: PathBuf,
    pub log_level: LevelFilter,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let cwd = std::env::current_dir().context("cannot read the current directory")?;
        Self::from_sources(std::env::args().skip(1), |key| std::env::var(key).ok(), cwd)
    }

    pub fn from_sources(
        mut args: impl Iterator<Item = String>,
        var: impl Fn(&str) -> Option<String>,
        cwd: PathBuf,
    ) -> Result<Self> {
        let root = args.next().map(PathBuf::from).unwrap_or(cwd);
        let tick_interval = parse_millis(TICK_MS_VAR, var(TICK_MS_VAR))?.unwrap_or(DEFAULT_TICK);
        let shutdown_grace = parse_millis(SHUTDOWN_GRACE_MS_VAR, var(SHUTDOWN_GRACE_MS_VAR))?
            .unwrap_or(DEFAULT_SHUTDOWN_GRACE);
        let log_path = var(LOG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join("twin_runner.log"));
        let log_level = match var(LOG_LEVEL_VAR) {
            Some(level) => LevelFilter::from_str(&level)
                .ok()
                .with_context(|| format!("{LOG_LEVEL_VAR}: unknown log level `{level}`"))?,
            None => LevelFilter::Info,
        };
        Ok(Self {
            root,
            tick_interval,
            shutdown_grace,
            log_path,
            log_level,
        })
    }
}

fn parse_millis(name: &str, value: Option<String>) -> Result<Option<Duration>> {
    value
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .with_context(|| format!("{name}: expected milliseconds, got `{raw}`"))
        })
        .transpose()
}
