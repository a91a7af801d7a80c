//! Configuration for the tracker.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, TrackerError};

/// Default scheduler tick.
pub const DEFAULT_TICK_SECS: u64 = 5;
/// Default bound on waiting for free-text input.
pub const DEFAULT_INPUT_TIMEOUT_SECS: u64 = 300;

/// Configuration for the tracker core.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// SQLite URL for the tracker database.
    pub sqlite_url: String,
    /// Period of the notification scheduler.
    pub tick_interval: Duration,
    /// How long an interactive command waits for the user's reply.
    pub input_timeout: Duration,
    /// External chart renderer, invoked as `<cmd> <json> <output.png>`.
    pub chart_command: Option<PathBuf>,
    /// Scratch directory for chart files.
    pub chart_dir: PathBuf,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            sqlite_url: sqlite_url_from_path("./data/tracker.db"),
            tick_interval: Duration::from_secs(DEFAULT_TICK_SECS),
            input_timeout: Duration::from_secs(DEFAULT_INPUT_TIMEOUT_SECS),
            chart_command: None,
            chart_dir: env::temp_dir(),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional env vars:
    /// - `SQLITE_PATH` (path or sqlite URL, default: ./data/tracker.db)
    /// - `TRACKER_TICK_SECS` (default: 5)
    /// - `TRACKER_INPUT_TIMEOUT_SECS` (default: 300)
    /// - `TRACKER_CHART_COMMAND`
    /// - `TRACKER_CHART_DIR` (default: OS temp dir)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let sqlite_url = lookup("SQLITE_PATH")
            .map(|path| sqlite_url_from_path(&path))
            .unwrap_or(defaults.sqlite_url);
        let tick_interval = secs_var(&lookup, "TRACKER_TICK_SECS", DEFAULT_TICK_SECS)?;
        let input_timeout =
            secs_var(&lookup, "TRACKER_INPUT_TIMEOUT_SECS", DEFAULT_INPUT_TIMEOUT_SECS)?;
        let chart_command = lookup("TRACKER_CHART_COMMAND")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let chart_dir = lookup("TRACKER_CHART_DIR")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.chart_dir);

        Ok(Self {
            sqlite_url,
            tick_interval,
            input_timeout,
            chart_command,
            chart_dir,
        })
    }
}

fn secs_var<F>(lookup: &F, key: &str, default: u64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(Duration::from_secs(default));
    };
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|_| TrackerError::configuration(format!("{} must be a number of seconds, got {:?}", key, raw)))?;
    if secs == 0 {
        return Err(TrackerError::configuration(format!("{} must be positive", key)));
    }
    Ok(Duration::from_secs(secs))
}

/// Turn a plain path into a SQLite URL that creates the file on demand.
pub fn sqlite_url_from_path(path: &str) -> String {
    if path.starts_with("sqlite:") {
        path.to_string()
    } else {
        format!("sqlite:{}?mode=rwc", path)
    }
}
