//! Chart rendering seam.
//!
//! The tracker only builds the chart payload; drawing is delegated to a
//! [`ChartRenderer`]. [`CommandChartRenderer`] shells out to an external
//! executable and cleans up its scratch files whatever the outcome.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::stats::ChartNode;

/// Upper bound on one renderer run.
pub const RENDER_TIMEOUT: Duration = Duration::from_secs(60);

static NEXT_FILE: AtomicU64 = AtomicU64::new(0);

/// Draws a chart for a node list and returns the image bytes.
#[async_trait]
pub trait ChartRenderer: Send + Sync {
    async fn render(&self, title: &str, nodes: &[ChartNode]) -> Result<Vec<u8>>;
}

/// JSON handed to external renderers.
#[derive(Debug, Serialize)]
pub struct ChartPayload<'a> {
    pub title: &'a str,
    pub nodes: &'a [ChartNode],
}

/// Scratch file for one render.
///
/// [`ChartFile::remove`] deletes it without blocking the runtime. A file
/// still around on drop (the render future was cancelled) is removed
/// synchronously.
#[derive(Debug)]
pub struct ChartFile {
    path: PathBuf,
    removed: bool,
}

impl ChartFile {
    /// Reserve a unique path in `dir`. Nothing is created on disk.
    pub fn new(dir: &Path, extension: &str) -> Self {
        let n = NEXT_FILE.fetch_add(1, Ordering::Relaxed);
        let name = format!("tracker-chart-{}-{}.{}", std::process::id(), n, extension);
        Self {
            path: dir.join(name),
            removed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn remove(mut self) {
        self.removed = true;
        log_removal(&self.path, tokio::fs::remove_file(&self.path).await);
    }
}

impl Drop for ChartFile {
    fn drop(&mut self) {
        if !self.removed {
            log_removal(&self.path, std::fs::remove_file(&self.path));
        }
    }
}

fn log_removal(path: &Path, result: std::io::Result<()>) {
    match result {
        Ok(()) => debug!("Removed chart file {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove chart file {}: {}", path.display(), e),
    }
}

/// Runs `<command> <input.json> <output.png>`.
#[derive(Debug, Clone)]
pub struct CommandChartRenderer {
    command: PathBuf,
    dir: PathBuf,
}

impl CommandChartRenderer {
    pub fn new(command: impl Into<PathBuf>, dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            dir: dir.into(),
        }
    }

    /// A renderer for the configured command, if there is one.
    pub fn from_config(config: &TrackerConfig) -> Option<Self> {
        config
            .chart_command
            .as_ref()
            .map(|command| Self::new(command, &config.chart_dir))
    }
}

fn render_error(context: &str, e: impl std::fmt::Display) -> TrackerError {
    TrackerError::Render(format!("{}: {}", context, e))
}

#[async_trait]
impl ChartRenderer for CommandChartRenderer {
    async fn render(&self, title: &str, nodes: &[ChartNode]) -> Result<Vec<u8>> {
        let input = ChartFile::new(&self.dir, "json");
        let output = ChartFile::new(&self.dir, "png");

        let result = self.run(title, nodes, &input, &output).await;
        input.remove().await;
        output.remove().await;
        result
    }
}

impl CommandChartRenderer {
    async fn run(
        &self,
        title: &str,
        nodes: &[ChartNode],
        input: &ChartFile,
        output: &ChartFile,
    ) -> Result<Vec<u8>> {
        let payload = serde_json::to_vec(&ChartPayload { title, nodes })
            .map_err(|e| render_error("encoding chart data", e))?;
        tokio::fs::write(input.path(), payload)
            .await
            .map_err(|e| render_error("writing chart data", e))?;

        debug!(command = %self.command.display(), nodes = nodes.len(), "Rendering chart");

        let run = Command::new(&self.command)
            .arg(input.path())
            .arg(output.path())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();
        let finished = tokio::time::timeout(RENDER_TIMEOUT, run)
            .await
            .map_err(|_| TrackerError::Render(format!("renderer timed out after {:?}", RENDER_TIMEOUT)))?
            .map_err(|e| render_error("starting renderer", e))?;

        if !finished.status.success() {
            let stderr = String::from_utf8_lossy(&finished.stderr);
            return Err(TrackerError::Render(format!(
                "{} exited with {}: {}",
                self.command.display(),
                finished.status,
                stderr.trim()
            )));
        }

        let bytes = tokio::fs::read(output.path())
            .await
            .map_err(|e| render_error("reading chart image", e))?;
        if bytes.is_empty() {
            return Err(TrackerError::Render("renderer produced an empty image".to_string()));
        }
        Ok(bytes)
    }
}
