use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log filter directive
pub const LOG_ENV: &str = "RANDOMUSERS_LOG";

/// Install the global subscriber.
///
/// Logs go to a daily-rolling file under the data directory so stdout stays
/// clean for program output. `verbose` mirrors them to stderr as well. When
/// the log directory can't be created, logs go to stderr only.
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init(verbose: bool) -> Result<Option<WorkerGuard>> {
  let (file_layer, guard, file_error) = match log_dir().and_then(|dir| file_writer(&dir)) {
    Ok((writer, guard)) => (
      Some(fmt::layer().with_writer(writer).with_ansi(false)),
      Some(guard),
      None,
    ),
    Err(e) => (None, None, Some(e)),
  };

  let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("randomusers=info"));
  let stderr_layer = (verbose || file_error.is_some())
    .then(|| fmt::layer().with_writer(std::io::stderr).with_target(false));

  tracing_subscriber::registry()
    .with(filter)
    .with(file_layer)
    .with(stderr_layer)
    .try_init()
    .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;

  if let Some(e) = file_error {
    warn!("File logging unavailable, logging to stderr: {}", e);
  }

  Ok(guard)
}

fn file_writer(log_dir: &Path) -> Result<(NonBlocking, WorkerGuard)> {
  std::fs::create_dir_all(log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let file_appender = RollingFileAppender::builder()
    .rotation(Rotation::DAILY)
    .filename_prefix("randomusers")
    .filename_suffix("log")
    .build(log_dir)
    .map_err(|e| eyre!("Failed to open log file in {}: {}", log_dir.display(), e))?;
  Ok(tracing_appender::non_blocking(file_appender))
}

fn log_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("randomusers").join("logs"))
}
