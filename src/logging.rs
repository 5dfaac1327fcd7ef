//! Log to a daily file under the data directory; stdout is kept for output.

use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogConfig;

/// Pick the filter directive: ITEMLOG_LOG, then RUST_LOG, then the config.
fn directive(itemlog_log: Option<String>, rust_log: Option<String>, configured: &str) -> String {
  itemlog_log
    .filter(|d| !d.trim().is_empty())
    .or_else(|| rust_log.filter(|d| !d.trim().is_empty()))
    .unwrap_or_else(|| configured.to_string())
}

/// Install the global subscriber. Keep the guard alive until exit so
/// buffered lines are flushed.
pub fn init(config: &LogConfig, data_dir: &Path, verbose: bool) -> Result<WorkerGuard> {
  let appender = RollingFileAppender::builder()
    .rotation(Rotation::DAILY)
    .filename_prefix("itemlog")
    .filename_suffix("log")
    .build(data_dir.join("logs"))
    .map_err(|e| eyre!("Failed to create log file in {}: {}", data_dir.display(), e))?;
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let directive = directive(
    std::env::var("ITEMLOG_LOG").ok(),
    std::env::var("RUST_LOG").ok(),
    &config.level,
  );
  let filter = EnvFilter::try_new(&directive)
    .map_err(|e| eyre!("Invalid log filter '{}': {}", directive, e))?;

  let stderr = verbose.then(|| {
    fmt::layer()
      .with_writer(std::io::stderr)
      .with_target(false)
  });

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .with(stderr)
    .try_init()
    .map_err(|e| eyre!("Failed to install logger: {}", e))?;

  Ok(guard)
}
