use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;

const LOG_ENV: &str = "ROLLCALL_LOG";
const LOG_FILE: &str = "rollcall.log";

/// Directory holding the log file: $XDG_DATA_HOME/rollcall
fn log_dir() -> Option<PathBuf> {
  dirs::data_dir().map(|d| d.join("rollcall"))
}

/// Filter directives: ROLLCALL_LOG, then the config's log_level, then "info"
fn filter_directives(env: Option<String>, config: &Config) -> String {
  env
    .filter(|s| !s.trim().is_empty())
    .or_else(|| config.log_level.clone())
    .unwrap_or_else(|| "info".to_string())
}

/// Route tracing output to a log file, since the terminal belongs to the UI.
///
/// The returned guard flushes buffered lines when dropped and must be held
/// for the lifetime of the app.
pub fn init(config: &Config) -> Result<WorkerGuard> {
  let dir = log_dir().ok_or_else(|| eyre!("Could not determine data directory"))?;
  std::fs::create_dir_all(&dir)?;

  let appender = tracing_appender::rolling::never(&dir, LOG_FILE);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let directives = filter_directives(std::env::var(LOG_ENV).ok(), config);
  let filter = EnvFilter::try_new(&directives)
    .map_err(|e| eyre!("Invalid log filter {:?}: {}", directives, e))?;

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .with(filter)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}
