//! Logging setup.
//!
//! Console logs go to stderr. With a log file configured, a second
//! non-blocking layer writes plain-text logs to that file; the returned
//! guard must be kept alive until exit so buffered lines are flushed.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::CliError;

/// Level used when neither the command line, `RUST_LOG` nor the config
/// file sets one.
pub const DEFAULT_LEVEL: &str = "info";

/// Pick the filter directive: explicit flag, then `RUST_LOG`, then the
/// config file, then [`DEFAULT_LEVEL`].
pub fn resolve_filter(
    cli_level: Option<&str>,
    config_level: Option<&str>,
) -> Result<EnvFilter, CliError> {
    if let Some(level) = cli_level {
        return EnvFilter::try_new(level).map_err(|e| CliError::Logging(e.to_string()));
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(config_level.unwrap_or(DEFAULT_LEVEL))
        .map_err(|e| CliError::Logging(e.to_string()))
}

/// Install the global subscriber.
pub fn init(filter: EnvFilter, log_file: Option<&Path>) -> Result<Option<WorkerGuard>, CliError> {
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(LocalTime::rfc_3339())
        .with_target(false);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| CliError::Logging(format!("invalid log file {}", path.display())))?;
            std::fs::create_dir_all(directory)?;

            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(LocalTime::rfc_3339());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))?;

    Ok(guard)
}
