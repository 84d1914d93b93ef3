//! CLI error type.

use std::io;

use fastdl::config::ConfigError;
use fastdl::DownloadError;
use thiserror::Error;

/// Exit code used when a download was paused with Ctrl-C.
pub const EXIT_PAUSED: i32 = 130;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("failed to initialize logging: {0}")]
    Logging(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("download paused")]
    Paused,
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Paused => EXIT_PAUSED,
            CliError::Config(_) | CliError::ConfigFile(_) => 2,
            _ => 1,
        }
    }
}
