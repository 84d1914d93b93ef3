//! Configuration for the download engine.
//!
//! Two layers are provided:
//! - [`DownloadConfig`]: the fully-resolved settings handed to the engine
//! - [`ConfigFile`]: optional INI defaults loaded from disk
//!
//! Callers resolve values with the precedence CLI flag > config file >
//! built-in default, then call [`DownloadConfig::validate`] before any
//! network activity.
//!
//! # Example
//!
//! ```ignore
//! use fastdl::config::{ConfigFile, DownloadConfig};
//!
//! let file = ConfigFile::load_or_default(&ConfigFile::default_path().unwrap())?;
//! let config = file.apply(DownloadConfig::new(urls, paths)).with_threads(16);
//! config.validate()?;
//! ```

mod file;
mod settings;

pub use file::{ConfigError, ConfigFile, DownloadSection, LoggingSection, NotifySection};
pub use settings::{
    DownloadConfig, NotifyConfig, Transport, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_THREADS,
};
