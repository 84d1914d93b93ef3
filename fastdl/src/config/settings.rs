//! Resolved engine settings.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{DownloadError, DownloadResult};

/// Default number of worker threads per file.
pub const DEFAULT_THREADS: usize = 4;

/// Default TCP connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Transport used for the remote notification endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Newline-delimited JSON over a persistent TCP connection.
    Socket,
    /// One text frame per event over a WebSocket connection.
    WebSocket,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Socket => write!(f, "socket"),
            Transport::WebSocket => write!(f, "websocket"),
        }
    }
}

impl FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "socket" | "tcp" => Ok(Transport::Socket),
            "websocket" | "ws" => Ok(Transport::WebSocket),
            other => Err(format!("unknown transport '{}'", other)),
        }
    }
}

/// Remote notification endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyConfig {
    /// `host:port` for sockets, a base URL for WebSockets.
    pub endpoint: String,
    pub transport: Transport,
}

impl NotifyConfig {
    pub fn new(endpoint: impl Into<String>, transport: Transport) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport,
        }
    }
}

/// Settings for one download sequence.
///
/// `urls` and `save_paths` are paired by position; [`validate`](Self::validate)
/// rejects lists of different length.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Remote files, downloaded in order.
    pub urls: Vec<String>,
    /// Destination of each URL.
    pub save_paths: Vec<PathBuf>,
    /// Maximum worker threads per file (minimum 1).
    pub threads: usize,
    /// Chunk size in bytes. Zero derives it from the file size and thread count.
    pub chunk_size: u64,
    /// TCP connect timeout for HEAD and GET requests.
    pub connect_timeout: Duration,
    /// Overall per-request timeout, including body streaming.
    pub request_timeout: Option<Duration>,
    /// Skip TLS certificate verification.
    pub accept_invalid_certs: bool,
    /// Minimum time between progress updates. `None` reports on every read.
    pub report_interval: Option<Duration>,
    /// Optional remote notification endpoint.
    pub notify: Option<NotifyConfig>,
}

impl DownloadConfig {
    /// Create a config with default tuning for the given files.
    pub fn new(urls: Vec<String>, save_paths: Vec<PathBuf>) -> Self {
        Self {
            urls,
            save_paths,
            threads: DEFAULT_THREADS,
            chunk_size: 0,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: None,
            accept_invalid_certs: false,
            report_interval: None,
            notify: None,
        }
    }

    /// Set the worker thread count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Set the chunk size in bytes.
    pub fn with_chunk_size(mut self, bytes: u64) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// Set the chunk size in mebibytes.
    pub fn with_chunk_size_mb(self, mb: u64) -> Self {
        self.with_chunk_size(mb.saturating_mul(1024 * 1024))
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Throttle progress updates to at most one per `interval`.
    pub fn with_report_interval(mut self, interval: Option<Duration>) -> Self {
        self.report_interval = interval;
        self
    }

    pub fn with_notify(mut self, notify: Option<NotifyConfig>) -> Self {
        self.notify = notify;
        self
    }

    /// Number of files in this sequence.
    pub fn file_count(&self) -> usize {
        self.urls.len()
    }

    /// Check the preconditions that must hold before any work begins.
    pub fn validate(&self) -> DownloadResult<()> {
        if self.urls.len() != self.save_paths.len() {
            return Err(DownloadError::ConfigMismatch {
                urls: self.urls.len(),
                paths: self.save_paths.len(),
            });
        }
        if self.threads == 0 {
            return Err(DownloadError::InvalidConfig(
                "thread count must be at least 1".to_string(),
            ));
        }
        if let Some(url) = self.urls.iter().find(|u| u.trim().is_empty()) {
            return Err(DownloadError::InvalidConfig(format!(
                "empty URL in download list: '{}'",
                url
            )));
        }
        Ok(())
    }
}
