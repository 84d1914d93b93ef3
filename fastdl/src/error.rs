//! Error types for the download engine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for engine operations.
pub type DownloadResult<T> = Result<T, DownloadError>;

/// Errors produced while fetching a single byte range.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the connection failed.
    #[error("request failed: {0}")]
    Request(String),

    /// The server answered with a status other than 200 or 206.
    #[error("HTTP error: {0}")]
    HttpStatus(u16),

    /// Reading the response body failed.
    #[error("read error: {0}")]
    Read(#[source] io::Error),

    /// Writing to the destination file failed.
    #[error("write error at offset {offset}: {source}")]
    Write {
        offset: u64,
        #[source]
        source: io::Error,
    },

    /// The fetch observed a cancellation request.
    #[error("fetch cancelled")]
    Cancelled,
}

/// Errors that can occur while downloading files.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The number of URLs does not match the number of save paths.
    #[error("URL count ({urls}) does not match save path count ({paths})")]
    ConfigMismatch { urls: usize, paths: usize },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The HTTP client could not be created.
    #[error("failed to create HTTP client: {0}")]
    HttpClient(String),

    /// The remote size could not be determined.
    #[error("failed to get file size of {url}: {reason}")]
    SizeDiscoveryFailed { url: String, reason: String },

    /// The destination file could not be created.
    #[error("failed to create {}: {source}", path.display())]
    FileCreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The destination file could not be resized to the remote size.
    #[error("failed to set size of {}: {source}", path.display())]
    FileResizeFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A chunk could not be fetched.
    #[error("failed to fetch bytes {start}-{end} of {url}: {source}")]
    ChunkFetchFailed {
        url: String,
        start: u64,
        end: u64,
        #[source]
        source: FetchError,
    },

    /// Writing downloaded bytes to disk failed.
    #[error("failed to write {} at offset {offset}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        offset: u64,
        #[source]
        source: io::Error,
    },

    /// The download was paused before it finished.
    #[error("download paused")]
    Cancelled,

    /// The engine is already running a download sequence.
    #[error("download already in progress")]
    AlreadyRunning,
}

impl DownloadError {
    /// Whether this error is the result of a pause request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
