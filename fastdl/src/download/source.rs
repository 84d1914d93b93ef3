//! Remote byte-range sources.
//!
//! [`RangeSource`] is the seam between the engine and the network. The
//! engine only needs two things from a server: the size of a file and a
//! reader over one byte range of it. [`HttpSource`] provides both over
//! HTTP(S) with a blocking `reqwest` client; tests substitute in-memory
//! sources.

use std::fmt;
use std::io::Read;

use reqwest::blocking::Client;
use reqwest::header::{CONTENT_LENGTH, RANGE};
use reqwest::StatusCode;
use tracing::{debug, trace};

use super::state::Chunk;
use crate::config::DownloadConfig;
use crate::error::{DownloadError, DownloadResult, FetchError};

/// How the server answered a range request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeStatus {
    /// 206: the body holds exactly the requested range.
    Partial,
    /// 200: the range was ignored and the body starts at byte 0.
    Full,
}

/// Response body of a range request.
pub struct RangeBody {
    pub status: RangeStatus,
    pub reader: Box<dyn Read + Send>,
}

impl RangeBody {
    pub fn new(status: RangeStatus, reader: impl Read + Send + 'static) -> Self {
        Self {
            status,
            reader: Box::new(reader),
        }
    }
}

impl fmt::Debug for RangeBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeBody")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// A server that can report file sizes and serve byte ranges.
///
/// Implementations are shared by every worker of a file and must be
/// thread-safe.
pub trait RangeSource: Send + Sync {
    /// Discover the size of the remote file.
    ///
    /// Fails with [`DownloadError::SizeDiscoveryFailed`] when the size
    /// cannot be determined.
    fn content_length(&self, url: &str) -> DownloadResult<u64>;

    /// Open a reader over the bytes of `chunk`.
    fn open_range(&self, url: &str, chunk: &Chunk) -> Result<RangeBody, FetchError>;
}

/// [`RangeSource`] backed by a blocking HTTP client.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    /// Build a client with the timeouts and TLS settings from `config`.
    pub fn new(config: &DownloadConfig) -> DownloadResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("fastdl/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| DownloadError::HttpClient(e.to_string()))?;

        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl RangeSource for HttpSource {
    fn content_length(&self, url: &str) -> DownloadResult<u64> {
        let failed = |reason: String| DownloadError::SizeDiscoveryFailed {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .head(url)
            .send()
            .map_err(|e| failed(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(failed(format!(
                "HEAD request failed with status {}",
                response.status()
            )));
        }

        let header = response
            .headers()
            .get(CONTENT_LENGTH)
            .ok_or_else(|| failed("missing Content-Length header".to_string()))?;

        let size = header
            .to_str()
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .ok_or_else(|| failed(format!("invalid Content-Length header: {:?}", header)))?;

        debug!(url, size, "Discovered remote size");
        Ok(size)
    }

    fn open_range(&self, url: &str, chunk: &Chunk) -> Result<RangeBody, FetchError> {
        let response = self
            .client
            .get(url)
            .header(RANGE, chunk.range_header())
            .send()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = match response.status() {
            StatusCode::PARTIAL_CONTENT => RangeStatus::Partial,
            StatusCode::OK => RangeStatus::Full,
            other => return Err(FetchError::HttpStatus(other.as_u16())),
        };

        trace!(url, start = chunk.start, end = chunk.end, ?status, "Range opened");
        Ok(RangeBody::new(status, response))
    }
}
