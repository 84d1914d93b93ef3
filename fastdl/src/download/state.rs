//! Per-file download state.
//!
//! A [`FileTask`] owns the chunk list of one file. Each [`Chunk`] is handed
//! to exactly one worker, which flips its `done` flag once every byte of the
//! range has been written.

use std::path::{Path, PathBuf};

use super::plan::ChunkPlan;

/// An inclusive byte range of the remote file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// First byte offset.
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
    /// Whether the whole range has been written.
    pub done: bool,
}

impl Chunk {
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end,
            done: false,
        }
    }

    /// Number of bytes covered by the chunk.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value of the HTTP `Range` header for this chunk.
    pub fn range_header(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Lifecycle of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStage {
    Pending,
    SizeDiscovery,
    Planning,
    Fetching,
    /// Interrupted by a pause; done chunks are kept for resume.
    Paused,
    Completed,
    Failed,
}

/// One file being downloaded.
#[derive(Debug, Clone)]
pub struct FileTask {
    /// Remote URL.
    pub url: String,
    /// Local destination.
    pub destination: PathBuf,
    /// Authoritative remote size, set once by size discovery.
    total_size: Option<u64>,
    /// Byte ranges sorted by start offset.
    pub chunks: Vec<Chunk>,
    /// Workers used for this file.
    pub workers: usize,
    pub stage: FileStage,
}

impl FileTask {
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
            total_size: None,
            chunks: Vec::new(),
            workers: 0,
            stage: FileStage::Pending,
        }
    }

    /// Create a task for a file of known size with its chunk plan.
    pub fn planned(
        url: impl Into<String>,
        destination: impl Into<PathBuf>,
        total_size: u64,
        plan: ChunkPlan,
    ) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
            total_size: Some(total_size),
            chunks: plan.chunks,
            workers: plan.workers,
            stage: FileStage::Planning,
        }
    }

    pub fn total_size(&self) -> Option<u64> {
        self.total_size
    }

    /// Whether this task belongs to `url` saved at `destination`.
    pub fn matches(&self, url: &str, destination: &Path) -> bool {
        self.url == url && self.destination == destination
    }

    /// Whether size discovery and planning already happened.
    pub fn is_planned(&self) -> bool {
        self.total_size.is_some()
    }

    /// Bytes covered by chunks marked done.
    pub fn completed_bytes(&self) -> u64 {
        self.chunks.iter().filter(|c| c.done).map(Chunk::len).sum()
    }

    /// Number of chunks still to fetch.
    pub fn pending_chunks(&self) -> usize {
        self.chunks.iter().filter(|c| !c.done).count()
    }

    /// Whether every chunk has been written.
    pub fn is_complete(&self) -> bool {
        self.is_planned() && self.chunks.iter().all(|c| c.done)
    }
}
