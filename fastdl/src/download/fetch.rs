//! Range fetch worker.
//!
//! Streams one [`Chunk`] from a [`RangeSource`] into the [`SharedFile`] at
//! the chunk's offset, publishing progress after every non-empty read.

use std::io::{self, Read};

use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::file::SharedFile;
use super::progress::ProgressTracker;
use super::source::{RangeSource, RangeStatus};
use super::state::Chunk;
use crate::error::FetchError;
use crate::event::Event;
use crate::notify::Notifier;

/// Size of each body read (64 KiB).
pub const BUFFER_SIZE: usize = 64 * 1024;

/// Everything a worker needs to fetch the chunks of one file.
pub struct RangeFetcher<'a> {
    pub source: &'a dyn RangeSource,
    pub url: &'a str,
    pub file: &'a SharedFile,
    pub progress: &'a ProgressTracker,
    pub notifier: &'a Notifier,
    pub cancel: &'a CancellationToken,
}

impl RangeFetcher<'_> {
    /// Fetch `chunk` and mark it done.
    ///
    /// The cancellation token is checked before every read. The chunk is
    /// left untouched on error so a later attempt fetches it again.
    pub fn fetch(&self, chunk: &mut Chunk) -> Result<(), FetchError> {
        self.check_cancelled()?;

        let mut body = self.source.open_range(self.url, chunk)?;
        let mut buffer = vec![0u8; BUFFER_SIZE];

        if body.status == RangeStatus::Full && chunk.start > 0 {
            trace!(url = self.url, skip = chunk.start, "Server ignored range, skipping prefix");
            self.skip(&mut body.reader, chunk.start, &mut buffer)?;
        }

        let mut offset = chunk.start;
        let mut remaining = chunk.len();
        while remaining > 0 {
            self.check_cancelled()?;

            let want = remaining.min(BUFFER_SIZE as u64) as usize;
            let n = read_some(&mut body.reader, &mut buffer[..want])?;

            self.file
                .write_at(offset, &buffer[..n])
                .map_err(|source| FetchError::Write { offset, source })?;

            offset += n as u64;
            remaining -= n as u64;
            self.progress.add(n as u64);
            if let Some(update) = self.progress.report() {
                self.notifier.notify(&Event::Update(update));
            }
        }

        chunk.done = true;
        trace!(url = self.url, start = chunk.start, end = chunk.end, "Chunk done");
        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), FetchError> {
        if self.cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        Ok(())
    }

    /// Discard `count` bytes of a full-body response.
    fn skip(&self, reader: &mut dyn Read, count: u64, buffer: &mut [u8]) -> Result<(), FetchError> {
        let mut remaining = count;
        while remaining > 0 {
            self.check_cancelled()?;
            let want = remaining.min(buffer.len() as u64) as usize;
            remaining -= read_some(reader, &mut buffer[..want])? as u64;
        }
        Ok(())
    }
}

/// Read at least one byte. A body that ends early is an error.
fn read_some(reader: &mut dyn Read, buffer: &mut [u8]) -> Result<usize, FetchError> {
    loop {
        match reader.read(buffer) {
            Ok(0) => {
                return Err(FetchError::Read(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "response body ended before the end of the range",
                )))
            }
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(FetchError::Read(e)),
        }
    }
}
