//! Destination file shared by all workers of a download.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{DownloadError, DownloadResult};

/// A pre-allocated file written at absolute offsets from many threads.
///
/// Workers write disjoint ranges. The seek and write pair is serialized by
/// a lock; network reads are not.
#[derive(Debug)]
pub struct SharedFile {
    path: PathBuf,
    file: Mutex<File>,
}

impl SharedFile {
    /// Create (or truncate) `path` and size it to exactly `size` bytes.
    ///
    /// Missing parent directories are created.
    pub fn create(path: &Path, size: u64) -> DownloadResult<Self> {
        let create_failed = |source: io::Error| DownloadError::FileCreateFailed {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(create_failed)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(create_failed)?;

        file.set_len(size)
            .map_err(|source| DownloadError::FileResizeFailed {
                path: path.to_path_buf(),
                source,
            })?;

        debug!(path = %path.display(), size, "Destination file allocated");
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    /// Reopen a partial download without truncating it.
    ///
    /// Returns `None` when the file is missing or its length is not `size`,
    /// in which case the caller must start the file over.
    pub fn open_existing(path: &Path, size: u64) -> Option<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path).ok()?;
        let len = file.metadata().ok()?.len();
        if len != size {
            debug!(path = %path.display(), len, size, "Partial file does not match remote size");
            return None;
        }
        Some(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write all of `buf` starting at absolute `offset`.
    pub fn write_at(&self, offset: u64, buf: &[u8]) -> io::Result<()> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)
    }

    /// Flush written data to disk.
    pub fn sync(&self) -> io::Result<()> {
        self.file.lock().sync_data()
    }
}
