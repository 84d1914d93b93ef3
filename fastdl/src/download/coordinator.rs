//! File download coordinator.
//!
//! Drives one [`FileTask`] end to end:
//!
//! ```text
//! SizeDiscovery ──► Planning ──► Fetching ──┬──► Completed
//!       │              │            │       ├──► Failed
//!       └──────────────┴────────────┴───────┴──► Paused (cancelled)
//! ```
//!
//! Fetching spawns scoped worker threads that pull chunks from a shared
//! queue, so each chunk is fetched by exactly one worker. After the first
//! failure no further chunks are handed out; workers already streaming a
//! chunk run to completion or their own failure before the coordinator
//! returns the first error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::fetch::RangeFetcher;
use super::file::SharedFile;
use super::plan::plan;
use super::progress::ProgressTracker;
use super::source::RangeSource;
use super::state::{FileStage, FileTask};
use crate::config::DownloadConfig;
use crate::error::{DownloadError, DownloadResult, FetchError};
use crate::event::Event;
use crate::notify::Notifier;

/// Downloads a single file.
pub struct FileDownloader<'a> {
    source: &'a dyn RangeSource,
    config: &'a DownloadConfig,
    notifier: &'a Notifier,
}

impl<'a> FileDownloader<'a> {
    pub fn new(
        source: &'a dyn RangeSource,
        config: &'a DownloadConfig,
        notifier: &'a Notifier,
    ) -> Self {
        Self {
            source,
            config,
            notifier,
        }
    }

    /// Download `task`, or continue it when it was paused earlier.
    ///
    /// A planned task whose remote size is unchanged and whose partial file
    /// is still intact keeps its done chunks; anything else starts over.
    /// Fatal errors are reported as `Msg` events and returned. A pause
    /// returns [`DownloadError::Cancelled`] with the task left in
    /// [`FileStage::Paused`].
    pub fn run(&self, task: &mut FileTask, cancel: &CancellationToken) -> DownloadResult<()> {
        if cancel.is_cancelled() {
            task.stage = FileStage::Paused;
            return Err(DownloadError::Cancelled);
        }

        task.stage = FileStage::SizeDiscovery;
        let total_size = match self.source.content_length(&task.url) {
            Ok(size) => size,
            Err(e) => return Err(self.fail(task, e)),
        };

        task.stage = FileStage::Planning;
        let file = match self.prepare(task, total_size) {
            Ok(file) => file,
            Err(e) => return Err(self.fail(task, e)),
        };

        task.stage = FileStage::Fetching;
        let progress = ProgressTracker::resumed(
            total_size,
            task.completed_bytes(),
            self.config.report_interval,
        );
        self.notifier.notify(&Event::Update(progress.initial()));

        if let Some(e) = self.fetch_all(task, &file, &progress, cancel) {
            if e.is_cancelled() {
                info!(url = %task.url, remaining = task.pending_chunks(), "Download paused");
                task.stage = FileStage::Paused;
            } else {
                task.stage = FileStage::Failed;
            }
            return Err(e);
        }

        if let Err(e) = file.sync() {
            warn!(path = %file.path().display(), error = %e, "Failed to sync destination file");
        }
        self.notifier.notify(&Event::Update(progress.finish()));
        task.stage = FileStage::Completed;
        info!(url = %task.url, size = total_size, "File complete");
        Ok(())
    }

    /// Reuse the partial file of a paused task, or plan and allocate anew.
    fn prepare(&self, task: &mut FileTask, total_size: u64) -> DownloadResult<SharedFile> {
        if task.total_size() == Some(total_size) {
            if let Some(file) = SharedFile::open_existing(&task.destination, total_size) {
                debug!(
                    url = %task.url,
                    pending = task.pending_chunks(),
                    "Continuing partial download"
                );
                return Ok(file);
            }
        } else if task.is_planned() {
            info!(url = %task.url, "Remote size changed, starting file over");
        }

        let chunk_plan = plan(total_size, self.config.threads, self.config.chunk_size);
        if chunk_plan.downgraded {
            let text = format!(
                "chunk size {} exceeds file size {} of {}, downloading with a single thread",
                self.config.chunk_size, total_size, task.url
            );
            warn!("{}", text);
            self.notifier.notify(&Event::warning(text));
        }
        debug!(
            url = %task.url,
            chunks = chunk_plan.chunks.len(),
            workers = chunk_plan.workers,
            "Planned chunks"
        );

        let url = std::mem::take(&mut task.url);
        let destination = std::mem::take(&mut task.destination);
        *task = FileTask::planned(url, destination, total_size, chunk_plan);

        SharedFile::create(&task.destination, total_size)
    }

    /// Run the workers. Returns the first error observed, if any.
    fn fetch_all(
        &self,
        task: &mut FileTask,
        file: &SharedFile,
        progress: &ProgressTracker,
        cancel: &CancellationToken,
    ) -> Option<DownloadError> {
        let workers = task.workers.min(task.pending_chunks()).max(1);
        info!(
            url = %task.url,
            workers,
            chunks = task.pending_chunks(),
            "Fetching"
        );

        let fetcher = RangeFetcher {
            source: self.source,
            url: &task.url,
            file,
            progress,
            notifier: self.notifier,
            cancel,
        };
        let queue = Mutex::new(task.chunks.iter_mut().filter(|c| !c.done));
        let failed = AtomicBool::new(false);
        let first_error: Mutex<Option<DownloadError>> = Mutex::new(None);

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    if failed.load(Ordering::SeqCst) {
                        break;
                    }
                    let Some(chunk) = queue.lock().next() else {
                        break;
                    };
                    let (start, end) = (chunk.start, chunk.end);

                    if let Err(e) = fetcher.fetch(chunk) {
                        let err = self.chunk_error(fetcher.url, file, start, end, e);
                        if !err.is_cancelled() {
                            error!(error = %err, "Chunk failed");
                            self.notifier.notify(&Event::error(err.to_string()));
                        }
                        failed.store(true, Ordering::SeqCst);
                        first_error.lock().get_or_insert(err);
                        break;
                    }
                });
            }
        });

        first_error.into_inner()
    }

    fn chunk_error(
        &self,
        url: &str,
        file: &SharedFile,
        start: u64,
        end: u64,
        error: FetchError,
    ) -> DownloadError {
        match error {
            FetchError::Cancelled => DownloadError::Cancelled,
            FetchError::Write { offset, source } => DownloadError::WriteFailed {
                path: file.path().to_path_buf(),
                offset,
                source,
            },
            source => DownloadError::ChunkFetchFailed {
                url: url.to_string(),
                start,
                end,
                source,
            },
        }
    }

    fn fail(&self, task: &mut FileTask, error: DownloadError) -> DownloadError {
        error!(url = %task.url, error = %error, "File download failed");
        self.notifier.notify(&Event::error(error.to_string()));
        task.stage = FileStage::Failed;
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::source::{RangeBody, RangeStatus};
    use crate::download::state::Chunk;
    use crate::event::MessageLevel;
    use crate::notify::CallbackSink;
    use std::fs;
    use std::io::{Cursor, Read};
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct MemorySource {
        data: Vec<u8>,
        fail_at: Option<u64>,
        opened: AtomicUsize,
    }

    impl MemorySource {
        fn new(data: Vec<u8>) -> Self {
            Self {
                data,
                fail_at: None,
                opened: AtomicUsize::new(0),
            }
        }
    }

    impl RangeSource for MemorySource {
        fn content_length(&self, url: &str) -> DownloadResult<u64> {
            if url.ends_with("missing") {
                return Err(DownloadError::SizeDiscoveryFailed {
                    url: url.to_string(),
                    reason: "HEAD request failed with status 404 Not Found".to_string(),
                });
            }
            Ok(self.data.len() as u64)
        }

        fn open_range(&self, _url: &str, chunk: &Chunk) -> Result<RangeBody, FetchError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            if self.fail_at == Some(chunk.start) {
                return Err(FetchError::HttpStatus(500));
            }
            let body = self.data[chunk.start as usize..=chunk.end as usize].to_vec();
            Ok(RangeBody::new(RangeStatus::Partial, Cursor::new(body)))
        }
    }

    fn recorder() -> (Notifier, Arc<Mutex<Vec<Event>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = Arc::clone(&events);
        let notifier = Notifier::new().with_sink(CallbackSink::new(move |e: &Event| {
            events_clone.lock().push(e.clone())
        }));
        (notifier, events)
    }

    fn config(dest: PathBuf, threads: usize, chunk_size: u64) -> DownloadConfig {
        DownloadConfig::new(vec!["mem://file".to_string()], vec![dest])
            .with_threads(threads)
            .with_chunk_size(chunk_size)
    }

    fn data(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 256) as u8).collect()
    }

    fn added_sum(events: &[Event]) -> u64 {
        events
            .iter()
            .filter_map(|e| match e {
                Event::Update(u) => Some(u.added),
                _ => None,
            })
            .sum()
    }

    #[test]
    fn test_downloads_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.bin");
        let body = data(1_000_000);
        let source = MemorySource::new(body.clone());
        let config = config(dest.clone(), 4, 100_000);
        let (notifier, events) = recorder();

        let mut task = FileTask::new("mem://file", &dest);
        FileDownloader::new(&source, &config, &notifier)
            .run(&mut task, &CancellationToken::new())
            .unwrap();

        assert_eq!(task.stage, FileStage::Completed);
        assert_eq!(task.chunks.len(), 10);
        assert!(task.is_complete());
        assert_eq!(source.opened.load(Ordering::SeqCst), 10);
        assert_eq!(fs::read(&dest).unwrap(), body);
        assert_eq!(added_sum(&events.lock()), 1_000_000);
    }

    /// Counts ranges that are open at the same time.
    #[derive(Default)]
    struct GaugedSource {
        data: Vec<u8>,
        active: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        opened: AtomicUsize,
    }

    struct GaugedReader {
        body: Cursor<Vec<u8>>,
        active: Arc<AtomicUsize>,
        first_read: bool,
    }

    impl Read for GaugedReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.first_read {
                self.first_read = false;
                std::thread::sleep(std::time::Duration::from_millis(100));
            }
            self.body.read(buf)
        }
    }

    impl Drop for GaugedReader {
        fn drop(&mut self) {
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl RangeSource for GaugedSource {
        fn content_length(&self, _url: &str) -> DownloadResult<u64> {
            Ok(self.data.len() as u64)
        }

        fn open_range(&self, _url: &str, chunk: &Chunk) -> Result<RangeBody, FetchError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let body = self.data[chunk.start as usize..=chunk.end as usize].to_vec();
            Ok(RangeBody::new(
                RangeStatus::Partial,
                GaugedReader {
                    body: Cursor::new(body),
                    active: Arc::clone(&self.active),
                    first_read: true,
                },
            ))
        }
    }

    fn peak_workers(threads: usize, size: usize, chunk_size: u64) -> (usize, usize) {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.bin");
        let source = GaugedSource {
            data: data(size),
            ..Default::default()
        };
        let config = config(dest.clone(), threads, chunk_size);
        let notifier = Notifier::new();

        let mut task = FileTask::new("mem://file", &dest);
        FileDownloader::new(&source, &config, &notifier)
            .run(&mut task, &CancellationToken::new())
            .unwrap();

        assert_eq!(fs::read(&dest).unwrap(), source.data);
        (
            source.peak.load(Ordering::SeqCst),
            source.opened.load(Ordering::SeqCst),
        )
    }

    #[test]
    fn test_workers_capped_by_chunk_count() {
        // 8 threads requested, 4 chunks planned.
        let (peak, opened) = peak_workers(8, 4000, 1000);
        assert_eq!(peak, 4);
        assert_eq!(opened, 4);
    }

    #[test]
    fn test_workers_capped_by_thread_count() {
        let (peak, opened) = peak_workers(2, 8000, 1000);
        assert_eq!(peak, 2);
        assert_eq!(opened, 8);
    }

    #[test]
    fn test_first_update_has_zero_added() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.bin");
        let source = MemorySource::new(data(100));
        let config = config(dest.clone(), 2, 0);
        let (notifier, events) = recorder();

        let mut task = FileTask::new("mem://file", &dest);
        FileDownloader::new(&source, &config, &notifier)
            .run(&mut task, &CancellationToken::new())
            .unwrap();

        let events = events.lock();
        match events.first() {
            Some(Event::Update(u)) => assert_eq!(u.added, 0),
            other => panic!("expected initial update, got {:?}", other),
        }
    }

    #[test]
    fn test_downgrade_emits_warning() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.bin");
        let source = MemorySource::new(data(1000));
        let config = config(dest.clone(), 8, 5000);
        let (notifier, events) = recorder();

        let mut task = FileTask::new("mem://file", &dest);
        FileDownloader::new(&source, &config, &notifier)
            .run(&mut task, &CancellationToken::new())
            .unwrap();

        assert_eq!(task.workers, 1);
        assert_eq!(task.chunks.len(), 1);
        assert!(events.lock().iter().any(|e| matches!(
            e,
            Event::Msg(m) if m.level == MessageLevel::Warning
        )));
    }

    #[test]
    fn test_size_discovery_failure() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.bin");
        let source = MemorySource::new(data(10));
        let config = config(dest.clone(), 2, 0);
        let (notifier, events) = recorder();

        let mut task = FileTask::new("mem://missing", &dest);
        let result = FileDownloader::new(&source, &config, &notifier)
            .run(&mut task, &CancellationToken::new());

        assert!(matches!(result, Err(DownloadError::SizeDiscoveryFailed { .. })));
        assert_eq!(task.stage, FileStage::Failed);
        assert!(!dest.exists());
        assert!(matches!(
            events.lock().as_slice(),
            [Event::Msg(m)] if m.level == MessageLevel::Error
        ));
    }

    #[test]
    fn test_chunk_failure_is_surfaced() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.bin");
        let mut source = MemorySource::new(data(1000));
        source.fail_at = Some(500);
        let config = config(dest.clone(), 1, 100);
        let (notifier, events) = recorder();

        let mut task = FileTask::new("mem://file", &dest);
        let result = FileDownloader::new(&source, &config, &notifier)
            .run(&mut task, &CancellationToken::new());

        match result {
            Err(DownloadError::ChunkFetchFailed { start, end, source, .. }) => {
                assert_eq!((start, end), (500, 599));
                assert!(matches!(source, FetchError::HttpStatus(500)));
            }
            other => panic!("expected ChunkFetchFailed, got {:?}", other),
        }
        assert_eq!(task.stage, FileStage::Failed);
        // A single worker stops handing out chunks after the failure.
        assert_eq!(task.completed_bytes(), 500);
        assert_eq!(source.opened.load(Ordering::SeqCst), 6);
        assert!(events.lock().iter().any(|e| matches!(
            e,
            Event::Msg(m) if m.level == MessageLevel::Error
        )));
    }

    #[test]
    fn test_cancelled_before_start() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.bin");
        let source = MemorySource::new(data(10));
        let config = config(dest.clone(), 2, 0);
        let notifier = Notifier::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut task = FileTask::new("mem://file", &dest);
        let result = FileDownloader::new(&source, &config, &notifier).run(&mut task, &cancel);

        assert!(matches!(result, Err(DownloadError::Cancelled)));
        assert_eq!(task.stage, FileStage::Paused);
        assert_eq!(source.opened.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_resume_fetches_only_pending_chunks() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.bin");
        let body = data(1000);
        let source = MemorySource::new(body.clone());
        let config = config(dest.clone(), 2, 250);
        let (notifier, events) = recorder();

        // Simulate a paused attempt: first two chunks already on disk.
        let mut task = FileTask::planned("mem://file", &dest, 1000, plan(1000, 2, 250));
        let file = SharedFile::create(&dest, 1000).unwrap();
        file.write_at(0, &body[..500]).unwrap();
        drop(file);
        task.chunks[0].done = true;
        task.chunks[1].done = true;
        task.stage = FileStage::Paused;

        FileDownloader::new(&source, &config, &notifier)
            .run(&mut task, &CancellationToken::new())
            .unwrap();

        assert_eq!(source.opened.load(Ordering::SeqCst), 2);
        assert_eq!(fs::read(&dest).unwrap(), body);
        assert_eq!(added_sum(&events.lock()), 500);
    }

    #[test]
    fn test_resume_with_missing_file_starts_over() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.bin");
        let body = data(1000);
        let source = MemorySource::new(body.clone());
        let config = config(dest.clone(), 2, 250);
        let notifier = Notifier::new();

        let mut task = FileTask::planned("mem://file", &dest, 1000, plan(1000, 2, 250));
        task.chunks[0].done = true;

        FileDownloader::new(&source, &config, &notifier)
            .run(&mut task, &CancellationToken::new())
            .unwrap();

        assert_eq!(source.opened.load(Ordering::SeqCst), 4);
        assert_eq!(fs::read(&dest).unwrap(), body);
    }

    #[test]
    fn test_empty_remote_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("empty.bin");
        let source = MemorySource::new(Vec::new());
        let config = config(dest.clone(), 4, 0);
        let notifier = Notifier::new();

        let mut task = FileTask::new("mem://file", &dest);
        FileDownloader::new(&source, &config, &notifier)
            .run(&mut task, &CancellationToken::new())
            .unwrap();

        assert_eq!(fs::metadata(&dest).unwrap().len(), 0);
        assert_eq!(source.opened.load(Ordering::SeqCst), 0);
    }
}
