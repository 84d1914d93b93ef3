//! Multi-file download orchestrator.
//!
//! [`DownloadEngine`] downloads its configured files strictly one after
//! another and publishes the lifecycle events of the sequence:
//!
//! ```text
//! Start, StartOne(1/n), EndOne(1/n), ..., StartOne(n/n), EndOne(n/n), End
//! ```
//!
//! The first failing file aborts the remaining sequence.
//!
//! # Pause and resume
//!
//! Each run owns a [`CancellationToken`]; every file attempt gets a child
//! token that is handed to all of its workers. [`DownloadEngine::pause`]
//! cancels the run token from any thread and workers stop before their next
//! read. The paused file keeps its chunk state, so
//! [`DownloadEngine::resume`] only fetches the chunks that were not done
//! and skips files that already completed.
//!
//! # Example
//!
//! ```ignore
//! let engine = Arc::new(DownloadEngine::new(config, notifier)?);
//!
//! let runner = Arc::clone(&engine);
//! let handle = thread::spawn(move || runner.start());
//!
//! engine.pause();
//! assert!(handle.join().unwrap().unwrap_err().is_cancelled());
//!
//! engine.resume()?;
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::coordinator::FileDownloader;
use super::source::{HttpSource, RangeSource};
use super::state::FileTask;
use crate::config::DownloadConfig;
use crate::error::{DownloadError, DownloadResult};
use crate::event::{Event, FileEvent};
use crate::notify::Notifier;

/// Lifecycle of a [`DownloadEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    /// Never started.
    Idle,
    Running,
    /// Interrupted by [`DownloadEngine::pause`]; can be resumed.
    Paused,
    Completed,
    Failed,
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineStatus::Idle => "idle",
            EngineStatus::Running => "running",
            EngineStatus::Paused => "paused",
            EngineStatus::Completed => "completed",
            EngineStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Position within the file sequence.
#[derive(Debug, Default)]
struct Session {
    /// Index of the file being downloaded (0-based).
    next_index: usize,
    /// Chunk state of a paused file.
    current: Option<FileTask>,
}

/// Downloads a list of files, one at a time, with parallel chunk fetching.
pub struct DownloadEngine {
    config: DownloadConfig,
    notifier: Notifier,
    source: Arc<dyn RangeSource>,
    /// Held for the whole run; a second caller gets `AlreadyRunning`.
    session: Mutex<Session>,
    cancel: Mutex<CancellationToken>,
    status: Mutex<EngineStatus>,
}

impl fmt::Debug for DownloadEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadEngine")
            .field("files", &self.config.file_count())
            .field("threads", &self.config.threads)
            .field("status", &self.status())
            .finish()
    }
}

impl DownloadEngine {
    /// Create an engine that downloads over HTTP(S).
    ///
    /// When `config.notify` names a remote endpoint, its sink is connected
    /// and added to `notifier`. An unreachable endpoint is logged and
    /// skipped.
    pub fn new(config: DownloadConfig, notifier: Notifier) -> DownloadResult<Self> {
        let source = HttpSource::new(&config)?;
        let notifier = match &config.notify {
            Some(remote) => notifier.with_remote(remote),
            None => notifier,
        };
        Ok(Self::with_source(config, notifier, Arc::new(source)))
    }

    /// Create an engine that reads from a custom [`RangeSource`].
    pub fn with_source(
        config: DownloadConfig,
        notifier: Notifier,
        source: Arc<dyn RangeSource>,
    ) -> Self {
        Self {
            config,
            notifier,
            source,
            session: Mutex::new(Session::default()),
            cancel: Mutex::new(CancellationToken::new()),
            status: Mutex::new(EngineStatus::Idle),
        }
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn status(&self) -> EngineStatus {
        *self.status.lock()
    }

    /// Download every file from the beginning. Blocks until the sequence
    /// completes, fails, or is paused.
    ///
    /// A URL/path count mismatch is reported and returned before any
    /// network activity.
    pub fn start(&self) -> DownloadResult<()> {
        if let Err(e) = self.config.validate() {
            error!(error = %e, "Invalid download configuration");
            self.notifier.notify(&Event::error(e.to_string()));
            return Err(e);
        }

        let mut session = self.session.try_lock().ok_or(DownloadError::AlreadyRunning)?;
        *session = Session::default();
        let cancel = self.begin_run();

        info!(files = self.config.file_count(), "Download started");
        self.notifier.notify(&Event::Start);
        self.run(&mut session, &cancel)
    }

    /// Continue a paused download.
    ///
    /// Files completed before the pause are not fetched again, and the
    /// paused file only fetches its missing chunks. An engine that is not
    /// paused starts over as with [`start`](Self::start).
    pub fn resume(&self) -> DownloadResult<()> {
        if self.status() != EngineStatus::Paused {
            return self.start();
        }

        let mut session = self.session.try_lock().ok_or(DownloadError::AlreadyRunning)?;
        let cancel = self.begin_run();

        let total = self.config.file_count();
        info!(file = session.next_index + 1, total, "Download resumed");
        self.notifier.notify(&Event::info(format!(
            "resuming download at file {}/{}",
            session.next_index + 1,
            total
        )));
        self.run(&mut session, &cancel)
    }

    /// Ask a running download to stop.
    ///
    /// Returns immediately; the blocked `start` or `resume` call returns
    /// [`DownloadError::Cancelled`] once every worker has stopped. Returns
    /// `false` if nothing was running.
    pub fn pause(&self) -> bool {
        if self.status() != EngineStatus::Running {
            return false;
        }
        info!("Pause requested");
        self.cancel.lock().cancel();
        true
    }

    fn begin_run(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.cancel.lock() = token.clone();
        *self.status.lock() = EngineStatus::Running;
        token
    }

    fn run(&self, session: &mut Session, cancel: &CancellationToken) -> DownloadResult<()> {
        let total = self.config.file_count();
        let downloader = FileDownloader::new(self.source.as_ref(), &self.config, &self.notifier);

        for index in session.next_index..total {
            session.next_index = index;
            let url = &self.config.urls[index];
            let destination = &self.config.save_paths[index];
            let file_event = FileEvent {
                url: url.clone(),
                index: index + 1,
                total,
            };

            info!(url = %url, index = index + 1, total, "Starting file");
            self.notifier.notify(&Event::StartOne(file_event.clone()));

            let mut task = session
                .current
                .take()
                .filter(|t| t.matches(url, destination))
                .unwrap_or_else(|| FileTask::new(url.as_str(), destination.as_path()));

            match downloader.run(&mut task, &cancel.child_token()) {
                Ok(()) => {
                    self.notifier.notify(&Event::EndOne(file_event));
                }
                Err(e) if e.is_cancelled() => {
                    session.current = Some(task);
                    *self.status.lock() = EngineStatus::Paused;
                    self.notifier.notify(&Event::info(format!(
                        "download paused at file {}/{}",
                        index + 1,
                        total
                    )));
                    return Err(e);
                }
                Err(e) => {
                    error!(url = %url, error = %e, "Aborting download sequence");
                    self.notifier
                        .notify(&Event::error(format!("failed to download {}: {}", url, e)));
                    *self.status.lock() = EngineStatus::Failed;
                    return Err(e);
                }
            }
        }

        session.next_index = total;
        *self.status.lock() = EngineStatus::Completed;
        info!(files = total, "Download finished");
        self.notifier.notify(&Event::End);
        Ok(())
    }
}
