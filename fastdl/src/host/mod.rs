//! Handle-based access to download engines.
//!
//! Embedding hosts (language bindings, daemons) refer to downloads by an
//! integer handle rather than by owning a [`DownloadEngine`]. A
//! [`DownloadHost`] owns the engines and maps handles to them. Handles are
//! never reused for the lifetime of the host.
//!
//! `start`, `start_multi` and `resume` block the calling thread until the
//! sequence ends, exactly like the engine methods. `pause` can be called
//! from any other thread.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;

use crate::config::{DownloadConfig, NotifyConfig};
use crate::download::{DownloadEngine, EngineStatus};
use crate::error::DownloadError;
use crate::notify::Notifier;

/// Identifier of an engine owned by a [`DownloadHost`].
pub type HandleId = u32;

/// Errors returned by [`DownloadHost`].
#[derive(Debug, Error)]
pub enum HostError {
    #[error("unknown download handle {0}")]
    UnknownHandle(HandleId),

    #[error(transparent)]
    Download(#[from] DownloadError),
}

pub type HostResult<T> = Result<T, HostError>;

/// Owns download engines and hands out handles to them.
#[derive(Debug)]
pub struct DownloadHost {
    engines: DashMap<HandleId, Arc<DownloadEngine>>,
    next_id: AtomicU32,
    notifier: Notifier,
}

impl Default for DownloadHost {
    fn default() -> Self {
        Self::new(Notifier::new())
    }
}

impl DownloadHost {
    /// Create a host whose engines publish to `notifier`.
    pub fn new(notifier: Notifier) -> Self {
        Self {
            engines: DashMap::new(),
            next_id: AtomicU32::new(1),
            notifier,
        }
    }

    /// Register an engine for `config` without starting it.
    pub fn create(&self, config: DownloadConfig) -> HostResult<HandleId> {
        let engine = DownloadEngine::new(config, self.notifier.clone())?;
        Ok(self.insert(engine))
    }

    /// Register an already built engine.
    pub fn insert(&self, engine: DownloadEngine) -> HandleId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.engines.insert(id, Arc::new(engine));
        debug!(id, "Download handle created");
        id
    }

    /// Run the download behind `id` from the beginning.
    pub fn start(&self, id: HandleId) -> HostResult<()> {
        self.engine(id)?.start().map_err(HostError::from)
    }

    /// Create an engine for `config` and run it.
    ///
    /// The handle is returned together with the outcome so the caller can
    /// resume a paused download.
    pub fn start_multi(&self, config: DownloadConfig) -> HostResult<(HandleId, HostResult<()>)> {
        let id = self.create(config)?;
        Ok((id, self.start(id)))
    }

    /// Create an engine for a single file and run it.
    pub fn start_single(
        &self,
        url: impl Into<String>,
        save_path: impl Into<PathBuf>,
        threads: usize,
        chunk_size: u64,
        notify: Option<NotifyConfig>,
    ) -> HostResult<(HandleId, HostResult<()>)> {
        let config = DownloadConfig::new(vec![url.into()], vec![save_path.into()])
            .with_threads(threads)
            .with_chunk_size(chunk_size)
            .with_notify(notify);
        self.start_multi(config)
    }

    /// Pause the download behind `id`.
    ///
    /// Returns `false` when the download was not running.
    pub fn pause(&self, id: HandleId) -> HostResult<bool> {
        Ok(self.engine(id)?.pause())
    }

    /// Resume the download behind `id`.
    pub fn resume(&self, id: HandleId) -> HostResult<()> {
        self.engine(id)?.resume().map_err(HostError::from)
    }

    pub fn status(&self, id: HandleId) -> HostResult<EngineStatus> {
        Ok(self.engine(id)?.status())
    }

    /// Drop the engine behind `id`. A running download is paused first.
    pub fn remove(&self, id: HandleId) -> HostResult<()> {
        let (_, engine) = self
            .engines
            .remove(&id)
            .ok_or(HostError::UnknownHandle(id))?;
        engine.pause();
        debug!(id, "Download handle removed");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    fn engine(&self, id: HandleId) -> HostResult<Arc<DownloadEngine>> {
        self.engines
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(HostError::UnknownHandle(id))
    }
}
