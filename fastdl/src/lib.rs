//! FastDL - segmented, concurrent HTTP(S) file downloads
//!
//! Given one or more URLs, the engine discovers each remote file's size,
//! partitions it into byte-range chunks, fetches the chunks in parallel and
//! writes every chunk directly at its destination offset. Lifecycle and
//! progress events are delivered to pluggable notification sinks.
//!
//! # Architecture
//!
//! ```text
//! DownloadEngine (orchestrator, one file at a time)
//!         │
//!         ├── FileDownloader (per-file state machine)
//!         │       ├── plan()          ──► ChunkPlan
//!         │       ├── RangeFetcher ×N ──► SharedFile (positioned writes)
//!         │       └── ProgressTracker ──► Event::Update
//!         │
//!         └── Notifier ──► CallbackSink | SocketSink | WebSocketSink
//! ```
//!
//! The crate exposes debug logs through the [`tracing`] crate.
//!
//! # Example
//!
//! ```no_run
//! use fastdl::config::DownloadConfig;
//! use fastdl::download::DownloadEngine;
//! use fastdl::notify::{CallbackSink, Notifier};
//!
//! let config = DownloadConfig::new(
//!     vec!["https://example.com/big.iso".to_string()],
//!     vec!["/tmp/big.iso".into()],
//! )
//! .with_threads(8)
//! .with_chunk_size(4 * 1024 * 1024);
//!
//! let notifier = Notifier::new().with_sink(CallbackSink::new(|event| println!("{:?}", event)));
//! let engine = DownloadEngine::new(config, notifier)?;
//! engine.start()?;
//! # Ok::<(), fastdl::error::DownloadError>(())
//! ```

pub mod config;
pub mod download;
pub mod error;
pub mod event;
pub mod host;
pub mod notify;

pub use download::DownloadEngine;
pub use error::{DownloadError, DownloadResult};
pub use event::Event;
