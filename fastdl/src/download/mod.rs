//! Segmented download engine.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        DownloadEngine                            │
//! │  (files in order, Start/StartOne/EndOne/End, pause + resume)     │
//! └───────────────────────────────┬──────────────────────────────────┘
//!                                 │ one file at a time
//!                                 ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        FileDownloader                            │
//! │  HEAD size ─► plan() ─► SharedFile::create ─► scoped workers     │
//! └───────────────────────────────┬──────────────────────────────────┘
//!                                 │ shared chunk queue
//!              ┌──────────────────┼──────────────────┐
//!              ▼                  ▼                  ▼
//!       ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//!       │RangeFetcher │    │RangeFetcher │    │RangeFetcher │
//!       └──────┬──────┘    └──────┬──────┘    └──────┬──────┘
//!              └─── write_at ─────┼──── add(n) ──────┘
//!                                 ▼
//!                  SharedFile   ProgressTracker ──► Notifier
//! ```
//!
//! Network access goes through the [`RangeSource`] trait, implemented for
//! HTTP(S) by [`HttpSource`].

mod coordinator;
mod fetch;
mod file;
mod orchestrator;
mod plan;
mod progress;
mod source;
mod state;

pub use coordinator::FileDownloader;
pub use fetch::{RangeFetcher, BUFFER_SIZE};
pub use file::SharedFile;
pub use orchestrator::{DownloadEngine, EngineStatus};
pub use plan::{plan, ChunkPlan};
pub use progress::ProgressTracker;
pub use source::{HttpSource, RangeBody, RangeSource, RangeStatus};
pub use state::{Chunk, FileStage, FileTask};
