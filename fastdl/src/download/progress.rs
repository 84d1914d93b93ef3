//! Progress aggregation for one file.
//!
//! Workers add the bytes of every non-empty read to a shared atomic
//! counter and then ask the tracker for a report. Each report carries the
//! bytes added since the previous report, so the `added` values of all
//! updates for a file sum to its size.
//!
//! ```text
//!   worker 1 ──add(n)──┐
//!   worker 2 ──add(n)──┼──► downloaded (AtomicU64) ──report()──► ProgressUpdate
//!   worker N ──add(n)──┘                          last_reported
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::event::ProgressUpdate;

#[derive(Debug)]
struct ReportState {
    last_reported: u64,
    last_emit: Option<Instant>,
}

/// Shared counters of the file currently being downloaded.
#[derive(Debug)]
pub struct ProgressTracker {
    total: u64,
    downloaded: AtomicU64,
    /// Bytes already on disk when this attempt started.
    baseline: u64,
    start_time: Instant,
    interval: Option<Duration>,
    state: Mutex<ReportState>,
}

impl ProgressTracker {
    /// Tracker for a fresh download of `total` bytes.
    pub fn new(total: u64, interval: Option<Duration>) -> Self {
        Self::resumed(total, 0, interval)
    }

    /// Tracker for a download that already has `completed` bytes on disk.
    ///
    /// Those bytes count as reported, so the next update only carries new
    /// bytes.
    pub fn resumed(total: u64, completed: u64, interval: Option<Duration>) -> Self {
        let completed = completed.min(total);
        Self {
            total,
            downloaded: AtomicU64::new(completed),
            baseline: completed,
            start_time: Instant::now(),
            interval,
            state: Mutex::new(ReportState {
                last_reported: completed,
                last_emit: None,
            }),
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Record `bytes` written. Returns the new cumulative count.
    pub fn add(&self, bytes: u64) -> u64 {
        self.downloaded.fetch_add(bytes, Ordering::SeqCst) + bytes
    }

    /// Cumulative bytes written, clamped to the file size.
    pub fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::SeqCst).min(self.total)
    }

    /// Report progress since the previous report.
    ///
    /// Without a throttle every call yields an update. Its `added` is zero
    /// when a concurrent report already covered this caller's bytes. With a
    /// throttle, calls inside the interval return `None` and calls with no
    /// new bytes are coalesced away.
    pub fn report(&self) -> Option<ProgressUpdate> {
        let mut state = self.state.lock();
        let now = Instant::now();
        if let (Some(interval), Some(last)) = (self.interval, state.last_emit) {
            if now.duration_since(last) < interval {
                return None;
            }
        }

        let downloaded = self.downloaded();
        if self.interval.is_some() && downloaded <= state.last_reported {
            return None;
        }

        state.last_emit = Some(now);
        Some(self.build(&mut state, downloaded, now))
    }

    /// Update with `added == 0`, sent before the first byte arrives.
    pub fn initial(&self) -> ProgressUpdate {
        let state = self.state.lock();
        ProgressUpdate {
            total: self.total,
            added: 0,
            speed: self.speed(state.last_reported, Instant::now()),
        }
    }

    /// Final report of a completed file. Forces `downloaded == total`.
    pub fn finish(&self) -> ProgressUpdate {
        let mut state = self.state.lock();
        self.downloaded.store(self.total, Ordering::SeqCst);
        let now = Instant::now();
        state.last_emit = Some(now);
        self.build(&mut state, self.total, now)
    }

    fn build(&self, state: &mut ReportState, downloaded: u64, now: Instant) -> ProgressUpdate {
        let added = downloaded.saturating_sub(state.last_reported);
        state.last_reported = state.last_reported.max(downloaded);
        ProgressUpdate {
            total: self.total,
            added,
            speed: self.speed(downloaded, now),
        }
    }

    /// Bytes per second transferred by this attempt.
    fn speed(&self, downloaded: u64, now: Instant) -> f64 {
        let elapsed = now.duration_since(self.start_time).as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        downloaded.saturating_sub(self.baseline) as f64 / elapsed
    }
}
