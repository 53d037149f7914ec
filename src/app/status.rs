//! Current-operation status.
//!
//! The worker publishes an immutable [`ActiveJob`] with a single atomic
//! pointer swap when an activation starts and clears it when the
//! activation ends.  Readers load the pointer without taking a lock, so a
//! status query can never see a half-written record or stall behind a
//! running activation.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwapOption;

/// The in-flight activation as seen from outside the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveJob {
    pub zone: String,
    pub duration_secs: u32,
    pub start_time: SystemTime,
    /// Queue depth when this job was dequeued (informational).
    pub queue_depth_at_start: usize,
}

/// Read-only status returned to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    /// `None` while idle.
    pub active: Option<ActiveJob>,
    /// Jobs waiting behind the active one.
    pub queue_depth: usize,
}

impl StatusSnapshot {
    pub fn idle(queue_depth: usize) -> Self {
        Self {
            active: None,
            queue_depth,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    pub fn zone(&self) -> &str {
        self.active.as_ref().map_or("", |j| j.zone.as_str())
    }

    pub fn duration_secs(&self) -> u32 {
        self.active.as_ref().map_or(0, |j| j.duration_secs)
    }

    /// Start time as Unix seconds, `0.0` while idle.
    pub fn start_time_unix(&self) -> f64 {
        self.active
            .as_ref()
            .and_then(|j| j.start_time.duration_since(UNIX_EPOCH).ok())
            .map_or(0.0, |d| d.as_secs_f64())
    }
}

/// Lock-free publication point shared by the worker and its readers.
#[derive(Debug, Default)]
pub struct StatusCell {
    active: ArcSwapOption<ActiveJob>,
    queue_depth: AtomicUsize,
}

impl StatusCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new active job (worker only).
    pub fn publish(&self, job: ActiveJob) {
        self.active.store(Some(Arc::new(job)));
    }

    /// Return to idle (worker only).
    pub fn clear(&self) {
        self.active.store(None);
    }

    /// Record the queue depth.  Called with the queue lock held.
    pub fn set_queue_depth(&self, depth: usize) {
        self.queue_depth.store(depth, Ordering::Release);
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            active: self.active.load_full().map(|job| (*job).clone()),
            queue_depth: self.queue_depth.load(Ordering::Acquire),
        }
    }
}
