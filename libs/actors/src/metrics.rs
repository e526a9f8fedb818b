//! Dispatch Metrics
//!
//! Lock-free counters maintained by an executor and the calls dispatched
//! onto it. Every counter uses `Relaxed` ordering; values are monitoring
//! hints, not synchronization.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Executor-wide dispatch counters
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    pub tasks_submitted: AtomicU64,
    pub tasks_executed: AtomicU64,
    pub task_panics: AtomicU64,
    pub submissions_refused: AtomicU64,

    // Blocking call accounting
    pub blocking_waits: AtomicU64,
    pub wakeups: AtomicU64,
    pub herd_wakeups: AtomicU64,
    pub abandoned_calls: AtomicU64,
}

impl DispatchMetrics {
    pub fn record_submitted(&self) {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_executed(&self) {
        self.tasks_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_panic(&self) {
        self.task_panics.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refused(&self) {
        self.submissions_refused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_blocking_wait(&self) {
        self.blocking_waits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a waiter waking up; `pending` means its own call had not
    /// completed yet (a herd wake on a shared board, or a spurious one)
    pub fn record_wakeup(&self, pending: bool) {
        self.wakeups.fetch_add(1, Ordering::Relaxed);
        if pending {
            self.herd_wakeups.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_abandoned(&self) {
        self.abandoned_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Get metrics snapshot
    pub fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            tasks_executed: self.tasks_executed.load(Ordering::Relaxed),
            task_panics: self.task_panics.load(Ordering::Relaxed),
            submissions_refused: self.submissions_refused.load(Ordering::Relaxed),
            blocking_waits: self.blocking_waits.load(Ordering::Relaxed),
            wakeups: self.wakeups.load(Ordering::Relaxed),
            herd_wakeups: self.herd_wakeups.load(Ordering::Relaxed),
            abandoned_calls: self.abandoned_calls.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`DispatchMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStats {
    pub tasks_submitted: u64,
    pub tasks_executed: u64,
    pub task_panics: u64,
    pub submissions_refused: u64,
    pub blocking_waits: u64,
    pub wakeups: u64,
    pub herd_wakeups: u64,
    pub abandoned_calls: u64,
}

impl DispatchStats {
    /// Fraction of wakeups that found the waiter's own call still pending.
    /// Grows with the number of concurrently blocked callers when the
    /// completion board is shared per executor.
    pub fn herd_wake_ratio(&self) -> f64 {
        if self.wakeups == 0 {
            return 0.0;
        }
        self.herd_wakeups as f64 / self.wakeups as f64
    }

    /// Tasks accepted but not yet run
    pub fn tasks_in_flight(&self) -> u64 {
        self.tasks_submitted.saturating_sub(self.tasks_executed)
    }
}
