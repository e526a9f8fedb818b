//! Completion Signals
//!
//! Blocking calls park the calling thread on a [`WakeBoard`] (mutex +
//! condition variable) until the executor marks the call's private slot as
//! finished. A board is either created per call or shared by every blocking
//! call on one executor (see [`WaitStrategy`](crate::executor::WaitStrategy)).
//!
//! With a shared board each completion wakes every blocked caller; each one
//! rechecks its own slot and goes back to sleep if its call is still
//! pending. The cost is O(blocked callers) wakeups per completed task, which
//! `DispatchMetrics::herd_wakeups` exposes.
//!
//! # Lock Ordering
//!
//! 1. board lock
//! 2. slot lock
//!
//! Slot state only changes while the board lock is held, which is what rules
//! out missed wakeups.

use crate::metrics::DispatchMetrics;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// Mutex/condition pair blocking callers wait on
#[derive(Debug)]
pub struct WakeBoard {
    lock: Mutex<()>,
    cond: Condvar,
    metrics: Arc<DispatchMetrics>,
}

impl WakeBoard {
    pub fn new(metrics: Arc<DispatchMetrics>) -> Self {
        Self {
            lock: Mutex::new(()),
            cond: Condvar::new(),
            metrics,
        }
    }

    /// Create a linked completer/waiter pair for one call
    pub fn completion<T>(self: &Arc<Self>) -> (Completer<T>, Completion<T>) {
        let slot = Arc::new(Slot {
            state: Mutex::new(SlotState::Pending),
        });

        let completer = Completer {
            board: Arc::clone(self),
            slot: Arc::clone(&slot),
            finished: false,
        };
        let completion = Completion {
            board: Arc::clone(self),
            slot,
        };
        (completer, completion)
    }

    /// Mark `slot` finished and wake every waiter on this board
    fn finish<T>(&self, slot: &Slot<T>, state: SlotState<T>) {
        let _guard = self.lock.lock();
        *slot.state.lock() = state;
        self.cond.notify_all();
    }
}

#[derive(Debug)]
enum SlotState<T> {
    Pending,
    Done(T),
    Abandoned,
}

#[derive(Debug)]
struct Slot<T> {
    state: Mutex<SlotState<T>>,
}

impl<T> Slot<T> {
    fn is_pending(&self) -> bool {
        matches!(*self.state.lock(), SlotState::Pending)
    }

    /// Take the outcome if the call finished; `Some(None)` means abandoned
    fn take_outcome(&self) -> Option<Option<T>> {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, SlotState::Pending) {
            SlotState::Pending => None,
            SlotState::Done(value) => Some(Some(value)),
            SlotState::Abandoned => Some(None),
        }
    }
}

/// Executor-side half of a blocking call.
///
/// Dropping it without calling [`Completer::complete`] marks the call
/// abandoned and wakes the waiter.
#[derive(Debug)]
pub struct Completer<T> {
    board: Arc<WakeBoard>,
    slot: Arc<Slot<T>>,
    finished: bool,
}

impl<T> Completer<T> {
    /// Publish the call's result and wake the waiter
    pub fn complete(mut self, value: T) {
        self.finished = true;
        self.board.finish(&self.slot, SlotState::Done(value));
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if !self.finished {
            self.finished = true;
            self.board.finish(&self.slot, SlotState::Abandoned);
        }
    }
}

/// Caller-side half of a blocking call
#[derive(Debug)]
pub struct Completion<T> {
    board: Arc<WakeBoard>,
    slot: Arc<Slot<T>>,
}

impl<T> Completion<T> {
    /// Block until the paired [`Completer`] finishes.
    ///
    /// Returns `None` if the call was abandoned. There is no timeout: the
    /// caller waits until the executor reaches the task or discards it.
    ///
    /// Abandonment is counted here, so a task refused at submission (whose
    /// completion is never waited on) only shows up as a refusal.
    pub fn wait(self) -> Option<T> {
        self.board.metrics.record_blocking_wait();

        let mut guard = self.board.lock.lock();
        loop {
            if let Some(outcome) = self.slot.take_outcome() {
                if outcome.is_none() {
                    self.board.metrics.record_abandoned();
                }
                return outcome;
            }
            self.board.cond.wait(&mut guard);
            self.board.metrics.record_wakeup(self.slot.is_pending());
        }
    }

    /// Whether the call has finished (completed or abandoned)
    pub fn is_finished(&self) -> bool {
        let _guard = self.board.lock.lock();
        !self.slot.is_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn board() -> Arc<WakeBoard> {
        Arc::new(WakeBoard::new(Arc::new(DispatchMetrics::default())))
    }

    #[test]
    fn test_complete_before_wait() {
        let board = board();
        let (completer, completion) = board.completion::<u32>();
        completer.complete(7);
        assert!(completion.is_finished());
        assert_eq!(completion.wait(), Some(7));
    }

    #[test]
    fn test_complete_from_other_thread() {
        let board = board();
        let (completer, completion) = board.completion::<String>();

        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            completer.complete("done".to_string());
        });

        assert_eq!(completion.wait().as_deref(), Some("done"));
        worker.join().unwrap();
    }

    #[test]
    fn test_dropped_completer_abandons() {
        let metrics = Arc::new(DispatchMetrics::default());
        let board = Arc::new(WakeBoard::new(Arc::clone(&metrics)));
        let (completer, completion) = board.completion::<u32>();

        thread::spawn(move || drop(completer)).join().unwrap();

        assert_eq!(completion.wait(), None);
        assert_eq!(metrics.snapshot().abandoned_calls, 1);
    }

    #[test]
    fn test_shared_board_wakes_only_own_result() {
        let metrics = Arc::new(DispatchMetrics::default());
        let board = Arc::new(WakeBoard::new(Arc::clone(&metrics)));

        let pairs: Vec<_> = (0..8u32).map(|_| board.completion::<u32>()).collect();
        let (completers, completions): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();

        let waiters: Vec<_> = completions
            .into_iter()
            .enumerate()
            .map(|(i, completion)| thread::spawn(move || (i as u32, completion.wait())))
            .collect();

        thread::sleep(Duration::from_millis(20));
        for (i, completer) in completers.into_iter().enumerate() {
            completer.complete(i as u32 * 10);
        }

        for waiter in waiters {
            let (i, value) = waiter.join().unwrap();
            assert_eq!(value, Some(i * 10));
        }
        assert_eq!(metrics.snapshot().blocking_waits, 8);
    }
}
