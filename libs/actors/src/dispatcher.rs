//! Call Dispatcher
//!
//! The three call shapes, implemented once on [`ActorRef`]. Every
//! operation an actor exposes is a closure over `&mut A` handed to one of
//! these primitives; arguments are snapshot by moving them into the closure
//! on the calling thread, before anything is submitted.
//!
//! Each submitted task captures its own strong reference, so the actor
//! outlives every task queued for it even if all handles and the owner are
//! dropped in the meantime.
//!
//! # Reentrancy
//!
//! A blocking call issued from the executor's own thread can never complete:
//! the executor would have to finish the current task before reaching the
//! new one. Callers must not do this. Debug builds assert on it.

use crate::cell::ActorRef;
use crate::error::{DispatchError, Result};
use crate::executor::Executor;

use std::sync::Arc;

impl<A: Send + 'static> ActorRef<A> {
    /// Fire-and-forget: queue `f` and return immediately
    pub fn post<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut A) + Send + 'static,
    {
        self.clone().into_post(f)
    }

    /// Blocking without result: returns once `f` has fully run
    pub fn call<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut A) + Send + 'static,
    {
        self.clone().into_call_with_result(f)
    }

    /// Blocking with result: returns the value `f` produced on the executor
    /// thread, a snapshot of actor state at the moment it ran.
    ///
    /// `self` stays alive on the calling thread for the whole wait; use
    /// [`ActorRef::into_call_with_result`] to hand it to the task instead.
    pub fn call_with_result<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut A) -> R + Send + 'static,
    {
        self.clone().into_call_with_result(f)
    }

    /// [`ActorRef::post`] that moves this strong reference into the task
    pub fn into_post<F>(self, f: F) -> Result<()>
    where
        F: FnOnce(&mut A) + Send + 'static,
    {
        let executor: Arc<dyn Executor> = Arc::clone(self.cell.executor());
        executor.submit(Box::new(move || {
            {
                let mut actor = self.cell.lock();
                f(&mut actor);
            }
            drop(self);
        }))
    }

    /// [`ActorRef::call`] that moves this strong reference into the task
    pub fn into_call<F>(self, f: F) -> Result<()>
    where
        F: FnOnce(&mut A) + Send + 'static,
    {
        self.into_call_with_result(f)
    }

    /// [`ActorRef::call_with_result`] that moves this strong reference into
    /// the task. The caller holds no strong reference while it waits, so
    /// once the owner is gone the actor is dropped on its executor thread.
    pub fn into_call_with_result<R, F>(self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut A) -> R + Send + 'static,
    {
        let id = self.id();
        let executor: Arc<dyn Executor> = Arc::clone(self.cell.executor());
        debug_assert!(
            !executor.is_executor_thread(),
            "blocking dispatch to actor {} from its own executor thread would deadlock",
            id
        );

        let board = executor.completion_board();
        let (completer, completion) = board.completion::<R>();

        executor.submit(Box::new(move || {
            let value = {
                let mut actor = self.cell.lock();
                f(&mut actor)
            };
            drop(self);
            completer.complete(value);
        }))?;

        completion
            .wait()
            .ok_or_else(|| DispatchError::abandoned(id))
    }
}

#[cfg(test)]
mod tests {
    use crate::cell::ActorOwner;
    use crate::executor::{ExecutorConfig, ThreadExecutor, WaitStrategy};
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[derive(Default)]
    struct Account {
        balance: i64,
    }

    fn owner(wait_strategy: WaitStrategy) -> (Arc<ThreadExecutor>, ActorOwner<Account>) {
        let executor = ThreadExecutor::spawn(
            ExecutorConfig::named("dispatcher-test").with_wait_strategy(wait_strategy),
        )
        .unwrap();
        let owner = ActorOwner::new(Account::default(), executor.clone());
        (executor, owner)
    }

    #[test]
    fn test_post_then_call_observes_mutation() {
        let (_executor, owner) = owner(WaitStrategy::PerCall);
        let actor = owner.actor_ref();

        actor.post(|a| a.balance += 10).unwrap();
        actor.post(|a| a.balance -= 3).unwrap();
        assert_eq!(actor.call_with_result(|a| a.balance).unwrap(), 7);
    }

    #[test]
    fn test_call_runs_on_executor_thread() {
        let (_executor, owner) = owner(WaitStrategy::PerExecutor);
        let name = owner
            .actor_ref()
            .call_with_result(|_| thread::current().name().map(str::to_string))
            .unwrap();
        assert_eq!(name.as_deref(), Some("dispatcher-test"));
    }

    #[test]
    fn test_closed_executor_reports_error() {
        let (executor, owner) = owner(WaitStrategy::PerCall);
        executor.shutdown();

        let actor = owner.actor_ref();
        assert!(actor.post(|a| a.balance += 1).unwrap_err().is_unreachable());
        assert!(actor.call(|a| a.balance += 1).unwrap_err().is_unreachable());
    }

    #[test]
    fn test_panicking_method_abandons_call() {
        let (executor, owner) = owner(WaitStrategy::PerCall);
        let actor = owner.actor_ref();

        let err = actor
            .call_with_result(|a: &mut Account| -> i64 {
                if a.balance == 0 {
                    panic!("empty account");
                }
                a.balance
            })
            .unwrap_err();
        assert_eq!(err.category(), "abandoned");

        // The executor keeps serving later calls
        actor.call(|a| a.balance = 5).unwrap();
        assert_eq!(actor.call_with_result(|a| a.balance).unwrap(), 5);
        assert_eq!(executor.stats().task_panics, 1);
    }

    #[test]
    fn test_into_call_returns_value() {
        let (_executor, owner) = owner(WaitStrategy::PerExecutor);
        owner.actor_ref().into_post(|a| a.balance = 40).unwrap();
        owner.actor_ref().into_call(|a| a.balance += 2).unwrap();
        assert_eq!(owner.actor_ref().into_call_with_result(|a| a.balance).unwrap(), 42);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "would deadlock")]
    fn test_reentrant_blocking_call_asserts() {
        let (_executor, owner) = owner(WaitStrategy::PerCall);
        let actor = owner.actor_ref();
        let (tx, rx) = crossbeam_channel::bounded(1);

        let inner = actor.clone();
        actor
            .post(move |_| {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| inner.call(|_| ())));
                let _ = tx.send(outcome.err());
            })
            .unwrap();

        if let Some(payload) = rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            panic::resume_unwind(payload);
        }
    }
}

