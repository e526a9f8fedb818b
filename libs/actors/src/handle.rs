//! Actor Handles
//!
//! [`Handle`] is the value callers pass around: cheap to clone, safe to keep
//! after the actor died, and usable as a map or set key. Equality, ordering
//! and hashing use the [`ActorId`] assigned at creation, never the liveness
//! or address of the actor.
//!
//! A call on an expired actor is not an error:
//!
//! | call shape                     | expired actor          |
//! |--------------------------------|------------------------|
//! | `dispatch_async`               | silently skipped       |
//! | `dispatch_sync`                | silently skipped       |
//! | `dispatch_sync_with_result`    | returns `default`      |
//!
//! The `try_` variants report why a call did not run instead.

use crate::cell::{ActorRef, WeakActor};
use crate::error::{DispatchError, Result};
use crate::identity::ActorId;

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use tracing::{debug, trace};

/// Caller-facing reference to an actor
pub struct Handle<A> {
    weak: WeakActor<A>,
}

impl<A> Handle<A> {
    pub fn from_weak(weak: WeakActor<A>) -> Self {
        Self { weak }
    }

    /// Identity token, stable for the handle's whole life
    pub fn id(&self) -> ActorId {
        self.weak.id()
    }

    /// Best-effort liveness check. The actor may die right after this
    /// returns `true`; once it returns `false` it never returns `true` again.
    pub fn is_valid(&self) -> bool {
        !self.weak.is_expired()
    }

    /// Atomic check-and-use: a strong reference if the actor is alive
    pub fn native_reference(&self) -> Option<ActorRef<A>> {
        self.weak.upgrade()
    }

    fn upgrade_or_expired(&self) -> Result<ActorRef<A>> {
        self.weak
            .upgrade()
            .ok_or_else(|| DispatchError::expired(self.id()))
    }
}

impl<A: Send + 'static> Handle<A> {
    /// Queue `f` on the actor's executor without waiting
    pub fn dispatch_async<F>(&self, f: F)
    where
        F: FnOnce(&mut A) + Send + 'static,
    {
        if let Err(e) = self.try_dispatch_async(f) {
            log_skipped(&e);
        }
    }

    /// Run `f` on the actor's executor and wait until it has completed
    pub fn dispatch_sync<F>(&self, f: F)
    where
        F: FnOnce(&mut A) + Send + 'static,
    {
        if let Err(e) = self.try_dispatch_sync(f) {
            log_skipped(&e);
        }
    }

    /// Run `f` on the actor's executor and return its result, or `default`
    /// if the call could not run
    pub fn dispatch_sync_with_result<R, F>(&self, default: R, f: F) -> R
    where
        R: Send + 'static,
        F: FnOnce(&mut A) -> R + Send + 'static,
    {
        match self.try_dispatch_sync_with_result(f) {
            Ok(value) => value,
            Err(e) => {
                log_skipped(&e);
                default
            }
        }
    }

    pub fn try_dispatch_async<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut A) + Send + 'static,
    {
        self.upgrade_or_expired()?.into_post(f)
    }

    pub fn try_dispatch_sync<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut A) + Send + 'static,
    {
        self.upgrade_or_expired()?.into_call(f)
    }

    pub fn try_dispatch_sync_with_result<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut A) -> R + Send + 'static,
    {
        // The upgraded reference moves into the task; nothing on this
        // thread keeps the actor alive while waiting.
        self.upgrade_or_expired()?.into_call_with_result(f)
    }
}

fn log_skipped(error: &DispatchError) {
    match error {
        DispatchError::Expired { actor_id } => {
            trace!(actor_id = %actor_id, "Call skipped: actor expired");
        }
        other => {
            debug!(error = %other, error_category = other.category(), "Call did not run");
        }
    }
}

impl<A> Clone for Handle<A> {
    fn clone(&self) -> Self {
        Self {
            weak: self.weak.clone(),
        }
    }
}

impl<A> PartialEq for Handle<A> {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl<A> Eq for Handle<A> {}

impl<A> Hash for Handle<A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl<A> PartialOrd for Handle<A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<A> Ord for Handle<A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id().cmp(&other.id())
    }
}

impl<A> fmt::Debug for Handle<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id())
            .field("valid", &self.is_valid())
            .finish()
    }
}

impl<A> From<WeakActor<A>> for Handle<A> {
    fn from(weak: WeakActor<A>) -> Self {
        Self::from_weak(weak)
    }
}
