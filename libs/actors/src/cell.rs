//! Actor Cells and References
//!
//! An actor lives in an [`ActorCell`] bound to exactly one executor. The
//! owner context holds the only long-lived strong reference
//! ([`ActorOwner`]); callers hold [`WeakActor`]s (usually through a
//! [`Handle`](crate::handle::Handle)) and upgrade them to a transient
//! [`ActorRef`] for the duration of one dispatch.
//!
//! Destruction is monotonic: once every strong reference is gone an upgrade
//! never succeeds again.

use crate::executor::Executor;
use crate::handle::Handle;
use crate::identity::ActorId;

use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Actor state plus the executor that owns it
pub struct ActorCell<A> {
    id: ActorId,
    executor: Arc<dyn Executor>,
    /// Only locked by tasks running on `executor`, so never contended
    state: Mutex<A>,
}

impl<A> ActorCell<A> {
    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, A> {
        debug_assert!(
            self.executor.is_executor_thread(),
            "actor state touched outside its executor thread"
        );
        self.state.lock()
    }
}

/// The owning reference to an actor, held by its owner context
pub struct ActorOwner<A> {
    cell: Arc<ActorCell<A>>,
}

impl<A: Send + 'static> ActorOwner<A> {
    /// Bind `actor` to `executor` under a freshly assigned id
    pub fn new(actor: A, executor: Arc<dyn Executor>) -> Self {
        let id = ActorId::new();
        debug!(actor_id = %id, executor = %executor.name(), "Actor cell created");

        Self {
            cell: Arc::new(ActorCell {
                id,
                executor,
                state: Mutex::new(actor),
            }),
        }
    }

    pub fn id(&self) -> ActorId {
        self.cell.id
    }

    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.cell.executor
    }

    pub fn downgrade(&self) -> WeakActor<A> {
        WeakActor {
            id: self.cell.id,
            cell: Arc::downgrade(&self.cell),
        }
    }

    pub fn handle(&self) -> Handle<A> {
        Handle::from_weak(self.downgrade())
    }

    /// Strong reference for dispatching from the owner context
    pub fn actor_ref(&self) -> ActorRef<A> {
        ActorRef {
            cell: Arc::clone(&self.cell),
        }
    }

    /// Give up ownership. The actor is dropped as soon as in-flight tasks
    /// release their transient references.
    pub fn destroy(self) {
        debug!(
            actor_id = %self.cell.id,
            in_flight_refs = Arc::strong_count(&self.cell) - 1,
            "Actor owner released"
        );
    }
}

impl<A> fmt::Debug for ActorOwner<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorOwner").field("id", &self.cell.id).finish()
    }
}

/// Non-owning, checkable reference to an actor
pub struct WeakActor<A> {
    id: ActorId,
    cell: Weak<ActorCell<A>>,
}

impl<A> WeakActor<A> {
    pub fn id(&self) -> ActorId {
        self.id
    }

    /// Transient strong reference, or `None` once the actor is destroyed
    pub fn upgrade(&self) -> Option<ActorRef<A>> {
        self.cell.upgrade().map(|cell| ActorRef { cell })
    }

    /// Racy liveness hint; a `false` answer is final
    pub fn is_expired(&self) -> bool {
        self.cell.strong_count() == 0
    }
}

impl<A> Clone for WeakActor<A> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            cell: Weak::clone(&self.cell),
        }
    }
}

impl<A> fmt::Debug for WeakActor<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakActor")
            .field("id", &self.id)
            .field("expired", &self.is_expired())
            .finish()
    }
}

/// Transient strong reference to an actor.
///
/// Holding one keeps the actor alive; keep it only for the span of a call.
/// It never grants direct access to actor state, which stays confined to
/// the executor thread.
pub struct ActorRef<A> {
    pub(crate) cell: Arc<ActorCell<A>>,
}

impl<A> ActorRef<A> {
    pub fn id(&self) -> ActorId {
        self.cell.id
    }

    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.cell.executor
    }

    pub fn downgrade(&self) -> WeakActor<A> {
        WeakActor {
            id: self.cell.id,
            cell: Arc::downgrade(&self.cell),
        }
    }
}

impl<A> Clone for ActorRef<A> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<A> fmt::Debug for ActorRef<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRef").field("id", &self.cell.id).finish()
    }
}
