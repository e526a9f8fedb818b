//! Actor Dispatch
//!
//! Cross-thread handles for actors that are owned and mutated by a single
//! executor thread. Any thread may hold a [`Handle`] and invoke operations
//! on the actor through three call shapes:
//!
//! - **fire-and-forget** ([`Handle::dispatch_async`]): queue and return
//! - **blocking** ([`Handle::dispatch_sync`]): return once the call ran
//! - **blocking with result** ([`Handle::dispatch_sync_with_result`]):
//!   return the value the call produced, or a caller-chosen default
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  upgrade   ┌──────────────┐  submit   ┌───────────────────┐
//! │ Handle<A>    │───────────▶│ ActorRef<A>  │──────────▶│ Executor thread   │
//! │ (WeakActor)  │            │ (transient)  │           │ task: f(&mut A)   │
//! └──────────────┘            └──────────────┘           └─────────┬─────────┘
//!        ▲                                                         │
//!        │                 WakeBoard (mutex + condvar)             │
//!        └──────────────────── completion signal ◀─────────────────┘
//! ```
//!
//! Calls on an actor that has been destroyed never fail and never touch
//! freed state: they are skipped, or return the supplied default.
//!
//! # Examples
//!
//! ```rust
//! use actor_dispatch::{ActorOwner, ExecutorConfig, ThreadExecutor};
//!
//! struct Limits { upload: i32 }
//!
//! let executor = ThreadExecutor::spawn(ExecutorConfig::named("io")).unwrap();
//! let owner = ActorOwner::new(Limits { upload: 0 }, executor);
//! let handle = owner.handle();
//!
//! handle.dispatch_async(|l| l.upload = 256);
//! assert_eq!(handle.dispatch_sync_with_result(-1, |l| l.upload), 256);
//!
//! owner.destroy();
//! assert_eq!(handle.dispatch_sync_with_result(-1, |l| l.upload), -1);
//! ```

pub mod cell;
pub mod completion;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod handle;
pub mod identity;
pub mod metrics;

pub use cell::{ActorCell, ActorOwner, ActorRef, WeakActor};
pub use completion::{Completer, Completion, WakeBoard};
pub use error::{DispatchError, Result};
pub use executor::{Executor, ExecutorConfig, Task, ThreadExecutor, WaitStrategy};
pub use handle::Handle;
pub use identity::ActorId;
pub use metrics::{DispatchMetrics, DispatchStats};
