//! # Transfer Session
//!
//! A concrete owner context built on `actor-dispatch`. A [`Session`] runs one
//! executor thread that owns every [`Transfer`] added to it; callers drive
//! transfers from any thread through [`TransferHandle`]s.
//!
//! ```rust
//! use actor_dispatch::ExecutorConfig;
//! use transfer_session::{Session, TransferParams};
//!
//! let session = Session::new(ExecutorConfig::named("doc-session")).unwrap();
//! let handle = session
//!     .add_transfer(TransferParams::single_file("linux.iso", 4096, 1024))
//!     .unwrap();
//!
//! handle.set_upload_limit(64_000).unwrap();
//! assert_eq!(handle.upload_limit(), 64_000);
//!
//! assert!(session.remove_transfer(&handle));
//! assert_eq!(handle.upload_limit(), 0);
//! assert_eq!(handle.queue_position(), -1);
//! ```

pub mod error;
pub mod handle;
pub mod queue;
pub mod session;
pub mod transfer;
pub mod types;

pub use error::{Result, SessionError};
pub use handle::TransferHandle;
pub use queue::QueueOrder;
pub use session::Session;
pub use transfer::{SeedKind, Transfer, DEFAULT_PRIORITY, MAX_PRIORITY, UNLIMITED};
pub use types::{
    FileEntry, InfoHash, TrackerEntry, TransferInfo, TransferParams, TransferState,
    TransferStatus,
};
