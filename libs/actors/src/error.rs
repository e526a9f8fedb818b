//! Dispatch Error Types
//!
//! Failures the dispatch layer itself can observe. Failures inside an actor
//! method belong to the actor and are never translated here.

use crate::identity::ActorId;
use thiserror::Error;

/// Main dispatch error type
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The actor was destroyed before the call could be issued
    #[error("Actor {actor_id} has expired")]
    Expired { actor_id: ActorId },

    /// The executor no longer accepts tasks
    #[error("Executor '{executor}' is closed")]
    ExecutorClosed { executor: String },

    /// The task was discarded without running (executor drained or the
    /// actor method panicked)
    #[error("Call on actor {actor_id} was abandoned before completing")]
    Abandoned { actor_id: ActorId },

    /// Argument snapshot or validation failed on the calling thread
    #[error("Invalid argument for '{operation}': {reason}")]
    InvalidArgument { operation: String, reason: String },

    /// The executor thread could not be started
    #[error("Failed to spawn executor thread '{name}'")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for dispatch operations
pub type Result<T> = std::result::Result<T, DispatchError>;

impl DispatchError {
    /// Create an expired-actor error
    pub fn expired(actor_id: ActorId) -> Self {
        Self::Expired { actor_id }
    }

    /// Create an executor-closed error
    pub fn executor_closed(executor: impl Into<String>) -> Self {
        Self::ExecutorClosed {
            executor: executor.into(),
        }
    }

    /// Create an abandoned-call error
    pub fn abandoned(actor_id: ActorId) -> Self {
        Self::Abandoned { actor_id }
    }

    /// Create an invalid-argument error
    pub fn invalid_argument(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Whether the call was never run because the target or its executor is gone
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            DispatchError::Expired { .. } | DispatchError::ExecutorClosed { .. }
        )
    }

    /// Get error category for structured logging
    pub fn category(&self) -> &'static str {
        match self {
            DispatchError::Expired { .. } => "expired",
            DispatchError::ExecutorClosed { .. } => "executor_closed",
            DispatchError::Abandoned { .. } => "abandoned",
            DispatchError::InvalidArgument { .. } => "invalid_argument",
            DispatchError::Spawn { .. } => "spawn",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let id = ActorId::new();
        assert_eq!(DispatchError::expired(id).category(), "expired");
        assert_eq!(DispatchError::abandoned(id).category(), "abandoned");
        assert_eq!(
            DispatchError::executor_closed("io").category(),
            "executor_closed"
        );
        assert_eq!(
            DispatchError::invalid_argument("set_upload_limit", "below -1").category(),
            "invalid_argument"
        );
    }

    #[test]
    fn test_unreachable_classification() {
        let id = ActorId::new();
        assert!(DispatchError::expired(id).is_unreachable());
        assert!(DispatchError::executor_closed("io").is_unreachable());
        assert!(!DispatchError::abandoned(id).is_unreachable());
    }

    #[test]
    fn test_error_display() {
        let err = DispatchError::invalid_argument("set_piece_priority", "priority 9 out of range");
        assert_eq!(
            err.to_string(),
            "Invalid argument for 'set_piece_priority': priority 9 out of range"
        );
    }
}
