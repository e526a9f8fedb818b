//! Session error types

use crate::types::InfoHash;
use actor_dispatch::DispatchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Transfer {info_hash} is already in the session")]
    Duplicate { info_hash: InfoHash },

    #[error("Invalid transfer parameters: {reason}")]
    InvalidParams { reason: String },

    #[error("Session is shut down")]
    ShutDown,

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl SessionError {
    pub fn category(&self) -> &'static str {
        match self {
            Self::Duplicate { .. } => "duplicate",
            Self::InvalidParams { .. } => "invalid_params",
            Self::ShutDown => "shut_down",
            Self::Dispatch(e) => e.category(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_errors_keep_their_category() {
        let err: SessionError = DispatchError::executor_closed("session").into();
        assert_eq!(err.category(), DispatchError::executor_closed("x").category());
        assert!(err.to_string().contains("session"));
    }

    #[test]
    fn test_duplicate_message_names_hash() {
        let info_hash = InfoHash::from_name("dup");
        let err = SessionError::Duplicate { info_hash };
        assert!(err.to_string().contains(&info_hash.to_string()));
        assert_eq!(err.category(), "duplicate");
    }
}
