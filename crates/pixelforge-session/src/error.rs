//! Session error types.

use pixelforge_http::{ApiError, ErrorKind};
use pixelforge_storage::StorageError;
use thiserror::Error;

/// Session error type.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Request failed (sign-in rejected, identity fetch failed, ...)
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Session snapshot could not be persisted
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Session snapshot could not be encoded
    #[error("Session snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// The token changed while its identity was being resolved
    #[error("Session changed while resolving identity")]
    Superseded,
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Api(e) => e.kind(),
            SessionError::Storage(_) | SessionError::Snapshot(_) => ErrorKind::Storage,
            SessionError::Superseded => ErrorKind::Authentication,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SessionError::Api(e) if e.is_unauthorized())
    }
}

/// Result type alias using SessionError.
pub type SessionResult<T> = Result<T, SessionError>;
