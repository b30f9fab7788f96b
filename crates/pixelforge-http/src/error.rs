//! API error types.

use pixelforge_storage::StorageError;
use thiserror::Error;

/// Coarse classification of a failure, shared by every client crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credential missing, invalid or expired (HTTP 401).
    Authentication,
    /// Precondition violated before any request was sent.
    Validation,
    /// Timeout, unreachable server, or undecodable response.
    Transport,
    /// Any other non-2xx response.
    Server,
    /// Persistent storage failed.
    Storage,
    /// Client misconfiguration (e.g. an unparsable base URL).
    Configuration,
}

/// Error returned by every request made through the HTTP client.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The server rejected the credential. The token has already been
    /// cleared and the unauthorized signal emitted.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Non-2xx response other than 401
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Timeout, connection failure, or malformed body
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Token persistence failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Unauthorized { .. } => ErrorKind::Authentication,
            ApiError::Server { .. } => ErrorKind::Server,
            ApiError::Transport(_) => ErrorKind::Transport,
            ApiError::Storage(_) => ErrorKind::Storage,
            ApiError::InvalidUrl(_) => ErrorKind::Configuration,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// HTTP status of the failed response, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Server { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true if retrying the same request could succeed.
    ///
    /// Transient errors include:
    /// - Connection failures and timeouts
    /// - 5xx responses
    ///
    /// Nothing in the client retries on its own; this is for callers.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport(e) => e.is_connect() || e.is_timeout(),
            ApiError::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type alias using ApiError.
pub type ApiResult<T> = Result<T, ApiError>;
