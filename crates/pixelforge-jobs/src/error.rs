//! Job client error types.

use pixelforge_http::{ApiError, ErrorKind};
use thiserror::Error;

/// Job client error type.
#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Rejected locally; no request was sent
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Saving an artifact failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl JobError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            JobError::Api(e) => e.kind(),
            JobError::Validation(_) => ErrorKind::Validation,
            JobError::Io(_) => ErrorKind::Storage,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, JobError::Api(e) if e.is_unauthorized())
    }
}

/// Result type alias using JobError.
pub type JobResult<T> = Result<T, JobError>;
