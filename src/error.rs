//! Error types for sharebox.

use thiserror::Error;

/// Common error type for sharebox.
#[derive(Error, Debug)]
pub enum ShareboxError {
    /// Referenced entity (file, grant) does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Caller is not allowed to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Caller or target user could not be resolved in the user directory.
    #[error("user {0} not found")]
    UserNotFound(i64),

    /// Upload verification failed: the stored blob does not match the declared size.
    #[error("incomplete storage write: expected {expected} bytes, wrote {written}")]
    StorageWriteIncomplete {
        /// Bytes the caller declared.
        expected: u64,
        /// Bytes that actually reached storage.
        written: u64,
    },

    /// A file record exists but its blob is gone.
    #[error("blob missing for {0}")]
    StorageMissing(String),

    /// Malformed input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ShareboxError {
    /// Whether this error means the referenced entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ShareboxError::NotFound(_) | ShareboxError::UserNotFound(_))
    }

    /// Whether this error is an authorization failure.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, ShareboxError::Forbidden(_))
    }
}

impl From<sqlx::Error> for ShareboxError {
    fn from(e: sqlx::Error) -> Self {
        ShareboxError::Database(e.to_string())
    }
}

/// Result type alias for sharebox operations.
pub type Result<T> = std::result::Result<T, ShareboxError>;
