//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A lock could not be acquired within the retry budget.
    ///
    /// This is fatal for the operation that requested the lock. A holder
    /// that crashed leaves its lock file behind and every later acquisition
    /// of the same key ends here until an operator removes the file.
    #[error("could not acquire lock '{key}' after {attempts} attempts")]
    LockTimeout {
        /// The lock key (dataset name or schema key).
        key: String,
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    /// A path had no parent directory or file name where one was required.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

impl StorageError {
    /// Returns true if this error is a lock timeout.
    #[must_use]
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }
}
