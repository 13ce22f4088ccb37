//! Error types for SkillStore core.

use crate::types::DatasetName;
use crate::validation::ValidationReport;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in SkillStore core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage primitive error, including lock-contention exhaustion.
    #[error("storage error: {0}")]
    Storage(#[from] skillstore_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON encoding or decoding error on a persisted file.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The state produced for a dataset is not a valid dataset state.
    #[error("invalid state for dataset {dataset}: {message}")]
    InvalidState {
        /// Dataset being written.
        dataset: DatasetName,
        /// Description of the structural problem.
        message: String,
    },

    /// A transaction tried to raise the schema version above the declared ceiling.
    #[error("dataset {dataset}: schema version {requested} exceeds declared version {ceiling}")]
    SchemaVersionOverreach {
        /// Dataset being written.
        dataset: DatasetName,
        /// Version reported by the mutator.
        requested: u32,
        /// Version declared in the catalog.
        ceiling: u32,
    },

    /// A record has no primary key.
    #[error("dataset {dataset}: record at index {index} has no id")]
    MissingRecordId {
        /// Dataset being written.
        dataset: DatasetName,
        /// Position of the offending record.
        index: usize,
    },

    /// Two records share a primary key.
    #[error("dataset {dataset}: duplicate record id '{id}'")]
    DuplicateRecordId {
        /// Dataset being written.
        dataset: DatasetName,
        /// The repeated id.
        id: String,
    },

    /// A dataset name is not part of the catalog.
    #[error("unknown dataset: {name}")]
    UnknownDataset {
        /// The name that failed to resolve.
        name: String,
    },

    /// A file or payload does not have the expected format.
    #[error("invalid format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },

    /// A mutator rejected the transaction.
    #[error("transaction aborted: {reason}")]
    Aborted {
        /// Reason given by the caller.
        reason: String,
    },

    /// Import failed; the store was restored from the pre-import backup.
    #[error("import failed and was rolled back from {}: {source}", .backup.display())]
    ImportFailed {
        /// Backup the store was restored from.
        backup: PathBuf,
        /// The error that aborted the import.
        #[source]
        source: Box<CoreError>,
    },

    /// Import failed and restoring the pre-import backup failed too.
    #[error(
        "import failed ({import_error}) and rollback from {} failed: {rollback_error}",
        .backup.display()
    )]
    RollbackFailed {
        /// Backup that could not be restored.
        backup: PathBuf,
        /// The error that aborted the import.
        import_error: String,
        /// The error raised while restoring.
        rollback_error: String,
    },

    /// Migration failed.
    #[error("migration failed: {message}")]
    MigrationFailed {
        /// Description of the failure.
        message: String,
    },

    /// Validation found error-level issues where they are fatal.
    #[error("validation failed with {} error(s)", .report.error_count())]
    ValidationFailed {
        /// The full report.
        report: Box<ValidationReport>,
    },
}

impl CoreError {
    /// Creates an invalid state error.
    pub fn invalid_state(dataset: DatasetName, message: impl Into<String>) -> Self {
        Self::InvalidState {
            dataset,
            message: message.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Creates an aborted error, for mutators that reject a change.
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted {
            reason: reason.into(),
        }
    }

    /// Creates a migration failed error.
    pub fn migration_failed(message: impl Into<String>) -> Self {
        Self::MigrationFailed {
            message: message.into(),
        }
    }

    /// Returns true if the error is a lock-contention timeout.
    #[must_use]
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, Self::Storage(e) if e.is_lock_timeout())
    }
}
