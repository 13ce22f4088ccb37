//! Store directory layout.
//!
//! ```text
//! <data_dir>/
//! ├─ schema.json                 # SchemaMetadata
//! ├─ .schema.lock                # lock for schema.json
//! ├─ <dataset>/
//! │  ├─ records.json             # DatasetState
//! │  ├─ journal.log              # one JournalEntry per line
//! │  └─ .lock                    # exclusive-create dataset lock
//! └─ backups/<YYYY-MM-DD>/<HHMMSS>[-label]/
//!    ├─ schema.json
//!    └─ <dataset>/{records.json, journal.log}
//! ```
//!
//! Backups mirror the live layout so a backup directory can be read with the
//! same path helpers as the store itself.

use crate::types::DatasetName;
use std::path::{Path, PathBuf};

/// Metadata file name.
pub const SCHEMA_FILE: &str = "schema.json";
/// Lock file guarding the metadata file.
pub const SCHEMA_LOCK_FILE: &str = ".schema.lock";
/// Lock key used for the metadata file.
pub const SCHEMA_LOCK_KEY: &str = "schema";
/// Dataset state file name.
pub const RECORDS_FILE: &str = "records.json";
/// Dataset journal file name.
pub const JOURNAL_FILE: &str = "journal.log";
/// Dataset lock file name.
pub const LOCK_FILE: &str = ".lock";
/// Directory holding backups.
pub const BACKUPS_DIR: &str = "backups";

/// Path helpers for a store (or backup) directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreDir {
    root: PathBuf,
}

impl StoreDir {
    /// Creates a layout rooted at `root`. No I/O is performed.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path to `schema.json`.
    #[must_use]
    pub fn schema_path(&self) -> PathBuf {
        self.root.join(SCHEMA_FILE)
    }

    /// Returns the path to the metadata lock file.
    #[must_use]
    pub fn schema_lock_path(&self) -> PathBuf {
        self.root.join(SCHEMA_LOCK_FILE)
    }

    /// Returns the directory of a dataset.
    #[must_use]
    pub fn dataset_dir(&self, name: DatasetName) -> PathBuf {
        self.root.join(name.as_str())
    }

    /// Returns the path to a dataset's `records.json`.
    #[must_use]
    pub fn records_path(&self, name: DatasetName) -> PathBuf {
        self.dataset_dir(name).join(RECORDS_FILE)
    }

    /// Returns the path to a dataset's `journal.log`.
    #[must_use]
    pub fn journal_path(&self, name: DatasetName) -> PathBuf {
        self.dataset_dir(name).join(JOURNAL_FILE)
    }

    /// Returns the path to a dataset's lock file.
    #[must_use]
    pub fn lock_path(&self, name: DatasetName) -> PathBuf {
        self.dataset_dir(name).join(LOCK_FILE)
    }

    /// Returns the backups directory.
    #[must_use]
    pub fn backups_dir(&self) -> PathBuf {
        self.root.join(BACKUPS_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_correct() {
        let dir = StoreDir::new("/srv/data");

        assert_eq!(dir.schema_path(), PathBuf::from("/srv/data/schema.json"));
        assert_eq!(
            dir.records_path(DatasetName::LearningPlans),
            PathBuf::from("/srv/data/learningPlans/records.json")
        );
        assert_eq!(
            dir.journal_path(DatasetName::Users),
            PathBuf::from("/srv/data/users/journal.log")
        );
        assert_eq!(
            dir.lock_path(DatasetName::Coaching),
            PathBuf::from("/srv/data/coaching/.lock")
        );
        assert_eq!(dir.backups_dir(), PathBuf::from("/srv/data/backups"));
    }
}
