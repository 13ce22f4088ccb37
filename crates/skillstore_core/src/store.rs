//! Store facade.
//!
//! A [`Store`] is a cheap, cloneable handle on one data directory. It holds no
//! in-memory state beyond its configuration: every read goes to disk and every
//! write is guarded by a lock file, so several handles (or processes) may work
//! on the same directory at once.

use crate::catalog::{DatasetDefinition, DatasetState};
use crate::config::Config;
use crate::dir::{StoreDir, SCHEMA_LOCK_KEY};
use crate::error::{CoreError, CoreResult};
use crate::journal::{self, ChainReport, JournalEntry};
use crate::metadata::SchemaMetadata;
use crate::record::Record;
use crate::types::DatasetName;
use chrono::Utc;
use serde::Serialize;
use skillstore_storage::{atomic_write, FileLock};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// Untyped contents of every dataset, keyed by name.
pub type Snapshot = BTreeMap<DatasetName, DatasetState<serde_json::Value>>;

/// Handle on a data directory.
#[derive(Debug, Clone)]
pub struct Store {
    config: Config,
    dir: StoreDir,
}

impl Store {
    /// Opens a store on `config.data_dir`. No I/O is performed until the
    /// first operation.
    #[must_use]
    pub fn open(config: Config) -> Self {
        let dir = StoreDir::new(config.data_dir.clone());
        Self { config, dir }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the directory layout.
    #[must_use]
    pub fn dir(&self) -> &StoreDir {
        &self.dir
    }

    /// Creates every missing dataset file with its empty state, makes sure the
    /// metadata has an entry per dataset, then takes the daily backup if
    /// enabled.
    ///
    /// Existing files are left untouched, so `init` is safe to call on every
    /// start.
    ///
    /// # Errors
    ///
    /// Returns an error if a lock cannot be acquired or a file cannot be
    /// written.
    pub fn init(&self) -> CoreResult<()> {
        fs::create_dir_all(self.dir.root())?;

        let mut created = Vec::new();
        let mut versions = Vec::with_capacity(DatasetName::ALL.len());
        for name in DatasetName::ALL {
            let def = name.definition();
            let _lock = self.lock_dataset(name)?;
            let path = self.dir.records_path(name);
            let state = if path.exists() {
                self.read_dataset(&def)?
            } else {
                let state = def.empty_state();
                self.write_json(&path, &state)?;
                created.push(name);
                state
            };
            versions.push((name, state.schema_version));
        }

        let now = Utc::now();
        self.update_metadata(|meta| {
            for (name, version) in versions {
                if meta.entry(name).is_none() {
                    meta.record_version(name, version, now);
                }
            }
        })?;

        if !created.is_empty() {
            info!(path = %self.dir.root().display(), ?created, "initialized datasets");
        }

        if self.config.auto_daily_backup {
            self.ensure_daily_backup()?;
        }
        Ok(())
    }

    /// Returns the schema metadata, or empty metadata if none was written yet.
    ///
    /// # Errors
    ///
    /// Returns an error if `schema.json` exists but cannot be read.
    pub fn get_metadata(&self) -> CoreResult<SchemaMetadata> {
        Ok(SchemaMetadata::load(&self.dir.schema_path())?.unwrap_or_default())
    }

    /// Reads a dataset. A missing file yields the definition's empty state and
    /// nothing is written.
    ///
    /// Reads take no lock; the atomic rename on write means a read always sees
    /// a complete file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not hold a valid
    /// state for `T`.
    pub fn read_dataset<T: Record>(&self, def: &DatasetDefinition<T>) -> CoreResult<DatasetState<T>> {
        read_state(&self.dir.records_path(def.name()), def)
    }

    /// Reads every dataset in its untyped form.
    ///
    /// # Errors
    ///
    /// Returns the first read error.
    pub fn read_all(&self) -> CoreResult<Snapshot> {
        DatasetName::ALL
            .into_iter()
            .map(|name| {
                self.read_dataset(&name.definition())
                    .map(|state| (name, state))
            })
            .collect()
    }

    /// Reads the journal of a dataset, oldest entry first.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be read or parsed.
    pub fn read_journal(&self, name: DatasetName) -> CoreResult<Vec<JournalEntry>> {
        journal::read_journal(&self.dir.journal_path(name))
    }

    /// Checks a dataset's journal chain against its live records.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal or dataset cannot be read.
    pub fn verify_journal(&self, name: DatasetName) -> CoreResult<ChainReport> {
        let entries = self.read_journal(name)?;
        let state = self.read_dataset(&name.definition())?;
        let current = journal::checksum_records(&state.records)?;
        Ok(journal::verify_chain(&entries, &current))
    }

    /// Acquires the lock of a dataset.
    pub(crate) fn lock_dataset(&self, name: DatasetName) -> CoreResult<FileLock> {
        let lock = FileLock::acquire(
            &self.dir.lock_path(name),
            name.as_str(),
            &self.config.lock_policy(),
        )?;
        debug!(path = %lock.path().display(), "dataset lock acquired");
        Ok(lock)
    }

    /// Acquires the lock of `schema.json`.
    pub(crate) fn lock_schema(&self) -> CoreResult<FileLock> {
        let lock = FileLock::acquire(
            &self.dir.schema_lock_path(),
            SCHEMA_LOCK_KEY,
            &self.config.lock_policy(),
        )?;
        Ok(lock)
    }

    /// Applies `f` to the metadata under the schema lock and writes it back.
    pub(crate) fn update_metadata<F>(&self, f: F) -> CoreResult<SchemaMetadata>
    where
        F: FnOnce(&mut SchemaMetadata),
    {
        let _lock = self.lock_schema()?;
        let mut metadata = self.get_metadata()?;
        f(&mut metadata);
        self.write_json(&self.dir.schema_path(), &metadata)?;
        debug!("schema metadata written");
        Ok(metadata)
    }

    /// Serializes `value` and writes it atomically to `path`.
    pub(crate) fn write_json<S: Serialize + ?Sized>(&self, path: &Path, value: &S) -> CoreResult<()> {
        let mut bytes = if self.config.pretty_json {
            serde_json::to_vec_pretty(value)?
        } else {
            serde_json::to_vec(value)?
        };
        bytes.push(b'\n');
        atomic_write(path, &bytes)?;
        Ok(())
    }
}

/// Reads a dataset state file, falling back to the empty state.
pub(crate) fn read_state<T: Record>(
    path: &Path,
    def: &DatasetDefinition<T>,
) -> CoreResult<DatasetState<T>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(def.empty_state()),
        Err(e) => return Err(e.into()),
    };

    serde_json::from_slice(&data)
        .map_err(|e| CoreError::invalid_format(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use tempfile::tempdir;

    fn test_store(dir: &Path) -> Store {
        Store::open(Config::new().data_dir(dir).auto_daily_backup(false))
    }

    #[test]
    fn read_missing_dataset_is_empty_and_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());

        let users = store.read_dataset(&catalog::USERS).unwrap();
        assert!(users.is_empty());
        assert_eq!(users.schema_version, 1);
        assert!(!store.dir().records_path(DatasetName::Users).exists());
    }

    #[test]
    fn init_creates_files_and_metadata() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        store.init().unwrap();

        let meta = store.get_metadata().unwrap();
        for name in DatasetName::ALL {
            assert!(store.dir().records_path(name).exists(), "{name}");
            assert_eq!(meta.entry(name).unwrap().schema_version, 1);
            assert!(!store.dir().lock_path(name).exists());
        }
        assert!(!store.dir().backups_dir().exists());
    }

    #[test]
    fn init_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        store.init().unwrap();
        let first = store.get_metadata().unwrap();
        let bytes = fs::read(store.dir().records_path(DatasetName::Users)).unwrap();

        store.init().unwrap();
        assert_eq!(store.get_metadata().unwrap(), first);
        assert_eq!(fs::read(store.dir().records_path(DatasetName::Users)).unwrap(), bytes);
    }

    #[test]
    fn corrupt_dataset_is_reported_with_path() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        let path = store.dir().records_path(DatasetName::Progress);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"{\"schemaVersion\": 1").unwrap();

        let err = store.read_dataset(&catalog::PROGRESS).unwrap_err();
        assert!(matches!(err, CoreError::InvalidFormat { .. }));
        assert!(err.to_string().contains("records.json"));
    }

    #[test]
    fn read_all_covers_every_dataset() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        let snapshot = store.read_all().unwrap();
        assert_eq!(snapshot.len(), DatasetName::ALL.len());
    }

    #[test]
    fn compact_json_when_not_pretty() {
        let dir = tempdir().unwrap();
        let store = Store::open(
            Config::new()
                .data_dir(dir.path())
                .auto_daily_backup(false)
                .pretty_json(false),
        );
        store.init().unwrap();

        let text = fs::read_to_string(store.dir().records_path(DatasetName::Users)).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
