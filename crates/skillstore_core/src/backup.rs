//! Point-in-time backups of the whole store.
//!
//! A backup is a directory mirroring the live layout:
//!
//! ```text
//! backups/2024-05-01/120000-daily/
//! ├─ schema.json
//! └─ <dataset>/{records.json, journal.log}
//! ```
//!
//! Files that do not exist yet are skipped, so a partially initialized store
//! can still be backed up. Backup directories are never overwritten: a second
//! backup within the same second gets a numeric suffix.

use crate::dir::StoreDir;
use crate::error::CoreResult;
use crate::store::Store;
use crate::types::DatasetName;
use chrono::{DateTime, NaiveDate, NaiveTime, SubsecRound, TimeZone, Utc};
use skillstore_storage::{copy_if_exists, remove_if_exists};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Label of the once-a-day backup.
pub const DAILY_LABEL: &str = "daily";
/// Label of the backup taken before an import.
pub const PRE_IMPORT_LABEL: &str = "pre-import";
/// Label of the backup taken before a migration run.
pub const PRE_MIGRATION_LABEL: &str = "pre-migration";

/// A backup directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    /// Backup directory.
    pub path: PathBuf,
    /// When the backup was taken, to the second (UTC).
    pub created_at: DateTime<Utc>,
    /// Sanitized label, if any.
    pub label: Option<String>,
}

impl Store {
    /// Records the time in `lastBackupAt`, then copies the metadata file and
    /// every dataset file and journal into a new backup directory.
    ///
    /// The copied metadata already carries the stamp, so restoring this
    /// backup does not make the store forget it.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or a copy fails.
    pub fn create_backup(&self, label: Option<&str>) -> CoreResult<BackupInfo> {
        let now = Utc::now();
        let label = label.map(sanitize_label).filter(|l| !l.is_empty());
        let path = create_unique_dir(&self.dir().backups_dir(), now, label.as_deref())?;
        let target = StoreDir::new(&path);

        self.update_metadata(|meta| meta.last_backup_at = Some(now))?;
        copy_if_exists(&self.dir().schema_path(), &target.schema_path())?;
        for name in DatasetName::ALL {
            let records = copy_if_exists(&self.dir().records_path(name), &target.records_path(name))?;
            let journal = copy_if_exists(&self.dir().journal_path(name), &target.journal_path(name))?;
            debug!(dataset = %name, records, journal, "dataset copied");
        }
        info!(path = %path.display(), "backup created");

        Ok(BackupInfo {
            path,
            created_at: now.trunc_subsecs(0),
            label,
        })
    }

    /// Creates a [`DAILY_LABEL`] backup unless one was already taken today
    /// (UTC). Returns the new backup, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be read or the backup fails.
    pub fn ensure_daily_backup(&self) -> CoreResult<Option<BackupInfo>> {
        let today = Utc::now().date_naive();
        let metadata = self.get_metadata()?;
        if metadata
            .last_backup_at
            .is_some_and(|at| at.date_naive() == today)
        {
            debug!("daily backup already taken");
            return Ok(None);
        }
        self.create_backup(Some(DAILY_LABEL)).map(Some)
    }

    /// Lists backup directories, oldest first.
    ///
    /// Directories that do not follow the backup naming scheme are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backups directory cannot be read.
    pub fn list_backups(&self) -> CoreResult<Vec<BackupInfo>> {
        let root = self.dir().backups_dir();
        let mut backups = Vec::new();

        for day in read_dir_sorted(&root)? {
            let Some(date) = file_name(&day).and_then(|n| NaiveDate::parse_from_str(&n, "%Y-%m-%d").ok())
            else {
                continue;
            };
            for dir in read_dir_sorted(&day)? {
                if let Some(info) = file_name(&dir).and_then(|n| parse_backup_name(date, &n, &dir)) {
                    backups.push(info);
                }
            }
        }

        backups.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.path.cmp(&b.path)));
        Ok(backups)
    }

    /// Restores the store from a backup directory.
    ///
    /// Each dataset's file and journal are replaced under that dataset's lock;
    /// live files the backup does not contain are removed. The metadata file
    /// is restored last, under the schema lock.
    ///
    /// # Errors
    ///
    /// Returns an error if a lock cannot be acquired or a copy fails. Datasets
    /// restored before the failure stay restored.
    pub fn restore_backup(&self, backup: &Path) -> CoreResult<()> {
        let source = StoreDir::new(backup);

        for name in DatasetName::ALL {
            let _lock = self.lock_dataset(name)?;
            restore_file(&source.records_path(name), &self.dir().records_path(name))?;
            restore_file(&source.journal_path(name), &self.dir().journal_path(name))?;
        }

        {
            let _lock = self.lock_schema()?;
            restore_file(&source.schema_path(), &self.dir().schema_path())?;
        }

        info!(path = %backup.display(), "store restored from backup");
        Ok(())
    }
}

fn restore_file(src: &Path, dst: &Path) -> CoreResult<()> {
    if !copy_if_exists(src, dst)? {
        remove_if_exists(dst)?;
    }
    Ok(())
}

/// Replaces every character outside `[A-Za-z0-9_-]` with `-`.
fn sanitize_label(label: &str) -> String {
    label
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}

fn create_unique_dir(root: &Path, now: DateTime<Utc>, label: Option<&str>) -> CoreResult<PathBuf> {
    let day_dir = root.join(now.format("%Y-%m-%d").to_string());
    fs::create_dir_all(&day_dir)?;

    let time = now.format("%H%M%S").to_string();
    let suffix = label.map(|l| format!("-{l}")).unwrap_or_default();

    let mut counter = 0u32;
    loop {
        let name = if counter == 0 {
            format!("{time}{suffix}")
        } else {
            format!("{time}_{counter}{suffix}")
        };
        let path = day_dir.join(name);
        match fs::create_dir(&path) {
            Ok(()) => return Ok(path),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => counter += 1,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Parses `HHMMSS[_n][-label]`.
fn parse_backup_name(date: NaiveDate, name: &str, path: &Path) -> Option<BackupInfo> {
    let time = NaiveTime::parse_from_str(name.get(..6)?, "%H%M%S").ok()?;
    let mut rest = &name[6..];

    if let Some(stripped) = rest.strip_prefix('_') {
        let digits = stripped.find('-').unwrap_or(stripped.len());
        if digits == 0 || !stripped[..digits].bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        rest = &stripped[digits..];
    }

    let label = match rest {
        "" => None,
        _ => Some(rest.strip_prefix('-')?.to_string()),
    };

    Some(BackupInfo {
        path: path.to_path_buf(),
        created_at: Utc.from_utc_datetime(&date.and_time(time)),
        label,
    })
}

fn read_dir_sorted(path: &Path) -> CoreResult<Vec<PathBuf>> {
    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::config::Config;
    use crate::metadata::SchemaMetadata;
    use crate::record::{BaseRecord, User};
    use crate::transaction::TransactionOptions;
    use tempfile::tempdir;

    fn test_store(dir: &Path) -> Store {
        Store::open(Config::new().data_dir(dir).auto_daily_backup(false))
    }

    #[test]
    fn labels_are_sanitized() {
        assert_eq!(sanitize_label("pre import/2"), "pre-import-2");
        assert_eq!(sanitize_label("nightly_v2"), "nightly_v2");
    }

    #[test]
    fn backup_names_parse() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let p = Path::new("x");

        let plain = parse_backup_name(date, "120000", p).unwrap();
        assert_eq!(plain.label, None);

        let labeled = parse_backup_name(date, "120000_2-pre-import", p).unwrap();
        assert_eq!(labeled.label.as_deref(), Some("pre-import"));
        assert_eq!(labeled.created_at.to_rfc3339(), "2024-05-01T12:00:00+00:00");

        assert!(parse_backup_name(date, "notes", p).is_none());
        assert!(parse_backup_name(date, "120000_x", p).is_none());
    }

    #[test]
    fn backup_copies_existing_files_only() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        store
            .transaction(
                &catalog::USERS,
                |mut s| {
                    s.records.push(User::new(BaseRecord::new("u-1"), "a@x"));
                    Ok(s)
                },
                &TransactionOptions::new(),
            )
            .unwrap();

        let info = store.create_backup(Some("manual")).unwrap();
        let copy = StoreDir::new(&info.path);

        assert!(copy.schema_path().exists());
        assert!(copy.records_path(DatasetName::Users).exists());
        assert!(copy.journal_path(DatasetName::Users).exists());
        assert!(!copy.records_path(DatasetName::Coaching).exists());
        assert_eq!(info.label.as_deref(), Some("manual"));
        assert!(store.get_metadata().unwrap().last_backup_at.is_some());
    }

    #[test]
    fn restored_backup_remembers_itself() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        store.init().unwrap();
        assert!(store.get_metadata().unwrap().last_backup_at.is_none());

        let info = store.create_backup(Some("pre-import")).unwrap();
        let copied = SchemaMetadata::load(&StoreDir::new(&info.path).schema_path())
            .unwrap()
            .unwrap();
        assert!(copied.last_backup_at.is_some());

        store.restore_backup(&info.path).unwrap();
        assert_eq!(store.get_metadata().unwrap().last_backup_at, copied.last_backup_at);
        assert!(store.ensure_daily_backup().unwrap().is_none());
        assert_eq!(store.list_backups().unwrap().len(), 1);
    }

    #[test]
    fn same_second_backups_do_not_collide() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());

        let a = store.create_backup(Some("x")).unwrap();
        let b = store.create_backup(Some("x")).unwrap();
        assert_ne!(a.path, b.path);
        assert_eq!(store.list_backups().unwrap().len(), 2);
    }

    #[test]
    fn restore_removes_files_missing_from_backup() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        let backup = store.create_backup(None).unwrap();

        store
            .transaction(&catalog::COACHING, Ok, &TransactionOptions::new())
            .unwrap();
        assert!(store.dir().records_path(DatasetName::Coaching).exists());

        store.restore_backup(&backup.path).unwrap();
        assert!(!store.dir().records_path(DatasetName::Coaching).exists());
        assert!(!store.dir().journal_path(DatasetName::Coaching).exists());
    }
}
