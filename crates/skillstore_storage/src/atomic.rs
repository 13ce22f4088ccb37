//! Atomic file replacement and safe copies.
//!
//! Every durable write in SkillStore goes through [`atomic_write`]:
//!
//! 1. Write the full payload to `<path>.tmp`
//! 2. Sync the temporary file to disk
//! 3. Rename the temporary file over the target
//! 4. Fsync the parent directory so the rename itself is durable
//!
//! The rename is the only step that makes a new version visible, so a crash
//! at any point leaves either the old file or the new one, never a torn mix.

use crate::error::{StorageError, StorageResult};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Suffix appended to a target path to build its temporary sibling.
const TEMP_SUFFIX: &str = ".tmp";

/// Returns the temporary path used while atomically replacing `path`.
///
/// The suffix is appended to the full file name (`records.json` becomes
/// `records.json.tmp`) rather than replacing the extension.
#[must_use]
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

/// Atomically replaces the contents of `path` with `data`.
///
/// Parent directories are created if needed.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be written or synced, or if
/// the rename fails. On error the previous contents of `path` are untouched.
pub fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    let parent = path
        .parent()
        .ok_or_else(|| StorageError::InvalidPath(path.display().to_string()))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)?;
    }

    let temp = temp_path(path);
    {
        let mut file = File::create(&temp)?;
        file.write_all(data)?;
        file.flush()?;
        file.sync_all()?;
    }

    if let Err(e) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(e.into());
    }

    sync_directory(parent)?;
    Ok(())
}

/// Copies `src` to `dst` durably if `src` exists.
///
/// Returns `Ok(false)` without touching `dst` when the source is missing, so
/// partially initialized stores can still be snapshotted.
///
/// # Errors
///
/// Returns an error if the source exists but cannot be read, or the
/// destination cannot be written.
pub fn copy_if_exists(src: &Path, dst: &Path) -> StorageResult<bool> {
    let data = match fs::read(src) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    atomic_write(dst, &data)?;
    Ok(true)
}

/// Removes `path` if it exists.
///
/// Returns `Ok(true)` if a file was removed.
///
/// # Errors
///
/// Returns an error for any failure other than the file being absent.
pub fn remove_if_exists(path: &Path) -> StorageResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Syncs a directory so that renames and creations inside it are durable.
///
/// Windows NTFS journals metadata updates and does not support opening a
/// directory for fsync, so this is a no-op there.
#[cfg(unix)]
fn sync_directory(dir: &Path) -> StorageResult<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_directory(_dir: &Path) -> StorageResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn temp_path_appends_suffix() {
        let path = Path::new("/data/users/records.json");
        assert_eq!(temp_path(path), PathBuf::from("/data/users/records.json.tmp"));
    }

    #[test]
    fn atomic_write_creates_file_and_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("records.json");

        atomic_write(&path, b"payload").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"payload");
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn atomic_write_replaces_existing_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");

        atomic_write(&path, b"old contents that are longer").unwrap();
        atomic_write(&path, b"new").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn failed_rename_keeps_previous_version() {
        let dir = tempdir().unwrap();
        // A directory at the target path makes the rename fail.
        let path = dir.path().join("occupied");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("inner"), b"x").unwrap();

        assert!(atomic_write(&path, b"data").is_err());
        assert!(path.is_dir());
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn copy_skips_missing_source() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("missing.json");
        let dst = dir.path().join("copy.json");

        assert!(!copy_if_exists(&src, &dst).unwrap());
        assert!(!dst.exists());
    }

    #[test]
    fn copy_duplicates_contents() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("journal.log");
        let dst = dir.path().join("backup").join("journal.log");
        fs::write(&src, b"line-1\nline-2\n").unwrap();

        assert!(copy_if_exists(&src, &dst).unwrap());
        assert_eq!(fs::read(&dst).unwrap(), b"line-1\nline-2\n");
    }

    #[test]
    fn remove_reports_whether_file_existed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");
        fs::write(&path, b"{}").unwrap();

        assert!(remove_if_exists(&path).unwrap());
        assert!(!remove_if_exists(&path).unwrap());
    }

    proptest! {
        #[test]
        fn atomic_write_round_trips_arbitrary_bytes(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let dir = tempdir().unwrap();
            let path = dir.path().join("blob");
            atomic_write(&path, &data).unwrap();
            prop_assert_eq!(fs::read(&path).unwrap(), data);
        }
    }
}
