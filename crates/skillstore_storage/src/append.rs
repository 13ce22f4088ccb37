//! Synced line appends for append-only logs.

use crate::error::StorageResult;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Appends `line` plus a trailing newline to `path` and syncs the data.
///
/// The file and its parent directories are created if missing. The line is
/// written with a single `write_all` so concurrent readers see either the
/// previous end of file or the complete new line in practice; callers that
/// append to the same file must still serialize through a lock.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, written, or synced.
pub fn append_line(path: &Path, line: &str) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut buf = Vec::with_capacity(line.len() + 1);
    buf.extend_from_slice(line.as_bytes());
    buf.push(b'\n');

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(&buf)?;
    file.sync_data()?;
    Ok(())
}
