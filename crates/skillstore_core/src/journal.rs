//! Append-only transaction journal.
//!
//! Every committed transaction appends exactly one JSON line to the dataset's
//! `journal.log`. Entries carry SHA-256 checksums of the record array before
//! and after the change, so the journal forms a chain that can be checked
//! against the live dataset file:
//!
//! ```text
//! entry[0].after == entry[1].before, ..., entry[n].after == checksum(live)
//! ```
//!
//! The dataset file is written before its journal line. A crash between the
//! two leaves the journal one transaction behind the data; [`verify_chain`]
//! reports that case as a lag instead of a break.

use crate::error::{CoreError, CoreResult};
use crate::types::DatasetName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;
use uuid::Uuid;

/// One committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    /// Unique entry id.
    pub id: String,
    /// Dataset the transaction changed.
    pub dataset: DatasetName,
    /// Commit time.
    pub timestamp: DateTime<Utc>,
    /// Checksum of the records before the change.
    pub checksum_before: String,
    /// Checksum of the records after the change.
    pub checksum_after: String,
    /// Record count before the change.
    pub record_count_before: usize,
    /// Record count after the change.
    pub record_count_after: usize,
    /// Caller-supplied description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Caller-supplied correlation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl JournalEntry {
    /// Creates an entry stamped now with a fresh id.
    #[must_use]
    pub fn new(
        dataset: DatasetName,
        checksum_before: String,
        checksum_after: String,
        record_count_before: usize,
        record_count_after: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            dataset,
            timestamp: Utc::now(),
            checksum_before,
            checksum_after,
            record_count_before,
            record_count_after,
            description: None,
            correlation_id: None,
        }
    }

    /// Returns true if the transaction left the records unchanged.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.checksum_before == self.checksum_after
    }
}

/// Computes the checksum of a record array.
///
/// Records are converted to `serde_json::Value` first, whose object maps keep
/// keys sorted, so the digest does not depend on struct field order. The
/// transaction engine hashes the records in their stored form.
///
/// # Errors
///
/// Returns an error if a record cannot be serialized.
pub fn checksum_records<T: Serialize>(records: &[T]) -> CoreResult<String> {
    let canonical = serde_json::to_value(records)?;
    let bytes = serde_json::to_vec(&canonical)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Appends `entry` as one line to the journal at `path`.
///
/// # Errors
///
/// Returns an error if the entry cannot be encoded or the append fails.
pub fn append(path: &Path, entry: &JournalEntry) -> CoreResult<()> {
    let line = serde_json::to_string(entry)?;
    skillstore_storage::append_line(path, &line)?;
    Ok(())
}

/// Reads every entry of the journal at `path`, oldest first.
///
/// A missing journal is empty. Blank lines are skipped.
///
/// # Errors
///
/// Returns `InvalidFormat` naming the line number if a line does not parse.
pub fn read_journal(path: &Path) -> CoreResult<Vec<JournalEntry>> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    data.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| {
                CoreError::invalid_format(format!(
                    "{} line {}: {e}",
                    path.display(),
                    index + 1
                ))
            })
        })
        .collect()
}

/// A link in the chain whose checksums do not match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainBreak {
    /// Index of the entry whose `checksum_before` does not match.
    pub index: usize,
    /// Id of that entry.
    pub entry_id: String,
    /// Checksum the previous link ended with.
    pub expected: String,
    /// Checksum the entry starts from.
    pub found: String,
}

/// Result of checking a journal against the live dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReport {
    /// Number of entries checked.
    pub entries: usize,
    /// Links inside the journal that do not connect.
    pub breaks: Vec<ChainBreak>,
    /// The last entry does not end at the live checksum.
    pub lagging: bool,
    /// Checksum of the live records.
    pub current_checksum: String,
}

impl ChainReport {
    /// Returns true if every link connects and the journal is not behind.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.breaks.is_empty() && !self.lagging
    }
}

/// Checks that `entries` form a chain ending at `current_checksum`.
///
/// A mismatch between the final entry and the live records is reported as
/// `lagging`: it is the gap a crash between the dataset write and the journal
/// append leaves behind. An empty journal lags only if the live records are
/// not the empty array.
#[must_use]
pub fn verify_chain(entries: &[JournalEntry], current_checksum: &str) -> ChainReport {
    let mut breaks = Vec::new();

    for (index, pair) in entries.windows(2).enumerate() {
        let (prev, next) = (&pair[0], &pair[1]);
        if prev.checksum_after != next.checksum_before {
            breaks.push(ChainBreak {
                index: index + 1,
                entry_id: next.id.clone(),
                expected: prev.checksum_after.clone(),
                found: next.checksum_before.clone(),
            });
        }
    }

    let lagging = match entries.last() {
        Some(last) => last.checksum_after != current_checksum,
        None => checksum_of_empty() != current_checksum,
    };

    ChainReport {
        entries: entries.len(),
        breaks,
        lagging,
        current_checksum: current_checksum.to_string(),
    }
}

fn checksum_of_empty() -> String {
    format!("{:x}", Sha256::digest(b"[]"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn entry(before: &str, after: &str) -> JournalEntry {
        JournalEntry::new(DatasetName::Users, before.into(), after.into(), 0, 0)
    }

    #[test]
    fn checksum_ignores_field_order() {
        let a = checksum_records(&[json!({"id": "1", "email": "a@x"})]).unwrap();
        let b = checksum_records(&[json!({"email": "a@x", "id": "1"})]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn checksum_of_empty_matches_helper() {
        let empty: Vec<serde_json::Value> = Vec::new();
        assert_eq!(checksum_records(&empty).unwrap(), checksum_of_empty());
    }

    #[test]
    fn append_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users").join("journal.log");

        let mut first = entry("a", "b");
        first.description = Some("signup".into());
        let mut second = entry("b", "c");
        second.correlation_id = Some("req-7".into());

        append(&path, &first).unwrap();
        append(&path, &second).unwrap();

        let entries = read_journal(&path).unwrap();
        assert_eq!(entries, vec![first, second]);
    }

    #[test]
    fn read_missing_journal_is_empty() {
        let dir = tempdir().unwrap();
        assert!(read_journal(&dir.path().join("journal.log")).unwrap().is_empty());
    }

    #[test]
    fn read_reports_bad_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.log");
        append(&path, &entry("a", "b")).unwrap();
        fs::write(&path, format!("{}{{oops\n", fs::read_to_string(&path).unwrap())).unwrap();

        let err = read_journal(&path).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn chain_reports_breaks_and_lag() {
        let entries = vec![entry("a", "b"), entry("b", "c"), entry("x", "d")];

        let report = verify_chain(&entries, "d");
        assert_eq!(report.breaks.len(), 1);
        assert_eq!(report.breaks[0].index, 2);
        assert!(!report.lagging);

        let report = verify_chain(&entries[..2], "d");
        assert!(report.breaks.is_empty());
        assert!(report.lagging);
        assert!(!report.is_consistent());
    }

    #[test]
    fn empty_journal_on_empty_dataset_is_consistent() {
        assert!(verify_chain(&[], &checksum_of_empty()).is_consistent());
        assert!(verify_chain(&[], "deadbeef").lagging);
    }

    #[test]
    fn wire_format_is_camel_case() {
        let value = serde_json::to_value(entry("a", "b")).unwrap();
        assert_eq!(value["dataset"], "users");
        assert_eq!(value["checksumBefore"], "a");
        assert!(value.get("recordCountAfter").is_some());
        assert!(value.get("description").is_none());
    }
}
