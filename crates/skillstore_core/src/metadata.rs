//! Schema metadata catalog persisted in `schema.json`.
//!
//! One instance exists per storage root. It records, for every dataset, the
//! schema version last written and when that version last changed, plus the
//! time of the most recent backup. All writes happen under the schema lock.

use crate::error::{CoreError, CoreResult};
use crate::types::DatasetName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

/// Current metadata format version.
pub const METADATA_VERSION: u32 = 1;

/// Metadata entry for one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    /// Dataset name.
    pub name: String,
    /// Schema version of the dataset file.
    pub schema_version: u32,
    /// When the schema version last changed.
    pub last_migrated_at: DateTime<Utc>,
}

/// Process-wide catalog of dataset versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaMetadata {
    /// Metadata format version.
    pub version: u32,
    /// Entries keyed by dataset name.
    #[serde(default)]
    pub datasets: BTreeMap<String, DatasetMetadata>,
    /// Time of the most recent backup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_backup_at: Option<DateTime<Utc>>,
}

impl Default for SchemaMetadata {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaMetadata {
    /// Creates empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: METADATA_VERSION,
            datasets: BTreeMap::new(),
            last_backup_at: None,
        }
    }

    /// Returns the entry for a dataset.
    #[must_use]
    pub fn entry(&self, name: DatasetName) -> Option<&DatasetMetadata> {
        self.datasets.get(name.as_str())
    }

    /// Records that `name` is now at `schema_version`.
    ///
    /// `last_migrated_at` moves only when the entry is new or the version
    /// changed. Returns true in that case.
    pub fn record_version(&mut self, name: DatasetName, schema_version: u32, now: DateTime<Utc>) -> bool {
        match self.datasets.get_mut(name.as_str()) {
            Some(entry) if entry.schema_version == schema_version => false,
            Some(entry) => {
                entry.schema_version = schema_version;
                entry.last_migrated_at = now;
                true
            }
            None => {
                self.datasets.insert(
                    name.as_str().to_string(),
                    DatasetMetadata {
                        name: name.as_str().to_string(),
                        schema_version,
                        last_migrated_at: now,
                    },
                );
                true
            }
        }
    }

    /// Loads metadata from `path`. Returns `None` if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid metadata.
    pub fn load(path: &Path) -> CoreResult<Option<Self>> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let metadata: Self = serde_json::from_slice(&data).map_err(|e| {
            CoreError::invalid_format(format!("{}: {e}", path.display()))
        })?;
        Ok(Some(metadata))
    }
}
