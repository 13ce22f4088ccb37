//! Full-store export and all-or-nothing import.
//!
//! The export format is a single JSON document:
//!
//! ```json
//! {
//!   "exportedAt": "2024-05-01T12:00:00Z",
//!   "version": 1,
//!   "metadata": { "version": 1, "datasets": { ... } },
//!   "datasets": { "users": { "schemaVersion": 1, "records": [ ... ] }, ... }
//! }
//! ```
//!
//! Import takes a `pre-import` backup first and restores it if any step
//! fails, so the store ends up either fully replaced or untouched.

use crate::backup::PRE_IMPORT_LABEL;
use crate::catalog::DatasetState;
use crate::error::{CoreError, CoreResult};
use crate::metadata::SchemaMetadata;
use crate::store::Store;
use crate::transaction::TransactionOptions;
use crate::types::DatasetName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Version of the export document format.
pub const EXPORT_FORMAT_VERSION: u32 = 1;

const IMPORT_DESCRIPTION: &str = "import";
const DEFAULT_IMPORT_CORRELATION_ID: &str = "import";

/// A complete export of the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    /// When the export was taken.
    pub exported_at: DateTime<Utc>,
    /// Export format version.
    pub version: u32,
    /// Schema metadata at export time.
    pub metadata: SchemaMetadata,
    /// Raw dataset states keyed by dataset name.
    ///
    /// Values are kept as raw JSON so a malformed entry is caught by the
    /// dataset's own transaction, inside the rollback scope.
    pub datasets: BTreeMap<String, Value>,
}

/// Result of an export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// File written.
    pub path: PathBuf,
    /// Record count per dataset.
    pub record_counts: BTreeMap<DatasetName, usize>,
}

impl ExportSummary {
    /// Total number of records exported.
    #[must_use]
    pub fn total_records(&self) -> usize {
        self.record_counts.values().sum()
    }
}

/// Options for an import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Correlation id recorded on every journal entry the import writes.
    /// Defaults to `"import"`.
    pub correlation_id: Option<String>,
}

impl ImportOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the correlation id.
    #[must_use]
    pub fn correlation_id(mut self, value: impl Into<String>) -> Self {
        self.correlation_id = Some(value.into());
        self
    }
}

/// Result of a successful import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    /// The pre-import backup.
    pub backup: PathBuf,
    /// Datasets replaced, with their new record counts.
    pub imported: BTreeMap<DatasetName, usize>,
    /// Payload entries that name no known dataset.
    pub skipped: Vec<String>,
}

impl Store {
    /// Initializes the store, then writes every dataset and the metadata to
    /// `path` as one JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if a dataset cannot be read or the file cannot be
    /// written.
    pub fn export_to(&self, path: &Path) -> CoreResult<ExportSummary> {
        self.init()?;

        let metadata = self.get_metadata()?;
        let snapshot = self.read_all()?;

        let mut datasets = BTreeMap::new();
        let mut record_counts = BTreeMap::new();
        for (name, state) in snapshot {
            record_counts.insert(name, state.len());
            datasets.insert(name.as_str().to_string(), serde_json::to_value(&state)?);
        }

        let payload = ExportPayload {
            exported_at: Utc::now(),
            version: EXPORT_FORMAT_VERSION,
            metadata,
            datasets,
        };
        self.write_json(path, &payload)?;

        let summary = ExportSummary {
            path: path.to_path_buf(),
            record_counts,
        };
        info!(path = %path.display(), records = summary.total_records(), "store exported");
        Ok(summary)
    }

    /// Replaces the store with the contents of an export file.
    ///
    /// The file is parsed before anything is touched. Then a `pre-import`
    /// backup is taken, the metadata is replaced, and every dataset in the
    /// payload is replaced through a regular transaction. Unknown dataset
    /// names are skipped with a warning; datasets missing from the payload
    /// are left as they are.
    ///
    /// # Errors
    ///
    /// - `InvalidFormat` / `Io` if the file cannot be read or parsed; nothing
    ///   changed
    /// - `ImportFailed` if a step failed and the backup was restored
    /// - `RollbackFailed` if restoring the backup failed as well
    pub fn import_from(&self, path: &Path, options: &ImportOptions) -> CoreResult<ImportSummary> {
        let payload = read_payload(path)?;

        let backup = self.create_backup(Some(PRE_IMPORT_LABEL))?.path;

        match self.apply_import(payload, options) {
            Ok((imported, skipped)) => {
                info!(
                    path = %path.display(),
                    datasets = imported.len(),
                    "store imported"
                );
                Ok(ImportSummary {
                    backup,
                    imported,
                    skipped,
                })
            }
            Err(import_error) => {
                warn!(error = %import_error, backup = %backup.display(), "import failed, rolling back");
                match self.restore_backup(&backup) {
                    Ok(()) => Err(CoreError::ImportFailed {
                        backup,
                        source: Box::new(import_error),
                    }),
                    Err(rollback_error) => {
                        error!(error = %rollback_error, "rollback failed");
                        Err(CoreError::RollbackFailed {
                            backup,
                            import_error: import_error.to_string(),
                            rollback_error: rollback_error.to_string(),
                        })
                    }
                }
            }
        }
    }

    fn apply_import(
        &self,
        payload: ExportPayload,
        options: &ImportOptions,
    ) -> CoreResult<(BTreeMap<DatasetName, usize>, Vec<String>)> {
        let ExportPayload {
            metadata, datasets, ..
        } = payload;

        self.update_metadata(|meta| {
            // The metadata file also records the backup we just took.
            let last_backup_at = meta.last_backup_at;
            *meta = metadata;
            meta.last_backup_at = last_backup_at.max(meta.last_backup_at);
        })?;

        let mut by_name: BTreeMap<DatasetName, Value> = BTreeMap::new();
        let mut skipped = Vec::new();
        for (key, value) in datasets {
            match key.parse::<DatasetName>() {
                Ok(name) => {
                    by_name.insert(name, value);
                }
                Err(_) => {
                    warn!(dataset = %key, "skipping unknown dataset in import payload");
                    skipped.push(key);
                }
            }
        }

        let correlation_id = options
            .correlation_id
            .clone()
            .unwrap_or_else(|| DEFAULT_IMPORT_CORRELATION_ID.to_string());
        let tx_options = TransactionOptions::new()
            .description(IMPORT_DESCRIPTION)
            .correlation_id(correlation_id);

        let mut imported = BTreeMap::new();
        for name in DatasetName::ALL {
            let Some(raw) = by_name.remove(&name) else {
                continue;
            };
            let outcome = self.transaction(
                &name.definition(),
                |_| {
                    let state = serde_json::from_value::<DatasetState<Value>>(raw)
                        .map_err(|e| CoreError::invalid_state(name, e.to_string()))?;
                    check_shapes(name, &state)?;
                    Ok(state)
                },
                &tx_options,
            )?;
            imported.insert(name, outcome.state.len());
        }

        Ok((imported, skipped))
    }
}

/// Rejects records the typed catalog could not read back.
///
/// Datasets at another schema version are left to the migration runner.
fn check_shapes(name: DatasetName, state: &DatasetState<Value>) -> CoreResult<()> {
    if state.schema_version != name.schema_version() {
        return Ok(());
    }
    for (index, record) in state.records.iter().enumerate() {
        name.check_shape(record).map_err(|e| {
            let id = record.get("id").and_then(Value::as_str).unwrap_or("<missing id>");
            CoreError::invalid_state(name, format!("record {index} ({id}): {e}"))
        })?;
    }
    Ok(())
}

fn read_payload(path: &Path) -> CoreResult<ExportPayload> {
    let data = fs::read(path)?;
    let payload: ExportPayload = serde_json::from_slice(&data)
        .map_err(|e| CoreError::invalid_format(format!("{}: {e}", path.display())))?;

    if payload.version > EXPORT_FORMAT_VERSION {
        return Err(CoreError::invalid_format(format!(
            "{}: export format version {} is newer than supported version {}",
            path.display(),
            payload.version,
            EXPORT_FORMAT_VERSION
        )));
    }
    Ok(payload)
}
