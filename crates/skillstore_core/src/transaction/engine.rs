//! Transaction engine.

use super::guard;
use super::options::{TransactionOptions, TransactionOutcome};
use crate::catalog::{DatasetDefinition, DatasetState};
use crate::error::{CoreError, CoreResult};
use crate::journal::{self, JournalEntry};
use crate::record::Record;
use crate::store::{self, Store};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

impl Store {
    /// Runs `mutator` against the current state of `def`'s dataset and
    /// commits the result.
    ///
    /// Steps, all under the dataset lock:
    ///
    /// 1. read the current state (empty if the file is missing)
    /// 2. call `mutator` with a copy whose `last_updated_at` is cleared
    /// 3. reject a schema version above the declared one
    /// 4. stamp `last_updated_at` if the mutator left it unset
    /// 5. reject missing or repeated primary keys
    /// 6. write the dataset file, update its metadata entry, append a journal
    ///    line
    ///
    /// Checksums cover the records as stored. A record the mutator returns
    /// unchanged is written back in its stored form, so a typed view never
    /// rewrites fields its Rust type normalizes (timestamp precision, null
    /// optionals).
    ///
    /// The lock is released when this returns, on success and on error.
    ///
    /// # Errors
    ///
    /// - the mutator's own error, unchanged
    /// - `SchemaVersionOverreach`, `MissingRecordId`, `DuplicateRecordId`
    ///   when a guard rejects the result; nothing is written
    /// - `InvalidFormat` if a stored record does not fit `T`
    /// - `Storage` with a lock timeout if the dataset stays locked
    /// - I/O errors from the commit
    pub fn transaction<T, F>(
        &self,
        def: &DatasetDefinition<T>,
        mutator: F,
        options: &TransactionOptions,
    ) -> CoreResult<TransactionOutcome<T>>
    where
        T: Record,
        F: FnOnce(DatasetState<T>) -> CoreResult<DatasetState<T>>,
    {
        let name = def.name();
        let path = self.dir().records_path(name);
        let _lock = self.lock_dataset(name)?;

        let stored = store::read_state(&path, &def.untyped())?;
        let before = DatasetState {
            schema_version: stored.schema_version,
            records: decode_records::<T>(&path, &stored.records)?,
            last_updated_at: None,
        };

        let mut after = mutator(before.clone())?;

        guard::check_schema_version(def, &after)?;
        let now = Utc::now();
        if after.last_updated_at.is_none() {
            after.last_updated_at = Some(now);
        }
        guard::check_primary_keys(def, &after.records)?;

        let written = DatasetState {
            schema_version: after.schema_version,
            records: encode_records(def, &after.records, &before.records, &stored.records)?,
            last_updated_at: after.last_updated_at,
        };
        let checksum_before = journal::checksum_records(&stored.records)?;
        let checksum_after = journal::checksum_records(&written.records)?;

        self.write_json(&path, &written)?;

        let schema_version = after.schema_version;
        self.update_metadata(|meta| {
            meta.record_version(name, schema_version, now);
        })?;

        let mut entry = JournalEntry::new(
            name,
            checksum_before,
            checksum_after,
            stored.records.len(),
            written.records.len(),
        );
        entry.description = options.description.clone();
        entry.correlation_id = options.correlation_id.clone();
        journal::append(&self.dir().journal_path(name), &entry)?;

        info!(
            dataset = %name,
            records = after.records.len(),
            schema_version,
            description = options.description.as_deref().unwrap_or(""),
            "transaction committed"
        );

        Ok(TransactionOutcome {
            state: after,
            journal: entry,
        })
    }
}

fn decode_records<T: Record>(path: &Path, stored: &[Value]) -> CoreResult<Vec<T>> {
    stored
        .iter()
        .enumerate()
        .map(|(index, value)| {
            T::deserialize(value).map_err(|e| {
                CoreError::invalid_format(format!("{} record {index}: {e}", path.display()))
            })
        })
        .collect()
}

/// Serializes `records`, reusing the stored form of each record whose
/// serialization matches the decoded original with the same key.
fn encode_records<T: Record>(
    def: &DatasetDefinition<T>,
    records: &[T],
    before: &[T],
    stored: &[Value],
) -> CoreResult<Vec<Value>> {
    let mut untouched: HashMap<&str, (Value, &Value)> = HashMap::with_capacity(before.len());
    for (record, original) in before.iter().zip(stored) {
        if let Some(key) = def.primary_key(record) {
            untouched.insert(key, (serde_json::to_value(record)?, original));
        }
    }

    records
        .iter()
        .map(|record| -> CoreResult<Value> {
            let value = serde_json::to_value(record)?;
            let original = def
                .primary_key(record)
                .and_then(|key| untouched.get(key))
                .filter(|(decoded, _)| *decoded == value)
                .map(|(_, original)| (*original).clone());
            Ok(original.unwrap_or(value))
        })
        .collect()
}
