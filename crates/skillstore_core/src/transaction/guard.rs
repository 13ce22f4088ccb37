//! Pre-write checks on a mutated dataset state.

use crate::catalog::{DatasetDefinition, DatasetState};
use crate::error::{CoreError, CoreResult};
use std::collections::HashSet;

/// Rejects a schema version above the declared ceiling.
pub(super) fn check_schema_version<T>(
    def: &DatasetDefinition<T>,
    state: &DatasetState<T>,
) -> CoreResult<()> {
    if state.schema_version > def.schema_version() {
        return Err(CoreError::SchemaVersionOverreach {
            dataset: def.name(),
            requested: state.schema_version,
            ceiling: def.schema_version(),
        });
    }
    Ok(())
}

/// Rejects records without a primary key and repeated keys.
pub(super) fn check_primary_keys<T>(def: &DatasetDefinition<T>, records: &[T]) -> CoreResult<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let id = def.primary_key(record).ok_or(CoreError::MissingRecordId {
            dataset: def.name(),
            index,
        })?;
        if !seen.insert(id) {
            return Err(CoreError::DuplicateRecordId {
                dataset: def.name(),
                id: id.to_string(),
            });
        }
    }
    Ok(())
}
