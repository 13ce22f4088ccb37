//! Export and import commands.

use skillstore_core::{ImportOptions, Store};
use std::path::Path;
use tracing::info;

/// Export the whole store to `file`.
pub fn export(store: &Store, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    info!("Exporting {:?} to {:?}", store.dir().root(), file);
    let summary = store.export_to(file)?;

    println!("✓ Export written to {}", summary.path.display());
    for (name, count) in &summary.record_counts {
        println!("  {:<20} {:>8} record(s)", name, count);
    }
    println!("  Total: {}", summary.total_records());
    Ok(())
}

/// Replace the store with the contents of `file`.
pub fn import(
    store: &Store,
    file: &Path,
    correlation_id: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!("Export file not found: {}", file.display()).into());
    }

    info!("Importing {:?} into {:?}", file, store.dir().root());
    let options = match correlation_id {
        Some(id) => ImportOptions::new().correlation_id(id),
        None => ImportOptions::new(),
    };
    let summary = store.import_from(file, &options)?;

    println!("✓ Import complete");
    println!("  Pre-import backup: {}", summary.backup.display());
    for (name, count) in &summary.imported {
        println!("  {:<20} {:>8} record(s)", name, count);
    }
    for name in &summary.skipped {
        println!("  skipped unknown dataset '{name}'");
    }
    Ok(())
}
