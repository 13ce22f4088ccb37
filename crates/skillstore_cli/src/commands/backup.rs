//! Backup and restore commands.
//!
//! Backups are directories under `<data>/backups/`; these commands go
//! through the store so restores take the same locks as transactions.

use skillstore_core::Store;
use std::path::Path;
use tracing::info;

/// Create a backup of the store.
pub fn create(store: &Store, label: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    info!("Creating backup of {:?}", store.dir().root());
    let backup = store.create_backup(label)?;

    println!("✓ Backup created successfully");
    println!("  Path: {}", backup.path.display());
    println!("  Created: {}", backup.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if let Some(label) = &backup.label {
        println!("  Label: {label}");
    }
    Ok(())
}

/// List backups, oldest first.
pub fn list(store: &Store) -> Result<(), Box<dyn std::error::Error>> {
    let backups = store.list_backups()?;

    if backups.is_empty() {
        println!("No backups found.");
        return Ok(());
    }

    println!("{:<22} {:<14} PATH", "CREATED (UTC)", "LABEL");
    for backup in &backups {
        println!(
            "{:<22} {:<14} {}",
            backup.created_at.format("%Y-%m-%d %H:%M:%S"),
            backup.label.as_deref().unwrap_or("-"),
            backup.path.display()
        );
    }
    println!();
    println!("{} backup(s)", backups.len());
    Ok(())
}

/// Restore the store from a backup directory.
pub fn restore(store: &Store, dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !dir.is_dir() {
        return Err(format!("Backup directory not found: {}", dir.display()).into());
    }

    info!("Restoring store from {:?}", dir);
    store.restore_backup(dir)?;

    println!("✓ Store restored successfully");
    println!("  From: {}", dir.display());
    Ok(())
}
