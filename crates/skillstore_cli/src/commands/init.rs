//! Init command implementation.

use skillstore_core::Store;
use tracing::info;

/// Creates missing dataset files and metadata entries.
pub fn run(store: &Store) -> Result<(), Box<dyn std::error::Error>> {
    info!("Initializing store at {:?}", store.dir().root());
    store.init()?;

    println!("✓ Store initialized at {}", store.dir().root().display());
    if let Some(at) = store.get_metadata()?.last_backup_at {
        println!("  Last backup: {}", at.to_rfc3339());
    }
    Ok(())
}
