//! Inspect command implementation.

use super::OutputFormat;
use serde::Serialize;
use skillstore_core::{DatasetName, Store};

/// Store inspection result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectResult {
    /// Data directory.
    pub path: String,
    /// Metadata format version.
    pub metadata_version: u32,
    /// Time of the last backup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_backup_at: Option<String>,
    /// Per-dataset statistics.
    pub datasets: Vec<DatasetStats>,
}

/// Statistics for a single dataset.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetStats {
    /// Dataset name.
    pub name: DatasetName,
    /// Whether the dataset file exists.
    pub exists: bool,
    /// Number of records.
    pub record_count: usize,
    /// Schema version on disk.
    pub schema_version: u32,
    /// Declared schema version.
    pub declared_version: u32,
    /// Version recorded in the metadata, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_version: Option<u32>,
    /// Number of journal entries.
    pub journal_entries: usize,
    /// Time of the last commit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<String>,
}

/// Runs the inspect command.
pub fn run(store: &Store, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let metadata = store.get_metadata()?;

    let mut datasets = Vec::with_capacity(DatasetName::ALL.len());
    for name in DatasetName::ALL {
        let state = store.read_dataset(&name.definition())?;
        datasets.push(DatasetStats {
            name,
            exists: store.dir().records_path(name).exists(),
            record_count: state.len(),
            schema_version: state.schema_version,
            declared_version: name.schema_version(),
            metadata_version: metadata.entry(name).map(|e| e.schema_version),
            journal_entries: store.read_journal(name)?.len(),
            last_updated_at: state.last_updated_at.map(|t| t.to_rfc3339()),
        });
    }

    let result = InspectResult {
        path: store.dir().root().display().to_string(),
        metadata_version: metadata.version,
        last_backup_at: metadata.last_backup_at.map(|t| t.to_rfc3339()),
        datasets,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("SkillStore: {}", result.path);
    println!("  Metadata version: {}", result.metadata_version);
    println!(
        "  Last backup: {}",
        result.last_backup_at.as_deref().unwrap_or("never")
    );
    println!();
    println!(
        "{:<20} {:>8} {:>8} {:>8} {:>8}",
        "DATASET", "RECORDS", "VERSION", "DECLARED", "JOURNAL"
    );
    for ds in &result.datasets {
        let marker = if ds.exists { "" } else { " (missing)" };
        println!(
            "{:<20} {:>8} {:>8} {:>8} {:>8}{}",
            ds.name.as_str(),
            ds.record_count,
            ds.schema_version,
            ds.declared_version,
            ds.journal_entries,
            marker
        );
    }
}
