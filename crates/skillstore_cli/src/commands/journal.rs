//! Journal dump command implementation.

use super::OutputFormat;
use skillstore_core::{DatasetName, JournalEntry, Store};

/// Runs the journal command.
pub fn run(
    store: &Store,
    dataset: &str,
    limit: Option<usize>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let name: DatasetName = dataset.parse()?;
    let entries = store.read_journal(name)?;
    let entries = tail(&entries, limit);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(entries)?),
        OutputFormat::Text => print_text_output(name, entries),
    }
    Ok(())
}

fn tail(entries: &[JournalEntry], limit: Option<usize>) -> &[JournalEntry] {
    match limit {
        Some(n) if n < entries.len() => &entries[entries.len() - n..],
        _ => entries,
    }
}

fn print_text_output(name: DatasetName, entries: &[JournalEntry]) {
    if entries.is_empty() {
        println!("No journal entries for {name}.");
        return;
    }

    for entry in entries {
        println!(
            "{}  {:>5} -> {:<5} {}  {}{}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.record_count_before,
            entry.record_count_after,
            change(entry),
            entry.description.as_deref().unwrap_or("-"),
            entry
                .correlation_id
                .as_deref()
                .map(|c| format!(" ({c})"))
                .unwrap_or_default()
        );
    }
    println!();
    println!("{} entr(ies) shown", entries.len());
}

fn short(checksum: &str) -> &str {
    checksum.get(..12).unwrap_or(checksum)
}

/// Checksum transition, or `unchanged` for a commit that kept the records.
fn change(entry: &JournalEntry) -> String {
    if entry.is_noop() {
        format!("{:<26}", "unchanged")
    } else {
        format!("{}..{}", short(&entry.checksum_before), short(&entry.checksum_after))
    }
}
