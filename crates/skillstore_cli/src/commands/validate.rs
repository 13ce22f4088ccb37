//! Validate command implementation.

use super::{CliError, OutputFormat};
use skillstore_core::{Store, ValidationReport};

/// Runs the validate command. Fails if the report has errors.
pub fn run(store: &Store, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let report = store.validate();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }

    if report.has_errors {
        return Err(CliError::ValidationErrors(report.error_count()).into());
    }
    Ok(())
}

fn print_report(report: &ValidationReport) {
    if report.issues.is_empty() {
        println!("✓ No issues found");
        return;
    }

    for issue in &report.issues {
        let ids = if issue.record_ids.is_empty() {
            String::new()
        } else {
            format!(" [{}]", issue.record_ids.join(", "))
        };
        println!("{:<8} {:<18} {}{}", issue.level, issue.dataset, issue.message, ids);
    }
    println!();

    let summary = format!(
        "{} error(s), {} warning(s)",
        report.error_count(),
        report.warning_count()
    );
    if report.has_errors {
        println!("✗ {summary}");
    } else {
        println!("✓ {summary}");
    }
}
