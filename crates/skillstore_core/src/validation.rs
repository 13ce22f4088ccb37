//! Structural and referential validation.
//!
//! Validation never fails: everything it finds, including unreadable files,
//! is reported as an issue. Callers decide whether error-level issues are
//! fatal for what they are doing.

use crate::catalog::DatasetState;
use crate::error::{CoreError, CoreResult};
use crate::metadata::SchemaMetadata;
use crate::store::Store;
use crate::types::DatasetName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// Issue source name used for metadata problems.
pub const SCHEMA_SOURCE: &str = "schema";

/// Severity of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueLevel {
    /// Tolerated, e.g. a pending migration.
    Warning,
    /// Data is inconsistent.
    Error,
}

impl fmt::Display for IssueLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.pad("warning"),
            Self::Error => f.pad("error"),
        }
    }
}

/// One finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    /// Dataset name, or `"schema"` for metadata issues.
    pub dataset: String,
    /// Severity.
    pub level: IssueLevel,
    /// Human-readable description.
    pub message: String,
    /// Ids of the records involved.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub record_ids: Vec<String>,
}

impl ValidationIssue {
    fn error(dataset: DatasetName, message: impl Into<String>, record_ids: Vec<String>) -> Self {
        Self {
            dataset: dataset.as_str().to_string(),
            level: IssueLevel::Error,
            message: message.into(),
            record_ids,
        }
    }

    fn warning(dataset: DatasetName, message: impl Into<String>) -> Self {
        Self {
            dataset: dataset.as_str().to_string(),
            level: IssueLevel::Warning,
            message: message.into(),
            record_ids: Vec::new(),
        }
    }
}

/// The outcome of a validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// When validation started.
    pub started_at: DateTime<Utc>,
    /// When validation finished.
    pub completed_at: DateTime<Utc>,
    /// All findings, in check order.
    pub issues: Vec<ValidationIssue>,
    /// True iff at least one issue is an error.
    pub has_errors: bool,
}

impl ValidationReport {
    /// Number of error-level issues.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.count(IssueLevel::Error)
    }

    /// Number of warning-level issues.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.count(IssueLevel::Warning)
    }

    /// Issues at `level`.
    pub fn issues_at(&self, level: IssueLevel) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.level == level)
    }

    fn count(&self, level: IssueLevel) -> usize {
        self.issues_at(level).count()
    }
}

/// A reference field and the dataset it must resolve in.
struct Reference {
    field: &'static str,
    target: DatasetName,
    optional: bool,
}

const fn required(field: &'static str, target: DatasetName) -> Reference {
    Reference {
        field,
        target,
        optional: false,
    }
}

/// Foreign keys checked by the referential pass.
fn references(name: DatasetName) -> &'static [Reference] {
    const USER: Reference = required("userId", DatasetName::Users);
    const PLAN: Reference = required("planId", DatasetName::LearningPlans);
    const TIER: Reference = Reference {
        field: "tierId",
        target: DatasetName::SubscriptionTiers,
        optional: true,
    };

    match name {
        DatasetName::LearningPlans => &[USER],
        DatasetName::Progress | DatasetName::Gamification | DatasetName::Coaching => &[USER, PLAN],
        DatasetName::Subscriptions => &[USER, TIER],
        DatasetName::Users | DatasetName::SubscriptionTiers => &[],
    }
}

impl Store {
    /// Validates every dataset and the references between them.
    #[must_use]
    pub fn validate(&self) -> ValidationReport {
        let started_at = Utc::now();
        let mut issues = Vec::new();

        let metadata = match self.get_metadata() {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                issues.push(ValidationIssue {
                    dataset: SCHEMA_SOURCE.to_string(),
                    level: IssueLevel::Error,
                    message: format!("cannot read schema metadata: {e}"),
                    record_ids: Vec::new(),
                });
                None
            }
        };

        let mut states = BTreeMap::new();
        for name in DatasetName::ALL {
            match self.read_dataset(&name.definition()) {
                Ok(state) => {
                    check_dataset(name, &state, metadata.as_ref(), &mut issues);
                    states.insert(name, state);
                }
                Err(e) => issues.push(ValidationIssue::error(
                    name,
                    format!("cannot read dataset: {e}"),
                    Vec::new(),
                )),
            }
        }

        check_references(&states, &mut issues);

        let has_errors = issues.iter().any(|i| i.level == IssueLevel::Error);
        ValidationReport {
            started_at,
            completed_at: Utc::now(),
            issues,
            has_errors,
        }
    }

    /// Like [`Store::validate`], returning `ValidationFailed` if the report
    /// has errors.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` carrying the report.
    pub fn validate_strict(&self) -> CoreResult<ValidationReport> {
        let report = self.validate();
        if report.has_errors {
            return Err(CoreError::ValidationFailed {
                report: Box::new(report),
            });
        }
        Ok(report)
    }
}

fn check_dataset(
    name: DatasetName,
    state: &DatasetState<Value>,
    metadata: Option<&SchemaMetadata>,
    issues: &mut Vec<ValidationIssue>,
) {
    let def = name.definition();

    let mut missing = 0usize;
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in &state.records {
        match def.primary_key(record) {
            Some(id) => *counts.entry(id).or_default() += 1,
            None => missing += 1,
        }
    }

    let mut duplicates: Vec<String> = counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(id, _)| id.to_string())
        .collect();
    if !duplicates.is_empty() {
        duplicates.sort();
        issues.push(ValidationIssue::error(
            name,
            format!("{} duplicate record id(s)", duplicates.len()),
            duplicates,
        ));
    }
    if missing > 0 {
        issues.push(ValidationIssue::error(
            name,
            format!("{missing} record(s) without an id"),
            Vec::new(),
        ));
    }

    // Records at an older version are expected to differ until migrated.
    if state.schema_version == def.schema_version() {
        check_shapes(name, state, issues);
    }

    if state.schema_version != def.schema_version() {
        issues.push(ValidationIssue::warning(
            name,
            format!(
                "schema version {} differs from declared version {}",
                state.schema_version,
                def.schema_version()
            ),
        ));
    }

    if let Some(metadata) = metadata {
        if metadata.entry(name).is_none() {
            issues.push(ValidationIssue::warning(name, "no entry in schema metadata"));
        }
    }
}

/// Reports keyed records the typed catalog cannot read.
fn check_shapes(name: DatasetName, state: &DatasetState<Value>, issues: &mut Vec<ValidationIssue>) {
    let def = name.definition();
    let mut malformed = Vec::new();
    let mut first_error = None;
    for record in &state.records {
        let Some(id) = def.primary_key(record) else {
            continue;
        };
        if let Err(e) = name.check_shape(record) {
            first_error.get_or_insert_with(|| e.to_string());
            malformed.push(id.to_string());
        }
    }

    if let Some(first_error) = first_error {
        issues.push(ValidationIssue::error(
            name,
            format!("{} malformed record(s): {first_error}", malformed.len()),
            malformed,
        ));
    }
}

fn check_references(
    states: &BTreeMap<DatasetName, DatasetState<Value>>,
    issues: &mut Vec<ValidationIssue>,
) {
    let ids: HashMap<DatasetName, HashSet<&str>> = states
        .iter()
        .map(|(name, state)| {
            let def = name.definition();
            let set = state.records.iter().filter_map(|r| def.primary_key(r)).collect();
            (*name, set)
        })
        .collect();

    for (name, state) in states {
        let def = name.definition();
        for reference in references(*name) {
            // An unreadable target was already reported.
            let Some(targets) = ids.get(&reference.target) else {
                continue;
            };

            for record in &state.records {
                let value = record.get(reference.field).filter(|v| !v.is_null());
                let resolved = match value {
                    None if reference.optional => continue,
                    Some(Value::String(id)) => targets.contains(id.as_str()),
                    _ => false,
                };
                if resolved {
                    continue;
                }

                let record_id = def.primary_key(record).unwrap_or("<missing id>").to_string();
                let message = match value {
                    None => format!(
                        "record {record_id} has no {} ({} reference)",
                        reference.field, reference.target
                    ),
                    Some(Value::String(id)) => format!(
                        "record {record_id} references missing {} '{id}' via {}",
                        reference.target, reference.field
                    ),
                    Some(other) => format!(
                        "record {record_id} has non-string {} {other}",
                        reference.field
                    ),
                };
                issues.push(ValidationIssue::error(*name, message, vec![record_id]));
            }
        }
    }
}
