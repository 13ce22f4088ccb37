//! Schema migrations.
//!
//! Migrations in SkillStore are:
//! - **Per dataset**: each step moves one dataset from one version to the next
//! - **Forward-only**: there is no automatic rollback; a `pre-migration`
//!   backup is taken before every run instead
//! - **Transactional**: each step is its own journaled transaction
//!
//! When no registered step leads to a dataset's declared version, the runner
//! finishes with a sync transaction that only sets `schemaVersion`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use skillstore_core::{DatasetName, FnMigration, MigrationRegistry, MigrationRunner};
//!
//! let mut registry = MigrationRegistry::new();
//! registry.register(Box::new(FnMigration::new(
//!     DatasetName::Users, 1, 2, "split display name",
//!     |mut state| { /* rewrite state.records */ Ok(state) },
//! )))?;
//!
//! let result = MigrationRunner::new(registry).run(&store)?;
//! ```

use crate::backup::PRE_MIGRATION_LABEL;
use crate::catalog::DatasetState;
use crate::error::{CoreError, CoreResult};
use crate::store::Store;
use crate::transaction::TransactionOptions;
use crate::types::DatasetName;
use crate::validation::ValidationReport;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

const SYNC_DESCRIPTION: &str = "schema version sync";

/// A single migration step for one dataset.
pub trait Migration: Send + Sync {
    /// Dataset the step applies to.
    fn dataset(&self) -> DatasetName;

    /// Version the step starts from.
    fn from_version(&self) -> u32;

    /// Version the step produces. Must be greater than `from_version`.
    fn to_version(&self) -> u32;

    /// Description recorded in the journal.
    fn description(&self) -> &str;

    /// Rewrites the dataset. The runner sets `schema_version` afterwards.
    fn migrate(&self, state: DatasetState<Value>) -> CoreResult<DatasetState<Value>>;
}

/// A [`Migration`] backed by a closure.
pub struct FnMigration<F> {
    dataset: DatasetName,
    from_version: u32,
    to_version: u32,
    description: String,
    f: F,
}

impl<F> FnMigration<F>
where
    F: Fn(DatasetState<Value>) -> CoreResult<DatasetState<Value>> + Send + Sync,
{
    /// Creates a step moving `dataset` from `from_version` to `to_version`.
    pub fn new(
        dataset: DatasetName,
        from_version: u32,
        to_version: u32,
        description: impl Into<String>,
        f: F,
    ) -> Self {
        Self {
            dataset,
            from_version,
            to_version,
            description: description.into(),
            f,
        }
    }
}

impl<F> Migration for FnMigration<F>
where
    F: Fn(DatasetState<Value>) -> CoreResult<DatasetState<Value>> + Send + Sync,
{
    fn dataset(&self) -> DatasetName {
        self.dataset
    }

    fn from_version(&self) -> u32 {
        self.from_version
    }

    fn to_version(&self) -> u32 {
        self.to_version
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn migrate(&self, state: DatasetState<Value>) -> CoreResult<DatasetState<Value>> {
        (self.f)(state)
    }
}

impl<F> fmt::Debug for FnMigration<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMigration")
            .field("dataset", &self.dataset)
            .field("from_version", &self.from_version)
            .field("to_version", &self.to_version)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Registered migration steps, keyed by dataset and starting version.
#[derive(Default)]
pub struct MigrationRegistry {
    steps: BTreeMap<(DatasetName, u32), Box<dyn Migration>>,
}

impl MigrationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The steps shipped with the application.
    ///
    /// Every dataset is still at its first schema version, so the list is
    /// empty; datasets found at an older version are brought up by a sync.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new()
    }

    /// Registers a step.
    ///
    /// # Errors
    ///
    /// Returns `MigrationFailed` if the step does not advance the version or
    /// a step for the same dataset and starting version already exists.
    pub fn register(&mut self, step: Box<dyn Migration>) -> CoreResult<()> {
        let key = (step.dataset(), step.from_version());
        if step.to_version() <= step.from_version() {
            return Err(CoreError::migration_failed(format!(
                "{} step {} -> {} does not advance the version",
                key.0,
                step.from_version(),
                step.to_version()
            )));
        }
        if self.steps.contains_key(&key) {
            return Err(CoreError::migration_failed(format!(
                "{} already has a step from version {}",
                key.0, key.1
            )));
        }
        self.steps.insert(key, step);
        Ok(())
    }

    /// Number of registered steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no steps are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The step that starts at `from` for `dataset`, if it does not go past
    /// `target`.
    fn next_step(&self, dataset: DatasetName, from: u32, target: u32) -> Option<&dyn Migration> {
        self.steps
            .get(&(dataset, from))
            .map(Box::as_ref)
            .filter(|step| step.to_version() <= target)
    }
}

impl fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationRegistry")
            .field("steps", &self.steps.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// How a step changes a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// A registered migration rewrites the records.
    Migration,
    /// Only `schemaVersion` is set.
    Sync,
}

/// A planned or applied step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedStep {
    /// Dataset changed.
    pub dataset: DatasetName,
    /// Version before the step.
    pub from_version: u32,
    /// Version after the step.
    pub to_version: u32,
    /// Migration or sync.
    pub kind: StepKind,
    /// Journal description.
    pub description: String,
}

impl AppliedStep {
    /// Correlation id recorded for the step, `migration:<dataset>:<from>-><to>`.
    #[must_use]
    pub fn correlation_id(&self) -> String {
        format!(
            "migration:{}:{}->{}",
            self.dataset, self.from_version, self.to_version
        )
    }
}

/// Outcome of a migration run.
#[derive(Debug, Clone)]
pub struct MigrationRunResult {
    /// The `pre-migration` backup.
    pub backup: PathBuf,
    /// Steps applied, in order.
    pub steps: Vec<AppliedStep>,
    /// Validation report taken after the last step.
    pub report: ValidationReport,
}

impl MigrationRunResult {
    /// Number of steps applied.
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.steps.len()
    }
}

/// Brings every dataset to its declared schema version.
#[derive(Debug, Default)]
pub struct MigrationRunner {
    registry: MigrationRegistry,
}

impl MigrationRunner {
    /// Creates a runner over `registry`.
    #[must_use]
    pub fn new(registry: MigrationRegistry) -> Self {
        Self { registry }
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    /// Computes the steps a run would apply, without writing anything.
    ///
    /// # Errors
    ///
    /// Returns an error if a dataset cannot be read.
    pub fn plan(&self, store: &Store) -> CoreResult<Vec<AppliedStep>> {
        let mut steps = Vec::new();
        for name in DatasetName::ALL {
            let state = store.read_dataset(&name.definition())?;
            steps.extend(self.plan_dataset(name, state.schema_version));
        }
        Ok(steps)
    }

    fn plan_dataset(&self, name: DatasetName, current: u32) -> Vec<AppliedStep> {
        let target = name.schema_version();
        let mut version = current;
        let mut steps = Vec::new();

        while let Some(step) = self.registry.next_step(name, version, target) {
            steps.push(AppliedStep {
                dataset: name,
                from_version: version,
                to_version: step.to_version(),
                kind: StepKind::Migration,
                description: step.description().to_string(),
            });
            version = step.to_version();
        }

        if version != target {
            steps.push(AppliedStep {
                dataset: name,
                from_version: version,
                to_version: target,
                kind: StepKind::Sync,
                description: SYNC_DESCRIPTION.to_string(),
            });
        }
        steps
    }

    /// Takes a `pre-migration` backup, applies every planned step through a
    /// transaction and validates the result.
    ///
    /// # Errors
    ///
    /// - `MigrationFailed` if a step fails or a dataset changed version
    ///   under the run
    /// - `ValidationFailed` if the migrated store has error-level issues;
    ///   the steps stay applied and the backup remains for manual recovery
    pub fn run(&self, store: &Store) -> CoreResult<MigrationRunResult> {
        let backup = store.create_backup(Some(PRE_MIGRATION_LABEL))?.path;
        let mut applied = Vec::new();

        for step in self.plan(store)? {
            self.apply(store, &step)?;
            info!(
                dataset = %step.dataset,
                from = step.from_version,
                to = step.to_version,
                kind = ?step.kind,
                "migration step applied"
            );
            applied.push(step);
        }

        let report = store.validate_strict().map_err(|e| {
            warn!(backup = %backup.display(), "validation failed after migration");
            e
        })?;

        info!(steps = applied.len(), "migration complete");
        Ok(MigrationRunResult {
            backup,
            steps: applied,
            report,
        })
    }

    fn apply(&self, store: &Store, step: &AppliedStep) -> CoreResult<()> {
        let migration = match step.kind {
            StepKind::Migration => self
                .registry
                .next_step(step.dataset, step.from_version, step.dataset.schema_version()),
            StepKind::Sync => None,
        };

        let options = TransactionOptions::new()
            .description(step.description.clone())
            .correlation_id(step.correlation_id());

        store.transaction(
            &step.dataset.definition(),
            |state| {
                if state.schema_version != step.from_version {
                    return Err(CoreError::migration_failed(format!(
                        "{} is at version {}, expected {}",
                        step.dataset, state.schema_version, step.from_version
                    )));
                }
                let mut next = match migration {
                    Some(migration) => migration.migrate(state).map_err(|e| {
                        CoreError::migration_failed(format!(
                            "{} {} -> {}: {e}",
                            step.dataset, step.from_version, step.to_version
                        ))
                    })?,
                    None => state,
                };
                next.schema_version = step.to_version;
                Ok(next)
            },
            &options,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn noop(dataset: DatasetName, from: u32, to: u32) -> Box<dyn Migration> {
        Box::new(FnMigration::new(dataset, from, to, "noop", Ok))
    }

    fn seed(store: &Store, name: DatasetName, state: serde_json::Value) {
        let path = store.dir().records_path(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_vec(&state).unwrap()).unwrap();
    }

    #[test]
    fn registry_rejects_bad_steps() {
        let mut registry = MigrationRegistry::new();
        registry.register(noop(DatasetName::Users, 0, 1)).unwrap();

        assert!(registry.register(noop(DatasetName::Users, 0, 2)).is_err());
        assert!(registry.register(noop(DatasetName::Users, 2, 2)).is_err());
        assert!(registry.register(noop(DatasetName::Progress, 0, 1)).is_ok());
        assert_eq!(registry.len(), 2);
        assert!(MigrationRegistry::builtin().is_empty());
    }

    #[test]
    fn plan_stops_at_target() {
        let mut registry = MigrationRegistry::new();
        registry.register(noop(DatasetName::Users, 0, 1)).unwrap();
        registry.register(noop(DatasetName::Users, 1, 2)).unwrap();
        let runner = MigrationRunner::new(registry);

        let steps = runner.plan_dataset(DatasetName::Users, 0);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].kind, StepKind::Migration);
        assert_eq!(steps[0].correlation_id(), "migration:users:0->1");

        assert!(runner.plan_dataset(DatasetName::Users, 1).is_empty());
    }

    #[test]
    fn run_applies_step_then_validates() {
        let dir = tempdir().unwrap();
        let store = Store::open(Config::new().data_dir(dir.path()).auto_daily_backup(false));
        store.init().unwrap();
        seed(
            &store,
            DatasetName::Users,
            json!({"schemaVersion": 0, "records": [{
                "id": "u-1",
                "mail": "a@x",
                "createdAt": "2024-01-01T00:00:00.000Z",
                "updatedAt": "2024-01-01T00:00:00.000Z"
            }]}),
        );

        let mut registry = MigrationRegistry::new();
        registry
            .register(Box::new(FnMigration::new(
                DatasetName::Users,
                0,
                1,
                "rename mail to email",
                |mut state| {
                    for record in &mut state.records {
                        if let Some(obj) = record.as_object_mut() {
                            if let Some(mail) = obj.remove("mail") {
                                obj.insert("email".into(), mail);
                            }
                        }
                    }
                    Ok(state)
                },
            )))
            .unwrap();

        let result = MigrationRunner::new(registry).run(&store).unwrap();
        assert_eq!(result.applied_count(), 1);
        assert!(result.backup.exists());
        assert!(!result.report.has_errors);

        let users = store.read_dataset(&DatasetName::Users.definition()).unwrap();
        assert_eq!(users.schema_version, 1);
        assert_eq!(users.records[0]["email"], "a@x");

        let journal = store.read_journal(DatasetName::Users).unwrap();
        let last = journal.last().unwrap();
        assert_eq!(last.description.as_deref(), Some("rename mail to email"));
        assert_eq!(last.correlation_id.as_deref(), Some("migration:users:0->1"));
    }

    #[test]
    fn missing_step_falls_back_to_sync() {
        let dir = tempdir().unwrap();
        let store = Store::open(Config::new().data_dir(dir.path()).auto_daily_backup(false));
        seed(&store, DatasetName::Coaching, json!({"schemaVersion": 0, "records": []}));

        let runner = MigrationRunner::new(MigrationRegistry::builtin());
        let plan = runner.plan(&store).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].kind, StepKind::Sync);

        runner.run(&store).unwrap();
        assert!(runner.plan(&store).unwrap().is_empty());
        let meta = store.get_metadata().unwrap();
        assert_eq!(meta.entry(DatasetName::Coaching).unwrap().schema_version, 1);
    }

    #[test]
    fn validation_errors_fail_the_run() {
        let dir = tempdir().unwrap();
        let store = Store::open(Config::new().data_dir(dir.path()).auto_daily_backup(false));
        seed(
            &store,
            DatasetName::Progress,
            json!({"schemaVersion": 0, "records": [{
                "id": "pr-1",
                "userId": "u-x",
                "planId": "p-x",
                "createdAt": "2024-01-01T00:00:00.000Z",
                "updatedAt": "2024-01-01T00:00:00.000Z"
            }]}),
        );

        let err = MigrationRunner::default().run(&store).unwrap_err();
        match err {
            CoreError::ValidationFailed { report } => assert_eq!(report.error_count(), 2),
            other => panic!("expected validation failure, got {other}"),
        }
        // No automatic rollback.
        let progress = store.read_dataset(&DatasetName::Progress.definition()).unwrap();
        assert_eq!(progress.schema_version, 1);
    }

    #[test]
    fn failing_step_reports_migration_failure() {
        let dir = tempdir().unwrap();
        let store = Store::open(Config::new().data_dir(dir.path()).auto_daily_backup(false));
        seed(&store, DatasetName::Users, json!({"schemaVersion": 0, "records": []}));

        let mut registry = MigrationRegistry::new();
        registry
            .register(Box::new(FnMigration::new(DatasetName::Users, 0, 1, "boom", |_| {
                Err(CoreError::aborted("boom"))
            })))
            .unwrap();

        let err = MigrationRunner::new(registry).run(&store).unwrap_err();
        assert!(matches!(err, CoreError::MigrationFailed { .. }));
        let users = store.read_dataset(&DatasetName::Users.definition()).unwrap();
        assert_eq!(users.schema_version, 0);
    }
}
