//! Migration commands.

use skillstore_core::{AppliedStep, MigrationRegistry, MigrationRunner, StepKind, Store};
use tracing::info;

/// Show the steps a run would apply.
pub fn status(store: &Store) -> Result<(), Box<dyn std::error::Error>> {
    let runner = create_runner();
    let plan = runner.plan(store)?;

    println!("Migration Status");
    println!("================");
    println!("  Registered steps: {}", runner.registry().len());

    if plan.is_empty() {
        println!("  All datasets are at their declared schema version.");
    } else {
        println!("\nPending:");
        print_steps(&plan);
    }
    Ok(())
}

/// Apply pending steps, or only list them with `dry_run`.
pub fn run(store: &Store, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let runner = create_runner();

    if dry_run {
        let plan = runner.plan(store)?;
        println!("Dry run - would apply {} step(s):", plan.len());
        print_steps(&plan);
        return Ok(());
    }

    info!("Running migrations on {:?}", store.dir().root());
    let result = runner.run(store)?;

    println!("✓ Migration complete");
    println!("  Backup: {}", result.backup.display());
    println!("  Steps applied: {}", result.applied_count());
    print_steps(&result.steps);
    if result.report.warning_count() > 0 {
        println!("  Validation warnings: {}", result.report.warning_count());
    }
    Ok(())
}

fn create_runner() -> MigrationRunner {
    MigrationRunner::new(MigrationRegistry::builtin())
}

fn print_steps(steps: &[AppliedStep]) {
    for step in steps {
        let kind = match step.kind {
            StepKind::Migration => "migrate",
            StepKind::Sync => "sync",
        };
        println!(
            "  {:<20} v{} -> v{}  [{}] {}",
            step.dataset, step.from_version, step.to_version, kind, step.description
        );
    }
}
