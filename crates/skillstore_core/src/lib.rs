//! # SkillStore Core
//!
//! File-backed, transactional, journaled document store shared by the fixed
//! set of datasets of the learning platform.
//!
//! This crate provides:
//! - A compiled-in dataset catalog with typed definitions
//! - Whole-dataset transactions guarded by cross-process lock files
//! - An append-only, checksummed journal per dataset
//! - Point-in-time backups, full-store export, and all-or-nothing import
//! - Structural and referential validation reports
//! - A schema migration runner
//!
//! ## Example
//!
//! ```rust,ignore
//! use skillstore_core::{catalog, BaseRecord, Config, Store, TransactionOptions, User};
//!
//! let store = Store::open(Config::new().data_dir("data"));
//! store.init()?;
//!
//! store.transaction(&catalog::USERS, |mut state| {
//!     state.records.push(User::new(BaseRecord::new("u-1"), "ada@example.com"));
//!     Ok(state)
//! }, &TransactionOptions::new().description("signup"))?;
//!
//! let users = store.read_dataset(&catalog::USERS)?;
//! let admins: Vec<_> = users.records.iter().filter(|u| u.email.ends_with("@example.com")).collect();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod backup;
pub mod catalog;
pub mod config;
pub mod dir;
pub mod error;
pub mod journal;
pub mod metadata;
pub mod migration;
pub mod record;
pub mod store;
pub mod transaction;
pub mod transfer;
pub mod types;
pub mod validation;

pub use backup::BackupInfo;
pub use catalog::{DatasetDefinition, DatasetState};
pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use journal::{ChainReport, JournalEntry};
pub use metadata::{DatasetMetadata, SchemaMetadata};
pub use migration::{
    AppliedStep, FnMigration, Migration, MigrationRegistry, MigrationRunResult, MigrationRunner,
    StepKind,
};
pub use record::{
    BaseRecord, CoachingSession, GamificationProfile, LearningPlan, ProgressEntry, Record,
    Subscription, SubscriptionTier, User,
};
pub use store::{Snapshot, Store};
pub use transaction::{TransactionOptions, TransactionOutcome};
pub use transfer::{ExportPayload, ExportSummary, ImportOptions, ImportSummary};
pub use types::DatasetName;
pub use validation::{IssueLevel, ValidationIssue, ValidationReport};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
