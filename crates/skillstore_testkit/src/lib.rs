//! # SkillStore Testkit
//!
//! Test utilities for SkillStore.
//!
//! This crate provides:
//! - Temporary stores that clean up after themselves
//! - Seeded scenarios with consistent (or deliberately broken) references
//! - Property-based generators for record sets
//! - Concurrent-writer stress helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use skillstore_testkit::prelude::*;
//!
//! #[test]
//! fn validates_seeded_store() {
//!     with_temp_store(|store| {
//!         scenarios::seed_consistent(store, 3);
//!         assert!(!store.validate().has_errors);
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
