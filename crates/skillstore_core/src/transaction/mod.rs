//! Whole-dataset transactions.
//!
//! A transaction reads a dataset, hands a copy to a caller-supplied mutator,
//! checks the result and, only if every check passes, commits it:
//!
//! - **Atomicity**: the dataset file is replaced by a single rename
//! - **Isolation**: writers to the same dataset serialize on its lock file,
//!   across threads and processes alike
//! - **Durability**: data, metadata and journal are synced before returning
//!
//! Any error from the mutator or a guard aborts with nothing written.

mod engine;
mod guard;
mod options;

pub use options::{TransactionOptions, TransactionOutcome};
