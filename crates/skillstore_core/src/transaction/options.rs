//! Transaction options and results.

use crate::catalog::DatasetState;
use crate::journal::JournalEntry;

/// Caller-supplied annotations recorded in the journal entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionOptions {
    /// What the transaction does.
    pub description: Option<String>,
    /// Identifier tying the transaction to a request or batch.
    pub correlation_id: Option<String>,
}

impl TransactionOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, value: impl Into<String>) -> Self {
        self.description = Some(value.into());
        self
    }

    /// Sets the correlation id.
    #[must_use]
    pub fn correlation_id(mut self, value: impl Into<String>) -> Self {
        self.correlation_id = Some(value.into());
        self
    }
}

/// Result of a committed transaction.
#[derive(Debug, Clone)]
pub struct TransactionOutcome<T> {
    /// The state as written.
    pub state: DatasetState<T>,
    /// The journal entry appended for the commit.
    pub journal: JournalEntry,
}
