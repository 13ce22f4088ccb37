//! Stress helpers for SkillStore.
//!
//! These drive many writers at one dataset to check that lock files
//! serialize them without losing updates.

use parking_lot::Mutex;
use skillstore_core::{catalog, BaseRecord, CoreError, Store, TransactionOptions, User};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Error messages of failed operations.
    pub errors: Vec<String>,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, errors: Vec<String>, duration: Duration) -> Self {
        let total = successful + errors.len();
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: errors.len(),
            errors,
            duration,
            ops_per_second,
        }
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of writer threads.
    pub threads: usize,
    /// Transactions per thread.
    pub ops_per_thread: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            ops_per_thread: 10,
        }
    }
}

/// Id of the user written by `thread` in its `op`-th transaction.
pub fn stress_user_id(thread: usize, op: usize) -> String {
    format!("stress-{thread}-{op}")
}

/// Has every thread append distinct users to `users`, each in its own
/// transaction. On success the dataset gains `threads * ops_per_thread`
/// records.
pub fn stress_concurrent_writers(store: &Store, config: &StressConfig) -> StressTestResult {
    let successful = Arc::new(Mutex::new(0usize));
    let errors = Arc::new(Mutex::new(Vec::new()));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let store = store.clone();
            let successful = Arc::clone(&successful);
            let errors = Arc::clone(&errors);
            let ops = config.ops_per_thread;

            thread::spawn(move || {
                for i in 0..ops {
                    let id = stress_user_id(t, i);
                    let result = store.transaction(
                        &catalog::USERS,
                        |mut state| {
                            state
                                .records
                                .push(User::new(BaseRecord::new(id.clone()), format!("{id}@stress.test")));
                            Ok(state)
                        },
                        &TransactionOptions::new().correlation_id(format!("stress-{t}")),
                    );
                    match result {
                        Ok(_) => *successful.lock() += 1,
                        Err(e) => errors.lock().push(e.to_string()),
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    let successful = *successful.lock();
    let errors = std::mem::take(&mut *errors.lock());
    StressTestResult::new(successful, errors, start.elapsed())
}

/// Runs `operations` transactions of which every other one aborts.
pub fn stress_transaction_aborts(store: &Store, operations: usize) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut errors = Vec::new();

    for i in 0..operations {
        let should_fail = i % 2 == 0;
        let result = store.transaction(
            &catalog::USERS,
            |mut state| {
                state
                    .records
                    .push(User::new(BaseRecord::new(format!("abort-{i}")), "abort@stress.test"));
                if should_fail {
                    Err(CoreError::aborted("intentional"))
                } else {
                    Ok(state)
                }
            },
            &TransactionOptions::new(),
        );

        match result {
            Ok(_) => successful += 1,
            Err(e) => errors.push(e.to_string()),
        }
    }

    StressTestResult::new(successful, errors, start.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TestStore;
    use skillstore_core::DatasetName;

    #[test]
    fn concurrent_writers_lose_nothing() {
        let test_store = TestStore::new();
        let config = StressConfig {
            threads: 4,
            ops_per_thread: 5,
        };

        let result = stress_concurrent_writers(&test_store, &config);
        assert_eq!(result.failed_ops, 0, "{:?}", result.errors);
        assert_eq!(result.successful_ops, 20);

        let users = test_store.read_dataset(&catalog::USERS).unwrap();
        assert_eq!(users.len(), 20);
        for t in 0..4 {
            for i in 0..5 {
                let id = stress_user_id(t, i);
                assert!(users.records.iter().any(|u| u.base.id == id), "{id}");
            }
        }
        assert!(test_store
            .verify_journal(DatasetName::Users)
            .unwrap()
            .is_consistent());
    }

    #[test]
    fn aborts_leave_only_committed_records() {
        let test_store = TestStore::new();

        let result = stress_transaction_aborts(&test_store, 10);
        assert_eq!(result.total_ops, 10);
        assert_eq!(result.successful_ops, 5);
        assert_eq!(result.failed_ops, 5);
        assert_eq!(test_store.read_dataset(&catalog::USERS).unwrap().len(), 5);
        assert_eq!(test_store.read_journal(DatasetName::Users).unwrap().len(), 5);
    }
}
