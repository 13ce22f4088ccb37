//! Test fixtures and store helpers.
//!
//! Provides temporary stores and common seeded scenarios.

use skillstore_core::{Config, Store};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

/// A store in a temporary directory, removed on drop.
pub struct TestStore {
    /// The store handle.
    pub store: Store,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: TempDir,
}

impl TestStore {
    /// Creates an uninitialized store with fast lock retries and no daily
    /// backup.
    pub fn new() -> Self {
        Self::with_config(|config| config)
    }

    /// Creates a store and lets `f` adjust the test configuration.
    pub fn with_config<F>(f: F) -> Self
    where
        F: FnOnce(Config) -> Config,
    {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = Config::new()
            .data_dir(temp_dir.path().join("data"))
            .auto_daily_backup(false)
            .max_lock_retries(2_000)
            .lock_retry_delay(Duration::from_millis(2));
        Self {
            store: Store::open(f(config)),
            temp_dir,
        }
    }

    /// Creates and initializes a store.
    pub fn initialized() -> Self {
        let test_store = Self::new();
        test_store.store.init().expect("Failed to initialize store");
        test_store
    }

    /// Returns the temporary directory, which also holds the data directory.
    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Opens another handle on the same data directory.
    pub fn reopen(&self) -> Store {
        Store::open(self.store.config().clone())
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestStore {
    type Target = Store;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with an initialized temporary store.
///
/// # Example
///
/// ```rust,ignore
/// use skillstore_testkit::with_temp_store;
///
/// #[test]
/// fn my_test() {
///     with_temp_store(|store| {
///         assert!(store.read_all().unwrap().values().all(|s| s.is_empty()));
///     });
/// }
/// ```
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&Store) -> R,
{
    let test_store = TestStore::initialized();
    f(&test_store.store)
}

/// Seeded scenarios.
pub mod scenarios {
    use skillstore_core::{
        catalog, BaseRecord, CoachingSession, GamificationProfile, LearningPlan, ProgressEntry,
        Store, Subscription, SubscriptionTier, TransactionOptions, User,
    };

    /// Ids written by [`seed_consistent`].
    #[derive(Debug, Clone, Default)]
    pub struct SeededIds {
        /// User ids.
        pub users: Vec<String>,
        /// Plan ids, one per user.
        pub plans: Vec<String>,
        /// Tier ids.
        pub tiers: Vec<String>,
    }

    /// Writes `user_count` users, each with a plan, progress, gamification
    /// profile, coaching session and subscription, plus two tiers. Every
    /// reference resolves.
    pub fn seed_consistent(store: &Store, user_count: usize) -> SeededIds {
        let options = TransactionOptions::new()
            .description("seed")
            .correlation_id("testkit");
        let users: Vec<String> = (0..user_count).map(|i| format!("user-{i}")).collect();
        let plans: Vec<String> = (0..user_count).map(|i| format!("plan-{i}")).collect();
        let tiers = vec!["tier-free".to_string(), "tier-pro".to_string()];

        store
            .transaction(
                &catalog::SUBSCRIPTION_TIERS,
                |mut s| {
                    s.records.extend(
                        tiers
                            .iter()
                            .map(|id| SubscriptionTier::new(BaseRecord::new(id.clone()), id.clone())),
                    );
                    Ok(s)
                },
                &options,
            )
            .expect("Failed to seed tiers");

        store
            .transaction(
                &catalog::USERS,
                |mut s| {
                    s.records.extend(users.iter().map(|id| {
                        User::new(BaseRecord::new(id.clone()), format!("{id}@example.com"))
                    }));
                    Ok(s)
                },
                &options,
            )
            .expect("Failed to seed users");

        store
            .transaction(
                &catalog::LEARNING_PLANS,
                |mut s| {
                    s.records.extend(users.iter().zip(&plans).map(|(user, plan)| {
                        LearningPlan::new(BaseRecord::new(plan.clone()), user.clone(), "Seeded plan")
                    }));
                    Ok(s)
                },
                &options,
            )
            .expect("Failed to seed plans");

        let pairs: Vec<(&String, &String)> = users.iter().zip(&plans).collect();
        store
            .transaction(
                &catalog::PROGRESS,
                |mut s| {
                    s.records.extend(pairs.iter().map(|(u, p)| {
                        ProgressEntry::new(BaseRecord::new(format!("progress-{p}")), *u, *p)
                    }));
                    Ok(s)
                },
                &options,
            )
            .expect("Failed to seed progress");

        store
            .transaction(
                &catalog::GAMIFICATION,
                |mut s| {
                    s.records.extend(pairs.iter().map(|(u, p)| {
                        GamificationProfile::new(BaseRecord::new(format!("game-{p}")), *u, *p)
                    }));
                    Ok(s)
                },
                &options,
            )
            .expect("Failed to seed gamification");

        store
            .transaction(
                &catalog::COACHING,
                |mut s| {
                    s.records.extend(pairs.iter().map(|(u, p)| {
                        CoachingSession::new(BaseRecord::new(format!("coach-{p}")), *u, *p)
                    }));
                    Ok(s)
                },
                &options,
            )
            .expect("Failed to seed coaching");

        store
            .transaction(
                &catalog::SUBSCRIPTIONS,
                |mut s| {
                    s.records.extend(users.iter().enumerate().map(|(i, u)| {
                        let tier = (i % 2 == 1).then(|| tiers[1].clone());
                        Subscription::new(BaseRecord::new(format!("sub-{u}")), u.clone(), tier)
                    }));
                    Ok(s)
                },
                &options,
            )
            .expect("Failed to seed subscriptions");

        SeededIds {
            users,
            plans,
            tiers,
        }
    }

    /// Adds a progress entry pointing at a plan that does not exist and
    /// returns its id.
    pub fn add_dangling_progress(store: &Store, user_id: &str) -> String {
        let id = "progress-dangling".to_string();
        store
            .transaction(
                &catalog::PROGRESS,
                |mut s| {
                    s.records.push(ProgressEntry::new(
                        BaseRecord::new(id.clone()),
                        user_id,
                        "plan-missing",
                    ));
                    Ok(s)
                },
                &TransactionOptions::new(),
            )
            .expect("Failed to add dangling progress");
        id
    }
}
