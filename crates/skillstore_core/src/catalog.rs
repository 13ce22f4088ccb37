//! Dataset catalog: compiled-in definitions and the dataset state shape.
//!
//! Each dataset has exactly one typed definition binding its name to a
//! concrete record type, so passing `&catalog::USERS` to a transaction can
//! only ever produce `User` records:
//!
//! ```rust,ignore
//! let users: DatasetState<User> = store.read_dataset(&catalog::USERS)?;
//! ```
//!
//! Import, migration and validation work on records that may not (yet) match
//! the current Rust shape. They use the untyped view returned by
//! [`DatasetName::definition`], whose records are plain `serde_json::Value`s.

use crate::record::{
    CoachingSession, GamificationProfile, HasBase, LearningPlan, ProgressEntry, Subscription,
    SubscriptionTier, User,
};
use crate::types::DatasetName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

/// The entire contents of one dataset at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetState<T> {
    /// Schema version the records conform to.
    pub schema_version: u32,
    /// All records of the dataset.
    pub records: Vec<T>,
    /// Time of the last committed change. `None` only while a mutator runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_at: Option<DateTime<Utc>>,
}

impl<T> DatasetState<T> {
    /// Creates an empty state at `schema_version`, stamped now.
    #[must_use]
    pub fn empty(schema_version: u32) -> Self {
        Self {
            schema_version,
            records: Vec::new(),
            last_updated_at: Some(Utc::now()),
        }
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Immutable contract a dataset must satisfy.
pub struct DatasetDefinition<T> {
    name: DatasetName,
    schema_version: u32,
    primary_key: fn(&T) -> Option<&str>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> DatasetDefinition<T> {
    /// Creates a definition.
    #[must_use]
    pub const fn new(
        name: DatasetName,
        schema_version: u32,
        primary_key: fn(&T) -> Option<&str>,
    ) -> Self {
        Self {
            name,
            schema_version,
            primary_key,
            _marker: PhantomData,
        }
    }

    /// Dataset name.
    #[must_use]
    pub const fn name(&self) -> DatasetName {
        self.name
    }

    /// Declared schema version: the target for migrations and the ceiling
    /// for transactions.
    #[must_use]
    pub const fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Extracts the primary key of a record. Empty ids count as missing.
    #[must_use]
    pub fn primary_key<'a>(&self, record: &'a T) -> Option<&'a str> {
        (self.primary_key)(record).filter(|id| !id.is_empty())
    }

    /// The state a dataset starts with.
    #[must_use]
    pub fn empty_state(&self) -> DatasetState<T> {
        DatasetState::empty(self.schema_version)
    }

    /// Returns the untyped definition of the same dataset and version.
    pub const fn untyped(&self) -> DatasetDefinition<Value> {
        DatasetDefinition::new(self.name, self.schema_version, value_key)
    }
}

impl<T> Clone for DatasetDefinition<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DatasetDefinition<T> {}

impl<T> fmt::Debug for DatasetDefinition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetDefinition")
            .field("name", &self.name)
            .field("schema_version", &self.schema_version)
            .finish_non_exhaustive()
    }
}

impl DatasetName {
    /// Returns the untyped definition of this dataset.
    ///
    /// Records are raw JSON objects keyed by their `"id"` string field.
    #[must_use]
    pub const fn definition(self) -> DatasetDefinition<Value> {
        DatasetDefinition::new(self, self.schema_version(), value_key)
    }

    /// Checks that `record` deserializes into this dataset's record type.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error, e.g. a missing `createdAt`.
    pub fn check_shape(self, record: &Value) -> Result<(), serde_json::Error> {
        fn shape<'a, T: Deserialize<'a>>(record: &'a Value) -> Result<(), serde_json::Error> {
            T::deserialize(record).map(drop)
        }

        match self {
            Self::Users => shape::<User>(record),
            Self::LearningPlans => shape::<LearningPlan>(record),
            Self::Progress => shape::<ProgressEntry>(record),
            Self::Gamification => shape::<GamificationProfile>(record),
            Self::Coaching => shape::<CoachingSession>(record),
            Self::Subscriptions => shape::<Subscription>(record),
            Self::SubscriptionTiers => shape::<SubscriptionTier>(record),
        }
    }
}

fn value_key(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

fn base_key<T: HasBase>(record: &T) -> Option<&str> {
    Some(record.base().id.as_str())
}

/// Registered learners.
pub const USERS: DatasetDefinition<User> = DatasetDefinition::new(
    DatasetName::Users,
    DatasetName::Users.schema_version(),
    base_key::<User>,
);

/// Learning plans.
pub const LEARNING_PLANS: DatasetDefinition<LearningPlan> = DatasetDefinition::new(
    DatasetName::LearningPlans,
    DatasetName::LearningPlans.schema_version(),
    base_key::<LearningPlan>,
);

/// Progress entries.
pub const PROGRESS: DatasetDefinition<ProgressEntry> = DatasetDefinition::new(
    DatasetName::Progress,
    DatasetName::Progress.schema_version(),
    base_key::<ProgressEntry>,
);

/// Gamification profiles.
pub const GAMIFICATION: DatasetDefinition<GamificationProfile> = DatasetDefinition::new(
    DatasetName::Gamification,
    DatasetName::Gamification.schema_version(),
    base_key::<GamificationProfile>,
);

/// Coaching sessions.
pub const COACHING: DatasetDefinition<CoachingSession> = DatasetDefinition::new(
    DatasetName::Coaching,
    DatasetName::Coaching.schema_version(),
    base_key::<CoachingSession>,
);

/// Subscriptions.
pub const SUBSCRIPTIONS: DatasetDefinition<Subscription> = DatasetDefinition::new(
    DatasetName::Subscriptions,
    DatasetName::Subscriptions.schema_version(),
    base_key::<Subscription>,
);

/// Subscription tiers.
pub const SUBSCRIPTION_TIERS: DatasetDefinition<SubscriptionTier> = DatasetDefinition::new(
    DatasetName::SubscriptionTiers,
    DatasetName::SubscriptionTiers.schema_version(),
    base_key::<SubscriptionTier>,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::BaseRecord;
    use serde_json::json;

    #[test]
    fn typed_definitions_match_catalog() {
        assert_eq!(USERS.name(), DatasetName::Users);
        assert_eq!(SUBSCRIPTION_TIERS.name(), DatasetName::SubscriptionTiers);
        for name in DatasetName::ALL {
            assert_eq!(name.definition().schema_version(), name.schema_version());
        }
    }

    #[test]
    fn primary_key_of_typed_record() {
        let user = User::new(BaseRecord::new("u-1"), "ada@example.com");
        assert_eq!(USERS.primary_key(&user), Some("u-1"));

        let blank = User::new(BaseRecord::new(""), "nobody@example.com");
        assert_eq!(USERS.primary_key(&blank), None);
    }

    #[test]
    fn primary_key_of_untyped_record() {
        let def = DatasetName::Progress.definition();
        assert_eq!(def.primary_key(&json!({"id": "p-9"})), Some("p-9"));
        assert_eq!(def.primary_key(&json!({"id": 9})), None);
        assert_eq!(def.primary_key(&json!({"planId": "x"})), None);
    }

    #[test]
    fn shape_check_names_missing_fields() {
        let stamped = json!({
            "id": "u-1",
            "email": "a@x",
            "createdAt": "2024-01-01T00:00:00.000Z",
            "updatedAt": "2024-01-01T00:00:00.000Z"
        });
        assert!(DatasetName::Users.check_shape(&stamped).is_ok());

        let err = DatasetName::Users
            .check_shape(&json!({"id": "u-1", "email": "a@x"}))
            .unwrap_err();
        assert!(err.to_string().contains("createdAt"), "{err}");
        assert!(DatasetName::SubscriptionTiers.check_shape(&stamped).is_err());
    }

    #[test]
    fn untyped_keeps_name_and_version() {
        let def = SUBSCRIPTIONS.untyped();
        assert_eq!(def.name(), DatasetName::Subscriptions);
        assert_eq!(def.schema_version(), SUBSCRIPTIONS.schema_version());
    }

    #[test]
    fn empty_state_uses_declared_version() {
        let state = LEARNING_PLANS.empty_state();
        assert_eq!(state.schema_version, 1);
        assert!(state.is_empty());
        assert!(state.last_updated_at.is_some());
    }

    #[test]
    fn state_without_records_array_is_rejected() {
        let missing = serde_json::from_value::<DatasetState<Value>>(json!({"schemaVersion": 1}));
        assert!(missing.is_err());

        let wrong = serde_json::from_value::<DatasetState<Value>>(
            json!({"schemaVersion": 1, "records": "nope"}),
        );
        assert!(wrong.is_err());
    }
}
