//! Core type definitions for SkillStore.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of datasets the store manages.
///
/// Every dataset lives in its own directory named after [`DatasetName::as_str`]
/// and has its own lock, journal and declared schema version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DatasetName {
    /// Registered learners.
    Users,
    /// Learning plans owned by users.
    LearningPlans,
    /// Progress entries against a plan.
    Progress,
    /// Gamification profiles per user and plan.
    Gamification,
    /// Coaching sessions per user and plan.
    Coaching,
    /// Billing subscriptions.
    Subscriptions,
    /// Subscription tiers referenced by subscriptions.
    SubscriptionTiers,
}

impl DatasetName {
    /// All datasets, in the order they are initialized, backed up and migrated.
    pub const ALL: [DatasetName; 7] = [
        DatasetName::Users,
        DatasetName::LearningPlans,
        DatasetName::Progress,
        DatasetName::Gamification,
        DatasetName::Coaching,
        DatasetName::Subscriptions,
        DatasetName::SubscriptionTiers,
    ];

    /// Returns the on-disk and wire name of the dataset.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::LearningPlans => "learningPlans",
            Self::Progress => "progress",
            Self::Gamification => "gamification",
            Self::Coaching => "coaching",
            Self::Subscriptions => "subscriptions",
            Self::SubscriptionTiers => "subscriptionTiers",
        }
    }

    /// Returns the declared (target) schema version of the dataset.
    #[must_use]
    pub const fn schema_version(self) -> u32 {
        match self {
            Self::Users => 1,
            Self::LearningPlans => 1,
            Self::Progress => 1,
            Self::Gamification => 1,
            Self::Coaching => 1,
            Self::Subscriptions => 1,
            Self::SubscriptionTiers => 1,
        }
    }
}

impl fmt::Display for DatasetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for DatasetName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| CoreError::UnknownDataset {
                name: s.to_string(),
            })
    }
}
