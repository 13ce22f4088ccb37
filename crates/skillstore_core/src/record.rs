//! Record shapes stored in the datasets.
//!
//! Every record carries a [`BaseRecord`] (`id`, `createdAt`, `updatedAt`)
//! flattened into its JSON object. Fields the application adds without a
//! schema change land in `attributes` and survive a read-modify-write cycle
//! unchanged.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Bound satisfied by anything that can be stored as a dataset record.
///
/// Implemented for every serializable, cloneable, thread-safe type, including
/// `serde_json::Value` for untyped access.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> Record for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// Access to the common record fields.
pub trait HasBase {
    /// Returns the common fields.
    fn base(&self) -> &BaseRecord;
}

/// Fields shared by every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseRecord {
    /// Primary key, unique within its dataset.
    pub id: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl BaseRecord {
    /// Creates base fields with both timestamps set to now.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A registered learner (`users`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Common fields.
    #[serde(flatten)]
    pub base: BaseRecord,
    /// Login email.
    pub email: String,
    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Fields not modelled here.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl User {
    /// Creates a user.
    #[must_use]
    pub fn new(base: BaseRecord, email: impl Into<String>) -> Self {
        Self {
            base,
            email: email.into(),
            display_name: None,
            attributes: Map::new(),
        }
    }
}

/// A learning plan owned by a user (`learningPlans`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPlan {
    /// Common fields.
    #[serde(flatten)]
    pub base: BaseRecord,
    /// Owning user.
    pub user_id: String,
    /// Plan title.
    pub title: String,
    /// Fields not modelled here.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl LearningPlan {
    /// Creates a plan for `user_id`.
    #[must_use]
    pub fn new(base: BaseRecord, user_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            base,
            user_id: user_id.into(),
            title: title.into(),
            attributes: Map::new(),
        }
    }
}

/// Progress made by a user on a plan (`progress`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    /// Common fields.
    #[serde(flatten)]
    pub base: BaseRecord,
    /// User the progress belongs to.
    pub user_id: String,
    /// Plan the progress is recorded against.
    pub plan_id: String,
    /// Fields not modelled here.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl ProgressEntry {
    /// Creates a progress entry.
    #[must_use]
    pub fn new(base: BaseRecord, user_id: impl Into<String>, plan_id: impl Into<String>) -> Self {
        Self {
            base,
            user_id: user_id.into(),
            plan_id: plan_id.into(),
            attributes: Map::new(),
        }
    }
}

/// Gamification state of a user on a plan (`gamification`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamificationProfile {
    /// Common fields.
    #[serde(flatten)]
    pub base: BaseRecord,
    /// User the profile belongs to.
    pub user_id: String,
    /// Plan the profile scores against.
    pub plan_id: String,
    /// Accumulated points.
    #[serde(default)]
    pub points: u64,
    /// Fields not modelled here.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl GamificationProfile {
    /// Creates a profile with zero points.
    #[must_use]
    pub fn new(base: BaseRecord, user_id: impl Into<String>, plan_id: impl Into<String>) -> Self {
        Self {
            base,
            user_id: user_id.into(),
            plan_id: plan_id.into(),
            points: 0,
            attributes: Map::new(),
        }
    }
}

/// A coaching session for a user on a plan (`coaching`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachingSession {
    /// Common fields.
    #[serde(flatten)]
    pub base: BaseRecord,
    /// Coached user.
    pub user_id: String,
    /// Plan the session is about.
    pub plan_id: String,
    /// Fields not modelled here.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl CoachingSession {
    /// Creates a coaching session.
    #[must_use]
    pub fn new(base: BaseRecord, user_id: impl Into<String>, plan_id: impl Into<String>) -> Self {
        Self {
            base,
            user_id: user_id.into(),
            plan_id: plan_id.into(),
            attributes: Map::new(),
        }
    }
}

/// A billing subscription (`subscriptions`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Common fields.
    #[serde(flatten)]
    pub base: BaseRecord,
    /// Subscribed user.
    pub user_id: String,
    /// Tier, or `None` for the free plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier_id: Option<String>,
    /// Fields not modelled here.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Subscription {
    /// Creates a subscription, optionally bound to a tier.
    #[must_use]
    pub fn new(base: BaseRecord, user_id: impl Into<String>, tier_id: Option<String>) -> Self {
        Self {
            base,
            user_id: user_id.into(),
            tier_id,
            attributes: Map::new(),
        }
    }
}

/// A purchasable subscription tier (`subscriptionTiers`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionTier {
    /// Common fields.
    #[serde(flatten)]
    pub base: BaseRecord,
    /// Tier name.
    pub name: String,
    /// Fields not modelled here.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl SubscriptionTier {
    /// Creates a tier.
    #[must_use]
    pub fn new(base: BaseRecord, name: impl Into<String>) -> Self {
        Self {
            base,
            name: name.into(),
            attributes: Map::new(),
        }
    }
}

macro_rules! impl_has_base {
    ($($ty:ty),* $(,)?) => {
        $(
            impl HasBase for $ty {
                fn base(&self) -> &BaseRecord {
                    &self.base
                }
            }
        )*
    };
}

impl_has_base!(
    User,
    LearningPlan,
    ProgressEntry,
    GamificationProfile,
    CoachingSession,
    Subscription,
    SubscriptionTier,
);
