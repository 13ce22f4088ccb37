//! Property-based test generators using proptest.
//!
//! Provides strategies for records and record sets that keep the invariants
//! the engine enforces (non-empty, unique ids) unless a strategy says
//! otherwise.

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use skillstore_core::{BaseRecord, User};

/// Strategy for record ids.
pub fn record_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9-]{0,15}").expect("Invalid regex")
}

/// Strategy for extra JSON attributes that do not collide with modelled
/// field names.
pub fn attributes_strategy() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map(
        prop::string::string_regex("x_[a-z]{1,8}").expect("Invalid regex"),
        prop_oneof![
            any::<bool>().prop_map(Value::from),
            any::<i32>().prop_map(Value::from),
            "[a-zA-Z0-9 ]{0,16}".prop_map(Value::from),
        ],
        0..4,
    )
    .prop_map(|attrs| attrs.into_iter().collect())
}

/// Strategy for a typed user with the given id.
pub fn user_strategy(id: String) -> impl Strategy<Value = User> {
    (
        "[a-z]{1,8}@[a-z]{1,8}\\.test",
        proptest::option::of("[A-Z][a-z]{0,10}"),
        attributes_strategy(),
    )
        .prop_map(move |(email, display_name, attributes)| {
            let mut user = User::new(BaseRecord::new(id.clone()), email);
            user.display_name = display_name;
            user.attributes = attributes;
            user
        })
}

/// Strategy for a set of users with unique ids.
pub fn users_strategy(max: usize) -> impl Strategy<Value = Vec<User>> {
    prop::collection::btree_set(record_id_strategy(), 0..=max).prop_flat_map(|ids| {
        ids.into_iter()
            .map(user_strategy)
            .collect::<Vec<_>>()
    })
}

/// Strategy for untyped records with unique ids.
pub fn raw_records_strategy(max: usize) -> impl Strategy<Value = Vec<Value>> {
    prop::collection::btree_set(record_id_strategy(), 0..=max).prop_flat_map(|ids| {
        ids.into_iter()
            .map(|id| {
                attributes_strategy().prop_map(move |attrs| {
                    let mut record = json!({ "id": id });
                    if let Some(obj) = record.as_object_mut() {
                        obj.extend(attrs);
                    }
                    record
                })
            })
            .collect::<Vec<_>>()
    })
}

/// Strategy for untyped records in which at least one id repeats.
pub fn records_with_duplicate_strategy(max: usize) -> impl Strategy<Value = Vec<Value>> {
    (raw_records_strategy(max.max(1)), any::<prop::sample::Index>()).prop_filter_map(
        "needs at least one record",
        |(mut records, index)| {
            if records.is_empty() {
                return None;
            }
            let dup = records[index.index(records.len())].clone();
            records.push(dup);
            Some(records)
        },
    )
}
