//! Benchmark utilities.

use serde_json::{Map, Value};
use skillstore_core::{BaseRecord, User};

/// Generate `count` users with ids `bench-user-<n>` and `attrs` extra
/// attributes each.
pub fn generate_users(count: usize, attrs: usize) -> Vec<User> {
    (0..count)
        .map(|i| {
            let mut user = User::new(
                BaseRecord::new(format!("bench-user-{i}")),
                format!("bench-{i}@example.com"),
            );
            user.attributes = attributes(attrs);
            user
        })
        .collect()
}

/// Generate a map of `count` string attributes.
pub fn attributes(count: usize) -> Map<String, Value> {
    (0..count)
        .map(|i| (format!("attr_{i}"), Value::String(format!("value-{i}"))))
        .collect()
}

/// Generate a JSON payload of roughly `size` bytes.
pub fn payload(size: usize) -> Vec<u8> {
    let body = "x".repeat(size.saturating_sub(16));
    serde_json::to_vec(&serde_json::json!({ "data": body })).unwrap_or_default()
}
