//! # JSON Document Helpers
//!
//! Records are persisted as JSON objects. Two transformations are needed at
//! the storage boundary:
//!
//! - [`strip_nulls`] before writing: the remote store rejects undefined
//!   values, so absent optionals must not be sent as `null`.
//! - [`merge_over_defaults`] when reading the singleton config: stored
//!   fields win, but a field introduced after the record was saved still
//!   gets its default. Nested objects are merged key by key.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Removes every `null` member from objects, recursively.
///
/// Array elements are cleaned but never removed.
pub fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}

/// Deep-merges `overlay` into `base`.
///
/// Objects merge per key; every other value in `overlay` replaces the one in
/// `base`. `null` in the overlay is ignored.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                if value.is_null() {
                    continue;
                }
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => {
            if !value.is_null() {
                *slot = value;
            }
        }
    }
}

/// Reads `stored` as `T`, filling every missing field from `T::default()`.
///
/// A stored value of the wrong type for a field (e.g. a string where a number
/// is expected) is an error, not a silent default.
pub fn merge_over_defaults<T>(stored: Option<&Value>) -> Result<T, serde_json::Error>
where
    T: Serialize + DeserializeOwned + Default,
{
    let mut base = serde_json::to_value(T::default())?;
    if let Some(stored) = stored {
        deep_merge(&mut base, stored.clone());
    }
    serde_json::from_value(base)
}

/// Serializes a record into a storable object with nulls stripped.
pub fn to_document<T: Serialize>(record: &T) -> Result<Map<String, Value>, serde_json::Error> {
    match strip_nulls(serde_json::to_value(record)?) {
        Value::Object(map) => Ok(map),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            Ok(map)
        }
    }
}
