//! Removal of empty items before validation.
//!
//! FHIR JSON never carries empty values: `""`, `{}`, `[]` and `null` object members mean
//! the element is absent. `null` inside an array is different, it keeps positions aligned
//! between a primitive array and its `_name` companion, so array nulls survive here and
//! are resolved by the pairing check.

use serde_json::{Map, Value};

/// Returns the value with empty items removed, or `None` if nothing is left.
///
/// Stripping is idempotent: `strip_empty(strip_empty(v)) == strip_empty(v)`.
pub fn strip_empty(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            if s.trim().is_empty() {
                None
            } else {
                Some(Value::String(s))
            }
        }
        Value::Array(items) => {
            let items: Vec<Value> = items
                .into_iter()
                .map(|item| strip_empty(item).unwrap_or(Value::Null))
                .collect();
            if items.is_empty() {
                None
            } else {
                Some(Value::Array(items))
            }
        }
        Value::Object(map) => {
            let map = strip_object(map);
            if map.is_empty() {
                None
            } else {
                Some(Value::Object(map))
            }
        }
        other => Some(other),
    }
}

/// Strips every member of an object, dropping the ones that end up absent.
/// The object itself is kept even when it becomes empty.
pub fn strip_object(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .filter_map(|(key, value)| strip_empty(value).map(|v| (key, v)))
        .collect()
}
