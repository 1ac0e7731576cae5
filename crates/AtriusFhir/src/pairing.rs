//! Alignment of repeating primitive values with their `_name` companions.
//!
//! `"given": ["A", null]` together with `"_given": [null, {"id": "x"}]` describes two
//! values, the second of which has no value but carries an id. Both arrays must have
//! the same length and no index may be null on both sides.

use serde_json::{Map, Value};

fn all_null(items: &[Value]) -> bool {
    items.iter().all(Value::is_null)
}

/// Removes nulls from an array member, dropping the member if nothing remains.
fn drop_nulls(map: &mut Map<String, Value>, key: &str) {
    let now_empty = match map.get_mut(key) {
        Some(Value::Array(items)) => {
            items.retain(|v| !v.is_null());
            items.is_empty()
        }
        _ => false,
    };
    if now_empty {
        map.shift_remove(key);
    }
}

/// Reconciles `map[key]` with `map[companion]`, normalizing the object in place.
///
/// - Only one side present: nulls on that side carry nothing and are dropped.
/// - Equal lengths: rejected if any index is null on both sides.
/// - Unequal lengths where one side is entirely null: that side is dropped.
/// - Any other length mismatch is rejected.
///
/// Members that are not arrays are left for the shape checks.
pub fn pair_primitive(map: &mut Map<String, Value>, key: &str, companion: &str) -> Result<(), String> {
    match (map.contains_key(key), map.contains_key(companion)) {
        (false, false) => return Ok(()),
        (true, false) => {
            drop_nulls(map, key);
            return Ok(());
        }
        (false, true) => {
            drop_nulls(map, companion);
            return Ok(());
        }
        (true, true) => {}
    }
    let (Some(Value::Array(values)), Some(Value::Array(extensions))) =
        (map.get(key), map.get(companion))
    else {
        return Ok(());
    };

    if values.len() == extensions.len() {
        if let Some(index) = values
            .iter()
            .zip(extensions)
            .position(|(v, e)| v.is_null() && e.is_null())
        {
            return Err(format!(
                "'{}' and '{}' are both null at index {}",
                key, companion, index
            ));
        }
        return Ok(());
    }

    let (value_count, extension_count) = (values.len(), extensions.len());
    let drop = match (all_null(values), all_null(extensions)) {
        (true, false) => key,
        (false, true) => companion,
        _ => {
            return Err(format!(
                "'{}' has {} item(s) but '{}' has {}",
                key, value_count, companion, extension_count
            ));
        }
    };
    tracing::debug!(
        key,
        companion,
        value_count,
        extension_count,
        "dropping all-null side of primitive pairing"
    );
    map.shift_remove(drop);
    let remaining = if drop == key { companion } else { key };
    drop_nulls(map, remaining);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pair(value: Value) -> Result<Value, String> {
        let Value::Object(mut map) = value else {
            panic!("object expected");
        };
        pair_primitive(&mut map, "given", "_given").map(|_| Value::Object(map))
    }

    #[test]
    fn test_equal_lengths() {
        let ok = pair(json!({"given": ["A", null], "_given": [null, {"id": "x"}]})).unwrap();
        assert_eq!(ok["given"], json!(["A", null]));

        let err = pair(json!({"given": ["A", null], "_given": [{"id": "x"}, null]})).unwrap_err();
        assert!(err.contains("index 1"));
    }

    #[test]
    fn test_one_side_absent() {
        let ok = pair(json!({"given": ["A", null, "B"]})).unwrap();
        assert_eq!(ok, json!({"given": ["A", "B"]}));

        let ok = pair(json!({"_given": [null]})).unwrap();
        assert_eq!(ok, json!({}));
    }

    #[test]
    fn test_unequal_lengths() {
        let ok = pair(json!({"given": ["A", "B"], "_given": [null]})).unwrap();
        assert_eq!(ok, json!({"given": ["A", "B"]}));

        let ok = pair(json!({"given": [null], "_given": [{"id": "a"}, null, {"id": "b"}]})).unwrap();
        assert_eq!(ok, json!({"_given": [{"id": "a"}, {"id": "b"}]}));

        assert!(pair(json!({"given": ["A", "B"], "_given": [{"id": "a"}]})).is_err());
        assert!(pair(json!({"given": [null, null], "_given": [null]})).is_err());
    }
}
