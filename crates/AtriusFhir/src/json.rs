//! Strict JSON reading and FHIR-style writing.
//!
//! `serde_json` keeps the last of two equal keys in an object. FHIR documents with
//! repeated keys are invalid, so [`loads`] scans the text once more and rejects them.
//! Numbers keep their textual form (`1.50` stays `1.50`) through the
//! `arbitrary_precision` feature.

use crate::error::LoadError;
use crate::strip::strip_empty;
use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;

/// Parses JSON text, rejecting objects with repeated keys.
pub fn loads(text: &str) -> Result<Value, LoadError> {
    let value: Value = serde_json::from_str(text)?;

    let duplicate = RefCell::new(None);
    let mut deserializer = serde_json::Deserializer::from_str(text);
    let checked = KeyCheck {
        duplicate: &duplicate,
    }
    .deserialize(&mut deserializer);
    if let Err(err) = checked {
        return Err(match duplicate.into_inner() {
            Some(key) => LoadError::DuplicateKey { key },
            None => LoadError::Json(err),
        });
    }
    Ok(value)
}

/// Serializes with empty items removed, so `""`, `{}` and `[]` never reach the output.
pub fn dumps(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string(&strip_empty(value.clone()).unwrap_or(Value::Null))
}

pub fn dumps_pretty(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&strip_empty(value.clone()).unwrap_or(Value::Null))
}

/// Walks a document without building it, remembering the first repeated key.
#[derive(Clone, Copy)]
struct KeyCheck<'a> {
    duplicate: &'a RefCell<Option<String>>,
}

impl<'de> DeserializeSeed<'de> for KeyCheck<'_> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for KeyCheck<'_> {
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<(), E> {
        Ok(())
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<(), E> {
        Ok(())
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<(), E> {
        Ok(())
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<(), E> {
        Ok(())
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<(), E> {
        Ok(())
    }

    fn visit_unit<E: de::Error>(self) -> Result<(), E> {
        Ok(())
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<(), A::Error>
    where
        A: SeqAccess<'de>,
    {
        while seq.next_element_seed(self)?.is_some() {}
        Ok(())
    }

    fn visit_map<A>(self, mut map: A) -> Result<(), A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut seen = HashSet::new();
        while let Some(key) = map.next_key::<String>()? {
            if seen.contains(&key) {
                let message = format!("duplicate key '{}'", key);
                *self.duplicate.borrow_mut() = Some(key);
                return Err(de::Error::custom(message));
            }
            map.next_value_seed(self)?;
            seen.insert(key);
        }
        Ok(())
    }
}
