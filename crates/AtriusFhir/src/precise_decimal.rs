use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// High-precision decimal that keeps its original string representation.
///
/// FHIR requires decimals to keep their precision through a round trip: `12.340` must
/// not come back as `12.34`. The parsed [`Decimal`] is used for arithmetic and
/// comparison, the original text for serialization.
///
/// # Examples
///
/// ```rust
/// use atrius_fhir_lib::PreciseDecimal;
/// use rust_decimal::Decimal;
///
/// let precise = PreciseDecimal::from(Decimal::new(12340, 3));
/// assert_eq!(precise.original_string(), "12.340");
///
/// let parsed = PreciseDecimal::parse("1.0e2");
/// assert_eq!(parsed.value(), Some(Decimal::new(100, 0)));
/// assert_eq!(parsed.original_string(), "1.0e2");
/// ```
#[derive(Debug, Clone)]
pub struct PreciseDecimal {
    /// `None` when the text is not a decimal `rust_decimal` can hold
    value: Option<Decimal>,
    original_string: Arc<str>,
}

/// Equality is numeric: `10.0 == 10.00`.
impl PartialEq for PreciseDecimal {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for PreciseDecimal {}

impl PartialOrd for PreciseDecimal {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Unparseable values order before every parsed one.
impl Ord for PreciseDecimal {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

impl PreciseDecimal {
    pub fn from_parts(value: Option<Decimal>, original_string: String) -> Self {
        Self {
            value,
            original_string: Arc::from(original_string.as_str()),
        }
    }

    /// Parses decimal text, accepting scientific notation with `e` or `E`.
    pub fn parse(s: &str) -> Self {
        Self::from_parts(Self::parse_decimal_string(s), s.to_string())
    }

    /// Reads a JSON number or numeric string.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self::parse(&n.to_string())),
            Value::String(s) => Some(Self::parse(s)),
            _ => None,
        }
    }

    fn parse_decimal_string(s: &str) -> Option<Decimal> {
        let normalized = s.replace('E', "e");
        if normalized.contains('e') {
            Decimal::from_scientific(&normalized).ok()
        } else {
            normalized.parse::<Decimal>().ok()
        }
    }

    pub fn value(&self) -> Option<Decimal> {
        self.value
    }

    pub fn original_string(&self) -> &str {
        &self.original_string
    }
}

impl From<Decimal> for PreciseDecimal {
    fn from(value: Decimal) -> Self {
        Self {
            value: Some(value),
            original_string: Arc::from(value.to_string()),
        }
    }
}

impl fmt::Display for PreciseDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original_string)
    }
}

/// Writes the original text as a bare JSON number.
impl Serialize for PreciseDecimal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match serde_json::value::RawValue::from_string(self.original_string.to_string()) {
            Ok(raw_value) => raw_value.serialize(serializer),
            Err(e) => Err(serde::ser::Error::custom(format!(
                "Failed to serialize PreciseDecimal '{}': {}",
                self.original_string, e
            ))),
        }
    }
}

/// Accepts JSON numbers and numeric strings.
impl<'de> Deserialize<'de> for PreciseDecimal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let json_value = Value::deserialize(deserializer)?;
        match PreciseDecimal::from_json(&json_value) {
            Some(decimal) => Ok(decimal),
            None => Err(de::Error::invalid_type(
                match json_value {
                    Value::Null => de::Unexpected::Unit,
                    Value::Bool(b) => de::Unexpected::Bool(b),
                    Value::Array(_) => de::Unexpected::Seq,
                    _ => de::Unexpected::Map,
                },
                &"a number or a numeric string",
            )),
        }
    }
}
