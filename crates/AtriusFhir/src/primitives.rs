//! Lexical and range checks for FHIR primitive values.

use crate::date_time::{PrecisionDate, PrecisionDateTime, PrecisionTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

/// Anchors a pattern so it must match the whole value.
fn exact(pattern: &str) -> Regex {
    Regex::new(&format!(r"\A(?:{})\z", pattern)).expect("literal pattern")
}

const YEAR: &str = r"([0-9]([0-9]([0-9][1-9]|[1-9]0)|[1-9]00)|[1-9]000)";
const TIME: &str = r"([01][0-9]|2[0-3]):[0-5][0-9]:([0-5][0-9]|60)(\.[0-9]+)?";
const ZONE: &str = r"(Z|(\+|-)((0[0-9]|1[0-3]):[0-5][0-9]|14:00))";

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| exact(&format!(r"{}(-(0[1-9]|1[0-2])(-(0[1-9]|[1-2][0-9]|3[0-1]))?)?", YEAR)));
static DATE_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    exact(&format!(
        r"{}(-(0[1-9]|1[0-2])(-(0[1-9]|[1-2][0-9]|3[0-1])(T{}{})?)?)?",
        YEAR, TIME, ZONE
    ))
});
static INSTANT_RE: Lazy<Regex> = Lazy::new(|| {
    exact(&format!(
        r"{}-(0[1-9]|1[0-2])-(0[1-9]|[1-2][0-9]|3[0-1])T{}{}",
        YEAR, TIME, ZONE
    ))
});
static TIME_RE: Lazy<Regex> = Lazy::new(|| exact(TIME));
static CODE_RE: Lazy<Regex> = Lazy::new(|| exact(r"[^\s]+( [^\s]+)*"));
static ID_RE: Lazy<Regex> = Lazy::new(|| exact(r"[A-Za-z0-9\-\.]{1,64}"));
static URI_RE: Lazy<Regex> = Lazy::new(|| exact(r"\S*"));
static OID_RE: Lazy<Regex> = Lazy::new(|| exact(r"urn:oid:[0-2](\.(0|[1-9][0-9]*))+"));
static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    exact(r"urn:uuid:[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
});
static BASE64_RE: Lazy<Regex> = Lazy::new(|| exact(r"(\s*([0-9a-zA-Z\+/=]){4}\s*)+"));
static DECIMAL_RE: Lazy<Regex> =
    Lazy::new(|| exact(r"-?(0|[1-9][0-9]*)(\.[0-9]+)?([eE][+-]?[0-9]+)?"));
static INTEGER64_RE: Lazy<Regex> = Lazy::new(|| exact(r"[0]|[-+]?[1-9][0-9]*"));

/// The FHIR primitive types with a JSON representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Boolean,
    Integer,
    UnsignedInt,
    PositiveInt,
    Integer64,
    Decimal,
    String,
    Markdown,
    Code,
    Id,
    Uri,
    Url,
    Canonical,
    Oid,
    Uuid,
    Base64Binary,
    Date,
    DateTime,
    Instant,
    Time,
    Xhtml,
}

impl PrimitiveKind {
    /// Maps a FHIR type code (`dateTime`, `positiveInt`, ...) to its kind.
    pub fn from_fhir_type(code: &str) -> Option<Self> {
        let kind = match code {
            "boolean" => PrimitiveKind::Boolean,
            "integer" => PrimitiveKind::Integer,
            "unsignedInt" => PrimitiveKind::UnsignedInt,
            "positiveInt" => PrimitiveKind::PositiveInt,
            "integer64" => PrimitiveKind::Integer64,
            "decimal" => PrimitiveKind::Decimal,
            "string" => PrimitiveKind::String,
            "markdown" => PrimitiveKind::Markdown,
            "code" => PrimitiveKind::Code,
            "id" => PrimitiveKind::Id,
            "uri" => PrimitiveKind::Uri,
            "url" => PrimitiveKind::Url,
            "canonical" => PrimitiveKind::Canonical,
            "oid" => PrimitiveKind::Oid,
            "uuid" => PrimitiveKind::Uuid,
            "base64Binary" => PrimitiveKind::Base64Binary,
            "date" => PrimitiveKind::Date,
            "dateTime" => PrimitiveKind::DateTime,
            "instant" => PrimitiveKind::Instant,
            "time" => PrimitiveKind::Time,
            "xhtml" => PrimitiveKind::Xhtml,
            _ => return None,
        };
        Some(kind)
    }

    fn pattern(&self) -> Option<&'static Regex> {
        let re: &Lazy<Regex> = match self {
            PrimitiveKind::Code => &CODE_RE,
            PrimitiveKind::Id => &ID_RE,
            PrimitiveKind::Uri | PrimitiveKind::Url | PrimitiveKind::Canonical => &URI_RE,
            PrimitiveKind::Oid => &OID_RE,
            PrimitiveKind::Uuid => &UUID_RE,
            PrimitiveKind::Base64Binary => &BASE64_RE,
            PrimitiveKind::Date => &DATE_RE,
            PrimitiveKind::DateTime => &DATE_TIME_RE,
            PrimitiveKind::Instant => &INSTANT_RE,
            PrimitiveKind::Time => &TIME_RE,
            PrimitiveKind::Integer64 => &INTEGER64_RE,
            _ => return None,
        };
        Some(Lazy::force(re))
    }

    /// Checks one value. Numeric strings given for decimals are rewritten as JSON
    /// numbers, keeping their digits.
    pub fn check(&self, value: &mut Value) -> Result<(), String> {
        match self {
            PrimitiveKind::Boolean => match value {
                Value::Bool(_) => Ok(()),
                other => Err(format!("expected a boolean, got {}", describe(other))),
            },
            PrimitiveKind::Integer | PrimitiveKind::UnsignedInt | PrimitiveKind::PositiveInt => {
                let n = match value {
                    Value::Number(n) => n.as_i64(),
                    other => return Err(format!("expected an integer, got {}", describe(other))),
                };
                let Some(n) = n else {
                    return Err(format!("'{}' is not an integer", value));
                };
                let min = match self {
                    PrimitiveKind::PositiveInt => 1,
                    PrimitiveKind::UnsignedInt => 0,
                    _ => i64::from(i32::MIN),
                };
                if n < min || n > i64::from(i32::MAX) {
                    return Err(format!("{} is out of range for {:?}", n, self));
                }
                Ok(())
            }
            PrimitiveKind::Decimal => match value {
                Value::Number(_) => Ok(()),
                Value::String(s) if DECIMAL_RE.is_match(s) => {
                    let number: Number = s
                        .parse()
                        .map_err(|e| format!("'{}' is not a decimal: {}", s, e))?;
                    *value = Value::Number(number);
                    Ok(())
                }
                other => Err(format!("expected a decimal, got {}", describe(other))),
            },
            _ => {
                let Value::String(s) = value else {
                    return Err(format!("expected a string, got {}", describe(value)));
                };
                if let Some(re) = self.pattern() {
                    if !re.is_match(s) {
                        return Err(format!("'{}' is not a valid {:?}", s, self));
                    }
                }
                self.check_calendar(s)
            }
        }
    }

    /// The patterns allow day 31 in every month; calendar validity is checked here.
    fn check_calendar(&self, s: &str) -> Result<(), String> {
        let valid = match self {
            PrimitiveKind::Date => PrecisionDate::parse(s).is_some(),
            PrimitiveKind::DateTime | PrimitiveKind::Instant => PrecisionDateTime::parse(s).is_some(),
            PrimitiveKind::Time => PrecisionTime::parse(s).is_some(),
            PrimitiveKind::Integer64 => s.parse::<i64>().is_ok(),
            _ => true,
        };
        if valid {
            Ok(())
        } else {
            Err(format!("'{}' is not a valid {:?}", s, self))
        }
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
