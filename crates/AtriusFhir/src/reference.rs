//! Checks on `Reference` objects.

use crate::error::FailureKind;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// `[base/]Type/id[/_history/version]`, the form of a literal reference.
static LITERAL_REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\A((http|https)://([A-Za-z0-9\-\\\.:%\$]*/)+)?(?P<type>[A-Z][A-Za-z]+)/(?P<id>[A-Za-z0-9\-\.]{1,64})(/_history/[A-Za-z0-9\-\.]{1,64})?\z",
    )
    .expect("literal pattern")
});

/// A parsed literal reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralReference<'a> {
    pub resource_type: &'a str,
    pub id: &'a str,
}

/// Splits `Patient/123` or `http://server/fhir/Patient/123/_history/2` into type and
/// id. Only names in `resource_types` count as resource types.
pub fn parse_literal<'a>(
    reference: &'a str,
    resource_types: &HashSet<String>,
) -> Option<LiteralReference<'a>> {
    let captures = LITERAL_REFERENCE_RE.captures(reference)?;
    let resource_type = captures.name("type")?.as_str();
    if !resource_types.contains(resource_type) {
        return None;
    }
    Some(LiteralReference {
        resource_type,
        id: captures.name("id")?.as_str(),
    })
}

/// Validates the `reference` and `type` members of a Reference object.
///
/// A reference is accepted when it is a local fragment (`#p1`), a literal reference to
/// a known resource type, or any absolute URL (including `urn:uuid:` and `urn:oid:`).
/// When both a literal reference and `type` are present, they must agree.
pub fn check_reference(
    object: &Map<String, Value>,
    resource_types: &HashSet<String>,
) -> Result<(), (FailureKind, String)> {
    let Some(Value::String(reference)) = object.get("reference") else {
        return Ok(());
    };
    if reference.starts_with('#') {
        return Ok(());
    }

    match parse_literal(reference, resource_types) {
        Some(literal) => {
            if let Some(Value::String(declared)) = object.get("type") {
                if declared != literal.resource_type {
                    return Err((
                        FailureKind::ReferenceTypeConsistency,
                        format!(
                            "type '{}' does not match the resource type '{}' in reference '{}'",
                            declared, literal.resource_type, reference
                        ),
                    ));
                }
            }
            Ok(())
        }
        None if url::Url::parse(reference).is_ok() => Ok(()),
        None => Err((
            FailureKind::ReferenceFormat,
            format!(
                "'{}' is neither a literal reference, a fragment nor an absolute URL",
                reference
            ),
        )),
    }
}
