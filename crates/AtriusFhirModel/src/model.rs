use crate::rules::{ChoiceGroup, ValidationRule};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Upper bound of an element's cardinality. Serialized the FHIR way: `"1"`, `"*"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum MaxCardinality {
    Bounded(u32),
    Unbounded,
}

impl MaxCardinality {
    pub fn parse(max: &str) -> Option<Self> {
        match max.trim() {
            "*" => Some(MaxCardinality::Unbounded),
            other => other.parse::<u32>().ok().map(MaxCardinality::Bounded),
        }
    }
}

impl fmt::Display for MaxCardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxCardinality::Bounded(n) => write!(f, "{}", n),
            MaxCardinality::Unbounded => f.write_str("*"),
        }
    }
}

impl From<MaxCardinality> for String {
    fn from(max: MaxCardinality) -> Self {
        max.to_string()
    }
}

impl TryFrom<String> for MaxCardinality {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        MaxCardinality::parse(&value).ok_or_else(|| format!("invalid max cardinality '{}'", value))
    }
}

/// Element cardinality as declared by `ElementDefinition.min` / `.max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cardinality {
    pub min: u32,
    pub max: MaxCardinality,
}

impl Cardinality {
    pub const OPTIONAL: Cardinality = Cardinality {
        min: 0,
        max: MaxCardinality::Bounded(1),
    };

    /// Builds a cardinality from the raw element fields. A missing `min` means 0 and a
    /// missing `max` means 1; an unparseable `max` yields `None`.
    pub fn parse(min: Option<u32>, max: Option<&str>) -> Option<Self> {
        let max = match max {
            Some(max) => MaxCardinality::parse(max)?,
            None => MaxCardinality::Bounded(1),
        };
        Some(Cardinality {
            min: min.unwrap_or(0),
            max,
        })
    }

    /// Repeating elements are represented as JSON arrays.
    pub fn is_list(&self) -> bool {
        match self.max {
            MaxCardinality::Unbounded => true,
            MaxCardinality::Bounded(n) => n > 1,
        }
    }

    pub fn is_required(&self) -> bool {
        self.min >= 1
    }

    /// `max = 0` marks an element that has been profiled away.
    pub fn is_prohibited(&self) -> bool {
        self.max == MaxCardinality::Bounded(0)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.min, self.max)
    }
}

/// What a generated class stands for in the FHIR type system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassKind {
    ComplexType,
    Resource,
    BackboneElement,
}

/// One field of a generated class.
///
/// `name` is the wire name (the JSON key), already expanded for choice elements, so a
/// `value[x]` element permitting `Quantity` and `string` yields two properties,
/// `valueQuantity` and `valueString`, both with `choice_group = Some("value")`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyModel {
    pub name: String,
    /// FHIR type code as declared, e.g. `dateTime`, `Quantity`, `BackboneElement`.
    pub fhir_type: String,
    /// Name of the generated (or native/manual) class holding the value.
    pub type_name: String,
    /// Shape expected from JSON decoding (`str`, `int`, `float`, `bool`, `dict`).
    pub json_class: String,
    pub cardinality: Cardinality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_group: Option<String>,
    #[serde(default)]
    pub is_primitive: bool,
    #[serde(default)]
    pub is_native: bool,
    #[serde(default)]
    pub is_summary: bool,
    #[serde(default)]
    pub is_modifier: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_targets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restricted_to: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<ValidationRule>,
}

impl PropertyModel {
    pub fn is_list(&self) -> bool {
        self.cardinality.is_list()
    }

    /// Non-choice properties with `min >= 1`. Requiredness of choice members is carried
    /// by their group instead.
    pub fn is_required(&self) -> bool {
        self.choice_group.is_none() && self.cardinality.is_required()
    }

    /// The `_name` key carrying id/extensions for a primitive property.
    pub fn companion_key(&self) -> Option<String> {
        self.is_primitive.then(|| format!("_{}", self.name))
    }

    pub fn has_rule(&self, rule: &ValidationRule) -> bool {
        self.rules.contains(rule)
    }
}

/// One generated class: a resource, a complex data type or a backbone element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassModel {
    pub name: String,
    /// FHIR path of the defining element, `Patient` or `Patient.contact`.
    pub fhir_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superclass: Option<String>,
    pub kind: ClassKind,
    #[serde(default)]
    pub is_abstract: bool,
    pub module: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profile_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default)]
    pub properties: Vec<PropertyModel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choice_groups: Vec<ChoiceGroup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<ValidationRule>,
}

impl ClassModel {
    pub fn property(&self, name: &str) -> Option<&PropertyModel> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn choice_group(&self, name: &str) -> Option<&ChoiceGroup> {
        self.choice_groups.iter().find(|g| g.name == name)
    }

    pub fn is_resource(&self) -> bool {
        self.kind == ClassKind::Resource
    }

    /// The `resourceType` value instances of this class carry.
    pub fn resource_type(&self) -> Option<&str> {
        self.is_resource().then_some(self.fhir_name.as_str())
    }
}

/// One member of a generated enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    pub code: String,
    pub name: String,
    pub doc: String,
}

/// Enumeration derived from a complete CodeSystem. Values keep declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumModel {
    pub name: String,
    pub system: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    pub values: Vec<EnumValue>,
}

impl EnumModel {
    pub fn value(&self, code: &str) -> Option<&EnumValue> {
        self.values.iter().find(|v| v.code == code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|v| v.code.as_str())
    }
}

/// The immutable output of one generator run.
///
/// `classes` is in render order: every class appears after its superclass. The two
/// abstract roots named in `roots` are hand-written and have no [`ClassModel`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fhir_version: Option<String>,
    #[serde(default)]
    pub roots: Vec<String>,
    #[serde(default)]
    pub reference_class: Option<String>,
    #[serde(default)]
    pub classes: Vec<ClassModel>,
    #[serde(default)]
    pub enums: Vec<EnumModel>,
}

impl GeneratedModel {
    pub fn class(&self, name: &str) -> Option<&ClassModel> {
        self.classes.iter().find(|c| c.name == name)
    }

    pub fn enumeration(&self, name: &str) -> Option<&EnumModel> {
        self.enums.iter().find(|e| e.name == name)
    }

    /// Index by class name, for consumers doing many lookups.
    pub fn class_index(&self) -> HashMap<&str, &ClassModel> {
        self.classes.iter().map(|c| (c.name.as_str(), c)).collect()
    }

    pub fn resources(&self) -> impl Iterator<Item = &ClassModel> {
        self.classes.iter().filter(|c| c.is_resource())
    }

    /// Walks from `name` up the superclass chain, starting with the class itself.
    /// Stops at the first name without a generated class (a root or manual class).
    pub fn ancestry<'a>(&'a self, name: &str) -> Vec<&'a ClassModel> {
        let index = self.class_index();
        let mut chain = Vec::new();
        let mut current = index.get(name).copied();
        while let Some(class) = current {
            if chain.iter().any(|c: &&ClassModel| c.name == class.name) {
                break;
            }
            chain.push(class);
            current = class
                .superclass
                .as_deref()
                .and_then(|s| index.get(s).copied());
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str, superclass: Option<&str>) -> ClassModel {
        ClassModel {
            name: name.to_string(),
            fhir_name: name.to_string(),
            superclass: superclass.map(str::to_string),
            kind: ClassKind::ComplexType,
            is_abstract: false,
            module: name.to_lowercase(),
            profile_urls: vec![],
            short: None,
            definition: None,
            properties: vec![],
            choice_groups: vec![],
            rules: vec![],
        }
    }

    #[test]
    fn test_cardinality_parse() {
        let card = Cardinality::parse(Some(1), Some("1")).unwrap();
        assert!(!card.is_list());
        assert!(card.is_required());
        assert_eq!(card.to_string(), "1..1");

        let card = Cardinality::parse(None, Some("*")).unwrap();
        assert!(card.is_list());
        assert_eq!(card.to_string(), "0..*");

        assert!(Cardinality::parse(Some(0), Some("0")).unwrap().is_prohibited());
        assert!(Cardinality::parse(Some(0), Some("n")).is_none());
        assert_eq!(Cardinality::parse(None, None), Some(Cardinality::OPTIONAL));
    }

    #[test]
    fn test_max_cardinality_serializes_as_fhir_string() {
        let card = Cardinality::parse(Some(0), Some("*")).unwrap();
        let json = serde_json::to_value(card).unwrap();
        assert_eq!(json, serde_json::json!({"min": 0, "max": "*"}));
        let back: Cardinality = serde_json::from_value(json).unwrap();
        assert_eq!(back, card);
    }

    #[test]
    fn test_ancestry_stops_at_roots() {
        let model = GeneratedModel {
            classes: vec![
                class("Element", Some("FHIRAbstractBase")),
                class("Quantity", Some("Element")),
                class("Age", Some("Quantity")),
            ],
            ..Default::default()
        };
        let names: Vec<_> = model.ancestry("Age").iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Age", "Quantity", "Element"]);
        assert!(model.ancestry("Missing").is_empty());
    }
}
