use serde::{Deserialize, Serialize};

/// A constraint that generated code (or an equivalent runtime) must enforce when an
/// instance is constructed or deserialized.
///
/// Rules are pure descriptors. The generator attaches them to properties and classes;
/// renderers turn them into validator code and the runtime interprets them directly.
///
/// | Rule | Attached to | Meaning |
/// |------|-------------|---------|
/// | `SingletonNotList` | property | a `max = 1` element must not be given a JSON array |
/// | `ChoiceExclusivity` | class | at most one (or exactly one, if required) member of a choice group is set |
/// | `PrimitiveExtensionPairing` | property | value and `_value` companion must line up |
/// | `ReferenceTypeConsistency` | class | `Reference.type` agrees with the type in `Reference.reference` |
/// | `ReferenceFormat` | class | `Reference.reference` is literal, a fragment, or an absolute URL |
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ValidationRule {
    SingletonNotList,
    ChoiceExclusivity { group: String, required: bool },
    PrimitiveExtensionPairing,
    ReferenceTypeConsistency,
    ReferenceFormat,
}

impl ValidationRule {
    /// Short stable identifier, used in diagnostics and generated code comments.
    pub fn name(&self) -> &'static str {
        match self {
            ValidationRule::SingletonNotList => "singleton-not-list",
            ValidationRule::ChoiceExclusivity { .. } => "choice-exclusivity",
            ValidationRule::PrimitiveExtensionPairing => "primitive-extension-pairing",
            ValidationRule::ReferenceTypeConsistency => "reference-type-consistency",
            ValidationRule::ReferenceFormat => "reference-format",
        }
    }

    /// Whether the rule constrains a single property rather than the whole object.
    pub fn is_property_rule(&self) -> bool {
        matches!(
            self,
            ValidationRule::SingletonNotList | ValidationRule::PrimitiveExtensionPairing
        )
    }
}

/// One permitted alternative of a choice element, e.g. `valueQuantity` of type `Quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceAlternative {
    pub property: String,
    pub type_name: String,
}

/// The set of concrete properties expanded from one `nnn[x]` element.
///
/// On the wire the alternatives are separate JSON keys; conceptually they form a tagged
/// union keyed by [`ChoiceGroup::name`]. A group always has at least two alternatives.
/// [`ChoiceGroup::new`] enforces this; groups read back from model JSON are checked again
/// when a runtime schema is built from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceGroup {
    pub name: String,
    pub alternatives: Vec<ChoiceAlternative>,
    pub required: bool,
}

impl ChoiceGroup {
    /// Builds a group, returning `None` when fewer than two alternatives are given.
    pub fn new(
        name: impl Into<String>,
        alternatives: Vec<ChoiceAlternative>,
        required: bool,
    ) -> Option<Self> {
        if alternatives.len() < 2 {
            return None;
        }
        Some(Self {
            name: name.into(),
            alternatives,
            required,
        })
    }

    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.alternatives.iter().map(|a| a.property.as_str())
    }

    pub fn contains(&self, property: &str) -> bool {
        self.alternatives.iter().any(|a| a.property == property)
    }

    pub fn alternative(&self, property: &str) -> Option<&ChoiceAlternative> {
        self.alternatives.iter().find(|a| a.property == property)
    }

    /// The class-level rule enforcing this group.
    pub fn rule(&self) -> ValidationRule {
        ValidationRule::ChoiceExclusivity {
            group: self.name.clone(),
            required: self.required,
        }
    }
}
