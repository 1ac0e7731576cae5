use serde::{Deserialize, Serialize};

/// Bootstrap representation of a FHIR ElementDefinition.
///
/// An ElementDefinition describes a single element (field) within a FHIR type,
/// including its data type, cardinality, binding and documentation.
///
/// ## Key Fields
///
/// - `path`: The full path to this element (e.g., "Patient.name.given")
/// - `type`: The data type(s) this element can contain
/// - `min`/`max`: Cardinality constraints (0..1, 1..1, 0..*, etc.)
/// - `content_reference`: Reference to another element definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ElementDefinition {
    pub id: Option<String>,
    pub path: String,
    #[serde(rename = "sliceName")]
    pub slice_name: Option<String>,
    pub short: Option<String>,
    pub definition: Option<String>,
    pub comment: Option<String>,
    pub min: Option<u32>,
    pub max: Option<String>,
    pub base: Option<ElementDefinitionBase>,
    #[serde(rename = "contentReference")]
    pub content_reference: Option<String>,
    #[serde(rename = "type")]
    pub r#type: Option<Vec<ElementDefinitionType>>,
    #[serde(rename = "isModifier")]
    pub is_modifier: Option<bool>,
    #[serde(rename = "isSummary")]
    pub is_summary: Option<bool>,
    pub binding: Option<ElementDefinitionBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDefinitionBinding {
    pub strength: String,
    pub description: Option<String>,
    #[serde(rename = "valueSet")]
    pub value_set: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDefinitionBase {
    pub path: String,
    pub min: u32,
    pub max: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDefinitionType {
    pub code: String,
    pub profile: Option<Vec<String>>,
    #[serde(rename = "targetProfile")]
    pub target_profile: Option<Vec<String>>,
}

impl ElementDefinitionType {
    /// Creates a new ElementDefinitionType with just a code.
    pub fn new(code: impl Into<String>) -> ElementDefinitionType {
        ElementDefinitionType {
            code: code.into(),
            profile: None,
            target_profile: None,
        }
    }
}

impl ElementDefinition {
    /// The last path segment, e.g. `given` for `Patient.name.given`.
    pub fn element_name(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }

    /// The path without its last segment, e.g. `Patient.name` for `Patient.name.given`.
    pub fn parent_path(&self) -> Option<&str> {
        self.path.rsplit_once('.').map(|(parent, _)| parent)
    }

    /// Depth below the root element: `Patient` is 0, `Patient.name` is 1.
    pub fn depth(&self) -> usize {
        self.path.matches('.').count()
    }

    pub fn is_choice(&self) -> bool {
        self.path.ends_with("[x]")
    }

    pub fn types(&self) -> &[ElementDefinitionType] {
        self.r#type.as_deref().unwrap_or(&[])
    }

    /// Whether the element introduces an inline class (a backbone element).
    pub fn is_backbone(&self) -> bool {
        self.content_reference.is_none()
            && self
                .types()
                .iter()
                .any(|t| t.code == "BackboneElement" || t.code == "Element")
            && self.depth() > 0
    }
}

/// Extracts the element id from a content reference like `#Questionnaire.item`.
///
/// Newer specification releases use absolute forms such as
/// `http://hl7.org/fhir/StructureDefinition/Questionnaire#Questionnaire.item`; both
/// yield `Questionnaire.item`.
pub fn extract_content_reference_id(content_ref: &str) -> Option<&str> {
    content_ref
        .rsplit_once('#')
        .map(|(_, id)| id)
        .filter(|id| !id.is_empty())
}
