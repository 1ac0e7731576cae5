use crate::element_definition::ElementDefinition;
use serde::{Deserialize, Serialize};

/// Bootstrap representation of a FHIR StructureDefinition.
///
/// Only the fields the class model builder reads are kept; everything else in the
/// specification files is ignored during deserialization.
///
/// ## Key Fields
///
/// - `name`: The name of the type being defined (e.g., "Patient", "string", "Observation")
/// - `kind`: The kind of definition ("resource", "complex-type", "primitive-type" or "logical")
/// - `abstract`: Whether this is an abstract base type (not directly instantiable)
/// - `snapshot`: Contains the complete element definitions for this type
/// - `differential`: Contains only the differences from the base definition
///
/// ## Usage in Code Generation
///
/// The class model builder uses StructureDefinitions to:
/// 1. Decide which types become generated classes
/// 2. Extract properties, cardinalities and choice elements
/// 3. Resolve superclass relationships through `baseDefinition`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StructureDefinition {
    pub id: Option<String>,
    pub url: String,
    pub name: String,
    pub title: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "fhirVersion")]
    pub fhir_version: Option<String>,
    pub kind: String,
    #[serde(rename = "abstract", default)]
    pub r#abstract: bool,
    #[serde(rename = "type")]
    pub r#type: String,
    #[serde(rename = "baseDefinition")]
    pub base_definition: Option<String>,
    pub derivation: Option<String>,
    pub snapshot: Option<StructureDefinitionSnapshotOrDifferential>,
    pub differential: Option<StructureDefinitionSnapshotOrDifferential>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StructureDefinitionSnapshotOrDifferential {
    pub id: Option<String>,
    pub element: Option<Vec<ElementDefinition>>,
}

impl StructureDefinition {
    /// Elements of the snapshot, falling back to the differential for specializations
    /// that ship without one.
    pub fn elements(&self) -> &[ElementDefinition] {
        self.snapshot
            .as_ref()
            .and_then(|s| s.element.as_deref())
            .or_else(|| self.differential.as_ref().and_then(|d| d.element.as_deref()))
            .unwrap_or(&[])
    }

    pub fn is_primitive_type(&self) -> bool {
        self.kind == "primitive-type"
    }

    pub fn is_resource(&self) -> bool {
        self.kind == "resource"
    }

    /// Name of the base type, i.e. the last segment of `baseDefinition`.
    pub fn base_type_name(&self) -> Option<&str> {
        self.base_definition
            .as_deref()
            .and_then(|b| b.rsplit('/').next())
            .filter(|b| !b.is_empty())
    }
}
