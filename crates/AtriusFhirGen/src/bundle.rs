use crate::structure_definition::StructureDefinition;
use crate::terminology::{CodeSystem, ValueSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Bootstrap representation of a FHIR Bundle.
///
/// The specification files are shipped as `collection` Bundles whose entries hold the
/// StructureDefinitions, CodeSystems and ValueSets the generator consumes. Entries are
/// kept as raw JSON and classified afterwards with [`SpecResource::from_value`].
#[derive(Debug, Serialize, Deserialize)]
pub struct Bundle {
    #[serde(rename = "resourceType")]
    pub resource_type: String,
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub r#type: Option<String>,
    pub entry: Option<Vec<BundleEntry>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BundleEntry {
    #[serde(rename = "fullUrl")]
    pub full_url: Option<String>,
    pub resource: Option<Value>,
}

/// A specification document the generator knows how to use.
#[derive(Debug, Clone)]
pub enum SpecResource {
    StructureDefinition(Box<StructureDefinition>),
    CodeSystem(Box<CodeSystem>),
    ValueSet(Box<ValueSet>),
    Other(String),
}

impl SpecResource {
    /// Classifies a resource by its `resourceType`.
    ///
    /// Dispatch goes through [`Value`] instead of an internally tagged enum so that
    /// numbers deserialize correctly regardless of which `serde_json` features are
    /// enabled elsewhere in the build.
    pub fn from_value(value: Value) -> serde_json::Result<SpecResource> {
        let resource_type = value
            .get("resourceType")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(match resource_type.as_str() {
            "StructureDefinition" => {
                SpecResource::StructureDefinition(Box::new(serde_json::from_value(value)?))
            }
            "CodeSystem" => SpecResource::CodeSystem(Box::new(serde_json::from_value(value)?)),
            "ValueSet" => SpecResource::ValueSet(Box::new(serde_json::from_value(value)?)),
            _ => SpecResource::Other(resource_type),
        })
    }
}

impl Bundle {
    /// Consumes the bundle, yielding the raw resource of every entry that has one.
    pub fn into_resources(self) -> impl Iterator<Item = Value> {
        self.entry
            .unwrap_or_default()
            .into_iter()
            .filter_map(|e| e.resource)
    }
}
