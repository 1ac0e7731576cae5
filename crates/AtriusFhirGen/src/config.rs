//! Generator configuration.
//!
//! The configuration carries every naming decision the generator makes that is not
//! derived from the specification itself: class name remappings, reserved words,
//! enum naming overrides and the hand-written ("manual") classes generated code
//! builds on. A default is embedded in the binary; user files are merged over it.

use crate::error::{GeneratorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;

const DEFAULT_CONFIG: &str = include_str!("../resources/generator.yaml");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamingRules {
    /// Prefix backbone element classes with their parent class name.
    pub backbone_class_adds_parent: bool,
    pub camelcase_classes: bool,
    pub camelcase_enums: bool,
    pub resource_modules_lowercase: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingRules {
    /// Type names or element paths (`Practitioner.role`) to class names.
    #[serde(default)]
    pub classmap: BTreeMap<String, String>,
    /// Classes swapped for others at render time.
    #[serde(default)]
    pub replacemap: BTreeMap<String, String>,
    /// Class names native to the target language.
    #[serde(default)]
    pub natives: Vec<String>,
    /// Class name to the shape expected from JSON decoding.
    #[serde(default)]
    pub jsonmap: BTreeMap<String, String>,
    pub jsonmap_default: String,
    /// Identifiers that clash with target language keywords.
    #[serde(default)]
    pub reservedmap: BTreeMap<String, String>,
    /// Codes that cannot be turned into reasonable identifiers.
    #[serde(default)]
    pub enum_map: BTreeMap<String, String>,
    /// CodeSystem URI to enum name.
    #[serde(default)]
    pub enum_namemap: BTreeMap<String, String>,
    /// CodeSystem URIs that produce no enum.
    #[serde(default)]
    pub enum_ignore: BTreeSet<String>,
}

/// A group of hand-written classes shipped with the generated code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualProfile {
    pub module: String,
    pub contains: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub name: String,
    #[serde(default)]
    pub specification_url: Option<String>,
    pub output_file: String,
    #[serde(default = "default_reference_class")]
    pub reference_class: String,
    pub naming_rules: NamingRules,
    /// StructureDefinition kind to the root class its types derive from.
    pub default_base: BTreeMap<String, String>,
    #[serde(default)]
    pub manual_profiles: Vec<ManualProfile>,
    pub mapping_rules: MappingRules,
}

fn default_reference_class() -> String {
    "Reference".to_string()
}

pub const ABSTRACT_BASE: &str = "FHIRAbstractBase";
pub const ABSTRACT_RESOURCE: &str = "FHIRAbstractResource";

impl GeneratorConfig {
    /// The configuration embedded in the generator.
    pub fn embedded() -> Result<Self> {
        Self::from_yaml_str(DEFAULT_CONFIG)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: GeneratorConfig = serde_yaml::from_str(yaml)?;
        config.check()?;
        Ok(config)
    }

    /// Loads `path` and merges it over the embedded default. Top-level keys present in
    /// the file replace the default's value for that key entirely.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::merged_with(&text)
    }

    pub fn merged_with(yaml: &str) -> Result<Self> {
        let mut base: serde_yaml::Mapping = serde_yaml::from_str(DEFAULT_CONFIG)?;
        let overrides: serde_yaml::Mapping = if yaml.trim().is_empty() {
            serde_yaml::Mapping::new()
        } else {
            serde_yaml::from_str(yaml)?
        };
        for (key, value) in overrides {
            debug!("Config override for {:?}", key);
            base.insert(key, value);
        }
        let config: GeneratorConfig = serde_yaml::from_value(serde_yaml::Value::Mapping(base))?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        for root in [ABSTRACT_BASE, ABSTRACT_RESOURCE] {
            if !self.is_manual_class(root) {
                return Err(GeneratorError::Config(format!(
                    "manual_profiles must provide the root class '{}'",
                    root
                )));
            }
        }
        for (kind, base) in &self.default_base {
            if !self.is_manual_class(base) {
                return Err(GeneratorError::Config(format!(
                    "default_base for '{}' names '{}', which is not a manual class",
                    kind, base
                )));
            }
        }
        Ok(())
    }

    /// Whether `name` is provided by a hand-written class.
    pub fn is_manual_class(&self, name: &str) -> bool {
        self.manual_profiles
            .iter()
            .any(|p| p.contains.iter().any(|c| c == name))
    }

    pub fn manual_module(&self, name: &str) -> Option<&str> {
        self.manual_profiles
            .iter()
            .find(|p| p.contains.iter().any(|c| c == name))
            .map(|p| p.module.as_str())
    }

    /// Root class for a StructureDefinition kind without a usable base.
    pub fn default_base_for(&self, kind: &str) -> Option<&str> {
        self.default_base.get(kind).map(String::as_str)
    }

    pub fn roots(&self) -> Vec<String> {
        vec![ABSTRACT_BASE.to_string(), ABSTRACT_RESOURCE.to_string()]
    }

    pub fn is_native(&self, class_name: &str) -> bool {
        self.mapping_rules.natives.iter().any(|n| n == class_name)
    }

    pub fn json_class(&self, class_name: &str) -> &str {
        self.mapping_rules
            .jsonmap
            .get(class_name)
            .unwrap_or(&self.mapping_rules.jsonmap_default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_config_loads() {
        let config = GeneratorConfig::embedded().unwrap();
        assert_eq!(config.reference_class, "Reference");
        assert_eq!(
            config.mapping_rules.classmap.get("Practitioner.role").map(String::as_str),
            Some("PractRole")
        );
        assert_eq!(config.default_base_for("resource"), Some(ABSTRACT_RESOURCE));
        assert!(config.is_manual_class("dateTime"));
        assert!(config.is_native("str"));
        assert_eq!(config.json_class("FHIRDate"), "str");
        assert_eq!(config.json_class("Quantity"), "dict");
    }

    #[test]
    fn test_user_config_replaces_top_level_keys() {
        let config = GeneratorConfig::merged_with(
            "output_file: r4.py\nnaming_rules:\n  backbone_class_adds_parent: false\n  camelcase_classes: true\n  camelcase_enums: false\n  resource_modules_lowercase: true\n",
        )
        .unwrap();
        assert_eq!(config.output_file, "r4.py");
        assert!(!config.naming_rules.backbone_class_adds_parent);
        assert!(!config.naming_rules.camelcase_enums);
        // untouched keys keep their defaults
        assert_eq!(config.reference_class, "Reference");
    }

    #[test]
    fn test_missing_roots_is_a_config_error() {
        let err = GeneratorConfig::merged_with("manual_profiles: []\n").unwrap_err();
        assert!(matches!(err, GeneratorError::Config(_)));
    }

    #[test]
    fn test_empty_user_file_keeps_defaults() {
        let config = GeneratorConfig::merged_with("").unwrap();
        assert_eq!(config, GeneratorConfig::embedded().unwrap());
    }

    #[test]
    fn test_load_user_file_merges_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generator.yaml");
        std::fs::write(&path, "output_file: r4.py\nreference_class: Reference\n").unwrap();

        let config = GeneratorConfig::load(&path).unwrap();
        assert_eq!(config.output_file, "r4.py");
        let reserved = &config.mapping_rules.reservedmap;
        assert_eq!(reserved.get("True").map(String::as_str), Some("True_"));
        assert_eq!(reserved.get("False").map(String::as_str), Some("False_"));
        assert_eq!(reserved.get("None").map(String::as_str), Some("None_"));
        assert_eq!(
            config.mapping_rules,
            GeneratorConfig::embedded().unwrap().mapping_rules
        );

        assert!(GeneratorConfig::load(&dir.path().join("missing.yaml")).is_err());
    }
}
