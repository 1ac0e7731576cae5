//! Identifier derivation for generated classes, modules, properties and enums.
//!
//! Every function here is deterministic and driven only by [`GeneratorConfig`], so
//! two runs over the same specification produce the same names.

use crate::config::GeneratorConfig;
use heck::ToSnakeCase;

const FHIRPATH_SYSTEM_PREFIX: &str = "http://hl7.org/fhirpath/System.";

/// Capitalizes the first letter of a string.
///
/// ```
/// use atrius_fhir_generator::naming::capitalize_first_letter;
/// assert_eq!(capitalize_first_letter("humanName"), "HumanName");
/// ```
pub fn capitalize_first_letter(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

fn lowercase_first_letter(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
    }
}

/// Maps FHIRPath system type URLs (used for `id`, `url` and primitive `value`
/// elements) onto the FHIR primitive they stand for. Other codes pass through.
pub fn normalize_type_code(code: &str) -> &str {
    match code.strip_prefix(FHIRPATH_SYSTEM_PREFIX) {
        Some("String") => "string",
        Some("Boolean") => "boolean",
        Some("Integer") => "integer",
        Some("Decimal") => "decimal",
        Some("Date") => "date",
        Some("DateTime") => "dateTime",
        Some("Time") => "time",
        _ => code,
    }
}

/// Whether the code is one of the FHIRPath system types rather than a FHIR type.
pub fn is_system_type(code: &str) -> bool {
    code.starts_with(FHIRPATH_SYSTEM_PREFIX)
}

/// Naming operations bound to one configuration.
#[derive(Debug, Clone, Copy)]
pub struct Naming<'a> {
    config: &'a GeneratorConfig,
}

impl<'a> Naming<'a> {
    pub fn new(config: &'a GeneratorConfig) -> Self {
        Self { config }
    }

    /// Class name for a type or element name.
    ///
    /// With a `parent`, the `classmap` is consulted for the element path
    /// (`Practitioner.role`) first, then for the bare name.
    pub fn as_class_name(&self, name: &str, parent: Option<&str>) -> String {
        let classmap = &self.config.mapping_rules.classmap;
        if let Some(parent) = parent {
            if let Some(mapped) = classmap.get(&format!("{}.{}", parent, name)) {
                return mapped.clone();
            }
        }
        if let Some(mapped) = classmap.get(name) {
            return mapped.clone();
        }
        if self.config.naming_rules.camelcase_classes {
            capitalize_first_letter(name)
        } else {
            name.to_string()
        }
    }

    /// Class name of a backbone element at `path` whose parent class is `parent_class`.
    pub fn backbone_class_name(&self, path: &str, parent_class: &str) -> String {
        if let Some(mapped) = self.config.mapping_rules.classmap.get(path) {
            return mapped.clone();
        }
        let element = path.rsplit('.').next().unwrap_or(path);
        if self.config.naming_rules.backbone_class_adds_parent {
            format!("{}{}", parent_class, capitalize_first_letter(element))
        } else {
            capitalize_first_letter(element)
        }
    }

    /// Class holding values of the FHIR type `code`, e.g. `str` for `string`.
    pub fn class_name_for_type(&self, code: &str) -> String {
        let code = normalize_type_code(code);
        self.config
            .mapping_rules
            .classmap
            .get(code)
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }

    /// Class named by a profile URL's last path segment.
    pub fn class_name_for_profile(&self, profile_url: Option<&str>) -> Option<String> {
        let name = profile_url?.rsplit('/').next()?;
        if name.is_empty() {
            return None;
        }
        Some(self.as_class_name(name, None))
    }

    /// Applies the render-time `replacemap`.
    pub fn replaced_class_name(&self, class_name: &str) -> String {
        self.config
            .mapping_rules
            .replacemap
            .get(class_name)
            .cloned()
            .unwrap_or_else(|| class_name.to_string())
    }

    pub fn as_module_name(&self, name: &str) -> String {
        if self.config.naming_rules.resource_modules_lowercase {
            name.to_lowercase()
        } else {
            name.to_string()
        }
    }

    fn reserved(&self, name: String) -> String {
        match self.config.mapping_rules.reservedmap.get(&name) {
            Some(replacement) => replacement.clone(),
            None => name,
        }
    }

    /// Target-language field name for the FHIR element `name`.
    pub fn safe_property_name(&self, name: &str) -> String {
        self.reserved(name.to_snake_case())
    }

    /// Turns any string into a valid identifier.
    ///
    /// `enum_map` replaces symbolic codes first. Runs of characters that are not ASCII
    /// alphanumeric become word boundaries; words are camel-cased (or joined with `_`
    /// when `camelcase_enums` is off). A leading digit gets a `_` prefix and the
    /// `reservedmap` is applied last. The transform is total and idempotent.
    pub fn safe_enum_name(&self, raw: &str, upper_first: bool) -> String {
        let raw = self
            .config
            .mapping_rules
            .enum_map
            .get(raw)
            .map(String::as_str)
            .unwrap_or(raw);
        let parts: Vec<&str> = raw
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|p| !p.is_empty())
            .collect();

        let mut name = if self.config.naming_rules.camelcase_enums {
            let all_caps = raw.chars().any(|c| c.is_ascii_uppercase())
                && !raw.chars().any(|c| c.is_ascii_lowercase());
            let joined: String = parts.iter().map(|p| capitalize_first_letter(p)).collect();
            if upper_first || all_caps {
                joined
            } else {
                lowercase_first_letter(&joined)
            }
        } else {
            parts.join("_")
        };

        if name.is_empty() {
            return "_".to_string();
        }
        if name.starts_with(|c: char| c.is_ascii_digit()) {
            name.insert(0, '_');
        }
        self.reserved(name)
    }
}
