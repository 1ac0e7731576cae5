//! Enum/CodeSystem Resolver.
//!
//! Every complete CodeSystem that is not ignored becomes one [`EnumModel`] with a
//! deterministic, collision-free name. ValueSets that select exactly one such system
//! are recorded as bindings so `code` properties with a required binding can be typed
//! with the enum.

use crate::class_model::ClassRegistry;
use crate::config::GeneratorConfig;
use crate::error::{GeneratorError, Result};
use crate::naming::Naming;
use crate::spec_dir::{Sourced, SpecDirectory};
use crate::terminology::{CodeSystem, Concept, ValueSet};
use atrius_fhir_model::{EnumModel, EnumValue};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};

/// The enum (and optional subset of its codes) a ValueSet resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueSetBinding {
    pub enum_name: String,
    pub restricted_to: Vec<String>,
}

#[derive(Debug, Default)]
pub struct EnumRegistry {
    enums: Vec<EnumModel>,
    by_system: HashMap<String, usize>,
    bindings: BTreeMap<String, ValueSetBinding>,
}

impl EnumRegistry {
    pub fn enums(&self) -> &[EnumModel] {
        &self.enums
    }

    pub fn into_enums(self) -> Vec<EnumModel> {
        self.enums
    }

    pub fn by_system(&self, system: &str) -> Option<&EnumModel> {
        self.by_system.get(system).map(|&i| &self.enums[i])
    }

    pub fn by_name(&self, name: &str) -> Option<&EnumModel> {
        self.enums.iter().find(|e| e.name == name)
    }

    /// Binding for a ValueSet canonical; a `|version` suffix is ignored.
    pub fn binding(&self, value_set_url: &str) -> Option<&ValueSetBinding> {
        let url = value_set_url.split('|').next().unwrap_or(value_set_url);
        self.bindings.get(url)
    }

    pub fn len(&self) -> usize {
        self.enums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enums.is_empty()
    }
}

pub struct CodeSystemResolver<'a> {
    config: &'a GeneratorConfig,
    naming: Naming<'a>,
}

/// Makes `base` unique within `taken` by appending 2, 3, ...
fn disambiguate(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

fn flatten_concepts<'c>(concepts: &'c [Concept], out: &mut Vec<&'c Concept>) {
    for concept in concepts {
        out.push(concept);
        flatten_concepts(concept.children(), out);
    }
}

impl<'a> CodeSystemResolver<'a> {
    pub fn new(config: &'a GeneratorConfig) -> Self {
        Self {
            config,
            naming: Naming::new(config),
        }
    }

    /// Name for a CodeSystem: the `enum_namemap` entry, else its URI's last segment
    /// run through [`Naming::safe_enum_name`].
    pub fn enum_name_for(&self, system: &str) -> (String, bool) {
        if let Some(name) = self.config.mapping_rules.enum_namemap.get(system) {
            return (name.clone(), true);
        }
        let segment = system
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(system);
        (self.naming.safe_enum_name(segment, true), false)
    }

    /// Whether the CodeSystem produces an enum at all.
    fn is_eligible(&self, cs: &CodeSystem) -> Option<String> {
        let url = cs.url.as_deref()?;
        if self.config.mapping_rules.enum_ignore.contains(url) {
            debug!("Ignoring CodeSystem {} as configured", url);
            return None;
        }
        if !cs.is_complete() {
            debug!("Skipping CodeSystem {} with content {:?}", url, cs.content);
            return None;
        }
        Some(url.to_string())
    }

    fn enum_values(&self, cs: &CodeSystem) -> Vec<EnumValue> {
        let mut flat = Vec::new();
        flatten_concepts(cs.concepts(), &mut flat);

        let mut codes = HashSet::new();
        let mut names = HashSet::new();
        let mut values = Vec::new();
        for concept in flat {
            if !codes.insert(concept.code.as_str()) {
                continue;
            }
            let name = disambiguate(&self.naming.safe_enum_name(&concept.code, false), &names);
            names.insert(name.clone());
            let doc = concept
                .definition
                .clone()
                .filter(|d| !d.trim().is_empty())
                .or_else(|| concept.display.clone().filter(|d| !d.trim().is_empty()))
                .unwrap_or_else(|| concept.code.clone());
            values.push(EnumValue {
                code: concept.code.clone(),
                name,
                doc,
            });
        }
        values
    }

    /// Resolves every CodeSystem and ValueSet in the specification.
    ///
    /// Names already used by generated classes count as taken.
    pub fn resolve(&self, spec: &SpecDirectory, classes: &ClassRegistry) -> Result<EnumRegistry> {
        let mut taken: HashSet<String> = classes.classes().iter().map(|c| c.name.clone()).collect();
        taken.extend(
            self.config
                .manual_profiles
                .iter()
                .flat_map(|p| p.contains.iter().cloned()),
        );

        let mut systems: Vec<&Sourced<CodeSystem>> = spec.code_systems.iter().collect();
        systems.sort_by(|a, b| a.resource.url.cmp(&b.resource.url));

        let mut registry = EnumRegistry::default();
        let mut owners: HashMap<String, String> = HashMap::new();
        for source in systems {
            let cs = &source.resource;
            let Some(url) = self.is_eligible(cs) else {
                continue;
            };
            if registry.by_system.contains_key(&url) {
                debug!("Duplicate CodeSystem {} in {}", url, source.document);
                continue;
            }
            let values = self.enum_values(cs);
            if values.is_empty() {
                debug!("CodeSystem {} defines no codes, no enum generated", url);
                continue;
            }

            let (base, verbatim) = self.enum_name_for(&url);
            let name = if verbatim {
                if let Some(first) = owners.get(&base) {
                    return Err(GeneratorError::NamingConflict {
                        name: base,
                        first: first.clone(),
                        second: url,
                    });
                }
                if taken.contains(&base) {
                    return Err(GeneratorError::NamingConflict {
                        name: base,
                        first: "a generated class".to_string(),
                        second: url,
                    });
                }
                base
            } else {
                disambiguate(&base, &taken)
            };
            taken.insert(name.clone());
            owners.insert(name.clone(), url.clone());

            registry.by_system.insert(url.clone(), registry.enums.len());
            if let Some(vs) = cs.value_set.as_deref() {
                registry.bindings.insert(
                    vs.to_string(),
                    ValueSetBinding {
                        enum_name: name.clone(),
                        restricted_to: Vec::new(),
                    },
                );
            }
            registry.enums.push(EnumModel {
                name,
                system: url,
                definition: cs.description.clone(),
                values,
            });
        }

        for source in &spec.value_sets {
            self.add_value_set(&mut registry, &source.resource);
        }

        info!(
            "Resolved {} enums and {} ValueSet bindings",
            registry.enums.len(),
            registry.bindings.len()
        );
        Ok(registry)
    }

    /// A ValueSet binds to an enum when it includes exactly one whole (or explicitly
    /// enumerated part of one) CodeSystem that has an enum, without filters, nested
    /// ValueSets or excludes.
    fn add_value_set(&self, registry: &mut EnumRegistry, vs: &ValueSet) {
        let Some(url) = vs.url.as_deref() else {
            return;
        };
        if registry.bindings.contains_key(url) {
            return;
        }
        let Some(compose) = vs.compose.as_ref() else {
            return;
        };
        if compose.exclude.as_ref().is_some_and(|e| !e.is_empty()) {
            return;
        }
        let [include] = compose.include.as_deref().unwrap_or(&[]) else {
            return;
        };
        if include.filter.as_ref().is_some_and(|f| !f.is_empty())
            || include.value_set.as_ref().is_some_and(|v| !v.is_empty())
        {
            return;
        }
        let Some(enumeration) = include
            .system
            .as_deref()
            .and_then(|s| registry.by_system(s))
        else {
            return;
        };
        let restricted_to = include
            .concept
            .iter()
            .flatten()
            .map(|c| c.code.clone())
            .collect();
        let binding = ValueSetBinding {
            enum_name: enumeration.name.clone(),
            restricted_to,
        };
        registry.bindings.insert(url.to_string(), binding);
    }

    /// Types `code` properties with a required binding to a resolvable ValueSet.
    pub fn apply_bindings(&self, classes: &mut ClassRegistry, enums: &EnumRegistry) {
        let mut bound = 0usize;
        for class in classes.classes_mut() {
            for property in &mut class.properties {
                if property.fhir_type != "code" {
                    continue;
                }
                let Some(binding) = property.binding.as_ref() else {
                    continue;
                };
                if binding.strength != "required" {
                    continue;
                }
                let Some(resolved) = binding
                    .value_set
                    .as_deref()
                    .and_then(|vs| enums.binding(vs))
                else {
                    continue;
                };
                property.enum_name = Some(resolved.enum_name.clone());
                property.restricted_to = resolved.restricted_to.clone();
                bound += 1;
            }
        }
        debug!("Bound {} code properties to enums", bound);
    }
}
