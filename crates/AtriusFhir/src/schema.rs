//! Runtime view of a generated model.
//!
//! A [`Schema`] resolves every class's superclass chain once, so validation can look up
//! any JSON key of any class without walking the hierarchy. Validators attached to a
//! class are stored with it and apply to all of its subclasses.

use crate::error::SchemaError;
use atrius_fhir_model::{ClassModel, EnumModel, GeneratedModel, PropertyModel, ValidationRule};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A check run against an object after its structural checks pass. The error string
/// becomes the failure message.
pub type ClassValidator = Arc<dyn Fn(&Map<String, Value>) -> Result<(), String> + Send + Sync>;

/// Position of a property: class arena index and property index within that class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PropRef {
    pub class: usize,
    pub index: usize,
}

/// What a JSON key of an object stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Key {
    Value(PropRef),
    /// The `_name` companion of a primitive property.
    Companion(PropRef),
}

#[derive(Debug)]
struct ResolvedClass {
    /// The class itself first, then its generated ancestors.
    chain: Vec<usize>,
    /// Every property visible on the class, ancestors first. Redefinitions replace
    /// the inherited property in place.
    properties: Vec<PropRef>,
    keys: HashMap<String, Key>,
}

pub(crate) struct NamedValidator {
    pub name: String,
    pub check: ClassValidator,
}

/// Generated model plus the lookup tables validation needs.
///
/// Build it once, attach validators through `&mut self`, then share it; all
/// validation goes through `&self`.
pub struct Schema {
    model: GeneratedModel,
    class_index: HashMap<String, usize>,
    enum_index: HashMap<String, usize>,
    resolved: Vec<ResolvedClass>,
    /// Concrete resource classes by `resourceType`.
    resource_index: HashMap<String, usize>,
    resource_names: HashSet<String>,
    element_class: Option<usize>,
    validators: Vec<Vec<NamedValidator>>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("fhir_version", &self.model.fhir_version)
            .field("classes", &self.model.classes.len())
            .field("enums", &self.model.enums.len())
            .field(
                "validators",
                &self.validators.iter().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}

impl Schema {
    pub fn new(model: GeneratedModel) -> Result<Self, SchemaError> {
        let mut class_index = HashMap::new();
        for (i, class) in model.classes.iter().enumerate() {
            if class_index.insert(class.name.clone(), i).is_some() {
                return Err(SchemaError::DuplicateClass(class.name.clone()));
            }
        }
        let enum_index: HashMap<String, usize> = model
            .enums
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
        for class in &model.classes {
            for property in &class.properties {
                if let Some(name) = &property.enum_name {
                    if !enum_index.contains_key(name) {
                        return Err(SchemaError::UnknownEnum {
                            class: class.name.clone(),
                            property: property.name.clone(),
                            enumeration: name.clone(),
                        });
                    }
                }
            }
            if let Some(group) = class.choice_groups.iter().find(|g| g.alternatives.len() < 2) {
                return Err(SchemaError::InvalidChoiceGroup {
                    class: class.name.clone(),
                    group: group.name.clone(),
                });
            }
        }

        let mut resolved = Vec::with_capacity(model.classes.len());
        for i in 0..model.classes.len() {
            let chain = resolve_chain(&model, &class_index, i)?;
            resolved.push(resolve_keys(&model, chain));
        }

        let resource_index: HashMap<String, usize> = model
            .classes
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_abstract)
            .filter_map(|(i, c)| c.resource_type().map(|rt| (rt.to_string(), i)))
            .collect();
        let resource_names = resource_index.keys().cloned().collect();
        let element_class = class_index.get("Element").copied();
        let validators = model.classes.iter().map(|_| Vec::new()).collect();

        debug!(
            classes = model.classes.len(),
            resources = resource_index.len(),
            enums = model.enums.len(),
            "schema built"
        );
        Ok(Self {
            model,
            class_index,
            enum_index,
            resolved,
            resource_index,
            resource_names,
            element_class,
            validators,
        })
    }

    /// Loads the JSON written by the generator's JSON renderer.
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        let model: GeneratedModel = serde_json::from_str(text)?;
        Self::new(model)
    }

    pub fn model(&self) -> &GeneratedModel {
        &self.model
    }

    pub fn class(&self, name: &str) -> Option<&ClassModel> {
        self.index_of(name).map(|i| self.class_at(i))
    }

    pub fn enumeration(&self, name: &str) -> Option<&EnumModel> {
        self.enum_index.get(name).map(|&i| &self.model.enums[i])
    }

    /// The concrete class instantiated for a `resourceType` value.
    pub fn class_for_resource_type(&self, resource_type: &str) -> Option<&ClassModel> {
        self.resource_index(resource_type).map(|i| self.class_at(i))
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.resource_names.iter().map(String::as_str)
    }

    /// Whether `class` is `ancestor` or derives from it.
    pub fn is_subclass_of(&self, class: &str, ancestor: &str) -> bool {
        match (self.index_of(class), self.index_of(ancestor)) {
            (Some(c), Some(a)) => self.derives_from(c, a),
            _ => false,
        }
    }

    /// Attaches a validator to `class` and every class derived from it.
    ///
    /// Validators run in registration order, ancestors' before the class's own.
    /// Registering a second validator with the same name on the same class replaces
    /// the first.
    pub fn attach_validator<F>(
        &mut self,
        class: &str,
        name: impl Into<String>,
        check: F,
    ) -> Result<(), SchemaError>
    where
        F: Fn(&Map<String, Value>) -> Result<(), String> + Send + Sync + 'static,
    {
        let index = self
            .index_of(class)
            .ok_or_else(|| SchemaError::UnknownClass(class.to_string()))?;
        let name = name.into();
        let check: ClassValidator = Arc::new(check);
        let validators = &mut self.validators[index];
        match validators.iter_mut().find(|v| v.name == name) {
            Some(existing) => existing.check = check,
            None => {
                debug!(class, validator = %name, "validator attached");
                validators.push(NamedValidator { name, check });
            }
        }
        Ok(())
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.class_index.get(name).copied()
    }

    pub(crate) fn class_at(&self, index: usize) -> &ClassModel {
        &self.model.classes[index]
    }

    pub(crate) fn resource_index(&self, resource_type: &str) -> Option<usize> {
        self.resource_index.get(resource_type).copied()
    }

    pub(crate) fn resource_names(&self) -> &HashSet<String> {
        &self.resource_names
    }

    pub(crate) fn element_class(&self) -> Option<usize> {
        self.element_class
    }

    pub(crate) fn property(&self, at: PropRef) -> &PropertyModel {
        &self.model.classes[at.class].properties[at.index]
    }

    pub(crate) fn properties(&self, class: usize) -> &[PropRef] {
        &self.resolved[class].properties
    }

    pub(crate) fn key(&self, class: usize, key: &str) -> Option<Key> {
        self.resolved[class].keys.get(key).copied()
    }

    pub(crate) fn chain(&self, class: usize) -> impl Iterator<Item = &ClassModel> {
        self.resolved[class].chain.iter().map(|&i| self.class_at(i))
    }

    pub(crate) fn derives_from(&self, class: usize, ancestor: usize) -> bool {
        self.resolved[class].chain.contains(&ancestor)
    }

    /// Whether the class or one of its ancestors carries `rule`.
    pub(crate) fn has_class_rule(&self, class: usize, rule: &ValidationRule) -> bool {
        self.chain(class).any(|c| c.rules.contains(rule))
    }

    /// Validators for a class, ancestors' first.
    pub(crate) fn validators(&self, class: usize) -> impl Iterator<Item = &NamedValidator> {
        self.resolved[class]
            .chain
            .iter()
            .rev()
            .flat_map(|&i| self.validators[i].iter())
    }
}

fn resolve_chain(
    model: &GeneratedModel,
    class_index: &HashMap<String, usize>,
    start: usize,
) -> Result<Vec<usize>, SchemaError> {
    let mut chain = vec![start];
    let mut current = start;
    while let Some(&parent) = model.classes[current]
        .superclass
        .as_deref()
        .and_then(|s| class_index.get(s))
    {
        if chain.contains(&parent) {
            let mut names: Vec<String> = chain
                .iter()
                .map(|&i| model.classes[i].name.clone())
                .collect();
            names.push(model.classes[parent].name.clone());
            return Err(SchemaError::InheritanceCycle(names));
        }
        chain.push(parent);
        current = parent;
    }
    Ok(chain)
}

fn resolve_keys(model: &GeneratedModel, chain: Vec<usize>) -> ResolvedClass {
    let mut properties: Vec<PropRef> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for &class in chain.iter().rev() {
        for (index, property) in model.classes[class].properties.iter().enumerate() {
            let at = PropRef { class, index };
            match positions.get(property.name.as_str()) {
                Some(&pos) => properties[pos] = at,
                None => {
                    positions.insert(property.name.as_str(), properties.len());
                    properties.push(at);
                }
            }
        }
    }

    let mut keys = HashMap::new();
    for &at in &properties {
        let property = &model.classes[at.class].properties[at.index];
        keys.insert(property.name.clone(), Key::Value(at));
        if let Some(companion) = property.companion_key() {
            keys.insert(companion, Key::Companion(at));
        }
    }
    ResolvedClass {
        chain,
        properties,
        keys,
    }
}
