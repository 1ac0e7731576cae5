//! Class Model Builder.
//!
//! Turns StructureDefinitions into a registry of class definitions. Each generatable
//! StructureDefinition yields one class plus one class per backbone element; choice
//! elements (`value[x]`) are expanded into one concrete property per permitted type
//! and grouped into a [`ChoiceGroup`].
//!
//! The registry is an arena: classes live in a `Vec` and are looked up by name through
//! an index. Nothing is removed while building; pruning of unresolvable classes
//! happens afterwards in [`crate::class_graph`].

use crate::config::GeneratorConfig;
use crate::element_definition::{
    ElementDefinition, ElementDefinitionBinding, ElementDefinitionType,
    extract_content_reference_id,
};
use crate::error::{GeneratorError, Result, StructuralError};
use crate::naming::{Naming, capitalize_first_letter, is_system_type, normalize_type_code};
use crate::spec_dir::{Sourced, SpecDirectory};
use crate::structure_definition::StructureDefinition;
use atrius_fhir_model::{
    Cardinality, ChoiceAlternative, ChoiceGroup, ClassKind, ValidationRule,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};

/// One property of a class under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDefinition {
    /// Wire name, already expanded for choice elements.
    pub name: String,
    pub element_path: String,
    pub fhir_type: String,
    pub type_name: String,
    pub json_class: String,
    pub cardinality: Cardinality,
    pub choice_group: Option<String>,
    pub is_primitive: bool,
    pub is_native: bool,
    pub is_summary: bool,
    pub is_modifier: bool,
    pub reference_targets: Vec<String>,
    pub binding: Option<ElementDefinitionBinding>,
    pub enum_name: Option<String>,
    pub restricted_to: Vec<String>,
    pub short: Option<String>,
    pub definition: Option<String>,
    pub rules: Vec<ValidationRule>,
}

/// One class under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDefinition {
    pub name: String,
    /// Element path defining the class: `Patient` or `Patient.contact`.
    pub fhir_name: String,
    pub superclass: Option<String>,
    pub kind: ClassKind,
    pub is_abstract: bool,
    pub module: String,
    pub profile_urls: Vec<String>,
    /// File the defining StructureDefinition was read from.
    pub document: String,
    pub short: Option<String>,
    pub definition: Option<String>,
    pub properties: Vec<PropertyDefinition>,
    pub choice_groups: Vec<ChoiceGroup>,
    pub rules: Vec<ValidationRule>,
}

impl ClassDefinition {
    pub fn property(&self, name: &str) -> Option<&PropertyDefinition> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn is_resource(&self) -> bool {
        self.kind == ClassKind::Resource
    }
}

/// Arena of class definitions, indexed by class name.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: Vec<ClassDefinition>,
    index: HashMap<String, usize>,
    primitive_types: BTreeSet<String>,
    manual_classes: BTreeSet<String>,
    dropped: BTreeSet<String>,
    structural_errors: Vec<StructuralError>,
}

impl ClassRegistry {
    /// An empty registry aware of the configured hand-written classes.
    pub fn new(config: &GeneratorConfig) -> Self {
        let manual_classes: BTreeSet<String> = config
            .manual_profiles
            .iter()
            .flat_map(|p| p.contains.iter().cloned())
            .collect();
        // Hand-written FHIR primitives (`boolean`, `dateTime`, ...) start lowercase.
        let primitive_types = manual_classes
            .iter()
            .filter(|c| c.starts_with(|ch: char| ch.is_ascii_lowercase()))
            .cloned()
            .collect();
        Self {
            manual_classes,
            primitive_types,
            ..Default::default()
        }
    }

    /// Adds a class. A second class under an existing name is a naming conflict.
    pub fn insert(&mut self, class: ClassDefinition) -> Result<usize> {
        if self.manual_classes.contains(&class.name) {
            return Err(GeneratorError::NamingConflict {
                name: class.name.clone(),
                first: "a manual profile".to_string(),
                second: class.fhir_name.clone(),
            });
        }
        if let Some(&existing) = self.index.get(&class.name) {
            return Err(GeneratorError::NamingConflict {
                name: class.name.clone(),
                first: self.classes[existing].fhir_name.clone(),
                second: class.fhir_name.clone(),
            });
        }
        let idx = self.classes.len();
        self.index.insert(class.name.clone(), idx);
        self.classes.push(class);
        Ok(idx)
    }

    pub fn get(&self, name: &str) -> Option<&ClassDefinition> {
        self.index.get(name).map(|&i| &self.classes[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ClassDefinition> {
        self.index.get(name).map(|&i| &mut self.classes[i])
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn classes(&self) -> &[ClassDefinition] {
        &self.classes
    }

    pub fn classes_mut(&mut self) -> &mut [ClassDefinition] {
        &mut self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn by_fhir_name(&self, fhir_name: &str) -> Option<&ClassDefinition> {
        self.classes.iter().find(|c| c.fhir_name == fhir_name)
    }

    pub fn is_primitive_type(&self, code: &str) -> bool {
        self.primitive_types.contains(code)
    }

    pub fn add_primitive_type(&mut self, code: &str) {
        self.primitive_types.insert(code.to_string());
    }

    pub fn is_manual_class(&self, name: &str) -> bool {
        self.manual_classes.contains(name)
    }

    /// Remembers a class that was discarded because of structural errors.
    pub fn mark_dropped(&mut self, name: &str) {
        self.dropped.insert(name.to_string());
    }

    pub fn was_dropped(&self, name: &str) -> bool {
        self.dropped.contains(name)
    }

    /// Logs and keeps a structural error.
    pub fn record(&mut self, error: StructuralError) {
        warn!("Structural error: {}", error);
        self.structural_errors.push(error);
    }

    pub fn structural_errors(&self) -> &[StructuralError] {
        &self.structural_errors
    }

    /// Keeps the classes at the given indices, in their current order.
    pub fn retain_indices(&mut self, keep: &HashSet<usize>) {
        let classes = std::mem::take(&mut self.classes);
        self.index.clear();
        for (i, class) in classes.into_iter().enumerate() {
            if keep.contains(&i) {
                self.index.insert(class.name.clone(), self.classes.len());
                self.classes.push(class);
            }
        }
    }

    /// Reorders the arena. `order` must be a permutation of the current indices.
    pub fn reorder(&mut self, order: &[usize]) {
        let mut slots: Vec<Option<ClassDefinition>> =
            std::mem::take(&mut self.classes).into_iter().map(Some).collect();
        self.index.clear();
        for &i in order {
            if let Some(class) = slots.get_mut(i).and_then(Option::take) {
                self.index.insert(class.name.clone(), self.classes.len());
                self.classes.push(class);
            }
        }
    }
}

/// Determines if a StructureDefinition produces classes.
///
/// Only data types and resources take part, and only their base specializations:
/// constraint profiles and logical models are skipped. Abstract types are kept since
/// concrete types derive from them.
pub fn is_generatable(sd: &StructureDefinition) -> bool {
    matches!(
        sd.kind.as_str(),
        "complex-type" | "primitive-type" | "resource"
    ) && (sd.derivation.as_deref() == Some("specialization") || sd.base_definition.is_none())
}

/// Builds the class registry from a specification directory.
pub struct ClassModelBuilder<'a> {
    config: &'a GeneratorConfig,
    naming: Naming<'a>,
}

/// Classes produced from one StructureDefinition, before registration.
struct ProfileClasses {
    classes: Vec<ClassDefinition>,
    errors: Vec<Vec<StructuralError>>,
    by_path: HashMap<String, usize>,
    /// (class position, property name, referenced element path)
    pending_refs: Vec<(usize, String, String)>,
}

impl ProfileClasses {
    fn push_class(&mut self, class: ClassDefinition) -> usize {
        let pos = self.classes.len();
        self.by_path.insert(class.fhir_name.clone(), pos);
        self.classes.push(class);
        self.errors.push(Vec::new());
        pos
    }

    fn fail(&mut self, pos: usize, message: String) {
        let class = &self.classes[pos];
        let error =
            StructuralError::new(class.name.clone(), message).in_document(class.document.clone());
        self.errors[pos].push(error);
    }

    fn add_property(&mut self, pos: usize, property: PropertyDefinition) {
        if self.classes[pos].property(&property.name).is_some() {
            let message = format!("duplicate property '{}'", property.name);
            self.fail(pos, message);
            return;
        }
        self.classes[pos].properties.push(property);
    }
}

impl<'a> ClassModelBuilder<'a> {
    pub fn new(config: &'a GeneratorConfig) -> Self {
        Self {
            config,
            naming: Naming::new(config),
        }
    }

    pub fn build(&self, spec: &SpecDirectory) -> Result<ClassRegistry> {
        let mut registry = ClassRegistry::new(self.config);
        for error in &spec.diagnostics {
            registry.record(error.clone());
        }

        let mut seen_urls = HashSet::new();
        let candidates: Vec<&Sourced<StructureDefinition>> = spec
            .structure_definitions
            .iter()
            .filter(|s| is_generatable(&s.resource))
            .filter(|s| seen_urls.insert(s.resource.url.clone()))
            .collect();

        let kinds: HashMap<&str, &str> = candidates
            .iter()
            .map(|s| (s.resource.name.as_str(), s.resource.kind.as_str()))
            .collect();

        for source in &candidates {
            if source.resource.is_primitive_type() {
                registry.add_primitive_type(&source.resource.name);
            }
        }

        for source in candidates {
            let sd = &source.resource;
            if sd.is_primitive_type() || registry.is_manual_class(&sd.name) {
                debug!("{} is provided by a manual profile", sd.name);
                continue;
            }
            self.add_structure_definition(&mut registry, source, &kinds)?;
        }

        info!(
            "Built {} classes with {} structural errors",
            registry.len(),
            registry.structural_errors().len()
        );
        Ok(registry)
    }

    fn superclass_for(
        &self,
        sd: &StructureDefinition,
        kinds: &HashMap<&str, &str>,
    ) -> Option<String> {
        let fallback = self.config.default_base_for(&sd.kind).map(str::to_string);
        match sd.base_type_name() {
            None => fallback,
            // Resources deriving from a non-resource root (`Base` in R5) hang off the
            // abstract resource class instead.
            Some(base) if sd.is_resource() && kinds.get(base).is_some_and(|k| *k != "resource") => {
                fallback
            }
            Some(base) => Some(self.naming.as_class_name(base, None)),
        }
    }

    fn add_structure_definition(
        &self,
        registry: &mut ClassRegistry,
        source: &Sourced<StructureDefinition>,
        kinds: &HashMap<&str, &str>,
    ) -> Result<()> {
        let sd = &source.resource;
        let elements = sd.elements();
        let root_element = elements.first().filter(|e| e.depth() == 0);
        let root_path = root_element
            .map(|e| e.path.clone())
            .unwrap_or_else(|| sd.r#type.clone());

        let root = ClassDefinition {
            name: self.naming.as_class_name(&sd.name, None),
            fhir_name: root_path,
            superclass: self.superclass_for(sd, kinds),
            kind: if sd.is_resource() {
                ClassKind::Resource
            } else {
                ClassKind::ComplexType
            },
            is_abstract: sd.r#abstract,
            module: self.naming.as_module_name(&sd.name),
            profile_urls: vec![sd.url.clone()],
            document: source.document.clone(),
            short: root_element.and_then(|e| e.short.clone()),
            definition: root_element
                .and_then(|e| e.definition.clone())
                .or_else(|| sd.description.clone()),
            properties: Vec::new(),
            choice_groups: Vec::new(),
            rules: Vec::new(),
        };
        debug!("Parsing {} as class {}", sd.url, root.name);

        let mut profile = ProfileClasses {
            classes: Vec::new(),
            errors: Vec::new(),
            by_path: HashMap::new(),
            pending_refs: Vec::new(),
        };
        profile.push_class(root);

        for element in elements {
            if element.depth() == 0 || element.slice_name.is_some() {
                continue;
            }
            self.add_element(registry, &mut profile, element);
        }

        let pending = std::mem::take(&mut profile.pending_refs);
        for (pos, property, target) in pending {
            let resolved = match profile.by_path.get(&target) {
                Some(&t) => Some(profile.classes[t].name.clone()),
                None => registry.by_fhir_name(&target).map(|c| c.name.clone()),
            };
            match resolved {
                Some(type_name) => {
                    if let Some(p) = profile.classes[pos]
                        .properties
                        .iter_mut()
                        .find(|p| p.name == property)
                    {
                        p.type_name = type_name;
                    }
                }
                None => profile.fail(
                    pos,
                    format!(
                        "content reference of '{}' points to unknown element '{}'",
                        property, target
                    ),
                ),
            }
        }

        for (class, errors) in profile.classes.into_iter().zip(profile.errors) {
            if errors.is_empty() {
                registry.insert(class)?;
            } else {
                registry.mark_dropped(&class.name);
                for error in errors {
                    registry.record(error);
                }
            }
        }
        Ok(())
    }

    fn add_element(
        &self,
        registry: &ClassRegistry,
        profile: &mut ProfileClasses,
        element: &ElementDefinition,
    ) {
        let Some(&owner) = element.parent_path().and_then(|p| profile.by_path.get(p)) else {
            profile.fail(0, format!("element '{}' has no owning class", element.path));
            return;
        };
        let Some(cardinality) = Cardinality::parse(element.min, element.max.as_deref()) else {
            profile.fail(
                owner,
                format!(
                    "element '{}' has invalid cardinality {:?}..{:?}",
                    element.path, element.min, element.max
                ),
            );
            return;
        };
        if cardinality.is_prohibited() {
            debug!("Skipping prohibited element {}", element.path);
            return;
        }

        if element.is_backbone() {
            let base_code = element
                .types()
                .iter()
                .map(|t| t.code.as_str())
                .find(|c| *c == "BackboneElement" || *c == "Element")
                .unwrap_or("BackboneElement");
            let parent_class = profile.classes[owner].name.clone();
            let class_name = self.naming.backbone_class_name(&element.path, &parent_class);
            let backbone = ClassDefinition {
                name: class_name.clone(),
                fhir_name: element.path.clone(),
                superclass: Some(self.naming.class_name_for_type(base_code)),
                kind: ClassKind::BackboneElement,
                is_abstract: false,
                module: profile.classes[0].module.clone(),
                profile_urls: Vec::new(),
                document: profile.classes[0].document.clone(),
                short: element.short.clone(),
                definition: element.definition.clone(),
                properties: Vec::new(),
                choice_groups: Vec::new(),
                rules: Vec::new(),
            };
            profile.push_class(backbone);
            let mut property = self.property(
                registry,
                element,
                element.element_name().to_string(),
                &ElementDefinitionType::new(base_code),
                cardinality,
            );
            property.type_name = class_name;
            property.json_class = self.config.mapping_rules.jsonmap_default.clone();
            profile.add_property(owner, property);
            return;
        }

        if let Some(reference) = element.content_reference.as_deref() {
            let Some(target) = extract_content_reference_id(reference) else {
                profile.fail(
                    owner,
                    format!("malformed content reference '{}' on '{}'", reference, element.path),
                );
                return;
            };
            let name = element.element_name().to_string();
            let property = self.property(
                registry,
                element,
                name.clone(),
                &ElementDefinitionType::new("BackboneElement"),
                cardinality,
            );
            profile.add_property(owner, property);
            profile
                .pending_refs
                .push((owner, name, target.to_string()));
            return;
        }

        let types = element.types();
        if types.is_empty() {
            profile.fail(owner, format!("element '{}' declares no type", element.path));
            return;
        }

        if element.is_choice() {
            let base = element.element_name().trim_end_matches("[x]");
            let member_cardinality = Cardinality {
                min: 0,
                max: cardinality.max,
            };
            let mut members: Vec<PropertyDefinition> = types
                .iter()
                .map(|t| {
                    let name = format!(
                        "{}{}",
                        base,
                        capitalize_first_letter(normalize_type_code(&t.code))
                    );
                    self.property(registry, element, name, t, member_cardinality)
                })
                .collect();
            let alternatives = members
                .iter()
                .map(|p| ChoiceAlternative {
                    property: p.name.clone(),
                    type_name: p.type_name.clone(),
                })
                .collect();
            match ChoiceGroup::new(base, alternatives, cardinality.is_required()) {
                Some(group) => {
                    for member in &mut members {
                        member.choice_group = Some(group.name.clone());
                    }
                    profile.classes[owner].choice_groups.push(group);
                }
                None => {
                    for member in &mut members {
                        member.cardinality = cardinality;
                    }
                }
            }
            for member in members {
                profile.add_property(owner, member);
            }
            return;
        }

        if types.len() > 1 {
            profile.fail(
                owner,
                format!(
                    "element '{}' declares {} types but is not a choice element",
                    element.path,
                    types.len()
                ),
            );
            return;
        }
        let property = self.property(
            registry,
            element,
            element.element_name().to_string(),
            &types[0],
            cardinality,
        );
        profile.add_property(owner, property);
    }

    fn property(
        &self,
        registry: &ClassRegistry,
        element: &ElementDefinition,
        name: String,
        ty: &ElementDefinitionType,
        cardinality: Cardinality,
    ) -> PropertyDefinition {
        let code = normalize_type_code(&ty.code);
        let type_name = self.naming.class_name_for_type(&ty.code);
        let reference_targets = if type_name == self.config.reference_class {
            ty.target_profile
                .iter()
                .flatten()
                .filter_map(|url| self.naming.class_name_for_profile(Some(url)))
                .collect()
        } else {
            Vec::new()
        };
        PropertyDefinition {
            name,
            element_path: element.path.clone(),
            fhir_type: code.to_string(),
            json_class: self.config.json_class(&type_name).to_string(),
            is_native: self.config.is_native(&type_name),
            type_name,
            cardinality,
            choice_group: None,
            // `id` and `url` attributes typed with FHIRPath system types carry no
            // extensions.
            is_primitive: registry.is_primitive_type(code) && !is_system_type(&ty.code),
            is_summary: element.is_summary.unwrap_or(false),
            is_modifier: element.is_modifier.unwrap_or(false),
            reference_targets,
            binding: element.binding.clone(),
            enum_name: None,
            restricted_to: Vec::new(),
            short: element.short.clone(),
            definition: element.definition.clone(),
            rules: Vec::new(),
        }
    }
}
