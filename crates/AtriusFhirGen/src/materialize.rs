use crate::class_model::{ClassDefinition, ClassRegistry, PropertyDefinition};
use crate::config::GeneratorConfig;
use atrius_fhir_model::{ClassModel, EnumModel, GeneratedModel, PropertyModel};

fn property_model(property: &PropertyDefinition) -> PropertyModel {
    PropertyModel {
        name: property.name.clone(),
        fhir_type: property.fhir_type.clone(),
        type_name: property.type_name.clone(),
        json_class: property.json_class.clone(),
        cardinality: property.cardinality,
        choice_group: property.choice_group.clone(),
        is_primitive: property.is_primitive,
        is_native: property.is_native,
        is_summary: property.is_summary,
        is_modifier: property.is_modifier,
        reference_targets: property.reference_targets.clone(),
        enum_name: property.enum_name.clone(),
        restricted_to: property.restricted_to.clone(),
        short: property.short.clone(),
        definition: property.definition.clone(),
        rules: property.rules.clone(),
    }
}

fn class_model(class: &ClassDefinition) -> ClassModel {
    ClassModel {
        name: class.name.clone(),
        fhir_name: class.fhir_name.clone(),
        superclass: class.superclass.clone(),
        kind: class.kind,
        is_abstract: class.is_abstract,
        module: class.module.clone(),
        profile_urls: class.profile_urls.clone(),
        short: class.short.clone(),
        definition: class.definition.clone(),
        properties: class.properties.iter().map(property_model).collect(),
        choice_groups: class.choice_groups.clone(),
        rules: class.rules.clone(),
    }
}

/// Freezes a resolved registry into the model handed to renderers and the runtime.
///
/// Classes keep the registry's render order; enums are sorted by name.
pub fn materialize(
    registry: &ClassRegistry,
    mut enums: Vec<EnumModel>,
    fhir_version: Option<String>,
    config: &GeneratorConfig,
) -> GeneratedModel {
    enums.sort_by(|a, b| a.name.cmp(&b.name));
    GeneratedModel {
        fhir_version,
        roots: config.roots(),
        reference_class: Some(config.reference_class.clone()),
        classes: registry.classes().iter().map(class_model).collect(),
        enums,
    }
}
