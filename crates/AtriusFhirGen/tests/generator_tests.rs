mod common;

use atrius_fhir_generator::config::GeneratorConfig;
use atrius_fhir_generator::spec_dir::SpecDirectory;
use atrius_fhir_generator::{GeneratorError, Generator};
use atrius_fhir_model::{ClassKind, FhirVersion, GeneratedModel, MaxCardinality, ValidationRule};
use common::{Sd, spec_dir, spec_dir_with};

fn generate(dir: &std::path::Path) -> GeneratedModel {
    let generator = Generator::new(GeneratorConfig::embedded().unwrap());
    let spec = generator.load(dir).unwrap();
    generator.generate(&spec).unwrap().model
}

#[test]
fn test_spec_directory_loading() {
    let dir = spec_dir();
    let spec = SpecDirectory::load(dir.path()).unwrap();
    assert_eq!(spec.version.as_deref(), Some("4.0.1-9346c8cc45"));
    assert_eq!(spec.fhir_version, Some(FhirVersion::R4));
    // 9 primitives and 5 data types from the bundle, 9 resources on their own.
    assert_eq!(spec.structure_definitions.len(), 23);
    assert_eq!(spec.code_systems.len(), 3);
    assert_eq!(spec.value_sets.len(), 2);
    assert!(spec.diagnostics.is_empty());
}

#[test]
fn test_unreadable_documents_become_diagnostics() {
    let dir = spec_dir();
    std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
    let spec = SpecDirectory::load(dir.path()).unwrap();
    assert_eq!(spec.diagnostics.len(), 1);
    assert_eq!(spec.diagnostics[0].class, "broken");
    assert_eq!(spec.structure_definitions.len(), 23);
}

#[test]
fn test_classes_and_backbones() {
    let dir = spec_dir();
    let model = generate(dir.path());

    for primitive in ["boolean", "string", "dateTime", "code"] {
        assert!(model.class(primitive).is_none(), "{} is hand-written", primitive);
    }

    let patient = model.class("Patient").unwrap();
    assert_eq!(patient.kind, ClassKind::Resource);
    assert_eq!(patient.superclass.as_deref(), Some("DomainResource"));
    assert_eq!(patient.resource_type(), Some("Patient"));
    assert_eq!(patient.module, "patient");

    let contact = model.class("PatientContact").unwrap();
    assert_eq!(contact.kind, ClassKind::BackboneElement);
    assert_eq!(contact.fhir_name, "Patient.contact");
    assert_eq!(contact.superclass.as_deref(), Some("BackboneElement"));
    assert_eq!(patient.property("contact").unwrap().type_name, "PatientContact");

    let resource = model.class("Resource").unwrap();
    assert!(resource.is_abstract);
    assert_eq!(resource.superclass.as_deref(), Some("FHIRAbstractResource"));
    assert_eq!(
        model.class("Element").unwrap().superclass.as_deref(),
        Some("FHIRAbstractBase")
    );
}

#[test]
fn test_classmap_path_entry_renames_backbone() {
    let dir = spec_dir();
    let model = generate(dir.path());
    let role = model.class("PractRole").unwrap();
    assert_eq!(role.fhir_name, "Practitioner.role");
    assert_eq!(
        model.class("Practitioner").unwrap().property("role").unwrap().type_name,
        "PractRole"
    );
    assert_eq!(
        model.class("PractitionerRole").unwrap().kind,
        ClassKind::Resource
    );
}

#[test]
fn test_missing_classmap_entry_is_a_naming_conflict() {
    let dir = spec_dir();
    let mut config = GeneratorConfig::embedded().unwrap();
    config.mapping_rules.classmap.remove("Practitioner.role");
    let generator = Generator::new(config);
    let spec = generator.load(dir.path()).unwrap();
    match generator.generate(&spec) {
        Err(GeneratorError::NamingConflict { name, .. }) => assert_eq!(name, "PractitionerRole"),
        other => panic!("expected a naming conflict, got {:?}", other.map(|g| g.model.classes.len())),
    }
}

#[test]
fn test_choice_elements_expand_into_groups() {
    let dir = spec_dir();
    let model = generate(dir.path());

    let patient = model.class("Patient").unwrap();
    let deceased = patient.choice_group("deceased").unwrap();
    let members: Vec<_> = deceased.member_names().collect();
    assert_eq!(members, vec!["deceasedBoolean", "deceasedDateTime"]);
    assert!(!deceased.required);
    let member = patient.property("deceasedDateTime").unwrap();
    assert_eq!(member.choice_group.as_deref(), Some("deceased"));
    assert_eq!(member.fhir_type, "dateTime");
    assert!(member.is_primitive);
    assert!(patient.property("deceased[x]").is_none());

    let observation = model.class("Observation").unwrap();
    let effective = observation.choice_group("effective").unwrap();
    assert!(effective.required);
    let member = observation.property("effectiveInstant").unwrap();
    assert_eq!(member.cardinality.min, 0);
    assert!(!member.is_required());
    assert!(
        observation
            .rules
            .contains(&ValidationRule::ChoiceExclusivity {
                group: "effective".to_string(),
                required: true
            })
    );
    let value = observation.choice_group("value").unwrap();
    assert_eq!(value.alternatives.len(), 3);
    assert_eq!(
        value.alternative("valueQuantity").unwrap().type_name,
        "Quantity"
    );
}

#[test]
fn test_property_rules() {
    let dir = spec_dir();
    let model = generate(dir.path());
    let patient = model.class("Patient").unwrap();

    let active = patient.property("active").unwrap();
    assert_eq!(
        active.rules,
        vec![
            ValidationRule::SingletonNotList,
            ValidationRule::PrimitiveExtensionPairing
        ]
    );
    assert_eq!(active.companion_key().as_deref(), Some("_active"));

    let name = patient.property("name").unwrap();
    assert_eq!(name.cardinality.max, MaxCardinality::Unbounded);
    assert_eq!(name.rules, vec![ValidationRule::PrimitiveExtensionPairing]);

    let contact = patient.property("contact").unwrap();
    assert!(contact.rules.is_empty());

    let organization = patient.property("managingOrganization").unwrap();
    assert_eq!(organization.rules, vec![ValidationRule::SingletonNotList]);
    assert_eq!(organization.reference_targets, vec!["Organization"]);

    // FHIRPath system types carry no extensions.
    let element_id = model.class("Element").unwrap().property("id").unwrap();
    assert_eq!(element_id.fhir_type, "string");
    assert!(!element_id.is_primitive);
    assert_eq!(element_id.rules, vec![ValidationRule::SingletonNotList]);
}

#[test]
fn test_reference_rules_live_on_reference_class() {
    let dir = spec_dir();
    let model = generate(dir.path());
    let reference = model.class("Reference").unwrap();
    assert!(reference.rules.contains(&ValidationRule::ReferenceTypeConsistency));
    assert!(reference.rules.contains(&ValidationRule::ReferenceFormat));
    assert!(model.class("Quantity").unwrap().rules.is_empty());
    assert_eq!(model.reference_class.as_deref(), Some("Reference"));
}

#[test]
fn test_content_reference_reuses_backbone_class() {
    let dir = spec_dir();
    let model = generate(dir.path());
    let item = model.class("QuestionnaireItem").unwrap();
    let nested = item.property("item").unwrap();
    assert_eq!(nested.type_name, "QuestionnaireItem");
    assert!(nested.is_list());
    assert!(item.property("linkId").unwrap().is_required());
}

#[test]
fn test_render_order_puts_superclasses_first() {
    let dir = spec_dir();
    let model = generate(dir.path());
    assert_eq!(model.classes[0].name, "Element");
    assert_eq!(model.roots, vec!["FHIRAbstractBase", "FHIRAbstractResource"]);

    let position = |name: &str| model.classes.iter().position(|c| c.name == name).unwrap();
    for (i, class) in model.classes.iter().enumerate() {
        let superclass = class.superclass.as_deref().unwrap();
        if let Some(p) = model.classes.iter().position(|c| c.name == superclass) {
            assert!(p < i, "{} rendered before its superclass {}", class.name, superclass);
        } else {
            assert!(model.roots.iter().any(|r| r == superclass));
        }
    }
    assert!(position("Resource") < position("DomainResource"));
    assert!(position("DomainResource") < position("Patient"));
    assert!(position("BackboneElement") < position("PatientContact"));
}

#[test]
fn test_unresolvable_types_are_pruned_transitively() {
    let dir = spec_dir_with(&[
        Sd::complex("Broken", Some("Element")).element("Broken.mystery", 0, "1", &["Mystery"]),
        Sd::complex("UsesBroken", Some("Element")).element("UsesBroken.broken", 0, "1", &["Broken"]),
        Sd::complex("Derived", Some("Broken")),
    ]);
    let generator = Generator::new(GeneratorConfig::embedded().unwrap());
    let spec = generator.load(dir.path()).unwrap();
    let generation = generator.generate(&spec).unwrap();

    let mut pruned = generation.graph.pruned.clone();
    pruned.sort();
    assert_eq!(pruned, vec!["Broken", "Derived", "UsesBroken"]);
    for name in ["Broken", "Derived", "UsesBroken"] {
        assert!(generation.model.class(name).is_none());
    }
    let broken = generation
        .structural_errors
        .iter()
        .find(|e| e.class == "Broken")
        .unwrap();
    assert!(broken.message.contains("Mystery"));
    assert!(broken.document.as_deref().unwrap().ends_with("structuredefinition-broken.json"));
    assert!(generation.model.class("Patient").is_some());
}

#[test]
fn test_structurally_broken_profile_is_dropped() {
    let dir = spec_dir_with(&[
        Sd::complex("TwoTypes", Some("Element")).element("TwoTypes.value", 0, "1", &["string", "boolean"]),
        Sd::complex("NeedsTwoTypes", Some("TwoTypes")),
    ]);
    let generator = Generator::new(GeneratorConfig::embedded().unwrap());
    let spec = generator.load(dir.path()).unwrap();
    let generation = generator.generate(&spec).unwrap();
    assert!(generation.model.class("TwoTypes").is_none());
    assert!(generation.model.class("NeedsTwoTypes").is_none());
    assert!(
        generation
            .structural_errors
            .iter()
            .any(|e| e.class == "TwoTypes" && e.message.contains("not a choice element"))
    );
    assert_eq!(generation.graph.pruned, vec!["NeedsTwoTypes"]);
}

#[test]
fn test_unknown_superclass_aborts() {
    let dir = spec_dir_with(&[Sd::complex("Orphan", Some("Nowhere"))]);
    let generator = Generator::new(GeneratorConfig::embedded().unwrap());
    let spec = generator.load(dir.path()).unwrap();
    match generator.generate(&spec) {
        Err(GeneratorError::UnresolvedSuperclass { class, superclass }) => {
            assert_eq!(class, "Orphan");
            assert_eq!(superclass, "Nowhere");
        }
        other => panic!("expected unresolved superclass, got {:?}", other.is_ok()),
    }
}

#[test]
fn test_inheritance_cycle_aborts() {
    let dir = spec_dir_with(&[
        Sd::complex("Ping", Some("Pong")),
        Sd::complex("Pong", Some("Ping")),
    ]);
    let generator = Generator::new(GeneratorConfig::embedded().unwrap());
    let spec = generator.load(dir.path()).unwrap();
    match generator.generate(&spec) {
        Err(GeneratorError::InheritanceCycle { classes }) => {
            assert!(classes.contains(&"Ping".to_string()));
            assert!(classes.contains(&"Pong".to_string()));
            assert_eq!(classes.first(), classes.last());
        }
        other => panic!("expected a cycle, got {:?}", other.is_ok()),
    }
}

#[test]
fn test_generation_is_deterministic() {
    let dir = spec_dir();
    let first = generate(dir.path());
    let second = generate(dir.path());
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}
