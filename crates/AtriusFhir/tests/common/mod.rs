#![allow(dead_code)]

use atrius_fhir_lib::Schema;
use atrius_fhir_model::{
    Cardinality, ChoiceAlternative, ChoiceGroup, ClassKind, ClassModel, EnumModel, EnumValue,
    GeneratedModel, PropertyModel, ValidationRule,
};

fn cardinality(min: u32, max: &str) -> Cardinality {
    Cardinality::parse(Some(min), Some(max)).unwrap()
}

/// Native type name and JSON class for a primitive FHIR type.
fn native(fhir_type: &str) -> (&'static str, &'static str) {
    match fhir_type {
        "boolean" => ("bool", "bool"),
        "integer" | "positiveInt" | "unsignedInt" => ("int", "int"),
        "decimal" => ("decimal.Decimal", "float"),
        "date" => ("FHIRDate", "str"),
        "dateTime" => ("FHIRDateTime", "str"),
        "instant" => ("FHIRInstant", "str"),
        "id" => ("FHIRId", "str"),
        "code" => ("FHIRCode", "str"),
        _ => ("str", "str"),
    }
}

fn property(name: &str, fhir_type: &str, type_name: &str, json_class: &str, min: u32, max: &str) -> PropertyModel {
    let cardinality = cardinality(min, max);
    let mut rules = Vec::new();
    if !cardinality.is_list() {
        rules.push(ValidationRule::SingletonNotList);
    }
    PropertyModel {
        name: name.to_string(),
        fhir_type: fhir_type.to_string(),
        type_name: type_name.to_string(),
        json_class: json_class.to_string(),
        cardinality,
        choice_group: None,
        is_primitive: false,
        is_native: false,
        is_summary: false,
        is_modifier: false,
        reference_targets: vec![],
        enum_name: None,
        restricted_to: vec![],
        short: None,
        definition: None,
        rules,
    }
}

fn primitive_property(name: &str, fhir_type: &str, min: u32, max: &str) -> PropertyModel {
    let (type_name, json_class) = native(fhir_type);
    let mut prop = property(name, fhir_type, type_name, json_class, min, max);
    prop.is_primitive = true;
    prop.rules.push(ValidationRule::PrimitiveExtensionPairing);
    prop
}

pub struct ClassBuilder(ClassModel);

impl ClassBuilder {
    fn new(name: &str, fhir_name: &str, superclass: &str, kind: ClassKind) -> Self {
        ClassBuilder(ClassModel {
            name: name.to_string(),
            fhir_name: fhir_name.to_string(),
            superclass: Some(superclass.to_string()),
            kind,
            is_abstract: false,
            module: fhir_name.split('.').next().unwrap_or(name).to_lowercase(),
            profile_urls: vec![],
            short: None,
            definition: None,
            properties: vec![],
            choice_groups: vec![],
            rules: vec![],
        })
    }

    pub fn complex(name: &str, superclass: &str) -> Self {
        Self::new(name, name, superclass, ClassKind::ComplexType)
    }

    pub fn resource(name: &str, superclass: &str) -> Self {
        Self::new(name, name, superclass, ClassKind::Resource)
    }

    pub fn backbone(name: &str, fhir_name: &str) -> Self {
        Self::new(name, fhir_name, "BackboneElement", ClassKind::BackboneElement)
    }

    pub fn abstract_type(mut self) -> Self {
        self.0.is_abstract = true;
        self
    }

    /// A FHIR primitive: gets a `_name` companion.
    pub fn primitive(mut self, name: &str, fhir_type: &str, min: u32, max: &str) -> Self {
        self.0.properties.push(primitive_property(name, fhir_type, min, max));
        self
    }

    /// A FHIRPath system type (`Element.id`, `Extension.url`): no companion.
    pub fn system(mut self, name: &str, fhir_type: &str, min: u32, max: &str) -> Self {
        let (type_name, json_class) = native(fhir_type);
        self.0
            .properties
            .push(property(name, fhir_type, type_name, json_class, min, max));
        self
    }

    pub fn element(mut self, name: &str, type_name: &str, min: u32, max: &str) -> Self {
        self.0
            .properties
            .push(property(name, type_name, type_name, "dict", min, max));
        self
    }

    pub fn coded(mut self, name: &str, enumeration: &str, restricted: &[&str], min: u32) -> Self {
        let mut prop = primitive_property(name, "code", min, "1");
        prop.type_name = enumeration.to_string();
        prop.enum_name = Some(enumeration.to_string());
        prop.restricted_to = restricted.iter().map(|c| c.to_string()).collect();
        self.0.properties.push(prop);
        self
    }

    /// Expands `group[x]` over `(suffix, fhir_type)` alternatives.
    pub fn choice(mut self, group: &str, required: bool, types: &[(&str, &str)]) -> Self {
        let mut alternatives = Vec::new();
        for (suffix, fhir_type) in types {
            let name = format!("{}{}", group, suffix);
            let mut prop = if fhir_type.chars().next().is_some_and(char::is_lowercase) {
                primitive_property(&name, fhir_type, 0, "1")
            } else {
                property(&name, fhir_type, fhir_type, "dict", 0, "1")
            };
            prop.choice_group = Some(group.to_string());
            alternatives.push(ChoiceAlternative {
                property: name,
                type_name: prop.type_name.clone(),
            });
            self.0.properties.push(prop);
        }
        let group = ChoiceGroup::new(group, alternatives, required).unwrap();
        self.0.rules.push(group.rule());
        self.0.choice_groups.push(group);
        self
    }

    pub fn rule(mut self, rule: ValidationRule) -> Self {
        self.0.rules.push(rule);
        self
    }

    pub fn build(self) -> ClassModel {
        self.0
    }
}

fn enumeration(name: &str, system: &str, codes: &[(&str, &str)]) -> EnumModel {
    EnumModel {
        name: name.to_string(),
        system: system.to_string(),
        definition: None,
        values: codes
            .iter()
            .map(|(code, name)| EnumValue {
                code: code.to_string(),
                name: name.to_string(),
                doc: code.to_string(),
            })
            .collect(),
    }
}

/// A small R4-shaped model: the core data types, two abstract resources and a few
/// concrete ones.
pub fn model() -> GeneratedModel {
    let classes = vec![
        ClassBuilder::complex("Element", "FHIRAbstractBase")
            .system("id", "string", 0, "1")
            .element("extension", "Extension", 0, "*")
            .build(),
        ClassBuilder::complex("Extension", "Element")
            .system("url", "uri", 1, "1")
            .choice(
                "value",
                false,
                &[
                    ("String", "string"),
                    ("Boolean", "boolean"),
                    ("Integer", "integer"),
                    ("Quantity", "Quantity"),
                    ("HumanName", "HumanName"),
                ],
            )
            .build(),
        ClassBuilder::complex("BackboneElement", "Element")
            .abstract_type()
            .element("modifierExtension", "Extension", 0, "*")
            .build(),
        ClassBuilder::complex("HumanName", "Element")
            .primitive("family", "string", 0, "1")
            .primitive("given", "string", 0, "*")
            .build(),
        ClassBuilder::complex("Quantity", "Element")
            .primitive("value", "decimal", 0, "1")
            .primitive("unit", "string", 0, "1")
            .build(),
        ClassBuilder::complex("Reference", "Element")
            .primitive("reference", "string", 0, "1")
            .primitive("type", "uri", 0, "1")
            .primitive("display", "string", 0, "1")
            .rule(ValidationRule::ReferenceTypeConsistency)
            .rule(ValidationRule::ReferenceFormat)
            .build(),
        ClassBuilder::resource("Resource", "FHIRAbstractResource")
            .abstract_type()
            .primitive("id", "id", 0, "1")
            .build(),
        ClassBuilder::resource("DomainResource", "Resource")
            .abstract_type()
            .element("contained", "Resource", 0, "*")
            .element("extension", "Extension", 0, "*")
            .build(),
        ClassBuilder::resource("Patient", "DomainResource")
            .primitive("active", "boolean", 0, "1")
            .element("name", "HumanName", 0, "*")
            .primitive("birthDate", "date", 0, "1")
            .choice("deceased", false, &[("Boolean", "boolean"), ("DateTime", "dateTime")])
            .element("managingOrganization", "Reference", 0, "1")
            .element("contact", "PatientContact", 0, "*")
            .build(),
        ClassBuilder::backbone("PatientContact", "Patient.contact")
            .element("name", "HumanName", 0, "1")
            .primitive("relationship", "code", 0, "*")
            .build(),
        ClassBuilder::resource("Organization", "DomainResource")
            .primitive("name", "string", 0, "1")
            .build(),
        ClassBuilder::resource("Observation", "DomainResource")
            .coded("status", "ObservationStatus", &[], 1)
            .choice("effective", true, &[("DateTime", "dateTime"), ("Instant", "instant")])
            .choice("value", false, &[("Quantity", "Quantity"), ("String", "string")])
            .element("subject", "Reference", 0, "1")
            .build(),
        ClassBuilder::resource("Account", "DomainResource")
            .coded("status", "AccountStatus", &[], 1)
            .coded("mode", "AccountStatus", &["active", "on-hold"], 0)
            .build(),
    ];

    GeneratedModel {
        fhir_version: Some("4.0.1".to_string()),
        roots: vec!["FHIRAbstractBase".to_string(), "FHIRAbstractResource".to_string()],
        reference_class: Some("Reference".to_string()),
        classes,
        enums: vec![
            enumeration(
                "AccountStatus",
                "http://hl7.org/fhir/account-status",
                &[
                    ("active", "active"),
                    ("inactive", "inactive"),
                    ("entered-in-error", "enteredInError"),
                    ("on-hold", "onHold"),
                    ("unknown", "unknown"),
                ],
            ),
            enumeration(
                "ObservationStatus",
                "http://hl7.org/fhir/observation-status",
                &[
                    ("registered", "registered"),
                    ("preliminary", "preliminary"),
                    ("final", "final"),
                    ("amended", "amended"),
                ],
            ),
        ],
    }
}

pub fn schema() -> Schema {
    Schema::new(model()).unwrap()
}
