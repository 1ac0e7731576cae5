#![allow(dead_code)]

use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const SD_BASE: &str = "http://hl7.org/fhir/StructureDefinition/";
pub const SYSTEM_STRING: &str = "http://hl7.org/fhirpath/System.String";

// Builder for StructureDefinition JSON documents
pub struct Sd {
    name: String,
    kind: String,
    base: Option<String>,
    is_abstract: bool,
    elements: Vec<Value>,
}

impl Sd {
    pub fn new(name: &str, kind: &str, base: Option<&str>) -> Self {
        Sd {
            name: name.to_string(),
            kind: kind.to_string(),
            base: base.map(str::to_string),
            is_abstract: false,
            elements: vec![json!({
                "id": name,
                "path": name,
                "short": format!("{} root", name),
                "definition": format!("Definition of {}.", name),
                "min": 0,
                "max": "*"
            })],
        }
    }

    pub fn complex(name: &str, base: Option<&str>) -> Self {
        Sd::new(name, "complex-type", base)
    }

    pub fn resource(name: &str, base: Option<&str>) -> Self {
        Sd::new(name, "resource", base)
    }

    pub fn primitive(name: &str) -> Self {
        Sd::new(name, "primitive-type", Some("Element"))
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn element(mut self, path: &str, min: u32, max: &str, types: &[&str]) -> Self {
        let types: Vec<Value> = types.iter().map(|t| json!({"code": t})).collect();
        self.elements.push(json!({
            "id": path,
            "path": path,
            "short": format!("{} element", path),
            "min": min,
            "max": max,
            "type": types
        }));
        self
    }

    pub fn reference(mut self, path: &str, min: u32, max: &str, targets: &[&str]) -> Self {
        let targets: Vec<String> = targets.iter().map(|t| format!("{}{}", SD_BASE, t)).collect();
        self.elements.push(json!({
            "id": path,
            "path": path,
            "min": min,
            "max": max,
            "type": [{"code": "Reference", "targetProfile": targets}]
        }));
        self
    }

    pub fn bound_code(mut self, path: &str, min: u32, max: &str, value_set: &str) -> Self {
        self.elements.push(json!({
            "id": path,
            "path": path,
            "min": min,
            "max": max,
            "type": [{"code": "code"}],
            "binding": {"strength": "required", "valueSet": value_set}
        }));
        self
    }

    pub fn content_reference(mut self, path: &str, min: u32, max: &str, target: &str) -> Self {
        self.elements.push(json!({
            "id": path,
            "path": path,
            "min": min,
            "max": max,
            "contentReference": format!("#{}", target)
        }));
        self
    }

    pub fn to_json(&self) -> Value {
        let mut sd = json!({
            "resourceType": "StructureDefinition",
            "id": self.name,
            "url": format!("{}{}", SD_BASE, self.name),
            "name": self.name,
            "status": "active",
            "kind": self.kind,
            "abstract": self.is_abstract,
            "type": self.name,
            "snapshot": {"element": self.elements}
        });
        if let Some(base) = &self.base {
            sd["baseDefinition"] = json!(format!("{}{}", SD_BASE, base));
            sd["derivation"] = json!("specialization");
        }
        sd
    }
}

pub fn code_system(url: &str, content: &str, codes: &[(&str, &str)], value_set: Option<&str>) -> Value {
    let concepts: Vec<Value> = codes
        .iter()
        .map(|(code, display)| json!({"code": code, "display": display}))
        .collect();
    let mut cs = json!({
        "resourceType": "CodeSystem",
        "url": url,
        "status": "active",
        "content": content,
        "concept": concepts
    });
    if let Some(vs) = value_set {
        cs["valueSet"] = json!(vs);
    }
    cs
}

pub fn value_set(url: &str, system: &str, codes: &[&str]) -> Value {
    let mut include = json!({"system": system});
    if !codes.is_empty() {
        let concepts: Vec<Value> = codes.iter().map(|c| json!({"code": c})).collect();
        include["concept"] = json!(concepts);
    }
    json!({
        "resourceType": "ValueSet",
        "url": url,
        "status": "active",
        "compose": {"include": [include]}
    })
}

pub fn bundle(resources: &[Value]) -> Value {
    let entries: Vec<Value> = resources
        .iter()
        .map(|r| json!({"fullUrl": r["url"], "resource": r}))
        .collect();
    json!({"resourceType": "Bundle", "id": "types", "type": "collection", "entry": entries})
}

pub fn write_json(dir: &Path, name: &str, value: &Value) {
    fs::write(dir.join(name), serde_json::to_string_pretty(value).unwrap()).unwrap();
}

/// The data types every fixture needs.
pub fn base_types() -> Vec<Sd> {
    let mut types: Vec<Sd> = [
        "boolean", "string", "code", "uri", "id", "decimal", "integer", "dateTime", "instant",
    ]
    .iter()
    .map(|p| Sd::primitive(p))
    .collect();
    types.extend([
        Sd::complex("Element", None)
            .element("Element.id", 0, "1", &[SYSTEM_STRING])
            .element("Element.extension", 0, "*", &["Extension"]),
        Sd::complex("Extension", Some("Element"))
            .element("Extension.url", 1, "1", &[SYSTEM_STRING])
            .element("Extension.value[x]", 0, "1", &["string", "boolean", "Quantity"]),
        Sd::complex("BackboneElement", Some("Element"))
            .abstract_type()
            .element("BackboneElement.modifierExtension", 0, "*", &["Extension"]),
        Sd::complex("Quantity", Some("Element"))
            .element("Quantity.value", 0, "1", &["decimal"])
            .element("Quantity.unit", 0, "1", &["string"])
            .element("Quantity.code", 0, "1", &["code"]),
        Sd::complex("Reference", Some("Element"))
            .element("Reference.reference", 0, "1", &["string"])
            .element("Reference.type", 0, "1", &["uri"])
            .element("Reference.display", 0, "1", &["string"]),
    ]);
    types
}

pub fn resources() -> Vec<Sd> {
    vec![
        Sd::resource("Resource", None)
            .abstract_type()
            .element("Resource.id", 0, "1", &["id"]),
        Sd::resource("DomainResource", Some("Resource"))
            .abstract_type()
            .element("DomainResource.contained", 0, "*", &["Resource"])
            .element("DomainResource.extension", 0, "*", &["Extension"]),
        Sd::resource("Patient", Some("DomainResource"))
            .element("Patient.active", 0, "1", &["boolean"])
            .element("Patient.name", 0, "*", &["string"])
            .element("Patient.deceased[x]", 0, "1", &["boolean", "dateTime"])
            .element("Patient.contact", 0, "*", &["BackboneElement"])
            .element("Patient.contact.name", 0, "1", &["string"])
            .element("Patient.contact.relationship", 0, "*", &["code"])
            .reference("Patient.managingOrganization", 0, "1", &["Organization"])
            .element("Patient.link", 0, "*", &["BackboneElement"])
            .reference("Patient.link.other", 1, "1", &["Patient"])
            .element("Patient.link.type", 1, "1", &["code"]),
        Sd::resource("Organization", Some("DomainResource"))
            .element("Organization.name", 0, "1", &["string"]),
        Sd::resource("Observation", Some("DomainResource"))
            .bound_code(
                "Observation.status",
                1,
                "1",
                "http://hl7.org/fhir/ValueSet/observation-status|4.0.1",
            )
            .element("Observation.effective[x]", 1, "1", &["dateTime", "instant"])
            .element("Observation.value[x]", 0, "1", &["Quantity", "string", "boolean"])
            .reference("Observation.subject", 0, "1", &["Patient"]),
        Sd::resource("Account", Some("DomainResource"))
            .bound_code(
                "Account.status",
                1,
                "1",
                "http://hl7.org/fhir/ValueSet/account-status",
            )
            .bound_code("Account.mode", 0, "1", "http://example.org/ValueSet/active-only"),
        Sd::resource("Practitioner", Some("DomainResource"))
            .element("Practitioner.role", 0, "*", &["BackboneElement"])
            .element("Practitioner.role.code", 0, "1", &["code"]),
        Sd::resource("PractitionerRole", Some("DomainResource"))
            .element("PractitionerRole.active", 0, "1", &["boolean"]),
        Sd::resource("Questionnaire", Some("DomainResource"))
            .element("Questionnaire.item", 0, "*", &["BackboneElement"])
            .element("Questionnaire.item.linkId", 1, "1", &["string"])
            .content_reference("Questionnaire.item.item", 0, "*", "Questionnaire.item"),
    ]
}

pub fn terminology() -> Vec<Value> {
    vec![
        code_system(
            "http://hl7.org/fhir/account-status",
            "complete",
            &[
                ("active", "Active"),
                ("inactive", "Inactive"),
                ("entered-in-error", "Entered in error"),
                ("on-hold", "On Hold"),
                ("unknown", "Unknown"),
            ],
            Some("http://hl7.org/fhir/ValueSet/account-status"),
        ),
        code_system(
            "http://hl7.org/fhir/observation-status",
            "complete",
            &[
                ("registered", "Registered"),
                ("preliminary", "Preliminary"),
                ("final", "Final"),
                ("amended", "Amended"),
            ],
            None,
        ),
        code_system(
            "http://loinc.org",
            "fragment",
            &[("1234-5", "Something")],
            None,
        ),
        value_set(
            "http://hl7.org/fhir/ValueSet/observation-status",
            "http://hl7.org/fhir/observation-status",
            &[],
        ),
        value_set(
            "http://example.org/ValueSet/active-only",
            "http://hl7.org/fhir/account-status",
            &["active", "on-hold"],
        ),
    ]
}

/// Writes a specification directory the way the downloaded definitions are laid out:
/// data types in one Bundle, resources and terminology as separate files.
pub fn write_spec_dir(dir: &Path, extra: &[Sd]) {
    fs::write(
        dir.join("version.info"),
        "[FHIR]\nFhirVersion=4.0.1-9346c8cc45\nversion=4.0.1\n",
    )
    .unwrap();

    let types: Vec<Value> = base_types().iter().map(Sd::to_json).collect();
    write_json(dir, "profiles-types.json", &bundle(&types));

    let resource_dir = dir.join("resources");
    fs::create_dir_all(&resource_dir).unwrap();
    for sd in resources().iter().chain(extra) {
        let json = sd.to_json();
        let name = format!(
            "structuredefinition-{}.json",
            json["name"].as_str().unwrap().to_lowercase()
        );
        write_json(&resource_dir, &name, &json);
    }

    let terminology = terminology();
    write_json(dir, "valuesets.json", &bundle(&terminology));
    // Never read: concept maps are skipped by name.
    fs::write(dir.join("conceptmaps.json"), "not json").unwrap();
}

pub fn spec_dir() -> TempDir {
    spec_dir_with(&[])
}

pub fn spec_dir_with(extra: &[Sd]) -> TempDir {
    let dir = TempDir::new().unwrap();
    write_spec_dir(dir.path(), extra);
    dir
}
