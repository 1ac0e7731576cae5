mod common;

use atrius_fhir_generator::config::GeneratorConfig;
use atrius_fhir_generator::render::{JsonRenderer, PydanticRenderer, Renderer};
use atrius_fhir_generator::{Generator, OutputFormat, generate_to_dir};
use atrius_fhir_lib::{FailureKind, Schema};
use atrius_fhir_model::GeneratedModel;
use common::spec_dir;
use tempfile::TempDir;

fn generate(dir: &std::path::Path) -> GeneratedModel {
    let generator = Generator::new(GeneratorConfig::embedded().unwrap());
    let spec = generator.load(dir).unwrap();
    generator.generate(&spec).unwrap().model
}

#[test]
fn test_json_output_reads_back() {
    let dir = spec_dir();
    let model = generate(dir.path());
    let text = JsonRenderer::default().render_to_string(&model).unwrap();
    let back: GeneratedModel = serde_json::from_str(&text).unwrap();
    assert_eq!(back, model);
    assert!(text.contains("\"fhir_version\": \"4.0.1-9346c8cc45\""));
}

#[test]
fn test_json_model_drives_runtime_validation() {
    let dir = spec_dir();
    let model = generate(dir.path());
    let text = JsonRenderer::default().render_to_string(&model).unwrap();
    let schema = Schema::from_json(&text).unwrap();

    let patient = schema
        .parse_resource_str(
            r#"{"resourceType":"Patient","active":true,"name":["Peter",null],"_name":[null,{"id":"n2"}],"deceasedBoolean":false,"contact":[{"name":"Jane","relationship":["friend"]}],"managingOrganization":{"reference":"Organization/1"}}"#,
        )
        .unwrap();
    assert_eq!(patient.choice("deceased").unwrap().property, "deceasedBoolean");

    let cases = [
        (
            r#"{"resourceType":"Patient","active":[true]}"#,
            "Patient.active",
            FailureKind::SingletonNotList,
        ),
        (
            r#"{"resourceType":"Patient","deceasedBoolean":true,"deceasedDateTime":"2020-01-01"}"#,
            "Patient.deceased",
            FailureKind::ChoiceExclusivity,
        ),
        (
            r#"{"resourceType":"Patient","name":["A"],"_name":[{"id":"1"},{"id":"2"}]}"#,
            "Patient.name",
            FailureKind::PrimitiveExtensionPairing,
        ),
        (
            r#"{"resourceType":"Patient","managingOrganization":{"reference":"Organization/1","type":"Patient"}}"#,
            "Patient.managingOrganization.type",
            FailureKind::ReferenceTypeConsistency,
        ),
        (
            r#"{"resourceType":"Observation","status":"final"}"#,
            "Observation.effective",
            FailureKind::ChoiceExclusivity,
        ),
        (
            r#"{"resourceType":"Account","status":"active","mode":"inactive"}"#,
            "Account.mode",
            FailureKind::UnknownCode,
        ),
    ];
    for (text, path, kind) in cases {
        let err = schema.parse_resource_str(text).unwrap_err();
        let failure = err.validation_errors().unwrap().at(path).cloned();
        assert_eq!(failure.map(|f| f.kind), Some(kind), "{}", text);
    }
}

#[test]
fn test_pydantic_module_layout() {
    let dir = spec_dir();
    let model = generate(dir.path());
    let config = GeneratorConfig::embedded().unwrap();
    let text = PydanticRenderer::new(config).render_to_string(&model).unwrap();

    let header_end = text.find("class FHIRAbstractResource(FHIRAbstractBase):").unwrap();
    let first_enum = text.find("class AccountStatus(str, DocEnum):").unwrap();
    let element = text.find("class Element(FHIRAbstractBase):").unwrap();
    let patient = text.find("class Patient(DomainResource):").unwrap();
    let footer = text.find("RESOURCE_TYPE_MAP").unwrap();
    assert!(header_end < first_enum);
    assert!(first_enum < element);
    assert!(element < patient);
    assert!(patient < footer);

    assert!(text.contains("class PractRole(BackboneElement):"));
    assert!(text.contains("    resource_type: typing.ClassVar[str] = \"Patient\""));
    assert!(text.contains(
        "    managing_organization: typing.Optional[\"Reference\"] = pydantic.Field(None, alias=\"managingOrganization\")"
    ));
    assert!(text.contains(
        "    name: typing.Optional[typing.List[typing.Optional[str]]] = pydantic.Field(None, alias=\"name\")"
    ));
    assert!(text.contains(
        "    link_id: str = pydantic.Field(..., alias=\"linkId\")"
    ));
    assert!(text.contains("alias=\"_active\""));
    assert!(text.contains(
        "choice_of_validator({\"effective_date_time\", \"effective_instant\"}, False, \"Observation_effective_choice\")"
    ));
    assert!(text.contains("for _subclass in {Reference} | inheritors(Reference):"));
}

#[test]
fn test_reserved_words_are_renamed() {
    let dir = spec_dir();
    let model = generate(dir.path());
    let mut config = GeneratorConfig::embedded().unwrap();
    config
        .mapping_rules
        .reservedmap
        .insert("type".to_string(), "type_".to_string());
    let text = PydanticRenderer::new(config).render_to_string(&model).unwrap();
    assert!(text.contains("    type_: typing.Optional[str] = pydantic.Field(None, alias=\"type\")"));
}

#[test]
fn test_generate_to_dir_writes_output_file() {
    let dir = spec_dir();
    let out = TempDir::new().unwrap();
    let target = out.path().join("nested");
    let path = generate_to_dir(
        dir.path(),
        &target,
        GeneratorConfig::embedded().unwrap(),
        OutputFormat::Json,
    )
    .unwrap();
    assert_eq!(path, target.join("fhir_model.json"));
    let text = std::fs::read_to_string(&path).unwrap();
    let model: GeneratedModel = serde_json::from_str(&text).unwrap();
    assert!(model.class("Patient").is_some());

    let path = generate_to_dir(
        dir.path(),
        &target,
        GeneratorConfig::embedded().unwrap(),
        OutputFormat::Pydantic,
    )
    .unwrap();
    assert_eq!(path, target.join("fhir_models.py"));
    assert!(std::fs::read_to_string(&path).unwrap().contains("Generated at: "));
}
