use crate::bundle::{Bundle, SpecResource};
use crate::error::{Result, StructuralError};
use crate::structure_definition::StructureDefinition;
use crate::terminology::{CodeSystem, ValueSet};
use atrius_fhir_model::FhirVersion;
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the version manifest the specification download ships with.
pub const VERSION_MANIFEST: &str = "version.info";

/// A document together with the file it was read from.
#[derive(Debug, Clone)]
pub struct Sourced<T> {
    pub document: String,
    pub resource: T,
}

/// Everything the generator needs from a materialized specification directory.
#[derive(Debug, Default)]
pub struct SpecDirectory {
    /// Full version string from the manifest, e.g. `4.0.1-9346c8cc45`.
    pub version: Option<String>,
    pub fhir_version: Option<FhirVersion>,
    pub structure_definitions: Vec<Sourced<StructureDefinition>>,
    pub code_systems: Vec<Sourced<CodeSystem>>,
    pub value_sets: Vec<Sourced<ValueSet>>,
    /// Documents that could not be read.
    pub diagnostics: Vec<StructuralError>,
}

/// Recursively visits directories to find specification JSON files.
///
/// Concept maps are skipped; they carry nothing the generator uses. Paths are returned
/// sorted so that runs over the same directory are deterministic.
pub fn visit_dirs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut json_files = Vec::new();
    if dir.is_dir() {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                json_files.extend(visit_dirs(&path)?);
            } else if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(filename) = path.file_name() {
                    let filename = filename.to_string_lossy();
                    if !filename.contains("conceptmap") {
                        json_files.push(path);
                    }
                }
            }
        }
    }
    json_files.sort();
    Ok(json_files)
}

/// Reads `FhirVersion=...` from the manifest. A missing manifest yields `None`.
pub fn read_version_manifest(dir: &Path) -> Result<Option<String>> {
    let path = dir.join(VERSION_MANIFEST);
    if !path.is_file() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path)?;
    Ok(parse_version_manifest(&text))
}

fn parse_version_manifest(text: &str) -> Option<String> {
    let mut fallback = None;
    for line in text.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.trim() {
            "FhirVersion" => return Some(value.to_string()),
            "version" => fallback = Some(value.to_string()),
            _ => {}
        }
    }
    fallback
}

fn read_json(path: &Path) -> serde_json::Result<Value> {
    let file = File::open(path).map_err(serde_json::Error::io)?;
    serde_json::from_reader(BufReader::new(file))
}

impl SpecDirectory {
    /// Loads every document below `dir`.
    ///
    /// Unreadable or malformed documents are recorded in `diagnostics` and skipped;
    /// only failures to walk the directory itself are returned as errors.
    pub fn load(dir: &Path) -> Result<SpecDirectory> {
        let mut spec = SpecDirectory {
            version: read_version_manifest(dir)?,
            ..Default::default()
        };
        spec.fhir_version = spec
            .version
            .as_deref()
            .and_then(FhirVersion::from_version_string);
        match &spec.version {
            Some(v) => info!("Loading FHIR {} specification from {}", v, dir.display()),
            None => warn!("No {} in {}, version unknown", VERSION_MANIFEST, dir.display()),
        }

        for path in visit_dirs(dir)? {
            let document = path.display().to_string();
            let value = match read_json(&path) {
                Ok(value) => value,
                Err(e) => {
                    spec.reject(&path, &document, e);
                    continue;
                }
            };
            let resources = if value.get("resourceType").and_then(Value::as_str) == Some("Bundle")
            {
                match serde_json::from_value::<Bundle>(value) {
                    Ok(bundle) => bundle.into_resources().collect(),
                    Err(e) => {
                        spec.reject(&path, &document, e);
                        continue;
                    }
                }
            } else {
                vec![value]
            };
            for resource in resources {
                spec.add(&path, &document, resource);
            }
        }

        info!(
            "Loaded {} StructureDefinitions, {} CodeSystems, {} ValueSets",
            spec.structure_definitions.len(),
            spec.code_systems.len(),
            spec.value_sets.len()
        );
        Ok(spec)
    }

    fn add(&mut self, path: &Path, document: &str, resource: Value) {
        match SpecResource::from_value(resource) {
            Ok(SpecResource::StructureDefinition(sd)) => {
                self.structure_definitions.push(Sourced {
                    document: document.to_string(),
                    resource: *sd,
                });
            }
            Ok(SpecResource::CodeSystem(cs)) => self.code_systems.push(Sourced {
                document: document.to_string(),
                resource: *cs,
            }),
            Ok(SpecResource::ValueSet(vs)) => self.value_sets.push(Sourced {
                document: document.to_string(),
                resource: *vs,
            }),
            Ok(SpecResource::Other(resource_type)) => {
                debug!("Ignoring {} resource in {}", resource_type, document);
            }
            Err(e) => self.reject(path, document, e),
        }
    }

    fn reject(&mut self, path: &Path, document: &str, err: serde_json::Error) {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| document.to_string());
        let error = StructuralError::new(name, format!("unreadable document: {}", err))
            .in_document(document);
        warn!("{}", error);
        self.diagnostics.push(error);
    }
}
