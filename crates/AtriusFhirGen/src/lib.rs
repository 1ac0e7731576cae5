//! # FHIR Data Model Generator
//!
//! Reads a FHIR specification directory (StructureDefinitions, CodeSystems and
//! ValueSets as JSON, optionally wrapped in Bundles) and produces a
//! [`GeneratedModel`]: classes with their properties and validation rules, plus the
//! enumerations derived from complete CodeSystems. The model is rendered either as
//! a pydantic module or as JSON for the runtime in `atrius-fhir-lib`.
//!
//! ## Pipeline
//!
//! 1. [`spec_dir::SpecDirectory::load`] collects the definitions.
//! 2. [`class_model::ClassModelBuilder`] turns StructureDefinitions into classes.
//! 3. [`class_graph::resolve`] checks inheritance and prunes unresolvable classes.
//! 4. [`code_systems::CodeSystemResolver`] derives enums and applies bindings.
//! 5. [`validation_rules::derive_rules`] attaches the runtime rules.
//! 6. [`materialize::materialize`] freezes the result for the renderers.
//!
//! ```no_run
//! use atrius_fhir_generator::{generate_to_dir, config::GeneratorConfig, OutputFormat};
//! use std::path::Path;
//!
//! let config = GeneratorConfig::embedded()?;
//! let written = generate_to_dir(
//!     Path::new("downloads/R4"),
//!     Path::new("output"),
//!     config,
//!     OutputFormat::Json,
//! )?;
//! println!("wrote {}", written.display());
//! # Ok::<(), atrius_fhir_generator::error::GeneratorError>(())
//! ```

pub mod bundle;
pub mod class_graph;
pub mod class_model;
pub mod code_systems;
pub mod config;
pub mod element_definition;
pub mod error;
pub mod format_helpers;
pub mod generator;
pub mod materialize;
pub mod naming;
pub mod render;
pub mod spec_dir;
pub mod structure_definition;
pub mod terminology;
pub mod validation_rules;

pub use atrius_fhir_model::GeneratedModel;
pub use error::{GeneratorError, Result, StructuralError};
pub use generator::{Generation, Generator};

use config::GeneratorConfig;
use render::{JsonRenderer, PydanticRenderer, Renderer};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Output flavours the generator can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// A Python module of pydantic classes.
    Pydantic,
    /// The model itself as JSON.
    Json,
}

impl OutputFormat {
    pub fn renderer(self, config: &GeneratorConfig) -> Box<dyn Renderer> {
        match self {
            OutputFormat::Pydantic => Box::new(
                PydanticRenderer::new(config.clone()).with_timestamp(chrono::Utc::now()),
            ),
            OutputFormat::Json => Box::new(JsonRenderer::default()),
        }
    }
}

/// Renders `model` into `output_dir`, creating the directory if needed.
///
/// Returns the path of the written file.
pub fn write_output(
    model: &GeneratedModel,
    renderer: &dyn Renderer,
    output_dir: &Path,
) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(renderer.file_name());
    let mut out = BufWriter::new(fs::File::create(&path)?);
    renderer.render(model, &mut out)?;
    out.flush()?;
    info!("Wrote {}", path.display());
    Ok(path)
}

/// Runs the whole pipeline on `spec_dir` and writes one output file.
///
/// Structural errors do not fail the run; they are logged and the affected classes
/// are missing from the output.
pub fn generate_to_dir(
    spec_dir: &Path,
    output_dir: &Path,
    config: GeneratorConfig,
    format: OutputFormat,
) -> Result<PathBuf> {
    let renderer = format.renderer(&config);
    let generator = Generator::new(config);
    let spec = generator.load(spec_dir)?;
    let generation = generator.generate(&spec)?;
    for error in &generation.structural_errors {
        warn!("Skipped: {}", error);
    }
    write_output(&generation.model, renderer.as_ref(), output_dir)
}
