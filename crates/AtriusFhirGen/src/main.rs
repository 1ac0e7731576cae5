//! # FHIR Generator CLI
//!
//! Generates a data model from a downloaded FHIR specification directory.
//!
//! ## Usage
//!
//! ```bash
//! # Pydantic module into ./output
//! atrius-fhir-gen --spec-dir downloads/R4
//!
//! # JSON model with a custom configuration
//! atrius-fhir-gen --spec-dir downloads/R5 --format json --config my-generator.yaml
//!
//! # Only check that the definitions load and the class graph resolves
//! atrius-fhir-gen --spec-dir downloads/R4 --load-only
//!
//! # Run everything but write nothing
//! atrius-fhir-gen --spec-dir downloads/R4 --dry-run
//! ```
//!
//! Logging follows `RUST_LOG` when set, `--log-level` otherwise.

use anyhow::{Context, Result};
use atrius_fhir_generator::config::GeneratorConfig;
use atrius_fhir_generator::{Generator, OutputFormat, write_output};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the FHIR data model generator.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the specification JSON files and `version.info`.
    #[arg(long)]
    spec_dir: PathBuf,

    /// Directory the rendered model is written to.
    #[arg(long, short, default_value = "output")]
    output: PathBuf,

    /// YAML file merged over the built-in configuration.
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Pydantic)]
    format: OutputFormat,

    /// Stop after loading the definitions and resolving the class graph.
    #[arg(long)]
    load_only: bool,

    /// Run the whole pipeline but write nothing.
    #[arg(long, conflicts_with = "load_only")]
    dry_run: bool,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("Invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match &args.config {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => GeneratorConfig::embedded().context("Built-in configuration is invalid")?,
    };
    let renderer = args.format.renderer(&config);
    let generator = Generator::new(config);

    let spec = generator
        .load(&args.spec_dir)
        .with_context(|| format!("Failed to load {}", args.spec_dir.display()))?;
    info!(
        "Loaded {} StructureDefinitions, {} CodeSystems, {} ValueSets (FHIR {})",
        spec.structure_definitions.len(),
        spec.code_systems.len(),
        spec.value_sets.len(),
        spec.version.as_deref().unwrap_or("unknown")
    );
    if args.load_only {
        let (registry, report) = generator
            .build_classes(&spec)
            .context("Class graph resolution failed")?;
        info!(
            "Resolved {} classes, {} pruned, {} structural errors",
            registry.len(),
            report.pruned.len(),
            registry.structural_errors().len()
        );
        return Ok(());
    }

    let generation = generator.generate(&spec).context("Generation failed")?;
    for error in &generation.structural_errors {
        warn!("Skipped: {}", error);
    }
    if args.dry_run {
        info!(
            "Dry run: {} classes, {} enums, {} skipped",
            generation.model.classes.len(),
            generation.model.enums.len(),
            generation.structural_errors.len()
        );
        return Ok(());
    }

    let path = write_output(&generation.model, renderer.as_ref(), &args.output)
        .with_context(|| format!("Failed to write to {}", args.output.display()))?;
    println!("{}", path.display());
    Ok(())
}
