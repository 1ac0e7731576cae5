//! The generator pipeline: specification directory to [`GeneratedModel`].
//!
//! Stages run strictly in sequence since each needs the complete output of the one
//! before: classes, graph resolution, enums and bindings, rules, materialization.

use crate::class_graph::{self, GraphReport};
use crate::class_model::{ClassModelBuilder, ClassRegistry};
use crate::code_systems::{CodeSystemResolver, EnumRegistry};
use crate::config::GeneratorConfig;
use crate::error::{Result, StructuralError};
use crate::materialize::materialize;
use crate::spec_dir::SpecDirectory;
use crate::validation_rules::derive_rules;
use atrius_fhir_model::GeneratedModel;
use std::path::Path;
use tracing::info;

/// Result of a full run.
#[derive(Debug)]
pub struct Generation {
    pub model: GeneratedModel,
    pub structural_errors: Vec<StructuralError>,
    pub graph: GraphReport,
}

pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn load(&self, spec_dir: &Path) -> Result<SpecDirectory> {
        SpecDirectory::load(spec_dir)
    }

    /// Builds the class registry and resolves its graph, without rules or enums.
    pub fn build_classes(&self, spec: &SpecDirectory) -> Result<(ClassRegistry, GraphReport)> {
        let mut registry = ClassModelBuilder::new(&self.config).build(spec)?;
        let report = class_graph::resolve(&mut registry, &self.config)?;
        Ok((registry, report))
    }

    /// Builds classes and enums and derives every validation rule.
    pub fn build(&self, spec: &SpecDirectory) -> Result<(ClassRegistry, EnumRegistry, GraphReport)> {
        let (mut registry, report) = self.build_classes(spec)?;
        let resolver = CodeSystemResolver::new(&self.config);
        let enums = resolver.resolve(spec, &registry)?;
        resolver.apply_bindings(&mut registry, &enums);
        derive_rules(&mut registry, &self.config);
        Ok((registry, enums, report))
    }

    pub fn generate(&self, spec: &SpecDirectory) -> Result<Generation> {
        let (registry, enums, graph) = self.build(spec)?;
        let structural_errors = registry.structural_errors().to_vec();
        let model = materialize(&registry, enums.into_enums(), spec.version.clone(), &self.config);
        info!(
            "Generated model with {} classes and {} enums",
            model.classes.len(),
            model.enums.len()
        );
        Ok(Generation {
            model,
            structural_errors,
            graph,
        })
    }
}
