//! Renderers turn a [`GeneratedModel`] into output text.
//!
//! The model is immutable by the time it reaches a renderer; renderers never look at
//! the specification directory or the registries.

mod json;
mod pydantic;

pub use json::JsonRenderer;
pub use pydantic::PydanticRenderer;

use crate::error::Result;
use atrius_fhir_model::GeneratedModel;
use std::io::Write;

pub trait Renderer {
    /// File name the output is written to inside the output directory.
    fn file_name(&self) -> &str;

    fn render(&self, model: &GeneratedModel, out: &mut dyn Write) -> Result<()>;

    /// Renders into a string, mostly useful for tests.
    fn render_to_string(&self, model: &GeneratedModel) -> Result<String> {
        let mut buffer = Vec::new();
        self.render(model, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
