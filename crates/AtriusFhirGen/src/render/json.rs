use super::Renderer;
use crate::error::Result;
use atrius_fhir_model::GeneratedModel;
use std::io::Write;

/// Writes the model itself as pretty-printed JSON.
///
/// This is the hand-off format for consumers outside this workspace and for the
/// runtime's `Schema::from_json`.
pub struct JsonRenderer {
    file_name: String,
}

impl JsonRenderer {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }
}

impl Default for JsonRenderer {
    fn default() -> Self {
        Self::new("fhir_model.json")
    }
}

impl Renderer for JsonRenderer {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn render(&self, model: &GeneratedModel, out: &mut dyn Write) -> Result<()> {
        serde_json::to_writer_pretty(&mut *out, model)?;
        writeln!(out)?;
        Ok(())
    }
}
