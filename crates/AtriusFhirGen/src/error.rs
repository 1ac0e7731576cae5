use std::fmt;
use thiserror::Error;

/// An inconsistency in one specification document.
///
/// Structural errors are fatal only for the class they concern: the builder records
/// them, drops the class (and every class depending on it) and carries on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralError {
    /// Class or document the problem was found in.
    pub class: String,
    /// Source document (file path or canonical URL), when known.
    pub document: Option<String>,
    pub message: String,
}

impl StructuralError {
    pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            document: None,
            message: message.into(),
        }
    }

    pub fn in_document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }
}

impl fmt::Display for StructuralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.document {
            Some(doc) => write!(f, "{} ({}): {}", self.class, doc, self.message),
            None => write!(f, "{}: {}", self.class, self.message),
        }
    }
}

impl std::error::Error for StructuralError {}

/// Errors that abort a generator run.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// A structural problem that could not be contained to one class.
    #[error("Structural error in {0}")]
    Structural(StructuralError),

    /// Two distinct definitions resolved to the same generated identifier.
    ///
    /// Naming is deterministic, so this always points at a missing `classmap` or
    /// `enum_namemap` entry.
    #[error("Naming conflict: '{name}' is produced by both {first} and {second}")]
    NamingConflict {
        name: String,
        first: String,
        second: String,
    },

    #[error("Inheritance cycle between classes: {}", .classes.join(" -> "))]
    InheritanceCycle { classes: Vec<String> },

    #[error("Class '{class}' derives from unknown superclass '{superclass}'")]
    UnresolvedSuperclass { class: String, superclass: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<StructuralError> for GeneratorError {
    fn from(err: StructuralError) -> Self {
        GeneratorError::Structural(err)
    }
}

pub type Result<T> = std::result::Result<T, GeneratorError>;
