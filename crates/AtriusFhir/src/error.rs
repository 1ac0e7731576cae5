use std::fmt;
use thiserror::Error;

/// Which check rejected a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// A JSON array given for a `max = 1` element.
    SingletonNotList,
    /// A primitive value array and its `_name` companion do not line up.
    PrimitiveExtensionPairing,
    /// More than one member of a choice group set, or none for a required group.
    ChoiceExclusivity,
    /// `Reference.type` disagrees with the type named in `Reference.reference`.
    ReferenceTypeConsistency,
    /// `Reference.reference` is neither literal, a fragment, nor an absolute URL.
    ReferenceFormat,
    UnknownField,
    MissingRequired,
    /// A primitive value that fails its lexical or range check.
    InvalidValue,
    /// A JSON value of the wrong shape (object expected, array expected, ...).
    WrongShape,
    /// A code outside its enumeration or the binding's restriction.
    UnknownCode,
    UnknownResourceType,
    /// Raised by a validator attached through [`crate::Schema::attach_validator`].
    Custom,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::SingletonNotList => "singleton-not-list",
            FailureKind::PrimitiveExtensionPairing => "primitive-extension-pairing",
            FailureKind::ChoiceExclusivity => "choice-exclusivity",
            FailureKind::ReferenceTypeConsistency => "reference-type-consistency",
            FailureKind::ReferenceFormat => "reference-format",
            FailureKind::UnknownField => "unknown-field",
            FailureKind::MissingRequired => "missing-required",
            FailureKind::InvalidValue => "invalid-value",
            FailureKind::WrongShape => "wrong-shape",
            FailureKind::UnknownCode => "unknown-code",
            FailureKind::UnknownResourceType => "unknown-resource-type",
            FailureKind::Custom => "custom",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rejected value, located by a dotted path such as `Patient.contact[1].name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub path: String,
    pub kind: FailureKind,
    pub message: String,
}

impl ValidationFailure {
    pub fn new(path: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.path, self.message, self.kind)
    }
}

/// Every failure found while validating one instance. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationFailure>);

impl ValidationErrors {
    /// Wraps collected failures, `None` when there are none.
    pub fn from_failures(failures: Vec<ValidationFailure>) -> Option<Self> {
        (!failures.is_empty()).then_some(Self(failures))
    }

    pub fn single(failure: ValidationFailure) -> Self {
        Self(vec![failure])
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_kind(&self, kind: FailureKind) -> bool {
        self.0.iter().any(|f| f.kind == kind)
    }

    /// The first failure at `path`, if any.
    pub fn at(&self, path: &str) -> Option<&ValidationFailure> {
        self.0.iter().find(|f| f.path == path)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s)", self.0.len())?;
        for failure in &self.0 {
            write!(f, "\n  {}", failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = ValidationFailure;
    type IntoIter = std::vec::IntoIter<ValidationFailure>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Problems building a [`crate::Schema`] from a generated model.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read model JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("class '{0}' is defined more than once")]
    DuplicateClass(String),
    #[error("unknown class '{0}'")]
    UnknownClass(String),
    #[error("property '{class}.{property}' names unknown enumeration '{enumeration}'")]
    UnknownEnum {
        class: String,
        property: String,
        enumeration: String,
    },
    #[error("choice group '{class}.{group}' needs at least two alternatives")]
    InvalidChoiceGroup { class: String, group: String },
    #[error("inheritance cycle: {}", .0.join(" -> "))]
    InheritanceCycle(Vec<String>),
}

/// Errors from turning JSON text or values into validated instances.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate key '{key}' in JSON object")]
    DuplicateKey { key: String },
    #[error("{0}")]
    Validation(#[from] ValidationErrors),
}

impl LoadError {
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            LoadError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}
