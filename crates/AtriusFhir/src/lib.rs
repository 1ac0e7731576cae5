//! # FHIR Runtime Validation
//!
//! Validates FHIR JSON against a [`GeneratedModel`] produced by the generator crate.
//! Where the generated pydantic module enforces its rules through validators on each
//! class, this crate interprets the same [`ValidationRule`]s directly: a [`Schema`] is
//! built from the model (or from the generator's JSON output) and every parse runs the
//! staged checks described in [`validator`].
//!
//! ```rust
//! use atrius_fhir_lib::{FailureKind, Schema};
//! # use atrius_fhir_model::GeneratedModel;
//! # fn model() -> GeneratedModel { GeneratedModel::default() }
//!
//! let schema = Schema::new(model())?;
//! let err = schema
//!     .parse_resource_str(r#"{"resourceType": "Nope"}"#)
//!     .unwrap_err();
//! assert!(
//!     err.validation_errors()
//!         .unwrap()
//!         .has_kind(FailureKind::UnknownResourceType)
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Numbers keep their textual form throughout (`1.50` serializes as `1.50`), objects
//! keep their key order, and output never contains empty strings, arrays or objects.

pub mod date_time;
pub mod error;
pub mod instance;
pub mod json;
pub mod pairing;
pub mod precise_decimal;
pub mod primitives;
pub mod reference;
pub mod schema;
pub mod strip;
pub mod validator;

pub use atrius_fhir_model::{GeneratedModel, ValidationRule};
pub use date_time::{DatePrecision, DateTimePrecision, PrecisionDate, PrecisionDateTime, PrecisionTime, TimePrecision};
pub use error::{FailureKind, LoadError, SchemaError, ValidationErrors, ValidationFailure};
pub use instance::{ChoiceValue, Instance};
pub use json::{dumps, loads};
pub use precise_decimal::PreciseDecimal;
pub use schema::{ClassValidator, Schema};
pub use strip::strip_empty;

use serde_json::Value;

/// Validates a resource against `schema`, selecting the class from `resourceType`.
pub fn parse_resource(schema: &Schema, value: Value) -> Result<Instance<'_>, ValidationErrors> {
    schema.parse_resource(value)
}
