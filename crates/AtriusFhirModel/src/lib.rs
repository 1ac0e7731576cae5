//! # FHIR Model Support Types
//!
//! This crate holds the data structures shared between the code generator and the
//! runtime validation library. The generator parses the FHIR specification, resolves
//! its class hierarchy and derives validation rules; the result is materialized into a
//! [`GeneratedModel`] which is handed to renderers and to the runtime unchanged.
//!
//! ## Overview
//!
//! - [`GeneratedModel`] - the complete, render-ordered output of one generator run
//! - [`ClassModel`] / [`PropertyModel`] - one generated class and its fields
//! - [`EnumModel`] - one enumeration derived from a CodeSystem
//! - [`ChoiceGroup`] - the mutually exclusive alternatives of a `nnn[x]` element
//! - [`ValidationRule`] - language-agnostic constraint descriptors
//!
//! Every type is plain data and (de)serializes with serde, so a model written by the
//! generator's JSON renderer can be loaded again by any consumer:
//!
//! ```rust
//! use atrius_fhir_model::{Cardinality, MaxCardinality};
//!
//! let card = Cardinality::parse(Some(0), Some("*")).unwrap();
//! assert!(card.is_list());
//! assert_eq!(card.max, MaxCardinality::Unbounded);
//! ```

pub mod fhir_version;
pub mod model;
pub mod rules;

pub use fhir_version::FhirVersion;
pub use model::*;
pub use rules::*;
