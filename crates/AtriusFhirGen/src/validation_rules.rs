//! Validation Rule Deriver.
//!
//! Attaches to every property and class the constraints it must satisfy when an
//! instance is built from JSON. All of them follow from FHIR's JSON representation:
//!
//! - a property with `max = 1` never takes an array
//! - primitive properties pair up with their `_name` extension companion
//! - choice groups allow at most one member, exactly one when the element is required
//! - references must be well formed and agree with their `type`
//!
//! The deriver is pure: it only fills in the `rules` lists of the registry.

use crate::class_model::ClassRegistry;
use crate::config::GeneratorConfig;
use atrius_fhir_model::ValidationRule;
use tracing::debug;

/// Derives the rules for every class in the registry.
pub fn derive_rules(registry: &mut ClassRegistry, config: &GeneratorConfig) {
    let mut count = 0usize;
    for class in registry.classes_mut() {
        for property in &mut class.properties {
            property.rules.clear();
            if !property.cardinality.is_list() {
                property.rules.push(ValidationRule::SingletonNotList);
            }
            if property.is_primitive {
                property.rules.push(ValidationRule::PrimitiveExtensionPairing);
            }
            count += property.rules.len();
        }

        class.rules = class.choice_groups.iter().map(|g| g.rule()).collect();
        // Subclasses of the reference class pick these up through the superclass chain.
        if class.name == config.reference_class {
            class.rules.push(ValidationRule::ReferenceTypeConsistency);
            class.rules.push(ValidationRule::ReferenceFormat);
        }
        count += class.rules.len();
    }
    debug!("Derived {} validation rules", count);
}
