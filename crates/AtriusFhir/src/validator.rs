//! Construction-time validation of JSON objects against a [`Schema`].
//!
//! Each object goes through the same stages, in order:
//!
//! 1. empty items are stripped (once, for the whole document)
//! 2. `max = 1` properties must not hold arrays
//! 3. primitive arrays are paired with their `_name` companions
//! 4. at most one member of each choice group is set (exactly one if required)
//! 5. references are well-formed and agree with their `type`
//! 6. no unknown keys, no missing required properties
//!
//! The first stage that fails ends the checks for that object. Otherwise its property
//! values are checked and nested objects validated the same way, and finally the
//! validators attached to the class run. Failures of sibling objects are collected, so
//! one parse reports every independent problem.

use crate::error::{FailureKind, LoadError, ValidationErrors, ValidationFailure};
use crate::instance::Instance;
use crate::json;
use crate::pairing::pair_primitive;
use crate::primitives::PrimitiveKind;
use crate::reference;
use crate::schema::{Key, PropRef, Schema};
use crate::strip::strip_object;
use atrius_fhir_model::{PropertyModel, ValidationRule};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, trace};

impl Schema {
    /// Validates a resource, choosing its class from `resourceType`.
    pub fn parse_resource(&self, value: Value) -> Result<Instance<'_>, ValidationErrors> {
        let Value::Object(map) = value else {
            return Err(ValidationErrors::single(ValidationFailure::new(
                "",
                FailureKind::WrongShape,
                "a resource must be a JSON object",
            )));
        };
        let class = match map.get("resourceType") {
            Some(Value::String(rt)) => self.resource_index(rt).ok_or_else(|| {
                ValidationErrors::single(ValidationFailure::new(
                    "resourceType",
                    FailureKind::UnknownResourceType,
                    format!("unknown resource type '{}'", rt),
                ))
            })?,
            _ => {
                return Err(ValidationErrors::single(ValidationFailure::new(
                    "resourceType",
                    FailureKind::UnknownResourceType,
                    "missing resourceType",
                )));
            }
        };
        self.parse_at(class, map)
    }

    /// Parses JSON text strictly (no duplicate keys) and validates it as a resource.
    pub fn parse_resource_str(&self, text: &str) -> Result<Instance<'_>, LoadError> {
        let value = json::loads(text)?;
        Ok(self.parse_resource(value)?)
    }

    /// Validates `value` as an instance of the named class.
    pub fn parse(&self, class_name: &str, value: Value) -> Result<Instance<'_>, ValidationErrors> {
        let Some(class) = self.index_of(class_name) else {
            return Err(ValidationErrors::single(ValidationFailure::new(
                class_name,
                FailureKind::UnknownResourceType,
                format!("unknown class '{}'", class_name),
            )));
        };
        let Value::Object(map) = value else {
            return Err(ValidationErrors::single(ValidationFailure::new(
                class_name,
                FailureKind::WrongShape,
                "expected a JSON object",
            )));
        };
        self.parse_at(class, map)
    }

    /// Like [`Schema::parse`], for callers that only need the verdict.
    pub fn validate(&self, class_name: &str, value: &Value) -> Result<(), ValidationErrors> {
        self.parse(class_name, value.clone()).map(|_| ())
    }

    fn parse_at(&self, class: usize, map: Map<String, Value>) -> Result<Instance<'_>, ValidationErrors> {
        let mut map = strip_object(map);
        let root = self.class_at(class);
        let path = root.resource_type().unwrap_or(&root.name).to_string();

        let mut validation = Validation {
            schema: self,
            failures: Vec::new(),
        };
        validation.object(class, &mut map, &path);
        match ValidationErrors::from_failures(validation.failures) {
            Some(errors) => {
                debug!(class = %root.name, failures = errors.len(), "validation failed");
                Err(errors)
            }
            None => Ok(Instance::new(self, class, map)),
        }
    }
}

struct Validation<'s> {
    schema: &'s Schema,
    failures: Vec<ValidationFailure>,
}

fn child_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

impl<'s> Validation<'s> {
    fn fail(&mut self, path: String, kind: FailureKind, message: impl Into<String>) {
        let failure = ValidationFailure::new(path, kind, message);
        trace!(%failure, "validation failure");
        self.failures.push(failure);
    }

    fn object(&mut self, class: usize, map: &mut Map<String, Value>, path: &str) {
        let before = self.failures.len();
        let stages: [fn(&mut Self, usize, &mut Map<String, Value>, &str); 5] = [
            Self::check_singletons,
            Self::pair_values,
            Self::check_choices,
            Self::check_reference,
            Self::check_keys,
        ];
        for stage in stages {
            stage(self, class, map, path);
            if self.failures.len() > before {
                return;
            }
        }

        self.check_properties(class, map, path);
        if self.failures.len() > before {
            return;
        }
        let schema = self.schema;
        for validator in schema.validators(class) {
            if let Err(message) = (validator.check)(&*map) {
                self.fail(
                    path.to_string(),
                    FailureKind::Custom,
                    format!("{}: {}", validator.name, message),
                );
            }
        }
    }

    fn check_singletons(&mut self, class: usize, map: &mut Map<String, Value>, path: &str) {
        let schema = self.schema;
        for (key, value) in map.iter() {
            if !value.is_array() {
                continue;
            }
            let property = match schema.key(class, key) {
                Some(Key::Value(at)) | Some(Key::Companion(at)) => schema.property(at),
                None => continue,
            };
            if property.has_rule(&ValidationRule::SingletonNotList) || !property.is_list() {
                self.fail(
                    child_path(path, key),
                    FailureKind::SingletonNotList,
                    format!("'{}' holds a single value and must not be a list", key),
                );
            }
        }
    }

    fn pair_values(&mut self, class: usize, map: &mut Map<String, Value>, path: &str) {
        let schema = self.schema;
        for &at in schema.properties(class) {
            let property = schema.property(at);
            if !property.is_list() {
                continue;
            }
            match property.companion_key() {
                Some(companion) if property.has_rule(&ValidationRule::PrimitiveExtensionPairing) => {
                    if let Err(message) = pair_primitive(map, &property.name, &companion) {
                        self.fail(
                            child_path(path, &property.name),
                            FailureKind::PrimitiveExtensionPairing,
                            message,
                        );
                    }
                }
                Some(_) => {}
                None => drop_null_items(map, &property.name),
            }
        }
    }

    fn check_choices(&mut self, class: usize, map: &mut Map<String, Value>, path: &str) {
        let schema = self.schema;
        let mut seen = HashSet::new();
        for model in schema.chain(class) {
            for group in &model.choice_groups {
                if !seen.insert(group.name.as_str()) {
                    continue;
                }
                let set: Vec<&str> = group
                    .member_names()
                    .filter(|member| {
                        map.contains_key(*member)
                            || (map.contains_key(&format!("_{}", member))
                                && matches!(
                                    schema.key(class, &format!("_{}", member)),
                                    Some(Key::Companion(_))
                                ))
                    })
                    .collect();
                if set.len() > 1 {
                    self.fail(
                        child_path(path, &group.name),
                        FailureKind::ChoiceExclusivity,
                        format!(
                            "only one of {} may be set, got {}",
                            group.member_names().collect::<Vec<_>>().join(", "),
                            set.join(", ")
                        ),
                    );
                } else if set.is_empty() && group.required {
                    self.fail(
                        child_path(path, &group.name),
                        FailureKind::ChoiceExclusivity,
                        format!(
                            "one of {} is required",
                            group.member_names().collect::<Vec<_>>().join(", ")
                        ),
                    );
                }
            }
        }
    }

    fn check_reference(&mut self, class: usize, map: &mut Map<String, Value>, path: &str) {
        let schema = self.schema;
        let check_format = schema.has_class_rule(class, &ValidationRule::ReferenceFormat);
        let check_type = schema.has_class_rule(class, &ValidationRule::ReferenceTypeConsistency);
        if !check_format && !check_type {
            return;
        }
        match reference::check_reference(map, schema.resource_names()) {
            Err((FailureKind::ReferenceFormat, message)) if check_format => {
                self.fail(child_path(path, "reference"), FailureKind::ReferenceFormat, message)
            }
            Err((FailureKind::ReferenceTypeConsistency, message)) if check_type => self.fail(
                child_path(path, "type"),
                FailureKind::ReferenceTypeConsistency,
                message,
            ),
            _ => {}
        }
    }

    fn check_keys(&mut self, class: usize, map: &mut Map<String, Value>, path: &str) {
        let schema = self.schema;
        let model = schema.class_at(class);
        for (key, value) in map.iter() {
            if key == "resourceType" {
                match model.resource_type() {
                    Some(expected) if value.as_str() == Some(expected) => {}
                    Some(expected) => self.fail(
                        child_path(path, key),
                        FailureKind::UnknownResourceType,
                        format!("expected resourceType '{}', got {}", expected, value),
                    ),
                    None => self.fail(
                        child_path(path, key),
                        FailureKind::UnknownField,
                        format!("{} is not a resource", model.name),
                    ),
                }
            } else if schema.key(class, key).is_none() {
                self.fail(
                    child_path(path, key),
                    FailureKind::UnknownField,
                    format!("unknown field '{}' on {}", key, model.name),
                );
            }
        }

        for &at in schema.properties(class) {
            let property = schema.property(at);
            if !property.is_required() || map.contains_key(&property.name) {
                continue;
            }
            let has_companion = property
                .companion_key()
                .is_some_and(|companion| map.contains_key(&companion));
            if !has_companion {
                self.fail(
                    child_path(path, &property.name),
                    FailureKind::MissingRequired,
                    format!("'{}' is required", property.name),
                );
            }
        }
    }

    fn check_properties(&mut self, class: usize, map: &mut Map<String, Value>, path: &str) {
        let schema = self.schema;
        for (key, value) in map.iter_mut() {
            let path = child_path(path, key);
            match schema.key(class, key) {
                Some(Key::Value(at)) => self.property_value(at, value, &path),
                Some(Key::Companion(at)) => self.companion_value(schema.property(at), value, &path),
                None => {}
            }
        }
    }

    fn property_value(&mut self, at: PropRef, value: &mut Value, path: &str) {
        let schema = self.schema;
        let property = schema.property(at);
        if !property.is_list() {
            self.single_value(property, value, path);
            return;
        }
        match value {
            Value::Array(items) => {
                for (i, item) in items.iter_mut().enumerate() {
                    if !item.is_null() {
                        self.single_value(property, item, &format!("{}[{}]", path, i));
                    }
                }
            }
            _ => self.fail(
                path.to_string(),
                FailureKind::WrongShape,
                format!("'{}' repeats and must be a list", property.name),
            ),
        }
    }

    fn single_value(&mut self, property: &PropertyModel, value: &mut Value, path: &str) {
        let schema = self.schema;
        if let Some(declared) = schema.index_of(&property.type_name) {
            let Value::Object(object) = value else {
                self.fail(
                    path.to_string(),
                    FailureKind::WrongShape,
                    format!("expected a {} object", property.type_name),
                );
                return;
            };
            if let Some(target) = self.dispatch(declared, object, path) {
                self.object(target, object, path);
            }
            return;
        }

        let Some(kind) = PrimitiveKind::from_fhir_type(&property.fhir_type) else {
            trace!(property = %property.name, fhir_type = %property.fhir_type, "no value check");
            return;
        };
        if let Err(message) = kind.check(value) {
            self.fail(path.to_string(), FailureKind::InvalidValue, message);
            return;
        }

        let Some(name) = &property.enum_name else {
            return;
        };
        let Some(code) = value.as_str() else {
            return;
        };
        let known = schema
            .enumeration(name)
            .is_some_and(|e| e.value(code).is_some());
        if !known {
            self.fail(
                path.to_string(),
                FailureKind::UnknownCode,
                format!("'{}' is not a code of {}", code, name),
            );
        } else if !property.restricted_to.is_empty()
            && !property.restricted_to.iter().any(|c| c == code)
        {
            self.fail(
                path.to_string(),
                FailureKind::UnknownCode,
                format!(
                    "'{}' is not allowed here, expected one of {}",
                    code,
                    property.restricted_to.join(", ")
                ),
            );
        }
    }

    /// Resource-typed properties (`contained`, `Bundle.entry.resource`) hold any
    /// resource derived from the declared class; the object's `resourceType` decides.
    fn dispatch(&mut self, declared: usize, object: &Map<String, Value>, path: &str) -> Option<usize> {
        let schema = self.schema;
        let declared_class = schema.class_at(declared);
        if !declared_class.is_resource() {
            return Some(declared);
        }
        let Some(Value::String(resource_type)) = object.get("resourceType") else {
            self.fail(
                child_path(path, "resourceType"),
                FailureKind::UnknownResourceType,
                "missing resourceType",
            );
            return None;
        };
        let Some(target) = schema.resource_index(resource_type) else {
            self.fail(
                child_path(path, "resourceType"),
                FailureKind::UnknownResourceType,
                format!("unknown resource type '{}'", resource_type),
            );
            return None;
        };
        if !schema.derives_from(target, declared) {
            self.fail(
                child_path(path, "resourceType"),
                FailureKind::UnknownResourceType,
                format!("{} is not a {}", resource_type, declared_class.name),
            );
            return None;
        }
        Some(target)
    }

    /// `_name` companions carry an Element (id and extensions), one per value.
    fn companion_value(&mut self, property: &PropertyModel, value: &mut Value, path: &str) {
        let element = self.schema.element_class();
        let check = |this: &mut Self, item: &mut Value, path: &str| match item {
            Value::Object(object) => {
                if let Some(element) = element {
                    this.object(element, object, path);
                }
            }
            _ => this.fail(
                path.to_string(),
                FailureKind::WrongShape,
                "primitive extensions must be objects",
            ),
        };
        match value {
            Value::Array(items) if property.is_list() => {
                for (i, item) in items.iter_mut().enumerate() {
                    if !item.is_null() {
                        check(self, item, &format!("{}[{}]", path, i));
                    }
                }
            }
            _ if property.is_list() => self.fail(
                path.to_string(),
                FailureKind::WrongShape,
                format!("'_{}' repeats and must be a list", property.name),
            ),
            _ => check(self, value, path),
        }
    }
}

fn drop_null_items(map: &mut Map<String, Value>, key: &str) {
    let now_empty = match map.get_mut(key) {
        Some(Value::Array(items)) => {
            items.retain(|v| !v.is_null());
            items.is_empty()
        }
        _ => false,
    };
    if now_empty {
        map.shift_remove(key);
    }
}
