use crate::date_time::PrecisionDateTime;
use crate::json;
use crate::precise_decimal::PreciseDecimal;
use crate::schema::Schema;
use atrius_fhir_model::ClassModel;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// A validated object of a generated class.
///
/// The data is the stripped, normalized JSON object that passed validation. It
/// borrows the [`Schema`] it was checked against.
#[derive(Debug, Clone)]
pub struct Instance<'s> {
    schema: &'s Schema,
    class: usize,
    data: Map<String, Value>,
}

/// The populated member of a choice group, e.g. `valueQuantity` of `value[x]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChoiceValue<'a> {
    pub group: &'a str,
    pub property: &'a str,
    /// Class or primitive type name of the alternative
    pub type_name: &'a str,
    pub value: Option<&'a Value>,
    /// The `_name` companion of a primitive alternative.
    pub extension: Option<&'a Value>,
}

impl<'s> Instance<'s> {
    pub(crate) fn new(schema: &'s Schema, class: usize, data: Map<String, Value>) -> Self {
        Self {
            schema,
            class,
            data,
        }
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    pub fn class(&self) -> &'s ClassModel {
        self.schema.class_at(self.class)
    }

    pub fn resource_type(&self) -> Option<&'s str> {
        self.class().resource_type()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// The JSON form, with `resourceType` first for resources.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        if let Some(resource_type) = self.resource_type() {
            map.insert("resourceType".to_string(), Value::String(resource_type.to_string()));
        }
        for (key, value) in &self.data {
            if key != "resourceType" {
                map.insert(key.clone(), value.clone());
            }
        }
        Value::Object(map)
    }

    pub fn into_value(self) -> Value {
        self.to_value()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        json::dumps(&self.to_value())
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        json::dumps_pretty(&self.to_value())
    }

    /// The set member of choice group `group`, searching the class and its ancestors.
    /// `None` when the group is unknown or nothing is set.
    pub fn choice(&self, group: &str) -> Option<ChoiceValue<'_>> {
        let choice_group = self
            .schema
            .chain(self.class)
            .find_map(|c| c.choice_group(group))?;
        choice_group.alternatives.iter().find_map(|alternative| {
            let value = self.data.get(&alternative.property);
            let extension = self.data.get(&format!("_{}", alternative.property));
            (value.is_some() || extension.is_some()).then_some(ChoiceValue {
                group: &choice_group.name,
                property: &alternative.property,
                type_name: &alternative.type_name,
                value,
                extension,
            })
        })
    }

    /// A decimal property with its original digits.
    pub fn decimal(&self, key: &str) -> Option<PreciseDecimal> {
        self.data.get(key).and_then(PreciseDecimal::from_json)
    }

    /// A `date`, `dateTime` or `instant` property.
    pub fn date_time(&self, key: &str) -> Option<PrecisionDateTime> {
        self.data
            .get(key)
            .and_then(Value::as_str)
            .and_then(PrecisionDateTime::parse)
    }
}

impl Serialize for Instance<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_value().serialize(serializer)
    }
}
