use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Fields every compiled schema carries regardless of its descriptor
pub const CREATED_DATE: &str = "created_date";
pub const UPDATED_DATE: &str = "updated_date";
pub const IMPLICIT_FIELDS: &[&str] = &[CREATED_DATE, UPDATED_DATE];

/// Storage-level type of a leaf field. `Number` covers both integer and
/// floating-point descriptors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Timestamp,
    Number,
    Boolean,
    Array { items: ArrayItems },
    Opaque,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "of", rename_all = "snake_case")]
pub enum ArrayItems {
    Records { shape: RecordShape },
    Values { spec: Box<FieldSpec> },
    Opaque,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    Literal(Value),
    /// Evaluated at write time
    Now,
}

impl DefaultValue {
    pub fn resolve(&self, now: DateTime<Utc>) -> Value {
        match self {
            DefaultValue::Literal(value) => value.clone(),
            DefaultValue::Now => Value::String(now.to_rfc3339()),
        }
    }
}

/// The "type + enum + default" envelope around a leaf field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    #[serde(flatten)]
    pub field_type: FieldType,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    pub required: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub unique: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub write_only: bool,
}

impl FieldSpec {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            enum_values: None,
            default: None,
            required: false,
            unique: false,
            write_only: false,
        }
    }

    pub fn timestamp_now() -> Self {
        Self { default: Some(DefaultValue::Now), ..Self::new(FieldType::Timestamp) }
    }
}

/// A compiled field: either a leaf envelope or a bare nested record shape.
/// Nested objects are never wrapped, so they can never be required.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum CompiledField {
    Leaf(FieldSpec),
    Shape(RecordShape),
}

impl CompiledField {
    pub fn as_leaf(&self) -> Option<&FieldSpec> {
        match self {
            CompiledField::Leaf(spec) => Some(spec),
            CompiledField::Shape(_) => None,
        }
    }

    pub fn as_shape(&self) -> Option<&RecordShape> {
        match self {
            CompiledField::Shape(shape) => Some(shape),
            CompiledField::Leaf(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordShape {
    pub fields: BTreeMap<String, CompiledField>,
}

impl RecordShape {
    pub fn get(&self, name: &str) -> Option<&CompiledField> {
        self.fields.get(name)
    }

    pub fn leaf(&self, name: &str) -> Option<&FieldSpec> {
        self.get(name).and_then(CompiledField::as_leaf)
    }
}

/// Immutable, validated shape of one entity kind
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledSchema {
    pub name: String,
    pub shape: RecordShape,
}

impl CompiledSchema {
    pub fn field(&self, name: &str) -> Option<&CompiledField> {
        self.shape.get(name)
    }

    /// Names of top-level leaf fields flagged `unique`
    pub fn unique_fields(&self) -> Vec<&str> {
        self.shape
            .fields
            .iter()
            .filter_map(|(name, field)| match field {
                CompiledField::Leaf(spec) if spec.unique => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Strip `writeOnly` fields before a record leaves the process
    pub fn redact(&self, mut record: Map<String, Value>) -> Map<String, Value> {
        for (name, field) in &self.shape.fields {
            if let CompiledField::Leaf(spec) = field {
                if spec.write_only {
                    record.remove(name);
                }
            }
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_redact_removes_write_only_fields() {
        let mut secret = FieldSpec::new(FieldType::Text);
        secret.write_only = true;

        let mut shape = RecordShape::default();
        shape.fields.insert("password".to_string(), CompiledField::Leaf(secret));
        shape.fields.insert("email".to_string(), CompiledField::Leaf(FieldSpec::new(FieldType::Text)));
        let schema = CompiledSchema { name: "User".to_string(), shape };

        let record = json!({ "email": "a@b.c", "password": "hash", "extra": 1 });
        let redacted = schema.redact(record.as_object().cloned().unwrap());
        assert!(redacted.get("password").is_none());
        assert_eq!(redacted.get("extra"), Some(&json!(1)));
    }

    #[test]
    fn test_serialized_leaf_carries_envelope() {
        let mut spec = FieldSpec::new(FieldType::Text);
        spec.enum_values = Some(vec![json!("low"), json!("high")]);
        let value = serde_json::to_value(CompiledField::Leaf(spec)).unwrap();
        assert_eq!(value["field"], "leaf");
        assert_eq!(value["type"], "text");
        assert_eq!(value["enum"], json!(["low", "high"]));
    }
}
