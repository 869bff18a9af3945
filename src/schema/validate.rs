//! Write-time validation against a [`CompiledSchema`].
//!
//! Only to-be-written data is checked. Undeclared fields pass through
//! untouched.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::compiled::{ArrayItems, CompiledField, CompiledSchema, FieldSpec, FieldType, RecordShape};
use super::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Full record: apply defaults, enforce required
    Create,
    /// Partial record: check supplied fields only
    Patch,
}

struct Validator {
    now: DateTime<Utc>,
    mode: Mode,
    errors: BTreeMap<String, String>,
}

impl CompiledSchema {
    /// Validate a record about to be inserted, filling in defaults.
    pub fn prepare_insert(
        &self,
        mut record: Map<String, Value>,
        now: DateTime<Utc>,
    ) -> Result<Map<String, Value>, ValidationError> {
        let mut validator = Validator { now, mode: Mode::Create, errors: BTreeMap::new() };
        validator.check_shape(&self.shape, &mut record, "", true);
        validator.finish(record)
    }

    /// Validate the supplied subset of fields of an update.
    pub fn validate_patch(
        &self,
        mut patch: Map<String, Value>,
        now: DateTime<Utc>,
    ) -> Result<Map<String, Value>, ValidationError> {
        let mut validator = Validator { now, mode: Mode::Patch, errors: BTreeMap::new() };
        validator.check_shape(&self.shape, &mut patch, "", true);
        validator.finish(patch)
    }
}

impl Validator {
    fn finish(self, record: Map<String, Value>) -> Result<Map<String, Value>, ValidationError> {
        if self.errors.is_empty() {
            Ok(record)
        } else {
            Err(ValidationError { field_errors: self.errors })
        }
    }

    fn fail(&mut self, path: String, message: impl Into<String>) {
        self.errors.entry(path).or_insert_with(|| message.into());
    }

    /// `top_level` gates the required flag; nested leaves are never mandatory.
    fn check_shape(&mut self, shape: &RecordShape, map: &mut Map<String, Value>, prefix: &str, top_level: bool) {
        for (name, field) in &shape.fields {
            let path = join(prefix, name);
            match field {
                CompiledField::Leaf(spec) => self.check_field(spec, map, name, path, top_level),
                CompiledField::Shape(nested) => match map.get_mut(name) {
                    Some(Value::Object(inner)) => self.check_shape(nested, inner, &path, false),
                    None | Some(Value::Null) => {}
                    Some(_) => self.fail(path, "expected object"),
                },
            }
        }
    }

    fn check_field(
        &mut self,
        spec: &FieldSpec,
        map: &mut Map<String, Value>,
        name: &str,
        path: String,
        top_level: bool,
    ) {
        let absent = matches!(map.get(name), None | Some(Value::Null));

        if absent && self.mode == Mode::Create {
            if let Some(default) = &spec.default {
                map.insert(name.to_string(), default.resolve(self.now));
            } else if matches!(spec.field_type, FieldType::Array { .. }) && !map.contains_key(name) {
                map.insert(name.to_string(), Value::Array(vec![]));
            }
        }

        let required = top_level && spec.required;
        match map.get_mut(name) {
            None => {
                if required && self.mode == Mode::Create {
                    self.fail(path, "is required");
                }
            }
            Some(Value::Null) => {
                // Patch: an explicit null clears the field, which required fields forbid
                if required {
                    self.fail(path, "is required");
                }
            }
            Some(value) => self.check_value(spec, value, path),
        }
    }

    fn check_value(&mut self, spec: &FieldSpec, value: &mut Value, path: String) {
        if let Err(message) = type_matches(&spec.field_type, value) {
            self.fail(path, message);
            return;
        }

        if let Some(allowed) = &spec.enum_values {
            if !allowed.iter().any(|candidate| values_equal(candidate, value)) {
                let listed = allowed.iter().map(Value::to_string).collect::<Vec<_>>().join(", ");
                self.fail(path, format!("must be one of [{}]", listed));
                return;
            }
        }

        if let (FieldType::Array { items }, Value::Array(elements)) = (&spec.field_type, value) {
            for (index, element) in elements.iter_mut().enumerate() {
                let element_path = format!("{}[{}]", path, index);
                match items {
                    ArrayItems::Records { shape } => match element {
                        Value::Object(inner) => {
                            // Element records are always complete, so defaults apply
                            let mode = self.mode;
                            self.mode = Mode::Create;
                            self.check_shape(shape, inner, &element_path, false);
                            self.mode = mode;
                        }
                        _ => self.fail(element_path, "expected object"),
                    },
                    ArrayItems::Values { spec } => {
                        if !element.is_null() {
                            self.check_value(spec, element, element_path);
                        }
                    }
                    ArrayItems::Opaque => {}
                }
            }
        }
    }
}

fn type_matches(field_type: &FieldType, value: &Value) -> Result<(), &'static str> {
    let ok = match field_type {
        FieldType::Text => value.is_string(),
        FieldType::Number => value.is_number(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Timestamp => value.as_str().map(is_timestamp).unwrap_or(false),
        FieldType::Array { .. } => value.is_array(),
        FieldType::Opaque => true,
    };

    if ok {
        Ok(())
    } else {
        Err(match field_type {
            FieldType::Text => "expected string",
            FieldType::Number => "expected number",
            FieldType::Boolean => "expected boolean",
            FieldType::Timestamp => "expected RFC 3339 timestamp or YYYY-MM-DD date",
            FieldType::Array { .. } => "expected array",
            FieldType::Opaque => "unexpected value",
        })
    }
}

fn is_timestamp(text: &str) -> bool {
    DateTime::parse_from_rfc3339(text).is_ok() || NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
}

/// Structural equality where numbers compare by value, so `1` equals `1.0`
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        },
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter().all(|(key, x)| b.get(key).map(|y| values_equal(x, y)).unwrap_or(false))
        }
        _ => left == right,
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::compiler::compile_definition;
    use crate::schema::descriptor::EntityDefinition;
    use chrono::TimeZone;
    use serde_json::json;

    fn schema(value: Value) -> CompiledSchema {
        compile_definition(&EntityDefinition::from_value(value, "Sample").unwrap(), 16).unwrap()
    }

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_enum_without_default() {
        let schema = schema(json!({ "properties": { "grade": { "type": "string", "enum": ["a", "b"] } } }));
        assert!(schema.prepare_insert(record(json!({ "grade": "a" })), now()).is_ok());
        assert!(schema.prepare_insert(record(json!({ "grade": "b" })), now()).is_ok());

        let err = schema.prepare_insert(record(json!({ "grade": "c" })), now()).unwrap_err();
        assert!(err.field_errors["grade"].starts_with("must be one of"));
    }

    #[test]
    fn test_defaults_and_timestamps() {
        let schema = schema(json!({
            "properties": { "status": { "type": "string", "default": "open" } }
        }));
        let stored = schema.prepare_insert(record(json!({})), now()).unwrap();
        assert_eq!(stored["status"], "open");
        assert_eq!(stored["created_date"], json!(now().to_rfc3339()));
        assert_eq!(stored["updated_date"], json!(now().to_rfc3339()));
    }

    #[test]
    fn test_required_and_type_errors_are_collected() {
        let schema = schema(json!({
            "properties": {
                "title": { "type": "string" },
                "points": { "type": "integer" },
                "done": { "type": "boolean" }
            },
            "required": ["title"]
        }));
        let err = schema
            .prepare_insert(record(json!({ "points": "five", "done": 1 })), now())
            .unwrap_err();
        assert_eq!(err.field_errors.len(), 3);
        assert_eq!(err.field_errors["title"], "is required");
        assert_eq!(err.field_errors["points"], "expected number");
        assert_eq!(err.field_errors["done"], "expected boolean");
    }

    #[test]
    fn test_integer_field_accepts_fraction() {
        let schema = schema(json!({ "properties": { "points": { "type": "integer" } } }));
        assert!(schema.prepare_insert(record(json!({ "points": 2.5 })), now()).is_ok());
    }

    #[test]
    fn test_nested_records_in_arrays() {
        let schema = schema(json!({
            "properties": {
                "subtasks": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "done": { "type": "boolean", "default": false }
                        }
                    }
                }
            }
        }));

        let stored = schema
            .prepare_insert(record(json!({ "subtasks": [{ "name": "a" }] })), now())
            .unwrap();
        assert_eq!(stored["subtasks"], json!([{ "name": "a", "done": false }]));

        let err = schema
            .prepare_insert(record(json!({ "subtasks": [{ "name": 3 }, "x"] })), now())
            .unwrap_err();
        assert_eq!(err.field_errors["subtasks[0].name"], "expected string");
        assert_eq!(err.field_errors["subtasks[1]"], "expected object");
    }

    #[test]
    fn test_missing_array_defaults_to_empty() {
        let schema = schema(json!({ "properties": { "tags": { "type": "array", "items": { "type": "string" } } } }));
        let stored = schema.prepare_insert(record(json!({})), now()).unwrap();
        assert_eq!(stored["tags"], json!([]));
    }

    #[test]
    fn test_extra_fields_round_trip() {
        let schema = schema(json!({ "properties": { "title": { "type": "string" } } }));
        let stored = schema
            .prepare_insert(record(json!({ "title": "x", "color": { "hex": "#fff" } })), now())
            .unwrap();
        assert_eq!(stored["color"], json!({ "hex": "#fff" }));
    }

    #[test]
    fn test_timestamp_formats() {
        let schema = schema(json!({ "properties": { "due": { "type": "string", "format": "date-time" } } }));
        assert!(schema.prepare_insert(record(json!({ "due": "2024-06-01T10:00:00Z" })), now()).is_ok());
        assert!(schema.prepare_insert(record(json!({ "due": "2024-06-01" })), now()).is_ok());
        assert!(schema.prepare_insert(record(json!({ "due": "next tuesday" })), now()).is_err());
    }

    #[test]
    fn test_patch_checks_only_supplied_fields() {
        let schema = schema(json!({
            "properties": {
                "title": { "type": "string" },
                "priority": { "type": "string", "enum": ["low", "high"], "default": "low" }
            },
            "required": ["title"]
        }));

        let patch = schema.validate_patch(record(json!({ "priority": "high" })), now()).unwrap();
        assert!(patch.get("title").is_none());
        assert!(patch.get("created_date").is_none());

        let err = schema.validate_patch(record(json!({ "title": null })), now()).unwrap_err();
        assert_eq!(err.field_errors["title"], "is required");

        assert!(schema.validate_patch(record(json!({ "priority": "urgent" })), now()).is_err());
    }

    #[test]
    fn test_nested_object_type_error() {
        let schema = schema(json!({
            "properties": { "address": { "properties": { "zip": { "type": "number" } } } }
        }));
        let err = schema.prepare_insert(record(json!({ "address": "nowhere" })), now()).unwrap_err();
        assert_eq!(err.field_errors["address"], "expected object");

        let err = schema
            .prepare_insert(record(json!({ "address": { "zip": "0150" } })), now())
            .unwrap_err();
        assert_eq!(err.field_errors["address.zip"], "expected number");
    }

    #[test]
    fn test_values_equal_collapses_numbers() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(values_equal(&json!({ "a": [1, 2] }), &json!({ "a": [1.0, 2] })));
        assert!(!values_equal(&json!("1"), &json!(1)));
    }
}
