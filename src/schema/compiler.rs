//! Descriptor → compiled schema translation.
//!
//! Compilation is a pure function of its input: the same definition always
//! yields a structurally identical [`CompiledSchema`].

use std::collections::BTreeMap;

use super::compiled::{
    ArrayItems, CompiledField, CompiledSchema, DefaultValue, FieldSpec, FieldType, RecordShape,
    IMPLICIT_FIELDS,
};
use super::descriptor::{Constraints, EntityDefinition, PrimitiveKind, TypeDescriptor};
use super::error::CompileError;

/// String formats stored as timestamps rather than text
const TEMPORAL_FORMATS: &[&str] = &["date-time", "date", "time"];

/// Compile one classified descriptor. Objects become bare shapes, everything
/// else a leaf envelope with `required` left unset.
pub fn compile_field(descriptor: &TypeDescriptor) -> CompiledField {
    match descriptor {
        TypeDescriptor::Object { properties } => CompiledField::Shape(compile_shape(properties)),
        other => CompiledField::Leaf(compile_leaf(other)),
    }
}

pub fn compile_shape(properties: &BTreeMap<String, TypeDescriptor>) -> RecordShape {
    RecordShape {
        fields: properties
            .iter()
            .map(|(name, descriptor)| (name.clone(), compile_field(descriptor)))
            .collect(),
    }
}

fn compile_leaf(descriptor: &TypeDescriptor) -> FieldSpec {
    match descriptor {
        TypeDescriptor::Primitive { kind, format, constraints } => {
            let field_type = match kind {
                PrimitiveKind::String if is_temporal(format.as_deref()) => FieldType::Timestamp,
                PrimitiveKind::String => FieldType::Text,
                PrimitiveKind::Number | PrimitiveKind::Integer => FieldType::Number,
                PrimitiveKind::Boolean => FieldType::Boolean,
            };
            envelope(field_type, constraints)
        }
        TypeDescriptor::Array { items, constraints } => {
            let items = match items.as_deref() {
                Some(TypeDescriptor::Object { properties }) => {
                    ArrayItems::Records { shape: compile_shape(properties) }
                }
                Some(TypeDescriptor::Unknown { .. }) | None => ArrayItems::Opaque,
                Some(element) => ArrayItems::Values { spec: Box::new(compile_leaf(element)) },
            };
            envelope(FieldType::Array { items }, constraints)
        }
        TypeDescriptor::Unknown { constraints, .. } => envelope(FieldType::Opaque, constraints),
        // compile_field and the array arm route objects to shapes before this point
        TypeDescriptor::Object { .. } => FieldSpec::new(FieldType::Opaque),
    }
}

fn envelope(field_type: FieldType, constraints: &Constraints) -> FieldSpec {
    FieldSpec {
        field_type,
        enum_values: constraints.enum_values.clone(),
        default: constraints.default.clone().map(DefaultValue::Literal),
        required: false,
        unique: constraints.unique,
        write_only: constraints.write_only,
    }
}

fn is_temporal(format: Option<&str>) -> bool {
    format.map(|f| TEMPORAL_FORMATS.contains(&f)).unwrap_or(false)
}

/// Compile a full entity definition: classify and compile every declared
/// property, merge the implicit timestamps, then apply `required`.
pub fn compile_definition(
    definition: &EntityDefinition,
    max_depth: usize,
) -> Result<CompiledSchema, CompileError> {
    let mut properties = BTreeMap::new();
    for (name, raw) in &definition.properties {
        properties.insert(name.clone(), raw.classify(name, 1, max_depth)?);
    }

    let mut shape = compile_shape(&properties);

    // Implicit timestamps replace any declared field of the same name
    for implicit in IMPLICIT_FIELDS {
        let declared = shape
            .fields
            .insert(implicit.to_string(), CompiledField::Leaf(FieldSpec::timestamp_now()));
        if declared.is_some() {
            tracing::debug!(
                "Definition '{}': declared '{}' replaced by the implicit timestamp",
                definition.name, implicit
            );
        }
    }

    for name in &definition.required {
        match shape.fields.get_mut(name) {
            Some(CompiledField::Leaf(spec)) => spec.required = true,
            // Bare nested shapes bypass the envelope and stay optional
            Some(CompiledField::Shape(_)) => {
                tracing::debug!(
                    "Definition '{}': required field '{}' is a nested object and stays optional",
                    definition.name, name
                );
            }
            None => {
                tracing::debug!(
                    "Definition '{}': required field '{}' is not declared",
                    definition.name, name
                );
            }
        }
    }

    Ok(CompiledSchema { name: definition.name.clone(), shape })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn definition(value: Value) -> EntityDefinition {
        EntityDefinition::from_value(value, "Sample").unwrap()
    }

    fn compile(value: Value) -> CompiledSchema {
        compile_definition(&definition(value), 16).unwrap()
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let doc = json!({
            "name": "Task",
            "properties": {
                "title": { "type": "string" },
                "tags": { "type": "array", "items": { "type": "string" } },
                "meta": { "type": "object", "properties": { "views": { "type": "integer" } } }
            },
            "required": ["title"]
        });
        assert_eq!(compile(doc.clone()), compile(doc));
    }

    #[test]
    fn test_primitive_mapping() {
        let schema = compile(json!({
            "properties": {
                "title": { "type": "string" },
                "due": { "type": "string", "format": "date-time" },
                "day": { "type": "string", "format": "date" },
                "estimate": { "type": "number" },
                "points": { "type": "integer" },
                "done": { "type": "boolean" },
                "blob": { "type": "geometry" }
            }
        }));
        let leaf_type = |name: &str| schema.shape.leaf(name).unwrap().field_type.clone();
        assert_eq!(leaf_type("title"), FieldType::Text);
        assert_eq!(leaf_type("due"), FieldType::Timestamp);
        assert_eq!(leaf_type("day"), FieldType::Timestamp);
        assert_eq!(leaf_type("blob"), FieldType::Opaque);
        // integer and number collapse into one representation
        assert_eq!(leaf_type("estimate"), FieldType::Number);
        assert_eq!(leaf_type("points"), FieldType::Number);
        assert_eq!(leaf_type("done"), FieldType::Boolean);
    }

    #[test]
    fn test_array_of_objects_matches_direct_shape() {
        let properties = json!({ "name": { "type": "string" }, "done": { "type": "boolean" } });
        let schema = compile(json!({
            "properties": {
                "subtasks": { "type": "array", "items": { "type": "object", "properties": properties.clone() } },
                "direct": { "type": "object", "properties": properties }
            }
        }));

        let direct = schema.field("direct").and_then(CompiledField::as_shape).unwrap();
        match &schema.shape.leaf("subtasks").unwrap().field_type {
            FieldType::Array { items: ArrayItems::Records { shape } } => assert_eq!(shape, direct),
            other => panic!("expected record array, got {:?}", other),
        }
    }

    #[test]
    fn test_array_fallbacks() {
        let schema = compile(json!({
            "properties": {
                "labels": { "type": "array", "items": { "type": "string", "enum": ["a", "b"] } },
                "anything": { "type": "array" },
                "odd": { "type": "array", "items": { "type": "mystery" } }
            }
        }));
        match &schema.shape.leaf("labels").unwrap().field_type {
            FieldType::Array { items: ArrayItems::Values { spec } } => {
                assert_eq!(spec.field_type, FieldType::Text);
                assert_eq!(spec.enum_values, Some(vec![json!("a"), json!("b")]));
            }
            other => panic!("expected value array, got {:?}", other),
        }
        let opaque = FieldType::Array { items: ArrayItems::Opaque };
        assert_eq!(schema.shape.leaf("anything").unwrap().field_type, opaque);
        assert_eq!(schema.shape.leaf("odd").unwrap().field_type, opaque);
    }

    #[test]
    fn test_object_is_not_wrapped() {
        let schema = compile(json!({
            "properties": {
                "address": { "type": "object", "properties": { "city": { "type": "string", "default": "Oslo" } } }
            }
        }));
        let shape = schema.field("address").and_then(CompiledField::as_shape).unwrap();
        let city = shape.leaf("city").unwrap();
        assert_eq!(city.default, Some(DefaultValue::Literal(json!("Oslo"))));
        assert!(schema.shape.leaf("address").is_none());
    }

    #[test]
    fn test_required_nested_object_stays_optional() {
        let schema = compile(json!({
            "properties": {
                "title": { "type": "string" },
                "settings": { "properties": { "theme": { "type": "string" } } }
            },
            "required": ["title", "settings", "ghost"]
        }));
        assert!(schema.shape.leaf("title").unwrap().required);
        assert!(matches!(schema.field("settings"), Some(CompiledField::Shape(_))));
        assert!(schema.field("ghost").is_none());
    }

    #[test]
    fn test_implicit_timestamps_are_added() {
        let schema = compile(json!({ "properties": {} }));
        for name in IMPLICIT_FIELDS {
            let spec = schema.shape.leaf(name).unwrap();
            assert_eq!(spec.field_type, FieldType::Timestamp);
            assert_eq!(spec.default, Some(DefaultValue::Now));
        }
    }

    #[test]
    fn test_declared_timestamps_are_replaced() {
        let schema = compile(json!({
            "properties": {
                "created_date": { "type": "string" },
                "updated_date": { "type": "string", "format": "date-time", "default": "2020-01-01T00:00:00Z" }
            }
        }));
        for name in IMPLICIT_FIELDS {
            assert_eq!(schema.shape.leaf(name), Some(&FieldSpec::timestamp_now()));
        }
    }

    #[test]
    fn test_enum_and_default_propagate() {
        let schema = compile(json!({
            "properties": {
                "priority": { "type": "string", "enum": ["low", "medium"], "default": "medium" }
            }
        }));
        let priority = schema.shape.leaf("priority").unwrap();
        assert_eq!(priority.enum_values, Some(vec![json!("low"), json!("medium")]));
        assert_eq!(priority.default, Some(DefaultValue::Literal(json!("medium"))));
    }

    #[test]
    fn test_malformed_nested_descriptor_fails() {
        let err = compile_definition(
            &definition(json!({
                "properties": { "meta": { "type": "object", "properties": { "bad": { "title": "?" } } } }
            })),
            16,
        )
        .unwrap_err();
        assert_eq!(err, CompileError::MissingKind { path: "meta.bad".to_string() });
    }
}
