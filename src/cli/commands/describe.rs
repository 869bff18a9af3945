use serde_json::json;
use std::fmt::Write;

use super::build_registry;
use crate::cli::utils::output;
use crate::cli::OutputFormat;
use crate::config::RegistryConfig;
use crate::schema::{ArrayItems, CompiledField, DefaultValue, FieldSpec, FieldType, RecordShape};

pub fn handle(kind: &str, config: RegistryConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let registry = build_registry(config);
    let Some(collection) = registry.resolve(kind) else {
        anyhow::bail!("Entity kind '{}' not found (known: {})", kind, registry.kinds().join(", "));
    };

    let mut text = format!("{}\n", collection.kind());
    render_shape(&collection.schema().shape, 1, &mut text);

    output(output_format, &text, json!(collection.schema()))
}

fn render_shape(shape: &RecordShape, depth: usize, out: &mut String) {
    for (name, field) in &shape.fields {
        let indent = "  ".repeat(depth);
        match field {
            CompiledField::Shape(nested) => {
                let _ = writeln!(out, "{}{}: object", indent, name);
                render_shape(nested, depth + 1, out);
            }
            CompiledField::Leaf(spec) => {
                let _ = writeln!(out, "{}{}: {}", indent, name, describe_leaf(spec));
                if let FieldType::Array { items: ArrayItems::Records { shape } } = &spec.field_type {
                    render_shape(shape, depth + 1, out);
                }
            }
        }
    }
}

fn type_name(field_type: &FieldType) -> String {
    match field_type {
        FieldType::Text => "text".to_string(),
        FieldType::Timestamp => "timestamp".to_string(),
        FieldType::Number => "number".to_string(),
        FieldType::Boolean => "boolean".to_string(),
        FieldType::Opaque => "any".to_string(),
        FieldType::Array { items } => match items {
            ArrayItems::Records { .. } => "array of records".to_string(),
            ArrayItems::Values { spec } => format!("array of {}", type_name(&spec.field_type)),
            ArrayItems::Opaque => "array".to_string(),
        },
    }
}

fn describe_leaf(spec: &FieldSpec) -> String {
    let mut parts = vec![type_name(&spec.field_type)];
    if spec.required {
        parts.push("required".to_string());
    }
    if spec.unique {
        parts.push("unique".to_string());
    }
    if spec.write_only {
        parts.push("write-only".to_string());
    }
    if let Some(values) = &spec.enum_values {
        parts.push(format!("enum={}", json!(values)));
    }
    match &spec.default {
        Some(DefaultValue::Literal(value)) => parts.push(format!("default={}", value)),
        Some(DefaultValue::Now) => parts.push("default=now".to_string()),
        None => {}
    }
    parts.join(" ")
}
