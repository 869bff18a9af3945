use std::collections::BTreeMap;
use thiserror::Error;

/// A definition document could not be read or parsed
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("Unreadable source: {0}")]
    Unreadable(String),

    #[error("Invalid definition format: {0}")]
    InvalidFormat(String),

    #[error("Invalid entity kind name: '{0}'")]
    InvalidName(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A descriptor parsed but cannot be compiled
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("Field '{path}' has neither a type nor items/properties")]
    MissingKind { path: String },

    #[error("Field '{path}' is inconsistent: {reason}")]
    Conflict { path: String, reason: String },

    #[error("Field '{path}' nests deeper than {max_depth} levels")]
    TooDeep { path: String, max_depth: usize },
}

/// A record failed validation against its compiled schema.
/// Field paths use dots for nesting and `[n]` for array elements.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Validation failed: {}", summarize(.field_errors))]
pub struct ValidationError {
    pub field_errors: BTreeMap<String, String>,
}

impl ValidationError {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut field_errors = BTreeMap::new();
        field_errors.insert(field.into(), message.into());
        Self { field_errors }
    }
}

fn summarize(field_errors: &BTreeMap<String, String>) -> String {
    field_errors
        .iter()
        .map(|(field, message)| format!("{}: {}", field, message))
        .collect::<Vec<_>>()
        .join("; ")
}
