//! Declarative type descriptors as authored in entity definition files.
//!
//! `RawDescriptor` mirrors the on-disk JSON/YAML shape one-to-one. It is
//! classified into the tagged [`TypeDescriptor`] before compilation, which is
//! where conflicting or missing kind information is rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::error::{CompileError, DescriptorError};

/// `type` may be a single kind or a JSON-Schema style union (`["string", "null"]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KindSpec {
    Single(String),
    Union(Vec<String>),
}

impl KindSpec {
    /// First non-null member of the kind
    pub fn primary(&self) -> Option<&str> {
        match self {
            KindSpec::Single(kind) => Some(kind.as_str()),
            KindSpec::Union(kinds) => kinds.iter().map(String::as_str).find(|k| *k != "null"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDescriptor {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<KindSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<RawDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, RawDescriptor>>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unique: bool,
    #[serde(rename = "writeOnly", default, skip_serializing_if = "std::ops::Not::not")]
    pub write_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Leaf-level metadata shared by every non-object descriptor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub enum_values: Option<Vec<Value>>,
    pub default: Option<Value>,
    pub unique: bool,
    pub write_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    String,
    Number,
    Integer,
    Boolean,
}

/// Classified descriptor. Exhaustive over everything the compiler handles,
/// including the permissive `Unknown` fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Primitive {
        kind: PrimitiveKind,
        format: Option<String>,
        constraints: Constraints,
    },
    Array {
        items: Option<Box<TypeDescriptor>>,
        constraints: Constraints,
    },
    Object {
        properties: BTreeMap<String, TypeDescriptor>,
    },
    Unknown {
        kind: String,
        constraints: Constraints,
    },
}

impl RawDescriptor {
    fn constraints(&self) -> Constraints {
        Constraints {
            enum_values: self.enum_values.clone(),
            default: self.default.clone(),
            unique: self.unique,
            write_only: self.write_only,
        }
    }

    /// Classify into a [`TypeDescriptor`], recursively.
    ///
    /// `path` names the field for error messages; `depth` is the current
    /// nesting level and is bounded by `max_depth`.
    pub fn classify(
        &self,
        path: &str,
        depth: usize,
        max_depth: usize,
    ) -> Result<TypeDescriptor, CompileError> {
        if depth > max_depth {
            return Err(CompileError::TooDeep { path: path.to_string(), max_depth });
        }

        let kind = self.kind.as_ref().and_then(KindSpec::primary);

        match kind {
            Some("string") => self.primitive(PrimitiveKind::String, path),
            Some("number") => self.primitive(PrimitiveKind::Number, path),
            Some("integer") => self.primitive(PrimitiveKind::Integer, path),
            Some("boolean") => self.primitive(PrimitiveKind::Boolean, path),
            Some("array") => {
                if self.properties.is_some() {
                    return Err(CompileError::Conflict {
                        path: path.to_string(),
                        reason: "array descriptor cannot declare properties".to_string(),
                    });
                }
                self.array(path, depth, max_depth)
            }
            Some("object") => {
                if self.items.is_some() {
                    return Err(CompileError::Conflict {
                        path: path.to_string(),
                        reason: "object descriptor cannot declare items".to_string(),
                    });
                }
                self.object(path, depth, max_depth)
            }
            Some(other) => Ok(TypeDescriptor::Unknown {
                kind: other.to_string(),
                constraints: self.constraints(),
            }),
            // No kind: infer from structure, or give up
            None => match (&self.items, &self.properties) {
                (Some(_), Some(_)) => Err(CompileError::Conflict {
                    path: path.to_string(),
                    reason: "descriptor declares both items and properties".to_string(),
                }),
                (Some(_), None) => self.array(path, depth, max_depth),
                (None, Some(_)) => self.object(path, depth, max_depth),
                (None, None) => Err(CompileError::MissingKind { path: path.to_string() }),
            },
        }
    }

    fn primitive(&self, kind: PrimitiveKind, path: &str) -> Result<TypeDescriptor, CompileError> {
        if self.items.is_some() || self.properties.is_some() {
            return Err(CompileError::Conflict {
                path: path.to_string(),
                reason: "primitive descriptor cannot declare items or properties".to_string(),
            });
        }
        Ok(TypeDescriptor::Primitive {
            kind,
            format: self.format.clone(),
            constraints: self.constraints(),
        })
    }

    fn array(&self, path: &str, depth: usize, max_depth: usize) -> Result<TypeDescriptor, CompileError> {
        let items = match &self.items {
            Some(items) => {
                let item_path = format!("{}[]", path);
                Some(Box::new(items.classify(&item_path, depth + 1, max_depth)?))
            }
            None => None,
        };
        Ok(TypeDescriptor::Array { items, constraints: self.constraints() })
    }

    fn object(&self, path: &str, depth: usize, max_depth: usize) -> Result<TypeDescriptor, CompileError> {
        let mut properties = BTreeMap::new();
        if let Some(raw_properties) = &self.properties {
            for (name, raw) in raw_properties {
                let child_path = if path.is_empty() { name.clone() } else { format!("{}.{}", path, name) };
                properties.insert(name.clone(), raw.classify(&child_path, depth + 1, max_depth)?);
            }
        }
        Ok(TypeDescriptor::Object { properties })
    }
}

/// One entity kind as declared by a descriptor document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, RawDescriptor>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl EntityDefinition {
    /// Parse a definition document. `fallback_name` is used when the document
    /// does not carry its own `name`.
    pub fn from_value(value: Value, fallback_name: &str) -> Result<Self, DescriptorError> {
        if !value.is_object() {
            return Err(DescriptorError::InvalidFormat(
                "definition document must be an object".to_string(),
            ));
        }

        let mut definition: EntityDefinition = serde_json::from_value(value)?;
        if definition.name.trim().is_empty() {
            definition.name = fallback_name.to_string();
        }
        definition.name = definition.name.trim().to_string();

        if let Some(kind) = &definition.kind {
            if kind != "object" {
                return Err(DescriptorError::InvalidFormat(format!(
                    "definition '{}' must be of type object, found '{}'",
                    definition.name, kind
                )));
            }
        }

        if !is_valid_kind_name(&definition.name) {
            return Err(DescriptorError::InvalidName(definition.name));
        }

        Ok(definition)
    }

    pub fn from_json_str(text: &str, fallback_name: &str) -> Result<Self, DescriptorError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value, fallback_name)
    }

    pub fn from_yaml_str(text: &str, fallback_name: &str) -> Result<Self, DescriptorError> {
        let value: Value = serde_yaml::from_str(text)?;
        Self::from_value(value, fallback_name)
    }

    pub fn is_required(&self, field: &str) -> bool {
        self.required.iter().any(|r| r == field)
    }
}

/// Entity kind names double as storage table names
pub fn is_valid_kind_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
