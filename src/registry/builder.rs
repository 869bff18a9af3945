use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::loader::{discover, DefinitionSource};
use super::Registry;
use crate::config::RegistryConfig;
use crate::database::{Collection, RecordStore};
use crate::schema::builtin::{account_definition, DEFAULT_ROLE, LOGIN_FIELD, ROLE_FIELD, SECRET_FIELD};
use crate::schema::{
    compile_definition, CompiledField, CompiledSchema, DefaultValue, EntityDefinition, FieldSpec, FieldType,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Load,
    Compile,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Load => "load",
            FailureStage::Compile => "compile",
        }
    }
}

/// A definition that was skipped
#[derive(Debug, Clone, Serialize)]
pub struct BuildFailure {
    pub origin: String,
    pub stage: FailureStage,
    pub error: String,
}

/// Two sources declared the same kind; `winner` replaced `replaced`
#[derive(Debug, Clone, Serialize)]
pub struct Collision {
    pub kind: String,
    pub replaced: String,
    pub winner: String,
}

/// Outcome of a registry build, kept on the registry for health and CLI output
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    /// Kind name to the origin that supplied it
    pub loaded: BTreeMap<String, String>,
    pub collisions: Vec<Collision>,
    pub failures: Vec<BuildFailure>,
    /// The account kind was synthesized from the built-in definition
    pub fallback_used: bool,
    /// Built-in fields merged into, or flags forced on, a supplied account
    /// definition (`password`, `email.unique`, `role.default`)
    pub augmented_fields: Vec<String>,
}

impl BuildReport {
    pub fn is_clean(&self) -> bool {
        self.collisions.is_empty() && self.failures.is_empty()
    }
}

struct Accepted {
    definition: EntityDefinition,
    schema: CompiledSchema,
    origin: String,
}

/// Collects definition sources and builds a [`Registry`] once.
pub struct RegistryBuilder {
    config: RegistryConfig,
    store: Arc<dyn RecordStore>,
    sources: Vec<DefinitionSource>,
}

impl RegistryBuilder {
    pub fn new(config: RegistryConfig, store: Arc<dyn RecordStore>) -> Self {
        Self { config, store, sources: Vec::new() }
    }

    pub fn source(mut self, source: DefinitionSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn sources(mut self, sources: impl IntoIterator<Item = DefinitionSource>) -> Self {
        self.sources.extend(sources);
        self
    }

    /// Append every descriptor file from the configured definitions directory
    pub fn discover(self) -> Self {
        let found = discover(&self.config.definitions_dir);
        self.sources(found)
    }

    /// Compile every source in order, then guarantee the account kind.
    /// Never fails: bad definitions are skipped and reported.
    pub fn build(self) -> Registry {
        let RegistryBuilder { config, store, sources } = self;
        let mut report = BuildReport::default();
        let mut accepted: BTreeMap<String, Accepted> = BTreeMap::new();

        for source in sources {
            let definition = match source.parse() {
                Ok(definition) => definition,
                Err(e) => {
                    error!("Skipping definition {}: {}", source.origin, e);
                    report.failures.push(BuildFailure {
                        origin: source.origin,
                        stage: FailureStage::Load,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let schema = match compile_definition(&definition, config.max_descriptor_depth) {
                Ok(schema) => schema,
                Err(e) => {
                    error!("Skipping definition '{}' from {}: {}", definition.name, source.origin, e);
                    report.failures.push(BuildFailure {
                        origin: source.origin,
                        stage: FailureStage::Compile,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            info!(
                "Compiled '{}' from {} ({} fields)",
                schema.name,
                source.origin,
                schema.shape.fields.len()
            );

            let kind = schema.name.clone();
            let winner = source.origin;
            let entry = Accepted { definition, schema, origin: winner.clone() };
            if let Some(previous) = accepted.insert(kind.clone(), entry) {
                warn!(
                    "Entity kind '{}' from {} replaces the one from {}",
                    kind, winner, previous.origin
                );
                report.collisions.push(Collision { kind, replaced: previous.origin, winner });
            }
        }

        // Runs against the final map, after every source was seen
        ensure_account_kind(&config, &mut accepted, &mut report);

        let mut collections = HashMap::with_capacity(accepted.len());
        for (kind, entry) in accepted {
            report.loaded.insert(kind.clone(), entry.origin);
            collections.insert(kind, Arc::new(Collection::new(entry.schema, store.clone())));
        }

        info!(
            "Registry ready: {} kind(s), {} failure(s), {} collision(s)",
            collections.len(),
            report.failures.len(),
            report.collisions.len()
        );

        Registry::from_parts(collections, config.reserved_kind, store, report)
    }
}

const BUILTIN_ORIGIN: &str = "<built-in>";

fn ensure_account_kind(
    config: &RegistryConfig,
    accepted: &mut BTreeMap<String, Accepted>,
    report: &mut BuildReport,
) {
    let reserved = config.reserved_kind.as_str();
    let builtin = account_definition(reserved);

    if let Some(entry) = accepted.get_mut(reserved) {
        match conform_account(entry, &builtin, config.max_descriptor_depth) {
            Ok(changes) => {
                if !changes.is_empty() {
                    warn!(
                        "Account kind '{}' from {} adjusted for authentication: {}",
                        reserved,
                        entry.origin,
                        changes.join(", ")
                    );
                }
                report.augmented_fields = changes;
                return;
            }
            Err(reason) => {
                error!(
                    "Account kind '{}' from {} is unusable ({}); using the built-in account definition",
                    reserved, entry.origin, reason
                );
            }
        }
    } else {
        warn!("No usable '{}' definition loaded; using the built-in account definition", reserved);
    }

    match compile_definition(&builtin, config.max_descriptor_depth) {
        Ok(schema) => {
            accepted.insert(
                reserved.to_string(),
                Accepted { definition: builtin, schema, origin: BUILTIN_ORIGIN.to_string() },
            );
            report.fallback_used = true;
        }
        Err(e) => {
            // The built-in document is static and flat
            error!("Built-in account definition failed to compile: {}", e);
        }
    }
}

/// Merge missing built-in fields into a supplied account kind, then force
/// the flags authentication relies on. Returns one note per change.
fn conform_account(entry: &mut Accepted, builtin: &EntityDefinition, max_depth: usize) -> Result<Vec<String>, String> {
    let (merged, mut changes) = merge_account_fields(&entry.definition, builtin);
    let mut schema = if changes.is_empty() {
        entry.schema.clone()
    } else {
        compile_definition(&merged, max_depth).map_err(|e| e.to_string())?
    };

    changes.extend(enforce_account_contract(&mut schema)?);

    entry.definition = merged;
    entry.schema = schema;
    Ok(changes)
}

fn account_leaf<'a>(schema: &'a mut CompiledSchema, name: &str) -> Result<&'a mut FieldSpec, String> {
    match schema.shape.fields.get_mut(name) {
        Some(CompiledField::Leaf(spec)) if matches!(spec.field_type, FieldType::Text | FieldType::Opaque) => Ok(spec),
        _ => Err(format!("'{}' must be a text field", name)),
    }
}

/// Login is unique, the secret is write-only and the role has a non-null default
fn enforce_account_contract(schema: &mut CompiledSchema) -> Result<Vec<String>, String> {
    let mut forced = Vec::new();

    let login = account_leaf(schema, LOGIN_FIELD)?;
    if !login.unique {
        login.unique = true;
        forced.push(format!("{}.unique", LOGIN_FIELD));
    }

    let secret = account_leaf(schema, SECRET_FIELD)?;
    if !secret.write_only {
        secret.write_only = true;
        forced.push(format!("{}.writeOnly", SECRET_FIELD));
    }

    let role = account_leaf(schema, ROLE_FIELD)?;
    if matches!(role.default, None | Some(DefaultValue::Literal(Value::Null))) {
        let fallback = Value::String(DEFAULT_ROLE.to_string());
        let default = match &role.enum_values {
            Some(values) if !values.contains(&fallback) => values
                .iter()
                .find(|value| value.is_string())
                .cloned()
                .ok_or_else(|| format!("'{}' enum has no text value to default to", ROLE_FIELD))?,
            _ => fallback,
        };
        role.default = Some(DefaultValue::Literal(default));
        forced.push(format!("{}.default", ROLE_FIELD));
    }

    Ok(forced)
}

/// Add built-in account fields missing from `supplied`; supplied fields win.
fn merge_account_fields(supplied: &EntityDefinition, builtin: &EntityDefinition) -> (EntityDefinition, Vec<String>) {
    let mut merged = supplied.clone();
    let mut added = Vec::new();

    for (name, descriptor) in &builtin.properties {
        if merged.properties.contains_key(name) {
            continue;
        }
        merged.properties.insert(name.clone(), descriptor.clone());
        if builtin.is_required(name) && !merged.is_required(name) {
            merged.required.push(name.clone());
        }
        added.push(name.clone());
    }

    (merged, added)
}
