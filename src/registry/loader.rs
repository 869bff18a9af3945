//! Definition sources and directory discovery.

use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::schema::{DescriptorError, EntityDefinition};

const EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

#[derive(Debug, Clone)]
pub enum SourceBody {
    Json(String),
    Yaml(String),
    /// Already-parsed document (in-process sources)
    Document(Value),
    /// The source existed but could not be read
    Unreadable(String),
}

/// One descriptor document plus where it came from
#[derive(Debug, Clone)]
pub struct DefinitionSource {
    /// File path or caller-chosen label, used in logs and the build report
    pub origin: String,
    /// Kind name to use when the document carries no `name`
    pub default_name: String,
    pub body: SourceBody,
}

impl DefinitionSource {
    pub fn json(origin: impl Into<String>, text: impl Into<String>) -> Self {
        Self::labelled(origin, SourceBody::Json(text.into()))
    }

    pub fn yaml(origin: impl Into<String>, text: impl Into<String>) -> Self {
        Self::labelled(origin, SourceBody::Yaml(text.into()))
    }

    pub fn document(origin: impl Into<String>, document: Value) -> Self {
        Self::labelled(origin, SourceBody::Document(document))
    }

    fn labelled(origin: impl Into<String>, body: SourceBody) -> Self {
        let origin = origin.into();
        let default_name = Path::new(&origin)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| origin.clone());
        Self { origin, default_name, body }
    }

    /// Read a descriptor file. Read failures are carried in the source and
    /// surface later as load failures.
    pub fn from_path(path: &Path) -> Self {
        let origin = path.display().to_string();
        let is_yaml = matches!(extension(path).as_deref(), Some("yaml") | Some("yml"));

        let body = match fs::read_to_string(path) {
            Ok(text) if is_yaml => SourceBody::Yaml(text),
            Ok(text) => SourceBody::Json(text),
            Err(e) => SourceBody::Unreadable(e.to_string()),
        };
        Self::labelled(origin, body)
    }

    pub fn parse(&self) -> Result<EntityDefinition, DescriptorError> {
        match &self.body {
            SourceBody::Json(text) => EntityDefinition::from_json_str(text, &self.default_name),
            SourceBody::Yaml(text) => EntityDefinition::from_yaml_str(text, &self.default_name),
            SourceBody::Document(value) => EntityDefinition::from_value(value.clone(), &self.default_name),
            SourceBody::Unreadable(reason) => Err(DescriptorError::Unreadable(reason.clone())),
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension().map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

/// List descriptor files in `dir` (non-recursive), ordered by file name.
///
/// A missing or unreadable directory yields no sources; the registry then
/// holds only the built-in account kind.
pub fn discover(dir: &Path) -> Vec<DefinitionSource> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Definitions directory {} is not readable: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| match extension(path) {
            Some(ext) if EXTENSIONS.contains(&ext.as_str()) => true,
            _ => {
                debug!("Skipping non-descriptor file {}", path.display());
                false
            }
        })
        .collect();

    // Last-write-wins is defined over this order
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    info!("Discovered {} definition file(s) in {}", paths.len(), dir.display());
    paths.iter().map(|path| DefinitionSource::from_path(path)).collect()
}
