//! Template Registry - Stored Definitions and Their Instances
//!
//! Templates carry a form definition plus default html options; instances
//! point at a template and carry the runtime override object that the merger
//! applies at render time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::validation::validate_form_definition;

pub type TemplateId = String;
pub type InstanceId = String;

pub const SHORT_ID_LENGTH: usize = 9;
const SHORT_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
/// UUID v4 bytes 6 and 8 hold version/variant bits.
const RANDOM_BYTE_INDICES: [usize; SHORT_ID_LENGTH] = [0, 1, 2, 3, 4, 5, 7, 9, 10];
pub const INSTANCES_DIR: &str = "instances";

/// Random 9-character id from lowercase letters and digits.
pub fn generate_short_id() -> String {
    let uuid = Uuid::new_v4();
    let bytes = uuid.as_bytes();
    RANDOM_BYTE_INDICES
        .iter()
        .map(|&i| SHORT_ID_ALPHABET[bytes[i] as usize % SHORT_ID_ALPHABET.len()] as char)
        .collect()
}

fn default_version() -> u32 {
    1
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Template conflict: {0}")]
    Conflict(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Instance conflict: {0}")]
    InstanceConflict(String),

    #[error("template_id or template_slug is required.")]
    MissingTemplateReference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormTemplate {
    pub id: TemplateId,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
    pub definition: Value,
    #[serde(default = "empty_object")]
    pub html_options: Value,
    #[serde(default = "default_version")]
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A template before it is stored: id and slug may still be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDraft {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
    pub definition: Value,
    #[serde(default = "empty_object")]
    pub html_options: Value,
    #[serde(default = "default_version")]
    pub version: u32,
}

impl TemplateDraft {
    pub fn new(title: impl Into<String>, definition: Value) -> Self {
        Self {
            id: None,
            slug: None,
            title: title.into(),
            description: None,
            theme: None,
            definition,
            html_options: empty_object(),
            version: default_version(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormInstance {
    pub id: InstanceId,
    pub template_id: TemplateId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "empty_object")]
    pub runtime_config: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An instance before it is stored. It must reference its template by id or slug.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceDraft {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub template_slug: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "empty_object")]
    pub runtime_config: Value,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// In-memory template and instance store.
pub struct TemplateRegistry {
    templates: HashMap<TemplateId, FormTemplate>,
    slugs: HashMap<String, TemplateId>,
    instances: HashMap<InstanceId, FormInstance>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
            slugs: HashMap::new(),
            instances: HashMap::new(),
        }
    }

    /// Load `*.json` template drafts from `dir` and instance drafts from
    /// `dir/instances`. Files that cannot be read, parsed or registered are
    /// skipped with a warning.
    pub fn load_from_dir(dir: &Path) -> Result<Self, std::io::Error> {
        let mut registry = Self::new();
        if !dir.exists() {
            debug!(dir = %dir.display(), "Template directory missing, starting empty");
            return Ok(registry);
        }

        for path in json_files(dir)? {
            let Some(draft) = read_json::<TemplateDraft>(&path) else {
                continue;
            };
            let errors = validate_form_definition(&draft.definition);
            if !errors.is_empty() {
                warn!(path = %path.display(), errors = ?errors, "Skipping template with invalid definition");
                continue;
            }
            if let Err(e) = registry.create_template(draft) {
                warn!(path = %path.display(), error = %e, "Skipping template");
            }
        }

        let instances_dir = dir.join(INSTANCES_DIR);
        if instances_dir.is_dir() {
            for path in json_files(&instances_dir)? {
                let Some(draft) = read_json::<InstanceDraft>(&path) else {
                    continue;
                };
                if let Err(e) = registry.create_instance(draft) {
                    warn!(path = %path.display(), error = %e, "Skipping instance");
                }
            }
        }

        debug!(
            templates = registry.templates.len(),
            instances = registry.instances.len(),
            "Loaded template registry"
        );
        Ok(registry)
    }

    /// Store a template. The definition is not validated here.
    pub fn create_template(&mut self, draft: TemplateDraft) -> Result<FormTemplate, RegistryError> {
        let id = non_empty(&draft.id)
            .map(str::to_string)
            .unwrap_or_else(generate_short_id);
        let slug = non_empty(&draft.slug)
            .map(str::to_string)
            .unwrap_or_else(|| id.clone());

        if self.templates.contains_key(&id) {
            return Err(RegistryError::Conflict(format!("id '{}' already exists", id)));
        }
        if self.slugs.contains_key(&slug) {
            return Err(RegistryError::Conflict(format!("slug '{}' already exists", slug)));
        }

        let now = Utc::now();
        let template = FormTemplate {
            id: id.clone(),
            slug: slug.clone(),
            title: draft.title,
            description: draft.description,
            theme: draft.theme,
            definition: draft.definition,
            html_options: if draft.html_options.is_object() {
                draft.html_options
            } else {
                empty_object()
            },
            version: draft.version,
            created_at: now,
            updated_at: now,
        };
        self.slugs.insert(slug, id.clone());
        self.templates.insert(id, template.clone());
        Ok(template)
    }

    /// Look a template up by id, then by slug.
    pub fn get(&self, identifier: &str) -> Option<&FormTemplate> {
        self.templates.get(identifier).or_else(|| {
            self.slugs
                .get(identifier)
                .and_then(|id| self.templates.get(id))
        })
    }

    /// Templates ordered by slug.
    pub fn list(&self) -> Vec<&FormTemplate> {
        let mut templates: Vec<_> = self.templates.values().collect();
        templates.sort_by(|a, b| a.slug.cmp(&b.slug));
        templates
    }

    /// Remove a template and every instance that points at it.
    pub fn remove(&mut self, identifier: &str) -> Option<FormTemplate> {
        let id = self.get(identifier)?.id.clone();
        let template = self.templates.remove(&id)?;
        self.slugs.remove(&template.slug);
        self.instances.retain(|_, instance| instance.template_id != id);
        Some(template)
    }

    pub fn create_instance(&mut self, draft: InstanceDraft) -> Result<FormInstance, RegistryError> {
        let reference = non_empty(&draft.template_id)
            .or_else(|| non_empty(&draft.template_slug))
            .ok_or(RegistryError::MissingTemplateReference)?;
        let template_id = self
            .get(reference)
            .map(|t| t.id.clone())
            .ok_or_else(|| RegistryError::TemplateNotFound(reference.to_string()))?;

        let id = non_empty(&draft.id)
            .map(str::to_string)
            .unwrap_or_else(generate_short_id);
        if self.instances.contains_key(&id) {
            return Err(RegistryError::InstanceConflict(format!("id '{}' already exists", id)));
        }

        let now = Utc::now();
        let instance = FormInstance {
            id: id.clone(),
            template_id,
            name: draft.name,
            runtime_config: if draft.runtime_config.is_object() {
                draft.runtime_config
            } else {
                empty_object()
            },
            created_at: now,
            updated_at: now,
        };
        self.instances.insert(id, instance.clone());
        Ok(instance)
    }

    pub fn get_instance(&self, id: &str) -> Option<&FormInstance> {
        self.instances.get(id)
    }

    /// Instances of one template (or all), oldest first.
    pub fn list_instances(&self, template_id: Option<&str>) -> Vec<&FormInstance> {
        let mut instances: Vec<_> = self
            .instances
            .values()
            .filter(|i| template_id.map_or(true, |t| i.template_id == t))
            .collect();
        instances.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        instances
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().map_or(false, |e| e == "json") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Option<T> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping unreadable file");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping malformed file");
            None
        }
    }
}
