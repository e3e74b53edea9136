//! Hashing System - SHA-256 Fingerprints for Rendered Documents
//!
//! The same effective definition always yields the same fingerprint, so a
//! rendered page can be traced back to the inputs that produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{to_string, Value};
use sha2::{Digest, Sha256};

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    to_string(&sort_value(&v))
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                sorted
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_value(v)))
                    .collect(),
            )
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        _ => v.clone(),
    }
}

/// Fingerprint of the inputs a document was rendered from.
pub fn compute_definition_hash(definition: &Value, html_options: &Value) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(&serde_json::json!({
        "definition": definition,
        "html_options": html_options,
    }))?;
    Ok(sha256_hex(canonical.as_bytes()))
}

pub fn compute_content_hash(html: &str) -> String {
    sha256_hex(html.as_bytes())
}

/// A rendered page plus the fingerprints needed to reproduce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedDocument {
    pub html: String,
    pub content_hash: String,
    pub definition_hash: String,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub instance_id: Option<String>,
    pub rendered_at: DateTime<Utc>,
}

impl RenderedDocument {
    pub fn new(html: String, definition: &Value, html_options: &Value) -> Result<Self, serde_json::Error> {
        Ok(Self {
            content_hash: compute_content_hash(&html),
            definition_hash: compute_definition_hash(definition, html_options)?,
            html,
            template_id: None,
            instance_id: None,
            rendered_at: Utc::now(),
        })
    }

    pub fn with_template(mut self, template_id: &str) -> Self {
        self.template_id = Some(template_id.to_string());
        self
    }

    pub fn with_instance(mut self, instance_id: &str) -> Self {
        self.instance_id = Some(instance_id.to_string());
        self
    }
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}
