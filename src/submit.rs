//! Submit Script Generator
//!
//! The canonical submit block is turned into a [`SubmitConfig`] and embedded,
//! as script-safe JSON, into a fixed browser runtime.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::html::{is_truthy, value_text};

const SUBMIT_RUNTIME_TEMPLATE: &str = include_str!("assets/submit_runtime.js");
const CONFIG_PLACEHOLDER: &str = "__CONFIG_JSON__";

pub const DEFAULT_BUTTON_SELECTOR: &str = r#"button[type="submit"]"#;
pub const DEFAULT_PENDING_TEXT: &str = "提交中...";
pub const DEFAULT_SUCCESS_TEXT: &str = "提交成功";
pub const DEFAULT_FAILURE_TEXT: &str = "提交失败";
pub const DEFAULT_ERROR_CLASS: &str = "field-error";
pub const DEFAULT_VALIDATION_PREFIX: &str = "Please fill all required fields: ";

/// Headers sent with every callback request unless overridden.
pub const DEFAULT_CALLBACK_HEADERS: [(&str, &str); 2] = [
    ("Accept", "application/json, text/x-json"),
    ("Content-Type", "application/json"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 4] = [
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ];

    /// Case-insensitive parse of a method name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(name.trim()))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// Configuration object handed to the browser runtime. Field names are the
/// keys the runtime reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitConfig {
    pub callback_url: Option<String>,
    pub method: HttpMethod,
    pub callback_params: Map<String, Value>,
    pub headers: Map<String, Value>,
    #[serde(rename = "buttonSelector")]
    pub button_selector: String,
    #[serde(rename = "idleText")]
    pub idle_text: Option<String>,
    #[serde(rename = "pendingText")]
    pub pending_text: String,
    #[serde(rename = "successText")]
    pub success_text: String,
    #[serde(rename = "failureText")]
    pub failure_text: String,
    #[serde(rename = "errorClass")]
    pub error_class: String,
    #[serde(rename = "validationMessagePrefix")]
    pub validation_message_prefix: String,
    #[serde(rename = "submissionEndpoint")]
    pub submission_endpoint: Option<String>,
    #[serde(rename = "submissionHeaders")]
    pub submission_headers: Map<String, Value>,
    #[serde(rename = "submissionId")]
    pub submission_id: Option<String>,
    #[serde(rename = "loadSubmissionOnInit")]
    pub load_submission_on_init: bool,
    #[serde(rename = "updateText")]
    pub update_text: Option<String>,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self::from_map(&Map::new())
    }
}

fn string_or(map: &Map<String, Value>, key: &str, fallback: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn non_empty_string(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn object(map: &Map<String, Value>, key: &str) -> Map<String, Value> {
    map.get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

impl SubmitConfig {
    /// Build from a normalized `submit` block. Missing or mistyped keys take
    /// their defaults; nothing here fails.
    pub fn from_map(submit: &Map<String, Value>) -> Self {
        let method = match submit.get("method") {
            None | Some(Value::Null) => HttpMethod::default(),
            Some(raw) => HttpMethod::parse(&value_text(raw)).unwrap_or_else(|| {
                warn!(method = %raw, "Unsupported submit method, using POST");
                HttpMethod::default()
            }),
        };

        let mut headers: Map<String, Value> = DEFAULT_CALLBACK_HEADERS
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        for (key, value) in object(submit, "headers") {
            headers.insert(key, value);
        }

        SubmitConfig {
            callback_url: non_empty_string(submit, "callback_url"),
            method,
            callback_params: object(submit, "callback_params"),
            headers,
            button_selector: string_or(submit, "buttonSelector", DEFAULT_BUTTON_SELECTOR),
            idle_text: submit
                .get("idleText")
                .and_then(Value::as_str)
                .map(str::to_string),
            pending_text: string_or(submit, "pendingText", DEFAULT_PENDING_TEXT),
            success_text: string_or(submit, "successText", DEFAULT_SUCCESS_TEXT),
            failure_text: string_or(submit, "failureText", DEFAULT_FAILURE_TEXT),
            error_class: string_or(submit, "errorClass", DEFAULT_ERROR_CLASS),
            validation_message_prefix: submit
                .get("validationMessagePrefix")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_VALIDATION_PREFIX)
                .to_string(),
            submission_endpoint: non_empty_string(submit, "submissionEndpoint"),
            submission_headers: object(submit, "submissionHeaders"),
            submission_id: submit
                .get("submissionId")
                .filter(|v| v.is_string() || v.is_number())
                .map(value_text)
                .filter(|s| !s.is_empty()),
            load_submission_on_init: submit
                .get("loadSubmissionOnInit")
                .map_or(true, is_truthy),
            update_text: non_empty_string(submit, "updateText"),
        }
    }

    pub fn from_value(submit: &Value) -> Self {
        submit.as_object().map(Self::from_map).unwrap_or_default()
    }
}

/// Escape serialized JSON so it can sit inside a `<script>` element.
pub fn escape_script_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for ch in json.chars() {
        match ch {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn to_script_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    Ok(escape_script_json(&serde_json::to_string(value)?))
}

/// Render the submit runtime with `config` embedded.
pub fn build_submit_script(config: &SubmitConfig) -> Result<String, serde_json::Error> {
    let json = to_script_json(config)?;
    Ok(SUBMIT_RUNTIME_TEMPLATE.replacen(CONFIG_PLACEHOLDER, &json, 1))
}
