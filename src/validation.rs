//! Validation System - Schema Rules
//!
//! Rules produce structured violations with stable paths.
//! Every rule runs; nothing short-circuits except a non-object definition.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::definition::FieldKind;
use crate::html::json_type_name;

/// HTTP methods accepted for the external callback.
pub const HTTP_METHODS: [&str; 4] = ["POST", "PUT", "PATCH", "DELETE"];

/// Submit fields that must hold strings when present.
pub const SUBMIT_STRING_FIELDS: [&str; 7] = [
    "buttonSelector",
    "idleText",
    "pendingText",
    "successText",
    "failureText",
    "errorClass",
    "validationMessagePrefix",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaViolation {
    pub rule: String,
    /// Location of the offending value, e.g. `items[2].options`.
    pub path: String,
    pub message: String,
}

impl SchemaViolation {
    fn new(rule: &str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<SchemaViolation>,
}

impl ValidationResult {
    pub fn from_violations(violations: Vec<SchemaViolation>) -> Self {
        Self {
            valid: violations.is_empty(),
            violations,
        }
    }

    /// Error messages in traversal order.
    pub fn errors(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.message.clone()).collect()
    }
}

/// Schema rule trait - inspects a definition object and produces violations
pub trait SchemaRule {
    fn name(&self) -> &'static str;
    fn check(&self, definition: &Map<String, Value>) -> Vec<SchemaViolation>;
}

// --- Concrete Rules ---

/// `items` must be an array; each item is checked recursively.
pub struct ItemsRule;

impl SchemaRule for ItemsRule {
    fn name(&self) -> &'static str { "items" }

    fn check(&self, definition: &Map<String, Value>) -> Vec<SchemaViolation> {
        let mut violations = vec![];
        match definition.get("items") {
            Some(Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    self.check_item(item, &format!("items[{}]", index), &mut violations);
                }
            }
            _ => violations.push(SchemaViolation::new(
                self.name(),
                "items",
                r#"Form definition must include an "items" array."#,
            )),
        }
        violations
    }
}

impl ItemsRule {
    fn check_item(&self, item: &Value, path: &str, out: &mut Vec<SchemaViolation>) {
        let Some(map) = item.as_object() else {
            out.push(SchemaViolation::new(self.name(), path, format!("{} must be an object.", path)));
            return;
        };

        let tag = map.get("type").and_then(Value::as_str);
        let kind = tag.and_then(FieldKind::from_tag);
        let tag_label = tag.unwrap_or("undefined");

        if kind.is_none() {
            out.push(SchemaViolation::new(
                self.name(),
                format!("{}.type", path),
                format!(
                    "{}.type must be one of: {}.",
                    path,
                    FieldKind::supported_tags().join(", ")
                ),
            ));
        }

        let Some(kind) = kind else { return };

        if kind.requires_name() && !map.get("name").map_or(false, Value::is_string) {
            out.push(SchemaViolation::new(
                self.name(),
                format!("{}.name", path),
                format!(r#"{}.name is required for type "{}"."#, path, tag_label),
            ));
        }

        if kind.requires_options() && !map.get("options").map_or(false, Value::is_array) {
            let snapshot = serde_json::to_string(item).unwrap_or_else(|_| item.to_string());
            out.push(SchemaViolation::new(
                self.name(),
                format!("{}.options", path),
                format!(
                    r#"{}.options must be an array for type "{}" (received {}). Item: {}"#,
                    path,
                    tag_label,
                    json_type_name(map.get("options")),
                    snapshot
                ),
            ));
        }

        if kind == FieldKind::FormList {
            match map.get("item") {
                None | Some(Value::Null) => out.push(SchemaViolation::new(
                    self.name(),
                    format!("{}.item", path),
                    format!("{}.item is required for form-list.", path),
                )),
                Some(child) => self.check_item(child, &format!("{}.item", path), out),
            }
        }
    }
}

/// The optional `submit` block: callback wiring, method, string fields, headers.
pub struct SubmitRule;

impl SchemaRule for SubmitRule {
    fn name(&self) -> &'static str { "submit" }

    fn check(&self, definition: &Map<String, Value>) -> Vec<SchemaViolation> {
        let submit = match definition.get("submit") {
            None | Some(Value::Null) => return vec![],
            Some(Value::Object(submit)) => submit,
            Some(_) => {
                return vec![SchemaViolation::new(
                    self.name(),
                    "submit",
                    "submit must be an object when provided.",
                )]
            }
        };

        let mut violations = vec![];
        let mut push = |path: &str, message: String| {
            violations.push(SchemaViolation::new(self.name(), path, message));
        };

        if let Some(Value::Object(callback)) = submit.get("callback") {
            let url = first_truthy(callback, &["url", "callback_url"]);
            if !is_non_blank_string(url) {
                push("submit.callback.url", "submit.callback.url must be a non-empty string.".into());
            }
            if let Some(params) = first_truthy(callback, &["params", "callback_params"]) {
                if !params.is_object() {
                    push(
                        "submit.callback.params",
                        "submit.callback.params must be an object when provided.".into(),
                    );
                }
            }
        } else {
            if let Some(url) = submit.get("callback_url").filter(|v| !v.is_null()) {
                if !is_non_blank_string(Some(url)) {
                    push("submit.callback_url", "submit.callback_url must be a non-empty string.".into());
                }
            }
            if let Some(params) = submit.get("callback_params") {
                if !params.is_object() {
                    push(
                        "submit.callback_params",
                        "submit.callback_params must be an object when provided.".into(),
                    );
                }
            }
        }

        if let Some(persistence) = submit.get("persistence").filter(|v| !v.is_null()) {
            if !persistence.is_object() {
                push(
                    "submit.persistence",
                    "submit.persistence must be an object when provided.".into(),
                );
            }
        }

        if let Some(method) = submit.get("method") {
            if !is_http_method(method) {
                push(
                    "submit.method",
                    format!("submit.method must be one of: {}.", HTTP_METHODS.join(", ")),
                );
            }
        }

        for field in SUBMIT_STRING_FIELDS {
            if submit.get(field).map_or(false, |v| !v.is_string()) {
                push(
                    &format!("submit.{}", field),
                    format!("submit.{} must be a string when provided.", field),
                );
            }
        }

        if let Some(headers) = submit.get("headers") {
            check_header_map("submit.headers", headers, &mut push);
        }

        if let Some(method) = submit
            .get("callback")
            .and_then(|c| c.get("method"))
            .filter(|v| !v.is_null())
        {
            if !is_http_method(method) {
                push(
                    "submit.callback.method",
                    format!("submit.callback.method must be one of: {}.", HTTP_METHODS.join(", ")),
                );
            }
        }

        for (block, keys) in ALIAS_STRING_FIELDS {
            for (path, value) in aliased(submit, block, keys) {
                if !value.is_string() {
                    push(&path, format!("{} must be a string when provided.", path));
                }
            }
        }

        for (block, keys) in ALIAS_HEADER_FIELDS {
            for (path, value) in aliased(submit, block, keys) {
                check_header_map(&path, value, &mut push);
            }
        }

        violations
    }
}

/// String settings reachable through the nested blocks or flat aliases.
/// An empty block name means the `submit` object itself.
const ALIAS_STRING_FIELDS: [(&str, &[&str]); 3] = [
    (
        "",
        &["button_selector", "idle_text", "pending_text", "success_text", "failure_text", "update_text", "updateText"],
    ),
    (
        "callback",
        &[
            "button_selector", "buttonSelector", "idle_text", "idleText", "pending_text", "pendingText",
            "success_text", "successText", "failure_text", "failureText",
        ],
    ),
    ("persistence", &["update_text", "updateText"]),
];

/// Header maps reachable through the nested blocks or flat aliases.
const ALIAS_HEADER_FIELDS: [(&str, &[&str]); 3] = [
    ("", &["callback_headers", "submission_headers", "submissionHeaders"]),
    ("callback", &["headers"]),
    ("persistence", &["headers", "submission_headers"]),
];

/// Non-null values under `keys` in `block`, with their violation paths.
fn aliased<'a>(
    submit: &'a Map<String, Value>,
    block: &str,
    keys: &'a [&'a str],
) -> Vec<(String, &'a Value)> {
    let (scope, prefix) = if block.is_empty() {
        (Some(submit), "submit".to_string())
    } else {
        (
            submit.get(block).and_then(Value::as_object),
            format!("submit.{}", block),
        )
    };
    let Some(scope) = scope else { return vec![] };
    keys.iter()
        .filter_map(|key| {
            scope
                .get(*key)
                .filter(|v| !v.is_null())
                .map(|v| (format!("{}.{}", prefix, key), v))
        })
        .collect()
}

fn check_header_map(path: &str, headers: &Value, push: &mut impl FnMut(&str, String)) {
    match headers {
        Value::Object(entries) => {
            for (key, value) in entries {
                if !value.is_string() {
                    push(
                        &format!("{}[{}]", path, key),
                        format!("{}[{}] must be a string.", path, key),
                    );
                }
            }
        }
        _ => push(path, format!("{} must be an object whose values are strings.", path)),
    }
}

fn first_truthy<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| map.get(*key).filter(|v| crate::html::is_truthy(v)))
}

fn is_non_blank_string(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_str)
        .map_or(false, |s| !s.trim().is_empty())
}

pub fn is_http_method(value: &Value) -> bool {
    value
        .as_str()
        .map_or(false, |s| HTTP_METHODS.contains(&s.to_ascii_uppercase().as_str()))
}

/// Validator runs every rule in document order: items first, submit last.
pub struct Validator {
    rules: Vec<Box<dyn SchemaRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![Box::new(ItemsRule), Box::new(SubmitRule)],
        }
    }

    pub fn validate(&self, definition: &Value) -> ValidationResult {
        let Some(map) = definition.as_object() else {
            return ValidationResult::from_violations(vec![SchemaViolation::new(
                "definition",
                "",
                "Form definition must be an object.",
            )]);
        };

        let mut all_violations = vec![];
        for rule in &self.rules {
            all_violations.extend(rule.check(map));
        }

        if !all_violations.is_empty() {
            debug!(count = all_violations.len(), "form definition has schema violations");
        }
        ValidationResult::from_violations(all_violations)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate a definition; an empty list means valid.
pub fn validate_form_definition(definition: &Value) -> Vec<String> {
    Validator::new().validate(definition).errors()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_definition_is_valid() {
        let definition = json!({"items": [{"type": "input", "name": "x", "label": "X", "required": true}]});
        assert!(validate_form_definition(&definition).is_empty());
    }

    #[test]
    fn test_non_object_definition_single_error() {
        assert_eq!(
            validate_form_definition(&json!([1, 2])),
            vec!["Form definition must be an object.".to_string()]
        );
    }

    #[test]
    fn test_unknown_type_lists_supported_set() {
        let result = Validator::new().validate(&json!({"items": [{"type": "rating", "name": "r"}]}));
        assert_eq!(result.violations[0].path, "items[0].type");
        assert!(result.violations[0].message.contains("checkbox-group, date-picker, divider"));
    }

    #[test]
    fn test_options_error_reports_received_type_and_snapshot() {
        let errors = validate_form_definition(&json!({
            "items": [{"type": "select", "name": "s", "options": "a,b"}]
        }));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("items[0].options must be an array"));
        assert!(errors[0].contains("(received string)"));
        assert!(errors[0].contains(r#"Item: {"type":"select","name":"s","options":"a,b"}"#));
    }

    #[test]
    fn test_divider_needs_no_name() {
        assert!(validate_form_definition(&json!({"items": [{"type": "divider"}]})).is_empty());
    }

    #[test]
    fn test_form_list_child_path() {
        let result = Validator::new().validate(&json!({
            "items": [
                {"type": "input", "name": "a"},
                {"type": "form-list", "name": "rows", "item": {"type": "select", "name": "s"}}
            ]
        }));
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].path, "items[1].item.options");
    }

    #[test]
    fn test_errors_keep_traversal_order() {
        let errors = validate_form_definition(&json!({
            "items": [{"type": "input"}, {"type": "form-list", "name": "l"}],
            "submit": {"method": "GET", "headers": {"X-Count": 3}}
        }));
        assert_eq!(
            errors,
            vec![
                r#"items[0].name is required for type "input"."#.to_string(),
                "items[1].item is required for form-list.".to_string(),
                "submit.method must be one of: POST, PUT, PATCH, DELETE.".to_string(),
                "submit.headers[X-Count] must be a string.".to_string(),
            ]
        );
    }

    #[test]
    fn test_nested_and_alias_submit_settings_are_typed() {
        let result = Validator::new().validate(&json!({
            "items": [],
            "submit": {
                "callback": {"url": "/cb", "method": "GET", "headers": {"X-Retry": 2}, "pending_text": 5},
                "persistence": {"update_text": ["again"], "headers": "token"},
                "failure_text": false,
                "callback_headers": {"Accept": "application/json"}
            }
        }));
        let paths: Vec<&str> = result.violations.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "submit.callback.method",
                "submit.failure_text",
                "submit.callback.pending_text",
                "submit.persistence.update_text",
                "submit.callback.headers[X-Retry]",
                "submit.persistence.headers",
            ]
        );
    }

    #[test]
    fn test_null_alias_settings_are_ignored() {
        let errors = validate_form_definition(&json!({
            "items": [],
            "submit": {"callback": {"url": "/cb", "method": null, "idle_text": null}, "update_text": null}
        }));
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_callback_requires_url() {
        let errors = validate_form_definition(&json!({
            "items": [],
            "submit": {"callback": {"method": "PUT", "params": [1]}}
        }));
        assert_eq!(
            errors,
            vec![
                "submit.callback.url must be a non-empty string.".to_string(),
                "submit.callback.params must be an object when provided.".to_string(),
            ]
        );
    }

    #[test]
    fn test_flat_callback_url_and_strings() {
        let errors = validate_form_definition(&json!({
            "items": [],
            "submit": {"callback_url": "  ", "pendingText": 5, "persistence": "yes", "method": "patch"}
        }));
        assert_eq!(
            errors,
            vec![
                "submit.callback_url must be a non-empty string.".to_string(),
                "submit.persistence must be an object when provided.".to_string(),
                "submit.pendingText must be a string when provided.".to_string(),
            ]
        );
    }
}
