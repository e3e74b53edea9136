//! Runtime Config Merger - Effective Definitions for Instances
//!
//! A template's stored definition is combined with an instance's runtime
//! override object, then the `submit` block is folded into its canonical
//! shape. Historical spellings live in one alias table; sources are applied
//! tier by tier and the first writer of a canonical key wins.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::html::is_truthy;

/// Label the runtime switches the submit button to after loading a stored submission.
pub const DEFAULT_UPDATE_TEXT: &str = "更新";

/// Where a canonical submit key got its value. Declaration order is
/// precedence order: an earlier source is never overwritten by a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitSource {
    /// Canonical key already present in the submit block, or the legacy
    /// `persistenceEndpoint` renamed in place.
    Explicit,
    /// Nested `callback` / `persistence` sub-object.
    Nested,
    /// Flat snake_case (or legacy camelCase) alias.
    Alias,
    /// `/forms/{instanceId}/submissions`.
    Synthesized,
    /// `runtimeConfig.submission`.
    Runtime,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Flat,
    Callback,
    Persistence,
    Submission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Accept {
    /// Any non-null value.
    Present,
    /// Script-truthy values only.
    Truthy,
    /// Any non-null value, coerced to a boolean.
    Flag,
}

struct AliasRule {
    canonical: &'static str,
    source: SubmitSource,
    block: Block,
    keys: &'static [&'static str],
    accept: Accept,
}

const fn rule(
    canonical: &'static str,
    source: SubmitSource,
    block: Block,
    keys: &'static [&'static str],
    accept: Accept,
) -> AliasRule {
    AliasRule { canonical, source, block, keys, accept }
}

use Accept::{Flag, Present, Truthy};
use Block::{Callback, Flat, Persistence, Submission};
use SubmitSource::{Alias, Nested, Runtime};

const ALIAS_RULES: &[AliasRule] = &[
    rule("callback_url", Nested, Callback, &["url", "callback_url"], Truthy),
    rule("method", Nested, Callback, &["method"], Truthy),
    rule("headers", Nested, Callback, &["headers"], Truthy),
    rule("callback_params", Nested, Callback, &["params", "callback_params"], Truthy),
    rule("buttonSelector", Nested, Callback, &["button_selector", "buttonSelector"], Truthy),
    rule("idleText", Nested, Callback, &["idle_text", "idleText"], Present),
    rule("pendingText", Nested, Callback, &["pending_text", "pendingText"], Present),
    rule("successText", Nested, Callback, &["success_text", "successText"], Present),
    rule("failureText", Nested, Callback, &["failure_text", "failureText"], Present),
    rule(
        "submissionEndpoint",
        Nested,
        Persistence,
        &["endpoint", "url", "submission_endpoint", "submit_url"],
        Truthy,
    ),
    rule("submissionHeaders", Nested, Persistence, &["headers", "submission_headers"], Truthy),
    rule(
        "loadSubmissionOnInit",
        Nested,
        Persistence,
        &["load_on_init", "loadSubmissionOnInit"],
        Flag,
    ),
    rule("updateText", Nested, Persistence, &["update_text", "updateText"], Present),
    rule("submissionId", Nested, Persistence, &["submission_id", "submissionId"], Present),
    rule("submissionEndpoint", Alias, Flat, &["submit_url", "persistence_endpoint"], Truthy),
    rule("submissionHeaders", Alias, Flat, &["submission_headers"], Truthy),
    rule("headers", Alias, Flat, &["callback_headers"], Truthy),
    rule("buttonSelector", Alias, Flat, &["button_selector"], Truthy),
    rule("idleText", Alias, Flat, &["idle_text"], Present),
    rule("pendingText", Alias, Flat, &["pending_text"], Present),
    rule("successText", Alias, Flat, &["success_text"], Present),
    rule("failureText", Alias, Flat, &["failure_text"], Present),
    rule("callback_url", Alias, Flat, &["callbackUrl"], Truthy),
    rule("callback_params", Alias, Flat, &["callbackParams"], Truthy),
    rule("updateText", Alias, Flat, &["update_text"], Present),
    rule("submissionId", Alias, Flat, &["submission_id"], Present),
    rule("submissionEndpoint", Runtime, Submission, &["endpoint"], Truthy),
    rule("submissionHeaders", Runtime, Submission, &["headers"], Truthy),
    rule("loadSubmissionOnInit", Runtime, Submission, &["loadOnInit", "load_on_init"], Flag),
    rule("updateText", Runtime, Submission, &["updateText", "update_text"], Present),
    rule("submissionId", Runtime, Submission, &["submissionId", "submission_id"], Present),
];

/// Record of which source filled each canonical key during normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubmitProvenance {
    entries: Vec<(String, SubmitSource)>,
}

impl SubmitProvenance {
    fn record(&mut self, key: &str, source: SubmitSource) {
        self.entries.push((key.to_string(), source));
    }

    pub fn source_of(&self, key: &str) -> Option<SubmitSource> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, source)| *source)
    }

    pub fn entries(&self) -> &[(String, SubmitSource)] {
        &self.entries
    }
}

/// The definition and html options an instance actually renders with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveDefinition {
    pub definition: Value,
    pub html_options: Value,
    #[serde(skip)]
    pub provenance: SubmitProvenance,
}

fn is_set(map: &Map<String, Value>, key: &str) -> bool {
    map.get(key).map_or(false, |value| !value.is_null())
}

fn accepted(value: &Value, accept: Accept) -> Option<Value> {
    match accept {
        Present if !value.is_null() => Some(value.clone()),
        Truthy if is_truthy(value) => Some(value.clone()),
        Flag if !value.is_null() => Some(Value::Bool(is_truthy(value))),
        _ => None,
    }
}

fn source_block<'a>(
    block: Block,
    submit: &'a Map<String, Value>,
    runtime: Option<&'a Map<String, Value>>,
) -> Option<&'a Map<String, Value>> {
    match block {
        Flat => Some(submit),
        Callback => submit.get("callback").and_then(Value::as_object),
        Persistence => submit.get("persistence").and_then(Value::as_object),
        Submission => runtime
            .and_then(|r| r.get("submission"))
            .and_then(Value::as_object),
    }
}

fn apply_tier(
    submit: &mut Map<String, Value>,
    runtime: Option<&Map<String, Value>>,
    tier: SubmitSource,
    provenance: &mut SubmitProvenance,
) {
    for rule in ALIAS_RULES.iter().filter(|rule| rule.source == tier) {
        if is_set(submit, rule.canonical) {
            continue;
        }
        let found = source_block(rule.block, submit, runtime).and_then(|block| {
            rule.keys
                .iter()
                .filter_map(|key| block.get(*key))
                .find_map(|value| accepted(value, rule.accept))
        });
        if let Some(value) = found {
            submit.insert(rule.canonical.to_string(), value);
            provenance.record(rule.canonical, tier);
        }
    }
}

/// Fold a raw `submit` block into canonical keys, in place.
///
/// Order: keys already present, legacy `persistenceEndpoint`, nested
/// `callback`/`persistence` objects, flat aliases, the synthesized
/// submissions endpoint (only for a non-empty `instance_id`), then
/// `runtime.submission`.
pub fn normalize_submit_config(
    submit: &mut Map<String, Value>,
    runtime: Option<&Map<String, Value>>,
    instance_id: Option<&str>,
) -> SubmitProvenance {
    let mut provenance = SubmitProvenance::default();

    for (key, value) in submit.iter() {
        if !value.is_null() {
            provenance.record(key, SubmitSource::Explicit);
        }
    }

    if let Some(legacy) = submit.remove("persistenceEndpoint") {
        if !is_set(submit, "submissionEndpoint") && is_truthy(&legacy) {
            submit.insert("submissionEndpoint".to_string(), legacy);
            provenance.record("submissionEndpoint", SubmitSource::Explicit);
        }
    }

    apply_tier(submit, runtime, Nested, &mut provenance);
    apply_tier(submit, runtime, Alias, &mut provenance);

    if let Some(id) = instance_id.filter(|id| !id.is_empty()) {
        if !is_set(submit, "submissionEndpoint") {
            submit.insert(
                "submissionEndpoint".to_string(),
                Value::String(format!("/forms/{}/submissions", id)),
            );
            provenance.record("submissionEndpoint", SubmitSource::Synthesized);
        }
    }

    apply_tier(submit, runtime, Runtime, &mut provenance);
    provenance
}

fn fill_defaults(submit: &mut Map<String, Value>, provenance: &mut SubmitProvenance) {
    if !is_set(submit, "loadSubmissionOnInit") {
        submit.insert("loadSubmissionOnInit".to_string(), Value::Bool(true));
        provenance.record("loadSubmissionOnInit", SubmitSource::Default);
    }
    if !is_set(submit, "updateText") {
        submit.insert(
            "updateText".to_string(),
            Value::String(DEFAULT_UPDATE_TEXT.to_string()),
        );
        provenance.record("updateText", SubmitSource::Default);
    }
}

/// Recursively merge `overrides` into `target`: object meets object recurses,
/// anything else is replaced.
pub fn deep_merge(target: &mut Map<String, Value>, overrides: &Map<String, Value>) {
    for (key, value) in overrides {
        if let (Some(Value::Object(existing)), Value::Object(incoming)) = (target.get_mut(key), value) {
            deep_merge(existing, incoming);
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}

fn first_object<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Map<String, Value>> {
    keys.iter()
        .filter_map(|key| map.get(*key).and_then(Value::as_object))
        .find(|object| !object.is_empty())
}

/// Combine a template definition with an instance's runtime config.
///
/// The inputs are left untouched; the result is meant to be rendered right
/// away and never stored.
pub fn merge_effective_definition(
    definition: &Value,
    html_options: &Value,
    runtime_config: &Value,
    instance_id: &str,
) -> EffectiveDefinition {
    let mut definition = definition.as_object().cloned().unwrap_or_default();
    let mut html_options = html_options.as_object().cloned().unwrap_or_default();
    let runtime = runtime_config.as_object();

    if let Some(runtime) = runtime {
        if let Some(overrides) = first_object(runtime, &["definition", "definitionOverrides"]) {
            deep_merge(&mut definition, overrides);
        }
        if let Some(submit) = runtime.get("submit").and_then(Value::as_object) {
            definition.insert("submit".to_string(), Value::Object(submit.clone()));
        }
        if let Some(html) = first_object(runtime, &["html", "htmlOptions"]) {
            for (key, value) in html {
                html_options.insert(key.clone(), value.clone());
            }
        }
    }

    match definition.get("submit") {
        Some(Value::Object(_)) => {}
        Some(Value::Null) | None => {}
        Some(other) => warn!(
            instance_id,
            found = crate::html::json_type_name(Some(other)),
            "Replacing non-object submit block"
        ),
    }
    if !definition.get("submit").map_or(false, Value::is_object) {
        definition.insert("submit".to_string(), Value::Object(Map::new()));
    }

    let mut provenance = SubmitProvenance::default();
    if let Some(Value::Object(submit)) = definition.get_mut("submit") {
        provenance = normalize_submit_config(submit, runtime, Some(instance_id));
        fill_defaults(submit, &mut provenance);
    }

    debug!(
        instance_id,
        filled = provenance.entries().len(),
        "Merged effective definition"
    );

    EffectiveDefinition {
        definition: Value::Object(definition),
        html_options: Value::Object(html_options),
        provenance,
    }
}
