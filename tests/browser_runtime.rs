//! Browser Behavior Tests
//!
//! Rendered documents are replayed under node (`tests/js/dom_harness.js`) so
//! the embedded list and submit scripts run against the markup they ship with.
//! Needs `node` on PATH; enabled with `--features browser-tests`.
#![cfg(feature = "browser-tests")]

use std::path::Path;
use std::process::Command;

use formsmith_core::{render_document, HtmlOptions};
use serde_json::{json, Value};

fn render(definition: Value) -> String {
    render_document(&definition, &HtmlOptions::default()).unwrap()
}

/// Run `steps` against `html` and return the recorded snapshots.
fn replay(html: &str, responses: Value, steps: Value) -> Vec<Value> {
    let dir = tempfile::tempdir().unwrap();
    let scenario = dir.path().join("scenario.json");
    std::fs::write(
        &scenario,
        serde_json::to_vec(&json!({"html": html, "responses": responses, "steps": steps})).unwrap(),
    )
    .unwrap();

    let harness = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/js/dom_harness.js");
    let output = Command::new("node").arg(harness).arg(&scenario).output().expect("node on PATH");
    assert!(
        output.status.success(),
        "harness failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn step(action: &str) -> Value {
    json!({"action": action})
}

fn at(action: &str, selector: &str, nth: usize) -> Value {
    json!({"action": action, "selector": selector, "nth": nth})
}

fn nested_lists() -> String {
    render(json!({
        "items": [{
            "type": "form-list", "name": "outer",
            "item": {"type": "form-list", "name": "inner", "item": {"type": "input", "name": "v"}}
        }]
    }))
}

#[test]
fn test_nested_list_names_carry_both_indices() {
    let snaps = replay(&nested_lists(), json!([]), json!([step("snapshot")]));
    assert_eq!(snaps[0]["names"], json!(["outer[0].inner[0].v"]));
}

#[test]
fn test_inner_list_buttons_leave_outer_list_alone() {
    let snaps = replay(
        &nested_lists(),
        json!([]),
        json!([
            // document order: inner add, then outer add
            at("click", r#"[data-action="add"]"#, 0),
            step("snapshot"),
            at("click", r#"[data-action="add"]"#, 1),
            step("snapshot"),
            // first remove button belongs to the first inner instance
            at("click", r#"[data-action="remove"]"#, 0),
            step("snapshot"),
        ]),
    );
    assert_eq!(snaps[0]["names"], json!(["outer[0].inner[0].v", "outer[0].inner[1].v"]));
    assert_eq!(
        snaps[1]["names"],
        json!(["outer[0].inner[0].v", "outer[0].inner[1].v", "outer[1].inner[0].v"])
    );
    assert_eq!(snaps[2]["names"], json!(["outer[0].inner[0].v", "outer[1].inner[0].v"]));
}

#[test]
fn test_required_checkbox_group_needs_one_box() {
    let html = render(json!({
        "items": [
            {"type": "input", "name": "who", "label": "Who", "required": true},
            {"type": "checkbox-group", "name": "tags", "label": "Tags", "required": true, "options": ["a", "b"]}
        ],
        "submit": {"callback_url": "/cb"}
    }));
    let snaps = replay(
        &html,
        json!([]),
        json!([
            step("submit"),
            step("settle"),
            step("snapshot"),
            {"action": "fill", "selector": r#"input[name="who"]"#, "value": "Ada"},
            at("check", r#"input[name="tags"]"#, 1),
            step("submit"),
            step("settle"),
            step("snapshot"),
        ]),
    );

    let blocked = &snaps[0];
    assert_eq!(blocked["alerts"].as_array().unwrap().len(), 1);
    assert!(blocked["alerts"][0].as_str().unwrap().contains("Tags"));
    assert_eq!(blocked["errors"], json!(["who", "tags", "tags"]));
    assert_eq!(blocked["fetches"], json!([]));
    assert_eq!(blocked["button"]["disabled"], json!(false));

    let sent = &snaps[1];
    assert_eq!(sent["errors"], json!([]));
    assert_eq!(sent["fetches"].as_array().unwrap().len(), 1);
    let values = &sent["fetches"][0]["body"]["feedback_data"]["user_collect_data"]["values"];
    assert_eq!(values, &json!({"who": "Ada", "tags": ["b"]}));
}

#[test]
fn test_callback_payload_and_button_states() {
    let html = render(json!({
        "items": [
            {"type": "input", "name": "city", "defaultValue": "Oslo"},
            {"type": "radio-group", "name": "size", "defaultValue": "l",
             "options": [{"label": "Small", "value": "s"}, {"label": "Large", "value": "l"}]}
        ],
        "submit": {
            "callback": {"url": "https://hooks.example/cb", "params": {"campaign": "spring"}},
            "pendingText": "Sending", "successText": "Sent"
        }
    }));
    let snaps = replay(
        &html,
        json!([]),
        json!([step("snapshot"), step("submit"), step("snapshot"), step("settle"), step("snapshot")]),
    );

    assert_eq!(snaps[0]["button"], json!({"text": "提交", "disabled": false}));
    assert_eq!(snaps[1]["button"], json!({"text": "Sending", "disabled": true}));
    assert_eq!(snaps[2]["button"], json!({"text": "Sent", "disabled": true}));

    let call = &snaps[2]["fetches"][0];
    assert_eq!(call["url"], json!("https://hooks.example/cb"));
    assert_eq!(call["method"], json!("POST"));
    assert_eq!(call["body"]["campaign"], json!("spring"));
    let collected = &call["body"]["feedback_data"]["user_collect_data"];
    assert_eq!(collected["values"], json!({"city": "Oslo", "size": "l"}));
    assert_eq!(collected["form_info"][1]["value"], json!({"label": "Large", "value": "l"}));
}

#[test]
fn test_failed_callback_keeps_failure_text() {
    let html = render(json!({
        "items": [{"type": "input", "name": "a", "defaultValue": "x"}],
        "submit": {"callback_url": "/cb", "failureText": "Try again"}
    }));
    let snaps = replay(
        &html,
        json!([{"status": 500, "body": {}}]),
        json!([step("submit"), step("settle"), step("snapshot"), step("settle"), step("snapshot")]),
    );
    for snap in &snaps {
        assert_eq!(snap["button"], json!({"text": "Try again", "disabled": false}));
    }
}

#[test]
fn test_loaded_submission_switches_to_update_text() {
    let html = render(json!({
        "items": [{"type": "input", "name": "city"}],
        "submit": {"submissionEndpoint": "/forms/f1/submissions", "updateText": "Update"}
    }));
    let snaps = replay(
        &html,
        json!([
            {"status": 200, "body": {"id": "s9", "status": "completed", "payload": {"values": {"city": "Bergen"}}}},
            {"status": 200, "body": {"id": "s9", "status": "completed"}}
        ]),
        json!([step("snapshot"), step("submit"), step("settle"), step("snapshot")]),
    );

    let loaded = &snaps[0];
    assert_eq!(loaded["fetches"][0]["method"], json!("GET"));
    assert_eq!(loaded["fetches"][0]["url"], json!("/forms/f1/submissions"));
    assert_eq!(loaded["values"]["city"], json!("Bergen"));
    assert_eq!(loaded["button"], json!({"text": "Update", "disabled": false}));

    let saved = &snaps[1]["fetches"][1];
    assert_eq!(saved["method"], json!("POST"));
    assert_eq!(saved["body"]["submission_id"], json!("s9"));
    assert_eq!(saved["body"]["payload"]["values"], json!({"city": "Bergen"}));
    assert_eq!(saved["body"]["status"], json!("completed"));
}
