//! Template Preview
//!
//! A preview renders a template without any submission wiring and marks the
//! page as a preview in its title, subtitle and a banner.

use serde_json::Value;

use crate::document::{render_document, HtmlOptions, RenderError};

pub const PREVIEW_SUFFIX: &str = "（预览）";
pub const PREVIEW_NOTICE: &str = "预览模式：按钮已禁用，不会提交数据。";
pub const PREVIEW_TITLE_FALLBACK: &str = "表单模板 · 预览";
const PREVIEW_STYLES: &str = include_str!("assets/preview.css");
const PREVIEW_BANNER: &str =
    r#"<div class="preview-banner"><strong>预览模式</strong><span>按钮已禁用，不会提交数据。</span></div>"#;
const FORM_CONTAINER_OPEN: &str = r#"<div class="form-container">"#;

fn truthy_str<'a>(value: Option<&'a Value>) -> Option<&'a str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Copy of `definition` with `submit`/`actions` removed and the subtitle
/// marked as a preview.
pub fn build_preview_definition(definition: &Value) -> Value {
    let mut preview = definition.as_object().cloned().unwrap_or_default();
    preview.remove("submit");
    preview.remove("actions");

    let top_subtitle = truthy_str(preview.get("subtitle")).map(|s| format!("{}{}", s, PREVIEW_SUFFIX));
    let has_top_subtitle = top_subtitle.is_some();
    if let Some(subtitle) = top_subtitle {
        preview.insert("subtitle".to_string(), Value::String(subtitle));
    }

    if let Some(Value::Object(form)) = preview.get_mut("form") {
        let inner = truthy_str(form.get("subtitle")).map(|s| format!("{}{}", s, PREVIEW_SUFFIX));
        if let Some(subtitle) = inner {
            form.insert("subtitle".to_string(), Value::String(subtitle));
        } else if !has_top_subtitle {
            form.insert("subtitle".to_string(), Value::String(PREVIEW_NOTICE.to_string()));
        }
    } else if !has_top_subtitle {
        preview.insert("subtitle".to_string(), Value::String(PREVIEW_NOTICE.to_string()));
    }

    Value::Object(preview)
}

/// Page title for a preview: the resolved title plus a preview marker.
pub fn preview_title(options: &HtmlOptions, preview_definition: &Value) -> String {
    let current = options
        .title
        .as_deref()
        .or_else(|| truthy_str(preview_definition.get("title")))
        .or_else(|| truthy_str(preview_definition.get("form").and_then(|f| f.get("title"))));
    match current {
        Some(title) => format!("{} · 预览", title),
        None => PREVIEW_TITLE_FALLBACK.to_string(),
    }
}

/// Add the preview stylesheet before `</head>` and the banner before the
/// form container. Each is inserted at most once.
pub fn inject_preview_chrome(html: &str) -> String {
    let styles = format!("<style>\n{}\n</style>\n</head>", PREVIEW_STYLES.trim());
    let banner = format!("{}\n  {}", PREVIEW_BANNER, FORM_CONTAINER_OPEN);
    html.replacen("</head>", &styles, 1)
        .replacen(FORM_CONTAINER_OPEN, &banner, 1)
}

/// Render `definition` in preview mode.
pub fn render_preview(definition: &Value, options: &HtmlOptions) -> Result<String, RenderError> {
    let preview = build_preview_definition(definition);
    let options = HtmlOptions {
        title: Some(preview_title(options, &preview)),
        ..options.clone()
    };
    let html = render_document(&preview, &options)?;
    Ok(inject_preview_chrome(&html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_submit_and_actions_removed() {
        let preview = build_preview_definition(&json!({
            "items": [],
            "submit": {"callback_url": "/x"},
            "actions": {}
        }));
        assert!(preview.get("submit").is_none());
        assert!(preview.get("actions").is_none());
    }

    #[test]
    fn test_subtitle_suffixes() {
        let preview = build_preview_definition(&json!({"subtitle": "Hi", "form": {"subtitle": "Inner"}}));
        assert_eq!(preview["subtitle"], json!("Hi（预览）"));
        assert_eq!(preview["form"]["subtitle"], json!("Inner（预览）"));
    }

    #[test]
    fn test_notice_when_no_subtitle() {
        let preview = build_preview_definition(&json!({"items": []}));
        assert_eq!(preview["subtitle"], json!(PREVIEW_NOTICE));

        let preview = build_preview_definition(&json!({"form": {}}));
        assert_eq!(preview["form"]["subtitle"], json!(PREVIEW_NOTICE));
        assert!(preview.get("subtitle").is_none());
    }

    #[test]
    fn test_preview_title() {
        let options = HtmlOptions::default();
        assert_eq!(preview_title(&options, &json!({"title": "Survey"})), "Survey · 预览");
        assert_eq!(preview_title(&options, &json!({})), PREVIEW_TITLE_FALLBACK);
    }

    #[test]
    fn test_render_preview_has_chrome_and_no_submit_script() {
        let html = render_preview(
            &json!({"title": "Survey", "items": [], "submit": {"callback_url": "/x"}}),
            &HtmlOptions::default(),
        )
        .unwrap();
        assert!(html.contains("<title>Survey · 预览</title>"));
        assert_eq!(html.matches("preview-banner\">").count(), 1);
        assert!(html.find(".preview-banner {").unwrap() < html.find("</head>").unwrap());
        assert!(!html.contains("<script>"));
        assert!(html.contains(PREVIEW_NOTICE));
    }
}
