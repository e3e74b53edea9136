//! Document Assembler - Single Entry Point for HTML
//!
//! `render_document` ALWAYS validates first; an invalid definition never
//! produces markup.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::definition::FormDefinition;
use crate::fields::render_item_with_layout;
use crate::html::{class_list, escape_html, is_truthy, Attributes};
use crate::layout::build_layout_context;
use crate::merge::normalize_submit_config;
use crate::submit::{build_submit_script, SubmitConfig};
use crate::validation::Validator;

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static VALIDATION_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_validation_call_count() -> u32 {
    VALIDATION_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_validation_call_count() {
    VALIDATION_CALL_COUNT.store(0, Ordering::SeqCst);
}

pub const BASE_STYLES: &str = include_str!("assets/base.css");
pub const FORM_LIST_SCRIPT: &str = include_str!("assets/form_list.js");
pub const DEFAULT_TITLE: &str = "Generated Form";
pub const DEFAULT_LANG: &str = "en";
pub const SUBMIT_LABEL: &str = "提交";
pub const RESET_LABEL: &str = "重置";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Form definition failed validation.")]
    ValidationFailed { errors: Vec<String> },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RenderError {
    /// Validation messages, empty for other failures.
    pub fn errors(&self) -> &[String] {
        match self {
            RenderError::ValidationFailed { errors } => errors,
            RenderError::Serialization(_) => &[],
        }
    }
}

/// Page-level render options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HtmlOptions {
    pub title: Option<String>,
    pub include_styles: bool,
    /// Replaces the built-in stylesheet when set.
    pub styles: Option<String>,
    pub lang: String,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            title: None,
            include_styles: true,
            styles: None,
            lang: DEFAULT_LANG.to_string(),
        }
    }
}

impl HtmlOptions {
    /// Lenient read of a loosely typed options object.
    pub fn from_value(raw: &Value) -> Self {
        let text = |key: &str| {
            raw.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            title: text("title"),
            include_styles: raw.get("includeStyles").map_or(true, is_truthy),
            styles: text("styles"),
            lang: text("lang").unwrap_or_else(|| DEFAULT_LANG.to_string()),
        }
    }

    fn style_block(&self) -> String {
        if !self.include_styles {
            return String::new();
        }
        let styles = self.styles.as_deref().unwrap_or(BASE_STYLES).trim();
        format!("<style>\n{}\n</style>", styles)
    }
}

fn render_header(definition: &FormDefinition) -> String {
    let title = definition.header_title();
    let subtitle = definition.header_subtitle();
    if title.is_none() && subtitle.is_none() {
        return String::new();
    }
    let title_markup = title
        .map(|t| format!(r#"<h1 class="form-title">{}</h1>"#, escape_html(t)))
        .unwrap_or_default();
    let subtitle_markup = subtitle
        .map(|s| format!(r#"<p class="form-subtitle">{}</p>"#, escape_html(s)))
        .unwrap_or_default();
    format!(
        r#"<header class="form-header">{}{}</header>"#,
        title_markup, subtitle_markup
    )
}

fn default_actions() -> String {
    format!(
        "<button type=\"submit\" class=\"primary-button\">{}</button>\n<button type=\"reset\" class=\"secondary-button\">{}</button>",
        SUBMIT_LABEL, RESET_LABEL
    )
}

fn form_attributes(definition: &FormDefinition) -> Attributes {
    let layout_class = definition.form.layout.as_ref().map(|l| format!("layout-{}", l));
    let classes = class_list([
        Some("generated-form"),
        definition.form.class_name.as_deref(),
        layout_class.as_deref(),
    ]);
    Attributes::new()
        .with("id", definition.id.clone())
        .with("class", Some(classes))
        .with("action", Some(definition.action.as_deref().unwrap_or("#")))
        .with("method", Some(definition.method.as_deref().unwrap_or("post")))
        .with("novalidate", definition.novalidate.then_some("novalidate"))
}

fn collect_scripts(definition: &FormDefinition) -> Result<Vec<String>, RenderError> {
    let mut scripts = Vec::new();
    if definition.contains_form_list() {
        scripts.push(FORM_LIST_SCRIPT.trim().to_string());
    }
    if let Some(raw_submit) = &definition.submit {
        let mut submit = raw_submit.clone();
        normalize_submit_config(&mut submit, None, None);
        scripts.push(build_submit_script(&SubmitConfig::from_map(&submit))?);
    }
    Ok(scripts)
}

/// Validate `definition` and assemble the complete HTML document.
pub fn render_document(definition: &Value, options: &HtmlOptions) -> Result<String, RenderError> {
    #[cfg(feature = "test-hooks")]
    VALIDATION_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

    let result = Validator::new().validate(definition);
    if !result.valid {
        let errors = result.errors();
        warn!(error_count = errors.len(), "Form definition failed validation");
        return Err(RenderError::ValidationFailed { errors });
    }

    let form = FormDefinition::from_value(definition);
    let page_title = options
        .title
        .as_deref()
        .or(form.title.as_deref())
        .or(form.form.title.as_deref())
        .unwrap_or(DEFAULT_TITLE);

    let ctx = build_layout_context(&form.form);
    let rendered_items: Vec<String> = form
        .items
        .iter()
        .map(|item| render_item_with_layout(item, &ctx))
        .collect();

    let form_attrs = form_attributes(&form).to_string();
    let form_open = if form_attrs.is_empty() {
        "<form>".to_string()
    } else {
        format!("<form {}>", form_attrs)
    };

    let script_block = collect_scripts(&form)?
        .iter()
        .map(|script| format!("<script>\n{}\n</script>", script))
        .collect::<Vec<_>>()
        .join("\n");

    debug!(
        items = form.items.len(),
        has_submit = form.submit.is_some(),
        "Assembling form document"
    );

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="{lang}">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{title}</title>
  {styles}
</head>
<body>
  <div class="form-container">
    {form_open}
      {header}
      {items}
      <div class="form-actions">
        {actions}
      </div>
    </form>
  </div>
  {scripts}
</body>
</html>"#,
        lang = escape_html(&options.lang),
        title = escape_html(page_title),
        styles = options.style_block(),
        form_open = form_open,
        header = render_header(&form),
        items = rendered_items.join("\n"),
        actions = default_actions(),
        scripts = script_block,
    );

    Ok(html.trim().to_string())
}
