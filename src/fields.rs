//! Field Renderer Registry
//!
//! One render function per field type, dispatched by an exhaustive match.
//! Rendering never fails: unknown tags become a visible placeholder.

use serde_json::Value;
use tracing::warn;

use crate::definition::{ChoiceOption, Field, FormItem, FormListSpec};
use crate::html::{class_list, escape_html, is_truthy, AttrValue, Attributes};
use crate::layout::{compute_column_style, compute_row_style, LayoutContext};

pub const DIVIDER_MARKUP: &str = r#"<hr class="form-divider" />"#;
const DEFAULT_TEXTAREA_ROWS: u32 = 4;
const DEFAULT_ADD_LABEL: &str = "Add";
const DEFAULT_REMOVE_LABEL: &str = "Remove";

/// Render the bare control markup for one item.
pub fn render_field(item: &FormItem) -> String {
    match &item.field {
        Field::Input => render_text_input(item, "text"),
        Field::Password => render_text_input(item, "password"),
        Field::TextArea { rows } => render_textarea(item, rows.as_ref()),
        Field::Number { min, max, step } => {
            let mut extra = Attributes::new();
            extra.set("type", Some("number"));
            for (key, bound) in [("min", min), ("max", max), ("step", step)] {
                extra.set(key, bound.as_ref().map(|n| n.to_string()));
            }
            set_default_value(&mut extra, item);
            format!("<input {} />", control_attributes(item, extra))
        }
        Field::Select { options, multiple } => render_select(item, options, *multiple),
        Field::RadioGroup { options } => render_choice_group(item, options, ChoiceKind::Radio),
        Field::CheckboxGroup { options } => render_choice_group(item, options, ChoiceKind::Checkbox),
        Field::Switch { checked } => render_switch(item, checked.as_ref()),
        Field::DatePicker { show_time } => {
            let mut extra = Attributes::new();
            extra.set("type", Some(if *show_time { "datetime-local" } else { "date" }));
            set_default_value(&mut extra, item);
            format!("<input {} />", control_attributes(item, extra))
        }
        Field::FormList(spec) => render_form_list(item, spec),
        Field::Divider => DIVIDER_MARKUP.to_string(),
        Field::Unsupported { tag } => {
            let tag = tag.as_deref().unwrap_or("unknown");
            warn!(field_type = tag, "unsupported field type rendered as placeholder");
            format!("<div><!-- Unsupported field type: {} --></div>", escape_html(tag))
        }
    }
}

/// Render an item inside its row/column/item wrappers.
///
/// Hidden items vanish entirely and dividers skip the wrappers.
pub fn render_item_with_layout(item: &FormItem, ctx: &LayoutContext) -> String {
    if item.hidden {
        return String::new();
    }
    if matches!(item.field, Field::Divider) {
        return DIVIDER_MARKUP.to_string();
    }

    let row_style = compute_row_style(ctx);
    let row_style_attr = if row_style.is_empty() {
        String::new()
    } else {
        format!(r#" style="{}""#, escape_html(&row_style))
    };
    let col_style = compute_column_style(item, ctx);

    let row_class = class_list([Some("form-row"), item.row_class_name.as_deref()]);
    let col_class = class_list([Some("form-col"), item.col_class_name.as_deref()]);
    let item_class = class_list([Some("form-item"), item.class_name.as_deref()]);

    format!(
        r#"<div class="{}"{}><div class="{}" style="{}"><div class="{}">{}{}{}{}{}</div></div></div>"#,
        escape_html(&row_class),
        row_style_attr,
        escape_html(&col_class),
        escape_html(&col_style),
        escape_html(&item_class),
        render_label(item),
        render_field(item),
        text_block("form-description", item.description.as_deref()),
        text_block("form-help", item.help.as_deref()),
        text_block("form-extra", item.extra.as_deref()),
    )
}

fn render_label(item: &FormItem) -> String {
    let Some(label) = item.label.as_deref() else {
        return String::new();
    };
    let required = if item.required {
        r#"<span class="required-asterisk">*</span>"#
    } else {
        ""
    };
    format!(
        r#"<label class="form-label" for="{}">{}{}</label>"#,
        escape_html(item.name.as_deref().unwrap_or("")),
        escape_html(label),
        required
    )
}

fn text_block(class: &str, text: Option<&str>) -> String {
    text.map(|t| format!(r#"<div class="{}">{}</div>"#, class, escape_html(t)))
        .unwrap_or_default()
}

/// Shared control attributes, then type extras, then `controlClassName`,
/// then raw `htmlAttributes` overrides.
fn control_attributes(item: &FormItem, extra: Attributes) -> Attributes {
    let mut attrs = Attributes::new();
    attrs
        .set("id", item.id.clone().or_else(|| item.name.clone()))
        .set("name", item.name.clone())
        .set("placeholder", item.placeholder.as_ref().and_then(AttrValue::from_json))
        .set("required", Some(item.required))
        .set("disabled", Some(item.disabled))
        .set("readonly", Some(item.read_only));
    attrs.merge(extra);

    if let Some(control_class) = item.control_class_name.as_deref() {
        let class = match attrs.get("class") {
            Some(AttrValue::Text(existing)) => format!("{} {}", existing, control_class),
            _ => control_class.to_string(),
        };
        attrs.set("class", Some(class));
    }

    for (key, value) in &item.html_attributes {
        attrs.set_json(key, value);
    }
    attrs
}

fn set_default_value(attrs: &mut Attributes, item: &FormItem) {
    attrs.set("value", item.default_value.as_ref().and_then(AttrValue::from_json));
}

fn render_text_input(item: &FormItem, input_type: &str) -> String {
    let mut extra = Attributes::new();
    extra.set("type", Some(input_type));
    set_default_value(&mut extra, item);
    format!("<input {} />", control_attributes(item, extra))
}

fn render_textarea(item: &FormItem, rows: Option<&Value>) -> String {
    let mut extra = Attributes::new();
    match rows {
        Some(rows) => extra.set_json("rows", rows),
        None => extra.set("rows", Some(DEFAULT_TEXTAREA_ROWS.to_string())),
    };
    let body = item
        .default_value
        .as_ref()
        .filter(|v| is_truthy(v))
        .map(crate::html::value_text)
        .unwrap_or_default();
    format!(
        "<textarea {}>{}</textarea>",
        control_attributes(item, extra),
        escape_html(&body)
    )
}

/// Default value flattened into a membership set.
fn default_value_set(item: &FormItem) -> Vec<Value> {
    match &item.default_value {
        None | Some(Value::Null) => vec![],
        Some(Value::Array(values)) => values.clone(),
        Some(single) => vec![single.clone()],
    }
}

fn render_select(item: &FormItem, options: &[ChoiceOption], multiple: bool) -> String {
    let selected = default_value_set(item);
    let mut extra = Attributes::new();
    extra.set("multiple", Some(multiple));

    let options_markup: Vec<String> = options
        .iter()
        .map(|option| {
            let attrs = Attributes::new()
                .with("value", Some(option.value_text()))
                .with("selected", Some(selected.contains(&option.value)));
            format!("<option {}>{}</option>", attrs, escape_html(&option.label))
        })
        .collect();

    format!(
        "<select {}>\n  {}\n</select>",
        control_attributes(item, extra),
        options_markup.join("\n  ")
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChoiceKind {
    Radio,
    Checkbox,
}

impl ChoiceKind {
    fn input_type(self) -> &'static str {
        match self {
            ChoiceKind::Radio => "radio",
            ChoiceKind::Checkbox => "checkbox",
        }
    }

    fn group_class(self) -> &'static str {
        match self {
            ChoiceKind::Radio => "radio-group",
            ChoiceKind::Checkbox => "checkbox-group",
        }
    }
}

/// Radio selection compares by equality; checkbox selection by set membership.
fn render_choice_group(item: &FormItem, options: &[ChoiceOption], kind: ChoiceKind) -> String {
    let group_name = item.name.as_deref().unwrap_or("");
    let selected = default_value_set(item);

    let options_markup: String = options
        .iter()
        .enumerate()
        .map(|(index, option)| {
            let option_id = option
                .id
                .clone()
                .unwrap_or_else(|| format!("{}-{}", group_name, index));
            let is_selected = match kind {
                ChoiceKind::Radio => item.default_value.as_ref() == Some(&option.value),
                ChoiceKind::Checkbox => selected.contains(&option.value),
            };
            let attrs = Attributes::new()
                .with("type", Some(kind.input_type()))
                .with("id", Some(option_id.as_str()))
                .with("name", Some(group_name))
                .with("value", Some(option.value_text()))
                .with("checked", Some(option.checked || is_selected))
                .with("required", Some(kind == ChoiceKind::Radio && item.required))
                .with("disabled", Some(option.disabled));
            format!(
                r#"<label for="{}"><input {} /> {}</label>"#,
                escape_html(&option_id),
                attrs,
                escape_html(&option.label)
            )
        })
        .collect();

    // A required checkbox group needs one box, which native `required` cannot express.
    let group = Attributes::new()
        .with("class", Some(class_list([Some(kind.group_class()), item.control_class_name.as_deref()])))
        .with("data-required", Some(kind == ChoiceKind::Checkbox && item.required));
    format!("<div {}>{}</div>", group, options_markup)
}

fn render_switch(item: &FormItem, checked: Option<&Value>) -> String {
    let is_checked = match checked {
        Some(flag) => is_truthy(flag),
        None => item.default_value.as_ref().map_or(false, is_truthy),
    };
    let mut extra = Attributes::new();
    extra.set("type", Some("checkbox")).set("checked", Some(is_checked));
    format!(
        r#"<label class="switch"><input {} /><span class="slider"></span></label>"#,
        control_attributes(item, extra)
    )
}

/// A repeating group: initial instance, add/remove controls, empty state and
/// a `<template>` prototype the list script clones.
fn render_form_list(item: &FormItem, spec: &FormListSpec) -> String {
    let list_name = escape_html(item.name.as_deref().unwrap_or(""));
    let content = match spec.item.as_deref() {
        Some(child) => list_item_content(child),
        None => render_field(&FormItem::from_value(&Value::Null)),
    };
    let remove_label = escape_html(spec.remove_label.as_deref().unwrap_or(DEFAULT_REMOVE_LABEL));
    let add_label = escape_html(spec.add_label.as_deref().unwrap_or(DEFAULT_ADD_LABEL));

    let instance = format!(
        r#"<div class="form-list-item">{}<button type="button" class="list-remove" data-action="remove">{}</button></div>"#,
        content, remove_label
    );
    let initial_items = if spec.start_empty { String::new() } else { instance.clone() };
    let empty_state = spec
        .empty_text
        .as_deref()
        .map(|text| format!(r#"<div class="form-list-empty" data-empty>{}</div>"#, escape_html(text)))
        .unwrap_or_default();
    let bound = |value: Option<i64>| value.map(|v| v.to_string()).unwrap_or_default();

    format!(
        concat!(
            r#"<div class="form-list" data-name="{name}">"#,
            r#"<div class="form-list-items" data-min="{min}" data-max="{max}">{initial}</div>"#,
            "{empty}",
            r#"<div class="form-list-actions"><button type="button" class="list-add" data-action="add">{add}</button></div>"#,
            r#"<template id="{name}-template">{instance}</template>"#,
            "</div>"
        ),
        name = list_name,
        min = bound(spec.min),
        max = bound(spec.max),
        initial = initial_items,
        empty = empty_state,
        add = add_label,
        instance = instance,
    )
}

fn list_item_content(child: &FormItem) -> String {
    format!(
        "{}{}{}{}",
        text_block("form-list-item-label", child.label.as_deref()),
        render_field(child),
        text_block("form-list-item-description", child.description.as_deref()),
        text_block("form-list-item-help", child.help.as_deref()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::FormOptions;
    use crate::layout::build_layout_context;
    use serde_json::json;

    fn render(raw: Value) -> String {
        render_field(&FormItem::from_value(&raw))
    }

    #[test]
    fn test_input_attributes() {
        let html = render(json!({
            "type": "input", "name": "email", "placeholder": "you@example.com",
            "required": true, "defaultValue": "a\"b"
        }));
        assert_eq!(
            html,
            r#"<input id="email" name="email" placeholder="you@example.com" required type="text" value="a&quot;b" />"#
        );
    }

    #[test]
    fn test_password_type_fixed() {
        assert!(render(json!({"type": "password", "name": "pw"})).contains(r#"type="password""#));
    }

    #[test]
    fn test_html_attributes_applied_last() {
        let html = render(json!({
            "type": "input", "name": "a", "controlClassName": "wide",
            "htmlAttributes": {"type": "email", "autocomplete": "off", "required": false}
        }));
        assert_eq!(
            html,
            r#"<input id="a" name="a" type="email" class="wide" autocomplete="off" />"#
        );
    }

    #[test]
    fn test_textarea_rows_and_body() {
        assert_eq!(
            render(json!({"type": "textarea", "name": "bio", "defaultValue": "<hi>"})),
            r#"<textarea id="bio" name="bio" rows="4">&lt;hi&gt;</textarea>"#
        );
        assert!(render(json!({"type": "textarea", "name": "bio", "rows": 8})).contains(r#"rows="8""#));
    }

    #[test]
    fn test_number_bounds_only_when_numeric() {
        let html = render(json!({"type": "number", "name": "n", "min": 0, "max": "ten", "step": 0.5}));
        assert!(html.contains(r#"min="0""#));
        assert!(!html.contains("max="));
        assert!(html.contains(r#"step="0.5""#));
    }

    #[test]
    fn test_select_single_default() {
        let html = render(json!({
            "type": "select", "name": "f", "defaultValue": "opt-2",
            "options": [{"value": "opt-1"}, {"value": "opt-2"}]
        }));
        assert_eq!(html.matches("selected").count(), 1);
        assert!(html.contains(r#"<option value="opt-2" selected>opt-2</option>"#));
    }

    #[test]
    fn test_select_multiple_defaults() {
        let html = render(json!({
            "type": "select", "name": "f", "mode": "multiple", "defaultValue": ["a", "c"],
            "options": [{"value": "a"}, {"value": "b"}, {"value": "c"}]
        }));
        assert!(html.contains("multiple"));
        assert_eq!(html.matches(" selected").count(), 2);
    }

    #[test]
    fn test_radio_group_ids_and_selection() {
        let html = render(json!({
            "type": "radio-group", "name": "color", "defaultValue": "g",
            "options": [{"label": "Red", "value": "r"}, {"label": "Green", "value": "g", "id": "green"}]
        }));
        assert!(html.starts_with(r#"<div class="radio-group">"#));
        assert!(html.contains(r#"<label for="color-0"><input type="radio" id="color-0" name="color" value="r" /> Red</label>"#));
        assert!(html.contains(r#"id="green" name="color" value="g" checked"#));
    }

    #[test]
    fn test_checkbox_group_membership() {
        let html = render(json!({
            "type": "checkbox-group", "name": "tags", "defaultValue": ["a", "b"],
            "options": [{"value": "a"}, {"value": "b"}, {"value": "c", "disabled": true}]
        }));
        assert_eq!(html.matches("checked").count(), 2);
        assert!(html.contains(r#"value="c" disabled"#));
    }

    #[test]
    fn test_required_choice_groups() {
        let radios = render(json!({
            "type": "radio-group", "name": "size", "required": true,
            "options": ["s", "l"]
        }));
        assert_eq!(radios.matches(" required").count(), 2);
        assert!(!radios.contains("data-required"));

        let boxes = render(json!({
            "type": "checkbox-group", "name": "tags", "required": true,
            "options": ["a", "b"]
        }));
        assert!(boxes.starts_with(r#"<div class="checkbox-group" data-required>"#));
        assert!(!boxes.contains(" required"));
    }

    #[test]
    fn test_switch_checked_from_default() {
        let html = render(json!({"type": "switch", "name": "on", "defaultValue": true}));
        assert_eq!(
            html,
            r#"<label class="switch"><input id="on" name="on" type="checkbox" checked /><span class="slider"></span></label>"#
        );
        assert!(!render(json!({"type": "switch", "name": "on", "checked": false, "defaultValue": true})).contains("checked"));
    }

    #[test]
    fn test_date_picker_show_time() {
        assert!(render(json!({"type": "date-picker", "name": "d"})).contains(r#"type="date""#));
        assert!(render(json!({"type": "date-picker", "name": "d", "showTime": true})).contains(r#"type="datetime-local""#));
    }

    #[test]
    fn test_unsupported_placeholder() {
        assert_eq!(
            render(json!({"type": "<rating>"})),
            "<div><!-- Unsupported field type: &lt;rating&gt; --></div>"
        );
        assert_eq!(render(json!({})), "<div><!-- Unsupported field type: unknown --></div>");
    }

    #[test]
    fn test_form_list_structure() {
        let html = render(json!({
            "type": "form-list", "name": "contacts", "min": 1, "max": 3,
            "addLabel": "Add contact", "emptyText": "None yet",
            "item": {"type": "input", "name": "phone", "label": "Phone"}
        }));
        assert!(html.starts_with(r#"<div class="form-list" data-name="contacts">"#));
        assert!(html.contains(r#"data-min="1" data-max="3""#));
        assert!(html.contains(r#"<div class="form-list-empty" data-empty>None yet</div>"#));
        assert!(html.contains(r#"data-action="add">Add contact</button>"#));
        assert!(html.contains(r#"<template id="contacts-template"><div class="form-list-item">"#));
        assert_eq!(html.matches(r#"name="phone""#).count(), 2);
    }

    #[test]
    fn test_nested_form_list_markup() {
        let html = render(json!({
            "type": "form-list", "name": "outer",
            "item": {"type": "form-list", "name": "inner", "item": {"type": "input", "name": "v"}}
        }));
        let outer_template = html.find(r#"<template id="outer-template">"#).unwrap();
        assert!(html.find(r#"<template id="inner-template">"#).unwrap() < outer_template);
        // initial instance plus the copy inside the outer prototype
        assert_eq!(html.matches(r#"<div class="form-list" data-name="inner">"#).count(), 2);
    }

    #[test]
    fn test_form_list_start_empty() {
        let html = render(json!({
            "type": "form-list", "name": "rows", "startEmpty": true,
            "item": {"type": "input", "name": "x"}
        }));
        assert!(html.contains(r#"data-min="" data-max=""></div>"#));
        assert_eq!(html.matches(r#"name="x""#).count(), 1);
    }

    #[test]
    fn test_hidden_item_suppressed() {
        let ctx = build_layout_context(&FormOptions::default());
        for tag in ["input", "divider", "select", "form-list", "bogus"] {
            let item = FormItem::from_value(&json!({"type": tag, "name": "h", "hidden": true}));
            assert_eq!(render_item_with_layout(&item, &ctx), "");
        }
    }

    #[test]
    fn test_item_wrapper_markup() {
        let ctx = build_layout_context(&FormOptions::default());
        let item = FormItem::from_value(&json!({
            "type": "input", "name": "a", "label": "A", "required": true,
            "colSpan": 12, "className": "tight", "help": "Help & tips"
        }));
        assert_eq!(
            render_item_with_layout(&item, &ctx),
            concat!(
                r#"<div class="form-row"><div class="form-col" style="flex: 0 0 50.000000%; max-width: 50.000000%">"#,
                r#"<div class="form-item tight"><label class="form-label" for="a">A<span class="required-asterisk">*</span></label>"#,
                r#"<input id="a" name="a" required type="text" /><div class="form-help">Help &amp; tips</div></div></div></div>"#
            )
        );
    }
}
