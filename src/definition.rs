//! Form Definition Model
//!
//! Typed views over the JSON form definition. Construction never fails:
//! structural problems are the validator's job, and the renderer must
//! degrade instead of aborting on odd-but-present data.

use serde_json::{Map, Number, Value};

use crate::html::{is_truthy, value_text};

/// Every field type tag the renderer knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Input,
    TextArea,
    Password,
    Number,
    Select,
    RadioGroup,
    CheckboxGroup,
    Switch,
    DatePicker,
    FormList,
    Divider,
}

impl FieldKind {
    pub const ALL: [FieldKind; 11] = [
        FieldKind::Input,
        FieldKind::TextArea,
        FieldKind::Password,
        FieldKind::Number,
        FieldKind::Select,
        FieldKind::RadioGroup,
        FieldKind::CheckboxGroup,
        FieldKind::Switch,
        FieldKind::DatePicker,
        FieldKind::FormList,
        FieldKind::Divider,
    ];

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    pub fn tag(self) -> &'static str {
        match self {
            FieldKind::Input => "input",
            FieldKind::TextArea => "textarea",
            FieldKind::Password => "password",
            FieldKind::Number => "number",
            FieldKind::Select => "select",
            FieldKind::RadioGroup => "radio-group",
            FieldKind::CheckboxGroup => "checkbox-group",
            FieldKind::Switch => "switch",
            FieldKind::DatePicker => "date-picker",
            FieldKind::FormList => "form-list",
            FieldKind::Divider => "divider",
        }
    }

    pub fn requires_name(self) -> bool {
        !matches!(self, FieldKind::Divider)
    }

    pub fn requires_options(self) -> bool {
        matches!(
            self,
            FieldKind::Select | FieldKind::RadioGroup | FieldKind::CheckboxGroup
        )
    }

    /// Supported tags in alphabetical order, for error messages.
    pub fn supported_tags() -> Vec<&'static str> {
        let mut tags: Vec<_> = Self::ALL.iter().map(|kind| kind.tag()).collect();
        tags.sort_unstable();
        tags
    }
}

/// One entry of a select / radio-group / checkbox-group.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceOption {
    /// Resolved from `value`, then `key`, then `label`.
    pub value: Value,
    pub label: String,
    pub id: Option<String>,
    pub disabled: bool,
    pub checked: bool,
}

impl ChoiceOption {
    pub fn from_value(raw: &Value) -> Self {
        let Some(map) = raw.as_object() else {
            return Self {
                value: raw.clone(),
                label: value_text(raw),
                id: None,
                disabled: false,
                checked: false,
            };
        };
        let value = ["value", "key", "label"]
            .iter()
            .find_map(|key| present(map, key))
            .cloned()
            .unwrap_or_else(|| Value::String(String::new()));
        let label = ["label", "value"]
            .iter()
            .find_map(|key| present(map, key))
            .map(value_text)
            .unwrap_or_default();
        Self {
            value,
            label,
            id: truthy_text(map, "id"),
            disabled: flag(map, "disabled"),
            checked: flag(map, "checked"),
        }
    }

    pub fn value_text(&self) -> String {
        value_text(&self.value)
    }
}

/// Repeating group settings of a `form-list` item.
#[derive(Debug, Clone, PartialEq)]
pub struct FormListSpec {
    pub item: Option<Box<FormItem>>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub start_empty: bool,
    pub add_label: Option<String>,
    pub remove_label: Option<String>,
    pub empty_text: Option<String>,
}

/// Type-specific payload of a form item.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Input,
    Password,
    TextArea {
        rows: Option<Value>,
    },
    Number {
        min: Option<Number>,
        max: Option<Number>,
        step: Option<Number>,
    },
    Select {
        options: Vec<ChoiceOption>,
        multiple: bool,
    },
    RadioGroup {
        options: Vec<ChoiceOption>,
    },
    CheckboxGroup {
        options: Vec<ChoiceOption>,
    },
    Switch {
        checked: Option<Value>,
    },
    DatePicker {
        show_time: bool,
    },
    FormList(FormListSpec),
    Divider,
    /// A tag outside the supported set, or no tag at all.
    Unsupported {
        tag: Option<String>,
    },
}

impl Field {
    pub fn kind(&self) -> Option<FieldKind> {
        Some(match self {
            Field::Input => FieldKind::Input,
            Field::Password => FieldKind::Password,
            Field::TextArea { .. } => FieldKind::TextArea,
            Field::Number { .. } => FieldKind::Number,
            Field::Select { .. } => FieldKind::Select,
            Field::RadioGroup { .. } => FieldKind::RadioGroup,
            Field::CheckboxGroup { .. } => FieldKind::CheckboxGroup,
            Field::Switch { .. } => FieldKind::Switch,
            Field::DatePicker { .. } => FieldKind::DatePicker,
            Field::FormList(_) => FieldKind::FormList,
            Field::Divider => FieldKind::Divider,
            Field::Unsupported { .. } => return None,
        })
    }
}

/// A single form field with the attributes common to every type.
#[derive(Debug, Clone, PartialEq)]
pub struct FormItem {
    pub field: Field,
    pub name: Option<String>,
    pub id: Option<String>,
    pub label: Option<String>,
    pub required: bool,
    pub disabled: bool,
    pub read_only: bool,
    pub hidden: bool,
    pub placeholder: Option<Value>,
    /// First present of `defaultValue`, `initialValue`, `value`.
    pub default_value: Option<Value>,
    /// `colSpan`, else `span`, when numeric.
    pub span: Option<f64>,
    pub class_name: Option<String>,
    pub control_class_name: Option<String>,
    pub row_class_name: Option<String>,
    pub col_class_name: Option<String>,
    pub description: Option<String>,
    pub help: Option<String>,
    pub extra: Option<String>,
    pub style: Vec<(String, String)>,
    pub html_attributes: Vec<(String, Value)>,
    /// Grouped children (`items`, then a non-list `item`), only inspected for
    /// list detection.
    pub children: Vec<FormItem>,
}

impl FormItem {
    pub fn from_value(raw: &Value) -> Self {
        let empty = Map::new();
        let map = raw.as_object().unwrap_or(&empty);
        let tag = map.get("type").and_then(Value::as_str);

        let options = || -> Vec<ChoiceOption> {
            map.get("options")
                .and_then(Value::as_array)
                .map(|list| list.iter().map(ChoiceOption::from_value).collect())
                .unwrap_or_default()
        };

        let field = match tag.and_then(FieldKind::from_tag) {
            Some(FieldKind::Input) => Field::Input,
            Some(FieldKind::Password) => Field::Password,
            Some(FieldKind::TextArea) => Field::TextArea {
                rows: map.get("rows").filter(|v| is_truthy(v)).cloned(),
            },
            Some(FieldKind::Number) => Field::Number {
                min: number(map, "min"),
                max: number(map, "max"),
                step: number(map, "step"),
            },
            Some(FieldKind::Select) => Field::Select {
                options: options(),
                multiple: map.get("mode").and_then(Value::as_str) == Some("multiple")
                    || flag(map, "multiple"),
            },
            Some(FieldKind::RadioGroup) => Field::RadioGroup { options: options() },
            Some(FieldKind::CheckboxGroup) => Field::CheckboxGroup { options: options() },
            Some(FieldKind::Switch) => Field::Switch {
                checked: present(map, "checked").cloned(),
            },
            Some(FieldKind::DatePicker) => Field::DatePicker {
                show_time: flag(map, "showTime"),
            },
            Some(FieldKind::FormList) => Field::FormList(FormListSpec {
                item: present(map, "item").map(|child| Box::new(FormItem::from_value(child))),
                min: integer(map, "min"),
                max: integer(map, "max"),
                start_empty: flag(map, "startEmpty"),
                add_label: truthy_text(map, "addLabel"),
                remove_label: truthy_text(map, "removeLabel"),
                empty_text: truthy_text(map, "emptyText"),
            }),
            Some(FieldKind::Divider) => Field::Divider,
            None => Field::Unsupported {
                tag: tag.map(str::to_string),
            },
        };

        let default_value = ["defaultValue", "initialValue", "value"]
            .iter()
            .find_map(|key| map.get(*key))
            .cloned();

        let span = map
            .get("colSpan")
            .and_then(Value::as_f64)
            .or_else(|| map.get("span").and_then(Value::as_f64));

        let style = map
            .get("style")
            .and_then(Value::as_object)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value_text(value)))
                    .collect()
            })
            .unwrap_or_default();

        let html_attributes = map
            .get("htmlAttributes")
            .and_then(Value::as_object)
            .map(|entries| entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        let mut children: Vec<FormItem> = map
            .get("items")
            .and_then(Value::as_array)
            .map(|list| list.iter().map(FormItem::from_value).collect())
            .unwrap_or_default();
        if !matches!(field, Field::FormList(_)) {
            if let Some(child) = map.get("item").filter(|v| v.is_object()) {
                children.push(FormItem::from_value(child));
            }
        }

        Self {
            field,
            name: truthy_text(map, "name"),
            id: truthy_text(map, "id"),
            label: truthy_text(map, "label"),
            required: flag(map, "required"),
            disabled: flag(map, "disabled"),
            read_only: flag(map, "readOnly") || flag(map, "readonly"),
            hidden: flag(map, "hidden"),
            placeholder: present(map, "placeholder").cloned(),
            default_value,
            span,
            class_name: truthy_text(map, "className"),
            control_class_name: truthy_text(map, "controlClassName"),
            row_class_name: truthy_text(map, "rowClassName"),
            col_class_name: truthy_text(map, "colClassName"),
            description: truthy_text(map, "description"),
            help: truthy_text(map, "help"),
            extra: truthy_text(map, "extra"),
            style,
            html_attributes,
            children,
        }
    }

    pub fn kind(&self) -> Option<FieldKind> {
        self.field.kind()
    }

    /// Whether this item, or anything nested under it, is a repeating list.
    pub fn contains_form_list(&self) -> bool {
        match &self.field {
            Field::FormList(_) => true,
            _ => self.children.iter().any(FormItem::contains_form_list),
        }
    }
}

/// `{span}` column descriptor from `labelCol` / `wrapperCol`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColSpec {
    pub span: f64,
}

/// Form-level layout hints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormOptions {
    pub label_col: Option<ColSpec>,
    pub wrapper_col: Option<ColSpec>,
    pub gutter: Option<f64>,
    pub class_name: Option<String>,
    pub layout: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
}

impl FormOptions {
    pub fn from_value(raw: Option<&Value>) -> Self {
        let Some(map) = raw.and_then(Value::as_object) else {
            return Self::default();
        };
        let col = |key: &str| {
            map.get(key)
                .and_then(|col| col.get("span"))
                .and_then(Value::as_f64)
                .map(|span| ColSpec { span })
        };
        Self {
            label_col: col("labelCol"),
            wrapper_col: col("wrapperCol"),
            gutter: map.get("gutter").and_then(Value::as_f64),
            class_name: truthy_text(map, "className"),
            layout: truthy_text(map, "layout"),
            title: truthy_text(map, "title"),
            subtitle: truthy_text(map, "subtitle"),
            description: truthy_text(map, "description"),
        }
    }
}

/// The whole form: header, layout hints, items and submission wiring.
#[derive(Debug, Clone, PartialEq)]
pub struct FormDefinition {
    pub id: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub action: Option<String>,
    pub method: Option<String>,
    pub novalidate: bool,
    pub form: FormOptions,
    pub items: Vec<FormItem>,
    /// Raw `submit` block; normalized by the merger before script generation.
    pub submit: Option<Map<String, Value>>,
}

impl FormDefinition {
    pub fn from_value(raw: &Value) -> Self {
        let empty = Map::new();
        let map = raw.as_object().unwrap_or(&empty);
        Self {
            id: truthy_text(map, "id"),
            title: truthy_text(map, "title"),
            subtitle: truthy_text(map, "subtitle"),
            description: truthy_text(map, "description"),
            action: truthy_text(map, "action"),
            method: truthy_text(map, "method"),
            novalidate: flag(map, "novalidate"),
            form: FormOptions::from_value(map.get("form")),
            items: map
                .get("items")
                .and_then(Value::as_array)
                .map(|list| list.iter().map(FormItem::from_value).collect())
                .unwrap_or_default(),
            submit: map
                .get("submit")
                .and_then(Value::as_object)
                .filter(|submit| !submit.is_empty())
                .cloned(),
        }
    }

    pub fn contains_form_list(&self) -> bool {
        self.items.iter().any(FormItem::contains_form_list)
    }

    /// Header title: `title`, then `form.title`.
    pub fn header_title(&self) -> Option<&str> {
        self.title.as_deref().or(self.form.title.as_deref())
    }

    /// Header subtitle: `subtitle`, `form.subtitle`, `description`, `form.description`.
    pub fn header_subtitle(&self) -> Option<&str> {
        self.subtitle
            .as_deref()
            .or(self.form.subtitle.as_deref())
            .or(self.description.as_deref())
            .or(self.form.description.as_deref())
    }
}

fn present<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}

fn flag(map: &Map<String, Value>, key: &str) -> bool {
    map.get(key).map_or(false, is_truthy)
}

fn truthy_text(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).filter(|v| is_truthy(v)).map(value_text)
}

fn number(map: &Map<String, Value>, key: &str) -> Option<Number> {
    match map.get(key) {
        Some(Value::Number(n)) => Some(n.clone()),
        _ => None,
    }
}

fn integer(map: &Map<String, Value>, key: &str) -> Option<i64> {
    map.get(key).and_then(Value::as_f64).map(|f| f.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_round_trips_every_tag() {
        for kind in FieldKind::ALL {
            assert_eq!(FieldKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(FieldKind::from_tag("rich-text"), None);
    }

    #[test]
    fn test_default_value_first_present_wins() {
        let item = FormItem::from_value(&json!({
            "type": "input", "name": "a", "initialValue": "init", "value": "v"
        }));
        assert_eq!(item.default_value, Some(json!("init")));
    }

    #[test]
    fn test_unknown_tag_is_unsupported() {
        let item = FormItem::from_value(&json!({"type": "rating", "name": "r"}));
        assert_eq!(item.field, Field::Unsupported { tag: Some("rating".into()) });
        assert_eq!(item.kind(), None);
    }

    #[test]
    fn test_option_value_resolution() {
        let option = ChoiceOption::from_value(&json!({"key": "k", "label": "L"}));
        assert_eq!(option.value, json!("k"));
        assert_eq!(option.label, "L");

        let bare = ChoiceOption::from_value(&json!({"value": "opt-1"}));
        assert_eq!(bare.label, "opt-1");
    }

    #[test]
    fn test_nested_form_list_detected() {
        let definition = FormDefinition::from_value(&json!({
            "items": [
                {"type": "group", "items": [
                    {"type": "form-list", "name": "rows", "item": {"type": "input", "name": "x"}}
                ]}
            ]
        }));
        assert!(definition.contains_form_list());
    }

    #[test]
    fn test_form_list_under_single_item_child_detected() {
        let definition = FormDefinition::from_value(&json!({
            "items": [
                {"type": "card", "item": {"type": "form-list", "name": "rows", "item": {"type": "input", "name": "x"}}}
            ]
        }));
        assert!(definition.contains_form_list());

        let plain = FormDefinition::from_value(&json!({
            "items": [{"type": "card", "item": {"type": "input", "name": "x"}}]
        }));
        assert!(!plain.contains_form_list());
    }

    #[test]
    fn test_span_prefers_col_span() {
        let item = FormItem::from_value(&json!({"type": "input", "name": "a", "colSpan": 12, "span": 6}));
        assert_eq!(item.span, Some(12.0));
        let fallback = FormItem::from_value(&json!({"type": "input", "name": "a", "colSpan": "wide", "span": 6}));
        assert_eq!(fallback.span, Some(6.0));
    }
}
