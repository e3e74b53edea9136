//! HTML Primitives - Escaping and Attribute Assembly
//!
//! Form definitions are loosely typed JSON, so the helpers here follow
//! browser-script conventions for truthiness and stringification.

use serde_json::Value;
use std::fmt;

/// Escape text for element bodies and double-quoted attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Textual form of a JSON value as it would appear in markup.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// JS truthiness: null, false, 0, NaN and "" are falsy; arrays and objects are not.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Name of a JSON value's type, for diagnostics.
pub fn json_type_name(value: Option<&Value>) -> &'static str {
    match value {
        None => "undefined",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    /// `true` renders the bare attribute name, `false` omits it.
    Flag(bool),
    Text(String),
}

impl AttrValue {
    /// Map a JSON value onto an attribute; `null` means "omit".
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(AttrValue::Flag(*b)),
            other => Some(AttrValue::Text(value_text(other))),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(flag: bool) -> Self {
        AttrValue::Flag(flag)
    }
}

impl From<&str> for AttrValue {
    fn from(text: &str) -> Self {
        AttrValue::Text(text.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(text: String) -> Self {
        AttrValue::Text(text)
    }
}

/// Ordered attribute map with dictionary-update semantics: re-setting a key
/// replaces its value but keeps its original position.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    entries: Vec<(String, Option<AttrValue>)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<V: Into<AttrValue>>(&mut self, key: &str, value: Option<V>) -> &mut Self {
        let value = value.map(Into::into);
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
        self
    }

    pub fn set_json(&mut self, key: &str, value: &Value) -> &mut Self {
        self.set(key, AttrValue::from_json(value))
    }

    pub fn with<V: Into<AttrValue>>(mut self, key: &str, value: Option<V>) -> Self {
        self.set(key, value);
        self
    }

    /// Apply every entry of `other` on top of this map.
    pub fn merge(&mut self, other: Attributes) -> &mut Self {
        for (key, value) in other.entries {
            self.set(&key, value);
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.to_string().is_empty()
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.entries {
            let rendered = match value {
                None | Some(AttrValue::Flag(false)) => continue,
                Some(AttrValue::Flag(true)) => key.clone(),
                Some(AttrValue::Text(text)) => format!("{}=\"{}\"", key, escape_html(text)),
            };
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(&rendered)?;
            first = false;
        }
        Ok(())
    }
}

/// Join class names, skipping empty entries.
pub fn class_list<'a>(names: impl IntoIterator<Item = Option<&'a str>>) -> String {
    names
        .into_iter()
        .flatten()
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
