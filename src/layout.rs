//! Layout Engine - 24-column grid arithmetic

use crate::definition::{ColSpec, FormItem, FormOptions};

/// Grid width; also the span of an item that declares none.
pub const DEFAULT_SPAN: u32 = 24;
pub const DEFAULT_GUTTER: f64 = 24.0;
pub const DEFAULT_LABEL_COL: ColSpec = ColSpec { span: 8.0 };
pub const DEFAULT_WRAPPER_COL: ColSpec = ColSpec { span: 16.0 };

/// Defaulted grid settings shared by every item of one form.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutContext {
    pub label_col: ColSpec,
    pub wrapper_col: ColSpec,
    pub gutter: f64,
    pub form_options: FormOptions,
}

impl LayoutContext {
    fn has_custom_gutter(&self) -> bool {
        self.gutter != DEFAULT_GUTTER
    }
}

pub fn build_layout_context(form_options: &FormOptions) -> LayoutContext {
    LayoutContext {
        label_col: form_options.label_col.unwrap_or(DEFAULT_LABEL_COL),
        wrapper_col: form_options.wrapper_col.unwrap_or(DEFAULT_WRAPPER_COL),
        gutter: form_options.gutter.unwrap_or(DEFAULT_GUTTER),
        form_options: form_options.clone(),
    }
}

/// Clamp a declared span into `[1, 24]`; no span means full width.
pub fn clamp_span(span: Option<f64>) -> f64 {
    match span {
        Some(s) if s.is_finite() => s.clamp(1.0, DEFAULT_SPAN as f64),
        _ => DEFAULT_SPAN as f64,
    }
}

/// Column width as a percentage of the grid.
pub fn column_width_percent(span: Option<f64>) -> f64 {
    clamp_span(span) / DEFAULT_SPAN as f64 * 100.0
}

/// Inline CSS for an item's column: flex basis and max width, then any
/// gutter padding, then the item's own `style` map (so it wins).
pub fn compute_column_style(item: &FormItem, ctx: &LayoutContext) -> String {
    let width = column_width_percent(item.span);
    let mut declarations = vec![
        format!("flex: 0 0 {:.6}%", width),
        format!("max-width: {:.6}%", width),
    ];
    if ctx.has_custom_gutter() {
        declarations.push(format!("padding: 0 {}px", format_px(ctx.gutter / 2.0)));
    }
    if !item.style.is_empty() {
        declarations.push(inline_style_string(&item.style));
    }
    declarations.join("; ")
}

/// Inline CSS for the row wrapping a column; empty for the default gutter.
pub fn compute_row_style(ctx: &LayoutContext) -> String {
    if !ctx.has_custom_gutter() {
        return String::new();
    }
    let half = format_px(ctx.gutter / 2.0);
    format!("margin-left: -{}px; margin-right: -{}px", half, half)
}

pub fn inline_style_string(style: &[(String, String)]) -> String {
    style
        .iter()
        .map(|(key, value)| format!("{}:{}", to_kebab_case(key), value))
        .collect::<Vec<_>>()
        .join(";")
}

pub fn to_kebab_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn format_px(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
