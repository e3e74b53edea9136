//! FormSmith Core - Declarative Form Compiler
//!
//! A JSON form definition goes in, one self-contained HTML document comes out.
//!
//! # Ground Rules
//! 1. Validation Runs Before Every Render
//! 2. Rendering Is Deterministic
//! 3. Unknown Field Types Degrade, They Never Fail
//! 4. One Alias Table Decides Submit Precedence
//! 5. Embedded Script Config Cannot Break Out of `<script>`

pub mod html;
pub mod definition;
pub mod validation;
pub mod layout;
pub mod fields;
pub mod merge;
pub mod submit;
pub mod document;
pub mod preview;
pub mod templates;
pub mod hashing;
pub mod pipeline;

pub use definition::{Field, FieldKind, FormDefinition, FormItem};
pub use validation::{validate_form_definition, ValidationResult, Validator};
pub use layout::{build_layout_context, LayoutContext};
pub use fields::{render_field, render_item_with_layout};
pub use merge::{merge_effective_definition, normalize_submit_config, EffectiveDefinition, SubmitSource};
pub use submit::{build_submit_script, HttpMethod, SubmitConfig};
pub use document::{render_document, HtmlOptions, RenderError};
pub use preview::render_preview;
pub use templates::{FormInstance, FormTemplate, InstanceDraft, TemplateDraft, TemplateRegistry};
pub use hashing::{canonical_json, RenderedDocument};
pub use pipeline::{FormPipeline, PipelineError};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
