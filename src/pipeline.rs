//! Form Pipeline - Single Entry Point
//!
//! Registry lookups, runtime merging, rendering and fingerprinting all go
//! through `FormPipeline`. Every render path ends in `render_document`, which
//! validates before producing markup.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::document::{render_document, HtmlOptions, RenderError};
use crate::hashing::RenderedDocument;
use crate::merge::merge_effective_definition;
use crate::preview::{build_preview_definition, render_preview};
use crate::templates::{
    FormInstance, FormTemplate, InstanceDraft, RegistryError, TemplateDraft, TemplateRegistry,
};
use crate::validation::{ValidationResult, Validator};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    #[error("Conflict: {0}")]
    TemplateConflict(String),

    #[error("template_id or template_slug is required.")]
    MissingTemplateReference,

    #[error("Form definition failed validation.")]
    InvalidDefinition(Vec<String>),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Validation messages carried by the error, if any.
    pub fn validation_errors(&self) -> &[String] {
        match self {
            PipelineError::InvalidDefinition(errors) => errors,
            PipelineError::Render(err) => err.errors(),
            _ => &[],
        }
    }
}

impl From<RegistryError> for PipelineError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Conflict(detail) | RegistryError::InstanceConflict(detail) => {
                PipelineError::TemplateConflict(detail)
            }
            RegistryError::TemplateNotFound(id) => PipelineError::TemplateNotFound(id),
            RegistryError::MissingTemplateReference => PipelineError::MissingTemplateReference,
        }
    }
}

pub struct FormPipeline {
    registry: TemplateRegistry,
    validator: Validator,
}

impl FormPipeline {
    pub fn new(registry: TemplateRegistry) -> Self {
        Self {
            registry,
            validator: Validator::new(),
        }
    }

    pub fn list_templates(&self) -> Vec<&FormTemplate> {
        self.registry.list()
    }

    /// Look a template up by id or slug.
    pub fn get_template(&self, identifier: &str) -> Option<&FormTemplate> {
        self.registry.get(identifier)
    }

    pub fn get_instance(&self, id: &str) -> Option<&FormInstance> {
        self.registry.get_instance(id)
    }

    pub fn list_instances(&self, template_id: Option<&str>) -> Vec<&FormInstance> {
        self.registry.list_instances(template_id)
    }

    pub fn validate_definition(&self, definition: &Value) -> ValidationResult {
        self.validator.validate(definition)
    }

    /// Store a template after validating its definition.
    pub fn register_template(&mut self, draft: TemplateDraft) -> Result<FormTemplate, PipelineError> {
        let result = self.validate_definition(&draft.definition);
        if !result.valid {
            return Err(PipelineError::InvalidDefinition(result.errors()));
        }
        let template = self.registry.create_template(draft)?;
        info!(template_id = %template.id, slug = %template.slug, "Registered form template");
        Ok(template)
    }

    pub fn create_instance(&mut self, draft: InstanceDraft) -> Result<FormInstance, PipelineError> {
        let instance = self.registry.create_instance(draft)?;
        info!(instance_id = %instance.id, template_id = %instance.template_id, "Created form instance");
        Ok(instance)
    }

    /// Drop a template, looked up by id or slug, along with its instances.
    pub fn remove_template(&mut self, identifier: &str) -> Result<FormTemplate, PipelineError> {
        let template = self
            .registry
            .remove(identifier)
            .ok_or_else(|| PipelineError::TemplateNotFound(identifier.to_string()))?;
        info!(template_id = %template.id, slug = %template.slug, "Removed form template");
        Ok(template)
    }

    /// Render a bare definition with explicit html options.
    pub fn render_definition(
        &self,
        definition: &Value,
        options: &HtmlOptions,
    ) -> Result<RenderedDocument, PipelineError> {
        let html = render_document(definition, options)?;
        Ok(RenderedDocument::new(html, definition, &serde_json::to_value(options)?)?)
    }

    /// Merge an instance's runtime config into its template and render it.
    pub fn render_instance(&self, instance_id: &str) -> Result<RenderedDocument, PipelineError> {
        let instance = self
            .registry
            .get_instance(instance_id)
            .ok_or_else(|| PipelineError::InstanceNotFound(instance_id.to_string()))?;
        let template = self
            .registry
            .get(&instance.template_id)
            .ok_or_else(|| PipelineError::TemplateNotFound(instance.template_id.clone()))?;

        let effective = merge_effective_definition(
            &template.definition,
            &template.html_options,
            &instance.runtime_config,
            &instance.id,
        );
        debug!(
            instance_id = %instance.id,
            sources = ?effective.provenance.entries(),
            "Resolved submit configuration"
        );

        let options = HtmlOptions::from_value(&effective.html_options);
        let html = render_document(&effective.definition, &options)?;
        info!(instance_id = %instance.id, template_id = %template.id, "Rendered form instance");

        Ok(RenderedDocument::new(html, &effective.definition, &effective.html_options)?
            .with_template(&template.id)
            .with_instance(&instance.id))
    }

    /// Render a template in preview mode: no submit wiring, preview chrome.
    pub fn preview_template(&self, identifier: &str) -> Result<RenderedDocument, PipelineError> {
        let template = self
            .registry
            .get(identifier)
            .ok_or_else(|| PipelineError::TemplateNotFound(identifier.to_string()))?;

        let options = HtmlOptions::from_value(&template.html_options);
        let html = render_preview(&template.definition, &options)?;
        debug!(template_id = %template.id, "Rendered template preview");

        let preview_definition = build_preview_definition(&template.definition);
        Ok(RenderedDocument::new(html, &preview_definition, &template.html_options)?
            .with_template(&template.id))
    }
}

impl Default for FormPipeline {
    fn default() -> Self {
        Self::new(TemplateRegistry::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pipeline_with_template() -> (FormPipeline, FormTemplate) {
        let mut pipeline = FormPipeline::default();
        let template = pipeline
            .register_template(TemplateDraft {
                slug: Some("survey".into()),
                ..TemplateDraft::new(
                    "Survey",
                    json!({"title": "Survey", "items": [{"type": "input", "name": "a", "required": true}]}),
                )
            })
            .unwrap();
        (pipeline, template)
    }

    #[test]
    fn test_register_rejects_invalid_definition() {
        let mut pipeline = FormPipeline::default();
        let err = pipeline
            .register_template(TemplateDraft::new("Bad", json!({"items": "nope"})))
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidDefinition(_)));
        assert_eq!(err.validation_errors().len(), 1);
        assert!(pipeline.list_templates().is_empty());
    }

    #[test]
    fn test_conflict_maps_to_pipeline_error() {
        let (mut pipeline, _) = pipeline_with_template();
        let err = pipeline
            .register_template(TemplateDraft {
                slug: Some("survey".into()),
                ..TemplateDraft::new("Again", json!({"items": []}))
            })
            .unwrap_err();
        assert!(matches!(err, PipelineError::TemplateConflict(_)));
    }

    #[test]
    fn test_render_instance_synthesizes_endpoint() {
        let (mut pipeline, template) = pipeline_with_template();
        let instance = pipeline
            .create_instance(InstanceDraft {
                id: Some("inst42".into()),
                template_id: Some(template.id.clone()),
                runtime_config: json!({"htmlOptions": {"title": "Runtime"}}),
                ..InstanceDraft::default()
            })
            .unwrap();

        let doc = pipeline.render_instance(&instance.id).unwrap();
        assert!(doc.html.contains("<title>Runtime</title>"));
        assert!(doc.html.contains("/forms/inst42/submissions"));
        assert_eq!(doc.template_id.as_deref(), Some(template.id.as_str()));
        assert_eq!(doc.instance_id.as_deref(), Some("inst42"));
    }

    #[test]
    fn test_render_is_deterministic_apart_from_timestamp() {
        let (mut pipeline, template) = pipeline_with_template();
        let instance = pipeline
            .create_instance(InstanceDraft { template_id: Some(template.id), ..InstanceDraft::default() })
            .unwrap();
        let first = pipeline.render_instance(&instance.id).unwrap();
        let second = pipeline.render_instance(&instance.id).unwrap();
        assert_eq!(first.html, second.html);
        assert_eq!(first.content_hash, second.content_hash);
        assert_eq!(first.definition_hash, second.definition_hash);
    }

    #[test]
    fn test_remove_template_drops_instances() {
        let (mut pipeline, template) = pipeline_with_template();
        let instance = pipeline
            .create_instance(InstanceDraft { template_id: Some(template.id.clone()), ..InstanceDraft::default() })
            .unwrap();

        let removed = pipeline.remove_template("survey").unwrap();
        assert_eq!(removed.id, template.id);
        assert!(pipeline.get_template(&template.id).is_none());
        assert!(pipeline.get_instance(&instance.id).is_none());
        assert!(matches!(
            pipeline.remove_template("survey"),
            Err(PipelineError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn test_unknown_instance() {
        let pipeline = FormPipeline::default();
        assert!(matches!(
            pipeline.render_instance("missing"),
            Err(PipelineError::InstanceNotFound(_))
        ));
    }

    #[test]
    fn test_preview_by_slug() {
        let (pipeline, _) = pipeline_with_template();
        let doc = pipeline.preview_template("survey").unwrap();
        assert!(doc.html.contains("<title>Survey · 预览</title>"));
        assert!(doc.html.contains("preview-banner"));
        assert!(doc.instance_id.is_none());
    }
}
