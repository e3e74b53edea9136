//! FormSmith CLI - Form definitions in, HTML out
//!
//! Commands: render, validate, templates, view, preview
//! HTML and JSON go to stdout, diagnostics and logs to stderr.
//! Exit code 2 means the definition failed validation.

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use formsmith_core::{
    templates::TemplateRegistry, FormPipeline, HtmlOptions, PipelineError, RenderedDocument,
};

#[derive(Parser)]
#[command(name = "formsmith-cli")]
#[command(about = "FormSmith CLI - Declarative Form Compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to templates directory
    #[arg(short = 'd', long, global = true, default_value = "templates")]
    templates_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a form definition to HTML
    Render {
        /// Definition JSON file, or `-` for stdin
        input: String,

        /// Write HTML here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Page title
        #[arg(long)]
        title: Option<String>,

        /// Omit the built-in stylesheet
        #[arg(long, conflicts_with = "styles")]
        no_styles: bool,

        /// Stylesheet file replacing the built-in one
        #[arg(long)]
        styles: Option<PathBuf>,

        /// Document language
        #[arg(long, default_value = "en")]
        lang: String,
    },

    /// Validate a form definition
    Validate {
        /// Definition JSON file, or `-` for stdin
        input: String,
    },

    /// List registry templates
    Templates,

    /// Render a registry instance with its runtime config applied
    View {
        #[arg(short, long)]
        instance: String,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Render a registry template in preview mode
    Preview {
        /// Template id or slug
        #[arg(short, long)]
        template: String,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_input(input: &str) -> Result<String, std::io::Error> {
    if input == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        fs::read_to_string(input)
    }
}

fn read_definition(input: &str) -> Result<Value, PipelineError> {
    let raw = read_input(input)?;
    Ok(serde_json::from_str(&raw)?)
}

fn write_output(html: &str, out: Option<&Path>) -> Result<(), std::io::Error> {
    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, html)
        }
        None => {
            print!("{}", html);
            Ok(())
        }
    }
}

/// Print a diagnostic and pick the exit code for `err`.
fn report(context: &str, err: &PipelineError) -> ExitCode {
    let details = err.validation_errors();
    eprintln!(
        "{}",
        json!({
            "error": format!("{}: {}", context, err),
            "details": details,
        })
    );
    if details.is_empty() {
        ExitCode::FAILURE
    } else {
        ExitCode::from(2)
    }
}

fn emit(result: Result<RenderedDocument, PipelineError>, out: Option<&Path>, context: &str) -> ExitCode {
    match result.and_then(|doc| write_output(&doc.html, out).map_err(PipelineError::from)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(context, &e),
    }
}

fn load_pipeline(dir: &Path) -> Result<FormPipeline, ExitCode> {
    TemplateRegistry::load_from_dir(dir)
        .map(FormPipeline::new)
        .map_err(|e| report("Failed to load templates", &PipelineError::from(e)))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match cli.command {
        Commands::Render { input, out, title, no_styles, styles, lang } => {
            let pipeline = FormPipeline::default();
            let result = (|| -> Result<RenderedDocument, PipelineError> {
                let definition = read_definition(&input)?;
                let styles = styles.map(fs::read_to_string).transpose()?;
                let options = HtmlOptions {
                    title,
                    include_styles: !no_styles,
                    styles,
                    lang,
                };
                pipeline.render_definition(&definition, &options)
            })();
            emit(result, out.as_deref(), "Failed to convert form definition")
        }

        Commands::Validate { input } => {
            let definition = match read_definition(&input) {
                Ok(d) => d,
                Err(e) => return report("Failed to read form definition", &e),
            };
            let result = FormPipeline::default().validate_definition(&definition);
            println!(
                "{}",
                json!({
                    "valid": result.valid,
                    "errors": result.errors(),
                })
            );
            if result.valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2) // Validation failure
            }
        }

        Commands::Templates => {
            let pipeline = match load_pipeline(&cli.templates_dir) {
                Ok(p) => p,
                Err(code) => return code,
            };
            let templates: Vec<_> = pipeline
                .list_templates()
                .iter()
                .map(|t| {
                    json!({
                        "id": t.id,
                        "slug": t.slug,
                        "title": t.title,
                        "version": t.version,
                        "instances": pipeline.list_instances(Some(&t.id)).len(),
                    })
                })
                .collect();
            match serde_json::to_string_pretty(&templates) {
                Ok(text) => {
                    println!("{}", text);
                    ExitCode::SUCCESS
                }
                Err(e) => report("Failed to list templates", &PipelineError::from(e)),
            }
        }

        Commands::View { instance, out } => match load_pipeline(&cli.templates_dir) {
            Ok(pipeline) => emit(
                pipeline.render_instance(&instance),
                out.as_deref(),
                "Failed to render instance",
            ),
            Err(code) => code,
        },

        Commands::Preview { template, out } => match load_pipeline(&cli.templates_dir) {
            Ok(pipeline) => emit(
                pipeline.preview_template(&template),
                out.as_deref(),
                "Failed to render preview",
            ),
            Err(code) => code,
        },
    }
}
