//! Generate Command
//!
//! Runs one manuscript through the orchestrator and reports the artifacts.
//!
//! Usage:
//!   typecraft generate <file> [--project <id>] [--title ..] [--author ..]
//!       [--meta book.yaml] [--format pdf,epub] [--pipeline vector|web]
//!       [--output-dir dir] [--body-font ..] [--heading-font ..]
//!       [--page-format 6x9] [--json]
//!
//! Ctrl-C cancels the job cooperatively.

use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::progress::spawn_console;
use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, MetadataArgs, print_json};
use crate::orchestrator::{InMemoryProjectLookup, Orchestrator};
use crate::types::{
    CustomDesign, GenerationRequest, GenerationResult, PageFormat, Pipeline, Result,
};

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub content: PathBuf,
    pub metadata: MetadataArgs,
    pub formats: Vec<String>,
    pub pipeline: Option<Pipeline>,
    pub output_dir: Option<PathBuf>,
    pub body_font: Option<String>,
    pub heading_font: Option<String>,
    pub page_format: Option<PageFormat>,
    pub as_json: bool,
    pub show_progress: bool,
}

impl GenerateOptions {
    fn custom_design(&self) -> Option<CustomDesign> {
        let custom = CustomDesign {
            body_font: self.body_font.clone(),
            heading_font: self.heading_font.clone(),
            page_format: self.page_format,
            ..Default::default()
        };
        (!custom.is_empty()).then_some(custom)
    }

    fn request(&self, project_id: &str) -> GenerationRequest {
        let mut request = GenerationRequest::new(project_id, &self.content);
        if !self.formats.is_empty() {
            request = request.with_formats(self.formats.iter().cloned());
        }
        request.pipeline_override = self.pipeline;
        request.custom_design = self.custom_design();
        request.output_dir = self.output_dir.clone();
        request
    }
}

/// Returns the result; a partial result is reported, not turned into an error
pub async fn run(options: GenerateOptions) -> Result<GenerationResult> {
    let ctx = CommandContext::load()?;
    let metadata = options.metadata.clone().resolve(&options.content)?;
    let project_id = metadata.id.clone();
    let lookup = InMemoryProjectLookup::new().with_project(metadata);
    let orchestrator = Arc::new(Orchestrator::new(ctx.config, Arc::new(lookup))?);

    let signal = {
        let orchestrator = Arc::clone(&orchestrator);
        let project_id = project_id.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = orchestrator.cancel_generation(&project_id);
            }
        })
    };
    let console = (options.show_progress && !options.as_json)
        .then(|| spawn_console(Arc::clone(&orchestrator), project_id.clone()));

    let outcome = orchestrator.generate(options.request(&project_id)).await;
    signal.abort();
    if let Some(console) = console {
        // the watcher exits on its own once it sees the terminal stage
        let _ = tokio::time::timeout(std::time::Duration::from_millis(500), console).await;
    }
    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            if let Ok(Some(failed)) = orchestrator.last_failure(&project_id) {
                if options.as_json {
                    print_json(&failed)?;
                } else {
                    Output::new().failure(&failed);
                }
            }
            return Err(e);
        }
    };

    if options.as_json {
        print_json(&result)?;
    } else {
        let output = Output::new();
        output.generation(&result);
        if result.partial {
            output.warning("Some formats failed; see errors above");
        } else {
            output.success(&format!("Generated project {}", result.project_id));
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_options() {
        let options = GenerateOptions {
            content: PathBuf::from("book.md"),
            formats: vec!["pdf".to_string(), "epub".to_string()],
            pipeline: Some(Pipeline::Web),
            body_font: Some("Lora".to_string()),
            ..Default::default()
        };
        let request = options.request("book");
        assert_eq!(request.project_id, "book");
        assert_eq!(request.formats, vec!["pdf", "epub"]);
        assert_eq!(request.pipeline_override, Some(Pipeline::Web));
        let custom = request.custom_design.unwrap();
        assert_eq!(custom.body_font.as_deref(), Some("Lora"));
        assert!(custom.heading_font.is_none());
    }

    #[test]
    fn test_no_overrides_means_no_custom_design() {
        let options = GenerateOptions {
            content: PathBuf::from("book.md"),
            ..Default::default()
        };
        let request = options.request("book");
        assert!(request.custom_design.is_none());
        assert_eq!(request.formats, vec!["pdf"]);
    }
}
