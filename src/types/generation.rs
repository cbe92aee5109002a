//! Generation Types
//!
//! Requests, stage records and the result emitted once per orchestrator run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::decision::{Pipeline, PipelineDecision};
use super::design::{CustomDesign, DesignResult};
use super::error::{ErrorKind, Result, TypecraftError};
use super::profile::{AcademicScore, ContentProfile};
use crate::constants::render as render_constants;

// =============================================================================
// Output Format
// =============================================================================

/// Artifact formats the core can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Pdf,
    Epub,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Epub => "epub",
        }
    }

    /// Leading bytes every valid artifact of this format starts with
    pub fn magic(&self) -> &'static [u8] {
        match self {
            Self::Pdf => render_constants::PDF_MAGIC,
            Self::Epub => render_constants::EPUB_MAGIC,
        }
    }

    /// Parse a list of requested format names, rejecting anything unknown
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<OutputFormat>> {
        let mut formats = Vec::new();
        for name in names {
            let format: OutputFormat = name.as_ref().parse()?;
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        Ok(formats)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = TypecraftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "epub" => Ok(Self::Epub),
            other => Err(TypecraftError::UnsupportedFormat(other.to_string())),
        }
    }
}

// =============================================================================
// Request
// =============================================================================

/// Project metadata resolved by the caller-provided lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    /// BCP 47 tag; empty means detect it from the manuscript
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "en".to_string()
}

impl ProjectMetadata {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: None,
            language: default_language(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

/// Input to a single generation job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub project_id: String,
    pub content_path: PathBuf,
    /// Raw format names; validated when the job starts
    pub formats: Vec<String>,
    #[serde(default)]
    pub pipeline_override: Option<Pipeline>,
    #[serde(default)]
    pub custom_design: Option<CustomDesign>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl GenerationRequest {
    pub fn new(project_id: impl Into<String>, content_path: impl Into<PathBuf>) -> Self {
        Self {
            project_id: project_id.into(),
            content_path: content_path.into(),
            formats: vec!["pdf".to_string()],
            pipeline_override: None,
            custom_design: None,
            output_dir: None,
        }
    }

    pub fn with_formats<S: Into<String>>(mut self, formats: impl IntoIterator<Item = S>) -> Self {
        self.formats = formats.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline_override = Some(pipeline);
        self
    }

    pub fn with_custom_design(mut self, design: CustomDesign) -> Self {
        self.custom_design = Some(design);
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }
}

// =============================================================================
// Stages
// =============================================================================

/// Orchestrator states in their declared order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Init,
    ContentRead,
    Analyzing,
    Designing,
    PipelineSelected,
    Rendering,
    Validating,
    Completed,
    Failed,
    Cancelled,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::ContentRead => "CONTENT_READ",
            Self::Analyzing => "ANALYZING",
            Self::Designing => "DESIGNING",
            Self::PipelineSelected => "PIPELINE_SELECTED",
            Self::Rendering => "RENDERING",
            Self::Validating => "VALIDATING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Progress percentage reported when the stage is entered
    pub fn base_percent(&self) -> u8 {
        match self {
            Self::Init => 0,
            Self::ContentRead => 10,
            Self::Analyzing => 20,
            Self::Designing => 35,
            Self::PipelineSelected => 45,
            Self::Rendering => 50,
            Self::Validating => 90,
            Self::Completed => 100,
            Self::Failed | Self::Cancelled => 0,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error kind plus human-readable detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub detail: String,
}

impl From<&TypecraftError> for ErrorRecord {
    fn from(err: &TypecraftError) -> Self {
        Self {
            kind: err.kind(),
            detail: err.to_string(),
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

/// One recorded transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_ms: u64,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
}

// =============================================================================
// Result
// =============================================================================

/// Per-job timings in milliseconds plus artifact totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetrics {
    pub analysis_ms: u64,
    pub design_ms: u64,
    pub selection_ms: u64,
    pub render_ms: u64,
    pub validation_ms: u64,
    pub total_ms: u64,
    /// Combined size of all validated outputs in bytes
    pub file_size: u64,
    pub page_count: Option<u32>,
}

/// A validated artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputFile {
    pub path: PathBuf,
    pub size: u64,
    #[serde(default)]
    pub page_count: Option<u32>,
}

/// Outcome of one generation job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub job_id: String,
    pub project_id: String,
    pub pipeline: Pipeline,
    /// Selector output; when the pipeline was overridden this is the
    /// recommendation that was not used.
    pub decision: PipelineDecision,
    pub pipeline_overridden: bool,
    pub output_files: BTreeMap<OutputFormat, OutputFile>,
    pub design_metadata: DesignResult,
    pub content_profile: ContentProfile,
    pub academic_score: AcademicScore,
    pub metrics: GenerationMetrics,
    pub content_digest: String,
    pub content_bytes: u64,
    pub stages: Vec<StageRecord>,
    pub success: bool,
    pub partial: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub format_errors: BTreeMap<OutputFormat, ErrorRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<String>,
}

/// What is left of a job that ended in FAILED or CANCELLED
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedJob {
    pub job_id: String,
    pub project_id: String,
    /// `Failed` or `Cancelled`
    pub outcome: Stage,
    /// Stage that was open when the job stopped
    pub failed_at: Stage,
    pub error: ErrorRecord,
    pub stages: Vec<StageRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse_list_dedupes() {
        let formats = OutputFormat::parse_list(&["pdf", "EPUB", "pdf"]).unwrap();
        assert_eq!(formats, vec![OutputFormat::Pdf, OutputFormat::Epub]);
    }

    #[test]
    fn test_output_format_rejects_unknown() {
        let err = OutputFormat::parse_list(&["pdf", "docx"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    }

    #[test]
    fn test_stage_order_matches_progress() {
        let order = [
            Stage::Init,
            Stage::ContentRead,
            Stage::Analyzing,
            Stage::Designing,
            Stage::PipelineSelected,
            Stage::Rendering,
            Stage::Validating,
            Stage::Completed,
        ];
        for pair in order.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].base_percent() < pair[1].base_percent());
        }
    }

    #[test]
    fn test_request_builder() {
        let request = GenerationRequest::new("42", "book.md")
            .with_formats(["pdf", "epub"])
            .with_pipeline(Pipeline::Vector);
        assert_eq!(request.formats, vec!["pdf", "epub"]);
        assert_eq!(request.pipeline_override, Some(Pipeline::Vector));
    }
}
