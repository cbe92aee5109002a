//! Unified Error Type System
//!
//! Centralized error type for the whole book-production core.
//!
//! ## Error Kinds
//!
//! Every error maps to a stable [`ErrorKind`] identifier that is surfaced to
//! callers alongside a human-readable detail. The orchestrator is the only
//! component that decides whether a kind is fatal for a job; pure components
//! just return the error.
//!
//! ## Render Failures
//!
//! Renderer problems are scoped to a single output format and carry a
//! [`RenderFailureKind`] so callers can tell a timeout from a broken artifact.

use std::time::Duration;
use thiserror::Error;

use super::generation::OutputFormat;

// =============================================================================
// Error Kinds
// =============================================================================

/// Stable error identifiers exposed to users and recorded in results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    EmptyInput,
    ProjectNotFound,
    UnsupportedFormat,
    AnalysisFailed,
    DesignFailed,
    SelectorFailed,
    RenderFailed,
    ValidationFailed,
    Cancelled,
    UnknownJob,
    Config,
    Io,
    Serialization,
    Llm,
    Timeout,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::EmptyInput => "EMPTY_INPUT",
            Self::ProjectNotFound => "PROJECT_NOT_FOUND",
            Self::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            Self::AnalysisFailed => "ANALYSIS_FAILED",
            Self::DesignFailed => "DESIGN_FAILED",
            Self::SelectorFailed => "SELECTOR_FAILED",
            Self::RenderFailed => "RENDER_FAILED",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::Cancelled => "CANCELLED",
            Self::UnknownJob => "UNKNOWN_JOB",
            Self::Config => "CONFIG",
            Self::Io => "IO",
            Self::Serialization => "SERIALIZATION",
            Self::Llm => "LLM",
            Self::Timeout => "TIMEOUT",
        };
        write!(f, "{}", s)
    }
}

impl ErrorKind {
    /// Whether this kind aborts the whole job rather than a single format
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::RenderFailed | Self::ValidationFailed)
    }
}

/// Why an external renderer did not produce a usable artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderFailureKind {
    Timeout,
    NonZeroExit,
    MissingOutput,
    InvalidHeader,
}

impl std::fmt::Display for RenderFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::NonZeroExit => write!(f, "non-zero exit"),
            Self::MissingOutput => write!(f, "missing output"),
            Self::InvalidHeader => write!(f, "invalid header"),
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum TypecraftError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Config error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Input Errors
    // -------------------------------------------------------------------------
    #[error("Empty content: {source_name} contains no text")]
    EmptyInput { source_name: String },

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Unsupported output format '{0}' (expected pdf or epub)")]
    UnsupportedFormat(String),

    // -------------------------------------------------------------------------
    // Stage Errors
    // -------------------------------------------------------------------------
    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Design failed: {0}")]
    DesignFailed(String),

    #[error("Pipeline selection failed: vector={vector_score:.3}, web={web_score:.3}")]
    SelectorFailed { vector_score: f64, web_score: f64 },

    #[error("Render failed for {format} ({kind}): {detail}")]
    RenderFailed {
        kind: RenderFailureKind,
        format: OutputFormat,
        detail: String,
    },

    #[error("Validation failed for {format}: {reason}")]
    ValidationFailed { format: OutputFormat, reason: String },

    #[error("Generation cancelled after stage {last_stage}")]
    Cancelled { last_stage: String },

    #[error("Unknown job: {0}")]
    UnknownJob(String),

    // -------------------------------------------------------------------------
    // Refinement Errors
    // -------------------------------------------------------------------------
    #[error("LLM error: {0}")]
    Llm(String),

    /// Operation timeout with context
    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },
}

pub type Result<T> = std::result::Result<T, TypecraftError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl TypecraftError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create an empty-input error for a named source
    pub fn empty_input(source_name: impl Into<String>) -> Self {
        Self::EmptyInput {
            source_name: source_name.into(),
        }
    }

    /// Create a render failure for one output format
    pub fn render(kind: RenderFailureKind, format: OutputFormat, detail: impl Into<String>) -> Self {
        Self::RenderFailed {
            kind,
            format,
            detail: detail.into(),
        }
    }

    /// Create a validation failure for one output format
    pub fn validation(format: OutputFormat, reason: impl Into<String>) -> Self {
        Self::ValidationFailed {
            format,
            reason: reason.into(),
        }
    }

    /// Stable kind identifier for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::Json(_) | Self::Yaml(_) => ErrorKind::Serialization,
            Self::Config(_) => ErrorKind::Config,
            Self::EmptyInput { .. } => ErrorKind::EmptyInput,
            Self::ProjectNotFound(_) => ErrorKind::ProjectNotFound,
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::AnalysisFailed(_) => ErrorKind::AnalysisFailed,
            Self::DesignFailed(_) => ErrorKind::DesignFailed,
            Self::SelectorFailed { .. } => ErrorKind::SelectorFailed,
            Self::RenderFailed { .. } => ErrorKind::RenderFailed,
            Self::ValidationFailed { .. } => ErrorKind::ValidationFailed,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::UnknownJob(_) => ErrorKind::UnknownJob,
            Self::Llm(_) => ErrorKind::Llm,
            Self::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// Check if a refinement call may be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Llm(msg) => {
                let lower = msg.to_lowercase();
                lower.contains("429")
                    || lower.contains("rate limit")
                    || lower.contains("timed out")
                    || lower.contains("connection")
                    || lower.contains("503")
                    || lower.contains("502")
                    || lower.contains("500")
            }
            _ => false,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::EmptyInput.to_string(), "EMPTY_INPUT");
        assert_eq!(ErrorKind::RenderFailed.to_string(), "RENDER_FAILED");
        assert_eq!(ErrorKind::UnknownJob.to_string(), "UNKNOWN_JOB");
    }

    #[test]
    fn test_error_kind_serializes_like_display() {
        let json = serde_json::to_string(&ErrorKind::ValidationFailed).unwrap();
        assert_eq!(json, "\"VALIDATION_FAILED\"");
    }

    #[test]
    fn test_fatality() {
        assert!(ErrorKind::AnalysisFailed.is_fatal());
        assert!(ErrorKind::Cancelled.is_fatal());
        assert!(!ErrorKind::RenderFailed.is_fatal());
        assert!(!ErrorKind::ValidationFailed.is_fatal());
    }

    #[test]
    fn test_render_error_message() {
        let err = TypecraftError::render(
            RenderFailureKind::Timeout,
            OutputFormat::Pdf,
            "lualatex exceeded 120s",
        );
        assert_eq!(err.kind(), ErrorKind::RenderFailed);
        let msg = err.to_string();
        assert!(msg.contains("pdf"));
        assert!(msg.contains("timeout"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: TypecraftError = io.into();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_transient_classification() {
        assert!(TypecraftError::Llm("HTTP 429 rate limit".into()).is_transient());
        assert!(TypecraftError::timeout("refine", Duration::from_secs(1)).is_transient());
        assert!(!TypecraftError::Llm("invalid api key".into()).is_transient());
        assert!(!TypecraftError::AnalysisFailed("nan".into()).is_transient());
    }
}
