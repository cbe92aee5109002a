pub mod decision;
pub mod design;
pub mod error;
pub mod generation;
pub mod profile;

pub use decision::{Pipeline, PipelineDecision, PipelineScores};
pub use design::{
    ColorPalette, CustomDesign, DesignResult, FontMood, FontPair, GridKind, GridLayout, Harmony,
    PageFormat, PageMargins, PaletteMood, PaletteOverride, ScoredFontPair, WcagLevel,
};
pub use error::{ErrorKind, RenderFailureKind, Result, TypecraftError};
pub use generation::{
    ErrorRecord, FailedJob, GenerationMetrics, GenerationRequest, GenerationResult, OutputFile,
    OutputFormat, ProjectMetadata, Stage, StageRecord,
};
pub use profile::{AcademicScore, ContentProfile, Genre, StructuralStats, ToneProfile};

// =============================================================================
// Manuscript
// =============================================================================

use std::path::PathBuf;

/// Raw manuscript text, immutable for the duration of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manuscript {
    text: String,
    source: Option<PathBuf>,
}

impl Manuscript {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> Option<&PathBuf> {
        self.source.as_ref()
    }

    /// Display name for error messages
    pub fn source_name(&self) -> String {
        self.source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<inline>".to_string())
    }

    pub fn len_bytes(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl From<String> for Manuscript {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for Manuscript {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

#[cfg(test)]
mod manuscript_tests {
    use super::*;

    #[test]
    fn test_manuscript_source_name() {
        let inline = Manuscript::new("text");
        assert_eq!(inline.source_name(), "<inline>");
        let file = Manuscript::new("text").with_source("book.md");
        assert_eq!(file.source_name(), "book.md");
        assert_eq!(file.len_bytes(), 4);
    }
}
