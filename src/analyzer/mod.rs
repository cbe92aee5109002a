//! Manuscript Analyzer Module
//!
//! Turns raw manuscript text into structured measurements:
//! - Structural scan (equations, tables, images, headings, citations)
//! - Content profile (readability, genre, tone, sentiment)
//! - Academic detection (keywords, citations, section markers)
//! - Language guess for manuscripts without a declared language
//!
//! Everything here is pure and deterministic. Lexicons are loaded once and
//! shared read-only across concurrent jobs.

pub mod academic;
pub mod content;
pub mod language;
pub mod lexicon;
pub mod scanner;

pub use academic::AcademicDetector;
pub use content::{ContentAnalyzer, GenreRanking, Readability, rank_genres, readability};
pub use language::{DEFAULT_LANGUAGE, detect_language};
pub use lexicon::{LEXICON, Lexicon, WordMatcher, default_lexicon};
pub use scanner::{ElementKind, ElementMatch, ScanReport, Span, StructuralScanner};

use std::sync::Arc;
use tracing::debug;

use crate::types::{AcademicScore, ContentProfile, Result};

/// Everything the analysis stages produce for one manuscript
#[derive(Debug, Clone)]
pub struct ManuscriptAnalysis {
    pub profile: ContentProfile,
    pub academic: AcademicScore,
    pub report: ScanReport,
}

/// Scan, profile and classify in one pass
#[derive(Debug, Clone)]
pub struct Analyzer {
    scanner: StructuralScanner,
    content: ContentAnalyzer,
    academic: AcademicDetector,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(default_lexicon())
    }
}

impl Analyzer {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self {
            scanner: StructuralScanner::new(),
            content: ContentAnalyzer::new(Arc::clone(&lexicon)),
            academic: AcademicDetector::new(lexicon),
        }
    }

    pub fn analyze(&self, text: &str) -> Result<ManuscriptAnalysis> {
        let report = self.scanner.scan(text)?;
        let profile = self.content.profile(&report)?;
        let academic = self.academic.detect(&report, &profile);
        debug!(
            genre = %profile.primary_genre,
            academic = academic.is_academic,
            confidence = academic.confidence,
            "Manuscript analyzed"
        );
        Ok(ManuscriptAnalysis {
            profile,
            academic,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ErrorKind, Genre};

    #[test]
    fn test_empty_input_rejected() {
        let err = Analyzer::default().analyze("   \n\t ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyInput);
    }

    #[test]
    fn test_mystery_manuscript() {
        let text = "The detective examined the crime scene. A clue lay near the victim. \
                    The suspect had no alibi for the murder.";
        let analysis = Analyzer::default().analyze(text).unwrap();
        assert_eq!(analysis.profile.primary_genre, Genre::Mystery);
        assert!(!analysis.academic.is_academic);
        assert_eq!(analysis.report.stats.word_count, analysis.profile.stats.word_count);
    }
}
