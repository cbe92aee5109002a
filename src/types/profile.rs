//! Content Profile Types
//!
//! Immutable analysis records passed by value from the analyzer to the
//! selector, the design synthesizer and the orchestrator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::error::{Result, TypecraftError};

// =============================================================================
// Genre
// =============================================================================

/// Known genres, declared in lexicographic order so that `Ord` breaks ties
/// the same way as comparing names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Genre {
    Academic,
    Business,
    Fantasy,
    Fiction,
    Mystery,
    Romance,
    Scifi,
    Technical,
    /// Reported only when every genre score is zero
    Unknown,
}

impl Genre {
    /// Genres with a keyword lexicon
    pub const KNOWN: [Genre; 8] = [
        Genre::Academic,
        Genre::Business,
        Genre::Fantasy,
        Genre::Fiction,
        Genre::Mystery,
        Genre::Romance,
        Genre::Scifi,
        Genre::Technical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Academic => "academic",
            Self::Business => "business",
            Self::Fantasy => "fantasy",
            Self::Fiction => "fiction",
            Self::Mystery => "mystery",
            Self::Romance => "romance",
            Self::Scifi => "scifi",
            Self::Technical => "technical",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Genre {
    type Err = TypecraftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "academic" => Ok(Self::Academic),
            "business" => Ok(Self::Business),
            "fantasy" => Ok(Self::Fantasy),
            "fiction" => Ok(Self::Fiction),
            "mystery" => Ok(Self::Mystery),
            "romance" => Ok(Self::Romance),
            "scifi" | "sci-fi" => Ok(Self::Scifi),
            "technical" => Ok(Self::Technical),
            "unknown" => Ok(Self::Unknown),
            other => Err(TypecraftError::Config(format!("Unknown genre '{}'", other))),
        }
    }
}

// =============================================================================
// Structural Statistics
// =============================================================================

/// Counts produced by the structural scanner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuralStats {
    pub word_count: usize,
    pub sentence_count: usize,
    pub paragraph_count: usize,
    pub avg_sentence_len: f64,
    pub avg_word_len: f64,
    pub syllable_count: usize,
    pub image_count: usize,
    pub table_count: usize,
    pub equation_count: usize,
    pub code_block_count: usize,
    pub citation_count: usize,
    pub heading_count: usize,
}

// =============================================================================
// Content Profile
// =============================================================================

/// Independent tone intensities, each in [0, 1]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToneProfile {
    pub formal: f64,
    pub casual: f64,
    pub technical: f64,
    pub creative: f64,
    pub academic: f64,
}

/// Genre, tone and complexity profile of a manuscript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentProfile {
    pub primary_genre: Genre,
    pub secondary_genre: Option<Genre>,
    pub genre_scores: BTreeMap<Genre, f64>,
    pub tone: ToneProfile,
    pub formality: f64,
    pub technical_density: f64,
    pub complexity: f64,
    pub flesch_score: f64,
    pub sentiment: f64,
    pub image_ratio: f64,
    pub estimated_pages: f64,
    pub is_academic: bool,
    pub has_math: bool,
    pub has_complex_math: bool,
    pub has_rich_media: bool,
    pub stats: StructuralStats,
}

/// Neutral profile: unknown genre, midpoint readability, no elements
impl Default for ContentProfile {
    fn default() -> Self {
        Self {
            primary_genre: Genre::Unknown,
            secondary_genre: None,
            genre_scores: BTreeMap::new(),
            tone: ToneProfile::default(),
            formality: 0.5,
            technical_density: 0.0,
            complexity: 0.5,
            flesch_score: 50.0,
            sentiment: 0.0,
            image_ratio: 0.0,
            estimated_pages: 0.0,
            is_academic: false,
            has_math: false,
            has_complex_math: false,
            has_rich_media: false,
            stats: StructuralStats::default(),
        }
    }
}

impl ContentProfile {
    /// Reject profiles with non-finite or out-of-range values.
    pub fn validate(&self) -> Result<()> {
        let unit_fields = [
            ("tone.formal", self.tone.formal),
            ("tone.casual", self.tone.casual),
            ("tone.technical", self.tone.technical),
            ("tone.creative", self.tone.creative),
            ("tone.academic", self.tone.academic),
            ("formality", self.formality),
            ("technical_density", self.technical_density),
            ("complexity", self.complexity),
            ("image_ratio", self.image_ratio),
        ];
        for (name, value) in unit_fields {
            check_range(name, value, 0.0, 1.0)?;
        }
        for (genre, score) in &self.genre_scores {
            check_range(genre.as_str(), *score, 0.0, 1.0)?;
        }
        check_range("flesch_score", self.flesch_score, 0.0, 100.0)?;
        check_range("sentiment", self.sentiment, -1.0, 1.0)?;
        if !self.estimated_pages.is_finite() || self.estimated_pages < 0.0 {
            return Err(TypecraftError::AnalysisFailed(format!(
                "estimated_pages is invalid: {}",
                self.estimated_pages
            )));
        }
        Ok(())
    }

    /// Score of a genre, zero when absent
    pub fn genre_score(&self, genre: Genre) -> f64 {
        self.genre_scores.get(&genre).copied().unwrap_or(0.0)
    }
}

fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(TypecraftError::AnalysisFailed(format!(
            "{} out of range [{}, {}]: {}",
            name, min, max, value
        )));
    }
    Ok(())
}

// =============================================================================
// Academic Score
// =============================================================================

/// Output of the academic detector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcademicScore {
    pub is_academic: bool,
    pub confidence: f64,
    /// Academic lexicon hits per 1000 words
    pub keyword_density: f64,
    pub citation_count: usize,
    pub has_abstract: bool,
    pub has_bibliography: bool,
    pub structure_score: f64,
    /// Equations per estimated page
    pub equation_density: f64,
    pub structure_markers: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_profile() -> ContentProfile {
        ContentProfile {
            primary_genre: Genre::Fiction,
            secondary_genre: None,
            genre_scores: BTreeMap::from([(Genre::Fiction, 1.0)]),
            tone: ToneProfile::default(),
            formality: 0.5,
            technical_density: 0.0,
            complexity: 0.5,
            flesch_score: 50.0,
            sentiment: 0.0,
            image_ratio: 0.0,
            estimated_pages: 1.0,
            is_academic: false,
            has_math: false,
            has_complex_math: false,
            has_rich_media: false,
            stats: StructuralStats::default(),
        }
    }

    #[test]
    fn test_genre_order_is_lexicographic() {
        let mut names: Vec<&str> = Genre::KNOWN.iter().map(|g| g.as_str()).collect();
        let declared = names.clone();
        names.sort();
        assert_eq!(names, declared);
        assert!(Genre::Academic < Genre::Technical);
    }

    #[test]
    fn test_genre_parse() {
        assert_eq!("Sci-Fi".parse::<Genre>().unwrap(), Genre::Scifi);
        assert!("poetry".parse::<Genre>().is_err());
    }

    #[test]
    fn test_validate_accepts_sane_profile() {
        assert!(sample_profile().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_nan() {
        let mut profile = sample_profile();
        profile.complexity = f64::NAN;
        let err = profile.validate().unwrap_err();
        assert!(matches!(err, TypecraftError::AnalysisFailed(_)));
    }

    #[test]
    fn test_validate_rejects_sentiment_out_of_range() {
        let mut profile = sample_profile();
        profile.sentiment = 1.5;
        assert!(profile.validate().is_err());
    }
}
