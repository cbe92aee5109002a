//! Academic Detector
//!
//! Secondary classifier over the same text and profile. Combines keyword
//! density, citation markers, section markers and tone into a weighted
//! confidence; a text is academic when confidence exceeds 0.6.

use regex::Regex;
use std::sync::{Arc, LazyLock};

use super::lexicon::{Lexicon, default_lexicon};
use super::scanner::ScanReport;
use crate::constants::academic as weights;
use crate::constants::analysis::WORDS_PER_PAGE;
use crate::types::{AcademicScore, ContentProfile};

/// Citation styles the structural scanner does not count
static EXTENDED_CITATIONS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Vancouver ranges and lists: [1-3], [1, 2]
        r"\[\d+\s*[-–]\s*\d+\]",
        r"\[\d+(?:,\s*\d+)+\]",
        // Harvard: Author (2020)
        r"\p{Lu}\p{Ll}+\s+\(\d{4}[a-z]?\)",
        r"\bISSN\s+\d{4}-\d{3}[\dX]",
        r"\bISBN(?:-1[03])?:?\s+[\d-]{10,17}",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("citation pattern"))
    .collect()
});

#[derive(Debug, Clone)]
pub struct AcademicDetector {
    lexicon: Arc<Lexicon>,
}

impl Default for AcademicDetector {
    fn default() -> Self {
        Self::new(default_lexicon())
    }
}

impl AcademicDetector {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    pub fn detect(&self, report: &ScanReport, profile: &ContentProfile) -> AcademicScore {
        let prose = report.prose.as_str();
        let stats = &report.stats;
        let words = stats.word_count.max(1) as f64;

        let keyword_density = self.lexicon.academic.count(prose) as f64 / words * 1000.0;

        let citation_count = stats.citation_count
            + EXTENDED_CITATIONS
                .iter()
                .map(|re| re.find_iter(prose).count())
                .sum::<usize>();

        let structure_markers: Vec<String> = self
            .lexicon
            .structure_markers
            .iter()
            .filter(|(_, matcher)| matcher.is_match(prose))
            .map(|(name, _)| name.clone())
            .collect();
        let structure_score = if self.lexicon.structure_markers.is_empty() {
            0.0
        } else {
            structure_markers.len() as f64 / self.lexicon.structure_markers.len() as f64
        };

        let pages = (stats.word_count as f64 / WORDS_PER_PAGE).max(1.0);

        let mut score = AcademicScore {
            is_academic: false,
            confidence: 0.0,
            keyword_density,
            citation_count,
            has_abstract: self.lexicon.abstract_markers.is_match(prose),
            has_bibliography: self.lexicon.bibliography_markers.is_match(prose),
            structure_score,
            equation_density: stats.equation_count as f64 / pages,
            structure_markers,
        };
        score.confidence = confidence(&score, profile);
        score.is_academic = score.confidence > weights::ACADEMIC_CONFIDENCE;
        score
    }
}

/// Weighted confidence, capped at 1.0
pub fn confidence(score: &AcademicScore, profile: &ContentProfile) -> f64 {
    let mut confidence = 0.0;

    confidence += if score.keyword_density >= 10.0 {
        weights::KEYWORD_WEIGHT
    } else if score.keyword_density >= 5.0 {
        0.15
    } else if score.keyword_density >= 2.0 {
        0.05
    } else {
        0.0
    };

    confidence += match score.citation_count {
        n if n >= 20 => weights::CITATION_WEIGHT,
        n if n >= 10 => 0.15,
        n if n >= 5 => 0.10,
        n if n > 0 => 0.05,
        _ => 0.0,
    };

    if score.has_abstract {
        confidence += weights::ABSTRACT_WEIGHT;
    }
    if score.has_bibliography {
        confidence += weights::BIBLIOGRAPHY_WEIGHT;
    }

    confidence += score.structure_score * weights::STRUCTURE_WEIGHT;

    if profile.tone.academic > 0.7 {
        confidence += weights::TONE_WEIGHT;
    } else if profile.tone.academic > 0.5 {
        confidence += 0.05;
    }

    if profile.formality > 0.7 {
        confidence += weights::FORMALITY_WEIGHT;
    }

    confidence.clamp(0.0, 1.0)
}
