//! Content Analyzer
//!
//! Derives a [`ContentProfile`] from scanner output and the lexicon:
//! readability (Flesch), genre ranking, tone intensities, formality,
//! technical density, sentiment and image ratio.
//!
//! The analyzer is pure. The same text always yields the same profile and no
//! external service is ever consulted.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::lexicon::{Lexicon, default_lexicon};
use super::scanner::{ScanReport, StructuralScanner};
use crate::constants::analysis::{self as consts, derived};
use crate::types::{ContentProfile, Genre, Result, StructuralStats, ToneProfile};

/// Readability pair: raw Flesch clamped to [0, 100] and the derived complexity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Readability {
    pub flesch: f64,
    pub complexity: f64,
}

/// Flesch reading ease mapped to complexity.
///
/// Texts with no sentences or fewer than two words have no meaningful
/// readability and get the neutral midpoint.
pub fn readability(stats: &StructuralStats) -> Readability {
    if stats.sentence_count == 0 || stats.word_count < 2 {
        return Readability {
            flesch: consts::NEUTRAL_FLESCH,
            complexity: consts::NEUTRAL_COMPLEXITY,
        };
    }
    let words = stats.word_count as f64;
    let words_per_sentence = words / stats.sentence_count as f64;
    let syllables_per_word = stats.syllable_count as f64 / words;
    let flesch = (206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word).clamp(0.0, 100.0);
    Readability {
        flesch,
        complexity: 1.0 - flesch / 100.0,
    }
}

/// Genre ranking after max-normalization
#[derive(Debug, Clone, PartialEq)]
pub struct GenreRanking {
    pub scores: BTreeMap<Genre, f64>,
    pub primary: Genre,
    pub secondary: Option<Genre>,
}

/// Normalize raw keyword counts so the top genre scores 1.0.
///
/// Ties are broken by genre name because iteration follows `Genre` order.
pub fn rank_genres(raw: &BTreeMap<Genre, usize>) -> GenreRanking {
    let max = raw.values().copied().max().unwrap_or(0);
    let scores: BTreeMap<Genre, f64> = raw
        .iter()
        .map(|(genre, count)| {
            let score = if max == 0 {
                0.0
            } else {
                *count as f64 / max as f64
            };
            (*genre, score)
        })
        .collect();

    if max == 0 {
        return GenreRanking {
            scores,
            primary: Genre::Unknown,
            secondary: None,
        };
    }

    let best = |exclude: Option<Genre>| {
        scores
            .iter()
            .filter(|(g, _)| Some(**g) != exclude)
            .fold(None::<(Genre, f64)>, |acc, (g, s)| match acc {
                Some((_, best)) if *s <= best => acc,
                _ => Some((*g, *s)),
            })
    };

    let primary = best(None).map(|(g, _)| g).unwrap_or(Genre::Unknown);
    let secondary = best(Some(primary))
        .filter(|(_, s)| *s >= consts::SECONDARY_GENRE_MIN)
        .map(|(g, _)| g);

    GenreRanking {
        scores,
        primary,
        secondary,
    }
}

/// Lexicon-driven content analyzer
#[derive(Debug, Clone)]
pub struct ContentAnalyzer {
    scanner: StructuralScanner,
    lexicon: Arc<Lexicon>,
}

impl Default for ContentAnalyzer {
    fn default() -> Self {
        Self::new(default_lexicon())
    }
}

impl ContentAnalyzer {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self {
            scanner: StructuralScanner::new(),
            lexicon,
        }
    }

    pub fn lexicon(&self) -> &Arc<Lexicon> {
        &self.lexicon
    }

    /// Scan and profile `text`
    pub fn analyze(&self, text: &str) -> Result<ContentProfile> {
        let report = self.scanner.scan(text)?;
        self.profile(&report)
    }

    /// Profile an existing scan
    pub fn profile(&self, report: &ScanReport) -> Result<ContentProfile> {
        let stats = &report.stats;
        let prose = report.prose.as_str();
        let words = stats.word_count.max(1) as f64;

        let Readability { flesch, complexity } = readability(stats);

        let raw_genres: BTreeMap<Genre, usize> = self
            .lexicon
            .genres
            .iter()
            .map(|(genre, matcher)| (*genre, matcher.count(prose)))
            .collect();
        let ranking = rank_genres(&raw_genres);

        let formal_count = self.lexicon.formal.count(prose);
        let casual_count = self.lexicon.casual.count(prose);
        let technical_count = self.lexicon.technical.count(prose);

        let formality = if formal_count + casual_count == 0 {
            consts::NEUTRAL_FORMALITY
        } else {
            formal_count as f64 / (formal_count + casual_count) as f64
        };
        let technical_density =
            (technical_count as f64 / words * consts::TECHNICAL_DENSITY_SCALE).min(1.0);
        let academic_tone = (formality + complexity + technical_density) / 3.0;

        let tone = ToneProfile {
            formal: (formal_count as f64 / words).min(1.0),
            casual: (casual_count as f64 / words).min(1.0),
            technical: (technical_count as f64 / words).min(1.0),
            creative: 1.0 - academic_tone,
            academic: academic_tone,
        };

        let positive = self.lexicon.positive.count(prose);
        let negative = self.lexicon.negative.count(prose);
        let sentiment = if positive + negative == 0 {
            0.0
        } else {
            (positive as f64 - negative as f64) / (positive + negative) as f64
        };

        let estimated_pages = stats.word_count as f64 / consts::WORDS_PER_PAGE;
        let image_ratio = if estimated_pages > 0.0 {
            (stats.image_count as f64 / estimated_pages).min(1.0)
        } else if stats.image_count > 0 {
            1.0
        } else {
            0.0
        };

        let profile = ContentProfile {
            primary_genre: ranking.primary,
            secondary_genre: ranking.secondary,
            genre_scores: ranking.scores,
            is_academic: tone.academic > derived::ACADEMIC_TONE
                || (formality > derived::ACADEMIC_FORMALITY
                    && technical_density > derived::ACADEMIC_TECHNICAL),
            tone,
            formality,
            technical_density,
            complexity,
            flesch_score: flesch,
            sentiment,
            image_ratio,
            estimated_pages,
            has_math: stats.equation_count > 0,
            has_complex_math: stats.equation_count > derived::COMPLEX_MATH_EQUATIONS,
            has_rich_media: image_ratio > derived::RICH_MEDIA_IMAGE_RATIO,
            stats: stats.clone(),
        };

        profile.validate()?;
        Ok(profile)
    }
}
