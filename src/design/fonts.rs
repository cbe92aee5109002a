//! Font Pairing
//!
//! Genre-indexed table of body/heading pairs, scored against the content
//! profile. The table ships inside the binary and is parsed once.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, LazyLock};

use crate::constants::design::{FALLBACK_GENRE, FONT_BASE_SCORE, FONT_RECOMMENDATIONS};
use crate::types::{ContentProfile, FontMood, FontPair, Genre, Result, ScoredFontPair};

const EMBEDDED_FONTS: &str = include_str!("../../assets/fonts.json");

/// Process-wide font database
pub static FONT_DB: LazyLock<Arc<FontDatabase>> = LazyLock::new(|| {
    Arc::new(FontDatabase::from_json(EMBEDDED_FONTS).expect("embedded font table must parse"))
});

pub fn default_font_db() -> Arc<FontDatabase> {
    Arc::clone(&FONT_DB)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontMetadata {
    pub category: String,
    pub weights: Vec<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontDatabase {
    pub version: String,
    pub curated_fonts: BTreeMap<String, Vec<String>>,
    pub genre_pairings: BTreeMap<Genre, Vec<FontPair>>,
    #[serde(default)]
    pub font_metadata: BTreeMap<String, FontMetadata>,
}

impl FontDatabase {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Pairs for `genre`, or the fiction table when the genre has none
    pub fn pairs_for(&self, genre: Genre) -> &[FontPair] {
        self.genre_pairings
            .get(&genre)
            .or_else(|| {
                FALLBACK_GENRE
                    .parse::<Genre>()
                    .ok()
                    .and_then(|g| self.genre_pairings.get(&g))
            })
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn metadata(&self, font: &str) -> Option<&FontMetadata> {
        self.font_metadata.get(font)
    }

    pub fn curated(&self, category: &str) -> &[String] {
        self.curated_fonts
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Candidate pairs from the primary then secondary genre, first
    /// occurrence of each (body, heading) kept
    pub fn candidates(&self, profile: &ContentProfile) -> Vec<FontPair> {
        let mut seen = HashSet::new();
        let secondary = profile.secondary_genre.map(|g| self.pairs_for(g)).unwrap_or(&[]);
        self.pairs_for(profile.primary_genre)
            .iter()
            .chain(secondary)
            .filter(|pair| seen.insert((pair.body.clone(), pair.heading.clone())))
            .cloned()
            .collect()
    }

    /// Top recommendations, best first. Ties keep table order.
    pub fn recommend(&self, profile: &ContentProfile) -> Vec<ScoredFontPair> {
        let mut scored: Vec<ScoredFontPair> = self
            .candidates(profile)
            .into_iter()
            .map(|pair| ScoredFontPair {
                score: score_pair(&pair, profile),
                pair,
            })
            .collect();
        // stable sort keeps table order among equal scores
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(FONT_RECOMMENDATIONS);
        scored
    }
}

/// Profile fit of one pair
pub fn score_pair(pair: &FontPair, profile: &ContentProfile) -> f64 {
    let mut score = FONT_BASE_SCORE;

    score += match pair.mood {
        FontMood::Classic if profile.formality > 0.6 => 0.3,
        FontMood::Modern if profile.formality < 0.4 => 0.3,
        FontMood::Technical if profile.technical_density > 0.5 => 0.4,
        FontMood::Academic if profile.tone.academic > 0.6 => 0.4,
        FontMood::Romantic if profile.sentiment > 0.3 => 0.3,
        FontMood::Dark if profile.sentiment < -0.2 => 0.3,
        FontMood::Scholarly if profile.complexity > 0.7 => 0.2,
        FontMood::Accessible if profile.complexity < 0.4 => 0.2,
        _ => 0.0,
    };

    if pair.monospace.is_some() && profile.technical_density > 0.3 {
        score += 0.2;
    }

    if pair.mood == FontMood::Classic && profile.tone.casual > 0.5 {
        score -= 0.3;
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToneProfile;

    fn profile(primary: Genre, secondary: Option<Genre>) -> ContentProfile {
        ContentProfile {
            primary_genre: primary,
            secondary_genre: secondary,
            ..Default::default()
        }
    }

    #[test]
    fn test_every_genre_has_pairs() {
        for genre in Genre::KNOWN {
            assert!(!FONT_DB.pairs_for(genre).is_empty(), "{}", genre);
        }
        assert_eq!(FONT_DB.curated("monospace").len(), 10);
        assert!(FONT_DB.metadata("Fira Code").is_some());
    }

    #[test]
    fn test_unknown_genre_falls_back_to_fiction() {
        assert_eq!(
            FONT_DB.pairs_for(Genre::Unknown),
            FONT_DB.pairs_for(Genre::Fiction)
        );
    }

    #[test]
    fn test_candidates_deduplicated() {
        // fiction and fantasy share Crimson Text / Playfair Display
        let candidates = FONT_DB.candidates(&profile(Genre::Fiction, Some(Genre::Fantasy)));
        assert_eq!(candidates.len(), 5);
        assert_eq!(candidates[0].mood, FontMood::Classic);
    }

    #[test]
    fn test_technical_profile_prefers_monospace() {
        let p = ContentProfile {
            technical_density: 0.8,
            ..profile(Genre::Technical, None)
        };
        let recs = FONT_DB.recommend(&p);
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0].pair.mood, FontMood::Technical);
        assert!((recs[0].score - 1.6).abs() < 1e-9);
        assert!(recs.iter().all(|r| r.pair.monospace.is_some()));
    }

    #[test]
    fn test_scores_descending_with_stable_ties() {
        let recs = FONT_DB.recommend(&profile(Genre::Romance, None));
        assert!(recs.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(recs[0].pair.mood, FontMood::Romantic);
    }

    #[test]
    fn test_classic_penalized_for_casual_tone() {
        let pair = FONT_DB.pairs_for(Genre::Fiction)[0].clone();
        let casual = ContentProfile {
            formality: 0.8,
            tone: ToneProfile {
                casual: 0.6,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!((score_pair(&pair, &casual) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_dark_mystery() {
        let p = ContentProfile {
            sentiment: -0.5,
            ..profile(Genre::Mystery, None)
        };
        assert_eq!(FONT_DB.recommend(&p)[0].pair.mood, FontMood::Dark);
    }
}
