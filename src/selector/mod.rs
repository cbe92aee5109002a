//! Pipeline Selector
//!
//! Converts a content profile and academic score into a binary backend
//! decision with a confidence and a human-readable reason trace.
//!
//! ## Scoring
//!
//! Two competing scores in [0, 1], each the sum of five weighted signals:
//!
//! | Vector backend              | Web backend                     |
//! |-----------------------------|---------------------------------|
//! | equations (0.30)            | image ratio (0.30)              |
//! | academic confidence (0.25)  | image count 5..20 (0.20)        |
//! | complex tables (0.15)       | non-academic (0.20)             |
//! | complexity above 0.5 (0.15) | complexity below 0.6 (0.15)     |
//! | equation density (0.15)     | casual tone (0.15)              |
//!
//! The winner must lead by more than the neutral zone; otherwise the web
//! backend is chosen with confidence 0.5.

use tracing::debug;

use crate::config::{NeutralFallback, SelectorConfig};
use crate::constants::selector::{self as consts, vector_weight, web_weight};
use crate::types::{
    AcademicScore, ContentProfile, Pipeline, PipelineDecision, PipelineScores, Result,
    TypecraftError,
};

/// Score contributions and the reasons of signals that passed their threshold
#[derive(Debug, Default)]
struct Tally {
    scores: Vec<f64>,
    reasons: Vec<String>,
}

impl Tally {
    /// `score` always counts; the reason is kept only when `fired`
    fn add(&mut self, score: f64, fired: bool, reason: impl FnOnce() -> String) {
        if score > 0.0 {
            self.scores.push(score);
        }
        if fired {
            self.reasons.push(reason());
        }
    }

    fn total(&self) -> f64 {
        self.scores.iter().fold(0.0, |acc, s| acc + s).clamp(0.0, 1.0)
    }

    fn reasons(self, fallback: &str) -> Vec<String> {
        if self.reasons.is_empty() {
            vec![fallback.to_string()]
        } else {
            self.reasons
        }
    }
}

/// Linear ramp from 0 at `floor` to 1 at `ceiling`
fn ramp(value: f64, floor: f64, ceiling: f64) -> f64 {
    ((value - floor) / (ceiling - floor)).clamp(0.0, 1.0)
}

/// Saturating proportion of `value / min`
fn saturate(value: f64, min: f64) -> f64 {
    if min <= 0.0 {
        return 1.0;
    }
    (value / min).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Default)]
pub struct PipelineSelector {
    config: SelectorConfig,
}

impl PipelineSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Decide between the vector and web backends.
    ///
    /// Returns `SelectorFailed` when neither backend scores at all.
    pub fn select(
        &self,
        profile: &ContentProfile,
        academic: &AcademicScore,
    ) -> Result<PipelineDecision> {
        let vector = self.vector_tally(profile, academic);
        let web = self.web_tally(profile, academic);
        let scores = PipelineScores {
            vector_score: vector.total(),
            web_score: web.total(),
        };
        let PipelineScores {
            vector_score,
            web_score,
        } = scores;

        if vector_score == 0.0 && web_score == 0.0 {
            return Err(TypecraftError::SelectorFailed {
                vector_score,
                web_score,
            });
        }

        let delta = vector_score - web_score;
        let sum = vector_score + web_score;
        let decision = if delta > self.config.neutral_zone {
            PipelineDecision {
                pipeline: Pipeline::Vector,
                confidence: vector_score / sum,
                reasons: vector.reasons(consts::VECTOR_FALLBACK_REASON),
                scores,
                undecided: false,
            }
        } else if delta < -self.config.neutral_zone {
            PipelineDecision {
                pipeline: Pipeline::Web,
                confidence: web_score / sum,
                reasons: web.reasons(consts::WEB_FALLBACK_REASON),
                scores,
                undecided: false,
            }
        } else {
            PipelineDecision {
                pipeline: Pipeline::Web,
                confidence: 0.5,
                reasons: vec![consts::BALANCED_REASON.to_string()],
                scores,
                undecided: self.config.fallback == NeutralFallback::Undecided,
            }
        };

        debug!(
            pipeline = %decision.pipeline,
            vector = vector_score,
            web = web_score,
            confidence = decision.confidence,
            "Pipeline selected"
        );
        Ok(decision)
    }

    fn vector_tally(&self, profile: &ContentProfile, academic: &AcademicScore) -> Tally {
        let stats = &profile.stats;
        let mut tally = Tally::default();

        let equations = stats.equation_count;
        tally.add(
            vector_weight::EQUATIONS * saturate(equations as f64, self.config.equations_min as f64),
            equations >= self.config.equations_min,
            || format!("High equation count ({})", equations),
        );

        if academic.is_academic || academic.confidence >= self.config.academic_conf_min {
            let confidence = academic.confidence.clamp(0.0, 1.0);
            tally.add(vector_weight::ACADEMIC * confidence, true, || {
                format!("Academic content ({:.0}% confidence)", confidence * 100.0)
            });
        }

        let tables = stats.table_count;
        tally.add(
            vector_weight::TABLES * saturate(tables as f64, self.config.complex_tables_min as f64),
            tables >= self.config.complex_tables_min,
            || format!("Complex tables ({})", tables),
        );

        let complexity = profile.complexity;
        tally.add(
            vector_weight::COMPLEXITY
                * ramp(complexity, consts::COMPLEXITY_FLOOR, consts::COMPLEXITY_HIGH),
            complexity > consts::COMPLEXITY_HIGH,
            || format!("High text complexity ({:.2})", complexity),
        );

        let pages = profile.estimated_pages.max(1.0);
        let density = equations as f64 / pages;
        tally.add(
            vector_weight::EQUATION_DENSITY * saturate(density, consts::EQUATION_DENSITY_MIN),
            density > consts::EQUATION_DENSITY_MIN,
            || {
                format!(
                    "High equation density ({:.2} per page over {:.1} pages)",
                    density, pages
                )
            },
        );

        tally
    }

    fn web_tally(&self, profile: &ContentProfile, academic: &AcademicScore) -> Tally {
        let mut tally = Tally::default();

        let ratio = profile.image_ratio;
        tally.add(
            web_weight::IMAGE_RATIO * saturate(ratio, self.config.image_ratio_min),
            ratio >= self.config.image_ratio_min,
            || format!("High image ratio ({:.2} per page)", ratio),
        );

        let images = profile.stats.image_count;
        tally.add(
            web_weight::IMAGE_COUNT
                * ramp(
                    images as f64,
                    consts::IMAGE_COUNT_FLOOR as f64,
                    consts::IMAGE_COUNT_CEILING as f64,
                ),
            images > consts::IMAGE_COUNT_CEILING,
            || format!("Many images ({})", images),
        );

        if !academic.is_academic {
            tally.add(web_weight::NON_ACADEMIC, true, || "Non-academic content".to_string());
        }

        let complexity = profile.complexity;
        tally.add(
            web_weight::ACCESSIBLE
                * ramp(
                    consts::ACCESSIBLE_CEILING - complexity,
                    0.0,
                    consts::ACCESSIBLE_CEILING - consts::ACCESSIBLE_COMPLEXITY,
                ),
            complexity < consts::ACCESSIBLE_COMPLEXITY,
            || format!("Accessible reading level ({:.2})", complexity),
        );

        let casual = profile.tone.casual;
        if casual > consts::CASUAL_MIN {
            tally.add(web_weight::CASUAL * casual, true, || {
                format!("Casual tone ({:.2})", casual)
            });
        }

        tally
    }
}
