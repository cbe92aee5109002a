//! Profile Refinement
//!
//! Optional second opinion on a computed [`ContentProfile`]. A refiner sees a
//! bounded text sample and the current profile and returns
//! [`ProfileAdjustments`]: numeric nudges to fields the profile already has.
//!
//! ## Guarantees
//!
//! - Adjustments never add fields; genre, flags and counts stay untouched.
//! - Every adjusted value is clamped into its range; non-finite values are
//!   dropped.
//! - A suggested pipeline is advisory only and is logged, never applied.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::provider::SharedProvider;
use super::timeout::with_timeout;
use crate::config::LlmConfig;
use crate::constants::network::BASE_DELAY_MS;
use crate::types::{ContentProfile, Pipeline, Result, TypecraftError};

#[async_trait]
pub trait ProfileRefiner: Send + Sync {
    fn name(&self) -> &str;

    async fn refine(&self, sample: &str, profile: &ContentProfile) -> Result<ProfileAdjustments>;
}

/// First `max_chars` characters of `text`
pub fn sample_text(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

// =============================================================================
// Adjustments
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneAdjustments {
    pub formal: Option<f64>,
    pub casual: Option<f64>,
    pub technical: Option<f64>,
    pub creative: Option<f64>,
    pub academic: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileAdjustments {
    pub formality: Option<f64>,
    pub complexity: Option<f64>,
    pub sentiment: Option<f64>,
    pub technical_density: Option<f64>,
    pub tone: ToneAdjustments,
    pub suggested_pipeline: Option<Pipeline>,
    pub rationale: Option<String>,
}

fn set_clamped(
    changed: &mut Vec<&'static str>,
    name: &'static str,
    target: &mut f64,
    value: Option<f64>,
    min: f64,
    max: f64,
) {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return;
    };
    let value = value.clamp(min, max);
    if value != *target {
        *target = value;
        changed.push(name);
    }
}

impl ProfileAdjustments {
    /// Apply to `profile`, returning the names of fields that changed
    pub fn apply(&self, profile: &mut ContentProfile) -> Vec<&'static str> {
        let mut changed = Vec::new();
        set_clamped(&mut changed, "formality", &mut profile.formality, self.formality, 0.0, 1.0);
        set_clamped(&mut changed, "complexity", &mut profile.complexity, self.complexity, 0.0, 1.0);
        set_clamped(&mut changed, "sentiment", &mut profile.sentiment, self.sentiment, -1.0, 1.0);
        set_clamped(
            &mut changed,
            "technical_density",
            &mut profile.technical_density,
            self.technical_density,
            0.0,
            1.0,
        );

        let tone = &mut profile.tone;
        set_clamped(&mut changed, "tone.formal", &mut tone.formal, self.tone.formal, 0.0, 1.0);
        set_clamped(&mut changed, "tone.casual", &mut tone.casual, self.tone.casual, 0.0, 1.0);
        set_clamped(&mut changed, "tone.technical", &mut tone.technical, self.tone.technical, 0.0, 1.0);
        set_clamped(&mut changed, "tone.creative", &mut tone.creative, self.tone.creative, 0.0, 1.0);
        set_clamped(&mut changed, "tone.academic", &mut tone.academic, self.tone.academic, 0.0, 1.0);

        if let Some(pipeline) = self.suggested_pipeline {
            info!(
                suggested = %pipeline,
                rationale = self.rationale.as_deref().unwrap_or(""),
                "Refiner suggested a pipeline (advisory)"
            );
        }
        changed
    }
}

// =============================================================================
// LLM Refiner
// =============================================================================

const SYSTEM_PROMPT: &str = "You review automated manuscript analysis for a book typesetting \
tool. Reply with a single JSON object. Allowed keys: formality, complexity, technical_density \
(0 to 1), sentiment (-1 to 1), tone (object with formal, casual, technical, creative, academic, \
each 0 to 1), suggested_pipeline (\"vector\" or \"web\"), rationale (short string). Omit any \
value you agree with.";

pub struct LlmProfileRefiner {
    provider: SharedProvider,
    max_retries: usize,
    timeout: Duration,
    base_delay: Duration,
}

impl LlmProfileRefiner {
    pub fn new(provider: SharedProvider, config: &LlmConfig) -> Self {
        Self {
            provider,
            max_retries: config.max_retries,
            timeout: Duration::from_secs(config.timeout_secs),
            base_delay: Duration::from_millis(BASE_DELAY_MS),
        }
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    fn prompt(sample: &str, profile: &ContentProfile) -> String {
        let current = serde_json::json!({
            "primary_genre": profile.primary_genre,
            "formality": profile.formality,
            "complexity": profile.complexity,
            "sentiment": profile.sentiment,
            "technical_density": profile.technical_density,
            "tone": profile.tone,
        });
        format!(
            "Current analysis:\n{}\n\nManuscript sample:\n<<<\n{}\n>>>",
            current, sample
        )
    }

    async fn attempt(&self, prompt: &str) -> Result<ProfileAdjustments> {
        let response = with_timeout(
            self.timeout,
            self.provider.complete_json(SYSTEM_PROMPT, prompt),
            "profile refinement",
        )
        .await?;
        debug!(
            provider = self.provider.name(),
            model = %response.model,
            tokens = response.usage.total(),
            "Refinement reply"
        );
        serde_json::from_value(response.content)
            .map_err(|e| TypecraftError::Llm(format!("Unusable refinement reply: {}", e)))
    }
}

#[async_trait]
impl ProfileRefiner for LlmProfileRefiner {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn refine(&self, sample: &str, profile: &ContentProfile) -> Result<ProfileAdjustments> {
        let prompt = Self::prompt(sample, profile);
        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_times(self.max_retries);

        (|| self.attempt(&prompt))
            .retry(backoff)
            .when(|e: &TypecraftError| e.is_transient())
            .notify(|e: &TypecraftError, delay: Duration| {
                warn!(error = %e, ?delay, "Refinement failed, retrying");
            })
            .await
    }
}
