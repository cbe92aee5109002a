//! LLM Provider Abstraction
//!
//! Defines the [`LlmProvider`] trait used by profile refinement. Providers
//! return a parsed JSON object plus token usage for logging.
//!
//! Only OpenAI-compatible chat completion endpoints are supported; a custom
//! `endpoint` lets the same client talk to self-hosted gateways.

mod openai;

pub use openai::OpenAiProvider;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::types::{Result, TypecraftError};

// =============================================================================
// Response
// =============================================================================

#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Parsed JSON object
    pub content: Value,
    pub usage: TokenUsage,
    pub model: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

// =============================================================================
// Provider Trait
// =============================================================================

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one system + user exchange and parse the reply as a JSON object
    async fn complete_json(&self, system: &str, prompt: &str) -> Result<LlmResponse>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;
}

pub type SharedProvider = Arc<dyn LlmProvider>;

/// Create a shared provider from configuration
pub fn create_provider(config: &LlmConfig) -> Result<SharedProvider> {
    match config.provider.as_str() {
        "openai" | "openai-compatible" => Ok(Arc::new(OpenAiProvider::new(config)?)),
        other => Err(TypecraftError::Config(format!(
            "Unknown LLM provider: {}. Supported: openai, openai-compatible",
            other
        ))),
    }
}

/// Pull the JSON object out of a chat reply, tolerating code fences and
/// surrounding prose
pub fn extract_json(reply: &str) -> Result<Value> {
    let trimmed = reply.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }
    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    match (start, end) {
        (Some(s), Some(e)) if s < e => Ok(serde_json::from_str(&trimmed[s..=e])?),
        _ => Err(TypecraftError::Llm(format!(
            "Reply contains no JSON object: {}",
            trimmed.chars().take(120).collect::<String>()
        ))),
    }
}
