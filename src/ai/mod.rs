//! AI Integration Layer
//!
//! Optional LLM-backed refinement of content profiles. Nothing in the
//! deterministic analysis path depends on this module; the orchestrator only
//! calls a [`ProfileRefiner`] when one is configured.

pub mod provider;
pub mod refine;
pub mod timeout;

pub use provider::{
    LlmProvider, LlmResponse, OpenAiProvider, SharedProvider, TokenUsage, create_provider,
};
pub use refine::{LlmProfileRefiner, ProfileAdjustments, ProfileRefiner, sample_text};
pub use timeout::with_timeout;

use std::sync::Arc;

use crate::config::LlmConfig;
use crate::types::Result;

/// Refiner described by `config`, or `None` when refinement is disabled
pub fn refiner_from_config(config: &LlmConfig) -> Result<Option<Arc<dyn ProfileRefiner>>> {
    if !config.enabled {
        return Ok(None);
    }
    let provider = create_provider(config)?;
    Ok(Some(Arc::new(LlmProfileRefiner::new(provider, config))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_by_default() {
        assert!(refiner_from_config(&LlmConfig::default()).unwrap().is_none());
    }

    #[test]
    fn test_enabled_with_key() {
        let config = LlmConfig {
            enabled: true,
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let refiner = refiner_from_config(&config).unwrap().unwrap();
        assert_eq!(refiner.name(), "openai");
    }
}
