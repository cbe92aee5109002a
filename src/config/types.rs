//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Every section deserializes with `#[serde(default)]`, so partial files and
//! single environment overrides are valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{analysis, network, render, selector};
use crate::types::{PageFormat, Result, TypecraftError};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Content analysis settings
    pub analysis: AnalysisConfig,

    /// Pipeline selector thresholds
    pub selector: SelectorConfig,

    /// External renderer settings
    pub render: RenderConfig,

    /// Optional profile refinement through an LLM
    pub llm: LlmConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            analysis: AnalysisConfig::default(),
            selector: SelectorConfig::default(),
            render: RenderConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `TypecraftError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.analysis.sample_size == 0 {
            return Err(TypecraftError::Config(
                "analysis.sample_size must be greater than 0".to_string(),
            ));
        }

        self.selector.validate()?;

        if self.render.timeout_ms == 0 {
            return Err(TypecraftError::Config(
                "render.timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.render.latex_runs == 0 {
            return Err(TypecraftError::Config(
                "render.latex_runs must be at least 1".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(TypecraftError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(TypecraftError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Analysis Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Upper bound on characters passed to external refinement
    pub sample_size: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_size: analysis::DEFAULT_SAMPLE_SIZE,
        }
    }
}

// =============================================================================
// Selector Configuration
// =============================================================================

/// Outcome when the backend scores fall inside the neutral zone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeutralFallback {
    /// Pick the web backend
    #[default]
    Web,
    /// Pick the web backend but flag the decision as undecided
    Undecided,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Equation count at which the equation signal saturates
    pub equations_min: usize,
    /// Academic confidence at which the academic signal counts even when
    /// the detector did not classify the text as academic
    pub academic_conf_min: f64,
    /// Table count at which the table signal saturates
    pub complex_tables_min: usize,
    /// Images per page at which the image-ratio signal saturates
    pub image_ratio_min: f64,
    /// Score difference below which neither backend wins
    pub neutral_zone: f64,
    pub fallback: NeutralFallback,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            equations_min: selector::DEFAULT_EQUATIONS_MIN,
            academic_conf_min: selector::DEFAULT_ACADEMIC_CONF_MIN,
            complex_tables_min: selector::DEFAULT_COMPLEX_TABLES_MIN,
            image_ratio_min: selector::DEFAULT_IMAGE_RATIO_MIN,
            neutral_zone: selector::DEFAULT_NEUTRAL_ZONE,
            fallback: NeutralFallback::default(),
        }
    }
}

impl SelectorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.equations_min == 0 || self.complex_tables_min == 0 {
            return Err(TypecraftError::Config(
                "selector.equations_min and selector.complex_tables_min must be at least 1"
                    .to_string(),
            ));
        }
        if !self.academic_conf_min.is_finite() || !(0.0..=1.0).contains(&self.academic_conf_min)
        {
            return Err(TypecraftError::Config(format!(
                "selector.academic_conf_min must be in [0, 1], got {}",
                self.academic_conf_min
            )));
        }
        if !self.image_ratio_min.is_finite() || self.image_ratio_min <= 0.0 {
            return Err(TypecraftError::Config(format!(
                "selector.image_ratio_min must be positive, got {}",
                self.image_ratio_min
            )));
        }
        if !self.neutral_zone.is_finite() || !(0.0..=1.0).contains(&self.neutral_zone) {
            return Err(TypecraftError::Config(format!(
                "selector.neutral_zone must be in [0, 1], got {}",
                self.neutral_zone
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Render Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Wall-clock budget per external renderer invocation
    pub timeout_ms: u64,
    /// Directory receiving `project_<id>.<ext>` artifacts
    pub output_dir: PathBuf,
    pub page_format: PageFormat,
    /// LaTeX engine binary (lualatex, xelatex, pdflatex)
    pub latex_engine: String,
    pub latex_runs: u32,
    /// Paged-media renderer invoked as `<cmd> <html> -o <pdf>`
    pub paged_command: String,
    /// ZIP tool used to package ePub archives
    pub zip_command: String,
    /// Optional PDF info extractor for page counts
    pub pdfinfo_command: Option<String>,
    /// Curly quotes, ellipses and em dashes in rendered prose
    pub typography: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            timeout_ms: render::DEFAULT_TIMEOUT_MS,
            output_dir: PathBuf::from("output"),
            page_format: PageFormat::default(),
            latex_engine: "lualatex".to_string(),
            latex_runs: render::DEFAULT_LATEX_RUNS,
            paged_command: "pagedjs-cli".to_string(),
            zip_command: "zip".to_string(),
            pdfinfo_command: Some("pdfinfo".to_string()),
            typography: true,
        }
    }
}

impl RenderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Refinement is opt-in
    pub enabled: bool,

    /// Provider name
    pub provider: String,

    /// Model name
    pub model: String,

    /// API base URL for OpenAI-compatible endpoints
    pub endpoint: Option<String>,

    /// API key; prefer the environment over config files
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Temperature for LLM generation (0.0 = deterministic)
    pub temperature: f32,

    /// Retries for transient failures
    pub max_retries: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            endpoint: None,
            api_key: None,
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.2,
            max_retries: network::MAX_NETWORK_RETRIES,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.analysis.sample_size, 5000);
        assert_eq!(config.render.timeout_ms, 120_000);
        assert_eq!(config.selector.equations_min, 10);
        assert_eq!(config.selector.fallback, NeutralFallback::Web);
        assert!(!config.llm.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_neutral_zone() {
        let mut config = Config::default();
        config.selector.neutral_zone = 1.5;
        assert!(config.validate().is_err());
        config.selector.neutral_zone = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.render.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_not_serialized() {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-secret".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str("[selector]\nneutral_zone = 0.1\n").unwrap();
        assert_eq!(config.selector.neutral_zone, 0.1);
        assert_eq!(config.selector.equations_min, 10);
        assert_eq!(config.render.latex_engine, "lualatex");
    }
}
