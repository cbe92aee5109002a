//! Pipeline Decision Types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::{Result, TypecraftError};

/// Typesetting backend family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pipeline {
    /// Mathematical typesetting engine (LaTeX)
    Vector,
    /// Paginated HTML engine driven by CSS `@page` rules
    Web,
}

impl Pipeline {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Web => "web",
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pipeline {
    type Err = TypecraftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "vector" | "latex" => Ok(Self::Vector),
            "web" | "html" => Ok(Self::Web),
            other => Err(TypecraftError::Config(format!(
                "Unknown pipeline '{}' (expected vector or web)",
                other
            ))),
        }
    }
}

/// Competing backend scores, each in [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineScores {
    pub vector_score: f64,
    pub web_score: f64,
}

/// Selector output: backend choice, confidence and justification trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDecision {
    pub pipeline: Pipeline,
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub scores: PipelineScores,
    /// Set when the scores fell inside the neutral zone under the
    /// undecided policy; the pipeline is still the web fallback.
    #[serde(default)]
    pub undecided: bool,
}
