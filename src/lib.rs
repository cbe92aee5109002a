//! Typecraft - Content-Aware Book Production
//!
//! Turns a plain-text or Markdown manuscript into print-ready PDF and ePub
//! artifacts. Every run reads the manuscript, profiles it, derives a design,
//! picks a rendering pipeline and hands the result to external typesetting
//! tools.
//!
//! ## Core Features
//!
//! - **Content Analysis**: lexicon-driven genre, tone and readability profile
//! - **Academic Detection**: citation, equation and section density scoring
//! - **Design Synthesis**: font pairing, harmonic palettes and canon margins
//! - **Pipeline Selection**: vector (LaTeX) or web (paged HTML) per manuscript
//! - **Job Orchestration**: stage tracking, progress, cooperative cancellation
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use typecraft::{Config, GenerationRequest, InMemoryProjectLookup, Orchestrator, ProjectMetadata};
//!
//! let lookup = InMemoryProjectLookup::new().with_project(ProjectMetadata::new("42", "Night Train"));
//! let orchestrator = Orchestrator::new(Config::default(), Arc::new(lookup))?;
//! let result = orchestrator
//!     .generate(GenerationRequest::new("42", "night_train.md").with_formats(["pdf", "epub"]))
//!     .await?;
//! ```
//!
//! ## Modules
//!
//! - [`analyzer`]: Content profiling and academic detection
//! - [`design`]: Fonts, colors and margins
//! - [`selector`]: Pipeline decision
//! - [`render`]: Renderers and artifact validation
//! - [`orchestrator`]: Job lifecycle
//! - [`ai`]: Optional LLM profile refinement
//! - [`config`]: Layered configuration

pub mod ai;
pub mod analyzer;
pub mod cli;
pub mod config;
pub mod constants;
pub mod design;
pub mod orchestrator;
pub mod render;
pub mod selector;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader, LlmConfig, RenderConfig, SelectorConfig};

// Error Types
pub use types::error::{ErrorKind, Result, TypecraftError};

// Domain Types
pub use types::{
    AcademicScore, ColorPalette, ContentProfile, CustomDesign, DesignResult, FontPair,
    FailedJob, GenerationRequest, GenerationResult, Genre, Manuscript, OutputFormat, PageFormat, Pipeline,
    PipelineDecision, ProjectMetadata, Stage,
};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use analyzer::{AcademicDetector, Analyzer, ContentAnalyzer, ManuscriptAnalysis};
pub use design::DesignSynthesizer;
pub use orchestrator::{
    InMemoryProjectLookup, Orchestrator, ProgressSnapshot, ProjectLookup,
};
pub use render::{ArtifactValidator, Renderer, RendererSet};
pub use selector::PipelineSelector;

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{LlmProfileRefiner, LlmProvider, ProfileRefiner, with_timeout};
