//! CLI Common Utilities
//!
//! Shared loading and printing helpers for command handlers.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::analyzer::Analyzer;
use crate::config::{Config, ConfigLoader};
use crate::design::DesignSynthesizer;
use crate::selector::PipelineSelector;
use crate::types::{Manuscript, PageFormat, ProjectMetadata, Result, TypecraftError};

/// Command execution context
///
/// Holds the merged configuration and builds the pure components the
/// inspection commands run directly.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: Config,
}

impl CommandContext {
    pub fn load() -> Result<Self> {
        Ok(Self {
            config: ConfigLoader::load()?,
        })
    }

    pub fn analyzer(&self) -> Analyzer {
        Analyzer::default()
    }

    pub fn synthesizer(&self, page_format: Option<PageFormat>) -> DesignSynthesizer {
        DesignSynthesizer::default()
            .with_page_format(page_format.unwrap_or(self.config.render.page_format))
    }

    pub fn selector(&self) -> PipelineSelector {
        PipelineSelector::new(self.config.selector.clone())
    }
}

/// Read a manuscript file as UTF-8 text
pub fn read_manuscript(path: &Path) -> Result<Manuscript> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8(bytes).map_err(|e| {
        TypecraftError::AnalysisFailed(format!("{} is not valid UTF-8: {}", path.display(), e))
    })?;
    Ok(Manuscript::new(text).with_source(path))
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// =============================================================================
// Project Metadata
// =============================================================================

/// Metadata file accepted by `--meta`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MetadataFile {
    id: Option<String>,
    title: Option<String>,
    author: Option<String>,
    language: Option<String>,
}

/// Project metadata sources; flags win over the YAML file, and the manuscript
/// file stem fills anything still missing
#[derive(Debug, Clone, Default)]
pub struct MetadataArgs {
    pub project: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub meta: Option<PathBuf>,
}

impl MetadataArgs {
    pub fn resolve(self, content_path: &Path) -> Result<ProjectMetadata> {
        let file: MetadataFile = match &self.meta {
            Some(path) => serde_yaml::from_str(&std::fs::read_to_string(path)?)?,
            None => MetadataFile::default(),
        };
        let stem = content_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("book")
            .to_string();

        let id = self
            .project
            .or(file.id)
            .unwrap_or_else(|| stem.clone());
        if id.trim().is_empty() {
            return Err(TypecraftError::Config("Project id must not be empty".to_string()));
        }
        let title = self.title.or(file.title).unwrap_or(stem);

        let mut metadata =
            ProjectMetadata::new(id, title).with_language(file.language.unwrap_or_default());
        metadata.author = self.author.or(file.author);
        Ok(metadata)
    }
}
