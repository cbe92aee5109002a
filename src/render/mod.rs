//! Renderer Adapters
//!
//! Turns manuscript text plus a [`DesignResult`] into a finished artifact by
//! driving an external tool:
//!
//! - `latex`: vector typesetting through a LaTeX engine (PDF)
//! - `paged`: paginated HTML through a CSS paged-media renderer (PDF)
//! - `epub`: an EPUB 3 package zipped by an external archiver
//!
//! ## Dispatch
//!
//! [`RendererSet::for_target`] maps a format and a pipeline to an adapter:
//! PDF follows the selected pipeline, ePub ignores it.
//!
//! ## Cleanup
//!
//! Adapters build in a [`ScratchDir`] that is removed when the render ends,
//! whether it succeeded, failed or was cancelled.

pub mod archive;
pub mod epub;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod latex;
pub mod markup;
pub mod paged;
pub mod process;
pub mod typography;
pub mod validate;

pub use epub::EpubRenderer;
pub use latex::LatexRenderer;
pub use paged::PagedRenderer;
pub use process::{ScratchDir, ToolCommand, run_tool};
pub use validate::{ArtifactValidator, count_pdf_pages};

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;

use crate::config::RenderConfig;
use crate::orchestrator::CancelToken;
use crate::types::{
    DesignResult, OutputFormat, Pipeline, ProjectMetadata, RenderFailureKind, Result,
    TypecraftError,
};

use markup::Block;

// =============================================================================
// Render Job
// =============================================================================

/// Everything an adapter needs for one artifact
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub content: Arc<str>,
    pub metadata: ProjectMetadata,
    pub design: DesignResult,
    pub output_path: PathBuf,
    /// Directory relative image paths resolve against
    pub asset_dir: Option<PathBuf>,
    pub cancel: CancelToken,
    pub timeout: Duration,
    /// Curly quotes, ellipses and em dashes in prose
    pub typography: bool,
}

impl RenderJob {
    /// Local file behind an image reference, if it exists
    pub fn resolve_asset(&self, src: &str) -> Option<PathBuf> {
        if src.contains("://") || src.starts_with("data:") {
            return None;
        }
        let path = Path::new(src);
        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.asset_dir.as_ref()?.join(path)
        };
        resolved.is_file().then_some(resolved)
    }

    /// Parsed blocks with local images rewritten to absolute paths and,
    /// when enabled, typographic refinement applied
    pub fn blocks(&self) -> Vec<Block> {
        let blocks: Vec<Block> = markup::parse_blocks(&self.content)
            .into_iter()
            .map(|block| match block {
                Block::Image { alt, src } => {
                    let src = self
                        .resolve_asset(&src)
                        .map(|p| p.display().to_string())
                        .unwrap_or(src);
                    Block::Image { alt, src }
                }
                other => other,
            })
            .collect();
        if self.typography {
            typography::refine_blocks(blocks)
        } else {
            blocks
        }
    }
}

// =============================================================================
// Renderer Trait
// =============================================================================

/// One external rendering backend
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Adapter name for logging
    fn name(&self) -> &str;

    /// Format this adapter produces
    fn format(&self) -> OutputFormat;

    /// Render to `job.output_path` and return it.
    ///
    /// Implementations must leave no file at the output path on failure
    /// other than whatever the external tool wrote.
    async fn render(&self, job: &RenderJob) -> Result<PathBuf>;
}

pub type SharedRenderer = Arc<dyn Renderer>;

/// The three adapters the orchestrator dispatches to
#[derive(Clone)]
pub struct RendererSet {
    pub vector: SharedRenderer,
    pub web: SharedRenderer,
    pub epub: SharedRenderer,
}

impl RendererSet {
    pub fn new(vector: SharedRenderer, web: SharedRenderer, epub: SharedRenderer) -> Self {
        Self { vector, web, epub }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            vector: Arc::new(LatexRenderer::new(&config.latex_engine, config.latex_runs)),
            web: Arc::new(PagedRenderer::new(&config.paged_command)),
            epub: Arc::new(EpubRenderer::new(&config.zip_command)),
        }
    }

    pub fn for_target(&self, format: OutputFormat, pipeline: Pipeline) -> &SharedRenderer {
        match (format, pipeline) {
            (OutputFormat::Epub, _) => &self.epub,
            (OutputFormat::Pdf, Pipeline::Vector) => &self.vector,
            (OutputFormat::Pdf, Pipeline::Web) => &self.web,
        }
    }
}

impl std::fmt::Debug for RendererSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererSet")
            .field("vector", &self.vector.name())
            .field("web", &self.web.name())
            .field("epub", &self.epub.name())
            .finish()
    }
}

/// Confirm the tool left a non-empty file with the right leading bytes
pub async fn ensure_artifact(path: &Path, format: OutputFormat) -> Result<()> {
    let missing = |detail: String| {
        TypecraftError::render(RenderFailureKind::MissingOutput, format, detail)
    };

    let mut file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) => return Err(missing(format!("{}: {}", path.display(), e))),
    };
    let magic = format.magic();
    let mut head = vec![0u8; magic.len()];
    let mut read = 0;
    while read < head.len() {
        let n = file.read(&mut head[read..]).await?;
        if n == 0 {
            break;
        }
        read += n;
    }

    if read == 0 {
        return Err(missing(format!("{} is empty", path.display())));
    }
    if head[..read] != *magic {
        return Err(TypecraftError::render(
            RenderFailureKind::InvalidHeader,
            format,
            format!("{} does not start with {:?}", path.display(), String::from_utf8_lossy(magic)),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::DesignSynthesizer;
    use crate::types::ContentProfile;
    use tempfile::TempDir;

    struct Named(&'static str, OutputFormat);

    #[async_trait]
    impl Renderer for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn format(&self) -> OutputFormat {
            self.1
        }

        async fn render(&self, job: &RenderJob) -> Result<PathBuf> {
            Ok(job.output_path.clone())
        }
    }

    pub(crate) fn sample_job(content: &str, output_path: PathBuf) -> RenderJob {
        RenderJob {
            content: Arc::from(content),
            metadata: ProjectMetadata::new("42", "A Test Book").with_author("Ada"),
            design: DesignSynthesizer::default()
                .synthesize(&ContentProfile::default(), None)
                .unwrap(),
            output_path,
            asset_dir: None,
            cancel: CancelToken::new(),
            timeout: Duration::from_secs(5),
            typography: true,
        }
    }

    #[test]
    fn test_dispatch() {
        let set = RendererSet::new(
            Arc::new(Named("vector", OutputFormat::Pdf)),
            Arc::new(Named("web", OutputFormat::Pdf)),
            Arc::new(Named("epub", OutputFormat::Epub)),
        );
        assert_eq!(set.for_target(OutputFormat::Pdf, Pipeline::Vector).name(), "vector");
        assert_eq!(set.for_target(OutputFormat::Pdf, Pipeline::Web).name(), "web");
        assert_eq!(set.for_target(OutputFormat::Epub, Pipeline::Vector).name(), "epub");
        assert_eq!(set.for_target(OutputFormat::Epub, Pipeline::Web).name(), "epub");
    }

    #[test]
    fn test_from_config_names() {
        let set = RendererSet::from_config(&RenderConfig::default());
        assert_eq!(set.vector.name(), "latex");
        assert_eq!(set.web.name(), "paged");
        assert_eq!(set.epub.name(), "epub");
    }

    #[tokio::test]
    async fn test_ensure_artifact() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.pdf");
        tokio::fs::write(&good, b"%PDF-1.7\n").await.unwrap();
        ensure_artifact(&good, OutputFormat::Pdf).await.unwrap();

        let bad = dir.path().join("bad.pdf");
        tokio::fs::write(&bad, b"<html>").await.unwrap();
        let err = ensure_artifact(&bad, OutputFormat::Pdf).await.unwrap_err();
        assert!(matches!(
            err,
            TypecraftError::RenderFailed {
                kind: RenderFailureKind::InvalidHeader,
                ..
            }
        ));

        let empty = dir.path().join("empty.epub");
        tokio::fs::write(&empty, b"").await.unwrap();
        let err = ensure_artifact(&empty, OutputFormat::Epub).await.unwrap_err();
        assert!(matches!(
            err,
            TypecraftError::RenderFailed {
                kind: RenderFailureKind::MissingOutput,
                ..
            }
        ));

        let err = ensure_artifact(&dir.path().join("none.pdf"), OutputFormat::Pdf)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TypecraftError::RenderFailed {
                kind: RenderFailureKind::MissingOutput,
                ..
            }
        ));
    }

    #[test]
    fn test_local_images_resolved() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("cat.png"), b"png").unwrap();
        let mut job = sample_job(
            "![cat](cat.png)\n\n![dog](dog.png)\n\n![web](https://x.y/z.png)",
            dir.path().join("out.pdf"),
        );
        job.asset_dir = Some(dir.path().to_path_buf());
        let blocks = job.blocks();
        let expected = dir.path().join("cat.png").display().to_string();
        assert_eq!(
            blocks[0],
            Block::Image {
                alt: "cat".to_string(),
                src: expected
            }
        );
        assert_eq!(
            blocks[1],
            Block::Image {
                alt: "dog".to_string(),
                src: "dog.png".to_string()
            }
        );
        assert!(job.resolve_asset("https://x.y/z.png").is_none());
    }

    #[test]
    fn test_blocks_apply_typography_when_enabled() {
        let content = "\"Wait...\" she said -- twice.\n\n```\nx = \"raw\" -- y\n```\n";
        let mut job = sample_job(content, PathBuf::from("out.pdf"));
        let blocks = job.blocks();
        assert_eq!(
            blocks[0],
            Block::Paragraph("\u{201C}Wait\u{2026}\u{201D} she said \u{2014} twice.".to_string())
        );
        assert!(matches!(&blocks[1], Block::Code { body, .. } if body == "x = \"raw\" -- y"));

        job.typography = false;
        assert_eq!(
            job.blocks()[0],
            Block::Paragraph("\"Wait...\" she said -- twice.".to_string())
        );
    }
}
