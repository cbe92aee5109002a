//! ePub Packager
//!
//! Builds an EPUB 3 tree (with an NCX table for older readers) from the
//! chapter split of the manuscript and zips it with an external archiver.
//! `mimetype` must be the first entry and stored uncompressed, hence two
//! archiver passes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use super::markup::{Block, Chapter, blocks_to_html, escape_html, split_chapters};
use super::process::{ScratchDir, ToolCommand, run_tool};
use super::{RenderJob, Renderer, ensure_artifact};
use crate::types::{DesignResult, OutputFormat, Result};

const MIMETYPE: &str = "application/epub+zip";

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

#[derive(Debug, Clone)]
pub struct EpubRenderer {
    zip_command: String,
}

impl EpubRenderer {
    pub fn new(zip_command: impl Into<String>) -> Self {
        Self {
            zip_command: zip_command.into(),
        }
    }
}

// =============================================================================
// Package Model
// =============================================================================

/// Local image copied into `OEBPS/Images`
#[derive(Debug, Clone, PartialEq)]
struct EmbeddedImage {
    source: PathBuf,
    href: String,
    media_type: &'static str,
}

/// In-memory ePub tree, paths relative to the archive root
#[derive(Debug, Clone)]
pub struct EpubPackage {
    pub identifier: String,
    pub files: Vec<(String, Vec<u8>)>,
    images: Vec<EmbeddedImage>,
}

impl EpubPackage {
    pub fn file(&self, path: &str) -> Option<&[u8]> {
        self.files
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, bytes)| bytes.as_slice())
    }

    async fn write_to(&self, root: &Path) -> Result<()> {
        for (relative, bytes) in &self.files {
            let path = root.join(relative);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, bytes).await?;
        }
        for image in &self.images {
            let path = root.join("OEBPS").join(&image.href);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(&image.source, &path).await?;
        }
        Ok(())
    }
}

fn image_media_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "svg" => Some("image/svg+xml"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Swap absolute local image paths for package-relative ones
fn embed_images(chapters: &mut [Chapter]) -> Vec<EmbeddedImage> {
    let mut images: Vec<EmbeddedImage> = Vec::new();
    for chapter in chapters.iter_mut() {
        for block in chapter.blocks.iter_mut() {
            let Block::Image { src, .. } = block else {
                continue;
            };
            let path = Path::new(src.as_str());
            if !path.is_absolute() {
                continue;
            }
            let Some(media_type) = image_media_type(path) else {
                continue;
            };
            let href = match images.iter().find(|i| i.source.as_path() == path) {
                Some(existing) => existing.href.clone(),
                None => {
                    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("bin");
                    let href = format!("Images/image_{}.{}", images.len() + 1, ext.to_lowercase());
                    images.push(EmbeddedImage {
                        source: path.to_path_buf(),
                        href: href.clone(),
                        media_type,
                    });
                    href
                }
            };
            *src = format!("../{}", href);
        }
    }
    images
}

/// Assemble the ePub tree for a job
pub fn build_package(job: &RenderJob, identifier: Uuid, date: DateTime<Utc>) -> EpubPackage {
    let mut chapters = split_chapters(job.blocks());
    let images = embed_images(&mut chapters);
    let identifier = format!("urn:uuid:{}", identifier);
    let lang = escape_html(&job.metadata.language);
    let title = escape_html(&job.metadata.title);

    let mut files = vec![
        ("mimetype".to_string(), MIMETYPE.as_bytes().to_vec()),
        ("META-INF/container.xml".to_string(), CONTAINER_XML.as_bytes().to_vec()),
    ];

    let titles: Vec<String> = chapters
        .iter()
        .enumerate()
        .map(|(i, c)| c.display_title(i))
        .collect();

    for (i, chapter) in chapters.iter().enumerate() {
        files.push((
            format!("OEBPS/Text/chapter_{}.xhtml", i + 1),
            chapter_xhtml(chapter, &titles[i], &lang).into_bytes(),
        ));
    }

    let mut manifest = String::from(
        "    <item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n\
         \x20   <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n\
         \x20   <item id=\"style\" href=\"Styles/style.css\" media-type=\"text/css\"/>\n",
    );
    let mut spine = String::new();
    for i in 1..=chapters.len() {
        manifest.push_str(&format!(
            "    <item id=\"chapter_{0}\" href=\"Text/chapter_{0}.xhtml\" media-type=\"application/xhtml+xml\"/>\n",
            i
        ));
        spine.push_str(&format!("    <itemref idref=\"chapter_{}\" linear=\"yes\"/>\n", i));
    }
    for (i, image) in images.iter().enumerate() {
        manifest.push_str(&format!(
            "    <item id=\"image_{}\" href=\"{}\" media-type=\"{}\"/>\n",
            i + 1,
            image.href,
            image.media_type
        ));
    }

    let creator = job
        .metadata
        .author
        .as_deref()
        .map(|a| format!("    <dc:creator>{}</dc:creator>\n", escape_html(a)))
        .unwrap_or_default();

    let opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="book-id" xml:lang="{lang}">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="book-id">{identifier}</dc:identifier>
    <dc:title>{title}</dc:title>
{creator}    <dc:language>{lang}</dc:language>
    <dc:date>{date}</dc:date>
    <meta property="dcterms:modified">{modified}</meta>
  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine toc="ncx">
{spine}  </spine>
</package>
"#,
        date = date.format("%Y-%m-%d"),
        modified = date.format("%Y-%m-%dT%H:%M:%SZ"),
    );
    files.push(("OEBPS/content.opf".to_string(), opf.into_bytes()));
    files.push((
        "OEBPS/toc.ncx".to_string(),
        toc_ncx(&identifier, &title, &titles).into_bytes(),
    ));
    files.push((
        "OEBPS/nav.xhtml".to_string(),
        nav_xhtml(&title, &titles, &lang).into_bytes(),
    ));
    files.push((
        "OEBPS/Styles/style.css".to_string(),
        epub_stylesheet(&job.design).into_bytes(),
    ));

    EpubPackage {
        identifier,
        files,
        images,
    }
}

fn chapter_xhtml(chapter: &Chapter, title: &str, lang: &str) -> String {
    let heading = chapter
        .title
        .as_deref()
        .map(|_| format!("<h1>{}</h1>\n", escape_html(title)))
        .unwrap_or_default();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="{lang}" xml:lang="{lang}">
<head>
<meta charset="utf-8"/>
<title>{title}</title>
<link rel="stylesheet" type="text/css" href="../Styles/style.css"/>
</head>
<body>
<section epub:type="chapter">
{heading}{body}</section>
</body>
</html>
"#,
        title = escape_html(title),
        body = blocks_to_html(&chapter.blocks),
    )
}

fn nav_xhtml(title: &str, chapters: &[String], lang: &str) -> String {
    let items: String = chapters
        .iter()
        .enumerate()
        .map(|(i, t)| {
            format!(
                "      <li><a href=\"Text/chapter_{}.xhtml\">{}</a></li>\n",
                i + 1,
                escape_html(t)
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="{lang}" xml:lang="{lang}">
<head>
<meta charset="utf-8"/>
<title>{title}</title>
</head>
<body>
  <nav epub:type="toc" id="toc">
    <h1>{title}</h1>
    <ol>
{items}    </ol>
  </nav>
</body>
</html>
"#
    )
}

fn toc_ncx(identifier: &str, title: &str, chapters: &[String]) -> String {
    let points: String = chapters
        .iter()
        .enumerate()
        .map(|(i, t)| {
            format!(
                "    <navPoint id=\"nav_{0}\" playOrder=\"{0}\">\n      <navLabel><text>{1}</text></navLabel>\n      <content src=\"Text/chapter_{0}.xhtml\"/>\n    </navPoint>\n",
                i + 1,
                escape_html(t)
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{identifier}"/>
    <meta name="dtb:depth" content="1"/>
  </head>
  <docTitle><text>{title}</text></docTitle>
  <navMap>
{points}  </navMap>
</ncx>
"#
    )
}

/// Reader-friendly subset of the print stylesheet: no page geometry
fn epub_stylesheet(design: &DesignResult) -> String {
    let p = &design.palette;
    format!(
        "body {{ font-family: \"{body}\", serif; color: {text}; background-color: {background}; line-height: 1.5; }}\n\
         h1, h2, h3, h4, h5, h6 {{ font-family: \"{heading}\", serif; color: {primary}; }}\n\
         a {{ color: {accent}; }}\n\
         pre, code {{ font-family: \"{mono}\", monospace; font-size: 0.9em; }}\n\
         pre {{ white-space: pre-wrap; }}\n\
         figure {{ margin: 1em 0; text-align: center; }}\n\
         figure img {{ max-width: 100%; }}\n\
         table {{ border-collapse: collapse; }}\n\
         th, td {{ border-bottom: 1px solid {secondary}; padding: 0.2em 0.5em; }}\n",
        body = design.fonts.body,
        heading = design.fonts.heading,
        mono = design.fonts.monospace.as_deref().unwrap_or("monospace"),
        text = p.text,
        background = p.background,
        primary = p.primary,
        secondary = p.secondary,
        accent = p.accent,
    )
}

// =============================================================================
// Renderer
// =============================================================================

#[async_trait]
impl Renderer for EpubRenderer {
    fn name(&self) -> &str {
        "epub"
    }

    fn format(&self) -> OutputFormat {
        OutputFormat::Epub
    }

    async fn render(&self, job: &RenderJob) -> Result<PathBuf> {
        let package = build_package(job, Uuid::new_v4(), Utc::now());
        debug!(
            identifier = %package.identifier,
            files = package.files.len(),
            images = package.images.len(),
            "ePub package assembled"
        );

        let scratch = ScratchDir::create("epub").await?;
        package.write_to(scratch.path()).await?;

        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let output = std::path::absolute(&job.output_path)?;
        // zip appends to existing archives
        match tokio::fs::remove_file(&output).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let stored = ToolCommand::new(&self.zip_command)
            .arg("-X0")
            .arg(&output)
            .arg("mimetype")
            .current_dir(scratch.path());
        run_tool(&stored, OutputFormat::Epub, job.timeout, &job.cancel).await?;

        let deflated = ToolCommand::new(&self.zip_command)
            .arg("-rX9")
            .arg(&output)
            .arg("META-INF")
            .arg("OEBPS")
            .current_dir(scratch.path());
        run_tool(&deflated, OutputFormat::Epub, job.timeout, &job.cancel).await?;

        ensure_artifact(&output, OutputFormat::Epub).await?;
        info!(path = %output.display(), "ePub package complete");
        Ok(job.output_path.clone())
    }
}
