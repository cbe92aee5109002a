//! Artifact validation.
//!
//! Every artifact must be non-empty and start with its format's magic bytes.
//! PDFs are opened with `lopdf` for a page count, or handed to `pdfinfo`
//! when one is configured. ePubs get a structural check of the archive:
//! mimetype entry, container, package document, manifest, spine and the
//! navigation documents. Structural errors fail validation; softer problems
//! are only logged.

use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

use super::archive::{METHOD_STORED, ZipArchive};
use super::process::{ToolCommand, run_tool};
use crate::orchestrator::CancelToken;
use crate::types::{OutputFile, OutputFormat, Result, TypecraftError};

static RE_PDFINFO_PAGES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Pages:\s+(\d+)").expect("pdfinfo pages pattern"));
static RE_FULL_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"full-path\s*=\s*"([^"]+)""#).expect("full-path pattern"));
static RE_PACKAGE_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<package\b[^>]*\bversion\s*=\s*"([^"]+)""#).expect("package version pattern")
});
static RE_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<item\b[^>]*>").expect("manifest item pattern"));
static RE_ITEMREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<itemref\b[^>]*\bidref\s*=\s*"([^"]+)""#).expect("spine itemref pattern")
});
static RE_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z][\w:-]*)\s*=\s*"([^"]*)""#).expect("attribute pattern")
});

const EPUB_MIMETYPE: &str = "application/epub+zip";
const CONTAINER_PATH: &str = "META-INF/container.xml";
const DEFAULT_OPF_PATH: &str = "OEBPS/content.opf";
const NCX_MEDIA_TYPE: &str = "application/x-dtbncx+xml";

#[derive(Debug, Clone)]
pub struct ArtifactValidator {
    pdfinfo: Option<String>,
    timeout: Duration,
}

impl ArtifactValidator {
    pub fn new(pdfinfo: Option<String>, timeout: Duration) -> Self {
        Self { pdfinfo, timeout }
    }

    /// Check a finished artifact.
    ///
    /// A missing or failing page-count tool is not an error; the count then
    /// comes from parsing the PDF itself.
    pub async fn validate(
        &self,
        path: &Path,
        format: OutputFormat,
        cancel: &CancelToken,
    ) -> Result<OutputFile> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            TypecraftError::validation(format, format!("cannot read {}: {}", path.display(), e))
        })?;
        if bytes.is_empty() {
            return Err(TypecraftError::validation(
                format,
                format!("{} is empty", path.display()),
            ));
        }
        if !bytes.starts_with(format.magic()) {
            return Err(TypecraftError::validation(
                format,
                format!("{} has the wrong magic bytes", path.display()),
            ));
        }

        let page_count = match format {
            OutputFormat::Pdf => self.pdf_pages(path, &bytes, cancel).await?,
            OutputFormat::Epub => {
                let report = check_epub(&bytes);
                for issue in report.warnings() {
                    warn!(path = %path.display(), code = issue.code, "ePub: {}", issue.message);
                }
                report.into_result()?;
                None
            }
        };

        Ok(OutputFile {
            path: path.to_path_buf(),
            size: bytes.len() as u64,
            page_count,
        })
    }

    async fn pdf_pages(
        &self,
        path: &Path,
        bytes: &[u8],
        cancel: &CancelToken,
    ) -> Result<Option<u32>> {
        if let Some(program) = &self.pdfinfo {
            let command = ToolCommand::new(program).arg(path);
            match run_tool(&command, OutputFormat::Pdf, self.timeout, cancel).await {
                Ok(output) => {
                    let stdout = String::from_utf8_lossy(&output.stdout);
                    if let Some(pages) = RE_PDFINFO_PAGES
                        .captures(&stdout)
                        .and_then(|c| c[1].parse::<u32>().ok())
                    {
                        return Ok(Some(pages));
                    }
                }
                Err(e @ TypecraftError::Cancelled { .. }) => return Err(e),
                Err(e) => debug!(error = %e, "Page count tool unavailable, parsing the PDF"),
            }
        }
        Ok(count_pdf_pages(bytes))
    }
}

/// Pages reachable from the document catalog, `None` when the PDF does not parse
pub fn count_pdf_pages(bytes: &[u8]) -> Option<u32> {
    match lopdf::Document::load_mem(bytes) {
        Ok(document) => {
            let pages = document.get_pages().len();
            (pages > 0).then_some(pages as u32)
        }
        Err(e) => {
            debug!(error = %e, "PDF could not be parsed for a page count");
            None
        }
    }
}

// =============================================================================
// ePub Structure
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EpubReport {
    pub issues: Vec<Issue>,
}

impl EpubReport {
    fn error(&mut self, code: &'static str, message: impl Into<String>) {
        self.issues.push(Issue {
            severity: Severity::Error,
            code,
            message: message.into(),
        });
    }

    fn warning(&mut self, code: &'static str, message: impl Into<String>) {
        self.issues.push(Issue {
            severity: Severity::Warning,
            code,
            message: message.into(),
        });
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    /// `ValidationFailed` listing every error
    pub fn into_result(self) -> Result<()> {
        if self.is_valid() {
            return Ok(());
        }
        let detail = self
            .errors()
            .map(Issue::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(TypecraftError::validation(OutputFormat::Epub, detail))
    }
}

/// Manifest entry with its href resolved against the package document
#[derive(Debug, Clone)]
struct ManifestItem {
    path: String,
    media_type: String,
    properties: String,
}

/// Structural check of an ePub archive
pub fn check_epub(bytes: &[u8]) -> EpubReport {
    let mut report = EpubReport::default();
    let archive = match ZipArchive::parse(bytes) {
        Ok(archive) => archive,
        Err(e) => {
            report.error("ZIP", format!("not a readable ZIP archive: {}", e));
            return report;
        }
    };

    check_mimetype(&archive, &mut report);
    if !archive.entries().iter().any(|e| e.name.starts_with("META-INF/")) {
        report.error("STRUCTURE", "META-INF directory is missing");
    }

    let Some(container) = read_text(&archive, CONTAINER_PATH, &mut report) else {
        report.error("CONTAINER", format!("{} is missing", CONTAINER_PATH));
        return report;
    };
    for marker in ["<container", "<rootfiles>", "<rootfile", "full-path="] {
        if !container.contains(marker) {
            report.error("CONTAINER", format!("container.xml lacks {}", marker));
        }
    }
    if !container.contains("application/oebps-package+xml") {
        report.error("CONTAINER", "rootfile has the wrong media type");
    }
    let opf_path = RE_FULL_PATH
        .captures(&container)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| DEFAULT_OPF_PATH.to_string());

    let Some(opf) = read_text(&archive, &opf_path, &mut report) else {
        report.error("OPF", format!("package document {} is missing", opf_path));
        return report;
    };
    check_package(&archive, &opf_path, &opf, &mut report);
    report
}

fn check_mimetype(archive: &ZipArchive<'_>, report: &mut EpubReport) {
    if archive.first_entry().map(|e| e.name.as_str()) != Some("mimetype") {
        report.error("MIMETYPE", "mimetype is not the first entry");
    }
    let Some(entry) = archive.entry("mimetype") else {
        report.error("MIMETYPE", "mimetype entry is missing");
        return;
    };
    if entry.method != METHOD_STORED {
        report.error("MIMETYPE", "mimetype entry is compressed");
    }
    match archive.read_entry(entry) {
        Ok(contents) if contents == EPUB_MIMETYPE.as_bytes() => {}
        Ok(contents) => report.error(
            "MIMETYPE",
            format!(
                "mimetype is '{}', expected '{}'",
                String::from_utf8_lossy(&contents),
                EPUB_MIMETYPE
            ),
        ),
        Err(e) => report.error("ZIP", e),
    }
}

fn check_package(archive: &ZipArchive<'_>, opf_path: &str, opf: &str, report: &mut EpubReport) {
    for marker in [
        "<metadata",
        "<manifest",
        "<spine",
        "<dc:title",
        "<dc:language",
        "<dc:identifier",
    ] {
        if !opf.contains(marker) {
            report.error("OPF", format!("package document lacks {}", marker));
        }
    }
    if !opf.contains("<dc:creator") {
        report.warning("OPF", "package document names no creator");
    }
    let version = RE_PACKAGE_VERSION
        .captures(opf)
        .map(|c| c[1].to_string())
        .unwrap_or_default();
    let epub3 = version.starts_with('3');
    if epub3 && !opf.contains("dcterms:modified") {
        report.warning("OPF", "EPUB 3 package lacks dcterms:modified");
    }

    let base = opf_path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    let mut manifest: HashMap<String, ManifestItem> = HashMap::new();
    for tag in RE_ITEM.find_iter(opf) {
        let attributes: HashMap<&str, &str> = RE_ATTRIBUTE
            .captures_iter(tag.as_str())
            .filter_map(|c| Some((c.get(1)?.as_str(), c.get(2)?.as_str())))
            .collect();
        let (Some(id), Some(href)) = (attributes.get("id"), attributes.get("href")) else {
            report.error("MANIFEST", format!("manifest item without id or href: {}", tag.as_str()));
            continue;
        };
        let path = resolve_href(base, href);
        if archive.entry(&path).is_none() {
            report.error("MANIFEST", format!("item '{}' points at missing {}", id, path));
        }
        manifest.insert(
            (*id).to_string(),
            ManifestItem {
                path,
                media_type: attributes.get("media-type").copied().unwrap_or("").to_string(),
                properties: attributes.get("properties").copied().unwrap_or("").to_string(),
            },
        );
    }

    let spine: Vec<&str> = RE_ITEMREF
        .captures_iter(opf)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    if spine.is_empty() {
        report.error("SPINE", "spine lists no content documents");
    }
    for idref in spine {
        if !manifest.contains_key(idref) {
            report.error("SPINE", format!("itemref '{}' is not in the manifest", idref));
        }
    }

    let nav = manifest
        .values()
        .find(|item| item.properties.split_whitespace().any(|p| p == "nav"));
    match nav {
        Some(item) => {
            if let Some(text) = read_text(archive, &item.path, report)
                && !(text.contains("<nav") && text.contains(r#"epub:type="toc""#))
            {
                report.error("NAV", format!("{} has no toc nav element", item.path));
            }
        }
        None if epub3 => report.error("NAV", "EPUB 3 package has no navigation document"),
        None => {}
    }

    if let Some(item) = manifest.values().find(|item| item.media_type == NCX_MEDIA_TYPE)
        && let Some(text) = read_text(archive, &item.path, report)
    {
        for marker in ["<ncx", "<head>", "<docTitle>", "<navMap>"] {
            if !text.contains(marker) {
                report.warning("NCX", format!("{} lacks {}", item.path, marker));
            }
        }
    }
}

/// UTF-8 contents of `name`; read failures are recorded as errors
fn read_text(archive: &ZipArchive<'_>, name: &str, report: &mut EpubReport) -> Option<String> {
    match archive.read(name) {
        Ok(Some(bytes)) => match String::from_utf8(bytes) {
            Ok(text) => Some(text),
            Err(_) => {
                report.error("ENCODING", format!("{} is not UTF-8", name));
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            report.error("ZIP", e);
            None
        }
    }
}

/// Archive path of `href` relative to the directory `base`
fn resolve_href(base: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or(href);
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
