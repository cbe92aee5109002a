//! Paginated HTML Renderer
//!
//! Emits `index.html` plus `book.css` and hands them to a CSS paged-media
//! engine. The stylesheet carries everything layout-related:
//!
//! - `@page` size and margins, mirrored for left and right pages
//! - page numbers through the `page` counter in the bottom margin box
//! - running headers: each `h1` sets the `chapter` string shown at the top
//! - fonts, palette and a 1.2 modular type scale
//! - the design's column grid on the `main` element

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

use super::markup::{blocks_to_html, escape_html};
use super::process::{ScratchDir, ToolCommand, run_tool};
use super::{RenderJob, Renderer, ensure_artifact};
use crate::types::{DesignResult, GridLayout, OutputFormat, Result};

const HTML_FILE: &str = "index.html";
const CSS_FILE: &str = "book.css";

const BASE_FONT_PT: f64 = 11.0;
const TYPE_SCALE: f64 = 1.2;
const LINE_HEIGHT: f64 = 1.5;

#[derive(Debug, Clone)]
pub struct PagedRenderer {
    command: String,
}

impl PagedRenderer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

fn font_stack(name: &str, generic: &str) -> String {
    format!("\"{}\", {}", name.replace('"', ""), generic)
}

/// Heading size for `level` on the modular scale
fn heading_pt(level: i32) -> f64 {
    (BASE_FONT_PT * TYPE_SCALE.powi(5 - level) * 10.0).round() / 10.0
}

pub fn stylesheet(design: &DesignResult) -> String {
    let m = &design.margins;
    let p = &design.palette;
    let mono = design
        .fonts
        .monospace
        .as_deref()
        .map(|f| font_stack(f, "monospace"))
        .unwrap_or_else(|| "monospace".to_string());

    let mut css = format!(
        r#"@page {{
  size: {size};
  margin: {top}mm {outer}mm {bottom}mm {inner}mm;
  @bottom-center {{ content: counter(page); font-size: 9pt; color: {secondary}; }}
  @top-center {{ content: string(chapter); font-size: 9pt; font-style: italic; color: {secondary}; }}
}}
@page :left {{ margin-left: {outer}mm; margin-right: {inner}mm; }}
@page :right {{ margin-left: {inner}mm; margin-right: {outer}mm; }}
@page :first {{ @top-center {{ content: none; }} }}

html {{ background: {background}; }}
body {{
  font-family: {body};
  font-size: {base}pt;
  line-height: {line_height};
  color: {text};
  background: {background};
  hyphens: auto;
}}
h1, h2, h3, h4, h5, h6 {{ font-family: {heading}; color: {primary}; line-height: 1.2; }}
h1 {{ string-set: chapter content(); break-before: right; font-size: {h1}pt; }}
h2 {{ font-size: {h2}pt; }}
h3 {{ font-size: {h3}pt; }}
h4, h5, h6 {{ font-size: {h4}pt; }}
p {{ margin: 0; text-align: justify; orphans: 2; widows: 2; }}
p + p {{ text-indent: 1.5em; }}
a {{ color: {accent}; }}
pre, code {{ font-family: {mono}; font-size: 0.9em; }}
pre {{ white-space: pre-wrap; break-inside: avoid; }}
figure {{ margin: 1em 0; text-align: center; break-inside: avoid; }}
figure img {{ max-width: 100%; }}
figcaption {{ font-size: 0.85em; color: {secondary}; }}
table {{ border-collapse: collapse; margin: 1em auto; break-inside: avoid; }}
th, td {{ border-bottom: 1px solid {secondary}; padding: 0.2em 0.6em; }}
.math.display {{ text-align: center; margin: 1em 0; }}
.title-page {{ break-after: page; text-align: center; padding-top: 30%; }}
.title-page h1 {{ string-set: chapter ""; break-before: auto; }}
"#,
        size = design.page_format.css_size(),
        top = m.top,
        bottom = m.bottom,
        inner = m.inner,
        outer = m.outer,
        body = font_stack(&design.fonts.body, "serif"),
        heading = font_stack(&design.fonts.heading, "serif"),
        mono = mono,
        base = BASE_FONT_PT,
        line_height = LINE_HEIGHT,
        h1 = heading_pt(1),
        h2 = heading_pt(2),
        h3 = heading_pt(3),
        h4 = heading_pt(4),
        primary = p.primary,
        secondary = p.secondary,
        accent = p.accent,
        text = p.text,
        background = p.background,
    );
    css.push_str(&grid_css(&design.grid));
    css
}

/// Layout rules for `main`; prose spans every column, figures share rows
fn grid_css(grid: &GridLayout) -> String {
    if grid.is_single() {
        return format!(".content {{ line-height: {:.2}em; }}\n", grid.baseline_em);
    }
    let mut css = format!(
        ".grid-container {{\n  display: grid;\n  grid-template-columns: repeat({}, 1fr);\n  \
         column-gap: {:.2}em;\n  line-height: {:.2}em;\n}}\n\
         .grid-container > * {{ grid-column: 1 / -1; }}\n\
         .grid-container > figure {{ grid-column: span {}; }}\n",
        grid.columns,
        grid.gutter_em,
        grid.baseline_em,
        grid.kind.figure_span(),
    );
    for span in [2, 3, 4, 6, 12].into_iter().filter(|&s| s <= grid.columns) {
        css.push_str(&format!(".grid-span-{0} {{ grid-column: span {0}; }}\n", span));
    }
    css
}

fn main_class(grid: &GridLayout) -> &'static str {
    if grid.is_single() {
        "content"
    } else {
        "grid-container"
    }
}

pub fn document(job: &RenderJob) -> String {
    let title = escape_html(&job.metadata.title);
    let author = job
        .metadata
        .author
        .as_deref()
        .map(|a| format!("<p class=\"author\">{}</p>\n", escape_html(a)))
        .unwrap_or_default();
    format!(
        "<!DOCTYPE html>\n<html lang=\"{lang}\">\n<head>\n<meta charset=\"utf-8\" />\n\
         <title>{title}</title>\n<link rel=\"stylesheet\" href=\"{css}\" />\n</head>\n<body>\n\
         <section class=\"title-page\">\n<h1>{title}</h1>\n{author}</section>\n\
         <main class=\"{main}\">\n{body}</main>\n</body>\n</html>\n",
        lang = escape_html(&job.metadata.language),
        title = title,
        css = CSS_FILE,
        author = author,
        main = main_class(&job.design.grid),
        body = blocks_to_html(&job.blocks()),
    )
}

#[async_trait]
impl Renderer for PagedRenderer {
    fn name(&self) -> &str {
        "paged"
    }

    fn format(&self) -> OutputFormat {
        OutputFormat::Pdf
    }

    async fn render(&self, job: &RenderJob) -> Result<PathBuf> {
        let scratch = ScratchDir::create("paged").await?;
        tokio::fs::write(scratch.join(CSS_FILE), stylesheet(&job.design)).await?;
        tokio::fs::write(scratch.join(HTML_FILE), document(job)).await?;

        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // the tool runs inside the scratch dir, so the target must be absolute
        let output = std::path::absolute(&job.output_path)?;

        let command = ToolCommand::new(&self.command)
            .arg(HTML_FILE)
            .arg("-o")
            .arg(&output)
            .current_dir(scratch.path());
        run_tool(&command, OutputFormat::Pdf, job.timeout, &job.cancel).await?;
        ensure_artifact(&output, OutputFormat::Pdf).await?;

        info!(path = %output.display(), "Paged render complete");
        Ok(job.output_path.clone())
    }
}
