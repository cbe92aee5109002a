//! Vector typesetting through a LaTeX engine.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info};

use super::markup::{blocks_to_latex, escape_latex};
use super::process::{ScratchDir, ToolCommand, run_tool};
use super::{RenderJob, Renderer, ensure_artifact};
use crate::types::{OutputFormat, RenderFailureKind, Result, Stage, TypecraftError};

const SOURCE_FILE: &str = "book.tex";
const PDF_FILE: &str = "book.pdf";

#[derive(Debug, Clone)]
pub struct LatexRenderer {
    engine: String,
    runs: u32,
}

impl LatexRenderer {
    pub fn new(engine: impl Into<String>, runs: u32) -> Self {
        Self {
            engine: engine.into(),
            runs: runs.max(1),
        }
    }

    /// pdflatex has no system font access
    fn uses_fontspec(&self) -> bool {
        !self.engine.contains("pdflatex")
    }

    /// Complete `book.tex` source for a job
    pub fn document(&self, job: &RenderJob) -> String {
        let design = &job.design;
        let (width, height) = design.page_format.dimensions_mm();
        let m = &design.margins;
        let hex = |color: &str| color.trim_start_matches('#').to_uppercase();

        let mut tex = String::new();
        tex.push_str("\\documentclass[11pt,openany]{book}\n");
        tex.push_str(&format!(
            "\\usepackage[paperwidth={}mm,paperheight={}mm,inner={}mm,outer={}mm,top={}mm,bottom={}mm]{{geometry}}\n",
            width, height, m.inner, m.outer, m.top, m.bottom
        ));

        if self.uses_fontspec() {
            tex.push_str("\\usepackage{fontspec}\n");
            tex.push_str(&format!("\\setmainfont{{{}}}\n", design.fonts.body));
            tex.push_str(&format!("\\newfontfamily\\headingfont{{{}}}\n", design.fonts.heading));
            if let Some(mono) = &design.fonts.monospace {
                tex.push_str(&format!("\\setmonofont{{{}}}\n", mono));
            }
        } else {
            tex.push_str("\\usepackage[T1]{fontenc}\n\\usepackage[utf8]{inputenc}\n");
            tex.push_str("\\newcommand{\\headingfont}{\\rmfamily}\n");
        }

        tex.push_str("\\usepackage{amsmath,amssymb}\n\\usepackage{graphicx}\n\\usepackage{xcolor}\n");
        tex.push_str(&format!("\\definecolor{{primary}}{{HTML}}{{{}}}\n", hex(&design.palette.primary)));
        tex.push_str(&format!("\\definecolor{{secondary}}{{HTML}}{{{}}}\n", hex(&design.palette.secondary)));
        tex.push_str(&format!("\\definecolor{{bodytext}}{{HTML}}{{{}}}\n", hex(&design.palette.text)));
        tex.push_str(&format!("\\definecolor{{pagebg}}{{HTML}}{{{}}}\n", hex(&design.palette.background)));

        tex.push_str("\\usepackage{titlesec}\n");
        tex.push_str(
            "\\titleformat{\\chapter}[display]{\\headingfont\\huge\\bfseries\\color{primary}}{\\chaptertitlename\\ \\thechapter}{16pt}{\\Huge}\n",
        );
        tex.push_str("\\titleformat*{\\section}{\\headingfont\\Large\\bfseries\\color{secondary}}\n");
        tex.push_str("\\titleformat*{\\subsection}{\\headingfont\\large\\bfseries}\n");

        let title = escape_latex(&job.metadata.title);
        let author = job.metadata.author.as_deref().map(escape_latex).unwrap_or_default();
        tex.push_str("\\usepackage{hyperref}\n");
        tex.push_str(&format!(
            "\\hypersetup{{colorlinks=true,linkcolor=primary,urlcolor=primary,pdftitle={{{}}},pdfauthor={{{}}}}}\n",
            title, author
        ));

        tex.push_str(&format!("\\title{{{}}}\n\\author{{{}}}\n\\date{{}}\n\n", title, author));
        tex.push_str("\\begin{document}\n\\pagecolor{pagebg}\n\\color{bodytext}\n");
        tex.push_str("\\frontmatter\n\\maketitle\n\\tableofcontents\n\\mainmatter\n\n");
        tex.push_str(&blocks_to_latex(&job.blocks()));
        tex.push_str("\\end{document}\n");
        tex
    }
}

#[async_trait]
impl Renderer for LatexRenderer {
    fn name(&self) -> &str {
        "latex"
    }

    fn format(&self) -> OutputFormat {
        OutputFormat::Pdf
    }

    async fn render(&self, job: &RenderJob) -> Result<PathBuf> {
        let scratch = ScratchDir::create("latex").await?;
        tokio::fs::write(scratch.join(SOURCE_FILE), self.document(job)).await?;

        let mut out_dir_arg = std::ffi::OsString::from("-output-directory=");
        out_dir_arg.push(scratch.path());
        let command = ToolCommand::new(&self.engine)
            .arg("-interaction=nonstopmode")
            .arg("-halt-on-error")
            .arg(out_dir_arg)
            .arg(SOURCE_FILE)
            .current_dir(scratch.path());

        // extra passes resolve the table of contents and cross references
        for pass in 1..=self.runs {
            if job.cancel.is_cancelled() {
                return Err(TypecraftError::Cancelled {
                    last_stage: Stage::Rendering.to_string(),
                });
            }
            debug!(engine = %self.engine, pass, "Running LaTeX pass");
            run_tool(&command, OutputFormat::Pdf, job.timeout, &job.cancel).await?;
        }

        let built = scratch.join(PDF_FILE);
        if !built.is_file() {
            return Err(TypecraftError::render(
                RenderFailureKind::MissingOutput,
                OutputFormat::Pdf,
                format!("{} produced no {}", self.engine, PDF_FILE),
            ));
        }
        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(&built, &job.output_path).await?;
        ensure_artifact(&job.output_path, OutputFormat::Pdf).await?;

        info!(path = %job.output_path.display(), "LaTeX render complete");
        Ok(job.output_path.clone())
    }
}
