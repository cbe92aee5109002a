use console::style;
use std::fmt::Display;

use crate::types::{
    AcademicScore, ContentProfile, DesignResult, FailedJob, GenerationResult, PipelineDecision,
};

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    pub fn field(&self, label: &str, value: impl Display) {
        println!("  {:<20} {}", style(label).dim(), value);
    }

    pub fn profile(&self, profile: &ContentProfile, academic: &AcademicScore) {
        self.section("Content Profile");
        let genre = match profile.secondary_genre {
            Some(secondary) => format!("{} (secondary: {})", profile.primary_genre, secondary),
            None => profile.primary_genre.to_string(),
        };
        self.field("genre", genre);
        self.field("words", profile.stats.word_count);
        self.field("estimated pages", format!("{:.1}", profile.estimated_pages));
        self.field(
            "complexity",
            format!("{:.2} (flesch {:.1})", profile.complexity, profile.flesch_score),
        );
        self.field("formality", format!("{:.2}", profile.formality));
        self.field("sentiment", format!("{:+.2}", profile.sentiment));
        self.field("technical density", format!("{:.2}", profile.technical_density));
        self.field(
            "elements",
            format!(
                "{} equations, {} tables, {} images, {} code blocks",
                profile.stats.equation_count,
                profile.stats.table_count,
                profile.stats.image_count,
                profile.stats.code_block_count
            ),
        );

        self.section("Academic Detection");
        self.field("academic", academic.is_academic);
        self.field("confidence", format!("{:.0}%", academic.confidence * 100.0));
        self.field("citations", academic.citation_count);
        if !academic.structure_markers.is_empty() {
            self.field("sections", academic.structure_markers.join(", "));
        }
    }

    pub fn design(&self, design: &DesignResult) {
        self.section("Design");
        self.field("body font", &design.fonts.body);
        self.field("heading font", &design.fonts.heading);
        if let Some(mono) = &design.fonts.monospace {
            self.field("monospace", mono);
        }
        self.field("font mood", design.fonts.mood);
        let palette = &design.palette;
        self.field(
            "palette",
            format!(
                "{} on {} (primary {}, {})",
                palette.text, palette.background, palette.primary, palette.harmony
            ),
        );
        self.field(
            "contrast",
            format!("{:.2}:1 ({})", palette.contrast_ratio, palette.wcag_level),
        );
        self.field("mood", format!("{} - {}", palette.mood, palette.rationale));
        let m = &design.margins;
        self.field(
            "margins (mm)",
            format!(
                "{} inner {:.0} top {:.0} outer {:.0} bottom {:.0}",
                design.page_format, m.inner, m.top, m.outer, m.bottom
            ),
        );
        self.field(
            "grid",
            format!("{} ({} columns)", design.grid.kind, design.grid.columns),
        );
    }

    pub fn decision(&self, decision: &PipelineDecision) {
        self.section("Pipeline");
        let mut chosen = decision.pipeline.to_string();
        if decision.undecided {
            chosen.push_str(" (undecided)");
        }
        self.field("pipeline", chosen);
        self.field("confidence", format!("{:.0}%", decision.confidence * 100.0));
        self.field(
            "scores",
            format!(
                "vector {:.3} / web {:.3}",
                decision.scores.vector_score, decision.scores.web_score
            ),
        );
        for reason in &decision.reasons {
            println!("    - {}", reason);
        }
    }

    pub fn generation(&self, result: &GenerationResult) {
        self.decision(&result.decision);
        if result.pipeline_overridden {
            self.field("used", format!("{} (requested)", result.pipeline));
        }
        self.design(&result.design_metadata);

        self.section("Outputs");
        for (format, file) in &result.output_files {
            let pages = file
                .page_count
                .map(|p| format!(", {} pages", p))
                .unwrap_or_default();
            self.success(&format!(
                "{} {} ({} bytes{})",
                format,
                file.path.display(),
                file.size,
                pages
            ));
        }
        for (format, err) in &result.format_errors {
            self.error(&format!("{} {}", format, err));
        }
        let m = &result.metrics;
        self.field(
            "timings (ms)",
            format!(
                "analysis {} design {} select {} render {} validate {} total {}",
                m.analysis_ms,
                m.design_ms,
                m.selection_ms,
                m.render_ms,
                m.validation_ms,
                m.total_ms
            ),
        );
    }
}

impl Output {
    /// Stage timeline and trace of a job that did not finish
    pub fn failure(&self, failed: &FailedJob) {
        self.section(&format!("Job {} ({})", failed.job_id, failed.outcome));
        for record in &failed.stages {
            let line = format!("{} {} ms", record.stage, record.duration_ms);
            match &record.error {
                Some(err) => self.error(&format!("{} - {}", line, err)),
                None if record.ok => self.success(&line),
                None => self.warning(&line),
            }
        }
        for line in &failed.trace {
            println!("    {}", style(line).dim());
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
