//! Design Command
//!
//! Synthesizes fonts, palette and margins for a manuscript without
//! rendering anything.
//!
//! Usage:
//!   typecraft design <file> [--page-format 6x9] [--json]

use std::path::Path;

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, print_json, read_manuscript};
use crate::types::{PageFormat, Result};

pub fn run(path: &Path, page_format: Option<PageFormat>, as_json: bool) -> Result<()> {
    let ctx = CommandContext::load()?;
    let manuscript = read_manuscript(path)?;
    let analysis = ctx.analyzer().analyze(manuscript.text())?;
    let design = ctx
        .synthesizer(page_format)
        .synthesize(&analysis.profile, None)?;

    if as_json {
        return print_json(&design);
    }

    let output = Output::new();
    output.design(&design);
    if design.font_recommendations.len() > 1 {
        output.section("Alternatives");
        for scored in design.font_recommendations.iter().skip(1) {
            output.field(
                &format!("{:.2}", scored.score),
                format!("{} / {} ({})", scored.pair.body, scored.pair.heading, scored.pair.mood),
            );
        }
    }
    Ok(())
}
