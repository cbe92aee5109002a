//! Analyze Command
//!
//! Prints the content profile and academic score for a manuscript.
//!
//! Usage:
//!   typecraft analyze <file> [--json]

use serde_json::json;
use std::path::Path;

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, print_json, read_manuscript};
use crate::types::Result;

pub fn run(path: &Path, as_json: bool) -> Result<()> {
    let ctx = CommandContext::load()?;
    let manuscript = read_manuscript(path)?;
    let analysis = ctx.analyzer().analyze(manuscript.text())?;

    if as_json {
        return print_json(&json!({
            "source": manuscript.source_name(),
            "profile": analysis.profile,
            "academic": analysis.academic,
        }));
    }

    let output = Output::new();
    output.info(&format!(
        "{} ({} bytes)",
        manuscript.source_name(),
        manuscript.len_bytes()
    ));
    output.profile(&analysis.profile, &analysis.academic);
    Ok(())
}
