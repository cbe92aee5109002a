//! Select Command
//!
//! Shows which typesetting pipeline a manuscript would get and why.
//!
//! Usage:
//!   typecraft select <file> [--json]

use std::path::Path;

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, print_json, read_manuscript};
use crate::types::Result;

pub fn run(path: &Path, as_json: bool) -> Result<()> {
    let ctx = CommandContext::load()?;
    let manuscript = read_manuscript(path)?;
    let analysis = ctx.analyzer().analyze(manuscript.text())?;
    let decision = ctx.selector().select(&analysis.profile, &analysis.academic)?;

    if as_json {
        return print_json(&decision);
    }
    Output::new().decision(&decision);
    Ok(())
}
