//! Command-Line Interface
//!
//! Handlers behind the `typecraft` binary. Inspection commands (`analyze`,
//! `design`, `select`) run the pure components directly; `generate` and
//! `batch` go through the orchestrator.

pub mod commands;
pub mod progress;
pub mod ui;
pub mod util;

pub use progress::{format_snapshot, render_progress_bar, spawn_console};
pub use ui::Output;
pub use util::{CommandContext, MetadataArgs, print_json, read_manuscript};
