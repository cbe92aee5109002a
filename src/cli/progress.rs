//! Console Progress
//!
//! Single-line job progress on stderr, driven by polling the orchestrator's
//! registry so it works for any job id without extra wiring.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use console::style;
use tokio::task::JoinHandle;

use crate::orchestrator::{Orchestrator, ProgressSnapshot};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const BAR_WIDTH: usize = 30;

/// `[#####.....]` for `percent` over `width` cells
pub fn render_progress_bar(percent: u8, width: usize) -> String {
    let filled = (percent.min(100) as usize * width) / 100;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(width - filled))
}

pub fn format_snapshot(snapshot: &ProgressSnapshot) -> String {
    let detail = snapshot
        .detail
        .as_deref()
        .map(|d| format!(" ({})", d))
        .unwrap_or_default();
    format!(
        "{} {:>3}% {}{}",
        render_progress_bar(snapshot.percent, BAR_WIDTH),
        snapshot.percent,
        style(snapshot.stage).bold(),
        detail
    )
}

/// Redraw the progress line until the job for `project_id` ends
pub fn spawn_console(orchestrator: Arc<Orchestrator>, project_id: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last: Option<ProgressSnapshot> = None;
        loop {
            if let Ok(snapshot) = orchestrator.get_progress(&project_id) {
                if last.as_ref() != Some(&snapshot) {
                    eprint!("\r\x1B[K{}", format_snapshot(&snapshot));
                    let _ = std::io::stderr().flush();
                }
                let done = snapshot.stage.is_terminal();
                last = Some(snapshot);
                if done {
                    eprintln!();
                    break;
                }
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    })
}
