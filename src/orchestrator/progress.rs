//! Progress and Cancellation
//!
//! Lock-free per-job state shared between the running job and callers
//! polling it: a cancellation token and a progress snapshot, both backed by
//! `tokio::sync::watch`.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

use crate::types::Stage;

// =============================================================================
// Cancellation
// =============================================================================

/// Cooperative cancellation signal; clones observe the same flag
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // the sender lives as long as self, so wait_for only ends on cancel
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

// =============================================================================
// Progress
// =============================================================================

/// Point-in-time view of a job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub job_id: String,
    pub stage: Stage,
    pub percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Writer side of a job's progress
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    tx: Arc<watch::Sender<ProgressSnapshot>>,
}

impl ProgressTracker {
    pub fn new(job_id: impl Into<String>) -> Self {
        let (tx, _) = watch::channel(ProgressSnapshot {
            job_id: job_id.into(),
            stage: Stage::Init,
            percent: Stage::Init.base_percent(),
            detail: None,
        });
        Self { tx: Arc::new(tx) }
    }

    /// Enter a stage at its base percentage
    pub fn enter(&self, stage: Stage) {
        self.tx.send_modify(|p| {
            p.stage = stage;
            if !matches!(stage, Stage::Failed | Stage::Cancelled) {
                p.percent = stage.base_percent();
            }
            p.detail = None;
        });
    }

    /// Rendering progress: `done` of `total` formats finished
    pub fn rendering(&self, done: usize, total: usize, detail: impl Into<String>) {
        let start = Stage::Rendering.base_percent() as usize;
        let span = (Stage::Validating.base_percent() - Stage::Rendering.base_percent()) as usize;
        let percent = start + span * done / total.max(1);
        self.tx.send_modify(|p| {
            p.stage = Stage::Rendering;
            p.percent = percent.min(u8::MAX as usize) as u8;
            p.detail = Some(detail.into());
        });
    }

    pub fn fail(&self, stage: Stage, detail: impl Into<String>) {
        self.tx.send_modify(|p| {
            p.stage = stage;
            p.detail = Some(detail.into());
        });
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.tx.subscribe()
    }
}
