//! Job State Machine
//!
//! ```text
//! INIT -> CONTENT_READ -> ANALYZING -> DESIGNING -> PIPELINE_SELECTED
//!      -> RENDERING -> VALIDATING -> COMPLETED
//! any non-terminal stage -> FAILED | CANCELLED
//! ```
//!
//! [`StageRecorder`] enforces the transitions, timestamps every stage and
//! mirrors each move into the job's [`ProgressTracker`].

use chrono::{DateTime, Utc};
use std::time::Instant;
use tracing::{debug, info};

use super::progress::ProgressTracker;
use crate::types::{ErrorRecord, Stage, StageRecord, TypecraftError};

/// Whether `to` may follow `from`
pub fn can_transition(from: Stage, to: Stage) -> bool {
    use Stage::*;
    match (from, to) {
        (f, Failed | Cancelled) => !f.is_terminal(),
        (Init, ContentRead)
        | (ContentRead, Analyzing)
        | (Analyzing, Designing)
        | (Designing, PipelineSelected)
        | (PipelineSelected, Rendering)
        | (Rendering, Validating)
        | (Validating, Completed) => true,
        _ => false,
    }
}

struct OpenStage {
    stage: Stage,
    start: DateTime<Utc>,
    started: Instant,
}

pub struct StageRecorder {
    progress: ProgressTracker,
    records: Vec<StageRecord>,
    open: Option<OpenStage>,
    state: Stage,
    last_completed: Option<Stage>,
    trace: Vec<String>,
    job_started: Instant,
}

impl StageRecorder {
    /// Recorder positioned on INIT, which is already open
    pub fn start(progress: ProgressTracker) -> Self {
        progress.enter(Stage::Init);
        Self {
            progress,
            records: Vec::new(),
            open: Some(OpenStage {
                stage: Stage::Init,
                start: Utc::now(),
                started: Instant::now(),
            }),
            state: Stage::Init,
            last_completed: None,
            trace: Vec::new(),
            job_started: Instant::now(),
        }
    }

    pub fn state(&self) -> Stage {
        self.state
    }

    /// Most recent stage that closed successfully
    pub fn last_completed(&self) -> Option<Stage> {
        self.last_completed
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    /// Close the open stage successfully and open `next`.
    ///
    /// Returns the closed stage's duration in milliseconds.
    pub fn advance(&mut self, next: Stage) -> u64 {
        debug_assert!(
            can_transition(self.state, next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        let elapsed = self.close(true, None);
        info!(from = %self.state, to = %next, "Stage transition");
        self.state = next;
        self.open = Some(OpenStage {
            stage: next,
            start: Utc::now(),
            started: Instant::now(),
        });
        self.progress.enter(next);
        elapsed
    }

    /// Close the open stage as failed and move to FAILED or CANCELLED
    pub fn abort(&mut self, err: &TypecraftError) {
        let terminal = if matches!(err, TypecraftError::Cancelled { .. }) {
            Stage::Cancelled
        } else {
            Stage::Failed
        };
        if !can_transition(self.state, terminal) {
            return;
        }
        let failed_stage = self.state;
        self.close(false, Some(ErrorRecord::from(err)));
        self.trace(format!("{}: {}", failed_stage, err));

        let now = Utc::now();
        self.records.push(StageRecord {
            stage: terminal,
            start: now,
            end: now,
            duration_ms: 0,
            ok: false,
            error: Some(ErrorRecord::from(err)),
        });
        self.state = terminal;
        self.progress.fail(terminal, err.to_string());
    }

    /// Close VALIDATING and record COMPLETED
    pub fn complete(&mut self) -> u64 {
        let elapsed = self.advance(Stage::Completed);
        self.close(true, None);
        elapsed
    }

    pub fn trace(&mut self, line: impl Into<String>) {
        let line = line.into();
        debug!(trace = %line, "Job trace");
        self.trace.push(line);
    }

    pub fn total_ms(&self) -> u64 {
        self.job_started.elapsed().as_millis() as u64
    }

    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }

    pub fn into_parts(self) -> (Vec<StageRecord>, Vec<String>) {
        (self.records, self.trace)
    }

    fn close(&mut self, ok: bool, error: Option<ErrorRecord>) -> u64 {
        let Some(open) = self.open.take() else {
            return 0;
        };
        let duration_ms = open.started.elapsed().as_millis() as u64;
        let end = Utc::now().max(open.start);
        self.records.push(StageRecord {
            stage: open.stage,
            start: open.start,
            end,
            duration_ms,
            ok,
            error,
        });
        if ok {
            self.last_completed = Some(open.stage);
        }
        duration_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER: [Stage; 8] = [
        Stage::Init,
        Stage::ContentRead,
        Stage::Analyzing,
        Stage::Designing,
        Stage::PipelineSelected,
        Stage::Rendering,
        Stage::Validating,
        Stage::Completed,
    ];

    #[test]
    fn test_transitions_follow_declared_order() {
        for pair in ORDER.windows(2) {
            assert!(can_transition(pair[0], pair[1]));
            assert!(!can_transition(pair[1], pair[0]));
        }
        assert!(!can_transition(Stage::Init, Stage::Analyzing));
        assert!(can_transition(Stage::Rendering, Stage::Failed));
        assert!(can_transition(Stage::Init, Stage::Cancelled));
        assert!(!can_transition(Stage::Completed, Stage::Failed));
        assert!(!can_transition(Stage::Failed, Stage::Cancelled));
    }

    #[test]
    fn test_full_run_records_every_stage() {
        let progress = ProgressTracker::new("job");
        let mut recorder = StageRecorder::start(progress.clone());
        for stage in &ORDER[1..7] {
            recorder.advance(*stage);
        }
        recorder.complete();
        let (records, _) = recorder.into_parts();
        let stages: Vec<Stage> = records.iter().map(|r| r.stage).collect();
        assert_eq!(stages, ORDER.to_vec());
        assert!(records.iter().all(|r| r.ok && r.end >= r.start));
        assert_eq!(progress.snapshot().percent, 100);
    }

    #[test]
    fn test_abort_records_failure() {
        let progress = ProgressTracker::new("job");
        let mut recorder = StageRecorder::start(progress.clone());
        recorder.advance(Stage::ContentRead);
        recorder.abort(&TypecraftError::empty_input("book.md"));

        assert_eq!(recorder.state(), Stage::Failed);
        assert_eq!(recorder.last_completed(), Some(Stage::Init));
        let records = recorder.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].stage, Stage::ContentRead);
        assert!(!records[1].ok);
        assert_eq!(records[2].stage, Stage::Failed);

        let snapshot = progress.snapshot();
        assert_eq!(snapshot.stage, Stage::Failed);
        assert_eq!(snapshot.percent, 10);
    }

    #[test]
    fn test_cancel_goes_to_cancelled_once() {
        let mut recorder = StageRecorder::start(ProgressTracker::new("job"));
        let err = TypecraftError::Cancelled {
            last_stage: "INIT".to_string(),
        };
        recorder.abort(&err);
        recorder.abort(&err);
        assert_eq!(recorder.state(), Stage::Cancelled);
        assert_eq!(recorder.records().len(), 2);
    }
}
