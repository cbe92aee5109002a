//! External Tool Execution
//!
//! Every renderer shells out through [`run_tool`], which applies the render
//! timeout, kills the child on timeout or cancellation, and maps failures to
//! `RenderFailed` for the format being produced.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::orchestrator::CancelToken;
use crate::types::{OutputFormat, RenderFailureKind, Result, Stage, TypecraftError};

/// Trailing stderr kept in failure details
const STDERR_TAIL: usize = 800;

/// A program plus arguments, run inside `cwd`
#[derive(Debug, Clone)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

/// Run a tool to completion under a wall-clock budget.
///
/// Returns `Cancelled` as soon as the token fires; the child is killed when
/// its future is dropped.
pub async fn run_tool(
    tool: &ToolCommand,
    format: OutputFormat,
    budget: Duration,
    cancel: &CancelToken,
) -> Result<Output> {
    let mut cmd = Command::new(&tool.program);
    cmd.args(&tool.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &tool.cwd {
        cmd.current_dir(dir);
    }

    debug!(program = %tool.program, args = ?tool.args, "Spawning renderer tool");
    let start = Instant::now();

    let child = cmd.spawn().map_err(|e| {
        TypecraftError::render(
            RenderFailureKind::NonZeroExit,
            format,
            format!("failed to start '{}': {}. Is it installed?", tool.program, e),
        )
    })?;

    let output = tokio::select! {
        result = tokio::time::timeout(budget, child.wait_with_output()) => match result {
            Ok(output) => output?,
            Err(_) => {
                warn!(program = %tool.program, ?budget, "Renderer tool timed out");
                return Err(TypecraftError::render(
                    RenderFailureKind::Timeout,
                    format,
                    format!("'{}' exceeded {}ms", tool.program, budget.as_millis()),
                ));
            }
        },
        _ = cancel.cancelled() => {
            warn!(program = %tool.program, "Renderer tool cancelled");
            return Err(TypecraftError::Cancelled {
                last_stage: Stage::Rendering.to_string(),
            });
        }
    };

    debug!(
        program = %tool.program,
        status = ?output.status.code(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Renderer tool finished"
    );

    if !output.status.success() {
        return Err(TypecraftError::render(
            RenderFailureKind::NonZeroExit,
            format,
            format!(
                "'{}' exited with {}: {}",
                tool.program,
                output
                    .status
                    .code()
                    .map_or_else(|| "signal".to_string(), |c| c.to_string()),
                stderr_tail(&output)
            ),
        ));
    }

    Ok(output)
}

fn stderr_tail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    let source = if stderr.is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr.to_string()
    };
    if source.len() <= STDERR_TAIL {
        return source;
    }
    let mut cut = source.len() - STDERR_TAIL;
    while !source.is_char_boundary(cut) {
        cut += 1;
    }
    format!("...{}", &source[cut..])
}

// =============================================================================
// Scratch Directories
// =============================================================================

/// Per-render working directory, removed on drop
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub async fn create(label: &str) -> Result<Self> {
        let path = std::env::temp_dir().join(format!("typecraft-{}-{}", label, Uuid::new_v4()));
        tokio::fs::create_dir_all(&path).await?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.path.join(relative)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            debug!(path = %self.path.display(), error = %e, "Scratch cleanup failed");
        }
    }
}
