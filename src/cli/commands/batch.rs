//! Batch Command
//!
//! Generates every manuscript matching a glob pattern concurrently, one job
//! per file. Project ids come from file stems, suffixed when two files share
//! a stem.
//!
//! Usage:
//!   typecraft batch "manuscripts/*.md" [--format pdf,epub] [--output-dir dir] [--json]

use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, print_json};
use crate::orchestrator::{InMemoryProjectLookup, Orchestrator};
use crate::types::{ErrorRecord, GenerationRequest, ProjectMetadata, Result, TypecraftError};

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub pattern: String,
    pub formats: Vec<String>,
    pub output_dir: Option<PathBuf>,
    pub as_json: bool,
}

/// One line of the batch report
#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    pub project_id: String,
    pub content: PathBuf,
    pub success: bool,
    pub partial: bool,
    pub outputs: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
}

/// Files matching `pattern`, sorted
pub fn expand(pattern: &str) -> Result<Vec<PathBuf>> {
    let entries = glob::glob(pattern)
        .map_err(|e| TypecraftError::Config(format!("Invalid pattern '{}': {}", pattern, e)))?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();
    Ok(paths)
}

/// File stems as project ids, with `-2`, `-3`, ... for repeats
pub fn project_ids(paths: &[PathBuf]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    paths
        .iter()
        .map(|path| {
            let stem = stem_of(path);
            let count = seen.entry(stem.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                stem
            } else {
                format!("{}-{}", stem, count)
            }
        })
        .collect()
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("book")
        .to_string()
}

/// Run all jobs; returns the report, failures included
pub async fn run(options: BatchOptions) -> Result<Vec<BatchEntry>> {
    let paths = expand(&options.pattern)?;
    if paths.is_empty() {
        return Err(TypecraftError::Config(format!(
            "No manuscripts match '{}'",
            options.pattern
        )));
    }

    let ctx = CommandContext::load()?;
    let lookup = InMemoryProjectLookup::new();
    let mut requests = Vec::with_capacity(paths.len());
    for (path, id) in paths.iter().zip(project_ids(&paths)) {
        lookup.insert(ProjectMetadata::new(id.clone(), stem_of(path)).with_language(""));
        let mut request = GenerationRequest::new(id, path);
        if !options.formats.is_empty() {
            request = request.with_formats(options.formats.iter().cloned());
        }
        request.output_dir = options.output_dir.clone();
        requests.push(request);
    }
    let orchestrator = Arc::new(Orchestrator::new(ctx.config, Arc::new(lookup))?);

    let jobs = requests.into_iter().map(|request| {
        let orchestrator = Arc::clone(&orchestrator);
        async move {
            let project_id = request.project_id.clone();
            let content = request.content_path.clone();
            match orchestrator.generate(request).await {
                Ok(result) => BatchEntry {
                    project_id,
                    content,
                    success: result.success,
                    partial: result.partial,
                    outputs: result.output_files.values().map(|f| f.path.clone()).collect(),
                    error: result.error,
                },
                Err(e) => BatchEntry {
                    project_id,
                    content,
                    success: false,
                    partial: false,
                    outputs: Vec::new(),
                    error: Some(ErrorRecord::from(&e)),
                },
            }
        }
    });
    let report = join_all(jobs).await;

    if options.as_json {
        print_json(&report)?;
    } else {
        let output = Output::new();
        output.section(&format!("Batch ({} manuscripts)", report.len()));
        for entry in &report {
            match (&entry.error, entry.success) {
                (_, true) => output.success(&format!(
                    "{} -> {} file(s)",
                    entry.project_id,
                    entry.outputs.len()
                )),
                (Some(err), false) if entry.partial => {
                    output.warning(&format!("{} partial: {}", entry.project_id, err))
                }
                (Some(err), false) => output.error(&format!("{}: {}", entry.project_id, err)),
                (None, false) => output.error(&entry.project_id),
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_project_ids_dedupe_stems() {
        let paths = vec![
            PathBuf::from("a/book.md"),
            PathBuf::from("b/book.md"),
            PathBuf::from("b/notes.md"),
            PathBuf::from("c/book.txt"),
        ];
        assert_eq!(project_ids(&paths), vec!["book", "book-2", "notes", "book-3"]);
    }

    #[test]
    fn test_expand_matches_files_only() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("one.md"), "One.").unwrap();
        std::fs::write(dir.path().join("two.md"), "Two.").unwrap();
        std::fs::write(dir.path().join("skip.txt"), "Skip.").unwrap();
        std::fs::create_dir(dir.path().join("dir.md")).unwrap();

        let pattern = format!("{}/*.md", dir.path().display());
        let paths = expand(&pattern).unwrap();
        let names: Vec<String> = paths.iter().map(|p| stem_of(p)).collect();
        assert_eq!(names, vec!["one", "two"]);
    }

    #[test]
    fn test_expand_rejects_bad_pattern() {
        assert!(matches!(expand("[unclosed"), Err(TypecraftError::Config(_))));
    }
}
