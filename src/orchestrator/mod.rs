//! Generation Orchestrator
//!
//! Drives one manuscript through the full production run:
//!
//! ```text
//! INIT → CONTENT_READ → ANALYZING → DESIGNING → PIPELINE_SELECTED
//!      → RENDERING → VALIDATING → COMPLETED
//! ```
//!
//! ## Jobs
//!
//! Each `generate` call is one cooperative job registered under its project
//! id. The registry keeps the job's progress and cancel token until the next
//! `generate` for the same project replaces it, so callers can still read the
//! terminal state after the run ends. Starting a new job for a project whose
//! previous job is still running cancels the old one.
//!
//! A job that ends in FAILED or CANCELLED leaves a [`FailedJob`] with its
//! stage records and trace, readable through [`Orchestrator::last_failure`]
//! until the project's next job starts.
//!
//! ## Failure Semantics
//!
//! - Lookup, content, analysis, design and (non-overridden) selection errors
//!   end the job.
//! - Render and validation errors are per format. The job fails only when no
//!   format survives; otherwise the result is marked `partial`.
//! - Cancellation is checked before every stage and before every renderer.

pub mod lookup;
pub mod metadata;
pub mod progress;
pub mod state;

pub use lookup::{InMemoryProjectLookup, ProjectLookup};
pub use progress::{CancelToken, ProgressSnapshot, ProgressTracker};
pub use state::{StageRecorder, can_transition};

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::sync::watch;
use tracing::{Span, error, info, instrument, warn};

use crate::ai::{ProfileRefiner, refiner_from_config, sample_text};
use crate::analyzer::{Analyzer, ManuscriptAnalysis};
use crate::config::Config;
use crate::constants::render::ARTIFACT_PREFIX;
use crate::design::DesignSynthesizer;
use crate::render::{ArtifactValidator, RenderJob, RendererSet};
use crate::selector::PipelineSelector;
use crate::types::{
    ContentProfile, ErrorRecord, FailedJob, GenerationMetrics, GenerationRequest, GenerationResult,
    OutputFile, OutputFormat, Pipeline, PipelineDecision, PipelineScores, Result, Stage,
    TypecraftError,
};

/// Registry entry for the latest job of a project
#[derive(Debug, Clone)]
struct JobHandle {
    job_id: String,
    progress: ProgressTracker,
    cancel: CancelToken,
    failure: Arc<OnceLock<FailedJob>>,
}

impl JobHandle {
    fn is_running(&self) -> bool {
        !self.progress.snapshot().stage.is_terminal()
    }
}

pub struct Orchestrator {
    config: Arc<Config>,
    lookup: Arc<dyn ProjectLookup>,
    renderers: RendererSet,
    analyzer: Analyzer,
    synthesizer: DesignSynthesizer,
    selector: PipelineSelector,
    validator: ArtifactValidator,
    refiner: Option<Arc<dyn ProfileRefiner>>,
    jobs: DashMap<String, JobHandle>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("renderers", &self.renderers)
            .field("refiner", &self.refiner.as_ref().map(|r| r.name().to_string()))
            .field("jobs", &self.jobs.len())
            .finish()
    }
}

impl Orchestrator {
    /// Build an orchestrator with the renderers and refiner `config` describes
    pub fn new(config: Config, lookup: Arc<dyn ProjectLookup>) -> Result<Self> {
        config.validate()?;
        let refiner = refiner_from_config(&config.llm)?;
        let render = &config.render;
        Ok(Self {
            renderers: RendererSet::from_config(render),
            analyzer: Analyzer::default(),
            synthesizer: DesignSynthesizer::default().with_page_format(render.page_format),
            selector: PipelineSelector::new(config.selector.clone()),
            validator: ArtifactValidator::new(render.pdfinfo_command.clone(), render.timeout()),
            refiner,
            lookup,
            jobs: DashMap::new(),
            config: Arc::new(config),
        })
    }

    pub fn with_renderers(mut self, renderers: RendererSet) -> Self {
        self.renderers = renderers;
        self
    }

    pub fn with_refiner(mut self, refiner: Option<Arc<dyn ProfileRefiner>>) -> Self {
        self.refiner = refiner;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Public Operations
    // =========================================================================

    /// Run one generation job to completion.
    ///
    /// Fatal errors are returned as `Err`; per-format failures that leave at
    /// least one artifact come back inside a `partial` result.
    #[instrument(skip(self, request), fields(project = %request.project_id, job_id = tracing::field::Empty))]
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationResult> {
        let job_id = uuid::Uuid::new_v4().to_string();
        Span::current().record("job_id", job_id.as_str());

        let handle = self.register(&request.project_id, &job_id);
        let mut recorder = StageRecorder::start(handle.progress.clone());
        info!(content = %request.content_path.display(), "Generation started");

        match self.run(&request, &job_id, &handle.cancel, &mut recorder).await {
            Ok(mut result) => {
                result.metrics.total_ms = recorder.total_ms();
                let (stages, trace) = recorder.into_parts();
                result.stages = stages;
                result.trace = trace;
                info!(
                    pipeline = %result.pipeline,
                    outputs = result.output_files.len(),
                    partial = result.partial,
                    total_ms = result.metrics.total_ms,
                    "Generation finished"
                );
                Ok(result)
            }
            Err(e) => {
                let failed_stage = recorder.state();
                recorder.abort(&e);
                if matches!(e, TypecraftError::Cancelled { .. }) {
                    warn!(stage = %failed_stage, "Generation cancelled");
                } else {
                    error!(stage = %failed_stage, kind = %e.kind(), error = %e, "Generation failed");
                }
                let outcome = recorder.state();
                let (stages, trace) = recorder.into_parts();
                let _ = handle.failure.set(FailedJob {
                    job_id,
                    project_id: request.project_id.clone(),
                    outcome,
                    failed_at: failed_stage,
                    error: ErrorRecord::from(&e),
                    stages,
                    trace,
                });
                Err(e)
            }
        }
    }

    /// Current stage and percentage of the latest job for `project_id`
    pub fn get_progress(&self, project_id: &str) -> Result<ProgressSnapshot> {
        self.jobs
            .get(project_id)
            .map(|handle| handle.progress.snapshot())
            .ok_or_else(|| TypecraftError::UnknownJob(project_id.to_string()))
    }

    /// Request cancellation; a job that already finished is left as is
    pub fn cancel_generation(&self, project_id: &str) -> Result<()> {
        let handle = self
            .jobs
            .get(project_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| TypecraftError::UnknownJob(project_id.to_string()))?;
        if handle.is_running() {
            info!(project = project_id, job_id = %handle.job_id, "Cancellation requested");
            handle.cancel.cancel();
        }
        Ok(())
    }

    /// Stage records and trace of the latest job for `project_id`, when that
    /// job failed or was cancelled
    pub fn last_failure(&self, project_id: &str) -> Result<Option<FailedJob>> {
        self.jobs
            .get(project_id)
            .map(|handle| handle.failure.get().cloned())
            .ok_or_else(|| TypecraftError::UnknownJob(project_id.to_string()))
    }

    /// Progress updates for the latest job of `project_id`
    pub fn subscribe(&self, project_id: &str) -> Result<watch::Receiver<ProgressSnapshot>> {
        self.jobs
            .get(project_id)
            .map(|handle| handle.progress.subscribe())
            .ok_or_else(|| TypecraftError::UnknownJob(project_id.to_string()))
    }

    // =========================================================================
    // Job Execution
    // =========================================================================

    fn register(&self, project_id: &str, job_id: &str) -> JobHandle {
        let handle = JobHandle {
            job_id: job_id.to_string(),
            progress: ProgressTracker::new(job_id),
            cancel: CancelToken::new(),
            failure: Arc::new(OnceLock::new()),
        };
        if let Some(previous) = self.jobs.insert(project_id.to_string(), handle.clone())
            && previous.is_running()
        {
            warn!(
                project = project_id,
                superseded = %previous.job_id,
                "Cancelling previous job for this project"
            );
            previous.cancel.cancel();
        }
        handle
    }

    async fn run(
        &self,
        request: &GenerationRequest,
        job_id: &str,
        cancel: &CancelToken,
        recorder: &mut StageRecorder,
    ) -> Result<GenerationResult> {
        let mut metrics = GenerationMetrics::default();

        // ===== INIT =====
        let formats = if request.formats.is_empty() {
            vec![OutputFormat::Pdf]
        } else {
            OutputFormat::parse_list(&request.formats)?
        };
        let mut metadata = self
            .lookup
            .find(&request.project_id)
            .await?
            .ok_or_else(|| TypecraftError::ProjectNotFound(request.project_id.clone()))?;
        checkpoint(recorder, cancel)?;
        recorder.advance(Stage::ContentRead);

        // ===== CONTENT_READ =====
        let text = read_content(&request.content_path).await?;
        let content_bytes = text.len() as u64;
        let content_digest = format!("{:x}", Sha256::digest(text.as_bytes()));
        recorder.trace(format!(
            "read {} bytes from {}",
            content_bytes,
            request.content_path.display()
        ));
        for change in metadata::enhance(&mut metadata, &text) {
            recorder.trace(change);
        }
        checkpoint(recorder, cancel)?;
        recorder.advance(Stage::Analyzing);

        // ===== ANALYZING =====
        let ManuscriptAnalysis {
            mut profile,
            academic,
            ..
        } = self.analyzer.analyze(&text)?;
        if let Some(refiner) = &self.refiner {
            self.refine(refiner.as_ref(), &text, &mut profile, recorder).await;
        }
        profile.validate()?;
        checkpoint(recorder, cancel)?;
        metrics.analysis_ms = recorder.advance(Stage::Designing);

        // ===== DESIGNING =====
        let design = self
            .synthesizer
            .synthesize(&profile, request.custom_design.as_ref())?;
        checkpoint(recorder, cancel)?;
        metrics.design_ms = recorder.advance(Stage::PipelineSelected);

        // ===== PIPELINE_SELECTED =====
        let (pipeline, decision) = match (
            self.selector.select(&profile, &academic),
            request.pipeline_override,
        ) {
            (Ok(decision), None) => (decision.pipeline, decision),
            (Ok(decision), Some(requested)) => {
                if requested != decision.pipeline {
                    recorder.trace(format!(
                        "pipeline {} requested; selector recommended {}",
                        requested, decision.pipeline
                    ));
                }
                (requested, decision)
            }
            (Err(e), Some(requested)) => {
                recorder.trace(format!("selector: {}; using requested {}", e, requested));
                (requested, requested_decision(requested))
            }
            (Err(e), None) => return Err(e),
        };
        info!(
            pipeline = %pipeline,
            confidence = decision.confidence,
            overridden = request.pipeline_override.is_some(),
            "Pipeline chosen"
        );
        checkpoint(recorder, cancel)?;
        metrics.selection_ms = recorder.advance(Stage::Rendering);

        // ===== RENDERING =====
        let output_dir = request
            .output_dir
            .clone()
            .unwrap_or_else(|| self.config.render.output_dir.clone());
        tokio::fs::create_dir_all(&output_dir).await?;
        let stem = artifact_stem(&request.project_id);
        let content: Arc<str> = Arc::from(text);
        let asset_dir = request
            .content_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf);

        let mut rendered: Vec<(OutputFormat, PathBuf)> = Vec::new();
        let mut failures: Vec<(OutputFormat, TypecraftError)> = Vec::new();
        let total = formats.len();
        for (done, format) in formats.iter().copied().enumerate() {
            checkpoint(recorder, cancel)?;
            let renderer = self.renderers.for_target(format, pipeline);
            recorder
                .progress()
                .rendering(done, total, format!("{} via {}", format, renderer.name()));
            let job = RenderJob {
                content: Arc::clone(&content),
                metadata: metadata.clone(),
                design: design.clone(),
                output_path: output_dir.join(format!("{}.{}", stem, format.extension())),
                asset_dir: asset_dir.clone(),
                cancel: cancel.clone(),
                timeout: self.config.render.timeout(),
                typography: self.config.render.typography,
            };
            match renderer.render(&job).await {
                Ok(path) => {
                    info!(format = %format, renderer = renderer.name(), path = %path.display(), "Rendered");
                    rendered.push((format, path));
                }
                Err(TypecraftError::Cancelled { .. }) => return Err(cancelled(recorder)),
                Err(e) => {
                    warn!(format = %format, renderer = renderer.name(), error = %e, "Render failed");
                    recorder.trace(format!("{} render: {}", format, e));
                    failures.push((format, e));
                }
            }
        }
        recorder.progress().rendering(total, total, "rendering finished");
        if rendered.is_empty() {
            return Err(first_failure(failures));
        }
        checkpoint(recorder, cancel)?;
        metrics.render_ms = recorder.advance(Stage::Validating);

        // ===== VALIDATING =====
        let mut output_files: BTreeMap<OutputFormat, OutputFile> = BTreeMap::new();
        for (format, path) in rendered {
            match self.validator.validate(&path, format, cancel).await {
                Ok(file) => {
                    output_files.insert(format, file);
                }
                Err(TypecraftError::Cancelled { .. }) => return Err(cancelled(recorder)),
                Err(e) => {
                    warn!(format = %format, error = %e, "Validation failed");
                    recorder.trace(format!("{} validation: {}", format, e));
                    if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                        warn!(path = %path.display(), error = %remove_err, "Could not remove invalid artifact");
                    }
                    failures.push((format, e));
                }
            }
        }
        if output_files.is_empty() {
            return Err(first_failure(failures));
        }
        metrics.file_size = output_files.values().map(|f| f.size).sum();
        metrics.page_count = output_files
            .get(&OutputFormat::Pdf)
            .and_then(|f| f.page_count);
        metrics.validation_ms = recorder.complete();

        let format_errors: BTreeMap<OutputFormat, ErrorRecord> = failures
            .iter()
            .map(|(format, e)| (*format, ErrorRecord::from(e)))
            .collect();
        let error = failures.first().map(|(_, e)| ErrorRecord::from(e));
        let success = failures.is_empty();

        Ok(GenerationResult {
            job_id: job_id.to_string(),
            project_id: request.project_id.clone(),
            pipeline,
            decision,
            pipeline_overridden: request.pipeline_override.is_some(),
            output_files,
            design_metadata: design,
            content_profile: profile,
            academic_score: academic,
            metrics,
            content_digest,
            content_bytes,
            stages: Vec::new(),
            success,
            partial: !success,
            error,
            format_errors,
            trace: Vec::new(),
        })
    }

    /// Apply refiner adjustments; refinement problems never fail the job
    async fn refine(
        &self,
        refiner: &dyn ProfileRefiner,
        text: &str,
        profile: &mut ContentProfile,
        recorder: &mut StageRecorder,
    ) {
        let sample = sample_text(text, self.config.analysis.sample_size);
        match refiner.refine(sample, profile).await {
            Ok(adjustments) => {
                let changed = adjustments.apply(profile);
                if !changed.is_empty() {
                    recorder.trace(format!("refined by {}: {}", refiner.name(), changed.join(", ")));
                }
            }
            Err(e) => {
                warn!(refiner = refiner.name(), error = %e, "Profile refinement skipped");
                recorder.trace(format!("refinement skipped: {}", e));
            }
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn cancelled(recorder: &StageRecorder) -> TypecraftError {
    TypecraftError::Cancelled {
        last_stage: recorder.last_completed().unwrap_or(Stage::Init).to_string(),
    }
}

fn checkpoint(recorder: &StageRecorder, cancel: &CancelToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(cancelled(recorder));
    }
    Ok(())
}

fn first_failure(failures: Vec<(OutputFormat, TypecraftError)>) -> TypecraftError {
    failures
        .into_iter()
        .next()
        .map(|(_, e)| e)
        .unwrap_or_else(|| TypecraftError::AnalysisFailed("no output format requested".to_string()))
}

/// Manuscript text; whitespace-only files count as empty
async fn read_content(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    let source_name = path.display().to_string();
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(TypecraftError::empty_input(source_name));
    }
    String::from_utf8(bytes).map_err(|e| {
        TypecraftError::AnalysisFailed(format!("{} is not valid UTF-8: {}", source_name, e))
    })
}

/// `project_<id>` with anything unsafe in a file name replaced
fn artifact_stem(project_id: &str) -> String {
    let safe: String = project_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{}{}", ARTIFACT_PREFIX, safe)
}

fn requested_decision(pipeline: Pipeline) -> PipelineDecision {
    PipelineDecision {
        pipeline,
        confidence: 0.0,
        reasons: vec![format!("Pipeline {} requested by caller", pipeline)],
        scores: PipelineScores::default(),
        undecided: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ProfileAdjustments;
    use crate::render::Renderer;
    use crate::types::{
        ErrorKind, FontMood, Genre, PaletteMood, ProjectMetadata, RenderFailureKind,
    };
    use async_trait::async_trait;
    use crate::render::fixtures;
    use std::sync::LazyLock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    static PDF_FIXTURE: LazyLock<Vec<u8>> = LazyLock::new(|| fixtures::pdf_with_pages(1));
    static EPUB_FIXTURE: LazyLock<Vec<u8>> = LazyLock::new(fixtures::epub_archive);

    // -------------------------------------------------------------------------
    // Stub renderers
    // -------------------------------------------------------------------------

    enum Behavior {
        Write(Vec<u8>),
        Fail,
        WaitForCancel,
    }

    struct StubRenderer {
        name: &'static str,
        format: OutputFormat,
        behavior: Behavior,
        calls: AtomicUsize,
        last_metadata: std::sync::Mutex<Option<ProjectMetadata>>,
    }

    impl StubRenderer {
        fn new(name: &'static str, format: OutputFormat, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                name,
                format,
                behavior,
                calls: AtomicUsize::new(0),
                last_metadata: std::sync::Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_metadata(&self) -> Option<ProjectMetadata> {
            self.last_metadata.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Renderer for StubRenderer {
        fn name(&self) -> &str {
            self.name
        }

        fn format(&self) -> OutputFormat {
            self.format
        }

        async fn render(&self, job: &RenderJob) -> Result<PathBuf> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_metadata.lock().unwrap() = Some(job.metadata.clone());
            match &self.behavior {
                Behavior::Write(bytes) => {
                    tokio::fs::write(&job.output_path, bytes).await?;
                    Ok(job.output_path.clone())
                }
                Behavior::Fail => Err(TypecraftError::render(
                    RenderFailureKind::NonZeroExit,
                    self.format,
                    "exit status 1",
                )),
                Behavior::WaitForCancel => {
                    job.cancel.cancelled().await;
                    Err(TypecraftError::Cancelled {
                        last_stage: Stage::Rendering.to_string(),
                    })
                }
            }
        }
    }

    struct Stubs {
        vector: Arc<StubRenderer>,
        web: Arc<StubRenderer>,
        epub: Arc<StubRenderer>,
    }

    impl Stubs {
        fn working() -> Self {
            Self {
                vector: StubRenderer::new("vector", OutputFormat::Pdf, Behavior::Write(PDF_FIXTURE.clone())),
                web: StubRenderer::new("web", OutputFormat::Pdf, Behavior::Write(PDF_FIXTURE.clone())),
                epub: StubRenderer::new("epub", OutputFormat::Epub, Behavior::Write(EPUB_FIXTURE.clone())),
            }
        }

        fn set(&self) -> RendererSet {
            RendererSet::new(self.vector.clone(), self.web.clone(), self.epub.clone())
        }
    }

    // -------------------------------------------------------------------------
    // Fixtures
    // -------------------------------------------------------------------------

    struct Harness {
        dir: TempDir,
        orchestrator: Arc<Orchestrator>,
    }

    impl Harness {
        fn new(stubs: &Stubs) -> Self {
            Self::with_project(stubs, ProjectMetadata::new("7", "Scenario Book").with_author("Ada"))
        }

        fn with_project(stubs: &Stubs, metadata: ProjectMetadata) -> Self {
            let dir = TempDir::new().unwrap();
            let mut config = Config::default();
            config.render.output_dir = dir.path().join("out");
            config.render.pdfinfo_command = None;
            let lookup = InMemoryProjectLookup::new().with_project(metadata);
            let orchestrator = Orchestrator::new(config, Arc::new(lookup))
                .unwrap()
                .with_renderers(stubs.set());
            Self {
                dir,
                orchestrator: Arc::new(orchestrator),
            }
        }

        fn write(&self, name: &str, text: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, text).unwrap();
            path
        }

        fn out(&self) -> PathBuf {
            self.dir.path().join("out")
        }

        async fn generate(&self, text: &str, formats: &[&str]) -> Result<GenerationResult> {
            let path = self.write("book.md", text);
            let request = GenerationRequest::new("7", path).with_formats(formats.iter().copied());
            self.orchestrator.generate(request).await
        }
    }

    fn romance_excerpt() -> String {
        "She felt love in her heart. His kiss was warm and her smile was happy. \
         Their passion grew.\n\n"
            .repeat(85)
    }

    fn technical_article() -> String {
        let mut text = String::from("# Distributed Scheduling\n\n");
        text.push_str(
            &"The distributed system implementation parameterizes the algorithm architecture \
              and the function framework. "
                .repeat(40),
        );
        text.push_str("\n\n");
        for i in 1..=10 {
            text.push_str(&format!("We define $a_{{{i}}} + b_{{{i}}} = c_{{{i}}}$ here.\n"));
        }
        text.push_str("\n```rust\nfn schedule() {}\n```\n\n```rust\nfn dispatch() {}\n```\n");
        text
    }

    fn mystery_opening() -> String {
        "The detective feared the dark crime. The victim lay cold in the blood. \
         However, the suspect had an alibi.\n\n"
            .repeat(30)
    }

    fn academic_paper() -> String {
        let mut text = String::from(
            "# Abstract\n\nThis study examines the correlation between sample size and statistical \
             significance. Furthermore, the results indicate a significant effect.\n\n\
             # Introduction\n\nPrior research (Smith, 2019) and (Jones et al., 2020) suggest the \
             hypothesis is plausible. However, the methodology of earlier work [1] was limited.\n\n\
             # Methodology\n\n",
        );
        text.push_str(
            &"The algorithm processes data through the system function and the analysis method. "
                .repeat(10),
        );
        text.push_str("\n\n");
        for i in 1..=12 {
            text.push_str(&format!("The equation $x_{{{i}}} = y_{{{i}}}^2$ holds.\n"));
        }
        text.push_str(
            "\n# Results\n\nTable 1 and Figure 2 summarize the data.\n\n\
             # Discussion\n\nConsequently the theory is supported. Moreover the findings generalize.\n\n\
             # Conclusion\n\nTherefore the variable matters.\n\n# References\n\n",
        );
        for i in 1..=20 {
            text.push_str(&format!(
                "[{i}] Anderson Fitzgerald, Computational analysis of distributed systems, \
                 International Journal of Applied Mathematics, doi:10.1000/{i}\n"
            ));
        }
        text
    }

    fn picture_book() -> String {
        (1..=25)
            .map(|i| {
                format!(
                    "Hey, look at the cool puppy! Wow, okay, the puppy can run.\n\n\
                     ![puppy {i}](puppy_{i}.png)\n\n"
                )
            })
            .collect()
    }

    async fn wait_for_stage(orchestrator: &Orchestrator, project: &str, stage: Stage) {
        for _ in 0..500 {
            if let Ok(snapshot) = orchestrator.get_progress(project)
                && snapshot.stage == stage
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job never reached {}", stage);
    }

    // -------------------------------------------------------------------------
    // End-to-end scenarios
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_romance_excerpt_goes_web() {
        let stubs = Stubs::working();
        let harness = Harness::new(&stubs);
        let result = harness.generate(&romance_excerpt(), &["pdf"]).await.unwrap();

        assert!(result.success);
        assert_eq!(result.pipeline, Pipeline::Web);
        assert_eq!(result.content_profile.primary_genre, Genre::Romance);
        assert!(result.content_profile.sentiment > 0.3);
        assert!(matches!(
            result.design_metadata.fonts.mood,
            FontMood::Classic | FontMood::Romantic
        ));
        assert!(matches!(
            result.design_metadata.palette.mood,
            PaletteMood::Bright | PaletteMood::Vibrant
        ));
        assert_eq!(stubs.web.calls(), 1);
        assert_eq!(stubs.vector.calls(), 0);
    }

    #[tokio::test]
    async fn test_technical_article_goes_vector() {
        let stubs = Stubs::working();
        let harness = Harness::new(&stubs);
        let result = harness.generate(&technical_article(), &["pdf"]).await.unwrap();

        assert_eq!(result.pipeline, Pipeline::Vector);
        assert!(result.decision.confidence > 0.5);
        assert!(result.content_profile.has_math);
        assert_eq!(result.content_profile.stats.code_block_count, 2);
        assert!(result.design_metadata.fonts.monospace.is_some());
        assert_eq!(stubs.vector.calls(), 1);
    }

    #[tokio::test]
    async fn test_mystery_opening_is_dark() {
        let stubs = Stubs::working();
        let harness = Harness::new(&stubs);
        let result = harness.generate(&mystery_opening(), &["pdf"]).await.unwrap();

        assert_eq!(result.content_profile.primary_genre, Genre::Mystery);
        assert!(result.content_profile.sentiment < -0.2);
        assert_eq!(result.design_metadata.palette.primary_hue, 260.0);
        assert_eq!(result.design_metadata.palette.mood, PaletteMood::Dark);
        assert_eq!(result.pipeline, Pipeline::Web);
    }

    #[tokio::test]
    async fn test_academic_paper_goes_vector() {
        let stubs = Stubs::working();
        let harness = Harness::new(&stubs);
        let result = harness.generate(&academic_paper(), &["pdf"]).await.unwrap();

        assert!(result.academic_score.confidence >= 0.6);
        assert!(result.academic_score.has_abstract);
        assert!(result.academic_score.has_bibliography);
        assert_eq!(result.pipeline, Pipeline::Vector);
        assert_eq!(result.design_metadata.palette.text, "#000000");
        assert_eq!(result.design_metadata.palette.background, "#FFFFFF");
    }

    #[tokio::test]
    async fn test_picture_book_goes_web() {
        let stubs = Stubs::working();
        let harness = Harness::new(&stubs);
        let result = harness.generate(&picture_book(), &["pdf"]).await.unwrap();

        assert_eq!(result.content_profile.stats.image_count, 25);
        assert!(result.content_profile.has_rich_media);
        assert_eq!(result.pipeline, Pipeline::Web);
    }

    #[tokio::test]
    async fn test_empty_file_produces_nothing() {
        let stubs = Stubs::working();
        let harness = Harness::new(&stubs);
        let err = harness.generate("", &["pdf", "epub"]).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::EmptyInput);
        let outputs = std::fs::read_dir(harness.out())
            .map(|entries| entries.count())
            .unwrap_or(0);
        assert_eq!(outputs, 0);
        assert_eq!(stubs.web.calls() + stubs.epub.calls(), 0);
        let progress = harness.orchestrator.get_progress("7").unwrap();
        assert_eq!(progress.stage, Stage::Failed);
    }

    // -------------------------------------------------------------------------
    // Result contents
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_result_metrics_and_stages() {
        let stubs = Stubs::working();
        let harness = Harness::new(&stubs);
        let text = romance_excerpt();
        let result = harness.generate(&text, &["pdf", "epub"]).await.unwrap();

        assert!(result.success && !result.partial);
        assert!(result.error.is_none());
        assert_eq!(result.output_files.len(), 2);
        let pdf = &result.output_files[&OutputFormat::Pdf];
        assert_eq!(pdf.path, harness.out().join("project_7.pdf"));
        assert!(pdf.path.exists());
        assert_eq!(pdf.page_count, Some(1));
        assert!(harness.out().join("project_7.epub").exists());

        assert_eq!(
            result.metrics.file_size,
            (PDF_FIXTURE.len() + EPUB_FIXTURE.len()) as u64
        );
        assert_eq!(result.metrics.page_count, Some(1));
        let stage_sum: u64 = result.stages.iter().map(|s| s.duration_ms).sum();
        assert!(result.metrics.total_ms >= stage_sum);

        let order: Vec<Stage> = result.stages.iter().map(|s| s.stage).collect();
        assert_eq!(order.first(), Some(&Stage::Init));
        assert_eq!(order.last(), Some(&Stage::Completed));
        assert!(order.windows(2).all(|w| w[0] < w[1]));
        assert!(result.stages.iter().all(|s| s.ok && s.end >= s.start));
        assert!(harness.orchestrator.last_failure("7").unwrap().is_none());

        assert_eq!(result.content_bytes, text.len() as u64);
        assert_eq!(result.content_digest.len(), 64);
        assert!(!result.job_id.is_empty());

        let progress = harness.orchestrator.get_progress("7").unwrap();
        assert_eq!(progress.stage, Stage::Completed);
        assert_eq!(progress.percent, 100);
        assert_eq!(progress.job_id, result.job_id);
    }

    #[tokio::test]
    async fn test_same_text_same_digest_and_design() {
        let stubs = Stubs::working();
        let harness = Harness::new(&stubs);
        let first = harness.generate(&mystery_opening(), &["epub"]).await.unwrap();
        let second = harness.generate(&mystery_opening(), &["epub"]).await.unwrap();
        assert_eq!(first.content_digest, second.content_digest);
        assert_eq!(first.design_metadata, second.design_metadata);
        assert_eq!(first.decision, second.decision);
        assert_ne!(first.job_id, second.job_id);
    }

    #[tokio::test]
    async fn test_override_keeps_recommendation() {
        let stubs = Stubs::working();
        let harness = Harness::new(&stubs);
        let path = harness.write("book.md", &romance_excerpt());
        let request = GenerationRequest::new("7", path).with_pipeline(Pipeline::Vector);
        let result = harness.orchestrator.generate(request).await.unwrap();

        assert_eq!(result.pipeline, Pipeline::Vector);
        assert!(result.pipeline_overridden);
        assert_eq!(result.decision.pipeline, Pipeline::Web);
        assert_eq!(stubs.vector.calls(), 1);
        assert_eq!(stubs.web.calls(), 0);
        assert!(result.trace.iter().any(|line| line.contains("requested")));
    }

    #[test]
    fn test_requested_decision_is_well_formed() {
        let decision = requested_decision(Pipeline::Vector);
        assert_eq!(decision.pipeline, Pipeline::Vector);
        assert_eq!(decision.confidence, 0.0);
        assert_eq!(decision.reasons, vec!["Pipeline vector requested by caller"]);
    }

    #[test]
    fn test_artifact_stem_sanitizes() {
        assert_eq!(artifact_stem("42"), "project_42");
        assert_eq!(artifact_stem("../etc/passwd"), "project____etc_passwd");
        assert_eq!(artifact_stem("my-book_2"), "project_my-book_2");
    }

    // -------------------------------------------------------------------------
    // Failures
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_one_format_failing_is_partial() {
        let mut stubs = Stubs::working();
        stubs.epub = StubRenderer::new("epub", OutputFormat::Epub, Behavior::Fail);
        let harness = Harness::new(&stubs);
        let result = harness
            .generate(&romance_excerpt(), &["pdf", "epub"])
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.partial);
        assert_eq!(result.output_files.len(), 1);
        assert!(result.output_files.contains_key(&OutputFormat::Pdf));
        assert_eq!(
            result.format_errors[&OutputFormat::Epub].kind,
            ErrorKind::RenderFailed
        );
        assert_eq!(result.error.as_ref().unwrap().kind, ErrorKind::RenderFailed);
        assert!(result.trace.iter().any(|line| line.starts_with("epub render")));
    }

    #[tokio::test]
    async fn test_every_format_failing_fails_job() {
        let mut stubs = Stubs::working();
        stubs.web = StubRenderer::new("web", OutputFormat::Pdf, Behavior::Fail);
        stubs.epub = StubRenderer::new("epub", OutputFormat::Epub, Behavior::Fail);
        let harness = Harness::new(&stubs);
        let err = harness
            .generate(&romance_excerpt(), &["pdf", "epub"])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TypecraftError::RenderFailed {
                format: OutputFormat::Pdf,
                kind: RenderFailureKind::NonZeroExit,
                ..
            }
        ));
        assert_eq!(stubs.epub.calls(), 1);
        let progress = harness.orchestrator.get_progress("7").unwrap();
        assert_eq!(progress.stage, Stage::Failed);
    }

    #[tokio::test]
    async fn test_failed_job_keeps_stages_and_trace() {
        let mut stubs = Stubs::working();
        stubs.web = StubRenderer::new("web", OutputFormat::Pdf, Behavior::Fail);
        stubs.epub = StubRenderer::new("epub", OutputFormat::Epub, Behavior::Fail);
        let harness = Harness::new(&stubs);
        harness
            .generate(&romance_excerpt(), &["pdf", "epub"])
            .await
            .unwrap_err();

        let failed = harness.orchestrator.last_failure("7").unwrap().unwrap();
        assert_eq!(failed.project_id, "7");
        assert_eq!(failed.outcome, Stage::Failed);
        assert_eq!(failed.failed_at, Stage::Rendering);
        assert_eq!(failed.error.kind, ErrorKind::RenderFailed);
        assert_eq!(failed.job_id, harness.orchestrator.get_progress("7").unwrap().job_id);

        let order: Vec<Stage> = failed.stages.iter().map(|s| s.stage).collect();
        assert_eq!(
            order,
            vec![
                Stage::Init,
                Stage::ContentRead,
                Stage::Analyzing,
                Stage::Designing,
                Stage::PipelineSelected,
                Stage::Rendering,
                Stage::Failed,
            ]
        );
        let rendering = &failed.stages[5];
        assert!(!rendering.ok);
        assert_eq!(rendering.error.as_ref().map(|e| e.kind), Some(ErrorKind::RenderFailed));
        assert!(failed.stages[..5].iter().all(|s| s.ok));

        assert!(failed.trace.iter().any(|line| line.starts_with("pdf render:")));
        assert!(failed.trace.iter().any(|line| line.starts_with("epub render:")));
        assert!(failed.trace.last().unwrap().starts_with(&Stage::Rendering.to_string()));

        // the next job replaces the record
        harness.generate(&romance_excerpt(), &["docx"]).await.unwrap_err();
        let failed = harness.orchestrator.last_failure("7").unwrap().unwrap();
        assert_eq!(failed.failed_at, Stage::Init);
        assert_eq!(failed.error.kind, ErrorKind::UnsupportedFormat);
        assert_eq!(failed.stages.len(), 2);
    }

    #[tokio::test]
    async fn test_metadata_cleaned_before_rendering() {
        let stubs = Stubs::working();
        let metadata = ProjectMetadata::new("7", "  Um   Livro ").with_language("");
        let harness = Harness::with_project(&stubs, metadata);
        let text = "O menino e a menina correm para o parque da cidade, \
                    e os cães do vizinho seguem em silêncio as crianças de casa.\n\n"
            .repeat(20);
        let result = harness.generate(&text, &["epub"]).await.unwrap();

        let seen = stubs.epub.last_metadata().unwrap();
        assert_eq!(seen.title, "Um Livro");
        assert_eq!(seen.language, "pt");
        assert!(result.trace.iter().any(|line| line == "language: detected pt"));

        // the registered project itself is left alone
        let again = harness.generate(&text, &["epub"]).await.unwrap();
        assert!(again.trace.iter().any(|line| line == "language: detected pt"));
    }

    #[tokio::test]
    async fn test_invalid_artifact_removed() {
        let mut stubs = Stubs::working();
        stubs.web = StubRenderer::new("web", OutputFormat::Pdf, Behavior::Write(b"<html></html>".to_vec()));
        let harness = Harness::new(&stubs);
        let err = harness.generate(&romance_excerpt(), &["pdf"]).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        assert!(!harness.out().join("project_7.pdf").exists());
    }

    #[tokio::test]
    async fn test_unknown_project() {
        let stubs = Stubs::working();
        let harness = Harness::new(&stubs);
        let path = harness.write("book.md", &romance_excerpt());
        let err = harness
            .orchestrator
            .generate(GenerationRequest::new("404", path))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProjectNotFound);
    }

    #[tokio::test]
    async fn test_unsupported_format_rejected_before_rendering() {
        let stubs = Stubs::working();
        let harness = Harness::new(&stubs);
        let err = harness
            .generate(&romance_excerpt(), &["pdf", "docx"])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        assert_eq!(stubs.web.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_analysis_failure() {
        let stubs = Stubs::working();
        let harness = Harness::new(&stubs);
        let path = harness.dir.path().join("binary.md");
        std::fs::write(&path, [0xff, 0xfe, 0x41]).unwrap();
        let err = harness
            .orchestrator
            .generate(GenerationRequest::new("7", path))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AnalysisFailed);
    }

    // -------------------------------------------------------------------------
    // Registry and cancellation
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_unknown_job() {
        let stubs = Stubs::working();
        let harness = Harness::new(&stubs);
        assert_eq!(
            harness.orchestrator.get_progress("7").unwrap_err().kind(),
            ErrorKind::UnknownJob
        );
        assert_eq!(
            harness.orchestrator.cancel_generation("7").unwrap_err().kind(),
            ErrorKind::UnknownJob
        );
        assert!(harness.orchestrator.subscribe("7").is_err());
        assert_eq!(
            harness.orchestrator.last_failure("7").unwrap_err().kind(),
            ErrorKind::UnknownJob
        );
    }

    #[tokio::test]
    async fn test_cancel_during_rendering() {
        let mut stubs = Stubs::working();
        stubs.web = StubRenderer::new("web", OutputFormat::Pdf, Behavior::WaitForCancel);
        let harness = Harness::new(&stubs);
        let path = harness.write("book.md", &romance_excerpt());

        let orchestrator = Arc::clone(&harness.orchestrator);
        let job = tokio::spawn(async move {
            orchestrator
                .generate(GenerationRequest::new("7", path).with_formats(["pdf", "epub"]))
                .await
        });

        wait_for_stage(&harness.orchestrator, "7", Stage::Rendering).await;
        harness.orchestrator.cancel_generation("7").unwrap();

        let err = job.await.unwrap().unwrap_err();
        match err {
            TypecraftError::Cancelled { last_stage } => {
                assert_eq!(last_stage, Stage::PipelineSelected.to_string());
            }
            other => panic!("expected cancellation, got {other}"),
        }
        assert_eq!(stubs.epub.calls(), 0);
        let progress = harness.orchestrator.get_progress("7").unwrap();
        assert_eq!(progress.stage, Stage::Cancelled);
        let failed = harness.orchestrator.last_failure("7").unwrap().unwrap();
        assert_eq!(failed.outcome, Stage::Cancelled);
        assert_eq!(failed.stages.last().map(|s| s.stage), Some(Stage::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_after_completion_is_noop() {
        let stubs = Stubs::working();
        let harness = Harness::new(&stubs);
        harness.generate(&romance_excerpt(), &["pdf"]).await.unwrap();
        harness.orchestrator.cancel_generation("7").unwrap();
        assert_eq!(
            harness.orchestrator.get_progress("7").unwrap().stage,
            Stage::Completed
        );
    }

    #[tokio::test]
    async fn test_subscribe_sees_completion() {
        let stubs = Stubs::working();
        let harness = Harness::new(&stubs);
        harness.generate(&romance_excerpt(), &["pdf"]).await.unwrap();
        let rx = harness.orchestrator.subscribe("7").unwrap();
        assert_eq!(rx.borrow().percent, 100);
    }

    // -------------------------------------------------------------------------
    // Refinement
    // -------------------------------------------------------------------------

    struct FixedRefiner(Option<ProfileAdjustments>);

    #[async_trait]
    impl ProfileRefiner for FixedRefiner {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn refine(
            &self,
            _sample: &str,
            _profile: &ContentProfile,
        ) -> Result<ProfileAdjustments> {
            self.0
                .clone()
                .ok_or_else(|| TypecraftError::Llm("401 unauthorized".to_string()))
        }
    }

    #[tokio::test]
    async fn test_refinement_feeds_design() {
        let stubs = Stubs::working();
        let mut harness = Harness::new(&stubs);
        let adjustments = ProfileAdjustments {
            sentiment: Some(-0.9),
            ..Default::default()
        };
        let orchestrator = Arc::into_inner(harness.orchestrator).unwrap();
        harness.orchestrator = Arc::new(
            orchestrator.with_refiner(Some(Arc::new(FixedRefiner(Some(adjustments))))),
        );

        let result = harness.generate(&romance_excerpt(), &["pdf"]).await.unwrap();
        assert_eq!(result.content_profile.sentiment, -0.9);
        assert_eq!(result.design_metadata.palette.mood, PaletteMood::Dark);
        assert!(result.trace.iter().any(|line| line.contains("refined by fixed")));
    }

    #[tokio::test]
    async fn test_refinement_failure_is_not_fatal() {
        let stubs = Stubs::working();
        let mut harness = Harness::new(&stubs);
        let orchestrator = Arc::into_inner(harness.orchestrator).unwrap();
        harness.orchestrator =
            Arc::new(orchestrator.with_refiner(Some(Arc::new(FixedRefiner(None)))));

        let result = harness.generate(&romance_excerpt(), &["pdf"]).await.unwrap();
        assert!(result.success);
        assert!(result.trace.iter().any(|line| line.contains("refinement skipped")));
    }
}
