//! Analysis Orchestrator
//!
//! Drives one run through its phases:
//!
//! ```text
//! Initializing → Discovering → ReadingFiles → ParallelAnalyzeDocument
//!              → Reviewing → Aggregating → Completed | Failed
//! ```
//!
//! A resumed run enters at `ChangeDetection` instead of `Discovering` and
//! re-processes only pending and changed files, carrying the checkpointed
//! analyses of everything else.
//!
//! Failure policy:
//! - per-file read and analysis failures are recorded, never raised
//! - a batch with zero successes raises `PartialFailure`
//! - documentation, review, scoring, summary, pattern persistence and trend
//!   recording degrade to defaults
//! - anything else fails the session and propagates
//!
//! Pausing is cooperative. The stored status is checked before each phase;
//! a paused session stops the run with `ReviewError::Paused` and keeps its
//! status.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::parallel::{ParallelPhaseExecutor, PhaseInput};
use crate::collab::{Collaborators, SourceFile, infer_patterns};
use crate::config::Config;
use crate::constants::quality::{EMPTY_SCORE, FALLBACK_SCORE};
use crate::resilience::{
    GracefulDegradation, RetryPolicy, validate_file_patterns, validate_session_id,
    validate_target_dir,
};
use crate::session::{ChangeDetector, PartialResults, SessionState, SessionStatus, SessionStore};
use crate::types::{
    AnalysisConfig, AnalysisResult, Documentation, FailedItem, FileAnalysis, MetricsSummary,
    PartialFailureError, ProjectPattern, QualityComparison, QualityTrend, Result, ReviewError,
};

/// Phases of one run, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Initializing,
    Discovering,
    ChangeDetection,
    ReadingFiles,
    ParallelAnalyzeDocument,
    Reviewing,
    Aggregating,
    Completed,
    Failed,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Discovering => "discovering",
            Self::ChangeDetection => "change_detection",
            Self::ReadingFiles => "reading_files",
            Self::ParallelAnalyzeDocument => "parallel_analyze_document",
            Self::Reviewing => "reviewing",
            Self::Aggregating => "aggregating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-run options
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Generated when absent
    pub session_id: Option<String>,
    /// Defaults to the target directory name
    pub project_id: Option<String>,
    /// Only analyze files changed between the configured refs
    pub pr_mode: bool,
}

impl RunOptions {
    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn with_project_id(mut self, id: impl Into<String>) -> Self {
        self.project_id = Some(id.into());
        self
    }

    pub fn with_pr_mode(mut self, pr_mode: bool) -> Self {
        self.pr_mode = pr_mode;
        self
    }
}

/// Work shared by fresh and resumed runs
struct RunScope {
    session_id: String,
    project_id: String,
    root: PathBuf,
    files: Vec<String>,
    carried: Vec<FileAnalysis>,
}

pub struct AnalysisOrchestrator {
    store: Arc<SessionStore>,
    collab: Collaborators,
    executor: ParallelPhaseExecutor,
    detector: ChangeDetector,
    retry: RetryPolicy,
    max_workers: usize,
    min_confidence: f64,
    base_ref: String,
    head_ref: String,
}

impl AnalysisOrchestrator {
    pub fn new(store: Arc<SessionStore>, collab: Collaborators, config: &Config) -> Self {
        let executor = ParallelPhaseExecutor::new(
            collab.analyzer.clone(),
            collab.documenter.clone(),
            store.clone(),
        )
        .with_max_workers(config.pool.max_workers);

        Self {
            store,
            collab,
            executor,
            detector: ChangeDetector::new(),
            retry: RetryPolicy::from(&config.retry),
            max_workers: config.pool.max_workers.max(1),
            min_confidence: config.patterns.min_confidence,
            base_ref: config.pr.base_ref.clone(),
            head_ref: config.pr.head_ref.clone(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_change_detector(mut self, detector: ChangeDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    // =========================================================================
    // Entry Points
    // =========================================================================

    /// Analyze a codebase from scratch
    #[instrument(skip_all, fields(target = %config.target_path.display()))]
    pub async fn run(&self, config: AnalysisConfig, options: RunOptions) -> Result<AnalysisResult> {
        debug!("Phase: {}", RunPhase::Initializing);
        let root = validate_target_dir(&config.target_path)?;
        let file_patterns = validate_file_patterns(&config.file_patterns)?;
        let session_id = match options.session_id {
            Some(id) => validate_session_id(&id)?,
            None => Uuid::new_v4().to_string(),
        };
        let project_id = options.project_id.unwrap_or_else(|| project_name(&root));

        let config = AnalysisConfig {
            target_path: root.clone(),
            file_patterns,
            ..config
        };

        debug!("Phase: {}", RunPhase::Discovering);
        let files = self.discover(&root, &config, options.pr_mode).await?;
        info!("Discovered {} files for session {}", files.len(), session_id);

        self.store
            .create_session(&session_id, config, files.clone())
            .await?;

        let scope = RunScope {
            session_id,
            project_id,
            root,
            files,
            carried: Vec::new(),
        };
        self.guarded(scope).await
    }

    /// Record file timestamps, then mark the session paused.
    /// `false` unless the session exists and is running.
    #[instrument(skip(self))]
    pub async fn pause(&self, session_id: &str) -> Result<bool> {
        let Some(state) = self.store.load(session_id).await else {
            return Ok(false);
        };
        if state.status != SessionStatus::Running {
            debug!("Session {} is {}, not pausing", session_id, state.status);
            return Ok(false);
        }

        let tracked: Vec<&String> = state
            .processed_files
            .iter()
            .chain(&state.pending_files)
            .collect();
        let snapshot = self.detector.snapshot(tracked).await;

        self.store
            .checkpoint(
                session_id,
                state.processed_files.clone(),
                state.pending_files.clone(),
                PartialResults::new().with_mtimes(snapshot),
            )
            .await?;
        self.store.pause(session_id).await
    }

    /// Continue a paused session, re-analyzing pending and changed files
    #[instrument(skip(self, project_id))]
    pub async fn resume(
        &self,
        session_id: &str,
        project_id: Option<String>,
    ) -> Result<AnalysisResult> {
        let session_id = validate_session_id(session_id)?;
        let Some(state) = self.store.resume(&session_id).await? else {
            return Err(match self.store.load(&session_id).await {
                None => ReviewError::NotFound(format!("session {}", session_id)),
                Some(state) => ReviewError::Session(format!(
                    "session {} is {}, only paused sessions can resume",
                    session_id, state.status
                )),
            });
        };

        debug!("Phase: {}", RunPhase::ChangeDetection);
        let scope = match self.plan_resume(state, project_id).await {
            Ok(scope) => scope,
            Err(e) => return Err(self.fail_session(&session_id, e).await),
        };
        self.guarded(scope).await
    }

    pub async fn status(&self, session_id: &str) -> Option<SessionState> {
        self.store.load(session_id).await
    }

    pub async fn list_sessions(&self, status: Option<SessionStatus>) -> Result<Vec<SessionState>> {
        self.store.list(status).await
    }

    /// Recorded runs of a project, oldest first
    pub async fn quality_trends(
        &self,
        project_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<QualityTrend>> {
        self.collab.trends.trends(project_id, limit).await
    }

    /// `current` against the run recorded before it.
    ///
    /// Completed runs record themselves, so the previous run is the second
    /// most recent entry. `None` without one.
    pub async fn quality_comparison(
        &self,
        current: &AnalysisResult,
    ) -> Result<Option<QualityComparison>> {
        let recent = self.collab.trends.trends(&current.project_id, Some(2)).await?;
        if recent.len() < 2 {
            return Ok(None);
        }
        Ok(Some(QualityComparison::between(
            &recent[0],
            &QualityTrend::from(current),
        )))
    }

    // =========================================================================
    // Phases
    // =========================================================================

    async fn discover(&self, root: &Path, config: &AnalysisConfig, pr_mode: bool) -> Result<Vec<String>> {
        if pr_mode {
            match self
                .collab
                .git
                .changed_files(root, &self.base_ref, &self.head_ref, &config.file_patterns)
                .await
            {
                Ok(files) => {
                    info!(
                        "PR mode: {} files changed between {} and {}",
                        files.len(),
                        self.base_ref,
                        self.head_ref
                    );
                    return Ok(files);
                }
                Err(e) => warn!("PR mode unavailable, falling back to full discovery: {}", e),
            }
        }

        self.collab
            .discoverer
            .discover(root, &config.file_patterns, &config.exclude_patterns)
            .await
    }

    /// Move changed files back to pending and persist the new split
    async fn plan_resume(&self, state: SessionState, project_id: Option<String>) -> Result<RunScope> {
        let root = validate_target_dir(&state.config.target_path)?;

        let changed = match state.partial_results.mtimes() {
            Some(snapshot) => {
                self.detector
                    .detect_changes(snapshot, &state.processed_files)
                    .await
            }
            None => {
                debug!("No pause snapshot for session {}", state.session_id);
                Vec::new()
            }
        };
        info!(
            "Session {}: {} changed during pause, {} pending",
            state.session_id,
            changed.len(),
            state.pending_files.len()
        );

        let changed_set: HashSet<&str> = changed.iter().map(String::as_str).collect();
        let processed: Vec<String> = state
            .processed_files
            .iter()
            .filter(|f| !changed_set.contains(f.as_str()))
            .cloned()
            .collect();

        let mut seen = HashSet::new();
        let files: Vec<String> = state
            .pending_files
            .iter()
            .chain(&changed)
            .filter(|f| seen.insert(f.as_str()))
            .cloned()
            .collect();

        if !changed.is_empty()
            && let Err(e) = self
                .store
                .checkpoint(
                    &state.session_id,
                    processed,
                    files.clone(),
                    PartialResults::new(),
                )
                .await
        {
            warn!("Failed to persist resume plan for {}: {}", state.session_id, e);
        }

        let rerun: HashSet<&str> = files.iter().map(String::as_str).collect();
        let carried = state
            .partial_results
            .analyses()
            .iter()
            .filter(|a| !rerun.contains(a.file_path.as_str()))
            .cloned()
            .collect();

        Ok(RunScope {
            session_id: state.session_id,
            project_id: project_id.unwrap_or_else(|| project_name(&root)),
            root,
            files,
            carried,
        })
    }

    /// Run the scope; on error fail the session unless it was paused
    async fn guarded(&self, scope: RunScope) -> Result<AnalysisResult> {
        let session_id = scope.session_id.clone();
        match self.process(scope).await {
            Ok(result) => Ok(result),
            Err(e @ ReviewError::Paused(_)) => {
                info!("Session {} paused, stopping run", session_id);
                Err(e)
            }
            Err(e) => Err(self.fail_session(&session_id, e).await),
        }
    }

    async fn fail_session(&self, session_id: &str, err: ReviewError) -> ReviewError {
        warn!("Session {} failed: {}", session_id, err);
        debug!("Phase: {}", RunPhase::Failed);
        if let Err(store_err) = self.store.fail(session_id).await {
            warn!("Could not mark session {} failed: {}", session_id, store_err);
        }
        err
    }

    async fn process(&self, scope: RunScope) -> Result<AnalysisResult> {
        let RunScope {
            session_id,
            project_id,
            root,
            files,
            carried,
        } = scope;

        if files.is_empty() && carried.is_empty() {
            info!("Nothing to analyze for session {}", session_id);
            self.store.complete(&session_id).await?;
            debug!("Phase: {}", RunPhase::Completed);
            return Ok(empty_result(&session_id, &project_id, &root));
        }

        let patterns = self.retrieve_patterns(&project_id).await;

        if files.is_empty() {
            info!(
                "Session {}: nothing changed, reusing {} cached analyses",
                session_id,
                carried.len()
            );
            return self
                .finalize(
                    &session_id,
                    &project_id,
                    &root,
                    carried,
                    Documentation::default(),
                    &patterns,
                    Vec::new(),
                )
                .await;
        }

        self.ensure_running(&session_id, RunPhase::ReadingFiles).await?;
        let (sources, read_failures) = self.read_files(&files).await;
        if sources.is_empty() {
            return Err(PartialFailureError::new(
                "All file reads failed",
                Vec::new(),
                read_failures,
            )
            .into());
        }

        self.ensure_running(&session_id, RunPhase::ParallelAnalyzeDocument)
            .await?;
        let output = self
            .executor
            .execute(PhaseInput {
                session_id: session_id.clone(),
                root: root.clone(),
                files: sources,
                carried,
                read_failures: read_failures.clone(),
            })
            .await?;

        let failed_files = output.all_failures(&read_failures);
        if output.analyses.is_empty() {
            return Err(PartialFailureError::new(
                "No files were successfully analyzed",
                Vec::new(),
                failed_files,
            )
            .into());
        }

        self.ensure_running(&session_id, RunPhase::Reviewing).await?;
        self.finalize(
            &session_id,
            &project_id,
            &root,
            output.analyses,
            output.documentation,
            &patterns,
            failed_files,
        )
        .await
    }

    /// Stop before `phase` if the session was paused in the meantime
    async fn ensure_running(&self, session_id: &str, phase: RunPhase) -> Result<()> {
        if let Some(state) = self.store.load(session_id).await
            && state.status == SessionStatus::Paused
        {
            info!("Session {} paused before {}", session_id, phase);
            return Err(ReviewError::Paused(session_id.to_string()));
        }
        debug!("Phase: {}", phase);
        Ok(())
    }

    /// Retried on transient errors; exhausted retries degrade to no patterns
    async fn retrieve_patterns(&self, project_id: &str) -> Vec<ProjectPattern> {
        let store = self.collab.patterns.clone();
        let min_confidence = self.min_confidence;
        let result = self
            .retry
            .run("pattern retrieval", || {
                let store = store.clone();
                async move { store.retrieve_patterns(project_id, min_confidence).await }
            })
            .await;

        match result {
            Ok(patterns) => {
                debug!("Retrieved {} patterns for {}", patterns.len(), project_id);
                patterns
            }
            Err(e) => {
                warn!("Pattern retrieval failed, continuing without patterns: {}", e);
                Vec::new()
            }
        }
    }

    /// Concurrent reads; each failure is isolated to its file
    async fn read_files(&self, files: &[String]) -> (Vec<SourceFile>, Vec<FailedItem>) {
        let mut degradation = GracefulDegradation::continuing("file reading");
        let reader = &self.collab.reader;

        let mut reads = futures::stream::iter(files)
            .map(|path| async move { (path, reader.read(path).await) })
            .buffer_unordered(self.max_workers);

        while let Some((path, result)) = reads.next().await {
            // Never raises with continue-on-error
            let _ = degradation.record(path.clone(), result);
        }
        degradation.log_summary();

        let outcome = degradation.into_outcome();
        let sources = outcome
            .successes
            .into_iter()
            .map(|(path, content)| SourceFile::new(path, content))
            .collect();
        (sources, outcome.failures)
    }

    #[allow(clippy::too_many_arguments)]
    async fn finalize(
        &self,
        session_id: &str,
        project_id: &str,
        root: &Path,
        analyses: Vec<FileAnalysis>,
        documentation: Documentation,
        patterns: &[ProjectPattern],
        failed_files: Vec<FailedItem>,
    ) -> Result<AnalysisResult> {
        let suggestions = match self.collab.reviewer.review(&analyses, patterns).await {
            Ok(suggestions) => suggestions,
            Err(e) => {
                warn!("Review failed, continuing without suggestions: {}", e);
                Vec::new()
            }
        };

        debug!("Phase: {}", RunPhase::Aggregating);
        let quality_score = self.collab.scorer.score(&analyses).unwrap_or_else(|e| {
            warn!("Quality scoring failed, using {}: {}", FALLBACK_SCORE, e);
            FALLBACK_SCORE
        });
        let metrics_summary = self.collab.summarizer.summarize(&analyses).unwrap_or_else(|e| {
            warn!("Metrics summary failed, using counts only: {}", e);
            MetricsSummary {
                total_files: analyses.len(),
                ..Default::default()
            }
        });

        self.store_patterns(project_id, &analyses, patterns).await;

        self.store.complete(session_id).await?;
        debug!("Phase: {}", RunPhase::Completed);

        let result = AnalysisResult {
            session_id: session_id.to_string(),
            project_id: project_id.to_string(),
            timestamp: Utc::now(),
            codebase_path: root.to_string_lossy().to_string(),
            files_analyzed: analyses.len(),
            total_issues: analyses.iter().map(|a| a.issues.len()).sum(),
            quality_score,
            file_analyses: analyses,
            suggestions,
            documentation,
            metrics_summary,
            failed_files,
        };
        info!(
            "Session {} complete: {} files, {} issues, quality {:.1}",
            session_id, result.files_analyzed, result.total_issues, result.quality_score
        );

        if let Err(e) = self
            .collab
            .trends
            .record_trend(project_id, &QualityTrend::from(&result))
            .await
        {
            warn!("Failed to record quality trend for {}: {}", project_id, e);
        }
        Ok(result)
    }

    /// Best effort; failures are logged
    async fn store_patterns(
        &self,
        project_id: &str,
        analyses: &[FileAnalysis],
        existing: &[ProjectPattern],
    ) {
        for pattern in infer_patterns(project_id, analyses, existing) {
            match self.collab.patterns.store_pattern(&pattern).await {
                Ok(()) => info!("Learned pattern {}", pattern.pattern_id),
                Err(e) => warn!("Failed to store pattern {}: {}", pattern.pattern_id, e),
            }
        }
    }
}

fn project_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "project".to_string())
}

fn empty_result(session_id: &str, project_id: &str, root: &Path) -> AnalysisResult {
    AnalysisResult {
        session_id: session_id.to_string(),
        project_id: project_id.to_string(),
        timestamp: Utc::now(),
        codebase_path: root.to_string_lossy().to_string(),
        files_analyzed: 0,
        total_issues: 0,
        quality_score: EMPTY_SCORE,
        file_analyses: Vec::new(),
        suggestions: Vec::new(),
        documentation: Documentation::default(),
        metrics_summary: MetricsSummary::empty(),
        failed_files: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    use crate::collab::{
        Analyzer, ChangedFiles, Documenter, FileReader, FsReader, HeuristicAnalyzer,
        MemoryPatternStore, MetricsSummarizer, OutlineDocumenter, PatternStore, QualityScorer,
        Reviewer, RuleReviewer, Summarizer, WeightedQualityScorer,
    };
    use crate::types::{CodeMetrics, ErrorClass, Suggestion};

    /// Wraps the local collaborators, counting calls and injecting failures
    #[derive(Default)]
    struct Stub {
        calls: AtomicUsize,
        analyzed: Mutex<Vec<String>>,
        unreadable_marker: Option<&'static str>,
        pause_on_read: Option<(Arc<SessionStore>, String)>,
        pause_fired: AtomicBool,
        fail_docs: bool,
        fail_review: bool,
        fail_score: bool,
        fail_patterns: bool,
        patterns: MemoryPatternStore,
    }

    impl Stub {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn hit(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }

        fn analyzed(&self) -> Vec<String> {
            let mut paths = self.analyzed.lock().unwrap().clone();
            paths.sort();
            paths
        }
    }

    #[async_trait]
    impl FileReader for Stub {
        async fn read(&self, path: &str) -> Result<String> {
            self.hit();
            if let Some((store, id)) = &self.pause_on_read
                && !self.pause_fired.swap(true, Ordering::SeqCst)
            {
                store.pause(id).await?;
            }
            if let Some(marker) = self.unreadable_marker
                && path.contains(marker)
            {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "permission denied",
                )
                .into());
            }
            FsReader.read(path).await
        }
    }

    #[async_trait]
    impl Analyzer for Stub {
        async fn analyze(&self, path: &str, content: &str) -> Result<FileAnalysis> {
            self.hit();
            self.analyzed.lock().unwrap().push(path.to_string());
            HeuristicAnalyzer::new().analyze_source(path, content)
        }
    }

    #[async_trait]
    impl Documenter for Stub {
        async fn generate_docs(&self, root: &Path, files: &[SourceFile]) -> Result<Documentation> {
            self.hit();
            if self.fail_docs {
                return Err(ReviewError::Internal("renderer crashed".into()));
            }
            OutlineDocumenter::new().generate_docs(root, files).await
        }
    }

    #[async_trait]
    impl Reviewer for Stub {
        async fn review(
            &self,
            analyses: &[FileAnalysis],
            patterns: &[ProjectPattern],
        ) -> Result<Vec<Suggestion>> {
            self.hit();
            if self.fail_review {
                return Err(ReviewError::Transient("model unavailable".into()));
            }
            RuleReviewer::new().review(analyses, patterns).await
        }
    }

    #[async_trait]
    impl PatternStore for Stub {
        async fn retrieve_patterns(
            &self,
            project_id: &str,
            min_confidence: f64,
        ) -> Result<Vec<ProjectPattern>> {
            self.hit();
            if self.fail_patterns {
                return Err(ReviewError::Transient("pattern store offline".into()));
            }
            self.patterns.retrieve_patterns(project_id, min_confidence).await
        }

        async fn store_pattern(&self, pattern: &ProjectPattern) -> Result<()> {
            self.hit();
            self.patterns.store_pattern(pattern).await
        }
    }

    impl QualityScorer for Stub {
        fn score(&self, analyses: &[FileAnalysis]) -> Result<f64> {
            self.hit();
            if self.fail_score {
                return Err(ReviewError::Permanent("division by zero".into()));
            }
            WeightedQualityScorer.score(analyses)
        }
    }

    impl Summarizer for Stub {
        fn summarize(&self, analyses: &[FileAnalysis]) -> Result<MetricsSummary> {
            self.hit();
            MetricsSummarizer.summarize(analyses)
        }
    }

    struct NoRepository;

    #[async_trait]
    impl ChangedFiles for NoRepository {
        async fn changed_files(
            &self,
            root: &Path,
            _base_ref: &str,
            _head_ref: &str,
            _patterns: &[String],
        ) -> Result<Vec<String>> {
            Err(ReviewError::Git(format!("Not a Git repository: {}", root.display())))
        }
    }

    struct Fixture {
        _sessions: TempDir,
        project: TempDir,
        store: Arc<SessionStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let sessions = TempDir::new().unwrap();
            let store = Arc::new(SessionStore::new(sessions.path()));
            Self {
                _sessions: sessions,
                project: TempDir::new().unwrap(),
                store,
            }
        }

        fn write(&self, name: &str, content: &str) -> String {
            let path = self.project.path().join(name);
            std::fs::write(&path, content).unwrap();
            path.canonicalize().unwrap().to_string_lossy().to_string()
        }

        fn write_sources(&self, count: usize) -> Vec<String> {
            (0..count)
                .map(|i| {
                    self.write(
                        &format!("module_{}.py", i),
                        &format!("def load_{}(path):\n    return path\n", i),
                    )
                })
                .collect()
        }

        fn orchestrator(&self, stub: &Arc<Stub>) -> AnalysisOrchestrator {
            let collab = Collaborators::in_memory()
                .with_reader(stub.clone())
                .with_analyzer(stub.clone())
                .with_documenter(stub.clone())
                .with_reviewer(stub.clone())
                .with_patterns(stub.clone())
                .with_scorer(stub.clone())
                .with_summarizer(stub.clone())
                .with_git(Arc::new(NoRepository));
            AnalysisOrchestrator::new(self.store.clone(), collab, &Config::default())
                .with_retry_policy(
                    RetryPolicy::new(2)
                        .with_initial_delay(Duration::from_millis(1))
                        .with_max_delay(Duration::from_millis(2)),
                )
        }

        fn config(&self) -> AnalysisConfig {
            AnalysisConfig::new(self.project.path())
        }
    }

    fn age(path: &str, secs: u64) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(secs))
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_directory_makes_no_collaborator_calls() {
        let fx = Fixture::new();
        let stub = Arc::new(Stub::default());

        let result = fx
            .orchestrator(&stub)
            .run(fx.config(), RunOptions::default().with_session_id("empty"))
            .await
            .unwrap();

        assert_eq!(result.files_analyzed, 0);
        assert_eq!(result.quality_score, 100.0);
        assert!(result.suggestions.is_empty());
        assert_eq!(stub.calls(), 0);
        assert_eq!(
            fx.store.load("empty").await.unwrap().status,
            SessionStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_unreadable_file_is_recorded_not_raised() {
        let fx = Fixture::new();
        fx.write_sources(4);
        let locked = fx.write("locked.py", "def secret():\n    pass\n");
        let stub = Arc::new(Stub {
            unreadable_marker: Some("locked"),
            ..Default::default()
        });

        let result = fx
            .orchestrator(&stub)
            .run(fx.config(), RunOptions::default().with_session_id("one-bad"))
            .await
            .unwrap();

        assert_eq!(result.files_analyzed, 4);
        assert_eq!(result.failed_files.len(), 1);
        assert_eq!(result.failed_files[0].item_id, locked);
        assert_eq!(result.failed_files[0].class, ErrorClass::Transient);
        assert_eq!(stub.analyzed().len(), 4);

        let state = fx.store.load("one-bad").await.unwrap();
        assert_eq!(state.status, SessionStatus::Completed);
        assert_eq!(state.processed_files.len(), 4);
        assert_eq!(state.pending_files, vec![locked]);
    }

    #[tokio::test]
    async fn test_all_reads_failing_raises_partial_failure() {
        let fx = Fixture::new();
        for i in 0..5 {
            fx.write(&format!("locked_{}.py", i), "x = 1\n");
        }
        let stub = Arc::new(Stub {
            unreadable_marker: Some("locked"),
            ..Default::default()
        });

        let err = fx
            .orchestrator(&stub)
            .run(fx.config(), RunOptions::default().with_session_id("all-bad"))
            .await
            .unwrap_err();

        let partial = err.as_partial_failure().expect("partial failure");
        assert_eq!(partial.failed_items.len(), 5);
        assert!(partial.successful_items.is_empty());
        assert_eq!(
            fx.store.load("all-bad").await.unwrap().status,
            SessionStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_unsupported_files_only_raise_partial_failure() {
        let fx = Fixture::new();
        fx.write("notes.py.txt", "plain");
        let stub = Arc::new(Stub::default());
        let config = fx.config().with_file_patterns(vec!["*.txt".to_string()]);

        let err = fx
            .orchestrator(&stub)
            .run(config, RunOptions::default().with_session_id("unsupported"))
            .await
            .unwrap_err();

        let partial = err.as_partial_failure().expect("partial failure");
        assert_eq!(partial.failed_items.len(), 1);
        assert_eq!(partial.failed_items[0].class, ErrorClass::Permanent);
    }

    #[tokio::test]
    async fn test_resume_reanalyzes_only_changed_and_pending() {
        let fx = Fixture::new();
        let files = fx.write_sources(5);
        for file in &files {
            age(file, 3600);
        }

        // Two files processed before the pause, three still pending
        let cached: Vec<FileAnalysis> = files[..2]
            .iter()
            .map(|path| FileAnalysis {
                file_path: path.clone(),
                language: "python".to_string(),
                metrics: CodeMetrics {
                    cyclomatic_complexity: 1,
                    maintainability_index: 77.0,
                    lines_of_code: 999,
                    comment_ratio: 0.0,
                },
                issues: vec![],
                functions: vec![],
                classes: vec![],
            })
            .collect();
        fx.store
            .create_session("paused-run", fx.config(), files.clone())
            .await
            .unwrap();
        fx.store
            .checkpoint(
                "paused-run",
                files[..2].to_vec(),
                files[2..].to_vec(),
                PartialResults::new().with_analyses(cached),
            )
            .await
            .unwrap();

        let stub = Arc::new(Stub::default());
        let orchestrator = fx.orchestrator(&stub);
        assert!(orchestrator.pause("paused-run").await.unwrap());
        assert!(!orchestrator.pause("paused-run").await.unwrap());

        // Edit the first processed file during the pause
        std::fs::write(&files[0], "def load_0(path, mode):\n    return path\n").unwrap();

        let result = orchestrator.resume("paused-run", None).await.unwrap();

        let mut expected: Vec<String> = vec![files[0].clone()];
        expected.extend(files[2..].iter().cloned());
        expected.sort();
        assert_eq!(stub.analyzed(), expected);
        assert_eq!(result.files_analyzed, 5);

        let carried = result
            .file_analyses
            .iter()
            .find(|a| a.file_path == files[1])
            .unwrap();
        assert_eq!(carried.metrics.lines_of_code, 999);
        let refreshed = result
            .file_analyses
            .iter()
            .find(|a| a.file_path == files[0])
            .unwrap();
        assert_ne!(refreshed.metrics.lines_of_code, 999);

        let state = fx.store.load("paused-run").await.unwrap();
        assert_eq!(state.status, SessionStatus::Completed);
        assert_eq!(state.processed_files.len(), 5);
        assert!(state.pending_files.is_empty());
    }

    #[tokio::test]
    async fn test_resume_without_changes_reuses_cache() {
        let fx = Fixture::new();
        let stub = Arc::new(Stub::default());
        let orchestrator = fx.orchestrator(&stub);
        fx.write_sources(2);

        orchestrator
            .run(fx.config(), RunOptions::default().with_session_id("done"))
            .await
            .unwrap();
        let analyzed_before = stub.analyzed().len();

        // Completed sessions cannot resume
        let err = orchestrator.resume("done", None).await.unwrap_err();
        assert!(matches!(err, ReviewError::Session(_)));

        // Force it back to running, then pause and resume untouched
        let mut state = fx.store.load("done").await.unwrap();
        state.status = SessionStatus::Running;
        fx.store.save(&state).await.unwrap();
        assert!(orchestrator.pause("done").await.unwrap());

        let result = orchestrator.resume("done", None).await.unwrap();
        assert_eq!(result.files_analyzed, 2);
        assert_eq!(stub.analyzed().len(), analyzed_before);
    }

    #[tokio::test]
    async fn test_pause_mid_run_stops_before_next_phase() {
        let fx = Fixture::new();
        fx.write_sources(3);
        let stub = Arc::new(Stub {
            pause_on_read: Some((fx.store.clone(), "mid-run".to_string())),
            ..Default::default()
        });

        let err = fx
            .orchestrator(&stub)
            .run(fx.config(), RunOptions::default().with_session_id("mid-run"))
            .await
            .unwrap_err();

        assert!(matches!(err, ReviewError::Paused(_)));
        assert!(stub.analyzed().is_empty());
        let state = fx.store.load("mid-run").await.unwrap();
        assert_eq!(state.status, SessionStatus::Paused);

        // Resume with a plain reader picks up every pending file
        let resumed = Arc::new(Stub::default());
        let result = fx
            .orchestrator(&resumed)
            .resume("mid-run", None)
            .await
            .unwrap();
        assert_eq!(result.files_analyzed, 3);
        assert_eq!(resumed.analyzed().len(), 3);
    }

    #[tokio::test]
    async fn test_pr_mode_falls_back_to_full_discovery() {
        let fx = Fixture::new();
        fx.write_sources(2);
        let stub = Arc::new(Stub::default());

        let result = fx
            .orchestrator(&stub)
            .run(fx.config(), RunOptions::default().with_pr_mode(true))
            .await
            .unwrap();

        assert_eq!(result.files_analyzed, 2);
    }

    #[tokio::test]
    async fn test_phase_failures_degrade_to_defaults() {
        let fx = Fixture::new();
        fx.write_sources(3);
        let stub = Arc::new(Stub {
            fail_docs: true,
            fail_review: true,
            fail_score: true,
            fail_patterns: true,
            ..Default::default()
        });

        let result = fx
            .orchestrator(&stub)
            .run(fx.config(), RunOptions::default().with_session_id("degraded"))
            .await
            .unwrap();

        assert_eq!(result.files_analyzed, 3);
        assert_eq!(result.documentation, Documentation::placeholder());
        assert!(result.suggestions.is_empty());
        assert_eq!(result.quality_score, FALLBACK_SCORE);
        assert_eq!(result.metrics_summary.total_files, 3);
    }

    #[tokio::test]
    async fn test_learns_patterns_for_next_run() {
        let fx = Fixture::new();
        fx.write_sources(4);
        let stub = Arc::new(Stub::default());

        fx.orchestrator(&stub)
            .run(
                fx.config(),
                RunOptions::default().with_project_id("shop"),
            )
            .await
            .unwrap();

        let learned = stub.patterns.retrieve_patterns("shop", 0.5).await.unwrap();
        assert_eq!(learned.len(), 1);
        assert_eq!(learned[0].pattern_id, "shop_function_snake_case");
    }

    #[tokio::test]
    async fn test_quality_history_compares_with_previous_run() {
        let fx = Fixture::new();
        fx.write_sources(2);
        let stub = Arc::new(Stub::default());
        let orchestrator = fx.orchestrator(&stub);
        let options = || RunOptions::default().with_project_id("shop");

        let first = orchestrator.run(fx.config(), options()).await.unwrap();
        assert_eq!(first.project_id, "shop");
        assert!(orchestrator.quality_comparison(&first).await.unwrap().is_none());

        fx.write(
            "queries.py",
            "def find_user(cursor, name):\n    cursor.execute(\"SELECT * FROM users WHERE name = '\" + name + \"'\")\n",
        );
        let second = orchestrator.run(fx.config(), options()).await.unwrap();

        let history = orchestrator.quality_trends("shop", None).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].files_analyzed, 3);

        let comparison = orchestrator
            .quality_comparison(&second)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(comparison.previous_score, first.quality_score);
        assert_eq!(comparison.current_score, second.quality_score);
        assert_eq!(
            comparison.issues_delta,
            second.total_issues as i64 - first.total_issues as i64
        );
    }

    struct BrokenTrends;

    #[async_trait]
    impl crate::collab::TrendStore for BrokenTrends {
        async fn record_trend(&self, _project_id: &str, _trend: &QualityTrend) -> Result<()> {
            Err(ReviewError::Storage("disk full".into()))
        }

        async fn trends(&self, _project_id: &str, _limit: Option<usize>) -> Result<Vec<QualityTrend>> {
            Err(ReviewError::Storage("disk full".into()))
        }
    }

    #[tokio::test]
    async fn test_trend_recording_failure_does_not_fail_run() {
        let fx = Fixture::new();
        fx.write_sources(1);
        let collab = Collaborators::in_memory().with_trends(Arc::new(BrokenTrends));
        let orchestrator = AnalysisOrchestrator::new(fx.store.clone(), collab, &Config::default());

        let result = orchestrator
            .run(fx.config(), RunOptions::default().with_session_id("no-history"))
            .await
            .unwrap();

        assert_eq!(result.files_analyzed, 1);
        assert_eq!(
            fx.store.load("no-history").await.unwrap().status,
            SessionStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_invalid_inputs_fail_fast() {
        let fx = Fixture::new();
        let stub = Arc::new(Stub::default());
        let orchestrator = fx.orchestrator(&stub);

        let missing = AnalysisConfig::new(fx.project.path().join("absent"));
        assert!(matches!(
            orchestrator.run(missing, RunOptions::default()).await,
            Err(ReviewError::Validation(_))
        ));

        let bad_id = RunOptions::default().with_session_id("../escape");
        assert!(matches!(
            orchestrator.run(fx.config(), bad_id).await,
            Err(ReviewError::Validation(_))
        ));

        assert!(matches!(
            orchestrator.resume("unknown", None).await,
            Err(ReviewError::NotFound(_))
        ));
        assert_eq!(stub.calls(), 0);
    }
}
