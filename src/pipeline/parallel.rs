//! Parallel Phase Executor
//!
//! Two tiers of concurrency:
//!
//! ```text
//! outer (2) ──┬── analysis phase ── inner (W) ── analyze(file) x N
//!             └── documentation phase ── generate_docs(all files)
//! ```
//!
//! Neither phase observes the other. Per-file analysis failures are recorded
//! through [`GracefulDegradation`]; a documentation failure is replaced by a
//! placeholder. Once both phases join, the session is checkpointed with the
//! merged analyses as the resume anchor.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::collab::{SharedAnalyzer, SharedDocumenter, SourceFile};
use crate::constants::pool::DEFAULT_MAX_WORKERS;
use crate::resilience::{BatchOutcome, GracefulDegradation};
use crate::session::{PartialResults, SessionStore};
use crate::types::{Documentation, FailedItem, FileAnalysis, Result, ReviewError};

/// Everything one parallel pass works on
#[derive(Debug, Clone)]
pub struct PhaseInput {
    pub session_id: String,
    pub root: PathBuf,
    /// Files to analyze in this pass
    pub files: Vec<SourceFile>,
    /// Earlier analyses kept unless a fresh one shares their path
    pub carried: Vec<FileAnalysis>,
    /// Read failures of this pass, kept in the failure summary
    pub read_failures: Vec<FailedItem>,
}

#[derive(Debug, Clone)]
pub struct PhaseOutput {
    /// Carried and fresh analyses merged by path
    pub analyses: Vec<FileAnalysis>,
    /// Analyses produced in this pass
    pub fresh_count: usize,
    pub analysis_failures: Vec<FailedItem>,
    pub documentation: Documentation,
    /// Whether the post-join checkpoint was written
    pub checkpointed: bool,
}

impl PhaseOutput {
    /// Read and analysis failures together
    pub fn all_failures(&self, read_failures: &[FailedItem]) -> Vec<FailedItem> {
        read_failures
            .iter()
            .chain(&self.analysis_failures)
            .cloned()
            .collect()
    }
}

pub struct ParallelPhaseExecutor {
    analyzer: SharedAnalyzer,
    documenter: SharedDocumenter,
    store: Arc<SessionStore>,
    max_workers: usize,
}

impl ParallelPhaseExecutor {
    pub fn new(
        analyzer: SharedAnalyzer,
        documenter: SharedDocumenter,
        store: Arc<SessionStore>,
    ) -> Self {
        Self {
            analyzer,
            documenter,
            store,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Run both phases, join, then checkpoint
    pub async fn execute(&self, input: PhaseInput) -> Result<PhaseOutput> {
        let PhaseInput {
            session_id,
            root,
            files,
            carried,
            read_failures,
        } = input;

        let files: Arc<[SourceFile]> = files.into();
        info!(
            "Parallel phase: {} files, {} workers",
            files.len(),
            self.max_workers
        );

        let analysis = tokio::spawn(analyze_all(
            self.analyzer.clone(),
            files.clone(),
            self.max_workers,
        ));
        let documentation = tokio::spawn({
            let documenter = self.documenter.clone();
            let files = files.clone();
            async move { documenter.generate_docs(&root, &files).await }
        });

        let (analysis, documentation) = tokio::join!(analysis, documentation);

        let outcome = analysis??;
        let documentation = match documentation {
            Ok(Ok(docs)) => docs,
            Ok(Err(e)) => {
                warn!("Documentation phase failed, using placeholder: {}", e);
                Documentation::placeholder()
            }
            Err(e) => {
                warn!("Documentation task aborted, using placeholder: {}", e);
                Documentation::placeholder()
            }
        };

        let fresh_count = outcome.successes.len();
        let analysis_failures = outcome.failures.clone();
        let analyses = merge_analyses(carried, outcome.into_values());

        let failures: Vec<FailedItem> = read_failures
            .iter()
            .chain(&analysis_failures)
            .cloned()
            .collect();
        let checkpointed = self
            .checkpoint(&session_id, &analyses, failures)
            .await;

        Ok(PhaseOutput {
            analyses,
            fresh_count,
            analysis_failures,
            documentation,
            checkpointed,
        })
    }

    /// Processed := every analyzed path, pending := every failed path.
    /// A write failure is logged and reported as `false`.
    async fn checkpoint(
        &self,
        session_id: &str,
        analyses: &[FileAnalysis],
        failures: Vec<FailedItem>,
    ) -> bool {
        let processed: Vec<String> = analyses.iter().map(|a| a.file_path.clone()).collect();
        let processed_set: HashSet<&str> = processed.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();
        let pending: Vec<String> = failures
            .iter()
            .map(|f| f.item_id.clone())
            .filter(|p| !processed_set.contains(p.as_str()) && seen.insert(p.clone()))
            .collect();

        let partial = PartialResults::new()
            .with_analyses(analyses.to_vec())
            .with_failures(failures);

        match self
            .store
            .checkpoint(session_id, processed, pending, partial)
            .await
        {
            Ok(written) => written,
            Err(e) => {
                warn!("Checkpoint for session {} failed: {}", session_id, e);
                false
            }
        }
    }
}

/// Fan out over the inner pool; results are keyed by path, not completion order
async fn analyze_all(
    analyzer: SharedAnalyzer,
    files: Arc<[SourceFile]>,
    max_workers: usize,
) -> Result<BatchOutcome<FileAnalysis>> {
    let mut degradation = GracefulDegradation::continuing("file analysis");

    let mut results = futures::stream::iter(0..files.len())
        .map(|index| {
            let analyzer = analyzer.clone();
            let files = files.clone();
            let path = files[index].path.clone();
            async move {
                let task = tokio::spawn(async move {
                    let file = &files[index];
                    analyzer.analyze(&file.path, &file.content).await
                });
                let result = match task.await {
                    Ok(result) => result,
                    Err(e) => Err(ReviewError::analysis(&path, format!("analysis task failed: {}", e))),
                };
                (path, result)
            }
        })
        .buffer_unordered(max_workers);

    while let Some((path, result)) = results.next().await {
        degradation.record(path, result)?;
    }

    degradation.log_summary();
    Ok(degradation.into_outcome())
}

/// Carried analyses overlaid with fresh ones by path, sorted by path
pub fn merge_analyses(carried: Vec<FileAnalysis>, fresh: Vec<FileAnalysis>) -> Vec<FileAnalysis> {
    let mut merged: BTreeMap<String, FileAnalysis> = carried
        .into_iter()
        .map(|a| (a.file_path.clone(), a))
        .collect();
    for analysis in fresh {
        if merged.contains_key(&analysis.file_path) {
            debug!("Replacing cached analysis of {}", analysis.file_path);
        }
        merged.insert(analysis.file_path.clone(), analysis);
    }
    merged.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    use crate::collab::{Analyzer, Documenter};
    use crate::types::{AnalysisConfig, CodeMetrics};

    fn analysis(path: &str, loc: usize) -> FileAnalysis {
        FileAnalysis {
            file_path: path.to_string(),
            language: "python".to_string(),
            metrics: CodeMetrics {
                cyclomatic_complexity: 1,
                maintainability_index: 90.0,
                lines_of_code: loc,
                comment_ratio: 0.0,
            },
            issues: vec![],
            functions: vec![],
            classes: vec![],
        }
    }

    /// Fails on paths containing "bad"; tracks peak concurrency
    #[derive(Default)]
    struct TrackingAnalyzer {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Analyzer for TrackingAnalyzer {
        async fn analyze(&self, path: &str, content: &str) -> Result<FileAnalysis> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            if path.contains("bad") {
                return Err(ReviewError::analysis(path, "unparseable"));
            }
            Ok(analysis(path, content.lines().count()))
        }
    }

    struct FailingDocumenter;

    #[async_trait]
    impl Documenter for FailingDocumenter {
        async fn generate_docs(&self, _root: &Path, _files: &[SourceFile]) -> Result<Documentation> {
            Err(ReviewError::Internal("template missing".into()))
        }
    }

    struct CountingDocumenter(AtomicUsize);

    #[async_trait]
    impl Documenter for CountingDocumenter {
        async fn generate_docs(&self, _root: &Path, files: &[SourceFile]) -> Result<Documentation> {
            self.0.fetch_add(files.len(), Ordering::SeqCst);
            Ok(Documentation {
                project_structure: format!("{} files", files.len()),
                ..Default::default()
            })
        }
    }

    async fn session(store: &SessionStore, files: &[SourceFile]) -> String {
        let pending = files.iter().map(|f| f.path.clone()).collect();
        store
            .create_session("phase-test", AnalysisConfig::new("/repo"), pending)
            .await
            .unwrap();
        "phase-test".to_string()
    }

    fn sources(names: &[&str]) -> Vec<SourceFile> {
        names
            .iter()
            .map(|n| SourceFile::new(format!("/repo/{}", n), "x = 1\ny = 2\n"))
            .collect()
    }

    #[tokio::test]
    async fn test_failures_isolated_and_checkpointed() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SessionStore::new(dir.path()));
        let files = sources(&["a.py", "bad.py", "c.py"]);
        let session_id = session(&store, &files).await;

        let documenter = Arc::new(CountingDocumenter(AtomicUsize::new(0)));
        let executor = ParallelPhaseExecutor::new(
            Arc::new(TrackingAnalyzer::default()),
            documenter.clone(),
            store.clone(),
        );

        let output = executor
            .execute(PhaseInput {
                session_id: session_id.clone(),
                root: PathBuf::from("/repo"),
                files,
                carried: vec![],
                read_failures: vec![],
            })
            .await
            .unwrap();

        assert_eq!(output.fresh_count, 2);
        assert_eq!(output.analysis_failures.len(), 1);
        assert_eq!(output.analysis_failures[0].item_id, "/repo/bad.py");
        // Documentation saw every file, including the one analysis rejected
        assert_eq!(documenter.0.load(Ordering::SeqCst), 3);
        assert!(output.checkpointed);

        let state = store.load(&session_id).await.unwrap();
        assert_eq!(state.processed_files, vec!["/repo/a.py", "/repo/c.py"]);
        assert_eq!(state.pending_files, vec!["/repo/bad.py"]);
        assert_eq!(state.partial_results.analyses().len(), 2);
        assert_eq!(state.partial_results.failures().len(), 1);
    }

    #[tokio::test]
    async fn test_documentation_failure_uses_placeholder() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SessionStore::new(dir.path()));
        let files = sources(&["a.py"]);
        let session_id = session(&store, &files).await;

        let executor = ParallelPhaseExecutor::new(
            Arc::new(TrackingAnalyzer::default()),
            Arc::new(FailingDocumenter),
            store,
        );
        let output = executor
            .execute(PhaseInput {
                session_id,
                root: PathBuf::from("/repo"),
                files,
                carried: vec![],
                read_failures: vec![],
            })
            .await
            .unwrap();

        assert_eq!(output.analyses.len(), 1);
        assert_eq!(output.documentation, Documentation::placeholder());
    }

    #[tokio::test]
    async fn test_inner_pool_is_bounded() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SessionStore::new(dir.path()));
        let names: Vec<String> = (0..12).map(|i| format!("f{}.py", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let files = sources(&refs);
        let session_id = session(&store, &files).await;

        let analyzer = Arc::new(TrackingAnalyzer::default());
        let executor = ParallelPhaseExecutor::new(
            analyzer.clone(),
            Arc::new(CountingDocumenter(AtomicUsize::new(0))),
            store,
        )
        .with_max_workers(3);

        let output = executor
            .execute(PhaseInput {
                session_id,
                root: PathBuf::from("/repo"),
                files,
                carried: vec![],
                read_failures: vec![],
            })
            .await
            .unwrap();

        assert_eq!(output.fresh_count, 12);
        assert!(analyzer.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_missing_session_checkpoint_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let executor = ParallelPhaseExecutor::new(
            Arc::new(TrackingAnalyzer::default()),
            Arc::new(CountingDocumenter(AtomicUsize::new(0))),
            Arc::new(SessionStore::new(dir.path())),
        );

        let output = executor
            .execute(PhaseInput {
                session_id: "never-created".into(),
                root: PathBuf::from("/repo"),
                files: sources(&["a.py"]),
                carried: vec![],
                read_failures: vec![],
            })
            .await
            .unwrap();

        assert!(!output.checkpointed);
        assert_eq!(output.analyses.len(), 1);
    }

    #[test]
    fn test_merge_prefers_fresh_entries() {
        let carried = vec![analysis("/r/a.py", 1), analysis("/r/b.py", 1)];
        let fresh = vec![analysis("/r/b.py", 7), analysis("/r/c.py", 3)];

        let merged = merge_analyses(carried, fresh);
        let summary: Vec<(&str, usize)> = merged
            .iter()
            .map(|a| (a.file_path.as_str(), a.metrics.lines_of_code))
            .collect();
        assert_eq!(summary, vec![("/r/a.py", 1), ("/r/b.py", 7), ("/r/c.py", 3)]);
    }
}
