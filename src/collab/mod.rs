//! Collaborator Contracts
//!
//! The orchestrator never parses code, writes docs or talks to git itself.
//! It calls the collaborators below, injected as shared trait objects.
//! Local implementations are provided so the engine runs end-to-end:
//!
//! - `fs`: ignore-aware discovery and file reading
//! - `analyzer`: regex heuristics for metrics and issues
//! - `documenter`: outline documentation from signatures
//! - `reviewer`: rule-based suggestions with priority scoring
//! - `metrics`: quality score and summary calculators
//! - `git`: changed files between two refs
//! - `patterns`: naming-convention inference and an in-memory pattern store
//! - `trends`: in-memory quality history

pub mod analyzer;
pub mod documenter;
pub mod fs;
pub mod git;
pub mod metrics;
pub mod patterns;
pub mod reviewer;
pub mod trends;

pub use analyzer::{HeuristicAnalyzer, Language};
pub use documenter::OutlineDocumenter;
pub use fs::{FsDiscoverer, FsReader};
pub use git::GitChangedFiles;
pub use metrics::{MetricsSummarizer, WeightedQualityScorer};
pub use patterns::{MemoryPatternStore, infer_patterns};
pub use reviewer::RuleReviewer;
pub use trends::MemoryTrendStore;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::types::{
    Documentation, FileAnalysis, MetricsSummary, ProjectPattern, QualityTrend, Result, Suggestion,
};

/// A file path with its content, shared by both parallel phases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

// =============================================================================
// Contracts
// =============================================================================

/// `discoverFiles(root, include, exclude) -> []path`; errors on an invalid root
#[async_trait]
pub trait Discoverer: Send + Sync {
    async fn discover(
        &self,
        root: &Path,
        include: &[String],
        exclude: &[String],
    ) -> Result<Vec<String>>;
}

#[async_trait]
pub trait FileReader: Send + Sync {
    async fn read(&self, path: &str) -> Result<String>;
}

/// Per-file analysis; an `Err` marks unparseable or unsupported input
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, path: &str, content: &str) -> Result<FileAnalysis>;
}

/// Documentation for the whole file set as one unit
#[async_trait]
pub trait Documenter: Send + Sync {
    async fn generate_docs(&self, root: &Path, files: &[SourceFile]) -> Result<Documentation>;
}

/// Ordered suggestions from the aggregate analyses
#[async_trait]
pub trait Reviewer: Send + Sync {
    async fn review(
        &self,
        analyses: &[FileAnalysis],
        patterns: &[ProjectPattern],
    ) -> Result<Vec<Suggestion>>;
}

#[async_trait]
pub trait PatternStore: Send + Sync {
    async fn retrieve_patterns(
        &self,
        project_id: &str,
        min_confidence: f64,
    ) -> Result<Vec<ProjectPattern>>;

    async fn store_pattern(&self, pattern: &ProjectPattern) -> Result<()>;
}

/// Per-project history of completed runs
#[async_trait]
pub trait TrendStore: Send + Sync {
    async fn record_trend(&self, project_id: &str, trend: &QualityTrend) -> Result<()>;

    /// Oldest first; `limit` keeps only the most recent entries
    async fn trends(&self, project_id: &str, limit: Option<usize>) -> Result<Vec<QualityTrend>>;
}

/// Quality score in `[0, 100]`
pub trait QualityScorer: Send + Sync {
    fn score(&self, analyses: &[FileAnalysis]) -> Result<f64>;
}

pub trait Summarizer: Send + Sync {
    fn summarize(&self, analyses: &[FileAnalysis]) -> Result<MetricsSummary>;
}

/// Files changed between two refs; errors outside a repository
#[async_trait]
pub trait ChangedFiles: Send + Sync {
    async fn changed_files(
        &self,
        root: &Path,
        base_ref: &str,
        head_ref: &str,
        patterns: &[String],
    ) -> Result<Vec<String>>;
}

// =============================================================================
// Injection Bundle
// =============================================================================

pub type SharedDiscoverer = Arc<dyn Discoverer>;
pub type SharedReader = Arc<dyn FileReader>;
pub type SharedAnalyzer = Arc<dyn Analyzer>;
pub type SharedDocumenter = Arc<dyn Documenter>;
pub type SharedReviewer = Arc<dyn Reviewer>;
pub type SharedPatternStore = Arc<dyn PatternStore>;
pub type SharedScorer = Arc<dyn QualityScorer>;
pub type SharedSummarizer = Arc<dyn Summarizer>;
pub type SharedChangedFiles = Arc<dyn ChangedFiles>;
pub type SharedTrendStore = Arc<dyn TrendStore>;

/// Every collaborator the orchestrator calls
#[derive(Clone)]
pub struct Collaborators {
    pub discoverer: SharedDiscoverer,
    pub reader: SharedReader,
    pub analyzer: SharedAnalyzer,
    pub documenter: SharedDocumenter,
    pub reviewer: SharedReviewer,
    pub patterns: SharedPatternStore,
    pub scorer: SharedScorer,
    pub summarizer: SharedSummarizer,
    pub git: SharedChangedFiles,
    pub trends: SharedTrendStore,
}

impl Collaborators {
    /// Local implementations with the given pattern store and in-memory trends
    pub fn local(patterns: SharedPatternStore) -> Self {
        Self {
            discoverer: Arc::new(FsDiscoverer::new()),
            reader: Arc::new(FsReader),
            analyzer: Arc::new(HeuristicAnalyzer::new()),
            documenter: Arc::new(OutlineDocumenter::new()),
            reviewer: Arc::new(RuleReviewer::new()),
            patterns,
            scorer: Arc::new(WeightedQualityScorer),
            summarizer: Arc::new(MetricsSummarizer),
            git: Arc::new(GitChangedFiles),
            trends: Arc::new(MemoryTrendStore::new()),
        }
    }

    /// Local implementations with an in-memory pattern store
    pub fn in_memory() -> Self {
        Self::local(Arc::new(MemoryPatternStore::new()))
    }

    pub fn with_discoverer(mut self, discoverer: SharedDiscoverer) -> Self {
        self.discoverer = discoverer;
        self
    }

    pub fn with_reader(mut self, reader: SharedReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_analyzer(mut self, analyzer: SharedAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_documenter(mut self, documenter: SharedDocumenter) -> Self {
        self.documenter = documenter;
        self
    }

    pub fn with_reviewer(mut self, reviewer: SharedReviewer) -> Self {
        self.reviewer = reviewer;
        self
    }

    pub fn with_patterns(mut self, patterns: SharedPatternStore) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn with_scorer(mut self, scorer: SharedScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_summarizer(mut self, summarizer: SharedSummarizer) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn with_git(mut self, git: SharedChangedFiles) -> Self {
        self.git = git;
        self
    }

    pub fn with_trends(mut self, trends: SharedTrendStore) -> Self {
        self.trends = trends;
        self
    }
}
