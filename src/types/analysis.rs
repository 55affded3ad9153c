//! Analysis Domain Types
//!
//! Records exchanged between the orchestrator and its collaborators:
//! per-file analyses, suggestions, documentation, learned patterns and the
//! final run result.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::files;
use crate::types::error::FailedItem;

// =============================================================================
// Analysis Configuration
// =============================================================================

/// What to analyze and how deep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Root of the codebase
    pub target_path: PathBuf,

    /// Glob patterns of files to include
    #[serde(default = "default_file_patterns")]
    pub file_patterns: Vec<String>,

    /// Glob patterns of files to skip
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    #[serde(default)]
    pub analysis_depth: AnalysisDepth,
}

fn default_file_patterns() -> Vec<String> {
    files::DEFAULT_INCLUDE.iter().map(|s| s.to_string()).collect()
}

fn default_exclude_patterns() -> Vec<String> {
    files::DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect()
}

impl AnalysisConfig {
    pub fn new(target_path: impl Into<PathBuf>) -> Self {
        Self {
            target_path: target_path.into(),
            file_patterns: default_file_patterns(),
            exclude_patterns: default_exclude_patterns(),
            analysis_depth: AnalysisDepth::default(),
        }
    }

    pub fn with_file_patterns(mut self, patterns: Vec<String>) -> Self {
        self.file_patterns = patterns;
        self
    }

    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisDepth {
    Quick,
    #[default]
    Standard,
    Deep,
}

impl std::fmt::Display for AnalysisDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisDepth::Quick => write!(f, "quick"),
            AnalysisDepth::Standard => write!(f, "standard"),
            AnalysisDepth::Deep => write!(f, "deep"),
        }
    }
}

impl std::str::FromStr for AnalysisDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quick" => Ok(AnalysisDepth::Quick),
            "standard" => Ok(AnalysisDepth::Standard),
            "deep" => Ok(AnalysisDepth::Deep),
            _ => Err(format!(
                "Invalid depth '{}'. Valid values: quick, standard, deep",
                s
            )),
        }
    }
}

// =============================================================================
// Per-file Analysis
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl IssueSeverity {
    /// Most severe first
    pub const ALL: [IssueSeverity; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Whether this is `threshold` or worse
    pub fn is_at_least(&self, threshold: IssueSeverity) -> bool {
        *self <= threshold
    }
}

impl std::fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IssueSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(format!(
                "Invalid severity '{}'. Valid values: critical, high, medium, low",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Complexity,
    Security,
    Style,
    Duplication,
    ErrorHandling,
    Naming,
}

impl IssueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complexity => "complexity",
            Self::Security => "security",
            Self::Style => "style",
            Self::Duplication => "duplication",
            Self::ErrorHandling => "error_handling",
            Self::Naming => "naming",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeMetrics {
    pub cyclomatic_complexity: u32,
    /// 0-100, higher is better
    pub maintainability_index: f64,
    pub lines_of_code: usize,
    pub comment_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeIssue {
    pub severity: IssueSeverity,
    pub category: IssueCategory,
    pub file_path: String,
    pub line_number: usize,
    pub description: String,
    pub code_snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    pub line_number: usize,
    #[serde(default)]
    pub parameters: Vec<String>,
    pub complexity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    pub line_number: usize,
    #[serde(default)]
    pub methods: Vec<String>,
}

/// Output of the analyzer for a single file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub file_path: String,
    pub language: String,
    pub metrics: CodeMetrics,
    #[serde(default)]
    pub issues: Vec<CodeIssue>,
    #[serde(default)]
    pub functions: Vec<FunctionInfo>,
    #[serde(default)]
    pub classes: Vec<ClassInfo>,
}

// =============================================================================
// Review Output
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffortLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// 1 = highest, 5 = lowest
    pub priority: u8,
    pub category: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_example: Option<String>,
    pub estimated_effort: EffortLevel,
    pub impact: ImpactLevel,
    #[serde(default)]
    pub related_issues: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Documentation {
    pub project_structure: String,
    #[serde(default)]
    pub api_docs: BTreeMap<String, String>,
    #[serde(default)]
    pub examples: BTreeMap<String, String>,
}

impl Documentation {
    /// Substitute used when the documentation phase fails entirely
    pub fn placeholder() -> Self {
        Self {
            project_structure: "Documentation generation failed".to_string(),
            ..Default::default()
        }
    }
}

/// Aggregate counts across all analyses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_files: usize,
    pub total_lines: usize,
    pub average_complexity: f64,
    pub average_maintainability: f64,
    #[serde(default)]
    pub total_issues_by_severity: BTreeMap<String, usize>,
    #[serde(default)]
    pub total_issues_by_category: BTreeMap<String, usize>,
}

impl MetricsSummary {
    /// Summary of a run with nothing to analyze
    pub fn empty() -> Self {
        Self {
            average_maintainability: 100.0,
            ..Default::default()
        }
    }
}

// =============================================================================
// Learned Patterns
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    Naming,
    Structure,
    Convention,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Naming => "naming",
            Self::Structure => "structure",
            Self::Convention => "convention",
        }
    }
}

impl std::str::FromStr for PatternType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "naming" => Ok(Self::Naming),
            "structure" => Ok(Self::Structure),
            "convention" => Ok(Self::Convention),
            other => Err(format!("unknown pattern type '{}'", other)),
        }
    }
}

/// A learned codebase convention with a confidence score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectPattern {
    pub pattern_id: String,
    pub project_id: String,
    pub pattern_type: PatternType,
    pub description: String,
    #[serde(default)]
    pub examples: Vec<String>,
    /// 0.0-1.0
    pub confidence: f64,
    pub last_updated: DateTime<Utc>,
}

// =============================================================================
// Run Result
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub session_id: String,
    /// Key for learned patterns and quality history
    #[serde(default)]
    pub project_id: String,
    pub timestamp: DateTime<Utc>,
    pub codebase_path: String,
    pub files_analyzed: usize,
    pub total_issues: usize,
    /// 0-100, higher is better
    pub quality_score: f64,
    #[serde(default)]
    pub file_analyses: Vec<FileAnalysis>,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
    #[serde(default)]
    pub documentation: Documentation,
    #[serde(default)]
    pub metrics_summary: MetricsSummary,
    /// Read and analysis failures recorded during the run
    #[serde(default)]
    pub failed_files: Vec<FailedItem>,
}

impl AnalysisResult {
    /// All issues across the analyzed files
    pub fn issues(&self) -> impl Iterator<Item = &CodeIssue> {
        self.file_analyses.iter().flat_map(|a| a.issues.iter())
    }

    pub fn count_severity(&self, severity: IssueSeverity) -> usize {
        self.issues().filter(|i| i.severity == severity).count()
    }
}

// =============================================================================
// Quality History
// =============================================================================

/// One completed run of a project, as kept for trend tracking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityTrend {
    pub timestamp: DateTime<Utc>,
    pub quality_score: f64,
    pub total_issues: usize,
    pub critical_issues: usize,
    pub high_issues: usize,
    pub files_analyzed: usize,
}

impl From<&AnalysisResult> for QualityTrend {
    fn from(result: &AnalysisResult) -> Self {
        Self {
            timestamp: result.timestamp,
            quality_score: result.quality_score,
            total_issues: result.total_issues,
            critical_issues: result.count_severity(IssueSeverity::Critical),
            high_issues: result.count_severity(IssueSeverity::High),
            files_analyzed: result.files_analyzed,
        }
    }
}

/// Change between a run and the one before it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityComparison {
    pub previous_score: f64,
    pub current_score: f64,
    pub score_delta: f64,
    pub issues_delta: i64,
    pub critical_issues_delta: i64,
    /// `score_delta` relative to the previous score; 0 when that was 0
    pub improvement_percentage: f64,
}

impl QualityComparison {
    pub fn between(previous: &QualityTrend, current: &QualityTrend) -> Self {
        let score_delta = current.quality_score - previous.quality_score;
        let improvement_percentage = if previous.quality_score > 0.0 {
            score_delta / previous.quality_score * 100.0
        } else {
            0.0
        };
        Self {
            previous_score: previous.quality_score,
            current_score: current.quality_score,
            score_delta,
            issues_delta: current.total_issues as i64 - previous.total_issues as i64,
            critical_issues_delta: current.critical_issues as i64
                - previous.critical_issues as i64,
            improvement_percentage,
        }
    }

    pub fn improved(&self) -> bool {
        self.score_delta > 0.0
    }
}
