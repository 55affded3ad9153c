//! Session Types
//!
//! - SessionState: the persisted record of one analysis run
//! - SessionStatus: Running / Paused / Completed / Failed
//! - PartialResults: typed checkpoint payloads keyed by name
//! - SessionIssue / SessionHealth: validation and diagnostics

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::checkpoint_keys;
use crate::types::{AnalysisConfig, FailedItem, FileAnalysis};

// =============================================================================
// Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Paused,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        }
    }

    /// Strict parse; unknown strings are `None`
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(SessionStatus::Running),
            "paused" => Some(SessionStatus::Paused),
            "completed" => Some(SessionStatus::Completed),
            "failed" => Some(SessionStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(&s.to_lowercase()).ok_or_else(|| {
            format!(
                "Invalid status '{}'. Valid values: running, paused, completed, failed",
                s
            )
        })
    }
}

// =============================================================================
// Checkpoint Payloads
// =============================================================================

/// Pause-time modification timestamps; `None` marks a file missing at pause
pub type MtimeSnapshot = BTreeMap<String, Option<DateTime<Utc>>>;

/// One typed entry in `partial_results`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum CheckpointPayload {
    /// Per-file analyses checkpointed after the parallel phase
    AnalysisSnapshot(Vec<FileAnalysis>),
    /// File timestamps recorded at pause
    MtimeSnapshot(MtimeSnapshot),
    /// Read and analysis failures of the last pass
    FailureSummary(Vec<FailedItem>),
    /// Anything else a caller wants to carry along
    Extension(serde_json::Value),
}

/// Checkpointed partial results, merged shallowly by key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartialResults(BTreeMap<String, CheckpointPayload>);

impl PartialResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, payload: CheckpointPayload) {
        self.0.insert(key.into(), payload);
    }

    pub fn get(&self, key: &str) -> Option<&CheckpointPayload> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Shallow merge: keys in `other` replace existing ones
    pub fn merge(&mut self, other: PartialResults) {
        self.0.extend(other.0);
    }

    pub fn with_analyses(mut self, analyses: Vec<FileAnalysis>) -> Self {
        self.insert(
            checkpoint_keys::FILE_ANALYSES,
            CheckpointPayload::AnalysisSnapshot(analyses),
        );
        self
    }

    pub fn with_failures(mut self, failures: Vec<FailedItem>) -> Self {
        self.insert(
            checkpoint_keys::FAILED_FILES,
            CheckpointPayload::FailureSummary(failures),
        );
        self
    }

    pub fn with_mtimes(mut self, mtimes: MtimeSnapshot) -> Self {
        self.insert(
            checkpoint_keys::FILE_MTIMES,
            CheckpointPayload::MtimeSnapshot(mtimes),
        );
        self
    }

    pub fn analyses(&self) -> &[FileAnalysis] {
        match self.0.get(checkpoint_keys::FILE_ANALYSES) {
            Some(CheckpointPayload::AnalysisSnapshot(a)) => a,
            _ => &[],
        }
    }

    pub fn failures(&self) -> &[FailedItem] {
        match self.0.get(checkpoint_keys::FAILED_FILES) {
            Some(CheckpointPayload::FailureSummary(f)) => f,
            _ => &[],
        }
    }

    pub fn mtimes(&self) -> Option<&MtimeSnapshot> {
        match self.0.get(checkpoint_keys::FILE_MTIMES) {
            Some(CheckpointPayload::MtimeSnapshot(m)) => Some(m),
            _ => None,
        }
    }
}

// =============================================================================
// Session State
// =============================================================================

/// Persisted state of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub status: SessionStatus,
    pub config: AnalysisConfig,
    #[serde(default)]
    pub processed_files: Vec<String>,
    #[serde(default)]
    pub pending_files: Vec<String>,
    #[serde(default)]
    pub partial_results: PartialResults,
    pub checkpoint_time: DateTime<Utc>,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>, config: AnalysisConfig, pending: Vec<String>) -> Self {
        Self {
            session_id: session_id.into(),
            status: SessionStatus::Running,
            config,
            processed_files: Vec::new(),
            pending_files: pending,
            partial_results: PartialResults::new(),
            checkpoint_time: Utc::now(),
        }
    }

    /// Bump the checkpoint time, never moving it backwards
    pub fn touch(&mut self) {
        self.checkpoint_time = self.checkpoint_time.max(Utc::now());
    }

    /// Files present in both processed and pending
    pub fn overlap(&self) -> Vec<String> {
        let processed: BTreeSet<&str> = self.processed_files.iter().map(String::as_str).collect();
        self.pending_files
            .iter()
            .filter(|f| processed.contains(f.as_str()))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Fraction of files processed, 0.0 when there are none
    pub fn progress(&self) -> f64 {
        let total = self.processed_files.len() + self.pending_files.len();
        if total == 0 {
            0.0
        } else {
            self.processed_files.len() as f64 / total as f64
        }
    }
}

// =============================================================================
// Validation & Health
// =============================================================================

/// Why a stored session failed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionIssue {
    NotFound,
    /// File exists but is not a JSON record
    Unreadable(String),
    MissingField(&'static str),
    TargetMissing(PathBuf),
    Overlap(Vec<String>),
    InvalidStatus(String),
}

impl std::fmt::Display for SessionIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "Session not found"),
            Self::Unreadable(msg) => write!(f, "Session file unreadable: {}", msg),
            Self::MissingField(field) => write!(f, "Missing {}", field),
            Self::TargetMissing(path) => {
                write!(f, "Target path does not exist: {}", path.display())
            }
            Self::Overlap(files) => {
                write!(f, "Files in both processed and pending: {}", files.join(", "))
            }
            Self::InvalidStatus(status) => write!(f, "Invalid status: {}", status),
        }
    }
}

impl std::error::Error for SessionIssue {}

/// Diagnostics for one session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionHealth {
    pub exists: bool,
    pub valid: bool,
    pub error: Option<String>,
    pub status: Option<SessionStatus>,
    pub progress: f64,
    pub processed_count: usize,
    pub pending_count: usize,
    pub missing_files: Vec<String>,
    pub last_checkpoint: Option<DateTime<Utc>>,
}

impl SessionHealth {
    pub fn not_found() -> Self {
        Self {
            exists: false,
            valid: false,
            error: Some(SessionIssue::NotFound.to_string()),
            status: None,
            progress: 0.0,
            processed_count: 0,
            pending_count: 0,
            missing_files: Vec::new(),
            last_checkpoint: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip_strings() {
        for status in [
            SessionStatus::Running,
            SessionStatus::Paused,
            SessionStatus::Completed,
            SessionStatus::Failed,
        ] {
            assert_eq!(SessionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SessionStatus::parse("pending"), None);
        assert!("bogus".parse::<SessionStatus>().is_err());
    }

    #[test]
    fn test_partial_results_merge_new_keys_win() {
        let mut base = PartialResults::new()
            .with_failures(vec![])
            .with_analyses(vec![]);
        base.insert("note", CheckpointPayload::Extension(serde_json::json!("old")));

        let mut update = PartialResults::new();
        update.insert("note", CheckpointPayload::Extension(serde_json::json!("new")));
        base.merge(update);

        assert_eq!(base.len(), 3);
        assert_eq!(
            base.get("note"),
            Some(&CheckpointPayload::Extension(serde_json::json!("new")))
        );
    }

    #[test]
    fn test_payload_is_tagged_in_json() {
        let results = PartialResults::new().with_mtimes(MtimeSnapshot::from([(
            "a.py".to_string(),
            None,
        )]));
        let json = serde_json::to_value(&results).unwrap();
        assert_eq!(json["file_mtimes"]["kind"], "mtime_snapshot");
        assert!(json["file_mtimes"]["data"]["a.py"].is_null());
    }

    #[test]
    fn test_touch_is_monotonic() {
        let mut state = SessionState::new("s", AnalysisConfig::new("/tmp"), vec![]);
        let future = Utc::now() + chrono::Duration::hours(1);
        state.checkpoint_time = future;
        state.touch();
        assert_eq!(state.checkpoint_time, future);
    }

    #[test]
    fn test_overlap_and_progress() {
        let mut state = SessionState::new(
            "s",
            AnalysisConfig::new("/tmp"),
            vec!["a".into(), "b".into(), "c".into()],
        );
        assert!(state.overlap().is_empty());
        assert_eq!(state.progress(), 0.0);

        state.processed_files = vec!["a".into()];
        assert_eq!(state.overlap(), vec!["a".to_string()]);
        assert_eq!(state.progress(), 0.25);
    }
}
