//! Session Store
//!
//! One JSON file per session under a sessions directory. Writes go to a
//! temporary sibling first and are then atomically renamed over the target,
//! so concurrent readers never observe a partial record. Missing or
//! malformed files read as "not found".
//!
//! The store assumes a single writer per session id.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use backon::{ConstantBuilder, Retryable};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::constants::session as session_constants;
use crate::session::types::{
    PartialResults, SessionHealth, SessionIssue, SessionState, SessionStatus,
};
use crate::types::{AnalysisConfig, Result, ResultExt};

/// Keep only `[A-Za-z0-9_-]` so ids cannot escape the sessions directory
pub fn sanitize_session_id(session_id: &str) -> String {
    session_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

/// Run `replace`, retrying a fixed number of times while it is refused
/// with `PermissionDenied`. Other errors return at once.
async fn replace_contended<F, Fut>(replace: F) -> std::io::Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    replace
        .retry(
            ConstantBuilder::default()
                .with_delay(Duration::from_millis(
                    session_constants::REPLACE_RETRY_DELAY_MS,
                ))
                .with_max_times(session_constants::REPLACE_RETRIES),
        )
        .sleep(tokio::time::sleep)
        .when(|e: &std::io::Error| e.kind() == std::io::ErrorKind::PermissionDenied)
        .notify(|e: &std::io::Error, _| {
            debug!("Session file replace contended, retrying: {}", e);
        })
        .await
}

/// Lenient on-disk shape used by validation and recovery
#[derive(Debug, Deserialize)]
struct RawSessionRecord {
    session_id: Option<String>,
    status: Option<String>,
    config: Option<AnalysisConfig>,
    #[serde(default)]
    processed_files: Vec<String>,
    #[serde(default)]
    pending_files: Vec<String>,
    #[serde(default)]
    partial_results: PartialResults,
    checkpoint_time: Option<DateTime<Utc>>,
}

impl RawSessionRecord {
    fn check(&self) -> std::result::Result<(), SessionIssue> {
        if self.session_id.as_deref().is_none_or(str::is_empty) {
            return Err(SessionIssue::MissingField("session_id"));
        }
        let Some(config) = &self.config else {
            return Err(SessionIssue::MissingField("config"));
        };
        if config.target_path.as_os_str().is_empty() {
            return Err(SessionIssue::MissingField("target_path in config"));
        }
        if self.checkpoint_time.is_none() {
            return Err(SessionIssue::MissingField("checkpoint_time"));
        }
        if !config.target_path.exists() {
            return Err(SessionIssue::TargetMissing(config.target_path.clone()));
        }

        let processed: HashSet<&str> = self.processed_files.iter().map(String::as_str).collect();
        let mut overlap: Vec<String> = self
            .pending_files
            .iter()
            .filter(|f| processed.contains(f.as_str()))
            .cloned()
            .collect();
        if !overlap.is_empty() {
            overlap.sort();
            overlap.dedup();
            return Err(SessionIssue::Overlap(overlap));
        }

        match self.status.as_deref() {
            Some(s) if SessionStatus::parse(s).is_some() => Ok(()),
            Some(s) => Err(SessionIssue::InvalidStatus(s.to_string())),
            None => Err(SessionIssue::InvalidStatus("<missing>".to_string())),
        }
    }

    fn into_state(self) -> Option<SessionState> {
        Some(SessionState {
            session_id: self.session_id?,
            status: SessionStatus::parse(self.status.as_deref()?)?,
            config: self.config?,
            processed_files: self.processed_files,
            pending_files: self.pending_files,
            partial_results: self.partial_results,
            checkpoint_time: self.checkpoint_time?,
        })
    }
}

/// File-backed session persistence
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions_dir: PathBuf,
    backups_dir: PathBuf,
}

impl SessionStore {
    pub fn new(sessions_dir: impl Into<PathBuf>) -> Self {
        let sessions_dir = sessions_dir.into();
        let backups_dir = sessions_dir.join(session_constants::BACKUPS_DIR);
        Self {
            sessions_dir,
            backups_dir,
        }
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    pub fn session_path(&self, session_id: &str) -> PathBuf {
        self.sessions_dir.join(format!(
            "{}.{}",
            sanitize_session_id(session_id),
            session_constants::FILE_EXTENSION
        ))
    }

    // =========================================================================
    // Read / Write
    // =========================================================================

    /// Create a Running session with every file pending and persist it.
    ///
    /// A persist failure here is returned to the caller: without a session
    /// there is nothing to resume.
    pub async fn create_session(
        &self,
        session_id: &str,
        config: AnalysisConfig,
        pending_files: Vec<String>,
    ) -> Result<SessionState> {
        let state = SessionState::new(session_id, config, pending_files);
        self.save(&state).await?;
        info!(
            "Created session {} with {} pending files",
            session_id,
            state.pending_files.len()
        );
        Ok(state)
    }

    /// Write to `<id>.json.tmp`, then rename over `<id>.json`.
    ///
    /// A rename refused with `PermissionDenied` (a short-lived lock held by
    /// another process) is retried a fixed number of times.
    pub async fn save(&self, state: &SessionState) -> Result<()> {
        tokio::fs::create_dir_all(&self.sessions_dir).await?;

        let path = self.session_path(&state.session_id);
        let tmp = path.with_extension(format!(
            "{}.{}",
            session_constants::FILE_EXTENSION,
            session_constants::TEMP_SUFFIX
        ));

        let content = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&tmp, content).await?;

        let (from, to) = (&tmp, &path);
        let replaced =
            replace_contended(move || async move { tokio::fs::rename(from, to).await }).await;

        if let Err(e) = replaced {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!("Saved session {}", state.session_id);
        Ok(())
    }

    /// Load a session; absent or corrupt files read as `None`
    pub async fn load(&self, session_id: &str) -> Option<SessionState> {
        let path = self.session_path(session_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to read session {}: {}", session_id, e);
                }
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("Session {} is corrupt, treating as missing: {}", session_id, e);
                None
            }
        }
    }

    pub async fn exists(&self, session_id: &str) -> bool {
        tokio::fs::try_exists(self.session_path(session_id))
            .await
            .unwrap_or(false)
    }

    pub async fn delete(&self, session_id: &str) -> Result<bool> {
        match tokio::fs::remove_file(self.session_path(session_id)).await {
            Ok(()) => {
                info!("Deleted session {}", session_id);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Replace processed/pending wholesale and merge partial results.
    ///
    /// Any file listed in both sets stays processed. Returns `false` if the
    /// session does not exist.
    pub async fn checkpoint(
        &self,
        session_id: &str,
        processed_files: Vec<String>,
        pending_files: Vec<String>,
        partial_results: PartialResults,
    ) -> Result<bool> {
        let Some(mut state) = self.load(session_id).await else {
            warn!("Checkpoint skipped, session {} not found", session_id);
            return Ok(false);
        };

        let processed: HashSet<&str> = processed_files.iter().map(String::as_str).collect();
        state.pending_files = pending_files
            .into_iter()
            .filter(|f| !processed.contains(f.as_str()))
            .collect();
        state.processed_files = processed_files;
        state.partial_results.merge(partial_results);
        state.touch();

        self.save(&state).await?;
        debug!(
            "Checkpointed session {}: {} processed, {} pending",
            session_id,
            state.processed_files.len(),
            state.pending_files.len()
        );
        Ok(true)
    }

    /// Running -> Paused; `false` from any other status
    pub async fn pause(&self, session_id: &str) -> Result<bool> {
        let Some(mut state) = self.load(session_id).await else {
            return Ok(false);
        };
        if state.status != SessionStatus::Running {
            debug!(
                "Cannot pause session {} in status {}",
                session_id, state.status
            );
            return Ok(false);
        }
        state.status = SessionStatus::Paused;
        state.touch();
        self.save(&state).await?;
        info!("Paused session {}", session_id);
        Ok(true)
    }

    /// Paused -> Running; `None` from any other status
    pub async fn resume(&self, session_id: &str) -> Result<Option<SessionState>> {
        let Some(mut state) = self.load(session_id).await else {
            return Ok(None);
        };
        if state.status != SessionStatus::Paused {
            debug!(
                "Cannot resume session {} in status {}",
                session_id, state.status
            );
            return Ok(None);
        }
        state.status = SessionStatus::Running;
        state.touch();
        self.save(&state).await?;
        info!("Resumed session {}", session_id);
        Ok(Some(state))
    }

    pub async fn complete(&self, session_id: &str) -> Result<bool> {
        self.set_terminal(session_id, SessionStatus::Completed).await
    }

    pub async fn fail(&self, session_id: &str) -> Result<bool> {
        self.set_terminal(session_id, SessionStatus::Failed).await
    }

    /// Terminal transitions apply from any status
    async fn set_terminal(&self, session_id: &str, status: SessionStatus) -> Result<bool> {
        let Some(mut state) = self.load(session_id).await else {
            return Ok(false);
        };
        if state.status.is_terminal() && state.status != status {
            warn!(
                "Session {} moving from terminal status {} to {}",
                session_id, state.status, status
            );
        }
        state.status = status;
        state.touch();
        self.save(&state).await?;
        info!("Session {} marked {}", session_id, status);
        Ok(true)
    }

    // =========================================================================
    // Listing
    // =========================================================================

    async fn session_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.sessions_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path
                .extension()
                .is_some_and(|e| e == session_constants::FILE_EXTENSION)
                && entry.file_type().await.is_ok_and(|t| t.is_file())
            {
                files.push(path);
            }
        }
        Ok(files)
    }

    /// All loadable sessions, newest checkpoint first
    pub async fn list(&self, status: Option<SessionStatus>) -> Result<Vec<SessionState>> {
        let mut sessions = Vec::new();
        for path in self.session_files().await? {
            if let Ok(content) = tokio::fs::read_to_string(&path).await
                && let Ok(state) = serde_json::from_str::<SessionState>(&content)
            {
                if status.is_none_or(|s| s == state.status) {
                    sessions.push(state);
                }
            } else {
                debug!("Skipping unreadable session file {}", path.display());
            }
        }
        sessions.sort_by(|a, b| b.checkpoint_time.cmp(&a.checkpoint_time));
        Ok(sessions)
    }

    // =========================================================================
    // Retention
    // =========================================================================

    /// Keep the `keep_recent` newest Completed sessions, delete the rest
    pub async fn cleanup_completed(&self, keep_recent: usize) -> Result<usize> {
        let completed = self.list(Some(SessionStatus::Completed)).await?;
        let mut deleted = 0;
        for state in completed.iter().skip(keep_recent) {
            if self.delete(&state.session_id).await? {
                deleted += 1;
            }
        }
        if deleted > 0 {
            info!("Cleaned up {} completed sessions", deleted);
        }
        Ok(deleted)
    }

    /// Delete session files whose on-disk mtime is older than `max_age_days`
    pub async fn cleanup_expired(&self, max_age_days: u64) -> Result<usize> {
        let max_age = Duration::from_secs(max_age_days.saturating_mul(24 * 60 * 60));
        let now = SystemTime::now();
        let mut deleted = 0;

        for path in self.session_files().await? {
            let modified = tokio::fs::metadata(&path).await?.modified()?;
            let age = now.duration_since(modified).unwrap_or_default();
            if age > max_age {
                tokio::fs::remove_file(&path).await?;
                deleted += 1;
            }
        }
        if deleted > 0 {
            info!("Cleaned up {} expired sessions", deleted);
        }
        Ok(deleted)
    }

    pub async fn cleanup_failed(&self) -> Result<usize> {
        let mut deleted = 0;
        for state in self.list(Some(SessionStatus::Failed)).await? {
            if self.delete(&state.session_id).await? {
                deleted += 1;
            }
        }
        if deleted > 0 {
            info!("Cleaned up {} failed sessions", deleted);
        }
        Ok(deleted)
    }

    // =========================================================================
    // Validation & Recovery
    // =========================================================================

    async fn read_raw(&self, session_id: &str) -> std::result::Result<RawSessionRecord, SessionIssue> {
        let content = match tokio::fs::read_to_string(self.session_path(session_id)).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SessionIssue::NotFound);
            }
            Err(e) => return Err(SessionIssue::Unreadable(e.to_string())),
        };
        serde_json::from_str(&content).map_err(|e| SessionIssue::Unreadable(e.to_string()))
    }

    /// Check required fields, target path, disjointness and status
    pub async fn validate(&self, session_id: &str) -> std::result::Result<(), SessionIssue> {
        self.read_raw(session_id).await?.check()
    }

    /// Copy the current session file into `backups/<id>_<timestamp>.json`
    pub async fn backup(&self, session_id: &str) -> Result<Option<PathBuf>> {
        let source = self.session_path(session_id);
        if !tokio::fs::try_exists(&source).await? {
            return Ok(None);
        }

        tokio::fs::create_dir_all(&self.backups_dir).await?;
        let target = self.backups_dir.join(format!(
            "{}_{}.{}",
            sanitize_session_id(session_id),
            Utc::now().format(session_constants::BACKUP_TIMESTAMP_FORMAT),
            session_constants::FILE_EXTENSION
        ));
        tokio::fs::copy(&source, &target)
            .await
            .with_context_fn(|| format!("backup of session {}", session_id))?;

        debug!("Backed up session {} to {}", session_id, target.display());
        Ok(Some(target))
    }

    /// Back up, validate and repair a session where possible.
    ///
    /// Overlapping files are dropped from pending and an invalid status is
    /// inferred from progress. A missing target path or required field is
    /// unrecoverable.
    pub async fn recover(&self, session_id: &str) -> Result<Option<SessionState>> {
        let Ok(mut raw) = self.read_raw(session_id).await else {
            return Ok(None);
        };
        self.backup(session_id).await?;

        let mut repaired = false;
        loop {
            match raw.check() {
                Ok(()) => break,
                Err(SessionIssue::Overlap(files)) => {
                    warn!(
                        "Recovering session {}: dropping {} overlapping pending files",
                        session_id,
                        files.len()
                    );
                    let overlap: HashSet<String> = files.into_iter().collect();
                    raw.pending_files.retain(|f| !overlap.contains(f));
                    repaired = true;
                }
                Err(SessionIssue::InvalidStatus(found)) => {
                    let inferred = if raw.pending_files.is_empty() {
                        SessionStatus::Completed
                    } else {
                        SessionStatus::Paused
                    };
                    warn!(
                        "Recovering session {}: invalid status '{}' reset to {}",
                        session_id, found, inferred
                    );
                    raw.status = Some(inferred.as_str().to_string());
                    repaired = true;
                }
                Err(issue) => {
                    warn!("Session {} is unrecoverable: {}", session_id, issue);
                    return Ok(None);
                }
            }
        }

        let Some(state) = raw.into_state() else {
            return Ok(None);
        };
        if repaired {
            self.save(&state).await?;
            info!("Recovered session {}", session_id);
        }
        Ok(Some(state))
    }

    /// Validity, progress and files no longer present on disk
    pub async fn health(&self, session_id: &str) -> SessionHealth {
        let Some(state) = self.load(session_id).await else {
            return SessionHealth::not_found();
        };
        let validation = self.validate(session_id).await;

        let mut missing_files = Vec::new();
        for file in state.processed_files.iter().chain(&state.pending_files) {
            if !tokio::fs::try_exists(file).await.unwrap_or(false) {
                missing_files.push(file.clone());
            }
        }

        SessionHealth {
            exists: true,
            valid: validation.is_ok(),
            error: validation.err().map(|issue| issue.to_string()),
            status: Some(state.status),
            progress: state.progress(),
            processed_count: state.processed_files.len(),
            pending_count: state.pending_files.len(),
            missing_files,
            last_checkpoint: Some(state.checkpoint_time),
        }
    }
}
