//! Change Detection
//!
//! Compares the modification times recorded at pause against the files on
//! disk. Differences within the tolerance are filesystem granularity noise.
//! Files missing at pause or since deleted are never reported as changed.

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::constants::change::MTIME_TOLERANCE_SECS;
use crate::session::types::MtimeSnapshot;

/// Modification time of `path`, or `None` if it cannot be read
pub async fn current_mtime(path: impl AsRef<Path>) -> Option<DateTime<Utc>> {
    let metadata = tokio::fs::metadata(path.as_ref()).await.ok()?;
    metadata.modified().ok().map(DateTime::<Utc>::from)
}

#[derive(Debug, Clone)]
pub struct ChangeDetector {
    tolerance_secs: f64,
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self {
            tolerance_secs: MTIME_TOLERANCE_SECS,
        }
    }
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance_secs(mut self, secs: f64) -> Self {
        self.tolerance_secs = secs;
        self
    }

    /// Record current timestamps for `files`; unreadable files map to `None`
    pub async fn snapshot<'a, I>(&self, files: I) -> MtimeSnapshot
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut snapshot = MtimeSnapshot::new();
        for file in files {
            snapshot.insert(file.clone(), current_mtime(file).await);
        }
        snapshot
    }

    /// Processed files whose timestamp moved by more than the tolerance
    pub async fn detect_changes(&self, snapshot: &MtimeSnapshot, processed: &[String]) -> Vec<String> {
        let mut changed = Vec::new();

        for file in processed {
            let Some(Some(stored)) = snapshot.get(file) else {
                debug!("No pause-time timestamp for {}, leaving as processed", file);
                continue;
            };
            let Some(current) = current_mtime(file).await else {
                debug!("{} vanished during pause, leaving as processed", file);
                continue;
            };

            let drift = drift_secs(current - *stored);
            if drift > self.tolerance_secs {
                debug!("{} changed during pause ({:.3}s drift)", file, drift);
                changed.push(file.clone());
            }
        }

        changed
    }
}

/// Absolute drift in seconds, microsecond precise
fn drift_secs(delta: chrono::TimeDelta) -> f64 {
    match delta.num_microseconds() {
        Some(micros) => micros.unsigned_abs() as f64 / 1_000_000.0,
        None => delta.num_seconds().unsigned_abs() as f64,
    }
}
