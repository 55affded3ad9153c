//! Graceful Degradation
//!
//! Per-item failure isolation as a value. Each processed item lands in exactly
//! one of two ordered lists: successes (with their id) or failures. Nothing is
//! hidden behind control flow; callers inspect the outcome and decide.

use std::collections::BTreeMap;
use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{FailedItem, PartialFailureError, Result, ReviewError};

/// Failures listed per error class in summaries
const SUMMARY_ITEMS_PER_CLASS: usize = 5;

/// Successes and failures of one batch pass
#[derive(Debug, Clone)]
pub struct BatchOutcome<T> {
    pub successes: Vec<(String, T)>,
    pub failures: Vec<FailedItem>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            successes: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> BatchOutcome<T> {
    pub fn success_ids(&self) -> Vec<String> {
        self.successes.iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn into_values(self) -> Vec<T> {
        self.successes.into_iter().map(|(_, v)| v).collect()
    }

    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }
}

/// Batch processor that records per-item failures instead of aborting
#[derive(Debug)]
pub struct GracefulDegradation<T> {
    operation_name: String,
    continue_on_error: bool,
    outcome: BatchOutcome<T>,
}

impl<T> GracefulDegradation<T> {
    pub fn new(operation_name: impl Into<String>, continue_on_error: bool) -> Self {
        Self {
            operation_name: operation_name.into(),
            continue_on_error,
            outcome: BatchOutcome::default(),
        }
    }

    /// Shorthand for `new(name, true)`
    pub fn continuing(operation_name: impl Into<String>) -> Self {
        Self::new(operation_name, true)
    }

    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    /// Run `op` for one item and record its outcome.
    ///
    /// Returns `Ok(true)` on success and `Ok(false)` on a recorded failure.
    /// With `continue_on_error == false` a failure is recorded and then
    /// returned as `Err`.
    pub async fn process_item<F, Fut>(&mut self, item_id: impl Into<String>, op: F) -> Result<bool>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let result = op().await;
        self.record(item_id, result)
    }

    /// Record an outcome produced elsewhere (e.g. by a concurrent task)
    pub fn record(&mut self, item_id: impl Into<String>, result: Result<T>) -> Result<bool> {
        let item_id = item_id.into();
        match result {
            Ok(value) => {
                self.outcome.successes.push((item_id, value));
                Ok(true)
            }
            Err(err) => {
                warn!(
                    "{}: item '{}' failed ({}): {}",
                    self.operation_name,
                    item_id,
                    err.class(),
                    err
                );
                self.outcome
                    .failures
                    .push(FailedItem::from_error(item_id, &err));
                if self.continue_on_error {
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }

    pub fn results(&self) -> (&[(String, T)], &[FailedItem]) {
        (&self.outcome.successes, &self.outcome.failures)
    }

    pub fn has_failures(&self) -> bool {
        !self.outcome.failures.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.outcome.successes.len()
    }

    pub fn failure_count(&self) -> usize {
        self.outcome.failures.len()
    }

    /// Error iff nothing succeeded and something failed
    pub fn raise_if_all_failed(&self) -> Result<()> {
        if self.outcome.successes.is_empty() && !self.outcome.failures.is_empty() {
            return Err(PartialFailureError::new(
                format!("All items failed in {}", self.operation_name),
                Vec::new(),
                self.outcome.failures.clone(),
            )
            .into());
        }
        Ok(())
    }

    pub fn log_summary(&self) {
        let total = self.outcome.total();
        let rate = if total > 0 {
            self.outcome.successes.len() as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        info!(
            "{} completed: {}/{} successful ({:.1}%)",
            self.operation_name,
            self.outcome.successes.len(),
            total,
            rate
        );
        if self.has_failures() {
            warn!(
                "Errors in {}:\n{}",
                self.operation_name,
                error_summary(&self.outcome.failures)
            );
        }
    }

    pub fn into_outcome(self) -> BatchOutcome<T> {
        self.outcome
    }
}

/// Human-readable failure summary grouped by error class
pub fn error_summary(failures: &[FailedItem]) -> String {
    if failures.is_empty() {
        return "No errors occurred".to_string();
    }

    let mut by_class: BTreeMap<String, Vec<&FailedItem>> = BTreeMap::new();
    for item in failures {
        by_class.entry(item.class.to_string()).or_default().push(item);
    }

    let mut lines = vec![format!("Encountered {} error(s):", failures.len())];
    for (class, items) in by_class {
        lines.push(format!("{}:", class));
        for item in items.iter().take(SUMMARY_ITEMS_PER_CLASS) {
            lines.push(format!("  - {}: {}", item.item_id, item.error));
        }
        if items.len() > SUMMARY_ITEMS_PER_CLASS {
            lines.push(format!(
                "  ... and {} more",
                items.len() - SUMMARY_ITEMS_PER_CLASS
            ));
        }
    }
    lines.join("\n")
}

/// Serializable report for a run that ended in a partial failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialReport {
    pub session_id: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub error: String,
    pub successful_items: Vec<String>,
    pub failed_items: Vec<FailedItem>,
}

impl PartialReport {
    pub fn from_error(session_id: impl Into<String>, err: &ReviewError) -> Self {
        let (successful_items, failed_items) = match err.as_partial_failure() {
            Some(p) => (p.successful_items.clone(), p.failed_items.clone()),
            None => (Vec::new(), Vec::new()),
        };
        Self {
            session_id: session_id.into(),
            status: "partial_failure".to_string(),
            timestamp: Utc::now(),
            error: err.to_string(),
            successful_items,
            failed_items,
        }
    }
}
