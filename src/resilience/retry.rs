//! Retry With Backoff
//!
//! Explicit retry policy object wrapping an async closure. Delays grow as
//! `initial_delay * backoff_factor^attempt`, capped at `max_delay`, with no
//! jitter. Total invocations are bounded by `max_retries + 1`.
//!
//! Only errors the predicate accepts are retried. Non-retryable errors are
//! returned immediately without sleeping; after the last retry the final
//! retryable error is returned unchanged.

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use tracing::{debug, warn};

use crate::config::RetrySettings;
use crate::constants::retry as retry_constants;
use crate::types::{ReviewError, Result};

/// Bounded exponential backoff policy
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Additional attempts after the first call
    pub max_retries: usize,
    pub initial_delay: Duration,
    pub backoff_factor: f32,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: retry_constants::DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(retry_constants::INITIAL_DELAY_MS),
            backoff_factor: retry_constants::BACKOFF_FACTOR,
            max_delay: Duration::from_millis(retry_constants::MAX_DELAY_MS),
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            backoff_factor: settings.backoff_factor,
            max_delay: Duration::from_millis(settings.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_backoff_factor(mut self, factor: f32) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay slept before retry number `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let scaled =
            self.initial_delay.as_secs_f64() * f64::from(self.backoff_factor).powi(attempt as i32);
        Duration::from_secs_f64(scaled.min(self.max_delay.as_secs_f64()))
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_factor(self.backoff_factor)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries)
    }

    /// Run `op`, retrying errors classified as transient
    pub async fn run<F, Fut, T>(&self, operation: &str, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run_when(operation, op, ReviewError::is_retryable)
            .await
    }

    /// Run `op`, retrying only errors accepted by `is_retryable`
    pub async fn run_when<F, Fut, T, P>(&self, operation: &str, op: F, is_retryable: P) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&ReviewError) -> bool,
    {
        let result = op
            .retry(self.backoff())
            .sleep(tokio::time::sleep)
            .when(|e| is_retryable(e))
            .notify(|e, delay| {
                warn!(
                    "{} failed ({}), retrying in {:.2}s",
                    operation,
                    e,
                    delay.as_secs_f64()
                );
            })
            .await;

        if let Err(ref e) = result {
            if is_retryable(e) {
                warn!(
                    "{} failed after {} attempts: {}",
                    operation,
                    self.max_retries + 1,
                    e
                );
            } else {
                debug!("{} failed with non-retryable error: {}", operation, e);
            }
        }

        result
    }
}

/// Higher-order form of [`RetryPolicy::run_when`]
pub async fn retry_with_backoff<F, Fut, T, P>(
    policy: &RetryPolicy,
    operation: &str,
    op: F,
    is_retryable: P,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&ReviewError) -> bool,
{
    policy.run_when(operation, op, is_retryable).await
}
