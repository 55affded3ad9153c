//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/weavereview/) and project (.weavereview/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{pool, pr, retry, session};
use crate::types::{IssueSeverity, Result, ReviewError};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Session persistence and retention
    pub session: SessionConfig,

    /// Inner worker pool
    pub pool: PoolSettings,

    /// Backoff for pattern store calls
    pub retry: RetrySettings,

    /// Learned pattern storage
    pub patterns: PatternConfig,

    /// PR mode refs
    pub pr: PrConfig,

    /// CI exit code thresholds
    pub gate: GateConfig,

    pub logging: LoggingConfig,
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `ReviewError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(1..=pool::MAX_WORKERS_LIMIT).contains(&self.pool.max_workers) {
            return Err(ReviewError::Config(format!(
                "pool.max_workers must be between 1 and {}, got {}",
                pool::MAX_WORKERS_LIMIT,
                self.pool.max_workers
            )));
        }

        if self.retry.backoff_factor < 1.0 {
            return Err(ReviewError::Config(format!(
                "retry.backoff_factor must be at least 1.0, got {}",
                self.retry.backoff_factor
            )));
        }

        if self.retry.max_delay_ms < self.retry.initial_delay_ms {
            return Err(ReviewError::Config(
                "retry.max_delay_ms must not be below retry.initial_delay_ms".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.patterns.min_confidence) {
            return Err(ReviewError::Config(format!(
                "patterns.min_confidence must be between 0.0 and 1.0, got {}",
                self.patterns.min_confidence
            )));
        }

        if self.pr.base_ref.trim().is_empty() || self.pr.head_ref.trim().is_empty() {
            return Err(ReviewError::Config(
                "pr.base_ref and pr.head_ref must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Session Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory holding one JSON file per session
    pub sessions_dir: PathBuf,

    /// Completed sessions kept by `clean --completed`
    pub keep_completed: usize,

    /// Sessions older than this are removed by `clean --expired`
    pub max_age_days: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sessions_dir: PathBuf::from(session::DEFAULT_SESSIONS_DIR),
            keep_completed: session::DEFAULT_KEEP_COMPLETED,
            max_age_days: session::DEFAULT_MAX_AGE_DAYS,
        }
    }
}

// =============================================================================
// Worker Pool
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Concurrent per-file analyses
    pub max_workers: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_workers: pool::DEFAULT_MAX_WORKERS,
        }
    }
}

// =============================================================================
// Retry
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: usize,
    pub initial_delay_ms: u64,
    pub backoff_factor: f32,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: retry::DEFAULT_MAX_RETRIES,
            initial_delay_ms: retry::INITIAL_DELAY_MS,
            backoff_factor: retry::BACKOFF_FACTOR,
            max_delay_ms: retry::MAX_DELAY_MS,
        }
    }
}

// =============================================================================
// Patterns
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Patterns below this confidence are not retrieved
    pub min_confidence: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(crate::constants::patterns::DEFAULT_DATABASE_PATH),
            min_confidence: crate::constants::patterns::MIN_CONFIDENCE,
        }
    }
}

// =============================================================================
// PR Mode
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrConfig {
    pub base_ref: String,
    pub head_ref: String,
}

impl Default for PrConfig {
    fn default() -> Self {
        Self {
            base_ref: pr::DEFAULT_BASE_REF.to_string(),
            head_ref: pr::DEFAULT_HEAD_REF.to_string(),
        }
    }
}

// =============================================================================
// Quality Gate
// =============================================================================

/// Unset thresholds never fail a run. PR mode falls back to `critical`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_on: Option<IssueSeverity>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_issues: Option<usize>,
}

// =============================================================================
// Logging
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
