//! Unified Error Type System
//!
//! Centralized error types for the review engine.
//! Every error carries a retry classification used by the resilience layer.
//!
//! ## Error Classes
//!
//! - **Transient**: I/O, timeout and connection-class failures (retry with backoff)
//! - **Permanent**: bad input, type or logic failures (never retried)
//! - **Unknown**: anything unclassified (treated as non-retryable)
//!
//! `PartialFailureError` is the aggregate raised when a whole batch produced
//! zero usable output. It carries both the successful and failed item ids so
//! callers can build a partial report.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Error Classes
// =============================================================================

/// Retry classification for an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Temporary failure - retry with backoff
    Transient,
    /// Input, type or logic failure - fail fast
    Permanent,
    /// Unclassified - conservative, no retry
    Unknown,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Permanent => write!(f, "permanent"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl ErrorClass {
    /// Only transient failures are retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient)
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Structured validation error with context
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// What validation failed
    pub kind: ValidationErrorKind,
    /// Field or component that failed validation
    pub field: Option<String>,
    /// Detailed message
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(field) = &self.field {
            write!(f, "Validation failed for '{}': {}", field, self.message)
        } else {
            write!(f, "Validation failed: {}", self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            field: None,
            message: message.into(),
        }
    }

    /// Add field context
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn from_message(message: impl Into<String>) -> Self {
        Self::new(ValidationErrorKind::General, message)
    }
}

/// Validation error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Required field missing or empty
    MissingField,
    /// Invalid format (e.g. illegal characters in an identifier)
    Format,
    /// Value out of range
    Range,
    /// Referenced path does not exist or has the wrong type
    Path,
    /// General validation error
    General,
}

// =============================================================================
// Partial Failure
// =============================================================================

/// One failed item inside a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    pub item_id: String,
    pub error: String,
    pub class: ErrorClass,
}

impl FailedItem {
    pub fn from_error(item_id: impl Into<String>, err: &ReviewError) -> Self {
        Self {
            item_id: item_id.into(),
            error: err.to_string(),
            class: err.class(),
        }
    }
}

/// Aggregate error for a batch that produced no usable output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialFailureError {
    pub message: String,
    pub successful_items: Vec<String>,
    pub failed_items: Vec<FailedItem>,
}

impl PartialFailureError {
    pub fn new(
        message: impl Into<String>,
        successful_items: Vec<String>,
        failed_items: Vec<FailedItem>,
    ) -> Self {
        Self {
            message: message.into(),
            successful_items,
            failed_items,
        }
    }

    pub fn total(&self) -> usize {
        self.successful_items.len() + self.failed_items.len()
    }

    /// One-line count summary, e.g. `0/5 succeeded, 5 failed`
    pub fn summary(&self) -> String {
        format!(
            "{}/{} succeeded, {} failed",
            self.successful_items.len(),
            self.total(),
            self.failed_items.len()
        )
    }
}

impl std::fmt::Display for PartialFailureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.summary())
    }
}

impl std::error::Error for PartialFailureError {}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ReviewError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // -------------------------------------------------------------------------
    // Classified Errors
    // -------------------------------------------------------------------------
    #[error("{0}")]
    Validation(ValidationError),

    #[error("Transient error: {0}")]
    Transient(String),

    #[error("Permanent error: {0}")]
    Permanent(String),

    /// Operation timeout with context
    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("Partial failure: {0}")]
    PartialFailure(Box<PartialFailureError>),

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("Analysis failed for {path}: {message}")]
    Analysis { path: String, message: String },

    #[error("Session error: {0}")]
    Session(String),

    /// Run stopped because its session was paused
    #[error("Session paused: {0}")]
    Paused(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Git error: {0}")]
    Git(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// Completed run that breached the configured severity gate
    #[error("Quality gate failed: {0}")]
    QualityGate(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ValidationError> for ReviewError {
    fn from(err: ValidationError) -> Self {
        ReviewError::Validation(err)
    }
}

impl From<PartialFailureError> for ReviewError {
    fn from(err: PartialFailureError) -> Self {
        ReviewError::PartialFailure(Box::new(err))
    }
}

impl From<tokio::task::JoinError> for ReviewError {
    fn from(err: tokio::task::JoinError) -> Self {
        ReviewError::Internal(format!("task join failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, ReviewError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl ReviewError {
    /// Create a validation error from a message
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::from_message(message))
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a per-file analysis error
    pub fn analysis(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Analysis {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Classify this error for retry decisions
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Io(_) | Self::Timeout { .. } | Self::Transient(_) | Self::Pool(_) => {
                ErrorClass::Transient
            }
            Self::Validation(_)
            | Self::Permanent(_)
            | Self::Json(_)
            | Self::Yaml(_)
            | Self::Config(_)
            | Self::NotFound(_)
            | Self::Analysis { .. }
            | Self::Paused(_)
            | Self::QualityGate(_)
            | Self::PartialFailure(_) => ErrorClass::Permanent,
            Self::Database(_)
            | Self::Session(_)
            | Self::Git(_)
            | Self::Storage(_)
            | Self::Internal(_) => ErrorClass::Unknown,
        }
    }

    /// Check if this error can be retried
    pub fn is_retryable(&self) -> bool {
        self.class().is_retryable()
    }

    /// Borrow the aggregate if this is a partial failure
    pub fn as_partial_failure(&self) -> Option<&PartialFailureError> {
        match self {
            Self::PartialFailure(p) => Some(p),
            _ => None,
        }
    }
}

/// Context extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<C: Into<String>>(self, context: C) -> Result<T>;

    /// Add context using a closure (lazy evaluation)
    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| ReviewError::Storage(format!("{}: {}", context.into(), e)))
    }

    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| ReviewError::Storage(format!("{}: {}", f().into(), e)))
    }
}

// =============================================================================
// Tests
// =============================================================================
