//! Resilience Primitives
//!
//! - [`retry`]: bounded exponential backoff as a policy object
//! - [`degradation`]: per-item failure isolation with aggregate partial failures
//! - [`validate`]: fail-fast input validation

pub mod degradation;
pub mod retry;
pub mod validate;

pub use degradation::{BatchOutcome, GracefulDegradation, PartialReport, error_summary};
pub use retry::{RetryPolicy, retry_with_backoff};
pub use validate::{validate_file_patterns, validate_session_id, validate_target_dir};
