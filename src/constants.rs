//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Retry-with-backoff defaults for remote-ish calls (pattern store)
pub mod retry {
    /// Additional attempts after the first call
    pub const DEFAULT_MAX_RETRIES: usize = 3;

    /// Delay before the first retry (milliseconds)
    pub const INITIAL_DELAY_MS: u64 = 1_000;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f32 = 2.0;

    /// Upper bound for any single delay (milliseconds)
    pub const MAX_DELAY_MS: u64 = 60_000;
}

/// Session store constants
pub mod session {
    /// Default sessions directory, relative to the working directory
    pub const DEFAULT_SESSIONS_DIR: &str = ".weavereview/sessions";

    /// Subdirectory for on-demand backups
    pub const BACKUPS_DIR: &str = "backups";

    /// Session file extension
    pub const FILE_EXTENSION: &str = "json";

    /// Suffix for in-flight writes before the atomic replace
    pub const TEMP_SUFFIX: &str = "tmp";

    /// Attempts to retry a contended rename
    pub const REPLACE_RETRIES: usize = 2;

    /// Fixed delay between rename attempts (milliseconds)
    pub const REPLACE_RETRY_DELAY_MS: u64 = 100;

    /// Completed sessions kept by default retention
    pub const DEFAULT_KEEP_COMPLETED: usize = 10;

    /// Session files older than this are expired (days)
    pub const DEFAULT_MAX_AGE_DAYS: u64 = 30;

    /// Maximum accepted session id length
    pub const MAX_SESSION_ID_LEN: usize = 128;

    /// Backup timestamp format
    pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
}

/// Checkpoint payload keys in `partial_results`
pub mod checkpoint_keys {
    /// Serialized per-file analyses
    pub const FILE_ANALYSES: &str = "file_analyses";

    /// Pause-time modification timestamps
    pub const FILE_MTIMES: &str = "file_mtimes";

    /// Read and analysis failures of the last run
    pub const FAILED_FILES: &str = "failed_files";
}

/// Worker pool constants
pub mod pool {
    /// Default inner pool size for per-file analysis
    pub const DEFAULT_MAX_WORKERS: usize = 4;

    /// Upper bound accepted by config validation
    pub const MAX_WORKERS_LIMIT: usize = 64;

    /// Bounds for the SQLite connection pool
    pub const MIN_DB_CONNECTIONS: u32 = 2;
    pub const MAX_DB_CONNECTIONS: u32 = 16;

    /// Wait for a pooled connection (seconds)
    pub const DB_CONNECT_TIMEOUT_SECS: u64 = 30;
}

/// Change detection constants
pub mod change {
    /// Timestamp differences at or below this are filesystem jitter (seconds)
    pub const MTIME_TOLERANCE_SECS: f64 = 1.0;
}

/// Quality score constants
pub mod quality {
    /// Score for a run with nothing to analyze
    pub const EMPTY_SCORE: f64 = 100.0;

    /// Score substituted when the scorer fails
    pub const FALLBACK_SCORE: f64 = 50.0;

    /// Weight of average maintainability in the score
    pub const MAINTAINABILITY_WEIGHT: f64 = 0.6;

    /// Weight of the issue penalty component in the score
    pub const ISSUE_WEIGHT: f64 = 0.4;

    /// Per-issue penalty by severity
    pub const CRITICAL_PENALTY: f64 = 10.0;
    pub const HIGH_PENALTY: f64 = 5.0;
    pub const MEDIUM_PENALTY: f64 = 2.0;
    pub const LOW_PENALTY: f64 = 0.5;
}

/// Heuristic analyzer thresholds
pub mod analyzer {
    /// Complexity at or above this is a high severity issue
    pub const COMPLEXITY_HIGH: u32 = 15;

    /// Complexity at or above this is a medium severity issue
    pub const COMPLEXITY_MEDIUM: u32 = 10;

    /// Maximum characters of a secret-looking line kept as snippet
    pub const SECRET_SNIPPET_LEN: usize = 50;
}

/// Pattern learning constants
pub mod patterns {
    /// Minimum confidence for retrieved patterns
    pub const MIN_CONFIDENCE: f64 = 0.5;

    /// Share of names that must follow a convention before it is learned
    pub const CONVENTION_THRESHOLD: f64 = 0.7;

    /// Confidence assigned to newly inferred patterns
    pub const INFERRED_CONFIDENCE: f64 = 0.8;

    /// Examples stored per pattern
    pub const MAX_EXAMPLES: usize = 5;

    /// Default pattern database path
    pub const DEFAULT_DATABASE_PATH: &str = ".weavereview/patterns.db";
}

/// PR mode defaults
pub mod pr {
    pub const DEFAULT_BASE_REF: &str = "origin/main";
    pub const DEFAULT_HEAD_REF: &str = "HEAD";
}

/// Default file selection
pub mod files {
    pub const DEFAULT_INCLUDE: &[&str] = &["*.py", "*.js", "*.ts", "*.tsx", "*.jsx"];

    pub const DEFAULT_EXCLUDE: &[&str] = &[
        "**/node_modules/**",
        "**/.git/**",
        "**/__pycache__/**",
        "**/venv/**",
        "**/.venv/**",
    ];
}
