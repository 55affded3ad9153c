//! WeaveReview - Resumable Code Analysis Engine
//!
//! Orchestrates a multi-phase analysis of a codebase: discovery, per-file
//! analysis, documentation, review and scoring. Runs are persisted as
//! sessions so they can be paused, resumed and recovered.
//!
//! ## Core Features
//!
//! - **Sessions**: atomic JSON checkpoints with pause/resume and crash recovery
//! - **Change Detection**: files edited during a pause are re-analyzed
//! - **Parallel Phases**: analysis and documentation never block each other
//! - **Failure Isolation**: one bad file never aborts a run
//! - **Pluggable Collaborators**: analyzers, reviewers and pattern stores are injected
//! - **Quality History**: each completed run is recorded and compared with the previous one
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use weavereview::{AnalysisConfig, AnalysisOrchestrator, Collaborators, Config, RunOptions, SessionStore};
//!
//! let config = Config::default();
//! let store = Arc::new(SessionStore::new(&config.session.sessions_dir));
//! let orchestrator = AnalysisOrchestrator::new(store, Collaborators::in_memory(), &config);
//! let result = orchestrator
//!     .run(AnalysisConfig::new("./src"), RunOptions::default())
//!     .await?;
//! println!("quality {:.1}", result.quality_score);
//! ```
//!
//! ## Modules
//!
//! - [`resilience`]: retry policy, graceful degradation, input validation
//! - [`session`]: session persistence and change detection
//! - [`pipeline`]: parallel phase executor and orchestrator
//! - [`collab`]: collaborator contracts and local implementations
//! - [`storage`]: SQLite pattern and quality history stores with connection pooling
//! - [`report`]: SARIF, markdown and severity gate output for CI
//! - [`config`]: layered settings

pub mod cli;
pub mod collab;
pub mod config;
pub mod constants;
pub mod pipeline;
pub mod report;
pub mod resilience;
pub mod session;
pub mod storage;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};

pub use types::error::{ErrorClass, PartialFailureError, Result, ResultExt, ReviewError};
pub use types::{AnalysisConfig, AnalysisResult, FileAnalysis};

pub use storage::{Database, PoolConfig, SharedDatabase, SqlitePatternStore, SqliteTrendStore};

// =============================================================================
// Engine Re-exports
// =============================================================================

pub use collab::Collaborators;
pub use report::{GateVerdict, QualityGate};
pub use pipeline::{AnalysisOrchestrator, ParallelPhaseExecutor, RunOptions, RunPhase};
pub use resilience::{GracefulDegradation, RetryPolicy};
pub use session::{ChangeDetector, SessionState, SessionStatus, SessionStore};
