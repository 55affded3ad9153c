//! Analysis Pipeline
//!
//! ```text
//! AnalysisOrchestrator
//!   ├── discovery / change detection
//!   ├── file reads (bounded, isolated per file)
//!   ├── ParallelPhaseExecutor
//!   │     ├── per-file analysis (W workers)
//!   │     └── documentation (whole file set)
//!   └── review → score → summarize → learn patterns
//! ```

pub mod orchestrator;
pub mod parallel;

pub use orchestrator::{AnalysisOrchestrator, RunOptions, RunPhase};
pub use parallel::{ParallelPhaseExecutor, PhaseInput, PhaseOutput, merge_analyses};
