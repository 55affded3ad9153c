//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/weavereview/config.toml)
//! 3. Project config (.weavereview/config.toml)
//! 4. Environment variables (WEAVEREVIEW_*)
//! 5. CLI arguments (highest priority)
//!
//! Per-run file selection ([`crate::types::AnalysisConfig`]) is read from YAML
//! by [`load_analysis_config`].

mod loader;
mod types;

pub use loader::{ConfigLoader, ENV_PREFIX, load_analysis_config};
pub use types::*;
