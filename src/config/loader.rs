//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/weavereview/config.toml)
//! 3. Project config (.weavereview/config.toml)
//! 4. Environment variables (WEAVEREVIEW_* prefix)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::types::Config;
use crate::types::{AnalysisConfig, Result, ReviewError};

pub const ENV_PREFIX: &str = "WEAVEREVIEW_";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        Self::load_layers(
            Self::global_config_path().as_deref(),
            &Self::project_config_path(),
        )
    }

    /// Resolve the chain with explicit file locations
    pub fn load_layers(global: Option<&Path>, project: &Path) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = global
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(global_path));
        }

        if project.exists() {
            debug!("Loading project config from: {}", project.display());
            figment = figment.merge(Toml::file(project));
        }

        // e.g. WEAVEREVIEW_LOGGING_LEVEL -> logging.level
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split('_').lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| ReviewError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| ReviewError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Effective configuration as TOML, or JSON when `as_json`
    pub fn render(config: &Config, as_json: bool) -> Result<String> {
        if as_json {
            return Ok(serde_json::to_string_pretty(config)?);
        }
        toml::to_string_pretty(config).map_err(|e| ReviewError::Config(e.to_string()))
    }

    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/weavereview/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("weavereview"))
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    /// Get project data directory
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".weavereview")
    }
}

/// Load an [`AnalysisConfig`] from YAML; `target` fills a missing `target_path`
pub fn load_analysis_config(path: &Path, target: &Path) -> Result<AnalysisConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ReviewError::Config(format!("Cannot read {}: {}", path.display(), e))
    })?;

    let mut mapping = match serde_yaml::from_str::<serde_yaml::Value>(&content)? {
        serde_yaml::Value::Mapping(mapping) => mapping,
        serde_yaml::Value::Null => serde_yaml::Mapping::new(),
        _ => {
            return Err(ReviewError::Config(format!(
                "{} must contain a mapping",
                path.display()
            )));
        }
    };

    let key = serde_yaml::Value::from("target_path");
    if !mapping.contains_key(&key) {
        mapping.insert(
            key,
            serde_yaml::Value::from(target.to_string_lossy().to_string()),
        );
    }

    Ok(serde_yaml::from_value(serde_yaml::Value::Mapping(mapping))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AnalysisDepth;
    use tempfile::TempDir;

    #[test]
    fn test_load_layers_project_overrides_global() {
        let dir = TempDir::new().unwrap();
        let global = dir.path().join("global.toml");
        let project = dir.path().join("project.toml");
        std::fs::write(&global, "[pool]\nmax_workers = 2\n\n[pr]\nbase_ref = \"origin/dev\"\n").unwrap();
        std::fs::write(&project, "[pool]\nmax_workers = 6\n").unwrap();

        let config = ConfigLoader::load_layers(Some(&global), &project).unwrap();
        assert_eq!(config.pool.max_workers, 6);
        assert_eq!(config.pr.base_ref, "origin/dev");
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn test_missing_files_use_defaults() {
        let dir = TempDir::new().unwrap();
        let config =
            ConfigLoader::load_layers(None, &dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[pool]\nmax_workers = 0\n").unwrap();

        assert!(matches!(
            ConfigLoader::load_from_file(&path),
            Err(ReviewError::Config(_))
        ));
    }

    #[test]
    fn test_rendered_toml_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.pool.max_workers = 12;
        config.pr.base_ref = "origin/develop".to_string();

        std::fs::write(&path, ConfigLoader::render(&config, false).unwrap()).unwrap();
        assert_eq!(ConfigLoader::load_from_file(&path).unwrap(), config);

        let json = ConfigLoader::render(&config, true).unwrap();
        assert!(json.contains("\"max_workers\": 12"));
    }

    #[test]
    fn test_analysis_config_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("analysis.yaml");
        std::fs::write(&path, "file_patterns: ['*.py']\nanalysis_depth: deep\n").unwrap();

        let config = load_analysis_config(&path, Path::new("/work/project")).unwrap();
        assert_eq!(config.target_path, PathBuf::from("/work/project"));
        assert_eq!(config.file_patterns, vec!["*.py"]);
        assert_eq!(config.analysis_depth, AnalysisDepth::Deep);
        assert!(!config.exclude_patterns.is_empty());
    }

    #[test]
    fn test_analysis_config_empty_and_invalid() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty.yaml");
        std::fs::write(&empty, "").unwrap();
        let config = load_analysis_config(&empty, Path::new("/p")).unwrap();
        assert_eq!(config.target_path, PathBuf::from("/p"));

        let list = dir.path().join("list.yaml");
        std::fs::write(&list, "- a\n- b\n").unwrap();
        assert!(matches!(
            load_analysis_config(&list, Path::new("/p")),
            Err(ReviewError::Config(_))
        ));
    }
}
