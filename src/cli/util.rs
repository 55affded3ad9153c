//! CLI Common Utilities
//!
//! Shared context for command handlers: resolved configuration, the session
//! store and a ready-to-run orchestrator.

use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use crate::collab::{
    Collaborators, MemoryPatternStore, MemoryTrendStore, SharedPatternStore, SharedTrendStore,
};
use crate::config::{Config, ConfigLoader};
use crate::pipeline::AnalysisOrchestrator;
use crate::session::SessionStore;
use crate::storage::{Database, PoolConfig, SqlitePatternStore, SqliteTrendStore};
use crate::types::Result;

/// Command execution context
#[derive(Clone)]
pub struct CommandContext {
    pub config: Config,
    pub store: Arc<SessionStore>,
}

impl CommandContext {
    /// Resolve settings from `config_file`, or the layered chain when absent
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let config = match config_file {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load()?,
        };
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: Config) -> Self {
        let store = Arc::new(SessionStore::new(&config.session.sessions_dir));
        Self { config, store }
    }

    /// Override the inner pool size for this invocation
    pub fn with_workers(mut self, workers: Option<usize>) -> Result<Self> {
        if let Some(workers) = workers {
            self.config.pool.max_workers = workers;
            self.config.validate()?;
        }
        Ok(self)
    }

    /// Orchestrator over the local collaborators and the SQLite stores
    pub fn orchestrator(&self) -> AnalysisOrchestrator {
        let (patterns, trends) = self.stores();
        let collaborators = Collaborators::local(patterns).with_trends(trends);
        AnalysisOrchestrator::new(self.store.clone(), collaborators, &self.config)
    }

    /// Patterns and quality history share one database. Both are
    /// enhancements; an unusable database falls back to memory.
    fn stores(&self) -> (SharedPatternStore, SharedTrendStore) {
        let path = &self.config.patterns.database_path;
        let opened = Database::open(path, PoolConfig::for_workers(self.config.pool.max_workers))
            .and_then(|db| db.initialize().map(|()| Arc::new(db)));

        match opened {
            Ok(db) => (
                Arc::new(SqlitePatternStore::new(db.clone())),
                Arc::new(SqliteTrendStore::new(db)),
            ),
            Err(e) => {
                warn!(
                    "Database {} unavailable, patterns and quality history will not persist: {}",
                    path.display(),
                    e
                );
                (
                    Arc::new(MemoryPatternStore::new()),
                    Arc::new(MemoryTrendStore::new()),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.session.sessions_dir = dir.path().join("sessions");
        config.patterns.database_path = dir.path().join("patterns.db");
        config
    }

    #[test]
    fn test_worker_override_is_validated() {
        let dir = TempDir::new().unwrap();
        let ctx = CommandContext::from_config(config_in(&dir));

        let ctx = ctx.with_workers(Some(8)).unwrap();
        assert_eq!(ctx.config.pool.max_workers, 8);
        assert!(ctx.clone().with_workers(Some(0)).is_err());
        assert_eq!(ctx.with_workers(None).unwrap().config.pool.max_workers, 8);
    }

    #[tokio::test]
    async fn test_orchestrator_runs_with_sqlite_patterns() {
        let dir = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        std::fs::write(project.path().join("app.py"), "def run_app():\n    pass\n").unwrap();

        let ctx = CommandContext::from_config(config_in(&dir));
        let result = ctx
            .orchestrator()
            .run(
                crate::types::AnalysisConfig::new(project.path()),
                Default::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.files_analyzed, 1);
        assert!(dir.path().join("patterns.db").exists());

        let history = ctx
            .orchestrator()
            .quality_trends(&result.project_id, None)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_unusable_database_falls_back_to_memory() {
        let dir = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        std::fs::write(project.path().join("app.py"), "x = 1\n").unwrap();

        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let mut config = config_in(&dir);
        config.patterns.database_path = blocker.join("patterns.db");

        let result = CommandContext::from_config(config)
            .orchestrator()
            .run(
                crate::types::AnalysisConfig::new(project.path()),
                Default::default(),
            )
            .await
            .unwrap();
        assert_eq!(result.files_analyzed, 1);
    }
}
