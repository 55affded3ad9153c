//! SQLite Database
//!
//! One pooled database file holds everything weavereview learns across
//! runs: naming patterns and per-project quality history. The schema is
//! created idempotently and stamped with `user_version`; later versions add
//! their own statements.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::debug;

use crate::constants::pool;
use crate::types::{Result, ResultExt, ReviewError};

pub type SharedDatabase = Arc<Database>;

const SCHEMA: &str = include_str!("schema.sql");

/// Statements that bring a database stamped with `version - 1` up to `version`
const UPGRADES: &[(u32, &str)] = &[
    (1, ""),
    (
        2,
        "CREATE INDEX IF NOT EXISTS idx_patterns_type ON patterns(pattern_type)",
    ),
    (3, ""),
];

fn latest_version() -> u32 {
    UPGRADES.last().map(|(version, _)| *version).unwrap_or(0)
}

/// Connection pool sizing
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_size: u32,
    pub connection_timeout: Duration,
}

impl PoolConfig {
    /// One connection per analysis worker plus one for the orchestrator
    pub fn for_workers(workers: usize) -> Self {
        let wanted = u32::try_from(workers.saturating_add(1)).unwrap_or(u32::MAX);
        Self {
            max_size: wanted.clamp(pool::MIN_DB_CONNECTIONS, pool::MAX_DB_CONNECTIONS),
            connection_timeout: Duration::from_secs(pool::DB_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::for_workers(pool::DEFAULT_MAX_WORKERS)
    }
}

pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// File-backed database; missing parent directories are created
    pub fn open(path: impl AsRef<Path>, config: PoolConfig) -> Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)?;
        }

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;",
            )
        });
        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .map_err(|e| ReviewError::Storage(format!("cannot open {}: {}", path.display(), e)))?;

        debug!(
            "Opened {} with up to {} connections",
            path.display(),
            config.max_size
        );
        Ok(Self { pool })
    }

    /// Private database for tests and throwaway runs.
    ///
    /// Limited to one connection: each `:memory:` connection is its own database.
    pub fn open_in_memory() -> Result<Self> {
        let pool = Pool::builder()
            .max_size(1)
            .build(SqliteConnectionManager::memory())
            .map_err(|e| ReviewError::Storage(format!("cannot open in-memory database: {}", e)))?;
        Ok(Self { pool })
    }

    pub fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Create missing tables, then apply pending upgrades
    pub fn initialize(&self) -> Result<()> {
        let conn = self.conn()?;
        let stamped = stamped_version(&conn);

        conn.execute_batch(SCHEMA)
            .with_context("Failed to create schema")?;

        for (version, sql) in UPGRADES.iter().filter(|(v, _)| *v > stamped) {
            if !sql.is_empty() {
                conn.execute_batch(sql)
                    .with_context_fn(|| format!("Failed to upgrade schema to v{}", version))?;
            }
            debug!("Schema at v{}", version);
        }

        if stamped < latest_version() {
            conn.pragma_update(None, "user_version", latest_version())
                .with_context("Failed to stamp schema version")?;
        }
        Ok(())
    }

    pub fn schema_version(&self) -> Result<u32> {
        Ok(stamped_version(&*self.conn()?))
    }

    /// Run `f` in a transaction, committing only when it returns `Ok`
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

fn stamped_version(conn: &Connection) -> u32 {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap_or(0)
}
