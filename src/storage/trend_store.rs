//! SQLite-backed quality history
//!
//! Shares the pattern database. Rows are append-only; row id order is the
//! order runs completed in.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params;

use super::database::{Database, SharedDatabase};
use crate::collab::TrendStore;
use crate::types::{QualityTrend, Result};

pub struct SqliteTrendStore {
    db: SharedDatabase,
}

impl SqliteTrendStore {
    /// `db` must already be initialized
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        db.initialize()?;
        Ok(Self::new(db.into()))
    }

    /// Projects with recorded history
    pub async fn projects(&self) -> Result<Vec<String>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
            let conn = db.conn()?;
            let mut stmt =
                conn.prepare("SELECT DISTINCT project_id FROM quality_trends ORDER BY project_id")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            Ok(rows.collect::<std::result::Result<Vec<String>, _>>()?)
        })
        .await?
    }
}

fn trend_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<QualityTrend> {
    let recorded_at: String = row.get(0)?;
    let count = |idx: usize| row.get::<_, i64>(idx).map(|n| n.max(0) as usize);

    Ok(QualityTrend {
        timestamp: DateTime::parse_from_rfc3339(&recorded_at)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default(),
        quality_score: row.get(1)?,
        total_issues: count(2)?,
        critical_issues: count(3)?,
        high_issues: count(4)?,
        files_analyzed: count(5)?,
    })
}

#[async_trait]
impl TrendStore for SqliteTrendStore {
    async fn record_trend(&self, project_id: &str, trend: &QualityTrend) -> Result<()> {
        let db = self.db.clone();
        let project_id = project_id.to_string();
        let trend = trend.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            db.conn()?.execute(
                "INSERT INTO quality_trends
                 (project_id, recorded_at, quality_score, total_issues, critical_issues, high_issues, files_analyzed)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    project_id,
                    trend.timestamp.to_rfc3339(),
                    trend.quality_score.clamp(0.0, 100.0),
                    trend.total_issues as i64,
                    trend.critical_issues as i64,
                    trend.high_issues as i64,
                    trend.files_analyzed as i64,
                ],
            )?;
            tracing::debug!("Recorded quality {:.1} for {}", trend.quality_score, project_id);
            Ok(())
        })
        .await?
    }

    async fn trends(&self, project_id: &str, limit: Option<usize>) -> Result<Vec<QualityTrend>> {
        let db = self.db.clone();
        let project_id = project_id.to_string();
        // SQLite treats a negative LIMIT as unbounded
        let limit = match limit {
            Some(n) if n > 0 => i64::try_from(n).unwrap_or(i64::MAX),
            _ => -1,
        };
        tokio::task::spawn_blocking(move || -> Result<Vec<QualityTrend>> {
            let conn = db.conn()?;
            let mut stmt = conn.prepare(
                "SELECT recorded_at, quality_score, total_issues, critical_issues, high_issues, files_analyzed
                 FROM (
                     SELECT * FROM quality_trends WHERE project_id = ?1
                     ORDER BY id DESC LIMIT ?2
                 )
                 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![project_id, limit], trend_from_row)?;
            Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
        })
        .await?
    }
}
