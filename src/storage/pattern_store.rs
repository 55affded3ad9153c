//! SQLite-backed pattern store
//!
//! Patterns survive between runs, keyed by `pattern_id`. Storing an existing
//! id replaces it. Reviewer feedback nudges confidence toward the observed
//! positive rate.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};

use super::database::{Database, PoolConfig, SharedDatabase};
use crate::collab::PatternStore;
use crate::types::{PatternType, ProjectPattern, Result, ReviewError};

/// Weight of the observed positive rate in a feedback update
const FEEDBACK_WEIGHT: f64 = 0.7;

const SELECT_COLUMNS: &str =
    "pattern_id, project_id, pattern_type, description, examples, confidence, last_updated";

pub struct SqlitePatternStore {
    db: SharedDatabase,
}

impl SqlitePatternStore {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    /// Open (and initialize) a file-backed store
    pub fn open(path: impl AsRef<Path>, pool: PoolConfig) -> Result<Self> {
        let db = Database::open(path, pool)?;
        db.initialize()?;
        Ok(Self::new(db.into()))
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        db.initialize()?;
        Ok(Self::new(db.into()))
    }

    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(db.as_ref())).await?
    }

    /// Record reviewer feedback and return the updated confidence
    pub async fn record_feedback(&self, pattern_id: &str, positive: bool) -> Result<f64> {
        let pattern_id = pattern_id.to_string();
        self.blocking(move |db| {
            db.transaction(|conn| {
                let row: Option<(f64, i64, i64)> = conn
                    .query_row(
                        "SELECT confidence, feedback_count, positive_feedback
                         FROM patterns WHERE pattern_id = ?1",
                        params![pattern_id],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                    )
                    .optional()?;

                let (current, count, positives) =
                    row.ok_or_else(|| ReviewError::NotFound(format!("pattern {}", pattern_id)))?;
                let count = count + 1;
                let positives = positives + i64::from(positive);
                let confidence = feedback_confidence(current, count, positives);

                conn.execute(
                    "UPDATE patterns
                     SET confidence = ?1, feedback_count = ?2, positive_feedback = ?3, last_updated = ?4
                     WHERE pattern_id = ?5",
                    params![
                        confidence,
                        count,
                        positives,
                        Utc::now().to_rfc3339(),
                        pattern_id
                    ],
                )?;
                Ok(confidence)
            })
        })
        .await
    }

    pub async fn delete_pattern(&self, pattern_id: &str) -> Result<bool> {
        let pattern_id = pattern_id.to_string();
        self.blocking(move |db| {
            let affected = db
                .conn()?
                .execute("DELETE FROM patterns WHERE pattern_id = ?1", params![pattern_id])?;
            Ok(affected > 0)
        })
        .await
    }

    /// Pattern count, optionally for one project
    pub async fn pattern_count(&self, project_id: Option<&str>) -> Result<usize> {
        let project_id = project_id.map(str::to_string);
        self.blocking(move |db| {
            let conn = db.conn()?;
            let count: i64 = match project_id {
                Some(id) => conn.query_row(
                    "SELECT COUNT(*) FROM patterns WHERE project_id = ?1",
                    params![id],
                    |row| row.get(0),
                )?,
                None => conn.query_row("SELECT COUNT(*) FROM patterns", [], |row| row.get(0))?,
            };
            Ok(count as usize)
        })
        .await
    }

    pub async fn projects(&self) -> Result<Vec<String>> {
        self.blocking(|db| {
            let conn = db.conn()?;
            let mut stmt =
                conn.prepare("SELECT DISTINCT project_id FROM patterns ORDER BY project_id")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            Ok(rows.collect::<std::result::Result<Vec<String>, _>>()?)
        })
        .await
    }

    /// Remove every pattern of a project, returning how many were deleted
    pub async fn clear_project(&self, project_id: &str) -> Result<usize> {
        let project_id = project_id.to_string();
        self.blocking(move |db| {
            Ok(db
                .conn()?
                .execute("DELETE FROM patterns WHERE project_id = ?1", params![project_id])?)
        })
        .await
    }
}

/// `positive_rate * 0.7 + current * 0.3`, clamped to `[0, 1]`
fn feedback_confidence(current: f64, count: i64, positives: i64) -> f64 {
    if count <= 0 {
        return current;
    }
    let rate = positives as f64 / count as f64;
    (rate * FEEDBACK_WEIGHT + current * (1.0 - FEEDBACK_WEIGHT)).clamp(0.0, 1.0)
}

fn pattern_from_row(row: &Row<'_>) -> rusqlite::Result<ProjectPattern> {
    let pattern_type: String = row.get(2)?;
    let examples: String = row.get(4)?;
    let last_updated: String = row.get(6)?;

    Ok(ProjectPattern {
        pattern_id: row.get(0)?,
        project_id: row.get(1)?,
        pattern_type: pattern_type.parse().unwrap_or(PatternType::Convention),
        description: row.get(3)?,
        examples: serde_json::from_str(&examples).unwrap_or_default(),
        confidence: row.get(5)?,
        last_updated: DateTime::parse_from_rfc3339(&last_updated)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

#[async_trait]
impl PatternStore for SqlitePatternStore {
    async fn retrieve_patterns(
        &self,
        project_id: &str,
        min_confidence: f64,
    ) -> Result<Vec<ProjectPattern>> {
        let project_id = project_id.to_string();
        self.blocking(move |db| {
            let conn = db.conn()?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM patterns
                 WHERE project_id = ?1 AND confidence >= ?2
                 ORDER BY confidence DESC",
                SELECT_COLUMNS
            ))?;
            let rows = stmt.query_map(params![project_id, min_confidence], pattern_from_row)?;
            Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
        })
        .await
    }

    async fn store_pattern(&self, pattern: &ProjectPattern) -> Result<()> {
        if !(0.0..=1.0).contains(&pattern.confidence) {
            return Err(ReviewError::validation(format!(
                "pattern confidence {} outside [0, 1]",
                pattern.confidence
            )));
        }

        let pattern = pattern.clone();
        let examples = serde_json::to_string(&pattern.examples)?;
        self.blocking(move |db| {
            let now = Utc::now().to_rfc3339();
            db.conn()?.execute(
                "INSERT INTO patterns
                 (pattern_id, project_id, pattern_type, description, examples, confidence, created_at, last_updated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(pattern_id) DO UPDATE SET
                    project_id = excluded.project_id,
                    pattern_type = excluded.pattern_type,
                    description = excluded.description,
                    examples = excluded.examples,
                    confidence = excluded.confidence,
                    last_updated = excluded.last_updated",
                params![
                    pattern.pattern_id,
                    pattern.project_id,
                    pattern.pattern_type.as_str(),
                    pattern.description,
                    examples,
                    pattern.confidence,
                    now,
                    pattern.last_updated.to_rfc3339(),
                ],
            )?;
            tracing::debug!("Stored pattern {}", pattern.pattern_id);
            Ok(())
        })
        .await
    }
}
