//! In-memory quality history.

use async_trait::async_trait;
use dashmap::DashMap;

use super::TrendStore;
use crate::types::{QualityTrend, Result};

/// Process-local trend store
#[derive(Default)]
pub struct MemoryTrendStore {
    trends: DashMap<String, Vec<QualityTrend>>,
}

impl MemoryTrendStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrendStore for MemoryTrendStore {
    async fn record_trend(&self, project_id: &str, trend: &QualityTrend) -> Result<()> {
        self.trends
            .entry(project_id.to_string())
            .or_default()
            .push(trend.clone());
        Ok(())
    }

    async fn trends(&self, project_id: &str, limit: Option<usize>) -> Result<Vec<QualityTrend>> {
        let Some(history) = self.trends.get(project_id) else {
            return Ok(Vec::new());
        };
        let skip = match limit {
            Some(n) if n > 0 => history.len().saturating_sub(n),
            _ => 0,
        };
        Ok(history[skip..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn trend(score: f64) -> QualityTrend {
        QualityTrend {
            timestamp: Utc::now(),
            quality_score: score,
            total_issues: 0,
            critical_issues: 0,
            high_issues: 0,
            files_analyzed: 1,
        }
    }

    #[tokio::test]
    async fn test_limit_keeps_most_recent_oldest_first() {
        let store = MemoryTrendStore::new();
        for score in [60.0, 70.0, 80.0] {
            store.record_trend("proj", &trend(score)).await.unwrap();
        }

        let scores = |t: Vec<QualityTrend>| t.iter().map(|t| t.quality_score).collect::<Vec<_>>();
        assert_eq!(scores(store.trends("proj", Some(2)).await.unwrap()), vec![70.0, 80.0]);
        assert_eq!(scores(store.trends("proj", None).await.unwrap()).len(), 3);
        assert!(store.trends("other", None).await.unwrap().is_empty());
    }
}
