//! Naming-convention inference and an in-memory pattern store.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use super::PatternStore;
use crate::constants::patterns::{CONVENTION_THRESHOLD, INFERRED_CONFIDENCE, MAX_EXAMPLES};
use crate::types::{FileAnalysis, PatternType, ProjectPattern, Result};

pub const FUNCTION_SNAKE_CASE_SUFFIX: &str = "_function_snake_case";
pub const CLASS_PASCAL_CASE_SUFFIX: &str = "_class_pascal_case";

/// Conventions followed by more than the threshold share of names,
/// skipping patterns already in `existing`
pub fn infer_patterns(
    project_id: &str,
    analyses: &[FileAnalysis],
    existing: &[ProjectPattern],
) -> Vec<ProjectPattern> {
    let functions: Vec<&str> = analyses
        .iter()
        .flat_map(|a| &a.functions)
        .map(|f| f.name.as_str())
        .filter(|n| !n.is_empty() && !n.starts_with('_'))
        .collect();
    let classes: Vec<&str> = analyses
        .iter()
        .flat_map(|a| &a.classes)
        .map(|c| c.name.as_str())
        .filter(|n| !n.is_empty())
        .collect();

    let candidates = [
        (
            FUNCTION_SNAKE_CASE_SUFFIX,
            "Functions use snake_case naming convention",
            &functions,
            (|n: &str| n.contains('_')) as fn(&str) -> bool,
        ),
        (
            CLASS_PASCAL_CASE_SUFFIX,
            "Classes use PascalCase naming convention",
            &classes,
            (|n: &str| n.chars().next().is_some_and(|c| c.is_uppercase())) as fn(&str) -> bool,
        ),
    ];

    candidates
        .into_iter()
        .filter_map(|(suffix, description, names, follows)| {
            if names.is_empty() {
                return None;
            }
            let share = names.iter().filter(|n| follows(n)).count() as f64 / names.len() as f64;
            if share <= CONVENTION_THRESHOLD {
                return None;
            }
            let pattern_id = format!("{}{}", project_id, suffix);
            if existing.iter().any(|p| p.pattern_id == pattern_id) {
                return None;
            }
            Some(ProjectPattern {
                pattern_id,
                project_id: project_id.to_string(),
                pattern_type: PatternType::Naming,
                description: description.to_string(),
                examples: names.iter().take(MAX_EXAMPLES).map(|n| n.to_string()).collect(),
                confidence: INFERRED_CONFIDENCE,
                last_updated: Utc::now(),
            })
        })
        .collect()
}

/// Process-local pattern store
#[derive(Default)]
pub struct MemoryPatternStore {
    patterns: DashMap<String, ProjectPattern>,
}

impl MemoryPatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[async_trait]
impl PatternStore for MemoryPatternStore {
    async fn retrieve_patterns(
        &self,
        project_id: &str,
        min_confidence: f64,
    ) -> Result<Vec<ProjectPattern>> {
        let mut found: Vec<ProjectPattern> = self
            .patterns
            .iter()
            .filter(|p| p.project_id == project_id && p.confidence >= min_confidence)
            .map(|p| p.value().clone())
            .collect();
        found.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Ok(found)
    }

    async fn store_pattern(&self, pattern: &ProjectPattern) -> Result<()> {
        self.patterns
            .insert(pattern.pattern_id.clone(), pattern.clone());
        Ok(())
    }
}
