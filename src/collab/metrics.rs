//! Quality score and metrics summary over a set of analyses.

use std::collections::BTreeMap;

use super::{QualityScorer, Summarizer};
use crate::constants::quality::{
    CRITICAL_PENALTY, EMPTY_SCORE, HIGH_PENALTY, ISSUE_WEIGHT, LOW_PENALTY, MAINTAINABILITY_WEIGHT,
    MEDIUM_PENALTY,
};
use crate::types::{FileAnalysis, IssueSeverity, MetricsSummary, Result};

/// `0.6 * avg maintainability + 0.4 * (100 - per-file issue penalty)`
pub struct WeightedQualityScorer;

impl QualityScorer for WeightedQualityScorer {
    fn score(&self, analyses: &[FileAnalysis]) -> Result<f64> {
        if analyses.is_empty() {
            return Ok(EMPTY_SCORE);
        }

        let total_files = analyses.len() as f64;
        let penalty: f64 = analyses
            .iter()
            .flat_map(|a| &a.issues)
            .map(|issue| match issue.severity {
                IssueSeverity::Critical => CRITICAL_PENALTY,
                IssueSeverity::High => HIGH_PENALTY,
                IssueSeverity::Medium => MEDIUM_PENALTY,
                IssueSeverity::Low => LOW_PENALTY,
            })
            .sum::<f64>()
            / total_files;

        let avg_maintainability = analyses
            .iter()
            .map(|a| a.metrics.maintainability_index)
            .sum::<f64>()
            / total_files;

        let score = avg_maintainability * MAINTAINABILITY_WEIGHT
            + (100.0 - penalty.min(100.0)) * ISSUE_WEIGHT;
        Ok(score.clamp(0.0, 100.0))
    }
}

pub struct MetricsSummarizer;

impl Summarizer for MetricsSummarizer {
    fn summarize(&self, analyses: &[FileAnalysis]) -> Result<MetricsSummary> {
        if analyses.is_empty() {
            return Ok(MetricsSummary::empty());
        }

        let total_files = analyses.len();
        let mut by_severity: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_category: BTreeMap<String, usize> = BTreeMap::new();
        for issue in analyses.iter().flat_map(|a| &a.issues) {
            *by_severity.entry(issue.severity.as_str().to_string()).or_default() += 1;
            *by_category.entry(issue.category.as_str().to_string()).or_default() += 1;
        }

        Ok(MetricsSummary {
            total_files,
            total_lines: analyses.iter().map(|a| a.metrics.lines_of_code).sum(),
            average_complexity: analyses
                .iter()
                .map(|a| a.metrics.cyclomatic_complexity as f64)
                .sum::<f64>()
                / total_files as f64,
            average_maintainability: analyses
                .iter()
                .map(|a| a.metrics.maintainability_index)
                .sum::<f64>()
                / total_files as f64,
            total_issues_by_severity: by_severity,
            total_issues_by_category: by_category,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CodeIssue, CodeMetrics, IssueCategory};

    fn analysis(maintainability: f64, severities: &[IssueSeverity]) -> FileAnalysis {
        FileAnalysis {
            file_path: "a.py".to_string(),
            language: "python".to_string(),
            metrics: CodeMetrics {
                cyclomatic_complexity: 2,
                maintainability_index: maintainability,
                lines_of_code: 10,
                comment_ratio: 0.0,
            },
            issues: severities
                .iter()
                .map(|s| CodeIssue {
                    severity: *s,
                    category: IssueCategory::Security,
                    file_path: "a.py".to_string(),
                    line_number: 1,
                    description: String::new(),
                    code_snippet: String::new(),
                    suggestion: None,
                })
                .collect(),
            functions: vec![],
            classes: vec![],
        }
    }

    #[test]
    fn test_score_empty_is_perfect() {
        assert_eq!(WeightedQualityScorer.score(&[]).unwrap(), 100.0);
    }

    #[test]
    fn test_score_weights_issues_per_file() {
        // penalty = (10 + 5) / 2 = 7.5; 0.6 * 80 + 0.4 * 92.5 = 85
        let analyses = [
            analysis(90.0, &[IssueSeverity::Critical]),
            analysis(70.0, &[IssueSeverity::High]),
        ];
        let score = WeightedQualityScorer.score(&analyses).unwrap();
        assert!((score - 85.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_penalty_is_capped() {
        let analyses = [analysis(0.0, &[IssueSeverity::Critical; 20])];
        assert_eq!(WeightedQualityScorer.score(&analyses).unwrap(), 0.0);
    }

    #[test]
    fn test_summary_counts() {
        let analyses = [
            analysis(90.0, &[IssueSeverity::Critical, IssueSeverity::Low]),
            analysis(70.0, &[IssueSeverity::Low]),
        ];
        let summary = MetricsSummarizer.summarize(&analyses).unwrap();
        assert_eq!(summary.total_files, 2);
        assert_eq!(summary.total_lines, 20);
        assert_eq!(summary.average_complexity, 2.0);
        assert_eq!(summary.average_maintainability, 80.0);
        assert_eq!(summary.total_issues_by_severity["low"], 2);
        assert_eq!(summary.total_issues_by_category["security"], 3);
    }

    #[test]
    fn test_summary_empty() {
        assert_eq!(
            MetricsSummarizer.summarize(&[]).unwrap(),
            MetricsSummary::empty()
        );
    }
}
