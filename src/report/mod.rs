//! Report Rendering
//!
//! Turns an `AnalysisResult` into the formats CI systems and reviewers read:
//!
//! - `sarif`: SARIF 2.1.0 for code scanning dashboards
//! - `markdown`: a review report for pull request comments
//! - `gate`: a pass/fail verdict from a severity threshold

pub mod gate;
pub mod markdown;
pub mod sarif;

pub use gate::{GateVerdict, QualityGate};
pub use markdown::review_report;
pub use sarif::{to_sarif, to_sarif_string};

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::Utc;

    use crate::types::{
        AnalysisResult, CodeIssue, CodeMetrics, Documentation, FileAnalysis, IssueCategory,
        IssueSeverity, MetricsSummary,
    };

    /// A result for `/work/shop` with one issue per severity, all in `src/app.py`
    pub fn result_with(severities: &[IssueSeverity]) -> AnalysisResult {
        let issues: Vec<CodeIssue> = severities
            .iter()
            .map(|&severity| CodeIssue {
                severity,
                category: match severity {
                    IssueSeverity::Critical | IssueSeverity::High => IssueCategory::Security,
                    IssueSeverity::Medium => IssueCategory::Complexity,
                    IssueSeverity::Low => IssueCategory::Style,
                },
                file_path: "/work/shop/src/app.py".to_string(),
                line_number: 3,
                description: format!("{} finding", severity),
                code_snippet: "query = base + name".to_string(),
                suggestion: None,
            })
            .collect();

        AnalysisResult {
            session_id: "s1".to_string(),
            project_id: "shop".to_string(),
            timestamp: Utc::now(),
            codebase_path: "/work/shop".to_string(),
            files_analyzed: 1,
            total_issues: issues.len(),
            quality_score: 72.5,
            file_analyses: vec![FileAnalysis {
                file_path: "/work/shop/src/app.py".to_string(),
                language: "python".to_string(),
                metrics: CodeMetrics {
                    cyclomatic_complexity: 4,
                    maintainability_index: 70.0,
                    lines_of_code: 40,
                    comment_ratio: 0.1,
                },
                issues,
                functions: vec![],
                classes: vec![],
            }],
            suggestions: vec![],
            documentation: Documentation::default(),
            metrics_summary: MetricsSummary::default(),
            failed_files: vec![],
        }
    }
}
