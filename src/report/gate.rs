//! Severity gate for CI
//!
//! A run fails the gate when it found any issue at or above `fail_on`, or
//! more issues in total than `max_issues`.

use serde::Serialize;

use crate::types::{AnalysisResult, IssueSeverity};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QualityGate {
    pub fail_on: Option<IssueSeverity>,
    pub max_issues: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateVerdict {
    pub passed: bool,
    pub message: String,
}

impl GateVerdict {
    /// Process exit code: 0 on pass, 1 on failure
    pub fn exit_code(&self) -> u8 {
        u8::from(!self.passed)
    }
}

impl QualityGate {
    pub fn new(fail_on: Option<IssueSeverity>) -> Self {
        Self {
            fail_on,
            max_issues: None,
        }
    }

    pub fn with_max_issues(mut self, max_issues: Option<usize>) -> Self {
        self.max_issues = max_issues;
        self
    }

    pub fn is_active(&self) -> bool {
        self.fail_on.is_some() || self.max_issues.is_some()
    }

    pub fn evaluate(&self, result: &AnalysisResult) -> GateVerdict {
        let mut reasons = Vec::new();

        if let Some(threshold) = self.fail_on {
            let counts: Vec<String> = IssueSeverity::ALL
                .into_iter()
                .filter(|s| s.is_at_least(threshold))
                .filter_map(|s| match result.count_severity(s) {
                    0 => None,
                    n => Some(format!("{} {}", n, s)),
                })
                .collect();
            if !counts.is_empty() {
                reasons.push(format!(
                    "{} severity issues found (fail-on: {})",
                    counts.join(", "),
                    threshold
                ));
            }
        }

        if let Some(max) = self.max_issues
            && result.total_issues > max
        {
            reasons.push(format!(
                "{} issues exceed the limit of {}",
                result.total_issues, max
            ));
        }

        if reasons.is_empty() {
            GateVerdict {
                passed: true,
                message: format!(
                    "Analysis passed: {} files analyzed, {} issues found, quality score: {:.1}",
                    result.files_analyzed, result.total_issues, result.quality_score
                ),
            }
        } else {
            GateVerdict {
                passed: false,
                message: format!("Analysis failed: {}", reasons.join("; ")),
            }
        }
    }
}
