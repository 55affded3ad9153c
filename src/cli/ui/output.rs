use console::style;

use crate::resilience::error_summary;
use crate::session::{SessionHealth, SessionState, SessionStatus};
use crate::types::{AnalysisResult, FailedItem, QualityComparison, QualityTrend};

/// Suggestions shown in the text report
const TOP_SUGGESTIONS: usize = 5;

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        eprintln!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    fn field(&self, label: &str, value: impl std::fmt::Display) {
        println!("  {:<16} {}", style(label).dim(), value);
    }

    pub fn analysis_result(&self, result: &AnalysisResult) {
        self.header("Analysis Report");
        self.field("Session", &result.session_id);
        self.field("Codebase", &result.codebase_path);
        self.field("Files analyzed", result.files_analyzed);
        self.field("Issues", result.total_issues);
        self.field("Quality score", score_style(result.quality_score));

        let summary = &result.metrics_summary;
        self.section("Metrics");
        self.field("Lines", summary.total_lines);
        self.field("Avg complexity", format!("{:.1}", summary.average_complexity));
        self.field(
            "Maintainability",
            format!("{:.1}", summary.average_maintainability),
        );
        for (severity, count) in &summary.total_issues_by_severity {
            self.field(severity, count);
        }

        if !result.suggestions.is_empty() {
            self.section("Top Suggestions");
            for suggestion in result.suggestions.iter().take(TOP_SUGGESTIONS) {
                println!(
                    "  [P{}] {} {}",
                    suggestion.priority,
                    style(&suggestion.category).cyan(),
                    suggestion.title
                );
            }
            if result.suggestions.len() > TOP_SUGGESTIONS {
                println!(
                    "  {}",
                    style(format!(
                        "... and {} more",
                        result.suggestions.len() - TOP_SUGGESTIONS
                    ))
                    .dim()
                );
            }
        }

        if !result.failed_files.is_empty() {
            self.failures(&result.failed_files);
        }
    }

    pub fn comparison(&self, comparison: &QualityComparison) {
        self.section("Since Last Run");
        self.field(
            "Quality score",
            format!(
                "{:.1} -> {:.1} ({:+.1}, {:+.1}%)",
                comparison.previous_score,
                comparison.current_score,
                comparison.score_delta,
                comparison.improvement_percentage
            ),
        );
        self.field("Issues", format!("{:+}", comparison.issues_delta));
        self.field(
            "Critical issues",
            format!("{:+}", comparison.critical_issues_delta),
        );
        if comparison.improved() {
            self.success("Quality improved");
        } else if comparison.score_delta < 0.0 {
            self.warning("Quality declined");
        }
    }

    pub fn trends(&self, project_id: &str, trends: &[QualityTrend]) {
        self.header(&format!("Quality history for {}", project_id));
        if trends.is_empty() {
            self.info("No completed runs recorded");
            return;
        }
        println!(
            "  {:<17} {:>10} {:>7} {:>9} {:>6} {:>6}",
            style("Recorded").dim(),
            style("Score").dim(),
            style("Issues").dim(),
            style("Critical").dim(),
            style("High").dim(),
            style("Files").dim()
        );
        for trend in trends {
            println!(
                "  {:<17} {:>10} {:>7} {:>9} {:>6} {:>6}",
                trend.timestamp.format("%Y-%m-%d %H:%M"),
                score_style(trend.quality_score),
                trend.total_issues,
                trend.critical_issues,
                trend.high_issues,
                trend.files_analyzed
            );
        }
    }

    pub fn failures(&self, failures: &[FailedItem]) {
        self.warning(&format!("{} file(s) could not be processed", failures.len()));
        for line in error_summary(failures).lines() {
            eprintln!("    {}", line);
        }
    }

    pub fn session(&self, state: &SessionState) {
        self.header(&format!("Session {}", state.session_id));
        self.field("Status", status_style(state.status));
        self.field("Target", state.config.target_path.display());
        self.field("Processed", state.processed_files.len());
        self.field("Pending", state.pending_files.len());
        self.field(
            "Checkpoint",
            state.checkpoint_time.format("%Y-%m-%d %H:%M:%S UTC"),
        );
        if !state.partial_results.failures().is_empty() {
            self.field("Failed files", state.partial_results.failures().len());
        }
    }

    pub fn session_row(&self, state: &SessionState) {
        println!(
            "  {:<38} {:<20} {:>5}/{:<5} {}",
            state.session_id,
            status_style(state.status),
            state.processed_files.len(),
            state.processed_files.len() + state.pending_files.len(),
            state.checkpoint_time.format("%Y-%m-%d %H:%M")
        );
    }

    pub fn health(&self, session_id: &str, health: &SessionHealth) {
        self.header(&format!("Session {} health", session_id));
        if !health.exists {
            self.error("Session not found");
            return;
        }

        if health.valid {
            self.success("Record is valid");
        } else if let Some(error) = &health.error {
            self.error(error);
        }
        if let Some(status) = health.status {
            self.field("Status", status_style(status));
        }
        self.field("Progress", format!("{:.1}%", health.progress * 100.0));
        self.field("Processed", health.processed_count);
        self.field("Pending", health.pending_count);
        if let Some(at) = health.last_checkpoint {
            self.field("Checkpoint", at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        if !health.missing_files.is_empty() {
            self.warning(&format!(
                "{} tracked file(s) no longer exist",
                health.missing_files.len()
            ));
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

fn score_style(score: f64) -> console::StyledObject<String> {
    let text = format!("{:.1}/100", score);
    match score {
        s if s >= 80.0 => style(text).green(),
        s if s >= 60.0 => style(text).yellow(),
        _ => style(text).red(),
    }
}

fn status_style(status: SessionStatus) -> console::StyledObject<&'static str> {
    let text = status.as_str();
    match status {
        SessionStatus::Running => style(text).blue(),
        SessionStatus::Paused => style(text).yellow(),
        SessionStatus::Completed => style(text).green(),
        SessionStatus::Failed => style(text).red(),
    }
}
