//! Analyze Command
//!
//! Runs a fresh analysis over a directory, or resumes a paused one, prints
//! the report and applies the severity gate.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::config::{GateConfig, load_analysis_config};
use crate::pipeline::{AnalysisOrchestrator, RunOptions};
use crate::report::{QualityGate, review_report, to_sarif_string};
use crate::resilience::PartialReport;
use crate::types::{AnalysisConfig, AnalysisResult, IssueSeverity, Result, ReviewError};

pub struct AnalyzeOptions {
    pub path: PathBuf,
    pub session_id: Option<String>,
    pub project_id: Option<String>,
    pub pr_mode: bool,
    /// YAML analysis config (patterns, excludes, depth)
    pub config_file: Option<PathBuf>,
    pub workers: Option<usize>,
    pub format: String,
    pub gate: GateOptions,
}

/// Gate thresholds from the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct GateOptions {
    pub fail_on: Option<IssueSeverity>,
    pub max_issues: Option<usize>,
}

impl GateOptions {
    /// Flags win over `[gate]` settings. PR mode fails on critical issues
    /// unless a threshold is set either way.
    pub fn resolve(self, config: &GateConfig, pr_mode: bool) -> QualityGate {
        let fail_on = self
            .fail_on
            .or(config.fail_on)
            .or(pr_mode.then_some(IssueSeverity::Critical));
        QualityGate::new(fail_on).with_max_issues(self.max_issues.or(config.max_issues))
    }
}

pub async fn run(settings: Option<&Path>, options: AnalyzeOptions) -> Result<()> {
    let ctx = CommandContext::load(settings)?.with_workers(options.workers)?;
    let output = Output::new();
    let gate = options.gate.resolve(&ctx.config.gate, options.pr_mode);

    let config = match &options.config_file {
        Some(file) => load_analysis_config(file, &options.path)?,
        None => AnalysisConfig::new(&options.path),
    };

    // Known up front so a failed run can still be reported and resumed
    let session_id = options
        .session_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let mut run_options = RunOptions::default()
        .with_session_id(&session_id)
        .with_pr_mode(options.pr_mode);
    run_options.project_id = options.project_id;

    if options.format == "text" {
        output.info(&format!(
            "Analyzing {} (session {}, {} workers)",
            config.target_path.display(),
            session_id,
            ctx.config.pool.max_workers
        ));
    }

    let orchestrator = ctx.orchestrator();
    let outcome = orchestrator.run(config, run_options).await;
    finish(&orchestrator, &output, &session_id, outcome, &options.format, gate).await
}

pub async fn resume(
    settings: Option<&Path>,
    session_id: &str,
    project_id: Option<String>,
    format: &str,
    gate: GateOptions,
) -> Result<()> {
    let ctx = CommandContext::load(settings)?;
    let output = Output::new();
    let gate = gate.resolve(&ctx.config.gate, false);

    if format == "text" {
        output.info(&format!("Resuming session {}", session_id));
    }

    let orchestrator = ctx.orchestrator();
    let outcome = orchestrator.resume(session_id, project_id).await;
    finish(&orchestrator, &output, session_id, outcome, format, gate).await
}

/// Report in the requested format
pub fn render(result: &AnalysisResult, format: &str) -> Result<Option<String>> {
    Ok(match format {
        "json" => Some(serde_json::to_string_pretty(result)?),
        "sarif" => Some(to_sarif_string(result)?),
        "markdown" => Some(review_report(result)),
        _ => None,
    })
}

async fn finish(
    orchestrator: &AnalysisOrchestrator,
    output: &Output,
    session_id: &str,
    outcome: Result<AnalysisResult>,
    format: &str,
    gate: QualityGate,
) -> Result<()> {
    let text_output = format == "text";

    match outcome {
        Ok(result) => {
            match render(&result, format)? {
                Some(rendered) => println!("{}", rendered),
                None => {
                    output.analysis_result(&result);
                    match orchestrator.quality_comparison(&result).await {
                        Ok(Some(comparison)) => output.comparison(&comparison),
                        Ok(None) => {}
                        Err(e) => tracing::warn!("Quality history unavailable: {}", e),
                    }
                    output.success("Analysis complete");
                }
            }

            let verdict = gate.evaluate(&result);
            if !verdict.passed {
                return Err(ReviewError::QualityGate(verdict.message));
            }
            if gate.is_active() && text_output {
                output.success(&verdict.message);
            }
            Ok(())
        }
        Err(ReviewError::Paused(_)) => {
            output.warning(&format!(
                "Session {} was paused. Continue with: weavereview resume {}",
                session_id, session_id
            ));
            Ok(())
        }
        Err(e) => {
            if let Some(partial) = e.as_partial_failure() {
                if text_output {
                    output.failures(&partial.failed_items);
                } else {
                    let report = PartialReport::from_error(session_id, &e);
                    eprintln!("{}", serde_json::to_string_pretty(&report)?);
                }
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;

    #[test]
    fn test_gate_flags_override_settings() {
        let settings = GateConfig {
            fail_on: Some(IssueSeverity::Low),
            max_issues: Some(10),
        };

        let gate = GateOptions::default().resolve(&settings, false);
        assert_eq!(gate.fail_on, Some(IssueSeverity::Low));
        assert_eq!(gate.max_issues, Some(10));

        let flags = GateOptions {
            fail_on: Some(IssueSeverity::High),
            max_issues: None,
        };
        let gate = flags.resolve(&settings, true);
        assert_eq!(gate.fail_on, Some(IssueSeverity::High));
        assert_eq!(gate.max_issues, Some(10));
    }

    #[test]
    fn test_pr_mode_defaults_to_critical() {
        let none = GateConfig::default();
        assert_eq!(
            GateOptions::default().resolve(&none, true).fail_on,
            Some(IssueSeverity::Critical)
        );
        assert!(!GateOptions::default().resolve(&none, false).is_active());
    }

    #[test]
    fn test_render_formats() {
        let result = crate::report::fixtures::result_with(&[IssueSeverity::High]);

        let json = render(&result, "json").unwrap().unwrap();
        assert!(json.contains("\"session_id\": \"s1\""));
        let sarif = render(&result, "sarif").unwrap().unwrap();
        assert!(sarif.contains("\"version\": \"2.1.0\""));
        let markdown = render(&result, "markdown").unwrap().unwrap();
        assert!(markdown.starts_with("# Code Review Report"));
        assert!(render(&result, "text").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_gate_is_an_error() {
        let dir = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        std::fs::write(
            project.path().join("db.py"),
            "def find(cursor, name):\n    cursor.execute(\"SELECT * FROM users WHERE name = '\" + name + \"'\")\n",
        )
        .unwrap();

        let mut config = Config::default();
        config.session.sessions_dir = dir.path().join("sessions");
        config.patterns.database_path = dir.path().join("patterns.db");
        let ctx = CommandContext::from_config(config);
        let orchestrator = ctx.orchestrator();
        let outcome = orchestrator
            .run(AnalysisConfig::new(project.path()), RunOptions::default())
            .await;
        let result = outcome.as_ref().unwrap().clone();
        assert!(result.count_severity(IssueSeverity::Critical) > 0);

        let gate = QualityGate::new(Some(IssueSeverity::Critical));
        let err = finish(&orchestrator, &Output::new(), &result.session_id, outcome, "json", gate)
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::QualityGate(msg) if msg.contains("critical")));
    }
}
