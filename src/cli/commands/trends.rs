//! Trends Command
//!
//! Quality history recorded by completed runs of one project.

use std::path::Path;

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::types::{QualityComparison, Result};

pub async fn run(
    settings: Option<&Path>,
    project_id: &str,
    limit: Option<usize>,
    format: &str,
) -> Result<()> {
    let ctx = CommandContext::load(settings)?;
    let orchestrator = ctx.orchestrator();
    let trends = orchestrator.quality_trends(project_id, limit).await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&trends)?);
        return Ok(());
    }

    let output = Output::new();
    output.trends(project_id, &trends);
    if let [.., previous, latest] = trends.as_slice() {
        output.comparison(&QualityComparison::between(previous, latest));
    }
    Ok(())
}
