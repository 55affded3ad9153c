//! Markdown review report

use std::collections::BTreeMap;
use std::fmt::{self, Write};

use crate::types::{AnalysisResult, IssueSeverity, Suggestion};

const TOP_PRIORITY: u8 = 2;
const MAX_TOP_SUGGESTIONS: usize = 10;
const MAX_PER_CATEGORY: usize = 5;

pub fn review_report(result: &AnalysisResult) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = write_report(&mut out, result);
    out
}

fn write_report(out: &mut String, result: &AnalysisResult) -> fmt::Result {
    writeln!(out, "# Code Review Report")?;
    writeln!(out)?;
    writeln!(
        out,
        "**Generated:** {}",
        result.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(out, "**Quality Score:** {:.1}/100", result.quality_score)?;
    writeln!(out)?;

    writeln!(out, "## Summary")?;
    writeln!(out)?;
    writeln!(out, "- **Files Analyzed:** {}", result.files_analyzed)?;
    writeln!(out, "- **Total Issues:** {}", result.total_issues)?;
    writeln!(out, "- **Suggestions:** {}", result.suggestions.len())?;
    if !result.failed_files.is_empty() {
        writeln!(out, "- **Failed Files:** {}", result.failed_files.len())?;
    }
    writeln!(out)?;

    writeln!(out, "### Issues by Severity")?;
    writeln!(out)?;
    for severity in IssueSeverity::ALL {
        writeln!(
            out,
            "- **{}:** {}",
            title_case(&severity.to_string()),
            result.count_severity(severity)
        )?;
    }
    writeln!(out)?;

    write_top_suggestions(out, &result.suggestions)?;
    write_suggestions_by_category(out, &result.suggestions)
}

fn write_top_suggestions(out: &mut String, suggestions: &[Suggestion]) -> fmt::Result {
    writeln!(out, "## Top Priority Suggestions")?;
    writeln!(out)?;

    let mut top: Vec<&Suggestion> = suggestions
        .iter()
        .filter(|s| s.priority <= TOP_PRIORITY)
        .collect();
    top.sort_by_key(|s| s.priority);

    if top.is_empty() {
        writeln!(out, "No high-priority suggestions at this time.")?;
        return writeln!(out);
    }

    for (i, s) in top.iter().take(MAX_TOP_SUGGESTIONS).enumerate() {
        writeln!(out, "### {}. {}", i + 1, s.title)?;
        writeln!(out)?;
        writeln!(
            out,
            "**Priority:** {} | **Impact:** {:?} | **Effort:** {:?}",
            s.priority, s.impact, s.estimated_effort
        )?;
        writeln!(out)?;
        writeln!(out, "{}", s.description)?;
        writeln!(out)?;
        if let Some(example) = &s.code_example {
            writeln!(out, "```")?;
            writeln!(out, "{}", example.trim_end())?;
            writeln!(out, "```")?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn write_suggestions_by_category(out: &mut String, suggestions: &[Suggestion]) -> fmt::Result {
    if suggestions.is_empty() {
        return Ok(());
    }

    let mut by_category: BTreeMap<&str, Vec<&Suggestion>> = BTreeMap::new();
    for s in suggestions {
        by_category.entry(&s.category).or_default().push(s);
    }

    writeln!(out, "## All Suggestions by Category")?;
    writeln!(out)?;
    for (category, items) in by_category {
        writeln!(out, "### {}", title_case(category))?;
        writeln!(out)?;
        writeln!(out, "Count: {}", items.len())?;
        writeln!(out)?;
        for s in items.iter().take(MAX_PER_CATEGORY) {
            writeln!(out, "- **{}**: {}", s.title, s.description)?;
        }
        if items.len() > MAX_PER_CATEGORY {
            writeln!(out, "- ... and {} more", items.len() - MAX_PER_CATEGORY)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// `error_handling` -> `Error Handling`
fn title_case(s: &str) -> String {
    s.split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
