//! SARIF 2.1.0 output
//!
//! One rule per issue category and one result per issue. Locations are made
//! relative to the analyzed codebase so they resolve against `%SRCROOT%`.

use std::path::Path;

use serde::Serialize;

use crate::types::{AnalysisResult, CodeIssue, IssueCategory, IssueSeverity, Result};

const SARIF_VERSION: &str = "2.1.0";
const SARIF_SCHEMA: &str =
    "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json";
const SRCROOT: &str = "%SRCROOT%";

const CATEGORIES: [IssueCategory; 6] = [
    IssueCategory::Complexity,
    IssueCategory::Security,
    IssueCategory::Style,
    IssueCategory::Duplication,
    IssueCategory::ErrorHandling,
    IssueCategory::Naming,
];

#[derive(Debug, Serialize)]
pub struct SarifLog {
    pub version: &'static str,
    #[serde(rename = "$schema")]
    pub schema: &'static str,
    pub runs: Vec<SarifRun>,
}

#[derive(Debug, Serialize)]
pub struct SarifRun {
    pub tool: SarifTool,
    pub results: Vec<SarifResult>,
    pub properties: RunProperties,
}

#[derive(Debug, Serialize)]
pub struct SarifTool {
    pub driver: SarifDriver,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifDriver {
    pub name: &'static str,
    pub version: &'static str,
    pub rules: Vec<SarifRule>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifRule {
    pub id: &'static str,
    pub name: &'static str,
    pub short_description: Text,
    pub full_description: Text,
    pub default_configuration: RuleConfiguration,
}

#[derive(Debug, Serialize)]
pub struct RuleConfiguration {
    pub level: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Text {
    pub text: String,
}

impl Text {
    fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifResult {
    pub rule_id: &'static str,
    pub level: &'static str,
    pub message: Text,
    pub locations: Vec<Location>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fixes: Vec<Fix>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub physical_location: PhysicalLocation,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalLocation {
    pub artifact_location: ArtifactLocation,
    pub region: Region,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactLocation {
    pub uri: String,
    pub uri_base_id: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    /// SARIF lines are 1-based
    pub start_line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<Text>,
}

#[derive(Debug, Serialize)]
pub struct Fix {
    pub description: Text,
}

#[derive(Debug, Serialize)]
pub struct RunProperties {
    pub session_id: String,
    pub timestamp: String,
    pub quality_score: f64,
    pub files_analyzed: usize,
    pub total_issues: usize,
}

fn level(severity: IssueSeverity) -> &'static str {
    match severity {
        IssueSeverity::Critical | IssueSeverity::High => "error",
        IssueSeverity::Medium => "warning",
        IssueSeverity::Low => "note",
    }
}

fn rule(category: IssueCategory) -> SarifRule {
    let (name, short, full, level) = match category {
        IssueCategory::Complexity => (
            "Code Complexity",
            "Code has high cyclomatic complexity",
            "Functions with high cyclomatic complexity are harder to understand, test and maintain.",
            "warning",
        ),
        IssueCategory::Security => (
            "Security Vulnerability",
            "Potential security vulnerability detected",
            "Code contains patterns that may lead to vulnerabilities such as SQL injection or hardcoded credentials.",
            "error",
        ),
        IssueCategory::Style => (
            "Code Style",
            "Code style violation",
            "Code does not follow the configured coding standards.",
            "note",
        ),
        IssueCategory::Duplication => (
            "Code Duplication",
            "Duplicated code detected",
            "Duplicated blocks should be extracted into reusable functions or modules.",
            "warning",
        ),
        IssueCategory::ErrorHandling => (
            "Error Handling",
            "Missing or inadequate error handling",
            "Operations that may fail are not guarded by error handling.",
            "warning",
        ),
        IssueCategory::Naming => (
            "Naming Convention",
            "Naming convention violation",
            "Names do not follow the project's naming conventions.",
            "note",
        ),
    };
    SarifRule {
        id: category.as_str(),
        name,
        short_description: Text::new(short),
        full_description: Text::new(full),
        default_configuration: RuleConfiguration { level },
    }
}

/// Path relative to the codebase root with `/` separators
fn artifact_uri(root: &Path, file_path: &str) -> String {
    let path = Path::new(file_path);
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn sarif_result(root: &Path, issue: &CodeIssue) -> SarifResult {
    SarifResult {
        rule_id: issue.category.as_str(),
        level: level(issue.severity),
        message: Text::new(&issue.description),
        locations: vec![Location {
            physical_location: PhysicalLocation {
                artifact_location: ArtifactLocation {
                    uri: artifact_uri(root, &issue.file_path),
                    uri_base_id: SRCROOT,
                },
                region: Region {
                    start_line: issue.line_number.max(1),
                    snippet: (!issue.code_snippet.is_empty())
                        .then(|| Text::new(&issue.code_snippet)),
                },
            },
        }],
        fixes: issue
            .suggestion
            .iter()
            .map(|s| Fix {
                description: Text::new(s),
            })
            .collect(),
    }
}

pub fn to_sarif(result: &AnalysisResult) -> SarifLog {
    let root = Path::new(&result.codebase_path);
    SarifLog {
        version: SARIF_VERSION,
        schema: SARIF_SCHEMA,
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: env!("CARGO_PKG_NAME"),
                    version: env!("CARGO_PKG_VERSION"),
                    rules: CATEGORIES.into_iter().map(rule).collect(),
                },
            },
            results: result.issues().map(|i| sarif_result(root, i)).collect(),
            properties: RunProperties {
                session_id: result.session_id.clone(),
                timestamp: result.timestamp.to_rfc3339(),
                quality_score: result.quality_score,
                files_analyzed: result.files_analyzed,
                total_issues: result.total_issues,
            },
        }],
    }
}

pub fn to_sarif_string(result: &AnalysisResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(&to_sarif(result))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures::result_with;

    #[test]
    fn test_one_result_per_issue_with_relative_uri() {
        let result = result_with(&[IssueSeverity::Critical, IssueSeverity::Low]);
        let json: serde_json::Value =
            serde_json::from_str(&to_sarif_string(&result).unwrap()).unwrap();

        assert_eq!(json["version"], "2.1.0");
        assert!(json["$schema"].as_str().unwrap().contains("sarif-schema-2.1.0"));

        let run = &json["runs"][0];
        assert_eq!(run["tool"]["driver"]["rules"].as_array().unwrap().len(), 6);
        assert_eq!(run["properties"]["total_issues"], 2);

        let results = run["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["ruleId"], "security");
        assert_eq!(results[0]["level"], "error");
        assert_eq!(results[1]["level"], "note");

        let location = &results[0]["locations"][0]["physicalLocation"];
        assert_eq!(location["artifactLocation"]["uri"], "src/app.py");
        assert_eq!(location["artifactLocation"]["uriBaseId"], "%SRCROOT%");
        assert_eq!(location["region"]["startLine"], 3);
    }

    #[test]
    fn test_fix_only_when_issue_has_suggestion() {
        let mut result = result_with(&[IssueSeverity::High, IssueSeverity::High]);
        result.file_analyses[0].issues[0].suggestion = Some("Use parameterized queries".into());

        let sarif = to_sarif(&result);
        let results = &sarif.runs[0].results;
        assert_eq!(results[0].fixes.len(), 1);
        assert!(results[1].fixes.is_empty());

        let json = serde_json::to_value(&sarif).unwrap();
        assert!(json["runs"][0]["results"][1].get("fixes").is_none());
    }

    #[test]
    fn test_rule_ids_match_issue_categories() {
        let sarif = to_sarif(&result_with(&[]));
        let ids: Vec<&str> = sarif.runs[0].tool.driver.rules.iter().map(|r| r.id).collect();
        assert_eq!(
            ids,
            vec!["complexity", "security", "style", "duplication", "error_handling", "naming"]
        );
        assert!(sarif.runs[0].results.is_empty());
    }
}
