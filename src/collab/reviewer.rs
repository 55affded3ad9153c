//! Rule-based Reviewer
//!
//! Turns issues into suggestions and adds testing, design-pattern and
//! convention suggestions. Priority comes from
//! `(severity + impact) * effort` mapped onto levels 1 (highest) to 5.

use std::path::Path;

use async_trait::async_trait;

use super::Reviewer;
use super::patterns::FUNCTION_SNAKE_CASE_SUFFIX;
use crate::types::{
    CodeIssue, EffortLevel, FileAnalysis, FunctionInfo, ImpactLevel, IssueCategory, IssueSeverity,
    PatternType, ProjectPattern, Result, Suggestion,
};

/// Functions at or above this complexity deserve dedicated tests
const TEST_COMPLEXITY_THRESHOLD: u32 = 5;

/// Functions at or above this complexity suggest the Strategy pattern
const STRATEGY_COMPLEXITY_THRESHOLD: u32 = 10;

/// Classes per file that suggest a Factory
const FACTORY_CLASS_THRESHOLD: usize = 3;

fn severity_weight(severity: IssueSeverity) -> u32 {
    match severity {
        IssueSeverity::Critical => 5,
        IssueSeverity::High => 4,
        IssueSeverity::Medium => 3,
        IssueSeverity::Low => 2,
    }
}

fn impact_weight(impact: ImpactLevel) -> u32 {
    match impact {
        ImpactLevel::High => 3,
        ImpactLevel::Medium => 2,
        ImpactLevel::Low => 1,
    }
}

/// Lower effort weighs more: quick wins first
fn effort_weight(effort: EffortLevel) -> u32 {
    match effort {
        EffortLevel::Low => 3,
        EffortLevel::Medium => 2,
        EffortLevel::High => 1,
    }
}

pub fn estimate_effort(category: IssueCategory) -> EffortLevel {
    match category {
        IssueCategory::Complexity => EffortLevel::High,
        IssueCategory::Security | IssueCategory::Duplication => EffortLevel::Medium,
        IssueCategory::ErrorHandling | IssueCategory::Style => EffortLevel::Low,
        IssueCategory::Naming => EffortLevel::Medium,
    }
}

pub fn estimate_impact(severity: IssueSeverity) -> ImpactLevel {
    match severity {
        IssueSeverity::Critical | IssueSeverity::High => ImpactLevel::High,
        IssueSeverity::Medium => ImpactLevel::Medium,
        IssueSeverity::Low => ImpactLevel::Low,
    }
}

pub fn priority_for(severity: IssueSeverity, impact: ImpactLevel, effort: EffortLevel) -> u8 {
    let score = (severity_weight(severity) + impact_weight(impact)) * effort_weight(effort);
    match score {
        s if s >= 18 => 1,
        s if s >= 12 => 2,
        s if s >= 8 => 3,
        s if s >= 5 => 4,
        _ => 5,
    }
}

/// Sort by priority, then higher impact, then lower effort
pub fn prioritize(suggestions: &mut [Suggestion]) {
    suggestions.sort_by_key(|s| {
        (
            s.priority,
            std::cmp::Reverse(impact_weight(s.impact)),
            std::cmp::Reverse(effort_weight(s.estimated_effort)),
        )
    });
}

fn file_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

pub struct RuleReviewer;

impl Default for RuleReviewer {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleReviewer {
    pub fn new() -> Self {
        Self
    }

    pub fn suggest(&self, analyses: &[FileAnalysis], patterns: &[ProjectPattern]) -> Vec<Suggestion> {
        let mut suggestions: Vec<Suggestion> = analyses
            .iter()
            .flat_map(|a| a.issues.iter().map(move |issue| from_issue(issue, &a.language)))
            .collect();

        suggestions.extend(test_suggestions(analyses));
        suggestions.extend(design_suggestions(analyses));
        suggestions.extend(convention_suggestions(analyses, patterns));

        prioritize(&mut suggestions);
        suggestions
    }
}

#[async_trait]
impl Reviewer for RuleReviewer {
    async fn review(
        &self,
        analyses: &[FileAnalysis],
        patterns: &[ProjectPattern],
    ) -> Result<Vec<Suggestion>> {
        Ok(self.suggest(analyses, patterns))
    }
}

// =============================================================================
// Issue Suggestions
// =============================================================================

fn from_issue(issue: &CodeIssue, language: &str) -> Suggestion {
    let effort = estimate_effort(issue.category);
    let impact = estimate_impact(issue.severity);

    let base = match issue.category {
        IssueCategory::Complexity => "Reduce complexity",
        IssueCategory::Security => "Fix security vulnerability",
        IssueCategory::Duplication => "Remove code duplication",
        IssueCategory::ErrorHandling => "Add error handling",
        IssueCategory::Style => "Fix style issue",
        IssueCategory::Naming => "Improve naming",
    };

    Suggestion {
        priority: priority_for(issue.severity, impact, effort),
        category: issue.category.as_str().to_string(),
        title: format!("{} in {}", base, file_name(&issue.file_path)),
        description: describe(issue),
        code_example: code_example(issue, language),
        estimated_effort: effort,
        impact,
        related_issues: vec![format!("{}:{}", issue.file_path, issue.line_number)],
    }
}

fn describe(issue: &CodeIssue) -> String {
    let generic = match issue.category {
        IssueCategory::Complexity => "Refactor this code to reduce complexity and improve readability.",
        IssueCategory::Security => "Review and fix this security vulnerability.",
        IssueCategory::Duplication => "Extract the duplicated code into a reusable function or module.",
        IssueCategory::ErrorHandling => "Add appropriate error handling to make the code more robust.",
        IssueCategory::Style => "Update the code to follow project style guidelines.",
        IssueCategory::Naming => "Rename to match the project naming convention.",
    };
    let recommendation = issue
        .suggestion
        .clone()
        .unwrap_or_else(|| generic.to_string());

    let mut lines = vec![
        format!("**Issue:** {}", issue.description),
        format!("**Location:** {}, line {}", issue.file_path, issue.line_number),
        String::new(),
        "**Recommendation:**".to_string(),
        recommendation,
    ];

    let context = match issue.category {
        IssueCategory::Complexity => Some(
            "Split the function so each piece has a single responsibility.",
        ),
        IssueCategory::Security => Some("Address security issues before the next release."),
        IssueCategory::ErrorHandling => {
            Some("Explicit error handling makes failures easier to diagnose.")
        }
        _ => None,
    };
    if let Some(context) = context {
        lines.push(String::new());
        lines.push(context.to_string());
    }

    lines.join("\n")
}

fn code_example(issue: &CodeIssue, language: &str) -> Option<String> {
    let python = language == "python";
    match issue.category {
        IssueCategory::ErrorHandling if python => Some(format!(
            "```python\n# Before:\n{snippet}\n\n# After:\ntry:\n    {snippet}\nexcept Exception as e:\n    logger.error(f\"Error occurred: {{e}}\")\n    raise\n```",
            snippet = issue.code_snippet
        )),
        IssueCategory::ErrorHandling => Some(format!(
            "```{lang}\n// Before:\n{snippet}\n\n// After:\ntry {{\n    {snippet}\n}} catch (error) {{\n    console.error('Error occurred:', error);\n    throw error;\n}}\n```",
            lang = language,
            snippet = issue.code_snippet
        )),
        IssueCategory::Security if issue.description.contains("SQL") && python => Some(
            "```python\n# Unsafe:\ncursor.execute(f\"SELECT * FROM users WHERE id = {user_id}\")\n\n# Safe:\ncursor.execute(\"SELECT * FROM users WHERE id = ?\", (user_id,))\n```"
                .to_string(),
        ),
        IssueCategory::Security if issue.description.contains("secret") && python => Some(
            "```python\n# Unsafe:\nAPI_KEY = \"hardcoded_secret_key_123\"\n\n# Safe:\nimport os\nAPI_KEY = os.environ.get(\"API_KEY\")\n```"
                .to_string(),
        ),
        IssueCategory::Complexity => {
            Some("Break this function into smaller, focused functions.".to_string())
        }
        _ => None,
    }
}

// =============================================================================
// Derived Suggestions
// =============================================================================

fn test_suggestions(analyses: &[FileAnalysis]) -> Vec<Suggestion> {
    analyses
        .iter()
        .filter(|a| !a.file_path.to_lowercase().contains("test"))
        .flat_map(|a| {
            a.functions
                .iter()
                .filter(|f| !f.name.starts_with('_') && f.complexity >= TEST_COMPLEXITY_THRESHOLD)
                .map(move |f| test_suggestion(a, f))
        })
        .collect()
}

fn test_suggestion(analysis: &FileAnalysis, function: &FunctionInfo) -> Suggestion {
    Suggestion {
        priority: 2,
        category: "testing".to_string(),
        title: format!("Add tests for {}", function.name),
        description: format!(
            "**Function:** `{}` in {}\n**Complexity:** {}\n\n**Recommendation:**\nCover valid inputs, edge cases and error conditions.",
            function.name, analysis.file_path, function.complexity
        ),
        code_example: None,
        estimated_effort: EffortLevel::Medium,
        impact: ImpactLevel::High,
        related_issues: vec![format!("{}:{}", analysis.file_path, function.line_number)],
    }
}

fn design_suggestions(analyses: &[FileAnalysis]) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    for analysis in analyses {
        let name = file_name(&analysis.file_path);

        if analysis
            .functions
            .iter()
            .any(|f| f.complexity >= STRATEGY_COMPLEXITY_THRESHOLD)
        {
            suggestions.push(design_suggestion(
                format!("Consider Strategy pattern in {}", name),
                "**Pattern:** Strategy\n\nComplex conditional logic could be replaced by interchangeable strategies.",
                &analysis.file_path,
            ));
        }

        if analysis.classes.len() >= FACTORY_CLASS_THRESHOLD {
            suggestions.push(design_suggestion(
                format!("Consider Factory pattern in {}", name),
                "**Pattern:** Factory\n\nSeveral classes are created here; a factory would centralize construction.",
                &analysis.file_path,
            ));
        }
    }

    suggestions
}

fn design_suggestion(title: String, description: &str, path: &str) -> Suggestion {
    Suggestion {
        priority: 3,
        category: "design_pattern".to_string(),
        title,
        description: description.to_string(),
        code_example: None,
        estimated_effort: EffortLevel::Medium,
        impact: ImpactLevel::Medium,
        related_issues: vec![path.to_string()],
    }
}

/// Functions violating a learned snake_case convention
fn convention_suggestions(analyses: &[FileAnalysis], patterns: &[ProjectPattern]) -> Vec<Suggestion> {
    let snake_case = patterns.iter().any(|p| {
        p.pattern_type == PatternType::Naming && p.pattern_id.ends_with(FUNCTION_SNAKE_CASE_SUFFIX)
    });
    if !snake_case {
        return Vec::new();
    }

    let effort = estimate_effort(IssueCategory::Naming);
    let impact = estimate_impact(IssueSeverity::Low);

    analyses
        .iter()
        .flat_map(|a| {
            a.functions
                .iter()
                .filter(|f| f.name.chars().any(|c| c.is_ascii_uppercase()))
                .map(move |f| Suggestion {
                    priority: priority_for(IssueSeverity::Low, impact, effort),
                    category: IssueCategory::Naming.as_str().to_string(),
                    title: format!("Rename {} in {}", f.name, file_name(&a.file_path)),
                    description: format!(
                        "`{}` does not follow the project's snake_case function naming.",
                        f.name
                    ),
                    code_example: None,
                    estimated_effort: effort,
                    impact,
                    related_issues: vec![format!("{}:{}", a.file_path, f.line_number)],
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CodeMetrics;
    use chrono::Utc;

    fn issue(severity: IssueSeverity, category: IssueCategory, line: usize) -> CodeIssue {
        CodeIssue {
            severity,
            category,
            file_path: "/repo/src/app.py".to_string(),
            line_number: line,
            description: "problem".to_string(),
            code_snippet: "open(path)".to_string(),
            suggestion: None,
        }
    }

    fn analysis(issues: Vec<CodeIssue>, functions: Vec<FunctionInfo>) -> FileAnalysis {
        FileAnalysis {
            file_path: "/repo/src/app.py".to_string(),
            language: "python".to_string(),
            metrics: CodeMetrics {
                cyclomatic_complexity: 1,
                maintainability_index: 90.0,
                lines_of_code: 10,
                comment_ratio: 0.0,
            },
            issues,
            functions,
            classes: vec![],
        }
    }

    fn function(name: &str, complexity: u32) -> FunctionInfo {
        FunctionInfo {
            name: name.to_string(),
            line_number: 1,
            parameters: vec![],
            complexity,
        }
    }

    #[test]
    fn test_priority_mapping() {
        // (5 + 3) * 2 = 16
        assert_eq!(
            priority_for(IssueSeverity::Critical, ImpactLevel::High, EffortLevel::Medium),
            2
        );
        // (3 + 2) * 3 = 15
        assert_eq!(
            priority_for(IssueSeverity::Medium, ImpactLevel::Medium, EffortLevel::Low),
            2
        );
        // (4 + 3) * 1 = 7
        assert_eq!(
            priority_for(IssueSeverity::High, ImpactLevel::High, EffortLevel::High),
            4
        );
        // (5 + 3) * 3 = 24
        assert_eq!(
            priority_for(IssueSeverity::Critical, ImpactLevel::High, EffortLevel::Low),
            1
        );
        // (2 + 1) * 1 = 3
        assert_eq!(
            priority_for(IssueSeverity::Low, ImpactLevel::Low, EffortLevel::High),
            5
        );
    }

    #[test]
    fn test_issue_suggestion_fields() {
        let reviewer = RuleReviewer::new();
        let suggestions = reviewer.suggest(
            &[analysis(
                vec![issue(IssueSeverity::Medium, IssueCategory::ErrorHandling, 7)],
                vec![],
            )],
            &[],
        );

        assert_eq!(suggestions.len(), 1);
        let s = &suggestions[0];
        assert_eq!(s.title, "Add error handling in app.py");
        assert_eq!(s.related_issues, vec!["/repo/src/app.py:7".to_string()]);
        assert_eq!(s.estimated_effort, EffortLevel::Low);
        assert_eq!(s.impact, ImpactLevel::Medium);
        assert!(s.code_example.as_deref().unwrap().contains("try:"));
    }

    #[test]
    fn test_suggestions_are_ordered() {
        let reviewer = RuleReviewer::new();
        let suggestions = reviewer.suggest(
            &[analysis(
                vec![
                    issue(IssueSeverity::High, IssueCategory::Complexity, 1),
                    issue(IssueSeverity::Critical, IssueCategory::Security, 2),
                    issue(IssueSeverity::Low, IssueCategory::Style, 3),
                ],
                vec![],
            )],
            &[],
        );

        let priorities: Vec<u8> = suggestions.iter().map(|s| s.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort();
        assert_eq!(priorities, sorted);
        assert_eq!(suggestions[0].category, "security");
    }

    #[test]
    fn test_tie_breaks_on_impact_then_effort() {
        let make = |impact, effort| Suggestion {
            priority: 2,
            category: "x".into(),
            title: "t".into(),
            description: String::new(),
            code_example: None,
            estimated_effort: effort,
            impact,
            related_issues: vec![],
        };
        let mut suggestions = vec![
            make(ImpactLevel::Low, EffortLevel::Low),
            make(ImpactLevel::High, EffortLevel::High),
            make(ImpactLevel::High, EffortLevel::Low),
        ];
        prioritize(&mut suggestions);

        assert_eq!(suggestions[0].impact, ImpactLevel::High);
        assert_eq!(suggestions[0].estimated_effort, EffortLevel::Low);
        assert_eq!(suggestions[1].estimated_effort, EffortLevel::High);
        assert_eq!(suggestions[2].impact, ImpactLevel::Low);
    }

    #[test]
    fn test_derived_suggestions() {
        let reviewer = RuleReviewer::new();
        let suggestions = reviewer.suggest(
            &[analysis(vec![], vec![function("route", 12), function("_private", 20)])],
            &[],
        );

        let categories: Vec<&str> = suggestions.iter().map(|s| s.category.as_str()).collect();
        assert_eq!(categories, vec!["testing", "design_pattern"]);
        assert_eq!(suggestions[0].title, "Add tests for route");
    }

    #[test]
    fn test_learned_convention_flags_camel_case() {
        let pattern = ProjectPattern {
            pattern_id: format!("proj{}", FUNCTION_SNAKE_CASE_SUFFIX),
            project_id: "proj".to_string(),
            pattern_type: PatternType::Naming,
            description: "Functions use snake_case naming convention".to_string(),
            examples: vec![],
            confidence: 0.8,
            last_updated: Utc::now(),
        };
        let analyses = [analysis(vec![], vec![function("loadData", 1), function("save_all", 1)])];

        let without = RuleReviewer::new().suggest(&analyses, &[]);
        assert!(without.is_empty());

        let with = RuleReviewer::new().suggest(&analyses, &[pattern]);
        assert_eq!(with.len(), 1);
        assert_eq!(with[0].category, "naming");
        assert!(with[0].title.contains("loadData"));
    }
}
