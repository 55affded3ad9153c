//! Heuristic Analyzer
//!
//! Line-oriented analysis for indentation-scoped (Python) and brace-scoped
//! (JavaScript/TypeScript) sources. Extracts functions and classes, estimates
//! cyclomatic complexity and reports:
//!
//! - complexity hot spots
//! - duplicated blocks of five or more lines
//! - SQL injection and hardcoded secret patterns
//! - error-prone calls outside a try block

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::Analyzer;
use crate::constants::analyzer::{COMPLEXITY_HIGH, COMPLEXITY_MEDIUM, SECRET_SNIPPET_LEN};
use crate::types::{
    ClassInfo, CodeIssue, CodeMetrics, FileAnalysis, FunctionInfo, IssueCategory, IssueSeverity,
    Result, ReviewError,
};

// =============================================================================
// Language Table
// =============================================================================

/// How a language delimits blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Syntax {
    Indent,
    Brace,
}

struct LanguageMeta {
    id: &'static str,
    display_name: &'static str,
    extensions: &'static [&'static str],
    syntax: Syntax,
}

macro_rules! lang_meta {
    ($id:literal, $display:literal, [$($ext:literal),*], $syntax:expr) => {
        LanguageMeta {
            id: $id,
            display_name: $display,
            extensions: &[$($ext),*],
            syntax: $syntax,
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Tsx,
}

impl Language {
    const ALL: [Language; 4] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Tsx,
    ];

    fn meta(&self) -> LanguageMeta {
        match self {
            Language::Python => lang_meta!("python", "Python", ["py", "pyi", "pyw"], Syntax::Indent),
            Language::JavaScript => {
                lang_meta!("javascript", "JavaScript", ["js", "mjs", "cjs", "jsx"], Syntax::Brace)
            }
            Language::TypeScript => {
                lang_meta!("typescript", "TypeScript", ["ts", "mts", "cts"], Syntax::Brace)
            }
            Language::Tsx => lang_meta!("tsx", "TSX", ["tsx"], Syntax::Brace),
        }
    }

    /// Detect from the file extension; `None` for unsupported files
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.meta().extensions.contains(&ext.as_str()))
    }

    pub fn as_str(&self) -> &'static str {
        self.meta().id
    }

    pub fn display_name(&self) -> &'static str {
        self.meta().display_name
    }

    fn syntax(&self) -> Syntax {
        self.meta().syntax
    }

    /// Line comment prefix
    fn comment_prefix(&self) -> &'static str {
        match self.syntax() {
            Syntax::Indent => "#",
            Syntax::Brace => "//",
        }
    }

    /// Error-prone calls and the operation they represent
    fn error_prone(&self) -> Vec<(&'static Regex, &'static str)> {
        match self.syntax() {
            Syntax::Indent => vec![
                (&*PY_OPEN, "file operations"),
                (&*PY_REQUESTS, "network calls"),
                (&*PY_JSON, "JSON parsing"),
            ],
            Syntax::Brace => vec![
                (&*JS_FETCH, "network calls"),
                (&*JS_JSON, "JSON parsing"),
                (&*JS_FS, "file operations"),
            ],
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

// =============================================================================
// Patterns
// =============================================================================

macro_rules! pattern {
    ($name:ident, $re:literal) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($re).expect(concat!("invalid pattern ", stringify!($name))));
    };
}

pattern!(PY_DEF, r"^(\s*)(?:async\s+)?def\s+(\w+)\s*\(([^)]*)");
pattern!(PY_CLASS, r"^(\s*)class\s+(\w+)");
pattern!(PY_DECISION, r"\b(?:if|elif|else|for|while|except|and|or)\b");
pattern!(PY_TRY, r"^\s*try\s*:");
pattern!(PY_OPEN, r"open\s*\(");
pattern!(PY_REQUESTS, r"requests\.(?:get|post|put|delete)");
pattern!(PY_JSON, r"json\.loads\s*\(");

pattern!(JS_FUNCTION, r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*(\w+)\s*\(([^)]*)");
pattern!(JS_ARROW, r"^\s*(?:export\s+)?(?:const|let|var)\s+(\w+)\s*=\s*(?:async\s*)?(?:\(([^)]*)\)|(\w+))\s*=>");
pattern!(JS_METHOD, r"^\s*(?:static\s+)?(?:async\s+)?(\w+)\s*\(([^)]*)\)\s*(?::\s*[^{]+)?\{");
pattern!(JS_CLASS, r"^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+(\w+)");
pattern!(JS_DECISION, r"\b(?:if|else|for|while|case|catch)\b|&&|\|\|");
pattern!(JS_TRY, r"^\s*try\s*\{");
pattern!(JS_FETCH, r"fetch\s*\(");
pattern!(JS_JSON, r"JSON\.parse\s*\(");
pattern!(JS_FS, r"fs\.(?:readFile|writeFile)");

/// Critical: query text assembled from runtime values
static SQL_INJECTION: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(?i)execute\s*\(\s*["'].*%s.*["'].*%"#,
        r#"(?i)execute\s*\(\s*f["'].*\{.*\}.*["']"#,
        r#"(?i)execute\s*\(\s*["'].*\+.*["']"#,
        r#"(?i)["']SELECT.*WHERE.*["'].*%"#,
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// High: credentials assigned from string literals
static HARDCODED_SECRETS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(?i)password\s*=\s*["'][^"']{8,}["']"#,
        r#"(?i)api_key\s*=\s*["'][^"']{20,}["']"#,
        r#"(?i)secret\s*=\s*["'][^"']{8,}["']"#,
        r#"(?i)token\s*=\s*["'][^"']{20,}["']"#,
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Identifiers that look like method heads but are control flow
const JS_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "function", "return", "with", "constructor",
];

/// Consecutive code lines that form a duplication candidate
const DUPLICATE_BLOCK_MIN_LINES: usize = 5;

const DUPLICATE_SNIPPET_LEN: usize = 100;

// =============================================================================
// Analyzer
// =============================================================================

pub struct HeuristicAnalyzer;

impl Default for HeuristicAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl HeuristicAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous analysis of one file
    pub fn analyze_source(&self, path: &str, content: &str) -> Result<FileAnalysis> {
        let language = Language::from_path(path)
            .ok_or_else(|| ReviewError::analysis(path, "unsupported file type"))?;
        let lines: Vec<&str> = content.split('\n').collect();

        if !brackets_balanced(&lines, language) {
            tracing::warn!("Syntax errors detected in {}, creating partial analysis", path);
            return Ok(syntax_error_analysis(path, language, lines.len()));
        }

        let functions = extract_functions(&lines, language);
        let classes = extract_classes(&lines, language, &functions);
        let metrics = calculate_metrics(&lines, &functions);

        let mut issues = Vec::new();
        issues.extend(complexity_issues(path, language, &functions));
        issues.extend(duplication_issues(path, &lines, language));
        issues.extend(security_issues(path, &lines));
        issues.extend(error_handling_issues(path, &lines, language));

        Ok(FileAnalysis {
            file_path: path.to_string(),
            language: language.as_str().to_string(),
            metrics,
            issues,
            functions,
            classes,
        })
    }
}

#[async_trait]
impl Analyzer for HeuristicAnalyzer {
    async fn analyze(&self, path: &str, content: &str) -> Result<FileAnalysis> {
        self.analyze_source(path, content)
    }
}

fn syntax_error_analysis(path: &str, language: Language, line_count: usize) -> FileAnalysis {
    FileAnalysis {
        file_path: path.to_string(),
        language: language.as_str().to_string(),
        metrics: CodeMetrics {
            cyclomatic_complexity: 1,
            maintainability_index: 0.0,
            lines_of_code: line_count,
            comment_ratio: 0.0,
        },
        issues: vec![CodeIssue {
            severity: IssueSeverity::High,
            category: IssueCategory::Style,
            file_path: path.to_string(),
            line_number: 1,
            description: "File contains syntax errors".to_string(),
            code_snippet: String::new(),
            suggestion: Some("Fix syntax errors before further analysis".to_string()),
        }],
        functions: Vec::new(),
        classes: Vec::new(),
    }
}

// =============================================================================
// Block Structure
// =============================================================================

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Exclusive end of the indented block opened at `start`.
/// Lines at the opener's indent starting with a `continuation` keyword extend it.
fn indent_block_end(lines: &[&str], start: usize, continuation: &[&str]) -> usize {
    let base = indent_of(lines[start]);
    let mut end = start + 1;
    for (i, line) in lines.iter().enumerate().skip(start + 1) {
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            continue;
        }
        if indent_of(line) <= base && !continuation.iter().any(|k| trimmed.starts_with(k)) {
            break;
        }
        end = i + 1;
    }
    end
}

/// Exclusive end of the brace block opened on or after `start`
fn brace_block_end(lines: &[&str], start: usize) -> usize {
    let mut depth: i64 = 0;
    let mut opened = false;
    for (i, line) in lines.iter().enumerate().skip(start) {
        for c in line.chars() {
            match c {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        if opened && depth <= 0 {
            return i + 1;
        }
        if !opened && i > start {
            break;
        }
    }
    if opened { lines.len() } else { start + 1 }
}

fn block_end(lines: &[&str], start: usize, language: Language) -> usize {
    match language.syntax() {
        Syntax::Indent => indent_block_end(lines, start, &[]),
        Syntax::Brace => brace_block_end(lines, start),
    }
}

/// Bracket balance outside string literals and line comments
fn brackets_balanced(lines: &[&str], language: Language) -> bool {
    let mut stack = Vec::new();
    let comment = language.comment_prefix();

    for line in lines {
        let mut quote: Option<char> = None;
        let mut chars = line.char_indices().peekable();
        while let Some((idx, c)) = chars.next() {
            if let Some(q) = quote {
                if c == '\\' {
                    chars.next();
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            if line[idx..].starts_with(comment) {
                break;
            }
            match c {
                '"' | '\'' | '`' => quote = Some(c),
                '(' | '[' | '{' => stack.push(c),
                ')' | ']' | '}' => {
                    let open = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    if stack.pop() != Some(open) {
                        return false;
                    }
                }
                _ => {}
            }
        }
    }

    stack.is_empty()
}

// =============================================================================
// Extraction
// =============================================================================

fn parse_parameters(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|p| {
            let name = p.split([':', '=']).next().unwrap_or("").trim();
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

fn complexity_of(lines: &[&str], language: Language) -> u32 {
    let decision = match language.syntax() {
        Syntax::Indent => &PY_DECISION,
        Syntax::Brace => &JS_DECISION,
    };
    let comment = language.comment_prefix();
    let points: usize = lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.starts_with(comment))
        .map(|l| decision.find_iter(l).count())
        .sum();
    1 + points as u32
}

fn extract_functions(lines: &[&str], language: Language) -> Vec<FunctionInfo> {
    let mut functions = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let found = match language.syntax() {
            Syntax::Indent => PY_DEF
                .captures(line)
                .map(|c| (c[2].to_string(), parse_parameters(&c[3]))),
            Syntax::Brace => JS_FUNCTION
                .captures(line)
                .map(|c| (c[1].to_string(), parse_parameters(&c[2])))
                .or_else(|| {
                    JS_ARROW.captures(line).map(|c| {
                        let params = c
                            .get(2)
                            .or_else(|| c.get(3))
                            .map(|m| parse_parameters(m.as_str()))
                            .unwrap_or_default();
                        (c[1].to_string(), params)
                    })
                })
                .or_else(|| {
                    JS_METHOD
                        .captures(line)
                        .filter(|c| !JS_KEYWORDS.contains(&&c[1]))
                        .map(|c| (c[1].to_string(), parse_parameters(&c[2])))
                }),
        };

        if let Some((name, parameters)) = found {
            let end = block_end(lines, i, language);
            functions.push(FunctionInfo {
                name,
                line_number: i + 1,
                parameters,
                complexity: complexity_of(&lines[i..end], language),
            });
        }
    }

    functions
}

fn extract_classes(
    lines: &[&str],
    language: Language,
    functions: &[FunctionInfo],
) -> Vec<ClassInfo> {
    let mut classes = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let name = match language.syntax() {
            Syntax::Indent => PY_CLASS.captures(line).map(|c| c[2].to_string()),
            Syntax::Brace => JS_CLASS.captures(line).map(|c| c[1].to_string()),
        };
        let Some(name) = name else { continue };

        let end = block_end(lines, i, language);
        let methods = functions
            .iter()
            .filter(|f| f.line_number > i + 1 && f.line_number <= end)
            .map(|f| f.name.clone())
            .collect();

        classes.push(ClassInfo {
            name,
            line_number: i + 1,
            methods,
        });
    }

    classes
}

// =============================================================================
// Metrics
// =============================================================================

fn calculate_metrics(lines: &[&str], functions: &[FunctionInfo]) -> CodeMetrics {
    let total = lines.len();
    let comment_lines = lines
        .iter()
        .filter(|l| {
            let t = l.trim();
            t.starts_with('#') || t.starts_with("//")
        })
        .count();
    let comment_ratio = if total > 0 {
        comment_lines as f64 / total as f64
    } else {
        0.0
    };

    let avg_complexity = if functions.is_empty() {
        1.0
    } else {
        functions.iter().map(|f| f.complexity as f64).sum::<f64>() / functions.len() as f64
    };

    let maintainability = (100.0 - avg_complexity * 2.0 + comment_ratio * 20.0).clamp(0.0, 100.0);

    CodeMetrics {
        cyclomatic_complexity: avg_complexity as u32,
        maintainability_index: maintainability,
        lines_of_code: total,
        comment_ratio,
    }
}

// =============================================================================
// Issue Detection
// =============================================================================

fn issue(
    severity: IssueSeverity,
    category: IssueCategory,
    path: &str,
    line_number: usize,
    description: String,
    code_snippet: String,
    suggestion: &str,
) -> CodeIssue {
    CodeIssue {
        severity,
        category,
        file_path: path.to_string(),
        line_number,
        description,
        code_snippet,
        suggestion: Some(suggestion.to_string()),
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn complexity_issues(path: &str, language: Language, functions: &[FunctionInfo]) -> Vec<CodeIssue> {
    let keyword = match language.syntax() {
        Syntax::Indent => "def",
        Syntax::Brace => "function",
    };

    functions
        .iter()
        .filter_map(|f| {
            let (severity, level, suggestion) = if f.complexity >= COMPLEXITY_HIGH {
                (
                    IssueSeverity::High,
                    "high",
                    "Consider breaking this function into smaller, more focused functions",
                )
            } else if f.complexity >= COMPLEXITY_MEDIUM {
                (
                    IssueSeverity::Medium,
                    "moderate",
                    "Consider simplifying this function to improve maintainability",
                )
            } else {
                return None;
            };
            Some(issue(
                severity,
                IssueCategory::Complexity,
                path,
                f.line_number,
                format!(
                    "Function '{}' has {} cyclomatic complexity ({})",
                    f.name, level, f.complexity
                ),
                format!("{} {}(...)", keyword, f.name),
                suggestion,
            ))
        })
        .collect()
}

fn duplication_issues(path: &str, lines: &[&str], language: Language) -> Vec<CodeIssue> {
    let comment = language.comment_prefix();
    let mut blocks: Vec<(usize, String)> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut start = 0;

    let mut flush = |current: &mut Vec<&str>, start: usize| {
        if current.len() >= DUPLICATE_BLOCK_MIN_LINES {
            blocks.push((start, current.join("\n")));
        }
        current.clear();
    };

    for (i, line) in lines.iter().enumerate() {
        let stripped = line.trim();
        if !stripped.is_empty() && !stripped.starts_with(comment) {
            if current.is_empty() {
                start = i + 1;
            }
            current.push(stripped);
        } else {
            flush(&mut current, start);
        }
    }
    flush(&mut current, start);

    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut issues = Vec::new();
    for (line_number, block) in &blocks {
        if let Some(first) = seen.get(block.as_str()) {
            let snippet = if block.chars().count() > DUPLICATE_SNIPPET_LEN {
                format!("{}...", truncate_chars(block, DUPLICATE_SNIPPET_LEN))
            } else {
                block.clone()
            };
            issues.push(issue(
                IssueSeverity::Medium,
                IssueCategory::Duplication,
                path,
                *line_number,
                format!("Duplicate code block detected (also at line {})", first),
                snippet,
                "Consider extracting this code into a reusable function",
            ));
        } else {
            seen.insert(block.as_str(), *line_number);
        }
    }
    issues
}

fn security_issues(path: &str, lines: &[&str]) -> Vec<CodeIssue> {
    let mut issues = Vec::new();

    for pattern in SQL_INJECTION.iter() {
        for (i, line) in lines.iter().enumerate() {
            if pattern.is_match(line) {
                issues.push(issue(
                    IssueSeverity::Critical,
                    IssueCategory::Security,
                    path,
                    i + 1,
                    "Potential SQL injection vulnerability detected".to_string(),
                    line.trim().to_string(),
                    "Use parameterized queries or prepared statements",
                ));
            }
        }
    }

    for pattern in HARDCODED_SECRETS.iter() {
        for (i, line) in lines.iter().enumerate() {
            if pattern.is_match(line) {
                issues.push(issue(
                    IssueSeverity::High,
                    IssueCategory::Security,
                    path,
                    i + 1,
                    "Potential hardcoded secret detected".to_string(),
                    format!("{}...", truncate_chars(line.trim(), SECRET_SNIPPET_LEN)),
                    "Use environment variables or a secrets management system",
                ));
            }
        }
    }

    issues
}

fn error_handling_issues(path: &str, lines: &[&str], language: Language) -> Vec<CodeIssue> {
    let mut protected = vec![false; lines.len()];
    for (i, line) in lines.iter().enumerate() {
        let end = match language.syntax() {
            Syntax::Indent if PY_TRY.is_match(line) => {
                indent_block_end(lines, i, &["except", "else", "finally"])
            }
            Syntax::Brace if JS_TRY.is_match(line) => brace_block_end(lines, i),
            _ => continue,
        };
        protected[i..end].iter_mut().for_each(|p| *p = true);
    }

    let mut issues = Vec::new();
    for (pattern, operation) in language.error_prone() {
        for (i, line) in lines.iter().enumerate() {
            if !protected[i] && pattern.is_match(line) {
                issues.push(issue(
                    IssueSeverity::Medium,
                    IssueCategory::ErrorHandling,
                    path,
                    i + 1,
                    format!("Missing error handling for {}", operation),
                    line.trim().to_string(),
                    &format!("Wrap {} in try-except/try-catch block", operation),
                ));
            }
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    const PYTHON: &str = r#"import json

# config loader
password = "supersecret123"

class Loader:
    def load(self, path):
        with open(path) as f:
            return json.loads(f.read())

def safe(path):
    try:
        return open(path).read()
    except OSError:
        return None

def query(cursor, name):
    cursor.execute("SELECT * FROM users WHERE name = '%s'" % name)
"#;

    const JAVASCRIPT: &str = r#"class Api {
  async fetchUser(id) {
    if (id && id > 0) {
      return fetch(`/users/${id}`);
    }
    return null;
  }
}

function parse(text) {
  return JSON.parse(text);
}

const handler = async (req) => {
  try {
    return JSON.parse(req.body);
  } catch (e) {
    return null;
  }
};
"#;

    fn analyze(path: &str, content: &str) -> FileAnalysis {
        HeuristicAnalyzer::new().analyze_source(path, content).unwrap()
    }

    fn lines_of(analysis: &FileAnalysis, category: IssueCategory) -> Vec<usize> {
        analysis
            .issues
            .iter()
            .filter(|i| i.category == category)
            .map(|i| i.line_number)
            .collect()
    }

    #[test]
    fn test_language_detection() {
        assert_eq!(Language::from_path("a/b.py"), Some(Language::Python));
        assert_eq!(Language::from_path("x.JSX"), Some(Language::JavaScript));
        assert_eq!(Language::from_path("x.tsx"), Some(Language::Tsx));
        assert_eq!(Language::from_path("README.md"), None);
        assert_eq!(Language::TypeScript.as_str(), "typescript");
    }

    #[test]
    fn test_unsupported_file_is_an_error() {
        let err = HeuristicAnalyzer::new()
            .analyze_source("notes.txt", "hello")
            .unwrap_err();
        assert!(matches!(err, ReviewError::Analysis { .. }));
    }

    #[test]
    fn test_python_structure() {
        let analysis = analyze("app.py", PYTHON);
        assert_eq!(analysis.language, "python");

        let names: Vec<&str> = analysis.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["load", "safe", "query"]);
        assert_eq!(analysis.functions[0].parameters, vec!["self", "path"]);
        assert_eq!(analysis.functions[1].complexity, 2);

        assert_eq!(analysis.classes.len(), 1);
        assert_eq!(analysis.classes[0].name, "Loader");
        assert_eq!(analysis.classes[0].methods, vec!["load".to_string()]);
    }

    #[test]
    fn test_python_issues() {
        let analysis = analyze("app.py", PYTHON);

        let critical: Vec<&CodeIssue> = analysis
            .issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Critical)
            .collect();
        assert!(!critical.is_empty());
        assert!(critical.iter().all(|i| i.line_number == 18));

        let secret = analysis
            .issues
            .iter()
            .find(|i| i.severity == IssueSeverity::High && i.category == IssueCategory::Security)
            .unwrap();
        assert_eq!(secret.line_number, 4);
        assert!(secret.code_snippet.ends_with("..."));

        let mut unhandled = lines_of(&analysis, IssueCategory::ErrorHandling);
        unhandled.sort();
        assert_eq!(unhandled, vec![8, 9]);
    }

    #[test]
    fn test_metrics() {
        let analysis = analyze("app.py", PYTHON);
        let metrics = &analysis.metrics;
        assert_eq!(metrics.lines_of_code, PYTHON.split('\n').count());
        assert!((metrics.comment_ratio - 1.0 / metrics.lines_of_code as f64).abs() < 1e-9);
        assert!(metrics.maintainability_index > 90.0 && metrics.maintainability_index <= 100.0);
    }

    #[test]
    fn test_complexity_thresholds() {
        let mut source = String::from("def busy(x):\n");
        for i in 0..15 {
            source.push_str(&format!("    if x == {}:\n        x += 1\n", i));
        }
        source.push_str("    return x\n");

        let analysis = analyze("busy.py", &source);
        assert_eq!(analysis.functions[0].complexity, 16);
        let complexity: Vec<&CodeIssue> = analysis
            .issues
            .iter()
            .filter(|i| i.category == IssueCategory::Complexity)
            .collect();
        assert_eq!(complexity.len(), 1);
        assert_eq!(complexity[0].severity, IssueSeverity::High);
    }

    #[test]
    fn test_duplicate_blocks() {
        let block = "a = 1\nb = 2\nc = 3\nd = 4\ne = 5\n";
        let source = format!("{}\n{}", block, block);
        let analysis = analyze("dup.py", &source);
        assert_eq!(lines_of(&analysis, IssueCategory::Duplication), vec![7]);
    }

    #[test]
    fn test_javascript_structure_and_issues() {
        let analysis = analyze("api.js", JAVASCRIPT);
        assert_eq!(analysis.language, "javascript");

        let names: Vec<&str> = analysis.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["fetchUser", "parse", "handler"]);
        assert_eq!(analysis.functions[0].complexity, 3);
        assert_eq!(analysis.functions[2].parameters, vec!["req"]);

        assert_eq!(analysis.classes[0].name, "Api");
        assert_eq!(analysis.classes[0].methods, vec!["fetchUser".to_string()]);

        let mut unhandled = lines_of(&analysis, IssueCategory::ErrorHandling);
        unhandled.sort();
        assert_eq!(unhandled, vec![4, 11]);
    }

    #[test]
    fn test_unbalanced_source_yields_partial_analysis() {
        let analysis = analyze("broken.ts", "function broken( {\n  return 1;\n");
        assert_eq!(analysis.metrics.maintainability_index, 0.0);
        assert_eq!(analysis.issues.len(), 1);
        assert_eq!(analysis.issues[0].description, "File contains syntax errors");
        assert!(analysis.functions.is_empty());
    }
}
