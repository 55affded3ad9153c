//! Outline documentation: project layout, per-module API listings and
//! short usage examples derived from extracted signatures.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::analyzer::{HeuristicAnalyzer, Language};
use super::{Documenter, SourceFile};
use crate::types::{ClassInfo, Documentation, FileAnalysis, FunctionInfo, Result};

const DEFAULT_MAX_EXAMPLES: usize = 5;

pub struct OutlineDocumenter {
    analyzer: HeuristicAnalyzer,
    max_examples: usize,
}

impl Default for OutlineDocumenter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutlineDocumenter {
    pub fn new() -> Self {
        Self {
            analyzer: HeuristicAnalyzer::new(),
            max_examples: DEFAULT_MAX_EXAMPLES,
        }
    }

    pub fn with_max_examples(mut self, max: usize) -> Self {
        self.max_examples = max;
        self
    }

    pub fn document(&self, root: &Path, files: &[SourceFile]) -> Documentation {
        let analyses: Vec<FileAnalysis> = files
            .iter()
            .filter_map(|f| match self.analyzer.analyze_source(&f.path, &f.content) {
                Ok(analysis) => Some(analysis),
                Err(e) => {
                    tracing::debug!("Skipping {} in documentation: {}", f.path, e);
                    None
                }
            })
            .collect();

        Documentation {
            project_structure: project_structure(root, files),
            api_docs: analyses
                .iter()
                .filter_map(|a| file_api_doc(a).map(|doc| (module_name(root, &a.file_path), doc)))
                .collect(),
            examples: self.examples(&analyses),
        }
    }

    fn examples(&self, analyses: &[FileAnalysis]) -> BTreeMap<String, String> {
        let mut examples = BTreeMap::new();

        'outer: for analysis in analyses {
            for class in &analysis.classes {
                if examples.len() >= self.max_examples {
                    break 'outer;
                }
                examples.insert(
                    format!("Using {} class", class.name),
                    class_example(class, &analysis.language),
                );
            }
            for function in analysis.functions.iter().filter(|f| !f.name.starts_with('_')) {
                if examples.len() >= self.max_examples {
                    break 'outer;
                }
                examples.insert(
                    format!("Using {} function", function.name),
                    function_example(function, &analysis.language),
                );
            }
        }

        examples
    }
}

#[async_trait]
impl Documenter for OutlineDocumenter {
    async fn generate_docs(&self, root: &Path, files: &[SourceFile]) -> Result<Documentation> {
        Ok(self.document(root, files))
    }
}

fn relative(root: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

/// `pkg/util.py` -> `pkg.util`
fn module_name(root: &Path, path: &str) -> String {
    relative(root, path)
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join(".")
}

fn project_structure(root: &Path, files: &[SourceFile]) -> String {
    let mut languages: BTreeMap<&str, usize> = BTreeMap::new();
    let mut modules: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut directories: BTreeSet<PathBuf> = BTreeSet::new();

    for file in files {
        let lang = Language::from_path(&file.path)
            .map(|l| l.display_name())
            .unwrap_or("Other");
        *languages.entry(lang).or_default() += 1;

        let rel = relative(root, &file.path);
        let mut dir = rel.parent();
        while let Some(d) = dir.filter(|d| !d.as_os_str().is_empty()) {
            directories.insert(d.to_path_buf());
            dir = d.parent();
        }

        let module = rel
            .parent()
            .map(|p| p.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "."))
            .unwrap_or_default();
        let name = rel
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        modules.entry(module).or_default().insert(name);
    }

    let mut lines = vec![
        "# Project Structure\n".to_string(),
        format!("Root: `{}`\n", root.display()),
        "## Overview\n".to_string(),
        format!("- Total files: {}", files.len()),
        format!("- Total directories: {}", directories.len()),
        "\n### Languages".to_string(),
    ];
    lines.extend(
        languages
            .iter()
            .map(|(lang, count)| format!("- {}: {} files", lang, count)),
    );

    lines.push("\n## Directory Structure\n".to_string());
    for dir in &directories {
        let depth = dir.components().count().saturating_sub(1);
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        lines.push(format!("{}- `{}/`", "  ".repeat(depth), name));
    }

    lines.push("\n## Modules\n".to_string());
    for (module, names) in modules.iter().filter(|(m, _)| !m.is_empty()) {
        lines.push(format!("\n### {}", module));
        lines.push(format!("Files: {}", names.len()));
        lines.extend(names.iter().map(|n| format!("- `{}`", n)));
    }

    lines.join("\n")
}

fn file_api_doc(analysis: &FileAnalysis) -> Option<String> {
    if analysis.classes.is_empty() && analysis.functions.is_empty() {
        return None;
    }

    let file_name = Path::new(&analysis.file_path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| analysis.file_path.clone());

    let mut lines = vec![
        format!("# {}\n", file_name),
        format!("Language: {}\n", analysis.language),
    ];

    if !analysis.classes.is_empty() {
        lines.push("## Classes\n".to_string());
        for class in &analysis.classes {
            lines.push(format!("### `{}`", class.name));
            lines.push(format!("Line: {}\n", class.line_number));
            if !class.methods.is_empty() {
                lines.push("**Methods:**".to_string());
                lines.extend(class.methods.iter().map(|m| format!("- `{}()`", m)));
                lines.push(String::new());
            }
        }
    }

    if !analysis.functions.is_empty() {
        lines.push("## Functions\n".to_string());
        for function in &analysis.functions {
            lines.push(format!(
                "### `{}({})`",
                function.name,
                function.parameters.join(", ")
            ));
            lines.push(format!("Line: {}", function.line_number));
            lines.push(format!("Complexity: {}\n", function.complexity));
        }
    }

    Some(lines.join("\n"))
}

fn placeholder_args(function: &FunctionInfo) -> String {
    (0..function.parameters.len())
        .map(|i| format!("arg{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn class_example(class: &ClassInfo, language: &str) -> String {
    let mut lines = Vec::new();
    if language == Language::Python.as_str() {
        lines.push("```python".to_string());
        lines.push(format!("# Create an instance of {}", class.name));
        lines.push(format!("obj = {}()", class.name));
        for method in class.methods.iter().filter(|m| !m.starts_with('_')).take(3) {
            lines.push(format!("# Call {}", method));
            lines.push(format!("result = obj.{}()", method));
        }
    } else {
        lines.push(format!("```{}", language));
        lines.push(format!("// Create an instance of {}", class.name));
        lines.push(format!("const obj = new {}();", class.name));
        for method in class.methods.iter().take(3) {
            lines.push(format!("// Call {}", method));
            lines.push(format!("const result = obj.{}();", method));
        }
    }
    lines.push("```".to_string());
    lines.join("\n")
}

fn function_example(function: &FunctionInfo, language: &str) -> String {
    let args = placeholder_args(function);
    if language == Language::Python.as_str() {
        format!(
            "```python\n# Call {name}\nresult = {name}({args})\n```",
            name = function.name,
            args = args
        )
    } else {
        format!(
            "```{lang}\n// Call {name}\nconst result = {name}({args});\n```",
            lang = language,
            name = function.name,
            args = args
        )
    }
}
