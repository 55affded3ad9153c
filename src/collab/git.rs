use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use super::ChangedFiles;
use crate::types::{Result, ReviewError};

/// Changed files via `git diff --name-only base...head`
pub struct GitChangedFiles;

#[async_trait]
impl ChangedFiles for GitChangedFiles {
    async fn changed_files(
        &self,
        root: &Path,
        base_ref: &str,
        head_ref: &str,
        patterns: &[String],
    ) -> Result<Vec<String>> {
        if !root.join(".git").exists() {
            return Err(ReviewError::Git(format!(
                "Not a Git repository: {}",
                root.display()
            )));
        }

        let output = Command::new("git")
            .args(["diff", "--name-only", &format!("{}...{}", base_ref, head_ref)])
            .current_dir(root)
            .output()
            .await
            .map_err(|e| ReviewError::Git(format!("git not available: {}", e)))?;

        if !output.status.success() {
            return Err(ReviewError::Git(format!(
                "git diff failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let changed = filter_changed(root, &stdout, patterns);
        tracing::debug!(
            "{} files changed between {} and {}",
            changed.len(),
            base_ref,
            head_ref
        );
        Ok(changed)
    }
}

/// Absolute paths of listed files that match `patterns` and still exist
pub fn filter_changed(root: &Path, listing: &str, patterns: &[String]) -> Vec<String> {
    let compiled: Vec<(&str, Option<glob::Pattern>)> = patterns
        .iter()
        .map(|p| (p.as_str(), glob::Pattern::new(p).ok()))
        .collect();

    listing
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| root.join(l))
        .filter(|path| compiled.is_empty() || compiled.iter().any(|(raw, p)| matches(path, raw, p.as_ref())))
        .filter(|path| path.exists())
        .map(|path: PathBuf| path.to_string_lossy().to_string())
        .collect()
}

fn matches(path: &Path, raw: &str, pattern: Option<&glob::Pattern>) -> bool {
    if let Some(ext) = raw.strip_prefix("*.") {
        return path.extension().and_then(|e| e.to_str()) == Some(ext);
    }
    let name = path.file_name().map(Path::new).unwrap_or(path);
    pattern.is_some_and(|p| p.matches_path(path) || p.matches_path(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_outside_repository_is_git_error() {
        let dir = TempDir::new().unwrap();
        let result = GitChangedFiles
            .changed_files(dir.path(), "origin/main", "HEAD", &[])
            .await;
        assert!(matches!(result, Err(ReviewError::Git(_))));
    }

    #[test]
    fn test_filter_changed_keeps_existing_matches() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/app.py"), "").unwrap();
        std::fs::write(dir.path().join("src/ui.ts"), "").unwrap();
        std::fs::write(dir.path().join("README.md"), "").unwrap();

        let listing = "src/app.py\nsrc/ui.ts\nREADME.md\nsrc/deleted.py\n\n";
        let changed = filter_changed(dir.path(), listing, &["*.py".to_string(), "ui.*".to_string()]);

        assert_eq!(
            changed,
            vec![
                dir.path().join("src/app.py").to_string_lossy().to_string(),
                dir.path().join("src/ui.ts").to_string_lossy().to_string(),
            ]
        );
    }

    #[test]
    fn test_filter_without_patterns_keeps_all_existing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rs"), "").unwrap();
        let changed = filter_changed(dir.path(), "a.rs\nb.rs\n", &[]);
        assert_eq!(changed.len(), 1);
    }
}
