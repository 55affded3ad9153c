use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ignore::WalkBuilder;

use super::{Discoverer, FileReader};
use crate::types::{Result, ReviewError};

/// Default maximum file size for analysis (1MB)
const DEFAULT_MAX_FILE_SIZE: u64 = 1_048_576;

/// Walks a tree honoring `.gitignore`, then filters with include/exclude globs
pub struct FsDiscoverer {
    max_file_size: u64,
}

impl Default for FsDiscoverer {
    fn default() -> Self {
        Self::new()
    }
}

impl FsDiscoverer {
    pub fn new() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Absolute paths of matching files, sorted
    pub fn scan(&self, root: &Path, include: &[String], exclude: &[String]) -> Result<Vec<String>> {
        if !root.is_dir() {
            return Err(ReviewError::validation(format!(
                "discovery root is not a directory: {}",
                root.display()
            )));
        }

        let include = compile(include);
        let exclude = compile(exclude);

        let walker = WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false) // Security: prevent symlink traversal attacks
            .build();

        let mut files = Vec::new();
        for entry in walker.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(root).unwrap_or(path);
            if matches_any(&exclude, relative) {
                continue;
            }
            if !include.is_empty() && !matches_any(&include, relative) {
                continue;
            }
            if path
                .metadata()
                .map(|m| m.len() > self.max_file_size)
                .unwrap_or(true)
            {
                continue;
            }

            files.push(path.to_string_lossy().to_string());
        }

        files.sort();
        Ok(files)
    }
}

fn compile(patterns: &[String]) -> Vec<glob::Pattern> {
    patterns
        .iter()
        .filter_map(|p| match glob::Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                tracing::warn!("Ignoring invalid glob '{}': {}", p, e);
                None
            }
        })
        .collect()
}

/// Match against the file name and the root-relative path only, so the
/// directories above the root never exclude anything
fn matches_any(patterns: &[glob::Pattern], relative: &Path) -> bool {
    let name = relative.file_name().map(Path::new).unwrap_or(relative);
    patterns
        .iter()
        .any(|p| p.matches_path(name) || p.matches_path(relative))
}

#[async_trait]
impl Discoverer for FsDiscoverer {
    async fn discover(
        &self,
        root: &Path,
        include: &[String],
        exclude: &[String],
    ) -> Result<Vec<String>> {
        let root: PathBuf = root.to_path_buf();
        let include = include.to_vec();
        let exclude = exclude.to_vec();
        let scanner = FsDiscoverer {
            max_file_size: self.max_file_size,
        };
        tokio::task::spawn_blocking(move || scanner.scan(&root, &include, &exclude)).await?
    }
}

/// Reads files as UTF-8 text
pub struct FsReader;

#[async_trait]
impl FileReader for FsReader {
    async fn read(&self, path: &str) -> Result<String> {
        Ok(tokio::fs::read_to_string(path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "x = 1\n").unwrap();
    }

    #[tokio::test]
    async fn test_discover_filters_by_patterns() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "app/main.py");
        write(dir.path(), "app/util.js");
        write(dir.path(), "README.md");
        write(dir.path(), "node_modules/lib/index.js");

        let found = FsDiscoverer::new()
            .discover(
                dir.path(),
                &["*.py".to_string(), "*.js".to_string()],
                &["**/node_modules/**".to_string()],
            )
            .await
            .unwrap();

        let names: Vec<&str> = found
            .iter()
            .map(|p| Path::new(p).file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["main.py", "util.js"]);
        assert!(found.iter().all(|p| Path::new(p).is_absolute()));
    }

    #[tokio::test]
    async fn test_root_inside_excluded_directory_is_still_scanned() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("node_modules/lib");
        write(&root, "index.js");
        write(&root, "node_modules/dep/index.js");

        let config = crate::types::AnalysisConfig::new(&root);
        let found = FsDiscoverer::new()
            .discover(&root, &config.file_patterns, &config.exclude_patterns)
            .await
            .unwrap();

        assert_eq!(found, vec![root.join("index.js").to_string_lossy().to_string()]);
    }

    #[tokio::test]
    async fn test_discover_rejects_invalid_root() {
        let dir = TempDir::new().unwrap();
        let result = FsDiscoverer::new()
            .discover(&dir.path().join("missing"), &[], &[])
            .await;
        assert!(matches!(result, Err(ReviewError::Validation(_))));
    }

    #[tokio::test]
    async fn test_reader_surfaces_io_errors() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.py");
        let path = dir.path().join("a.py").to_string_lossy().to_string();

        assert_eq!(FsReader.read(&path).await.unwrap(), "x = 1\n");
        assert!(matches!(
            FsReader.read("/definitely/not/here.py").await,
            Err(ReviewError::Io(_))
        ));
    }
}
