//! Input validation helpers. Failures here are permanent and never retried.

use std::path::{Path, PathBuf};

use crate::constants::session::MAX_SESSION_ID_LEN;
use crate::types::{Result, ReviewError, ValidationError, ValidationErrorKind};

/// Require an existing directory and return its canonical form
pub fn validate_target_dir(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(
            ValidationError::new(ValidationErrorKind::MissingField, "path cannot be empty")
                .with_field("target_path")
                .into(),
        );
    }
    if !path.exists() {
        return Err(ValidationError::new(
            ValidationErrorKind::Path,
            format!("path does not exist: {}", path.display()),
        )
        .with_field("target_path")
        .into());
    }
    if !path.is_dir() {
        return Err(ValidationError::new(
            ValidationErrorKind::Path,
            format!("path is not a directory: {}", path.display()),
        )
        .with_field("target_path")
        .into());
    }
    Ok(path.canonicalize()?)
}

/// Session ids are non-empty, bounded, and limited to `[A-Za-z0-9_-]`
pub fn validate_session_id(session_id: &str) -> Result<String> {
    let trimmed = session_id.trim();
    if trimmed.is_empty() {
        return Err(
            ValidationError::new(ValidationErrorKind::MissingField, "session id cannot be empty")
                .with_field("session_id")
                .into(),
        );
    }
    if trimmed.len() > MAX_SESSION_ID_LEN {
        return Err(ValidationError::new(
            ValidationErrorKind::Range,
            format!("session id longer than {} characters", MAX_SESSION_ID_LEN),
        )
        .with_field("session_id")
        .into());
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::new(
            ValidationErrorKind::Format,
            format!("session id contains invalid characters: {}", trimmed),
        )
        .with_field("session_id")
        .into());
    }
    Ok(trimmed.to_string())
}

/// Trim patterns and reject an empty list or blank entries
pub fn validate_file_patterns(patterns: &[String]) -> Result<Vec<String>> {
    if patterns.is_empty() {
        return Err(
            ValidationError::new(ValidationErrorKind::MissingField, "file patterns cannot be empty")
                .with_field("file_patterns")
                .into(),
        );
    }
    patterns
        .iter()
        .map(|p| {
            let p = p.trim();
            if p.is_empty() {
                Err(ReviewError::from(
                    ValidationError::new(ValidationErrorKind::Format, "pattern cannot be blank")
                        .with_field("file_patterns"),
                ))
            } else {
                Ok(p.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_target_dir_must_exist_and_be_dir() {
        let dir = TempDir::new().unwrap();
        assert!(validate_target_dir(dir.path()).is_ok());

        let missing = dir.path().join("missing");
        assert!(matches!(
            validate_target_dir(&missing),
            Err(ReviewError::Validation(_))
        ));

        let file = dir.path().join("a.py");
        std::fs::write(&file, "x = 1").unwrap();
        assert!(matches!(
            validate_target_dir(&file),
            Err(ReviewError::Validation(_))
        ));
    }

    #[test]
    fn test_session_id_charset() {
        assert_eq!(validate_session_id(" run-1_a ").unwrap(), "run-1_a");
        assert!(validate_session_id("").is_err());
        assert!(validate_session_id("../etc/passwd").is_err());
        assert!(validate_session_id(&"a".repeat(MAX_SESSION_ID_LEN + 1)).is_err());
    }

    #[test]
    fn test_file_patterns() {
        let ok = validate_file_patterns(&[" *.py ".to_string()]).unwrap();
        assert_eq!(ok, vec!["*.py".to_string()]);
        assert!(validate_file_patterns(&[]).is_err());
        assert!(validate_file_patterns(&["  ".to_string()]).is_err());
    }
}
