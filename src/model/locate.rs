//! Finding the policy configuration file on disk.

use std::fs::File;
use std::path::PathBuf;

use crate::config::LocatorConfig;
use crate::error::ConfigError;

/// Returns the first readable configuration file in the search directories.
///
/// Directories are tried in order; a candidate counts as readable if it can
/// be opened.
///
/// # Errors
///
/// Returns [`ConfigError::Unreadable`] if no candidate can be opened.
pub fn locate_configuration_file(locator: &LocatorConfig) -> Result<PathBuf, ConfigError> {
    for dir in &locator.search_dirs {
        let candidate = dir.join(&locator.file_name);
        match File::open(&candidate) {
            Ok(_) => {
                tracing::debug!(path = %candidate.display(), "found audio policy configuration");
                return Ok(candidate);
            }
            Err(e) => {
                tracing::trace!(path = %candidate.display(), error = %e, "candidate not readable");
            }
        }
    }

    let searched: Vec<String> = locator
        .search_dirs
        .iter()
        .map(|dir| dir.display().to_string())
        .collect();
    Err(ConfigError::Unreadable {
        path: None,
        reason: format!(
            "{} not found in [{}]",
            locator.file_name,
            searched.join(", ")
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_nothing_found() {
        let locator = LocatorConfig {
            file_name: "audio_policy_configuration.xml".to_string(),
            search_dirs: vec![PathBuf::from("/nonexistent-a"), PathBuf::from("/nonexistent-b")],
        };
        let err = locate_configuration_file(&locator).unwrap_err();
        assert!(err.to_string().contains("/nonexistent-a"));
        assert!(matches!(err, ConfigError::Unreadable { path: None, .. }));
    }

    #[test]
    fn test_locate_first_readable_wins() {
        use tempfile::tempdir;

        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        std::fs::write(second.path().join("policy.xml"), "<audioPolicyConfiguration/>").unwrap();

        let locator = LocatorConfig {
            file_name: "policy.xml".to_string(),
            search_dirs: vec![
                PathBuf::from("/nonexistent-a"),
                first.path().to_path_buf(),
                second.path().to_path_buf(),
            ],
        };
        let found = locate_configuration_file(&locator).unwrap();
        assert_eq!(found, second.path().join("policy.xml"));
    }

    #[test]
    fn test_locate_empty_search_path() {
        let locator = LocatorConfig {
            file_name: "policy.xml".to_string(),
            search_dirs: Vec::new(),
        };
        assert!(locate_configuration_file(&locator).is_err());
    }
}
