//! Build configuration.
//!
//! All paths, versions, and template values are computed once by the caller
//! and handed to the task graph at construction time. Nothing in the core
//! reads ambient process state.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Immutable configuration shared by every component of a build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Project root; literal paths and glob patterns resolve against it.
    pub root: PathBuf,
    /// Scratch/cache directory for downloaded archives and extractions.
    pub build_dir: PathBuf,
    /// Named values available to `PathSpec::Template` and tracked overrides.
    pub values: BTreeMap<String, String>,
    /// Reference timestamp for reproducible outputs, exported to shell
    /// actions as `SOURCE_DATE_EPOCH` when set.
    pub source_date_epoch: Option<i64>,
}

impl BuildConfig {
    pub fn new(root: impl Into<PathBuf>, build_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            build_dir: build_dir.into(),
            values: BTreeMap::new(),
            source_date_epoch: None,
        }
    }

    /// Add a template/config value.
    pub fn value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn source_date_epoch(mut self, epoch: i64) -> Self {
        self.source_date_epoch = Some(epoch);
        self
    }

    /// Location of the persisted task signature store.
    pub fn state_path(&self) -> PathBuf {
        self.build_dir.join("kindling-state.json")
    }

    /// Resolve a path relative to the project root.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_builder() {
        let config = BuildConfig::new("/proj", "/proj/build")
            .value("version", "1.2.3")
            .value("name", "widget");
        assert_eq!(config.values.get("version").unwrap(), "1.2.3");
        assert_eq!(config.values.get("name").unwrap(), "widget");
    }

    #[test]
    fn test_state_path_under_build_dir() {
        let config = BuildConfig::new("/proj", "/proj/build");
        assert!(config.state_path().starts_with("/proj/build"));
    }
}
