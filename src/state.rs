//! Persisted task signatures.
//!
//! The store records, per task, a fingerprint of every file dependency and
//! the targets that existed at the last successful completion. It is read
//! once at the start of an invocation and rewritten after each task
//! succeeds — never after a failure, so a failed task leaves its previous
//! signature (or none) intact and naturally re-runs next time.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Fingerprint of one file at the time a task completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub sha256: String,
    pub mtime_secs: i64,
    pub mtime_nanos: u32,
}

/// Signature recorded for a task after all of its actions succeed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskSignature {
    /// Fingerprint per expanded file dependency.
    pub deps: BTreeMap<String, Fingerprint>,
    /// Expanded target paths that existed on completion.
    pub targets: Vec<String>,
    /// Tracked value of the staleness override, if the task declared one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptodate: Option<String>,
}

/// On-disk signature store, one JSON document for the whole build tree.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    records: BTreeMap<String, TaskSignature>,
}

impl StateStore {
    /// Load the store, treating a missing file as empty.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = match std::fs::read_to_string(&path) {
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| Error::Store {
                    path: path.clone(),
                    source: e,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, records })
    }

    pub fn get(&self, task: &str) -> Option<&TaskSignature> {
        self.records.get(task)
    }

    /// Record a fresh signature and persist the store.
    pub fn record(&mut self, task: &str, signature: TaskSignature) -> Result<()> {
        self.records.insert(task.to_string(), signature);
        self.write()
    }

    // Atomic write: temp file in the same directory, then rename, so the
    // store is never left half-written.
    fn write(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.records).map_err(|e| Error::Store {
            path: self.path.clone(),
            source: e,
        })?;

        let parent = self.path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent)?;

        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        temp.write_all(content.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fingerprint(hash: &str) -> Fingerprint {
        Fingerprint {
            sha256: hash.to_string(),
            mtime_secs: 1_650_000_000,
            mtime_nanos: 0,
        }
    }

    #[test]
    fn test_missing_store_is_empty() {
        let temp = tempdir().unwrap();
        let store = StateStore::load(temp.path().join("state.json")).unwrap();
        assert!(store.get("a:b").is_none());
    }

    #[test]
    fn test_record_survives_reload() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("state.json");

        let mut sig = TaskSignature::default();
        sig.deps.insert("src/a.txt".to_string(), fingerprint("abc"));
        sig.targets.push("dist/a.out".to_string());
        sig.uptodate = Some("https://example.com/a.tar.gz".to_string());

        let mut store = StateStore::load(&path).unwrap();
        store.record("examples:fetch", sig).unwrap();

        let reloaded = StateStore::load(&path).unwrap();
        let got = reloaded.get("examples:fetch").unwrap();
        assert_eq!(got.deps.get("src/a.txt").unwrap().sha256, "abc");
        assert_eq!(got.targets, vec!["dist/a.out"]);
        assert_eq!(got.uptodate.as_deref(), Some("https://example.com/a.tar.gz"));
    }

    #[test]
    fn test_record_creates_parent_dirs() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("build/nested/state.json");

        let mut store = StateStore::load(&path).unwrap();
        store.record("a:b", TaskSignature::default()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_corrupt_store_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = StateStore::load(&path).unwrap_err();
        assert!(matches!(err, Error::Store { .. }));
    }
}
