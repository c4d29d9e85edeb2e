//! Error types for build orchestration.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving or running the task graph.
#[derive(Error, Debug)]
pub enum Error {
    #[error("download failed for {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("archive entry escapes destination: {entry}")]
    PathTraversal { entry: String },

    #[error("unrecognized archive format: {0}")]
    UnsupportedFormat(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("unknown task: {0}")]
    UnknownTask(String),

    #[error("duplicate task name: {0}")]
    DuplicateTask(String),

    #[error("dependency cycle detected: {from} -> {to}")]
    DependencyCycle { from: String, to: String },

    #[error("invalid glob pattern '{pattern}': {reason}")]
    InvalidGlob { pattern: String, reason: String },

    #[error("template error in {name}: {source}")]
    Template {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("path {} is not under root {}", path.display(), root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("command failed: {cmd} (exit code: {code:?})")]
    CommandFailed { cmd: String, code: Option<i32> },

    #[error("state store {}: {source}", path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
