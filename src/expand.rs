//! Declarative path expansion.
//!
//! Tasks declare their inputs and outputs as [`PathSpec`] values rather than
//! concrete paths: literals, glob patterns, templated paths, or references
//! to another task's declared targets. The expander resolves every shape
//! through one exhaustive match into a sorted, deduplicated set of concrete
//! file paths, giving the task graph a deterministic order for hashing and
//! comparison.

use crate::config::BuildConfig;
use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// A declarative path specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSpec {
    /// A literal path, relative to the project root.
    Literal(String),
    /// A glob pattern, expanded against the project root.
    Glob(String),
    /// A templated path rendered against the configured values,
    /// e.g. `"packages/{{ name }}/package.json"`.
    Template(String),
    /// The declared targets of another task, by full `group:name`.
    TaskRef(String),
}

impl PathSpec {
    pub fn literal(path: impl Into<String>) -> Self {
        Self::Literal(path.into())
    }

    pub fn glob(pattern: impl Into<String>) -> Self {
        Self::Glob(pattern.into())
    }

    pub fn template(template: impl Into<String>) -> Self {
        Self::Template(template.into())
    }

    pub fn task_ref(task: impl Into<String>) -> Self {
        Self::TaskRef(task.into())
    }
}

/// Resolves [`PathSpec`] lists into concrete paths.
pub struct Expander<'a> {
    config: &'a BuildConfig,
    /// Declared target specs per task, for `TaskRef` resolution.
    refs: BTreeMap<String, Vec<PathSpec>>,
}

impl<'a> Expander<'a> {
    pub fn new(config: &'a BuildConfig) -> Self {
        Self {
            config,
            refs: BTreeMap::new(),
        }
    }

    pub fn with_refs(config: &'a BuildConfig, refs: BTreeMap<String, Vec<PathSpec>>) -> Self {
        Self { config, refs }
    }

    /// Expand `specs` into sorted, unique, concrete paths.
    ///
    /// Existing directories are excluded from the result; dependency and
    /// target tracking is file-granular.
    pub fn expand(&self, specs: &[PathSpec]) -> Result<Vec<PathBuf>> {
        let mut out = BTreeSet::new();
        let mut ref_stack = Vec::new();
        self.expand_into(specs, &mut out, &mut ref_stack)?;
        Ok(out.into_iter().filter(|p| !p.is_dir()).collect())
    }

    fn expand_into(
        &self,
        specs: &[PathSpec],
        out: &mut BTreeSet<PathBuf>,
        ref_stack: &mut Vec<String>,
    ) -> Result<()> {
        for spec in specs {
            match spec {
                PathSpec::Literal(path) => {
                    out.insert(self.config.root.join(path));
                }
                PathSpec::Glob(pattern) => {
                    let full = self.config.root.join(pattern);
                    let full = full.to_string_lossy();
                    let matches = glob::glob(&full).map_err(|e| Error::InvalidGlob {
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    })?;
                    for entry in matches {
                        // A walk failure (e.g. an unreadable directory) must
                        // not silently shrink the dependency set.
                        let path = entry.map_err(|e| Error::Io(e.into_error()))?;
                        out.insert(path);
                    }
                }
                PathSpec::Template(template) => {
                    let env = minijinja::Environment::new();
                    let rendered = env
                        .render_str(template, &self.config.values)
                        .map_err(|e| Error::Template {
                            name: template.clone(),
                            source: e,
                        })?;
                    out.insert(self.config.root.join(rendered));
                }
                PathSpec::TaskRef(task) => {
                    if ref_stack.contains(task) {
                        return Err(Error::DependencyCycle {
                            from: ref_stack.last().cloned().unwrap_or_default(),
                            to: task.clone(),
                        });
                    }
                    let target_specs = self
                        .refs
                        .get(task)
                        .ok_or_else(|| Error::UnknownTask(task.clone()))?;
                    ref_stack.push(task.clone());
                    self.expand_into(target_specs, out, ref_stack)?;
                    ref_stack.pop();
                }
            }
        }
        Ok(())
    }
}
