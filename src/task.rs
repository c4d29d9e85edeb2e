//! Task declarations and the task registry.
//!
//! A task is a named unit of build work: an ordered action list, declared
//! file dependencies and targets, optional task-to-task ordering, and an
//! optional staleness override. Tasks are declared once at graph
//! construction time through an explicit [`Registry`] of factories; nothing
//! is discovered by reflection.

use crate::config::BuildConfig;
use crate::error::{Error, Result};
use crate::expand::PathSpec;
use std::collections::BTreeMap;
use std::fmt;

/// Task identity: group name plus sub-name, rendered `group:name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId {
    pub group: String,
    pub name: String,
}

impl TaskId {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

/// One step of a task's action sequence.
pub enum Action {
    /// A side-effecting operation over the build configuration.
    Func(Box<dyn Fn(&BuildConfig) -> anyhow::Result<()>>),
    /// A shell command run with `sh -c` in the project root.
    Cmd(String),
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Func(_) => write!(f, "Action::Func(..)"),
            Action::Cmd(cmd) => write!(f, "Action::Cmd({:?})", cmd),
        }
    }
}

/// Staleness override: the task re-runs whenever the tracked value differs
/// from the one recorded at its last successful completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigChanged(pub String);

impl ConfigChanged {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

/// A declared unit of build work.
///
/// Invariant: a task with no file dependencies and no staleness override
/// has no stable signal to skip on, so it executes on every run.
#[derive(Debug)]
pub struct Task {
    pub id: TaskId,
    pub actions: Vec<Action>,
    pub file_dep: Vec<PathSpec>,
    pub targets: Vec<PathSpec>,
    pub uptodate: Option<ConfigChanged>,
    /// Full names of tasks that must run first, regardless of staleness.
    pub task_dep: Vec<String>,
}

impl Task {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(group, name),
            actions: Vec::new(),
            file_dep: Vec::new(),
            targets: Vec::new(),
            uptodate: None,
            task_dep: Vec::new(),
        }
    }

    /// Append a side-effecting action.
    pub fn func(mut self, f: impl Fn(&BuildConfig) -> anyhow::Result<()> + 'static) -> Self {
        self.actions.push(Action::Func(Box::new(f)));
        self
    }

    /// Append a shell command action.
    pub fn cmd(mut self, cmd: impl Into<String>) -> Self {
        self.actions.push(Action::Cmd(cmd.into()));
        self
    }

    pub fn file_dep(mut self, spec: PathSpec) -> Self {
        self.file_dep.push(spec);
        self
    }

    pub fn target(mut self, spec: PathSpec) -> Self {
        self.targets.push(spec);
        self
    }

    pub fn uptodate(mut self, tracked: ConfigChanged) -> Self {
        self.uptodate = Some(tracked);
        self
    }

    pub fn task_dep(mut self, task: impl Into<String>) -> Self {
        self.task_dep.push(task.into());
        self
    }
}

/// Factory producing one group's tasks from the build configuration.
pub type TaskFactory = Box<dyn Fn(&BuildConfig) -> Result<Vec<Task>>>;

/// Explicit mapping from task group name to task factory.
#[derive(Default)]
pub struct Registry {
    factories: BTreeMap<String, TaskFactory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for a task group. Re-registering a group name is
    /// a configuration error.
    pub fn register(
        &mut self,
        group: impl Into<String>,
        factory: impl Fn(&BuildConfig) -> Result<Vec<Task>> + 'static,
    ) -> Result<()> {
        let group = group.into();
        if self.factories.contains_key(&group) {
            return Err(Error::DuplicateTask(group));
        }
        self.factories.insert(group, Box::new(factory));
        Ok(())
    }

    /// Run every factory and flatten the results into one task list.
    ///
    /// Duplicate full task names are rejected here, before the graph is
    /// constructed.
    pub fn build(&self, config: &BuildConfig) -> Result<Vec<Task>> {
        let mut tasks = Vec::new();
        let mut seen = std::collections::BTreeSet::new();

        for factory in self.factories.values() {
            for task in factory(config)? {
                let full = task.id.to_string();
                if !seen.insert(full.clone()) {
                    return Err(Error::DuplicateTask(full));
                }
                tasks.push(task);
            }
        }

        Ok(tasks)
    }
}
