//! The task graph orchestrator.
//!
//! Holds every declared task, computes an execution order over task-to-task
//! dependencies (topological, iterative DFS with cycle detection), decides
//! per task whether recorded state still matches the file system, and runs
//! the action sequences of stale tasks in declaration order.
//!
//! Failure of one task does not abort the run: its direct and transitive
//! dependents are skipped, independent siblings continue, and no signature
//! is recorded for the failed task so the next invocation retries it.

use crate::config::BuildConfig;
use crate::error::{Error, Result};
use crate::expand::{Expander, PathSpec};
use crate::hash::hash_file;
use crate::shell::ShellCmd;
use crate::state::{Fingerprint, StateStore, TaskSignature};
use crate::task::{Action, Task};
use crate::output;
use anyhow::Context;
use filetime::FileTime;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Per-task result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Actions ran and a fresh signature was recorded.
    Executed,
    /// Recorded state matched; nothing to do.
    UpToDate,
    /// An action failed; the previous signature was left intact.
    Failed(String),
    /// Not attempted because a task dependency failed.
    DepFailed,
}

/// Outcome map for a whole invocation.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: BTreeMap<String, RunOutcome>,
}

impl RunSummary {
    pub fn outcome(&self, task: &str) -> Option<&RunOutcome> {
        self.outcomes.get(task)
    }

    /// Number of tasks that failed or were skipped due to a failure.
    pub fn failed_count(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, RunOutcome::Failed(_) | RunOutcome::DepFailed))
            .count()
    }

    pub fn all_ok(&self) -> bool {
        self.failed_count() == 0
    }
}

/// Node state for DFS traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Unprocessed,
    Processing,
    Processed,
}

/// The collection of declared tasks plus the configuration they run under.
#[derive(Debug)]
pub struct TaskGraph {
    config: BuildConfig,
    tasks: BTreeMap<String, Task>,
}

impl TaskGraph {
    /// Build the graph, validating task names and ordering constraints.
    ///
    /// Duplicate names, references to undeclared tasks, and dependency
    /// cycles are all rejected here, before anything executes.
    pub fn new(config: BuildConfig, tasks: Vec<Task>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for task in tasks {
            let name = task.id.to_string();
            if map.insert(name.clone(), task).is_some() {
                return Err(Error::DuplicateTask(name));
            }
        }

        let graph = Self { config, tasks: map };

        for (name, task) in &graph.tasks {
            for dep in &task.task_dep {
                if !graph.tasks.contains_key(dep) {
                    return Err(Error::UnknownTask(format!("{} (task_dep of {})", dep, name)));
                }
            }
        }

        // Cycles are a configuration error; surface them now.
        let all: Vec<String> = graph.tasks.keys().cloned().collect();
        graph.topological_order(&all)?;

        Ok(graph)
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    /// Run every declared task.
    pub fn run_all(&self) -> Result<RunSummary> {
        let all: Vec<String> = self.tasks.keys().cloned().collect();
        let refs: Vec<&str> = all.iter().map(String::as_str).collect();
        self.run(&refs)
    }

    /// Run the requested tasks (and their task dependencies first).
    pub fn run(&self, requested: &[&str]) -> Result<RunSummary> {
        let names: Vec<String> = requested.iter().map(|s| s.to_string()).collect();
        let order = self.topological_order(&names)?;

        let mut store = StateStore::load(self.config.state_path())?;
        let expander = Expander::with_refs(&self.config, self.ref_table());
        let mut summary = RunSummary::default();
        let total = order.len();

        for (i, name) in order.iter().enumerate() {
            let task = &self.tasks[name];

            if let Some(failed) = task.task_dep.iter().find(|dep| {
                matches!(
                    summary.outcomes.get(*dep),
                    Some(RunOutcome::Failed(_) | RunOutcome::DepFailed)
                )
            }) {
                output::warning(&format!("{}: not run, dependency {} failed", name, failed));
                summary.outcomes.insert(name.clone(), RunOutcome::DepFailed);
                continue;
            }

            let deps = expander.expand(&task.file_dep)?;
            let targets = expander.expand(&task.targets)?;

            if self.is_up_to_date(task, &deps, &targets, store.get(name))? {
                output::skip(&format!("{} up to date", name));
                summary.outcomes.insert(name.clone(), RunOutcome::UpToDate);
                continue;
            }

            output::action_numbered(i + 1, total, name);
            let outcome = match self.execute(task) {
                Ok(()) => match self.fingerprint(task, &deps, &expander.expand(&task.targets)?) {
                    Ok(signature) => {
                        store.record(name, signature)?;
                        RunOutcome::Executed
                    }
                    Err(e) => {
                        output::error(&format!("{}: {}", name, e));
                        RunOutcome::Failed(e.to_string())
                    }
                },
                Err(e) => {
                    output::error(&format!("{}: {:#}", name, e));
                    RunOutcome::Failed(format!("{:#}", e))
                }
            };
            summary.outcomes.insert(name.clone(), outcome);
        }

        if summary.all_ok() {
            output::success(&format!("{} task(s) up to date or completed", total));
        } else {
            output::error(&format!("{} task(s) failed", summary.failed_count()));
        }

        Ok(summary)
    }

    /// Declared target specs per task, for `PathSpec::TaskRef` resolution.
    fn ref_table(&self) -> BTreeMap<String, Vec<PathSpec>> {
        self.tasks
            .iter()
            .map(|(name, task)| (name.clone(), task.targets.clone()))
            .collect()
    }

    /// Decide whether a task can be skipped.
    ///
    /// A declared override replaces dependency fingerprinting: the task is
    /// up to date when the tracked value matches the recorded one and every
    /// declared target still exists, so a deleted target re-runs the task
    /// even under an unchanged override. Otherwise the task must have file
    /// dependencies (no dependencies means no stable signal, so it always
    /// runs), every target must exist, every dependency must
    /// fingerprint-match its recorded signature, and no dependency may be
    /// newer than any target.
    fn is_up_to_date(
        &self,
        task: &Task,
        deps: &[PathBuf],
        targets: &[PathBuf],
        signature: Option<&TaskSignature>,
    ) -> Result<bool> {
        if let Some(tracked) = &task.uptodate {
            let recorded = signature.and_then(|s| s.uptodate.as_deref());
            return Ok(recorded == Some(tracked.0.as_str()) && targets.iter().all(|t| t.exists()));
        }

        if deps.is_empty() {
            return Ok(false);
        }
        let Some(signature) = signature else {
            return Ok(false);
        };
        if signature.deps.len() != deps.len() {
            return Ok(false);
        }

        for target in targets {
            if !target.exists() {
                return Ok(false);
            }
        }

        let mut newest_dep: Option<FileTime> = None;
        for dep in deps {
            if !dep.exists() {
                return Ok(false);
            }
            let Some(recorded) = signature.deps.get(&dep.display().to_string()) else {
                return Ok(false);
            };
            if hash_file(dep)? != recorded.sha256 {
                return Ok(false);
            }
            let mtime = FileTime::from_last_modification_time(&std::fs::metadata(dep)?);
            newest_dep = Some(newest_dep.map_or(mtime, |cur| cur.max(mtime)));
        }

        let mut oldest_target: Option<FileTime> = None;
        for target in targets {
            let mtime = FileTime::from_last_modification_time(&std::fs::metadata(target)?);
            oldest_target = Some(oldest_target.map_or(mtime, |cur| cur.min(mtime)));
        }

        if let (Some(dep), Some(target)) = (newest_dep, oldest_target)
            && dep > target
        {
            return Ok(false);
        }

        Ok(true)
    }

    /// Run a task's actions in declaration order, stopping at the first
    /// failure.
    fn execute(&self, task: &Task) -> anyhow::Result<()> {
        for (i, action) in task.actions.iter().enumerate() {
            match action {
                Action::Func(f) => {
                    f(&self.config).with_context(|| format!("action {} failed", i + 1))?;
                }
                Action::Cmd(cmd) => {
                    let mut shell = ShellCmd::new(cmd.clone()).dir(&self.config.root);
                    if let Some(epoch) = self.config.source_date_epoch {
                        shell = shell.env("SOURCE_DATE_EPOCH", epoch.to_string());
                    }
                    shell
                        .run()
                        .with_context(|| format!("action {} failed", i + 1))?;
                }
            }
        }
        Ok(())
    }

    /// Fingerprint dependencies and targets for the fresh signature.
    fn fingerprint(
        &self,
        task: &Task,
        deps: &[PathBuf],
        targets: &[PathBuf],
    ) -> Result<TaskSignature> {
        let mut signature = TaskSignature::default();

        for dep in deps {
            let mtime = FileTime::from_last_modification_time(&std::fs::metadata(dep)?);
            signature.deps.insert(
                dep.display().to_string(),
                Fingerprint {
                    sha256: hash_file(dep)?,
                    mtime_secs: mtime.unix_seconds(),
                    mtime_nanos: mtime.nanoseconds(),
                },
            );
        }

        signature.targets = targets
            .iter()
            .filter(|t| t.exists())
            .map(|t| t.display().to_string())
            .collect();
        signature.uptodate = task.uptodate.as_ref().map(|tracked| tracked.0.clone());

        Ok(signature)
    }

    /// Topological order over `task_dep` edges using iterative DFS, so deep
    /// graphs cannot overflow the stack.
    fn topological_order(&self, targets: &[String]) -> Result<Vec<String>> {
        let mut state: BTreeMap<&str, NodeState> = self
            .tasks
            .keys()
            .map(|name| (name.as_str(), NodeState::Unprocessed))
            .collect();
        let mut result = Vec::new();

        for target in targets {
            let target = self
                .tasks
                .keys()
                .find(|name| *name == target)
                .ok_or_else(|| Error::UnknownTask(target.clone()))?;
            self.dfs_visit(target, &mut state, &mut result)?;
        }

        Ok(result)
    }

    fn dfs_visit<'a>(
        &'a self,
        start: &'a str,
        state: &mut BTreeMap<&'a str, NodeState>,
        result: &mut Vec<String>,
    ) -> Result<()> {
        // Stack holds (node_name, index_of_next_child_to_visit)
        let mut stack: Vec<(&str, usize)> = vec![(start, 0)];

        while let Some((node, child_idx)) = stack.pop() {
            let deps = &self.tasks[node].task_dep;

            match state.get(node).copied().unwrap_or(NodeState::Unprocessed) {
                NodeState::Processed => continue,
                NodeState::Processing => {
                    if child_idx >= deps.len() {
                        state.insert(node, NodeState::Processed);
                        result.push(node.to_string());
                        continue;
                    }
                }
                NodeState::Unprocessed => {
                    state.insert(node, NodeState::Processing);
                }
            }

            let mut found_unprocessed = false;
            for (i, dep) in deps.iter().enumerate().skip(child_idx) {
                match state.get(dep.as_str()).copied().unwrap_or(NodeState::Unprocessed) {
                    NodeState::Unprocessed => {
                        stack.push((node, i + 1));
                        stack.push((dep.as_str(), 0));
                        found_unprocessed = true;
                        break;
                    }
                    NodeState::Processing => {
                        return Err(Error::DependencyCycle {
                            from: node.to_string(),
                            to: dep.clone(),
                        });
                    }
                    NodeState::Processed => {}
                }
            }

            if !found_unprocessed {
                stack.push((node, deps.len()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn graph_with(tasks: Vec<Task>) -> Result<TaskGraph> {
        let temp = std::env::temp_dir();
        TaskGraph::new(BuildConfig::new(&temp, temp.join("build")), tasks)
    }

    #[test]
    fn test_order_respects_task_deps() {
        let graph = graph_with(vec![
            Task::new("g", "c").task_dep("g:b"),
            Task::new("g", "b").task_dep("g:a"),
            Task::new("g", "a"),
        ])
        .unwrap();

        let order = graph
            .topological_order(&["g:c".to_string()])
            .unwrap();
        assert_eq!(order, vec!["g:a", "g:b", "g:c"]);
    }

    #[test]
    fn test_diamond_runs_shared_dep_once() {
        let graph = graph_with(vec![
            Task::new("g", "top").task_dep("g:left").task_dep("g:right"),
            Task::new("g", "left").task_dep("g:base"),
            Task::new("g", "right").task_dep("g:base"),
            Task::new("g", "base"),
        ])
        .unwrap();

        let order = graph.topological_order(&["g:top".to_string()]).unwrap();
        assert_eq!(order.len(), 4);
        assert_eq!(order[0], "g:base");
        assert_eq!(order[3], "g:top");
    }

    #[test]
    fn test_cycle_is_rejected_at_construction() {
        let err = graph_with(vec![
            Task::new("g", "a").task_dep("g:b"),
            Task::new("g", "b").task_dep("g:a"),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::DependencyCycle { .. }));
    }

    #[test]
    fn test_self_cycle_is_rejected() {
        let err = graph_with(vec![Task::new("g", "a").task_dep("g:a")]).unwrap_err();
        assert!(matches!(err, Error::DependencyCycle { .. }));
    }

    #[test]
    fn test_unknown_task_dep_is_rejected() {
        let err = graph_with(vec![Task::new("g", "a").task_dep("g:missing")]).unwrap_err();
        assert!(matches!(err, Error::UnknownTask(_)));
    }

    #[test]
    fn test_duplicate_task_is_rejected() {
        let err = graph_with(vec![Task::new("g", "a"), Task::new("g", "a")]).unwrap_err();
        assert!(matches!(err, Error::DuplicateTask(_)));
    }

    #[test]
    fn test_zero_dep_task_always_runs() {
        let temp = tempdir().unwrap();
        let marker = temp.path().join("ran");
        let config = BuildConfig::new(temp.path(), temp.path().join("build"));

        let marker_for_task = marker.clone();
        let graph = TaskGraph::new(
            config,
            vec![Task::new("g", "always").func(move |_| {
                let count = std::fs::read_to_string(&marker_for_task)
                    .map(|s| s.parse::<u32>().unwrap_or(0))
                    .unwrap_or(0);
                std::fs::write(&marker_for_task, (count + 1).to_string())?;
                Ok(())
            })],
        )
        .unwrap();

        graph.run_all().unwrap();
        let second = graph.run_all().unwrap();

        assert_eq!(std::fs::read_to_string(&marker).unwrap(), "2");
        assert_eq!(second.outcome("g:always"), Some(&RunOutcome::Executed));
    }
}
