//! Shell command execution for task actions.
//!
//! Provides a builder for running shell commands with consistent error
//! handling and environment setup.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Builder for shell command execution.
///
/// # Example
/// ```ignore
/// ShellCmd::new("jlpm build")
///     .dir("/proj")
///     .env("SOURCE_DATE_EPOCH", "1650000000")
///     .run()?;
/// ```
#[derive(Clone)]
pub struct ShellCmd {
    cmd: String,
    cwd: Option<PathBuf>,
    env: HashMap<String, String>,
}

impl ShellCmd {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            cwd: None,
            env: HashMap::new(),
        }
    }

    /// Set the working directory for the command.
    pub fn dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set an environment variable for the command.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", &self.cmd]);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        for (k, v) in &self.env {
            cmd.env(k, v);
        }

        cmd
    }

    /// Run the command, returning `Ok(())` only on exit code 0.
    pub fn run(&self) -> Result<()> {
        let status = self.build_command().status()?;

        if !status.success() {
            return Err(Error::CommandFailed {
                cmd: self.truncated_cmd(),
                code: status.code(),
            });
        }

        Ok(())
    }

    /// Get a truncated version of the command for display.
    fn truncated_cmd(&self) -> String {
        if self.cmd.len() > 60 {
            format!("{}...", &self.cmd[..57])
        } else {
            self.cmd.clone()
        }
    }
}
