//! Script execution over local child processes.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::trace;

use crate::domain::models::check::ExecOutput;
use crate::domain::ports::{ExecError, ScriptExecutor};

/// Runs health-check scripts as local child processes.
///
/// Children are spawned with `kill_on_drop` so an abandoned execution
/// (deadline or cancellation in the check runner) terminates the process
/// instead of leaking it.
#[derive(Debug, Clone, Default)]
pub struct ProcessScriptExecutor {
    env: Vec<(String, String)>,
    cwd: Option<PathBuf>,
}

impl ProcessScriptExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an environment variable for executed scripts.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set the working directory for executed scripts.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

#[async_trait]
impl ScriptExecutor for ProcessScriptExecutor {
    async fn exec(&self, command: &str, args: &[String]) -> Result<ExecOutput, ExecError> {
        trace!(command = %command, args = ?args, "Spawning check script");

        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        let child = cmd.spawn().map_err(ExecError::Spawn)?;
        let output = child.wait_with_output().await.map_err(ExecError::Wait)?;

        // A signal-terminated child has no exit code.
        let exit_code = output.status.code().unwrap_or(-1);
        Ok(ExecOutput {
            stdout: output.stdout,
            exit_code,
        })
    }
}
