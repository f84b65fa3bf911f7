//! Executor backed by a local shell

use async_trait::async_trait;
use tokio::process::Command;

use super::{CommandExecutor, ExecOutput};
use crate::error::{CommandError, Result};

/// Runs commands as `<shell> -c <command>`
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: String,
}

impl ShellExecutor {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new("sh")
    }
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn execute(&self, command: &str) -> Result<ExecOutput> {
        tracing::trace!(shell = %self.shell, "exec: {}", command);

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CommandError::Spawn(format!("{}: {}", self.shell, e)))?;

        // Killed by a signal: no exit code
        let exit_code = output.status.code().unwrap_or(-1);
        if exit_code != 0 {
            tracing::debug!(exit_code, "command failed");
        }

        Ok(ExecOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
