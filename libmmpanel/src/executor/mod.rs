//! Privileged command execution
//!
//! The panel never runs anything itself; it hands shell command strings to a
//! [`CommandExecutor`] and parses what comes back. On a device that is a root
//! shell, in tests it is a [`mock::ScriptedExecutor`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod mock;
pub mod shell;

pub use mock::ScriptedExecutor;
pub use shell::ShellExecutor;

/// Captured result of one command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// A non-zero exit code is the only failure signal
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs shell command strings
///
/// Implementations report spawn failures as errors; a command that ran and
/// exited non-zero is an `Ok` output for the caller to judge.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command: &str) -> Result<ExecOutput>;
}

#[async_trait]
impl<T: CommandExecutor + ?Sized> CommandExecutor for std::sync::Arc<T> {
    async fn execute(&self, command: &str) -> Result<ExecOutput> {
        (**self).execute(command).await
    }
}
