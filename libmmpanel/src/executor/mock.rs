//! Scripted executor for tests
//!
//! Answers commands from a list of prefix rules and records every command it
//! receives, so tests can assert both on parsing and on the exact command
//! strings the provider issues.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use super::{CommandExecutor, ExecOutput};
use crate::error::{CommandError, Result};

#[derive(Debug, Clone)]
enum Reply {
    Output(ExecOutput),
    SpawnError(String),
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedExecutor {
    rules: Vec<(String, Reply)>,
    delay: Duration,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands starting with `prefix` (leading whitespace ignored)
    pub fn on(mut self, prefix: &str, output: ExecOutput) -> Self {
        self.rules.push((prefix.to_string(), Reply::Output(output)));
        self
    }

    /// Shorthand for a successful command printing `stdout`
    pub fn on_stdout(self, prefix: &str, stdout: &str) -> Self {
        self.on(prefix, ExecOutput::success(stdout))
    }

    /// Fail to spawn commands starting with `prefix`
    pub fn on_spawn_error(mut self, prefix: &str, message: &str) -> Self {
        self.rules
            .push((prefix.to_string(), Reply::SpawnError(message.to_string())));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Commands received so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn execute(&self, command: &str) -> Result<ExecOutput> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(command.to_string());

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let trimmed = command.trim_start();
        let reply = self
            .rules
            .iter()
            .find(|(prefix, _)| trimmed.starts_with(prefix.as_str()))
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(Reply::Output(output)) => Ok(output),
            Some(Reply::SpawnError(message)) => Err(CommandError::Spawn(message).into()),
            None => Ok(ExecOutput::failure(127, "command not scripted")),
        }
    }
}
