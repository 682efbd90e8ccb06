//! Shell action: run an external command in the package directory

use crate::error::{ErmineError, ErmineResult};
use serde_json::Value;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Run an external command through `sh -c` in a given working directory
#[derive(Debug, Clone, PartialEq)]
pub struct ShellAction {
    command: String,
}

impl ShellAction {
    /// Accepts either a plain command string or `{"command": "..."}`.
    pub fn from_params(params: &Value) -> ErmineResult<Self> {
        let command = match params {
            Value::String(s) => s.clone(),
            Value::Object(obj) => obj
                .get("command")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ErmineError::Internal(format!("shell step missing 'command': {}", params))
                })?
                .to_string(),
            other => {
                return Err(ErmineError::Internal(format!(
                    "shell step params must be a string or object: {}",
                    other
                )))
            }
        };
        Ok(Self { command })
    }

    /// The serialized params form (always the plain string shape)
    pub fn export_params(&self) -> Value {
        Value::String(self.command.clone())
    }

    /// Run the command. Non-zero exit is a step failure, not an error.
    pub async fn run(&self, path: &Path) -> ErmineResult<bool> {
        debug!("shell step in {}: {}", path.display(), self.command);

        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .current_dir(path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ErmineError::command_failed(self.command.clone(), e))?;

        if output.status.success() {
            Ok(true)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                "shell step failed ({}): {}",
                output.status,
                stderr.trim()
            );
            Ok(false)
        }
    }

    /// The command this action will run
    pub fn command(&self) -> &str {
        &self.command
    }
}
