//! Shell task type: run a command and capture its output.
//!
//! Parameters:
//! - `command` (required) -- program to run
//! - `args` -- array of string arguments
//! - `env` -- object of extra environment variables
//! - `cwd` -- working directory

use serde_json::{Value, json};
use taskflow_core::task::{TaskExecutor, TaskOutput};
use taskflow_types::error::TaskError;
use taskflow_types::task::TaskConfig;
use tokio::process::Command;

#[derive(Debug, Clone, Copy, Default)]
pub struct ShellExecutor;

impl ShellExecutor {
    fn build_command(task: &TaskConfig) -> Result<Command, TaskError> {
        let program = task.param_str("command").ok_or_else(|| {
            TaskError::InvalidParameters(format!("task '{}' has no 'command'", task.task_id))
        })?;

        let mut command = Command::new(program);
        command.kill_on_drop(true);

        if let Some(args) = task.parameters.get("args") {
            let args = args.as_array().ok_or_else(|| {
                TaskError::InvalidParameters("'args' must be an array".to_string())
            })?;
            for arg in args {
                match arg {
                    Value::String(s) => command.arg(s),
                    other => command.arg(other.to_string()),
                };
            }
        }

        if let Some(env) = task.parameters.get("env") {
            let env = env.as_object().ok_or_else(|| {
                TaskError::InvalidParameters("'env' must be an object".to_string())
            })?;
            for (key, value) in env {
                match value {
                    Value::String(s) => command.env(key, s),
                    other => command.env(key, other.to_string()),
                };
            }
        }

        if let Some(cwd) = task.param_str("cwd") {
            command.current_dir(cwd);
        }

        Ok(command)
    }
}

impl TaskExecutor for ShellExecutor {
    async fn execute(&self, task: &TaskConfig) -> Result<TaskOutput, TaskError> {
        let mut command = Self::build_command(task)?;
        let program = task.param_str("command").unwrap_or_default();

        let output = command.output().await.map_err(|e| {
            TaskError::failed(format!("failed to run '{program}': {e}"))
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let exit_code = output.status.code();

        tracing::debug!(
            task_id = task.task_id.as_str(),
            program,
            exit_code,
            stdout_len = stdout.len(),
            "shell command finished"
        );

        if !output.status.success() {
            let code = exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string());
            return Err(TaskError::failed(format!(
                "'{program}' exited with {code}: {}",
                stderr.trim()
            )));
        }

        Ok(json!({
            "exit_code": exit_code,
            "stdout": stdout,
            "stderr": stderr,
        }))
    }
}
