use std::time::Duration;

use serde_json::{Value, json};
use taskflow_core::task::{TaskExecutor, TaskOutput};
use taskflow_types::error::TaskError;
use taskflow_types::task::TaskConfig;

/// Waits `duration_ms` (default 0). Fails afterwards when `fail` is true.
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepExecutor;

impl TaskExecutor for SleepExecutor {
    async fn execute(&self, task: &TaskConfig) -> Result<TaskOutput, TaskError> {
        let duration_ms = match task.parameters.get("duration_ms") {
            None => 0,
            Some(value) => value.as_u64().ok_or_else(|| {
                TaskError::InvalidParameters(format!(
                    "duration_ms must be a non-negative integer, got {value}"
                ))
            })?,
        };
        let fail = task
            .parameters
            .get("fail")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        tokio::time::sleep(Duration::from_millis(duration_ms)).await;

        if fail {
            return Err(TaskError::failed(format!(
                "task '{}' failed after {duration_ms}ms",
                task.task_id
            )));
        }
        Ok(json!({ "slept_ms": duration_ms }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sleeps_and_reports() {
        let task = TaskConfig::new("s", "sleep").with_parameter("duration_ms", json!(5));
        assert_eq!(SleepExecutor.execute(&task).await.unwrap(), json!({ "slept_ms": 5 }));
    }

    #[tokio::test]
    async fn test_configured_failure_is_retryable() {
        let task = TaskConfig::new("s", "sleep").with_parameter("fail", json!(true));
        let err = SleepExecutor.execute(&task).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_rejects_bad_duration() {
        let task = TaskConfig::new("s", "sleep").with_parameter("duration_ms", json!("soon"));
        let err = SleepExecutor.execute(&task).await.unwrap_err();
        assert!(matches!(err, TaskError::InvalidParameters(_)));
    }
}
