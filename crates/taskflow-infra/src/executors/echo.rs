use serde_json::{Map, Value};
use taskflow_core::task::{TaskExecutor, TaskOutput};
use taskflow_types::error::TaskError;
use taskflow_types::task::TaskConfig;

/// Returns the task's parameters unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoExecutor;

impl TaskExecutor for EchoExecutor {
    async fn execute(&self, task: &TaskConfig) -> Result<TaskOutput, TaskError> {
        let params: Map<String, Value> = task
            .parameters
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        tracing::debug!(task_id = task.task_id.as_str(), params = params.len(), "echo");
        Ok(Value::Object(params))
    }
}
