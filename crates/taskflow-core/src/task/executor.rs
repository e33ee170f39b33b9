//! TaskExecutor trait definition.
//!
//! This is the capability the engine calls to run a single task attempt.
//! Uses native async fn in traits (RPITIT, Rust 2024 edition); the
//! `BoxTaskExecutor` wrapper provides dynamic dispatch where needed.
//!
//! Implementations for concrete task types live in taskflow-infra.

use std::future::Future;

use serde_json::Value;
use taskflow_types::error::TaskError;
use taskflow_types::task::TaskConfig;

/// Output of a successful attempt. Opaque to the engine.
pub type TaskOutput = Value;

/// Runs one attempt of a task.
///
/// Any `Err` counts as a failed attempt and drives the retry loop, unless
/// the error is not retryable (see [`TaskError::is_retryable`]).
pub trait TaskExecutor: Send + Sync {
    fn execute(
        &self,
        task: &TaskConfig,
    ) -> impl Future<Output = Result<TaskOutput, TaskError>> + Send;
}

/// Adapts a closure into a [`TaskExecutor`].
///
/// The closure receives an owned copy of the task configuration so the
/// returned future does not borrow from the engine.
///
/// ```
/// use taskflow_core::task::FnExecutor;
/// use serde_json::json;
///
/// let echo = FnExecutor::new(|task: taskflow_types::task::TaskConfig| async move { Ok::<_, taskflow_types::error::TaskError>(json!({ "id": task.task_id })) });
/// # let _ = echo;
/// ```
pub struct FnExecutor<F> {
    f: F,
}

impl<F> FnExecutor<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut> TaskExecutor for FnExecutor<F>
where
    F: Fn(TaskConfig) -> Fut + Send + Sync,
    Fut: Future<Output = Result<TaskOutput, TaskError>> + Send,
{
    fn execute(
        &self,
        task: &TaskConfig,
    ) -> impl Future<Output = Result<TaskOutput, TaskError>> + Send {
        (self.f)(task.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fn_executor_receives_task() {
        let exec = FnExecutor::new(|task: TaskConfig| async move {
            Ok(json!({ "id": task.task_id, "type": task.task_type }))
        });
        let out = exec.execute(&TaskConfig::new("a", "echo")).await.unwrap();
        assert_eq!(out, json!({ "id": "a", "type": "echo" }));
    }

    #[tokio::test]
    async fn test_fn_executor_propagates_errors() {
        let exec = FnExecutor::new(|_task: TaskConfig| async move {
            Err(TaskError::failed("nope"))
        });
        let err = exec.execute(&TaskConfig::new("a", "echo")).await.unwrap_err();
        assert_eq!(err, TaskError::failed("nope"));
    }
}
