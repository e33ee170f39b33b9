//! BoxTaskExecutor -- object-safe dynamic dispatch wrapper for TaskExecutor.
//!
//! 1. Define an object-safe `TaskExecutorDyn` trait with a boxed future
//! 2. Blanket-impl `TaskExecutorDyn` for all `T: TaskExecutor`
//! 3. `BoxTaskExecutor` wraps `Box<dyn TaskExecutorDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use taskflow_types::error::TaskError;
use taskflow_types::task::TaskConfig;

use super::executor::{TaskExecutor, TaskOutput};

/// Object-safe version of [`TaskExecutor`] with a boxed future.
///
/// A blanket implementation is provided for all types implementing `TaskExecutor`.
pub trait TaskExecutorDyn: Send + Sync {
    fn execute_boxed<'a>(
        &'a self,
        task: &'a TaskConfig,
    ) -> Pin<Box<dyn Future<Output = Result<TaskOutput, TaskError>> + Send + 'a>>;
}

impl<T: TaskExecutor> TaskExecutorDyn for T {
    fn execute_boxed<'a>(
        &'a self,
        task: &'a TaskConfig,
    ) -> Pin<Box<dyn Future<Output = Result<TaskOutput, TaskError>> + Send + 'a>> {
        Box::pin(self.execute(task))
    }
}

/// Type-erased task executor, used to store executors of different concrete
/// types in one dispatcher.
pub struct BoxTaskExecutor {
    inner: Box<dyn TaskExecutorDyn>,
}

impl BoxTaskExecutor {
    pub fn new<T: TaskExecutor + 'static>(executor: T) -> Self {
        Self {
            inner: Box::new(executor),
        }
    }
}

impl TaskExecutor for BoxTaskExecutor {
    fn execute(
        &self,
        task: &TaskConfig,
    ) -> impl Future<Output = Result<TaskOutput, TaskError>> + Send {
        async move { self.inner.execute_boxed(task).await }
    }
}

impl std::fmt::Debug for BoxTaskExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxTaskExecutor").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::FnExecutor;
    use serde_json::json;

    #[tokio::test]
    async fn test_boxed_executor_delegates() {
        let boxed = BoxTaskExecutor::new(FnExecutor::new(|task: TaskConfig| async move {
            Ok(json!(task.task_id))
        }));
        let out = boxed.execute(&TaskConfig::new("x", "echo")).await.unwrap();
        assert_eq!(out, json!("x"));
    }
}
