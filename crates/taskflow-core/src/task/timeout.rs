//! Timeout enforcement for task attempts.
//!
//! The engine treats `resources.timeout_seconds` as metadata. Wrapping an
//! executor in `TimeoutExecutor` turns it into a hard per-attempt limit.

use std::time::Duration;

use taskflow_types::error::TaskError;
use taskflow_types::task::TaskConfig;

use super::executor::{TaskExecutor, TaskOutput};

/// Fails an attempt with [`TaskError::Timeout`] once the task's declared
/// timeout (optionally capped) elapses.
pub struct TimeoutExecutor<E> {
    inner: E,
    cap: Option<Duration>,
}

impl<E> TimeoutExecutor<E> {
    pub fn new(inner: E) -> Self {
        Self { inner, cap: None }
    }

    /// Never wait longer than `cap`, whatever the task declares.
    pub fn with_cap(inner: E, cap: Duration) -> Self {
        Self {
            inner,
            cap: Some(cap),
        }
    }

    fn limit_for(&self, task: &TaskConfig) -> Duration {
        match self.cap {
            Some(cap) => task.timeout().min(cap),
            None => task.timeout(),
        }
    }
}

impl<E: TaskExecutor> TaskExecutor for TimeoutExecutor<E> {
    async fn execute(&self, task: &TaskConfig) -> Result<TaskOutput, TaskError> {
        let limit = self.limit_for(task);
        match tokio::time::timeout(limit, self.inner.execute(task)).await {
            Ok(result) => result,
            Err(_elapsed) => {
                tracing::warn!(
                    task_id = task.task_id.as_str(),
                    limit_ms = limit.as_millis() as u64,
                    "task attempt timed out"
                );
                Err(TaskError::Timeout {
                    secs: limit.as_secs(),
                })
            }
        }
    }
}
