use thiserror::Error;

/// Errors produced by a single task attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The executor reported a failure. Retried per policy.
    #[error("{0}")]
    Failed(String),

    /// No executor is registered for the task type. Never retried.
    #[error("unknown task type '{0}'")]
    UnknownTaskType(String),

    /// The attempt exceeded the task's declared timeout. Retried per policy.
    #[error("task timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The executor panicked. Never retried.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The parameters handed to the executor are unusable. Never retried.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}

impl TaskError {
    pub fn failed(msg: impl Into<String>) -> Self {
        TaskError::Failed(msg.into())
    }

    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::Failed(_) | TaskError::Timeout { .. })
    }
}
