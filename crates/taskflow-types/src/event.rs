//! Lifecycle events broadcast while a workflow runs.
//!
//! `ExecutionEvent` is the unified event type published on the event bus.
//! All variants are Clone + Send + Sync for use with tokio broadcast channels.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::execution::ExecutionStatus;

/// Events emitted by the coordinator and the graph executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEvent {
    /// A run has been created and scheduling is about to begin.
    WorkflowStarted {
        execution_id: Uuid,
        workflow_id: String,
        tasks_total: usize,
    },

    /// A task attempt has started (attempt is 1-based).
    TaskStarted {
        execution_id: Uuid,
        task_id: String,
        attempt: u32,
    },

    /// An attempt failed and the task will be retried after `delay_ms`.
    TaskRetrying {
        execution_id: Uuid,
        task_id: String,
        /// 1-based retry number.
        retry: u32,
        delay_ms: u64,
        error: String,
    },

    TaskCompleted {
        execution_id: Uuid,
        task_id: String,
        retry_count: u32,
        duration_ms: u64,
    },

    /// A task failed permanently.
    TaskFailed {
        execution_id: Uuid,
        task_id: String,
        error: String,
        retry_count: u32,
    },

    /// Pending tasks remain but none can ever become ready.
    DeadlockDetected {
        execution_id: Uuid,
        unresolved: Vec<String>,
    },

    /// External cancellation stopped scheduling.
    WorkflowCancelled {
        execution_id: Uuid,
        cancelled_tasks: Vec<String>,
    },

    WorkflowFinished {
        execution_id: Uuid,
        status: ExecutionStatus,
        tasks_completed: usize,
        tasks_failed: usize,
        duration_ms: u64,
    },
}

impl ExecutionEvent {
    /// The run this event belongs to.
    pub fn execution_id(&self) -> Uuid {
        match self {
            ExecutionEvent::WorkflowStarted { execution_id, .. }
            | ExecutionEvent::TaskStarted { execution_id, .. }
            | ExecutionEvent::TaskRetrying { execution_id, .. }
            | ExecutionEvent::TaskCompleted { execution_id, .. }
            | ExecutionEvent::TaskFailed { execution_id, .. }
            | ExecutionEvent::DeadlockDetected { execution_id, .. }
            | ExecutionEvent::WorkflowCancelled { execution_id, .. }
            | ExecutionEvent::WorkflowFinished { execution_id, .. } => *execution_id,
        }
    }

    /// The task this event concerns, if any.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            ExecutionEvent::TaskStarted { task_id, .. }
            | ExecutionEvent::TaskRetrying { task_id, .. }
            | ExecutionEvent::TaskCompleted { task_id, .. }
            | ExecutionEvent::TaskFailed { task_id, .. } => Some(task_id),

            ExecutionEvent::WorkflowStarted { .. }
            | ExecutionEvent::DeadlockDetected { .. }
            | ExecutionEvent::WorkflowCancelled { .. }
            | ExecutionEvent::WorkflowFinished { .. } => None,
        }
    }
}
