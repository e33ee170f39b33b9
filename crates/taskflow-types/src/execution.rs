//! Execution tracking types: per-task results and the aggregate run record.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::task::TaskStatus;

// ---------------------------------------------------------------------------
// ExecutionResult
// ---------------------------------------------------------------------------

/// Outcome of one task's attempt sequence. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub task_id: String,
    /// `Success` or `Failed`.
    pub status: TaskStatus,
    /// Output returned by the executor (null on failure).
    #[serde(default)]
    pub output: Value,
    /// Error message of the last failed attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Start of the first attempt.
    pub start_time: DateTime<Utc>,
    /// End of the last attempt.
    pub end_time: DateTime<Utc>,
    /// `end_time - start_time`, including backoff sleeps.
    pub duration_ms: u64,
    /// Attempts made beyond the first.
    pub retry_count: u32,
}

impl ExecutionResult {
    pub fn success(
        task_id: impl Into<String>,
        output: Value,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        retry_count: u32,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Success,
            output,
            error: None,
            start_time,
            end_time,
            duration_ms: elapsed_ms(start_time, end_time),
            retry_count,
        }
    }

    pub fn failure(
        task_id: impl Into<String>,
        error: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        retry_count: u32,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Failed,
            output: Value::Null,
            error: Some(error.into()),
            start_time,
            end_time,
            duration_ms: elapsed_ms(start_time, end_time),
            retry_count,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

fn elapsed_ms(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    (end - start)
        .to_std()
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// WorkflowExecution
// ---------------------------------------------------------------------------

/// Overall status of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Success,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Success | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Aggregate record of a single workflow run.
///
/// Created when the run starts and frozen by [`WorkflowExecution::finish`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecution {
    /// UUIDv7 run ID.
    pub execution_id: Uuid,
    pub workflow_id: String,
    pub status: ExecutionStatus,
    pub tasks_total: usize,
    pub tasks_completed: usize,
    pub tasks_failed: usize,
    /// Per-task results in completion order.
    pub task_results: Vec<ExecutionResult>,
    /// Tasks that never ran: blocked by a failed dependency, left behind by
    /// fail-fast, or cancelled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved_tasks: Vec<String>,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl WorkflowExecution {
    /// Open a new run record in the `Running` state.
    pub fn start(workflow_id: impl Into<String>, tasks_total: usize) -> Self {
        Self {
            execution_id: Uuid::now_v7(),
            workflow_id: workflow_id.into(),
            status: ExecutionStatus::Running,
            tasks_total,
            tasks_completed: 0,
            tasks_failed: 0,
            task_results: Vec::new(),
            unresolved_tasks: Vec::new(),
            start_time: Utc::now(),
            end_time: None,
        }
    }

    /// Close the record with the collected results.
    ///
    /// Status is `Cancelled` when `cancelled`, otherwise `Success` only if no
    /// task failed and nothing was left unresolved.
    pub fn finish(
        &mut self,
        task_results: Vec<ExecutionResult>,
        unresolved_tasks: Vec<String>,
        cancelled: bool,
    ) {
        self.tasks_completed = task_results.iter().filter(|r| r.is_success()).count();
        self.tasks_failed = task_results.len() - self.tasks_completed;
        self.task_results = task_results;
        self.unresolved_tasks = unresolved_tasks;
        self.status = if cancelled {
            ExecutionStatus::Cancelled
        } else if self.tasks_failed == 0 && self.unresolved_tasks.is_empty() {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::Failed
        };
        self.end_time = Some(Utc::now());
    }

    /// Wall-clock duration once finished.
    pub fn duration(&self) -> Option<Duration> {
        self.end_time
            .and_then(|end| (end - self.start_time).to_std().ok())
    }

    /// Look up the result of a task by ID.
    pub fn result_for(&self, task_id: &str) -> Option<&ExecutionResult> {
        self.task_results.iter().find(|r| r.task_id == task_id)
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Live progress counters of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowProgress {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub percent_complete: f64,
}

impl WorkflowProgress {
    /// Tally progress from task statuses.
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = TaskStatus>,
    {
        let mut progress = Self::default();
        for status in statuses {
            progress.total += 1;
            match status {
                TaskStatus::Pending => progress.pending += 1,
                TaskStatus::Running | TaskStatus::Retrying => progress.running += 1,
                TaskStatus::Success => progress.completed += 1,
                TaskStatus::Failed => progress.failed += 1,
                TaskStatus::Skipped | TaskStatus::Cancelled => progress.cancelled += 1,
            }
        }
        if progress.total > 0 {
            let finished = progress.completed + progress.failed + progress.cancelled;
            progress.percent_complete = finished as f64 * 100.0 / progress.total as f64;
        }
        progress
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
