//! Workflow configuration: the declarative input of a run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::task::TaskConfig;

/// Default number of task executions allowed in flight at once.
pub const DEFAULT_MAX_PARALLEL_TASKS: usize = 10;

// ---------------------------------------------------------------------------
// Failure strategy
// ---------------------------------------------------------------------------

/// What the engine does after a task fails permanently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStrategy {
    /// Stop scheduling new tasks; let running tasks finish.
    #[default]
    FailFast,
    /// Keep scheduling every task whose dependencies succeeded.
    Continue,
    /// Accepted for compatibility; schedules exactly like `Continue`.
    RetryAll,
}

impl FailureStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStrategy::FailFast => "fail_fast",
            FailureStrategy::Continue => "continue",
            FailureStrategy::RetryAll => "retry_all",
        }
    }

    /// Whether the first permanent failure halts scheduling.
    pub fn halts_on_failure(&self) -> bool {
        matches!(self, FailureStrategy::FailFast)
    }
}

impl fmt::Display for FailureStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "fail_fast" => Ok(FailureStrategy::FailFast),
            "continue" => Ok(FailureStrategy::Continue),
            "retry_all" => Ok(FailureStrategy::RetryAll),
            other => Err(format!(
                "unknown failure strategy '{other}' (expected fail_fast, continue or retry_all)"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkflowConfig
// ---------------------------------------------------------------------------

/// Declarative workflow: a list of tasks plus scheduling settings.
///
/// ```yaml
/// workflow_id: nightly-etl
/// max_parallel_tasks: 4
/// failure_strategy: continue
/// tasks:
///   - task_id: extract
///     task_type: shell
///   - task_id: load
///     task_type: shell
///     dependencies: [extract]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub workflow_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tasks in declaration order. Dependencies must be declared first.
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
    #[serde(default = "default_max_parallel_tasks")]
    pub max_parallel_tasks: usize,
    #[serde(default)]
    pub failure_strategy: FailureStrategy,
}

fn default_max_parallel_tasks() -> usize {
    DEFAULT_MAX_PARALLEL_TASKS
}

impl WorkflowConfig {
    pub fn new(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            name: String::new(),
            description: None,
            tasks: Vec::new(),
            max_parallel_tasks: DEFAULT_MAX_PARALLEL_TASKS,
            failure_strategy: FailureStrategy::default(),
        }
    }

    pub fn with_task(mut self, task: TaskConfig) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn with_max_parallel_tasks(mut self, max: usize) -> Self {
        self.max_parallel_tasks = max;
        self
    }

    pub fn with_failure_strategy(mut self, strategy: FailureStrategy) -> Self {
        self.failure_strategy = strategy;
        self
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.workflow_id
        } else {
            &self.name
        }
    }
}
