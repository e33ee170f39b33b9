//! Task domain types.
//!
//! `TaskConfig` is the declarative input for a single unit of work; `Task` is
//! the graph-owned node that wraps a config with its runtime status and result.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::execution::ExecutionResult;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle state of a task within a single run.
///
/// `Pending -> Running -> {Success | Retrying -> Running | Failed}`.
/// `Skipped` and `Cancelled` are only reached through external cancellation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Running,
    Retrying,
    Success,
    Failed,
    Skipped,
    Cancelled,
}

impl TaskStatus {
    /// Whether the task can no longer change state within this run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Success | TaskStatus::Failed | TaskStatus::Skipped | TaskStatus::Cancelled
        )
    }

    /// Whether the task currently occupies a concurrency slot.
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Running | TaskStatus::Retrying)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Retrying => "retrying",
            TaskStatus::Success => "success",
            TaskStatus::Failed => "failed",
            TaskStatus::Skipped => "skipped",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Task priority. Ordering is `Low < Medium < High < Critical`.
///
/// Only used to order the dispatch of simultaneously ready tasks.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Per-task retry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt (default 3).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay between attempts in seconds (default 60).
    #[serde(default = "default_retry_delay_secs", alias = "retry_delay")]
    pub retry_delay_secs: f64,
    /// Double the delay on every further retry (default true).
    #[serde(default = "default_exponential_backoff")]
    pub exponential_backoff: bool,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> f64 {
    60.0
}

fn default_exponential_backoff() -> bool {
    true
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            retry_delay_secs: 0.0,
            exponential_backoff: false,
        }
    }

    /// A policy with a fixed delay between attempts.
    pub fn fixed(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay_secs: retry_delay.as_secs_f64(),
            exponential_backoff: false,
        }
    }

    /// A policy whose delay doubles on every retry.
    pub fn exponential(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay_secs: retry_delay.as_secs_f64(),
            exponential_backoff: true,
        }
    }

    /// The base delay as a `Duration`.
    ///
    /// Delays too large for a `Duration` (including `+inf`) saturate at
    /// `Duration::MAX`; negative and NaN values map to zero.
    pub fn retry_delay(&self) -> Duration {
        let secs = self.retry_delay_secs;
        if secs.is_nan() || secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            exponential_backoff: default_exponential_backoff(),
        }
    }
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// Declared resource needs of a task.
///
/// Advisory only: the scheduler does not enforce them. `timeout_seconds` is
/// the critical-path weight and can be enforced by wrapping the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    #[serde(default = "default_cpu_cores")]
    pub cpu_cores: f64,
    #[serde(default = "default_memory_mb")]
    pub memory_mb: u64,
    #[serde(default)]
    pub gpu_count: u32,
    #[serde(default)]
    pub disk_mb: u64,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_cpu_cores() -> f64 {
    1.0
}

fn default_memory_mb() -> u64 {
    512
}

fn default_timeout_seconds() -> u64 {
    3600
}

impl Default for ResourceRequirements {
    fn default() -> Self {
        Self {
            cpu_cores: default_cpu_cores(),
            memory_mb: default_memory_mb(),
            gpu_count: 0,
            disk_mb: 0,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

// ---------------------------------------------------------------------------
// TaskConfig
// ---------------------------------------------------------------------------

/// Declarative configuration of a single task.
///
/// This is also what task executors receive when invoked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Unique task ID within a workflow (e.g. "load-data").
    pub task_id: String,
    /// Human-readable name. Falls back to `task_id` when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Discriminator used to select the executor.
    pub task_type: String,
    /// Opaque key/value bag handed to the executor.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub parameters: HashMap<String, Value>,
    /// IDs of tasks that must succeed before this one runs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub retry_policy: RetryPolicy,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, alias = "resource_requirements")]
    pub resources: ResourceRequirements,
}

impl TaskConfig {
    /// Create a task with default policy, priority and resources.
    pub fn new(task_id: impl Into<String>, task_type: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            name: String::new(),
            task_type: task_type.into(),
            parameters: HashMap::new(),
            dependencies: Vec::new(),
            retry_policy: RetryPolicy::default(),
            priority: Priority::default(),
            resources: ResourceRequirements::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.resources.timeout_seconds = secs;
        self
    }

    /// Name for display, falling back to the task ID.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.task_id
        } else {
            &self.name
        }
    }

    /// Declared timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.resources.timeout_seconds)
    }

    /// Look up a string parameter.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A node of the task graph: configuration plus runtime state.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    #[serde(flatten)]
    pub config: TaskConfig,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
}

impl Task {
    pub fn new(config: TaskConfig) -> Self {
        Self {
            config,
            status: TaskStatus::Pending,
            result: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.config.task_id
    }

    pub fn dependencies(&self) -> &[String] {
        &self.config.dependencies
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_config_defaults_from_yaml() {
        let yaml = r#"
task_id: load
task_type: shell
"#;
        let config: TaskConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.retry_policy.max_retries, 3);
        assert_eq!(config.retry_policy.retry_delay(), Duration::from_secs(60));
        assert!(config.retry_policy.exponential_backoff);
        assert_eq!(config.priority, Priority::Medium);
        assert_eq!(config.resources.timeout_seconds, 3600);
        assert!(config.dependencies.is_empty());
        assert_eq!(config.display_name(), "load");
    }

    #[test]
    fn test_retry_delay_alias_accepted() {
        let yaml = r#"
max_retries: 2
retry_delay: 0.5
exponential_backoff: false
"#;
        let policy: RetryPolicy = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.retry_delay(), Duration::from_millis(500));
        assert!(!policy.exponential_backoff);
    }

    #[test]
    fn test_negative_delay_maps_to_zero() {
        let policy = RetryPolicy {
            max_retries: 1,
            retry_delay_secs: -3.0,
            exponential_backoff: false,
        };
        assert_eq!(policy.retry_delay(), Duration::ZERO);
    }

    #[test]
    fn test_oversized_delay_saturates() {
        let policy = RetryPolicy {
            max_retries: 1,
            retry_delay_secs: 1e30,
            exponential_backoff: true,
        };
        assert_eq!(policy.retry_delay(), Duration::MAX);

        let infinite = RetryPolicy {
            retry_delay_secs: f64::INFINITY,
            ..policy.clone()
        };
        assert_eq!(infinite.retry_delay(), Duration::MAX);

        let nan = RetryPolicy {
            retry_delay_secs: f64::NAN,
            ..policy
        };
        assert_eq!(nan.retry_delay(), Duration::ZERO);
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }

    #[test]
    fn test_status_terminal_and_active() {
        assert!(TaskStatus::Success.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::Retrying.is_terminal());
        assert!(TaskStatus::Retrying.is_active());
        assert!(!TaskStatus::Pending.is_active());
        assert_eq!(TaskStatus::Retrying.to_string(), "retrying");
    }

    #[test]
    fn test_builder_methods() {
        let config = TaskConfig::new("train", "model")
            .with_name("Train model")
            .with_dependencies(["load", "clean"])
            .with_parameter("epochs", json!(5))
            .with_priority(Priority::High)
            .with_timeout_secs(120);
        assert_eq!(config.display_name(), "Train model");
        assert_eq!(config.dependencies, vec!["load", "clean"]);
        assert_eq!(config.parameters["epochs"], json!(5));
        assert_eq!(config.timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_task_serializes_flat() {
        let task = Task::new(TaskConfig::new("a", "echo"));
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["task_id"], "a");
        assert_eq!(value["status"], "pending");
        assert!(value.get("result").is_none());
    }
}
