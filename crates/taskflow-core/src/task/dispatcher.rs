//! Task dispatcher: routes a task to the executor registered for its type.
//!
//! A simple `task_type`-indexed registry of boxed executors. The dispatcher
//! is itself a [`TaskExecutor`], so the graph executor never needs to know
//! about task types.

use std::collections::HashMap;

use taskflow_types::error::TaskError;
use taskflow_types::task::TaskConfig;

use super::box_executor::BoxTaskExecutor;
use super::executor::{TaskExecutor, TaskOutput};

/// Registry of task executors, indexed by task type.
#[derive(Debug, Default)]
pub struct TaskDispatcher {
    executors: HashMap<String, BoxTaskExecutor>,
}

impl TaskDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor for a task type.
    ///
    /// If an executor for this type already exists, it is replaced.
    pub fn register<E: TaskExecutor + 'static>(&mut self, task_type: impl Into<String>, executor: E) {
        self.executors
            .insert(task_type.into(), BoxTaskExecutor::new(executor));
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<E: TaskExecutor + 'static>(mut self, task_type: impl Into<String>, executor: E) -> Self {
        self.register(task_type, executor);
        self
    }

    pub fn get(&self, task_type: &str) -> Option<&BoxTaskExecutor> {
        self.executors.get(task_type)
    }

    pub fn contains(&self, task_type: &str) -> bool {
        self.executors.contains_key(task_type)
    }

    /// Registered task types, sorted.
    pub fn task_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.executors.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Task types used by `tasks` that have no registered executor.
    pub fn missing_types<'a>(&self, tasks: impl IntoIterator<Item = &'a TaskConfig>) -> Vec<String> {
        let mut missing: Vec<String> = tasks
            .into_iter()
            .filter(|t| !self.contains(&t.task_type))
            .map(|t| t.task_type.clone())
            .collect();
        missing.sort_unstable();
        missing.dedup();
        missing
    }
}

impl TaskExecutor for TaskDispatcher {
    async fn execute(&self, task: &TaskConfig) -> Result<TaskOutput, TaskError> {
        match self.executors.get(&task.task_type) {
            Some(executor) => executor.execute(task).await,
            None => Err(TaskError::UnknownTaskType(task.task_type.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::FnExecutor;
    use serde_json::json;

    fn dispatcher() -> TaskDispatcher {
        TaskDispatcher::new()
            .with("echo", FnExecutor::new(|t: TaskConfig| async move { Ok(json!(t.task_id)) }))
            .with("fail", FnExecutor::new(|_t: TaskConfig| async move {
                Err(TaskError::failed("always"))
            }))
    }

    #[tokio::test]
    async fn test_routes_by_task_type() {
        let d = dispatcher();
        let out = d.execute(&TaskConfig::new("a", "echo")).await.unwrap();
        assert_eq!(out, json!("a"));
        let err = d.execute(&TaskConfig::new("b", "fail")).await.unwrap_err();
        assert_eq!(err, TaskError::failed("always"));
    }

    #[tokio::test]
    async fn test_unknown_type_is_not_retryable() {
        let d = dispatcher();
        let err = d.execute(&TaskConfig::new("a", "train")).await.unwrap_err();
        assert_eq!(err, TaskError::UnknownTaskType("train".into()));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_lists_and_reports_missing_types() {
        let d = dispatcher();
        assert_eq!(d.task_types(), vec!["echo", "fail"]);
        let tasks = vec![
            TaskConfig::new("a", "echo"),
            TaskConfig::new("b", "train"),
            TaskConfig::new("c", "train"),
        ];
        assert_eq!(d.missing_types(&tasks), vec!["train"]);
    }
}
