//! Workflow coordinator: owns one workflow run end to end.
//!
//! A `WorkflowCoordinator` turns a `WorkflowConfig` into a validated
//! [`TaskGraph`], runs it once through the [`GraphExecutor`] with the
//! caller-supplied executor (normally a [`TaskDispatcher`]), and keeps the
//! resulting `WorkflowExecution`. Status, progress and visualization can be
//! read from other tasks while the run is in flight.
//!
//! Coordinators are independent values: several can run concurrently in one
//! process without sharing any state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use taskflow_types::event::ExecutionEvent;
use taskflow_types::execution::{ExecutionStatus, WorkflowExecution, WorkflowProgress};
use taskflow_types::visualization::WorkflowVisualization;
use taskflow_types::workflow::WorkflowConfig;
use tokio::sync::{RwLock, broadcast};
use tokio_util::sync::CancellationToken;

use crate::event::EventBus;
use crate::task::{TaskDispatcher, TaskExecutor};

use super::definition::{WorkflowError, validate_config};
use super::executor::{ExecutorConfig, GraphExecutor};
use super::graph::{GraphError, TaskGraph};
use super::retry::{Sleeper, TokioSleeper};

/// Build a validated graph from a workflow config.
///
/// Tasks are added in declaration order, so every dependency must be
/// declared before the task that uses it.
pub fn build_graph(config: &WorkflowConfig) -> Result<TaskGraph, GraphError> {
    let mut graph = TaskGraph::new();
    for task in &config.tasks {
        graph.add_task(task.clone())?;
    }
    graph.validate()?;
    Ok(graph)
}

/// Coordinates a single run of one workflow.
pub struct WorkflowCoordinator<E = TaskDispatcher> {
    config: WorkflowConfig,
    graph: Arc<RwLock<TaskGraph>>,
    dispatcher: Arc<E>,
    event_bus: EventBus,
    sleeper: Arc<dyn Sleeper>,
    cancel: CancellationToken,
    execution: RwLock<Option<WorkflowExecution>>,
}

impl<E: TaskExecutor + 'static> WorkflowCoordinator<E> {
    /// Validate `config`, build its graph and wire the executor.
    ///
    /// Fails before anything runs if the config is malformed, references an
    /// unknown dependency, or contains a cycle.
    pub fn build(config: WorkflowConfig, dispatcher: E) -> Result<Self, WorkflowError> {
        validate_config(&config)?;
        let graph = build_graph(&config)?;
        tracing::debug!(
            workflow_id = config.workflow_id.as_str(),
            tasks = graph.len(),
            "workflow graph built"
        );
        Ok(Self {
            config,
            graph: Arc::new(RwLock::new(graph)),
            dispatcher: Arc::new(dispatcher),
            event_bus: EventBus::default(),
            sleeper: Arc::new(TokioSleeper),
            cancel: CancellationToken::new(),
            execution: RwLock::new(None),
        })
    }

    /// Publish lifecycle events on `bus` instead of a private bus.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = bus;
        self
    }

    /// Replace the sleeper used for retry backoff.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Override the workflow's `max_parallel_tasks`.
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.config.max_parallel_tasks = max_parallel;
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn workflow_id(&self) -> &str {
        &self.config.workflow_id
    }

    /// Shared handle to the graph, for read-only snapshots.
    pub fn graph(&self) -> Arc<RwLock<TaskGraph>> {
        Arc::clone(&self.graph)
    }

    pub fn dispatcher(&self) -> &E {
        &self.dispatcher
    }

    /// Run the workflow to completion.
    ///
    /// A coordinator runs at most once; a second call fails with
    /// [`WorkflowError::AlreadyExecuted`]. Task failures do not produce an
    /// `Err`: they are reflected in the returned execution's status.
    #[tracing::instrument(
        name = "workflow_run",
        skip_all,
        fields(workflow_id = %self.config.workflow_id)
    )]
    pub async fn run(&self) -> Result<WorkflowExecution, WorkflowError> {
        let tasks_total = self.graph.read().await.len();
        let execution_id = {
            let mut slot = self.execution.write().await;
            if slot.is_some() {
                return Err(WorkflowError::AlreadyExecuted(self.config.workflow_id.clone()));
            }
            let execution = WorkflowExecution::start(self.config.workflow_id.clone(), tasks_total);
            let id = execution.execution_id;
            *slot = Some(execution);
            id
        };

        tracing::info!(
            execution_id = %execution_id,
            tasks_total,
            max_parallel = self.config.max_parallel_tasks,
            failure_strategy = %self.config.failure_strategy,
            "workflow started"
        );
        self.event_bus.publish(ExecutionEvent::WorkflowStarted {
            execution_id,
            workflow_id: self.config.workflow_id.clone(),
            tasks_total,
        });

        let outcome = match GraphExecutor::new(
            ExecutorConfig::from_workflow(&self.config),
            self.event_bus.clone(),
        ) {
            Ok(executor) => {
                executor
                    .with_sleeper(Arc::clone(&self.sleeper))
                    .execute(execution_id, &self.graph, Arc::clone(&self.dispatcher), &self.cancel)
                    .await
            }
            Err(e) => Err(e),
        };

        let mut slot = self.execution.write().await;
        let Some(execution) = slot.as_mut() else {
            return Err(WorkflowError::NoExecution(self.config.workflow_id.clone()));
        };

        match outcome {
            Ok(report) => {
                execution.finish(report.results, report.unresolved, report.cancelled);
            }
            Err(e) => {
                tracing::error!(execution_id = %execution_id, error = %e, "workflow aborted");
                execution.finish(Vec::new(), Vec::new(), false);
                execution.status = ExecutionStatus::Failed;
                return Err(e.into());
            }
        }

        let duration_ms = execution
            .duration()
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        tracing::info!(
            execution_id = %execution_id,
            status = %execution.status,
            tasks_completed = execution.tasks_completed,
            tasks_failed = execution.tasks_failed,
            unresolved = execution.unresolved_tasks.len(),
            duration_ms,
            "workflow finished"
        );
        self.event_bus.publish(ExecutionEvent::WorkflowFinished {
            execution_id,
            status: execution.status,
            tasks_completed: execution.tasks_completed,
            tasks_failed: execution.tasks_failed,
            duration_ms,
        });

        Ok(execution.clone())
    }

    /// Snapshot of the current or last execution, `None` before `run`.
    ///
    /// While the run is in flight the completed/failed counts are taken
    /// live from the graph.
    pub async fn status(&self) -> Option<WorkflowExecution> {
        let mut snapshot = self.execution.read().await.clone()?;
        if snapshot.status == ExecutionStatus::Running {
            let progress = self.progress().await;
            snapshot.tasks_completed = progress.completed;
            snapshot.tasks_failed = progress.failed;
        }
        Some(snapshot)
    }

    /// Live task counters taken from the graph.
    pub async fn progress(&self) -> WorkflowProgress {
        let graph = self.graph.read().await;
        WorkflowProgress::from_statuses(graph.tasks().map(|task| task.status))
    }

    /// Graph snapshot with critical path and execution levels.
    pub async fn visualize(&self) -> Result<WorkflowVisualization, WorkflowError> {
        let graph = self.graph.read().await;
        Ok(WorkflowVisualization {
            graph: graph.visualize(),
            critical_path: graph.critical_path()?,
            execution_order: graph.execution_order()?,
        })
    }

    /// Write `<workflow_id>-execution.json` and
    /// `<workflow_id>-visualization.json` into `dir`, creating it if needed.
    ///
    /// Returns the two paths written.
    pub async fn export(&self, dir: &Path) -> Result<(PathBuf, PathBuf), WorkflowError> {
        let execution = self
            .status()
            .await
            .ok_or_else(|| WorkflowError::NoExecution(self.config.workflow_id.clone()))?;
        let visualization = self.visualize().await?;

        tokio::fs::create_dir_all(dir).await?;
        let execution_path = dir.join(format!("{}-execution.json", self.config.workflow_id));
        let visualization_path = dir.join(format!("{}-visualization.json", self.config.workflow_id));

        let execution_json = serde_json::to_string_pretty(&execution)
            .map_err(|e| WorkflowError::Serialize(e.to_string()))?;
        let visualization_json = serde_json::to_string_pretty(&visualization)
            .map_err(|e| WorkflowError::Serialize(e.to_string()))?;
        tokio::fs::write(&execution_path, execution_json).await?;
        tokio::fs::write(&visualization_path, visualization_json).await?;

        tracing::info!(
            workflow_id = self.config.workflow_id.as_str(),
            dir = %dir.display(),
            "execution exported"
        );
        Ok((execution_path, visualization_path))
    }

    /// Stop scheduling new tasks. Running tasks finish; pending ones are
    /// marked cancelled.
    pub fn cancel(&self) {
        tracing::info!(workflow_id = self.config.workflow_id.as_str(), "cancel requested");
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Receive lifecycle events of this coordinator's run.
    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }
}

impl<E> std::fmt::Debug for WorkflowCoordinator<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowCoordinator")
            .field("workflow_id", &self.config.workflow_id)
            .field("tasks", &self.config.tasks.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
