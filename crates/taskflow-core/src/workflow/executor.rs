//! Graph executor: ready-set driven, bounded-concurrency task scheduling.
//!
//! The `GraphExecutor` runs every task of a validated [`TaskGraph`]. Unlike a
//! wave scheduler it never waits for a whole topological level: whenever a
//! slot frees up it recomputes the ready set and dispatches what it can.
//!
//! # Execution flow
//!
//! 1. Validate the graph (acyclic) and the executor config.
//! 2. Dispatch ready tasks while the semaphore has permits.
//! 3. Wait for one event: a worker status update, a finished task, or
//!    external cancellation.
//! 4. Record the finished task's result, apply the failure strategy, repeat.
//! 5. Stop when nothing is running and nothing more can be dispatched.
//!
//! Workers (one per dispatched task) run the retry loop and report
//! `Retrying`/`Running` transitions over an mpsc channel. Only the control
//! loop mutates graph state.

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures_util::FutureExt;
use taskflow_types::error::TaskError;
use taskflow_types::event::ExecutionEvent;
use taskflow_types::execution::ExecutionResult;
use taskflow_types::task::{TaskConfig, TaskStatus};
use taskflow_types::workflow::{DEFAULT_MAX_PARALLEL_TASKS, FailureStrategy, WorkflowConfig};
use tokio::sync::{RwLock, Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::event::EventBus;
use crate::task::TaskExecutor;

use super::graph::{GraphError, TaskGraph};
use super::retry::{RetryDecision, RetryHandler, Sleeper, TokioSleeper};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that prevent the executor from running a graph at all.
///
/// Task failures are never returned here; they end up in the report.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("invalid executor config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("task worker aborted: {0}")]
    WorkerAborted(#[from] tokio::task::JoinError),
}

// ---------------------------------------------------------------------------
// Config and report
// ---------------------------------------------------------------------------

/// Scheduling knobs of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Upper bound on task executions in flight at once.
    pub max_parallel: usize,
    pub failure_strategy: FailureStrategy,
}

impl ExecutorConfig {
    pub fn new(max_parallel: usize, failure_strategy: FailureStrategy) -> Self {
        Self {
            max_parallel,
            failure_strategy,
        }
    }

    pub fn from_workflow(config: &WorkflowConfig) -> Self {
        Self::new(config.max_parallel_tasks, config.failure_strategy)
    }

    pub fn validate(&self) -> Result<(), ExecutorError> {
        if self.max_parallel == 0 {
            return Err(ExecutorError::InvalidConfig(
                "max_parallel must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PARALLEL_TASKS, FailureStrategy::default())
    }
}

/// Outcome of one `execute` call.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    /// Final result of every task that ran, in completion order.
    pub results: Vec<ExecutionResult>,
    /// Tasks that never ran: blocked by a failed dependency, halted by
    /// fail-fast, or cancelled.
    pub unresolved: Vec<String>,
    /// Pending tasks remained with nothing running and nothing ready.
    pub deadlocked: bool,
    /// Scheduling was stopped by the cancellation token.
    pub cancelled: bool,
}

impl ExecutionReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

/// Status transition reported by a worker between attempts.
#[derive(Debug)]
struct StatusUpdate {
    task_id: String,
    status: TaskStatus,
}

// ---------------------------------------------------------------------------
// GraphExecutor
// ---------------------------------------------------------------------------

/// Runs a task graph with bounded concurrency, retries and a failure strategy.
pub struct GraphExecutor {
    config: ExecutorConfig,
    sleeper: Arc<dyn Sleeper>,
    event_bus: EventBus,
}

impl GraphExecutor {
    pub fn new(config: ExecutorConfig, event_bus: EventBus) -> Result<Self, ExecutorError> {
        config.validate()?;
        Ok(Self {
            config,
            sleeper: Arc::new(TokioSleeper),
            event_bus,
        })
    }

    /// Replace the backoff sleeper (tests inject a recording sleeper).
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute every task of `graph`.
    ///
    /// The graph is shared so that readers (visualization, progress) can take
    /// snapshots while the run is in progress; only this loop writes to it.
    /// Running tasks are always allowed to finish, including under fail-fast
    /// and cancellation.
    #[tracing::instrument(
        name = "graph_execute",
        skip_all,
        fields(
            execution_id = %execution_id,
            max_parallel = self.config.max_parallel,
            failure_strategy = %self.config.failure_strategy,
        )
    )]
    pub async fn execute<E>(
        &self,
        execution_id: Uuid,
        graph: &Arc<RwLock<TaskGraph>>,
        runner: Arc<E>,
        cancel: &CancellationToken,
    ) -> Result<ExecutionReport, ExecutorError>
    where
        E: TaskExecutor + 'static,
    {
        let total = {
            let g = graph.read().await;
            g.validate()?;
            g.len()
        };

        if self.config.failure_strategy == FailureStrategy::RetryAll {
            tracing::warn!("retry_all has no dedicated semantics; scheduling as continue");
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel));
        let (update_tx, mut update_rx) = mpsc::unbounded_channel::<StatusUpdate>();
        let mut join_set: JoinSet<ExecutionResult> = JoinSet::new();

        let mut completed: HashSet<String> = HashSet::new();
        let mut running: HashSet<String> = HashSet::new();
        let mut report = ExecutionReport {
            results: Vec::with_capacity(total),
            ..ExecutionReport::default()
        };
        let mut halted = false;

        loop {
            if !report.cancelled && cancel.is_cancelled() {
                report.cancelled = true;
                tracing::info!(running = running.len(), "cancellation requested, draining");
            }

            if !halted && !report.cancelled {
                let mut g = graph.write().await;
                let ready: Vec<TaskConfig> = g
                    .ready_tasks(&completed)
                    .into_iter()
                    .map(|task| task.config.clone())
                    .collect();

                for config in ready {
                    let Ok(permit) = Arc::clone(&semaphore).try_acquire_owned() else {
                        break;
                    };
                    g.set_status(&config.task_id, TaskStatus::Running)?;
                    running.insert(config.task_id.clone());
                    tracing::debug!(task_id = config.task_id.as_str(), "dispatching task");

                    let worker = run_task(
                        execution_id,
                        config,
                        Arc::clone(&runner),
                        Arc::clone(&self.sleeper),
                        update_tx.clone(),
                        self.event_bus.clone(),
                    );
                    join_set.spawn(async move {
                        let _permit = permit;
                        worker.await
                    });
                }
            }

            if running.is_empty() {
                self.finish_pending(execution_id, graph, halted, &mut report)
                    .await?;
                break;
            }

            tokio::select! {
                biased;

                Some(update) = update_rx.recv() => {
                    // A late update for a task that already finished is stale.
                    if running.contains(&update.task_id) {
                        graph.write().await.set_status(&update.task_id, update.status)?;
                    }
                }

                joined = join_set.join_next() => {
                    // Workers contain executor panics, so a join error means
                    // the runtime is shutting down.
                    let Some(joined) = joined else { continue };
                    let result = joined?;

                    running.remove(&result.task_id);
                    if result.is_success() {
                        completed.insert(result.task_id.clone());
                        tracing::info!(
                            task_id = result.task_id.as_str(),
                            retry_count = result.retry_count,
                            duration_ms = result.duration_ms,
                            "task completed"
                        );
                        self.event_bus.publish(ExecutionEvent::TaskCompleted {
                            execution_id,
                            task_id: result.task_id.clone(),
                            retry_count: result.retry_count,
                            duration_ms: result.duration_ms,
                        });
                    } else {
                        let error = result.error.clone().unwrap_or_default();
                        tracing::warn!(
                            task_id = result.task_id.as_str(),
                            retry_count = result.retry_count,
                            error = error.as_str(),
                            "task failed"
                        );
                        self.event_bus.publish(ExecutionEvent::TaskFailed {
                            execution_id,
                            task_id: result.task_id.clone(),
                            error,
                            retry_count: result.retry_count,
                        });
                        if self.config.failure_strategy.halts_on_failure() && !halted {
                            halted = true;
                            tracing::warn!(
                                task_id = result.task_id.as_str(),
                                running = running.len(),
                                "fail_fast: no new tasks will be scheduled"
                            );
                        }
                    }

                    graph.write().await.record_result(result.clone())?;
                    report.results.push(result);
                }

                _ = cancel.cancelled(), if !report.cancelled => {}
            }
        }

        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            unresolved = report.unresolved.len(),
            deadlocked = report.deadlocked,
            cancelled = report.cancelled,
            "graph execution finished"
        );
        Ok(report)
    }

    /// Classify tasks still pending once nothing is running.
    async fn finish_pending(
        &self,
        execution_id: Uuid,
        graph: &Arc<RwLock<TaskGraph>>,
        halted: bool,
        report: &mut ExecutionReport,
    ) -> Result<(), ExecutorError> {
        let mut g = graph.write().await;
        let pending: Vec<String> = g
            .tasks()
            .filter(|task| task.status == TaskStatus::Pending)
            .map(|task| task.id().to_string())
            .collect();

        if pending.is_empty() {
            return Ok(());
        }

        if report.cancelled {
            for task_id in &pending {
                g.set_status(task_id, TaskStatus::Cancelled)?;
            }
            tracing::info!(cancelled = pending.len(), "pending tasks cancelled");
            self.event_bus.publish(ExecutionEvent::WorkflowCancelled {
                execution_id,
                cancelled_tasks: pending.clone(),
            });
        } else if halted {
            tracing::info!(unscheduled = pending.len(), "fail_fast left tasks unscheduled");
        } else {
            // Nothing ready and nothing running: every remaining task sits
            // behind a permanently failed dependency.
            report.deadlocked = true;
            tracing::warn!(unresolved = ?pending, "deadlock detected, stopping");
            self.event_bus.publish(ExecutionEvent::DeadlockDetected {
                execution_id,
                unresolved: pending.clone(),
            });
        }

        report.unresolved = pending;
        Ok(())
    }
}

impl std::fmt::Debug for GraphExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphExecutor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Per-task worker
// ---------------------------------------------------------------------------

/// Run one task to a final result, retrying per its policy.
///
/// `retry_count` in the result is the number of attempts beyond the first.
async fn run_task<E: TaskExecutor>(
    execution_id: Uuid,
    config: TaskConfig,
    runner: Arc<E>,
    sleeper: Arc<dyn Sleeper>,
    updates: mpsc::UnboundedSender<StatusUpdate>,
    event_bus: EventBus,
) -> ExecutionResult {
    let start = Utc::now();
    let mut attempt: u32 = 0;

    loop {
        event_bus.publish(ExecutionEvent::TaskStarted {
            execution_id,
            task_id: config.task_id.clone(),
            attempt: attempt + 1,
        });

        let outcome = AssertUnwindSafe(runner.execute(&config))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(payload.as_ref()))));

        let error = match outcome {
            Ok(output) => {
                return ExecutionResult::success(config.task_id, output, start, Utc::now(), attempt);
            }
            Err(error) => error,
        };

        match RetryHandler::decide(&config.retry_policy, attempt, &error) {
            RetryDecision::Retry { retry, delay } => {
                let delay_ms = delay.as_millis() as u64;
                tracing::warn!(
                    task_id = config.task_id.as_str(),
                    attempt = attempt + 1,
                    retry,
                    delay_ms,
                    error = %error,
                    "task attempt failed, retrying"
                );
                event_bus.publish(ExecutionEvent::TaskRetrying {
                    execution_id,
                    task_id: config.task_id.clone(),
                    retry,
                    delay_ms,
                    error: error.to_string(),
                });
                let _ = updates.send(StatusUpdate {
                    task_id: config.task_id.clone(),
                    status: TaskStatus::Retrying,
                });
                sleeper.sleep(delay).await;
                let _ = updates.send(StatusUpdate {
                    task_id: config.task_id.clone(),
                    status: TaskStatus::Running,
                });
                attempt = retry;
            }
            RetryDecision::GiveUp => {
                return ExecutionResult::failure(
                    config.task_id,
                    error.to_string(),
                    start,
                    Utc::now(),
                    attempt,
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
