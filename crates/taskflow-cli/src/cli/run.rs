//! `tflow run`: execute a workflow with the builtin executors.
//!
//! Progress is driven by the coordinator's event stream; Ctrl-C cancels the
//! run, which lets in-flight tasks finish and marks the rest cancelled.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use taskflow_core::event::EventBus;
use taskflow_core::workflow::WorkflowCoordinator;
use taskflow_infra::builtin_dispatcher;
use taskflow_types::config::EngineConfig;
use taskflow_types::event::ExecutionEvent;
use taskflow_types::execution::{ExecutionStatus, WorkflowExecution};
use taskflow_types::workflow::WorkflowConfig;

use super::RunArgs;
use super::output::{execution_table, format_duration_ms, styled_status};
use super::workflow::load;

/// Effective run settings after merging CLI flags over `taskflow.toml`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub max_parallel: Option<usize>,
    pub enforce_timeouts: bool,
    pub export_dir: Option<PathBuf>,
}

impl RunSettings {
    /// CLI flags win; engine config fills the gaps.
    pub fn merge(args: &RunArgs, engine: &EngineConfig) -> Self {
        Self {
            max_parallel: args.max_parallel.or(engine.max_parallel_tasks),
            enforce_timeouts: args.enforce_timeouts || engine.enforce_timeouts,
            export_dir: args.export.clone().or_else(|| engine.export_dir.clone()),
        }
    }
}

fn apply_overrides(mut config: WorkflowConfig, args: &RunArgs) -> WorkflowConfig {
    if let Some(strategy) = args.failure_strategy {
        config.failure_strategy = strategy;
    }
    config
}

fn progress_bar(total: usize, hidden: bool) -> Result<ProgressBar> {
    if hidden {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    bar.enable_steady_tick(std::time::Duration::from_millis(80));
    Ok(bar)
}

/// Feed the progress bar from lifecycle events until the run finishes.
async fn track_progress(mut events: broadcast::Receiver<ExecutionEvent>, bar: ProgressBar) {
    loop {
        match events.recv().await {
            Ok(ExecutionEvent::TaskStarted { task_id, attempt, .. }) => {
                if attempt > 1 {
                    bar.set_message(format!("{task_id} (attempt {attempt})"));
                } else {
                    bar.set_message(task_id);
                }
            }
            Ok(ExecutionEvent::TaskRetrying {
                task_id,
                retry,
                delay_ms,
                error,
                ..
            }) => {
                bar.println(format!(
                    "  {} {} failed ({error}), retry {retry} in {}",
                    style("↻").yellow(),
                    style(&task_id).cyan(),
                    format_duration_ms(delay_ms)
                ));
            }
            Ok(ExecutionEvent::TaskCompleted { task_id, .. }) => {
                bar.inc(1);
                bar.println(format!("  {} {}", style("✓").green(), style(&task_id).cyan()));
            }
            Ok(ExecutionEvent::TaskFailed { task_id, error, .. }) => {
                bar.inc(1);
                bar.println(format!(
                    "  {} {}: {}",
                    style("✗").red(),
                    style(&task_id).cyan(),
                    style(error).dim()
                ));
            }
            Ok(ExecutionEvent::DeadlockDetected { unresolved, .. }) => {
                bar.println(format!(
                    "  {} blocked by failed dependencies: {}",
                    style("!").yellow().bold(),
                    unresolved.join(", ")
                ));
            }
            Ok(ExecutionEvent::WorkflowFinished { .. }) => break,
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "progress display lagged behind events");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn print_summary(execution: &WorkflowExecution) {
    println!();
    println!(
        "  Workflow '{}' {}",
        style(&execution.workflow_id).cyan(),
        styled_status(execution.status)
    );
    println!();
    println!("{}", execution_table(execution));
    println!();
    let duration = execution
        .duration()
        .map(|d| format_duration_ms(d.as_millis() as u64))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "  {} succeeded, {} failed, {} not run in {}",
        execution.tasks_completed,
        execution.tasks_failed,
        execution.unresolved_tasks.len(),
        duration
    );
    println!("  Execution ID: {}", style(execution.execution_id).dim());
    println!();
}

/// Run the workflow at `args.file` and return its final status.
pub async fn handle_run(
    args: RunArgs,
    engine: &EngineConfig,
    json: bool,
    quiet: bool,
) -> Result<ExecutionStatus> {
    let config = apply_overrides(load(&args.file)?, &args);
    let settings = RunSettings::merge(&args, engine);

    let dispatcher = builtin_dispatcher(settings.enforce_timeouts);
    let missing = dispatcher.missing_types(&config.tasks);
    if !missing.is_empty() {
        bail!("no executor for task type(s): {}", missing.join(", "));
    }

    let mut coordinator = WorkflowCoordinator::build(config, dispatcher)?
        .with_event_bus(EventBus::new(engine.event_capacity));
    if let Some(max_parallel) = settings.max_parallel {
        coordinator = coordinator.with_max_parallel(max_parallel);
    }

    let total = coordinator.config().tasks.len();
    let bar = progress_bar(total, json || quiet)?;
    let tracker = tokio::spawn(track_progress(coordinator.subscribe(), bar.clone()));

    let token = coordinator.cancellation_token();
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling workflow");
            token.cancel();
        }
    });

    let outcome = coordinator.run().await;
    signal.abort();
    if outcome.is_ok() {
        // The tracker stops on WorkflowFinished, which a completed run always publishes.
        let _ = tracker.await;
    } else {
        tracker.abort();
    }
    bar.finish_and_clear();
    let execution = outcome
        .with_context(|| format!("workflow '{}' did not run", coordinator.workflow_id()))?;

    let exported = match &settings.export_dir {
        Some(dir) => Some(
            coordinator
                .export(dir)
                .await
                .with_context(|| format!("failed to export results to {}", dir.display()))?,
        ),
        None => None,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&execution)?);
    } else if !quiet {
        print_summary(&execution);
        if let Some((execution_file, visualization_file)) = &exported {
            println!("  Exported {}", execution_file.display());
            println!("  Exported {}", visualization_file.display());
            println!();
        }
    }

    Ok(execution.status)
}
