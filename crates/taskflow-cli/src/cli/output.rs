//! Table and summary rendering shared by the workflow commands.

use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use taskflow_types::execution::{ExecutionStatus, WorkflowExecution};
use taskflow_types::task::TaskStatus;

/// Render milliseconds as `850ms`, `12.4s` or `3m 05s`.
pub fn format_duration_ms(ms: u64) -> String {
    if ms < 1_000 {
        format!("{ms}ms")
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1_000.0)
    } else {
        let secs = ms / 1_000;
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}

fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Success => Color::Green,
        TaskStatus::Failed => Color::Red,
        TaskStatus::Running | TaskStatus::Retrying => Color::Yellow,
        TaskStatus::Cancelled | TaskStatus::Skipped => Color::DarkGrey,
        TaskStatus::Pending => Color::White,
    }
}

/// One-line colored run status.
pub fn styled_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Success => style("success").green().bold().to_string(),
        ExecutionStatus::Failed => style("failed").red().bold().to_string(),
        ExecutionStatus::Cancelled => style("cancelled").yellow().bold().to_string(),
        other => style(other.to_string()).dim().to_string(),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

/// Per-task result table, followed by a row for every unresolved task.
pub fn execution_table(execution: &WorkflowExecution) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Task").fg(Color::White),
            Cell::new("Status").fg(Color::White),
            Cell::new("Retries").fg(Color::White),
            Cell::new("Duration").fg(Color::White),
            Cell::new("Error").fg(Color::White),
        ]);

    for result in &execution.task_results {
        table.add_row(vec![
            Cell::new(&result.task_id).fg(Color::Cyan),
            Cell::new(result.status.as_str()).fg(status_color(result.status)),
            Cell::new(result.retry_count),
            Cell::new(format_duration_ms(result.duration_ms)),
            Cell::new(truncate(result.error.as_deref().unwrap_or(""), 60)).fg(Color::DarkGrey),
        ]);
    }

    for task_id in &execution.unresolved_tasks {
        table.add_row(vec![
            Cell::new(task_id).fg(Color::Cyan),
            Cell::new("not run").fg(Color::DarkGrey),
            Cell::new("-"),
            Cell::new("-"),
            Cell::new(""),
        ]);
    }

    table
}

/// Level-by-level plan; tasks on the critical path are highlighted.
pub fn plan_table(levels: &[Vec<String>], critical_path: &[String]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Level").fg(Color::White),
            Cell::new("Tasks").fg(Color::White),
        ]);

    for (index, level) in levels.iter().enumerate() {
        let tasks = level
            .iter()
            .map(|id| {
                if critical_path.contains(id) {
                    format!("{id}*")
                } else {
                    id.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![Cell::new(index), Cell::new(tasks).fg(Color::Cyan)]);
    }

    table
}
