//! Read-only workflow commands: validate, plan and list.

use std::path::Path;

use anyhow::{Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use taskflow_core::workflow::definition::{discover_workflows, load_workflow_file};
use taskflow_core::workflow::{TaskGraph, WorkflowError, build_graph};
use taskflow_infra::builtin_dispatcher;
use taskflow_types::workflow::WorkflowConfig;

use super::output::plan_table;

/// Load a workflow and turn loader errors into readable messages.
pub fn load(file: &Path) -> Result<WorkflowConfig> {
    load_workflow_file(file).map_err(|e| match e {
        WorkflowError::Parse(msg) => anyhow::anyhow!("Failed to parse {}: {msg}", file.display()),
        WorkflowError::Validation(msg) => {
            anyhow::anyhow!("Workflow validation failed: {msg}")
        }
        other => anyhow::anyhow!("Failed to load {}: {other}", file.display()),
    })
}

fn load_graph(file: &Path) -> Result<(WorkflowConfig, TaskGraph)> {
    let config = load(file)?;
    let graph = build_graph(&config)?;
    Ok((config, graph))
}

// ---------------------------------------------------------------------------
// Validate
// ---------------------------------------------------------------------------

pub fn handle_validate(file: &Path, json: bool) -> Result<()> {
    let (config, graph) = load_graph(file)?;
    graph.validate()?;

    let missing = builtin_dispatcher(false).missing_types(&config.tasks);

    if json {
        let out = serde_json::json!({
            "workflow_id": config.workflow_id,
            "valid": missing.is_empty(),
            "tasks": graph.len(),
            "unknown_task_types": missing,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!();
        println!(
            "  {} Workflow '{}' is valid",
            style("✓").green().bold(),
            style(config.display_name()).cyan()
        );
        println!("  Tasks: {}", graph.len());
        println!("  Roots: {}", graph.roots().join(", "));
        if !missing.is_empty() {
            println!(
                "  {} No built-in executor for: {}",
                style("!").yellow().bold(),
                missing.join(", ")
            );
        }
        println!();
    }

    if !missing.is_empty() {
        bail!("unknown task type(s): {}", missing.join(", "));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

pub fn handle_plan(file: &Path, json: bool) -> Result<()> {
    let (config, graph) = load_graph(file)?;
    let levels = graph.execution_order()?;
    let critical_path = graph.critical_path()?;
    let weight = graph.path_weight(&critical_path);

    if json {
        let out = serde_json::json!({
            "workflow_id": config.workflow_id,
            "execution_order": levels,
            "critical_path": critical_path,
            "critical_path_seconds": weight,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  Plan for '{}' ({} tasks, {} levels)",
        style(config.display_name()).cyan(),
        graph.len(),
        levels.len()
    );
    println!();
    println!("{}", plan_table(&levels, &critical_path));
    println!();
    println!(
        "  Critical path: {} ({}s worst case)",
        style(critical_path.join(" -> ")).yellow(),
        weight
    );
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

pub fn handle_list(dir: &Path, json: bool) -> Result<()> {
    let workflows = discover_workflows(dir)?;

    if json {
        let out: Vec<_> = workflows
            .iter()
            .map(|(path, config)| {
                serde_json::json!({
                    "path": path.display().to_string(),
                    "workflow_id": config.workflow_id,
                    "name": config.display_name(),
                    "tasks": config.tasks.len(),
                    "failure_strategy": config.failure_strategy.as_str(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if workflows.is_empty() {
        println!();
        println!("  No workflows found under {}", dir.display());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Workflow").fg(Color::White),
            Cell::new("Tasks").fg(Color::White),
            Cell::new("Strategy").fg(Color::White),
            Cell::new("Path").fg(Color::White),
        ]);
    for (path, config) in &workflows {
        table.add_row(vec![
            Cell::new(config.display_name()).fg(Color::Cyan),
            Cell::new(config.tasks.len()),
            Cell::new(config.failure_strategy.as_str()),
            Cell::new(path.display()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}
