//! Taskflow CLI entry point.
//!
//! Binary name: `tflow`
//!
//! Parses CLI arguments, loads `taskflow.toml`, initializes tracing, then
//! dispatches to the command handler.

mod cli;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use taskflow_infra::config::{load_engine_config, resolve_config_dir};
use taskflow_types::execution::ExecutionStatus;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need config or tracing
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "tflow", &mut std::io::stdout());
        return Ok(());
    }

    let config_dir = cli.config_dir.clone().unwrap_or_else(resolve_config_dir);
    let engine = load_engine_config(&config_dir).await;

    taskflow_observe::init_tracing(cli.log_filter(), cli.otel || engine.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;
    tracing::debug!(config_dir = %config_dir.display(), ?engine, "engine config loaded");

    let result = dispatch(cli, &engine).await;
    taskflow_observe::shutdown_tracing();

    match result? {
        ExecutionStatus::Success => Ok(()),
        _ => std::process::exit(1),
    }
}

async fn dispatch(
    cli: Cli,
    engine: &taskflow_types::config::EngineConfig,
) -> anyhow::Result<ExecutionStatus> {
    match cli.command {
        Commands::Validate { file } => {
            cli::workflow::handle_validate(&file, cli.json)?;
        }
        Commands::Plan { file } => {
            cli::workflow::handle_plan(&file, cli.json)?;
        }
        Commands::Run(args) => {
            return cli::run::handle_run(args, engine, cli.json, cli.quiet).await;
        }
        Commands::List { dir } => {
            cli::workflow::handle_list(&dir, cli.json)?;
        }
        Commands::Completions { .. } => {}
    }
    Ok(ExecutionStatus::Success)
}
