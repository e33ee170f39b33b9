//! CLI argument definitions using clap derive.

pub mod output;
pub mod run;
pub mod workflow;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use taskflow_types::workflow::FailureStrategy;

/// tflow - run dependency-ordered task workflows from YAML, TOML or JSON files.
#[derive(Parser)]
#[command(name = "tflow", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format (for scripting).
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Increase verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Directory holding taskflow.toml.
    #[arg(long, global = true, env = "TASKFLOW_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Export spans through the OpenTelemetry stdout exporter.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check a workflow file without running it.
    Validate {
        /// Path to the workflow file.
        file: PathBuf,
    },

    /// Show execution levels and the critical path of a workflow.
    Plan {
        /// Path to the workflow file.
        file: PathBuf,
    },

    /// Run a workflow to completion.
    Run(RunArgs),

    /// List workflow files under a directory.
    List {
        /// Directory to search recursively.
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// Path to the workflow file.
    pub file: PathBuf,

    /// Override the workflow's max_parallel_tasks.
    #[arg(long)]
    pub max_parallel: Option<usize>,

    /// Override the failure strategy (fail_fast, continue, retry_all).
    #[arg(long)]
    pub failure_strategy: Option<FailureStrategy>,

    /// Write execution and visualization JSON to this directory.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Cancel tasks that exceed their timeout_seconds.
    #[arg(long)]
    pub enforce_timeouts: bool,
}

impl Cli {
    /// Tracing filter derived from the verbosity flags.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "warn",
            1 => "info,taskflow_core=debug,taskflow_infra=debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        <Cli as clap::CommandFactory>::command().debug_assert();
    }

    #[test]
    fn test_parses_run_overrides() {
        let cli = Cli::try_parse_from([
            "tflow",
            "run",
            "pipeline.yaml",
            "--max-parallel",
            "3",
            "--failure-strategy",
            "continue",
            "--export",
            "out",
        ])
        .unwrap();

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.file, PathBuf::from("pipeline.yaml"));
                assert_eq!(args.max_parallel, Some(3));
                assert_eq!(args.failure_strategy, Some(FailureStrategy::Continue));
                assert_eq!(args.export, Some(PathBuf::from("out")));
                assert!(!args.enforce_timeouts);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_rejects_unknown_failure_strategy() {
        let result = Cli::try_parse_from([
            "tflow",
            "run",
            "pipeline.yaml",
            "--failure-strategy",
            "sometimes",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_verbosity_maps_to_filter() {
        let quiet = Cli::try_parse_from(["tflow", "--quiet", "list"]).unwrap();
        assert_eq!(quiet.log_filter(), "error");

        let default = Cli::try_parse_from(["tflow", "list"]).unwrap();
        assert_eq!(default.log_filter(), "warn");

        let verbose = Cli::try_parse_from(["tflow", "-v", "list"]).unwrap();
        assert!(verbose.log_filter().starts_with("info"));

        let trace = Cli::try_parse_from(["tflow", "-vv", "list"]).unwrap();
        assert_eq!(trace.log_filter(), "trace");
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["tflow", "plan", "wf.toml", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Plan { .. }));
    }
}
