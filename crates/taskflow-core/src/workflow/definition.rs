//! Workflow definition parsing, validation, and filesystem operations.
//!
//! Workflow files may be YAML, TOML or JSON; the format is picked from the
//! file extension. Parsed configs are validated for structural constraints
//! (IDs, parallelism, task types). Dependency existence and acyclicity are
//! checked when the graph is built.

use std::path::{Path, PathBuf};

use taskflow_types::workflow::WorkflowConfig;
use thiserror::Error;

use super::executor::ExecutorError;
use super::graph::GraphError;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// YAML/TOML/JSON parse failure.
    #[error("parse error: {0}")]
    Parse(String),

    /// Structural validation failure.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Graph construction failed (duplicate, unknown dependency, cycle).
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    /// A coordinator owns a single run.
    #[error("workflow '{0}' has already been executed")]
    AlreadyExecuted(String),

    /// Export was requested before any run started.
    #[error("workflow '{0}' has not been executed yet")]
    NoExecution(String),

    #[error("serialization error: {0}")]
    Serialize(String),
}

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

/// Supported workflow file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowFormat {
    Yaml,
    Toml,
    Json,
}

impl WorkflowFormat {
    /// Pick the format from a file extension (`yaml`, `yml`, `toml`, `json`).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(WorkflowFormat::Yaml),
            "toml" => Some(WorkflowFormat::Toml),
            "json" => Some(WorkflowFormat::Json),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a workflow document and validate it.
pub fn parse_workflow_str(
    content: &str,
    format: WorkflowFormat,
) -> Result<WorkflowConfig, WorkflowError> {
    let config: WorkflowConfig = match format {
        WorkflowFormat::Yaml => {
            serde_yaml_ng::from_str(content).map_err(|e| WorkflowError::Parse(e.to_string()))?
        }
        WorkflowFormat::Toml => {
            toml::from_str(content).map_err(|e| WorkflowError::Parse(e.to_string()))?
        }
        WorkflowFormat::Json => {
            serde_json::from_str(content).map_err(|e| WorkflowError::Parse(e.to_string()))?
        }
    };
    validate_config(&config)?;
    Ok(config)
}

/// Serialize a workflow config in the given format.
pub fn serialize_workflow(
    config: &WorkflowConfig,
    format: WorkflowFormat,
) -> Result<String, WorkflowError> {
    match format {
        WorkflowFormat::Yaml => {
            serde_yaml_ng::to_string(config).map_err(|e| WorkflowError::Serialize(e.to_string()))
        }
        WorkflowFormat::Toml => {
            toml::to_string_pretty(config).map_err(|e| WorkflowError::Serialize(e.to_string()))
        }
        WorkflowFormat::Json => serde_json::to_string_pretty(config)
            .map_err(|e| WorkflowError::Serialize(e.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate structural constraints on a `WorkflowConfig`.
///
/// Checks:
/// - `workflow_id` is non-empty
/// - Task IDs are non-empty
/// - Every task has a `task_type`
/// - Retry delays are finite and non-negative
/// - `max_parallel_tasks` >= 1
///
/// Graph structure (duplicate IDs, unknown dependencies, cycles) is left to
/// [`build_graph`](super::coordinator::build_graph). An empty task list is
/// valid.
pub fn validate_config(config: &WorkflowConfig) -> Result<(), WorkflowError> {
    if config.workflow_id.trim().is_empty() {
        return Err(WorkflowError::Validation(
            "workflow_id must not be empty".to_string(),
        ));
    }

    for task in &config.tasks {
        if task.task_id.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "task_id must not be empty".to_string(),
            ));
        }
        if task.task_type.trim().is_empty() {
            return Err(WorkflowError::Validation(format!(
                "task '{}' has an empty task_type",
                task.task_id
            )));
        }
        let delay = task.retry_policy.retry_delay_secs;
        if !delay.is_finite() || delay < 0.0 {
            return Err(WorkflowError::Validation(format!(
                "task '{}' has an invalid retry_delay: {delay}",
                task.task_id
            )));
        }
    }

    if config.max_parallel_tasks < 1 {
        return Err(WorkflowError::Validation(
            "max_parallel_tasks must be >= 1".to_string(),
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Filesystem operations
// ---------------------------------------------------------------------------

/// Load a workflow from a file, choosing the parser by extension.
pub fn load_workflow_file(path: &Path) -> Result<WorkflowConfig, WorkflowError> {
    let format = WorkflowFormat::from_path(path).ok_or_else(|| {
        WorkflowError::Parse(format!(
            "unsupported workflow file extension: {}",
            path.display()
        ))
    })?;
    let content = std::fs::read_to_string(path)?;
    parse_workflow_str(&content, format)
}

/// Save a workflow to a file in the format implied by its extension.
///
/// Creates parent directories if they don't exist.
pub fn save_workflow_file(path: &Path, config: &WorkflowConfig) -> Result<(), WorkflowError> {
    let format = WorkflowFormat::from_path(path).ok_or_else(|| {
        WorkflowError::Serialize(format!(
            "unsupported workflow file extension: {}",
            path.display()
        ))
    })?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serialize_workflow(config, format)?)?;
    Ok(())
}

/// Discover all workflow files under `base_dir`, sorted by path.
///
/// Files that fail to parse are skipped with a warning.
pub fn discover_workflows(
    base_dir: &Path,
) -> Result<Vec<(PathBuf, WorkflowConfig)>, WorkflowError> {
    let mut results = Vec::new();
    if !base_dir.exists() {
        return Ok(results);
    }
    discover_recursive(base_dir, &mut results)?;
    results.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(results)
}

fn discover_recursive(
    dir: &Path,
    results: &mut Vec<(PathBuf, WorkflowConfig)>,
) -> Result<(), WorkflowError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            discover_recursive(&path, results)?;
        } else if WorkflowFormat::from_path(&path).is_some() {
            match load_workflow_file(&path) {
                Ok(config) => results.push((path, config)),
                Err(e) => {
                    tracing::warn!(?path, error = %e, "skipping unparseable workflow file");
                }
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use taskflow_types::task::{Priority, TaskConfig};
    use taskflow_types::workflow::FailureStrategy;

    fn workflow(id: &str) -> WorkflowConfig {
        WorkflowConfig::new(id)
            .with_task(TaskConfig::new("extract", "shell"))
            .with_task(TaskConfig::new("load", "shell").with_dependencies(["extract"]))
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_yaml_with_defaults() {
        let yaml = r#"
workflow_id: nightly-etl
failure_strategy: continue
tasks:
  - task_id: extract
    task_type: shell
    priority: high
    retry_policy:
      max_retries: 1
      retry_delay: 0.5
      exponential_backoff: false
  - task_id: load
    task_type: shell
    dependencies: [extract]
    resource_requirements:
      timeout_seconds: 30
"#;
        let config = parse_workflow_str(yaml, WorkflowFormat::Yaml).unwrap();
        assert_eq!(config.failure_strategy, FailureStrategy::Continue);
        assert_eq!(config.max_parallel_tasks, 10);

        let extract = &config.tasks[0];
        assert_eq!(extract.priority, Priority::High);
        assert_eq!(extract.retry_policy.max_retries, 1);
        assert_eq!(extract.retry_policy.retry_delay(), Duration::from_millis(500));
        assert!(!extract.retry_policy.exponential_backoff);

        let load = &config.tasks[1];
        assert_eq!(load.dependencies, vec!["extract".to_string()]);
        assert_eq!(load.resources.timeout_seconds, 30);
        assert_eq!(load.retry_policy.max_retries, 3);
    }

    #[test]
    fn test_parse_json_and_toml() {
        let json = r#"{"workflow_id":"j","tasks":[{"task_id":"a","task_type":"echo"}]}"#;
        assert_eq!(parse_workflow_str(json, WorkflowFormat::Json).unwrap().workflow_id, "j");

        let toml_str = r#"
workflow_id = "t"
[[tasks]]
task_id = "a"
task_type = "echo"
"#;
        assert_eq!(parse_workflow_str(toml_str, WorkflowFormat::Toml).unwrap().tasks.len(), 1);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = parse_workflow_str("tasks: [", WorkflowFormat::Yaml).unwrap_err();
        assert!(matches!(err, WorkflowError::Parse(_)));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(WorkflowFormat::from_path(Path::new("a.YML")), Some(WorkflowFormat::Yaml));
        assert_eq!(WorkflowFormat::from_path(Path::new("a.toml")), Some(WorkflowFormat::Toml));
        assert_eq!(WorkflowFormat::from_path(Path::new("a.json")), Some(WorkflowFormat::Json));
        assert_eq!(WorkflowFormat::from_path(Path::new("a.txt")), None);
        assert_eq!(WorkflowFormat::from_path(Path::new("Makefile")), None);
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    #[test]
    fn test_validation_accepts_valid_workflow() {
        assert!(validate_config(&workflow("etl")).is_ok());
    }

    #[test]
    fn test_validation_rejects_empty_id() {
        let err = validate_config(&workflow("  ")).unwrap_err();
        assert!(err.to_string().contains("workflow_id"));
    }

    #[test]
    fn test_validation_accepts_empty_workflow() {
        assert!(validate_config(&WorkflowConfig::new("etl")).is_ok());
    }

    #[test]
    fn test_validation_leaves_duplicate_ids_to_the_graph() {
        let config = workflow("etl").with_task(TaskConfig::new("load", "echo"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_rejects_unusable_retry_delay() {
        for delay in [-1.0, f64::NAN, f64::INFINITY] {
            let mut task = TaskConfig::new("a", "echo");
            task.retry_policy.retry_delay_secs = delay;
            let config = WorkflowConfig::new("etl").with_task(task);
            let err = validate_config(&config).unwrap_err();
            assert!(err.to_string().contains("retry_delay"), "delay {delay}");
        }
    }

    #[test]
    fn test_validation_rejects_empty_task_type() {
        let config = WorkflowConfig::new("etl").with_task(TaskConfig::new("a", ""));
        assert!(matches!(validate_config(&config), Err(WorkflowError::Validation(_))));
    }

    #[test]
    fn test_validation_rejects_zero_parallelism() {
        let config = workflow("etl").with_max_parallel_tasks(0);
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("max_parallel_tasks"));
    }

    // -----------------------------------------------------------------------
    // Filesystem
    // -----------------------------------------------------------------------

    #[test]
    fn test_save_and_load_workflow_file() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["wf.yaml", "wf.json"] {
            let path = dir.path().join("nested").join(name);
            save_workflow_file(&path, &workflow("etl")).unwrap();
            let loaded = load_workflow_file(&path).unwrap();
            assert_eq!(loaded, workflow("etl"), "roundtrip through {name}");
        }
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wf.ini");
        std::fs::write(&path, "workflow_id = x").unwrap();
        assert!(matches!(load_workflow_file(&path), Err(WorkflowError::Parse(_))));
    }

    #[test]
    fn test_discover_workflows() {
        let dir = tempfile::tempdir().unwrap();
        save_workflow_file(&dir.path().join("one.yaml"), &workflow("one")).unwrap();
        save_workflow_file(&dir.path().join("sub/two.json"), &workflow("two")).unwrap();
        std::fs::write(dir.path().join("not-a-workflow.yaml"), "key: value").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();

        let found = discover_workflows(dir.path()).unwrap();
        let ids: Vec<&str> = found.iter().map(|(_, c)| c.workflow_id.as_str()).collect();
        assert_eq!(ids, vec!["one", "two"]);
    }

    #[test]
    fn test_discover_nonexistent_dir() {
        let found = discover_workflows(Path::new("/nonexistent/taskflow/path")).unwrap();
        assert!(found.is_empty());
    }
}
