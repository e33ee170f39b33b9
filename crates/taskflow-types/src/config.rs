//! Engine configuration types.
//!
//! `EngineConfig` represents the `taskflow.toml` file that sets defaults for
//! every workflow run started by the CLI.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Engine-wide settings. All fields have sensible defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Overrides `max_parallel_tasks` of every workflow when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_parallel_tasks: Option<usize>,

    /// Enforce each task's `timeout_seconds` by wrapping executors.
    #[serde(default)]
    pub enforce_timeouts: bool,

    /// Directory where run summaries are exported after each run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,

    /// Bridge tracing spans to OpenTelemetry.
    #[serde(default)]
    pub otel: bool,

    /// Capacity of the lifecycle event channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
    1024
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_parallel_tasks: None,
            enforce_timeouts: false,
            export_dir: None,
            otel: false,
            event_capacity: default_event_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_default_values() {
        let config = EngineConfig::default();
        assert_eq!(config.max_parallel_tasks, None);
        assert!(!config.enforce_timeouts);
        assert_eq!(config.event_capacity, 1024);
    }

    #[test]
    fn test_engine_config_deserialize_with_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_engine_config_deserialize_with_values() {
        let toml_str = r#"
max_parallel_tasks = 4
enforce_timeouts = true
export_dir = "/var/lib/taskflow/runs"
otel = true
"#;
        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.max_parallel_tasks, Some(4));
        assert!(config.enforce_timeouts);
        assert_eq!(config.export_dir, Some(PathBuf::from("/var/lib/taskflow/runs")));
        assert!(config.otel);
    }
}
