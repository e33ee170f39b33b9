//! Engine configuration loader for taskflow.
//!
//! Reads `taskflow.toml` from the config directory (`~/.taskflow/` by
//! default) and deserializes it into [`EngineConfig`]. Falls back to
//! defaults when the file is missing or malformed.

use std::path::{Path, PathBuf};

use taskflow_types::config::EngineConfig;

/// File name of the engine configuration inside the config directory.
pub const ENGINE_CONFIG_FILE: &str = "taskflow.toml";

/// Resolve the config directory.
///
/// Priority:
/// 1. `TASKFLOW_CONFIG_DIR` environment variable
/// 2. `~/.taskflow`
/// 3. `.taskflow` in the current directory
pub fn resolve_config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TASKFLOW_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".taskflow");
    }
    PathBuf::from(".taskflow")
}

/// Load engine configuration from `{config_dir}/taskflow.toml`.
///
/// - Missing file: [`EngineConfig::default()`].
/// - Unreadable or unparseable file: logs a warning and returns the default.
pub async fn load_engine_config(config_dir: &Path) -> EngineConfig {
    let config_path = config_dir.join(ENGINE_CONFIG_FILE);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No {ENGINE_CONFIG_FILE} found at {}, using defaults", config_path.display());
            return EngineConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return EngineConfig::default();
        }
    };

    match toml::from_str::<EngineConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", config_path.display());
            EngineConfig::default()
        }
    }
}
