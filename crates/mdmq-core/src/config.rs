//! Configuration resolution for mdmq.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (`<config dir>/mdmq/settings.json`, e.g. ~/.config on Linux)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete mdmq configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            queue: QueueConfig::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `SQLite` storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_path: Option<PathBuf>,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            max_connections: 5,
            busy_timeout_secs: 5,
        }
    }
}

/// Command queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// How long resolved command metadata is kept for late acknowledgments
    /// (seconds). Default: 7 days.
    pub command_retention_secs: i64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            command_retention_secs: 7 * 24 * 60 * 60, // 7 days
        }
    }
}

/// Load configuration with hierarchical resolution.
///
/// `explicit` is a config file named on the command line; unlike the global
/// file it must exist.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let global = global_config_path().filter(|path| path.exists());
    let files: Vec<&Path> = global.as_deref().into_iter().chain(explicit).collect();

    let mut config = resolve_files(&files)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Layer config files over the defaults, later files winning per key.
fn resolve_files(paths: &[&Path]) -> Result<Config> {
    let mut merged = serde_json::to_value(Config::default())?;
    for path in paths {
        merge_values(&mut merged, load_config_file(path)?);
    }
    Ok(serde_json::from_value(merged)?)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("settings.json"))
}

/// Get the default database path.
pub fn database_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("mdmq.db"))
}

fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("mdmq"))
}

fn load_config_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })?;
    Config::deserialize(&value).map_err(|e| {
        Error::Config(format!("Invalid config file {}: {}", path.display(), e))
    })?;
    Ok(value)
}

/// Overlay `overlay` onto `base` key by key. Objects merge recursively, a
/// null leaves the base untouched, anything else replaces it.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                if value.is_null() {
                    continue;
                }
                match base.get_mut(&key) {
                    Some(slot) => merge_values(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("MDMQ_DATABASE_PATH") {
        config.storage.database_path = Some(PathBuf::from(val));
    }
    if let Some(val) = var("MDMQ_LOG_LEVEL") {
        config.log_level = val;
    }
    if let Some(n) = var("MDMQ_COMMAND_RETENTION_SECS").and_then(|v| v.parse().ok()) {
        config.queue.command_retention_secs = n;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_keeps_metadata_for_7_days() {
        let config = Config::default();
        assert_eq!(config.queue.command_retention_secs, 7 * 24 * 60 * 60);
        assert_eq!(config.storage.max_connections, 5);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"storage": {"database_path": "/tmp/x.db"}}"#).unwrap();
        assert_eq!(
            config.storage.database_path.as_deref(),
            Some(Path::new("/tmp/x.db"))
        );
        assert_eq!(config.storage.busy_timeout_secs, 5);
        assert_eq!(config.queue.command_retention_secs, 7 * 24 * 60 * 60);
    }

    #[test]
    fn explicit_file_overrides_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"queue": {"command_retention_secs": 60}, "log_level": "debug"}"#,
        )
        .unwrap();

        let config = resolve_files(&[path.as_path()]).unwrap();
        assert_eq!(config.queue.command_retention_secs, 60);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.storage.max_connections, 5);
    }

    #[test]
    fn later_file_only_overrides_keys_it_sets() {
        let dir = tempfile::TempDir::new().unwrap();
        let global = dir.path().join("global.json");
        let explicit = dir.path().join("explicit.json");
        std::fs::write(
            &global,
            r#"{"storage": {"database_path": "/srv/mdmq.db", "max_connections": 10}, "log_level": "debug"}"#,
        )
        .unwrap();
        std::fs::write(
            &explicit,
            r#"{"storage": {"busy_timeout_secs": 30, "database_path": null}}"#,
        )
        .unwrap();

        let config = resolve_files(&[global.as_path(), explicit.as_path()]).unwrap();
        assert_eq!(config.storage.max_connections, 10);
        assert_eq!(config.storage.busy_timeout_secs, 30);
        assert_eq!(
            config.storage.database_path.as_deref(),
            Some(Path::new("/srv/mdmq.db"))
        );
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.queue.command_retention_secs, 7 * 24 * 60 * 60);
    }

    #[test]
    fn mistyped_value_is_a_config_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"storage": {"max_connections": "many"}}"#).unwrap();

        assert!(matches!(load_config_file(&path), Err(Error::Config(_))));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = load_config_file(Path::new("/nonexistent/mdmq/settings.json"));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn env_overrides_apply_and_ignore_garbage() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |key| match key {
            "MDMQ_DATABASE_PATH" => Some("/var/lib/mdmq/mdmq.db".to_string()),
            "MDMQ_COMMAND_RETENTION_SECS" => Some("not-a-number".to_string()),
            _ => None,
        });
        assert_eq!(
            config.storage.database_path,
            Some(PathBuf::from("/var/lib/mdmq/mdmq.db"))
        );
        assert_eq!(config.queue.command_retention_secs, 7 * 24 * 60 * 60);
    }
}
