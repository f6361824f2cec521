//! Configuration management for modwire
//!
//! Two kinds of configuration live here: the engine's own settings
//! ([`EngineConfig`]), and the free-form configuration trees handed to
//! containers and services (see [`merge`]).

pub mod merge;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::{Result, WiringError};

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "modwire=debug"); `RUST_LOG` takes precedence
    #[serde(default)]
    pub filter: Option<String>,

    /// Emit JSON lines (needs the `json-logging` feature)
    #[serde(default)]
    pub json_format: bool,
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding module packages, relative to the app manifest
    #[serde(default = "default_modules_dir")]
    pub modules_dir: String,

    /// Fallback package directory, relative to the app manifest
    #[serde(default = "default_package_cache_dir")]
    pub package_cache_dir: String,

    /// Manifest file names tried in each module directory, in order
    #[serde(default = "default_manifest_files")]
    pub manifest_files: Vec<String>,

    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

fn default_modules_dir() -> String {
    "modules".to_string()
}

fn default_package_cache_dir() -> String {
    "node_modules".to_string()
}

fn default_manifest_files() -> Vec<String> {
    vec!["package.json".to_string(), "module.toml".to_string()]
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            modules_dir: default_modules_dir(),
            package_cache_dir: default_package_cache_dir(),
            manifest_files: default_manifest_files(),
            logging: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON or TOML file (by extension)
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = if is_toml(path) {
            toml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Modules directory for an app rooted at `root`; `path_override`
    /// comes from the app manifest
    pub fn modules_dir_for(&self, root: &Path, path_override: Option<&str>) -> PathBuf {
        root.join(path_override.unwrap_or(&self.modules_dir))
    }

    /// Package cache directory for an app rooted at `root`
    pub fn package_cache_dir_for(&self, root: &Path) -> PathBuf {
        root.join(&self.package_cache_dir)
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "toml")
}

/// Read a configuration tree from a JSON or TOML file
pub fn load_config_tree(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| WiringError::manifest(path, format!("Failed to read config file: {}", e)))?;

    let tree = if is_toml(path) {
        toml::from_str::<Value>(&content)
            .map_err(|e| WiringError::manifest(path, format!("Failed to parse config TOML: {}", e)))?
    } else {
        serde_json::from_str::<Value>(&content)
            .map_err(|e| WiringError::manifest(path, format!("Failed to parse config JSON: {}", e)))?
    };

    if !tree.is_object() {
        return Err(WiringError::manifest(path, "Configuration root must be a table/object"));
    }
    Ok(tree)
}
