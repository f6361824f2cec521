//! App and module manifests
//!
//! Manifests are JSON (`package.json`) or TOML (`module.toml`) documents.
//! A module manifest keeps its wiring under a `plugin` table next to the
//! usual package fields:
//!
//! ```json
//! { "name": "hello", "main": "hello", "plugin": { "consumes": ["core.router"] } }
//! ```
//!
//! An app manifest lists the modules to wire under `using`, optionally
//! nested under `plugin` as well; package-style `dependencies` are folded
//! into `using`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{Result, WiringError};
use crate::module::descriptor::ModuleDeclaration;

/// Key holding the wiring block
pub const PLUGIN_KEY: &str = "plugin";

/// Read a JSON or TOML document (chosen by file extension)
pub fn read_document(path: &Path) -> Result<Value> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| WiringError::manifest(path, format!("Failed to read manifest file: {}", e)))?;

    let is_toml = path.extension().is_some_and(|ext| ext == "toml");
    if is_toml {
        toml::from_str::<Value>(&contents)
            .map_err(|e| WiringError::manifest(path, format!("Failed to parse manifest TOML: {}", e)))
    } else {
        serde_json::from_str::<Value>(&contents)
            .map_err(|e| WiringError::manifest(path, format!("Failed to parse manifest JSON: {}", e)))
    }
}

/// Wiring block of a module manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSection {
    /// Overrides the package name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Overrides the package entry point
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(default)]
    pub provides: Vec<String>,
    #[serde(default)]
    pub consumes: Vec<String>,
    #[serde(default)]
    pub extends: Vec<String>,
}

/// Module manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Entry point, resolved against the factory catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PluginSection>,
}

impl ModuleManifest {
    /// Load manifest from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let document = read_document(path)?;
        serde_json::from_value(document)
            .map_err(|e| WiringError::manifest(path, format!("Invalid module manifest: {}", e)))
    }

    /// Whether the package carries a wiring block at all
    pub fn is_plugin(&self) -> bool {
        self.plugin.is_some()
    }

    /// Declared module name, `plugin.name` winning over `name`
    pub fn module_name(&self) -> Option<&str> {
        self.plugin
            .as_ref()
            .and_then(|p| p.name.as_deref())
            .or(self.name.as_deref())
    }

    /// Entry point: `plugin.main`, then `main`, then the module name
    pub fn entry_point<'a>(&'a self, fallback_name: &'a str) -> &'a str {
        self.plugin
            .as_ref()
            .and_then(|p| p.main.as_deref())
            .or(self.main.as_deref())
            .or(self.module_name())
            .unwrap_or(fallback_name)
    }

    /// Wiring declaration, named after the manifest or `fallback_name`
    pub fn to_declaration(&self, fallback_name: &str) -> Result<ModuleDeclaration> {
        let name = self.module_name().unwrap_or(fallback_name);
        let section = self.plugin.clone().unwrap_or_default();
        ModuleDeclaration::parse(
            name,
            &as_refs(&section.provides),
            &as_refs(&section.consumes),
            &as_refs(&section.extends),
        )
    }
}

fn as_refs(names: &[String]) -> Vec<&str> {
    names.iter().map(String::as_str).collect()
}

/// Application manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Modules directory, relative to the manifest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Modules to wire, in declaration order (`name → reference`)
    #[serde(default)]
    pub using: Map<String, Value>,
    /// Package dependencies; folded into `using`
    #[serde(default)]
    pub dependencies: Map<String, Value>,
}

impl AppManifest {
    /// Load manifest from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let document = read_document(path)?;
        Self::from_document(path, document)
    }

    /// Build from a parsed document, unwrapping a `plugin` block if present
    pub fn from_document(path: &Path, document: Value) -> Result<Self> {
        let Value::Object(mut top) = document else {
            return Err(WiringError::manifest(path, "App manifest must be a table/object"));
        };

        let document = match top.remove(PLUGIN_KEY) {
            Some(Value::Object(mut block)) => {
                for key in ["name", "dependencies"] {
                    if let Some(value) = top.remove(key) {
                        block.entry(key).or_insert(value);
                    }
                }
                Value::Object(block)
            }
            Some(_) => {
                return Err(WiringError::manifest(path, "'plugin' must be a table/object"));
            }
            None => Value::Object(top),
        };

        serde_json::from_value(document)
            .map_err(|e| WiringError::manifest(path, format!("Invalid app manifest: {}", e)))
    }

    /// Modules listed under `using`, in declaration order
    pub fn modules(&self) -> Vec<String> {
        self.using.keys().cloned().collect()
    }

    /// Dependencies not already listed under `using`
    pub fn extra_dependencies(&self) -> Vec<String> {
        self.dependencies
            .keys()
            .filter(|name| !self.using.contains_key(*name))
            .cloned()
            .collect()
    }
}
