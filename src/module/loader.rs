//! Module discovery and loading
//!
//! Finds each module's package directory, reads its manifest, and pairs the
//! resulting declaration with a factory from a [`FactoryCatalog`]. Modules
//! are looked up in the modules directory first, then in the package cache.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{Result, WiringError};
use crate::module::descriptor::{ExportTree, Imports, ModuleDeclaration, ModuleDescriptor, ModuleFactory};
use crate::module::manifest::{AppManifest, ModuleManifest};
use crate::module::validation::{ManifestValidator, ValidationResult};

/// Factories the embedding application makes available, keyed by entry point
#[derive(Default, Clone)]
pub struct FactoryCatalog {
    factories: HashMap<String, Arc<dyn ModuleFactory>>,
}

impl FactoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a closure factory under `entry`
    pub fn register<F>(&mut self, entry: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&Imports) -> anyhow::Result<ExportTree> + Send + Sync + 'static,
    {
        self.register_factory(entry, factory)
    }

    /// Register any [`ModuleFactory`] under `entry`
    pub fn register_factory(
        &mut self,
        entry: impl Into<String>,
        factory: impl ModuleFactory + 'static,
    ) -> &mut Self {
        let entry = entry.into();
        if self.factories.insert(entry.clone(), Arc::new(factory)).is_some() {
            debug!("Factory for {} replaced", entry);
        }
        self
    }

    pub fn resolve(&self, entry: &str) -> Option<Arc<dyn ModuleFactory>> {
        self.factories.get(entry).cloned()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.factories.contains_key(entry)
    }

    /// Registered entry points, sorted
    pub fn entries(&self) -> Vec<&str> {
        let mut entries: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        entries.sort_unstable();
        entries
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for FactoryCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryCatalog")
            .field("entries", &self.entries())
            .finish()
    }
}

/// Discovered module information
#[derive(Debug, Clone)]
pub struct DiscoveredModule {
    /// Module package directory
    pub directory: PathBuf,
    /// Manifest file the module was read from
    pub manifest_path: PathBuf,
    pub manifest: ModuleManifest,
    pub declaration: ModuleDeclaration,
}

impl DiscoveredModule {
    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    /// Entry point resolved against the factory catalog
    pub fn entry_point(&self) -> &str {
        self.manifest.entry_point(&self.declaration.name)
    }
}

/// An app manifest with its modules discovered
#[derive(Debug, Clone)]
pub struct LoadedApp {
    pub manifest: AppManifest,
    /// Directory of the app manifest
    pub root: PathBuf,
    /// Modules in `using` order; non-plugin packages are left out
    pub modules: Vec<DiscoveredModule>,
}

impl LoadedApp {
    /// Wiring declarations in `using` order
    pub fn declarations(&self) -> Vec<ModuleDeclaration> {
        self.modules.iter().map(|m| m.declaration.clone()).collect()
    }
}

/// Module loader
pub struct ModuleLoader {
    modules_dir: PathBuf,
    package_cache_dir: PathBuf,
    manifest_files: Vec<String>,
    validator: ManifestValidator,
}

impl ModuleLoader {
    /// Loader for an app rooted at `root`
    pub fn new(root: &Path, config: &EngineConfig) -> Self {
        Self::with_modules_dir(root, config, None)
    }

    /// Like [`ModuleLoader::new`], with the app manifest's `path` override
    pub fn with_modules_dir(root: &Path, config: &EngineConfig, path_override: Option<&str>) -> Self {
        Self {
            modules_dir: config.modules_dir_for(root, path_override),
            package_cache_dir: config.package_cache_dir_for(root),
            manifest_files: config.manifest_files.clone(),
            validator: ManifestValidator::new(),
        }
    }

    pub fn modules_dir(&self) -> &Path {
        &self.modules_dir
    }

    pub fn package_cache_dir(&self) -> &Path {
        &self.package_cache_dir
    }

    /// Read an app manifest and discover every module it uses
    pub fn load_app(manifest_path: &Path, config: &EngineConfig) -> Result<LoadedApp> {
        let manifest = AppManifest::from_file(manifest_path)?;
        let root = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let loader = Self::with_modules_dir(&root, config, manifest.path.as_deref());
        let mut names = manifest.modules();
        names.extend(manifest.extra_dependencies());
        let modules = loader.discover_modules(&names)?;

        Ok(LoadedApp {
            manifest,
            root,
            modules,
        })
    }

    /// Package directory and manifest file of `name`
    pub fn locate(&self, name: &str) -> Result<(PathBuf, PathBuf)> {
        let primary = self.modules_dir.join(name);
        let cached = self.package_cache_dir.join(name);

        for directory in [&primary, &cached] {
            if let Some(manifest) = self.manifest_in(directory) {
                return Ok((directory.clone(), manifest));
            }
        }

        for directory in [primary, cached] {
            if directory.is_dir() {
                return Err(WiringError::manifest(
                    directory,
                    format!("unable to locate manifest for module {}", name),
                ));
            }
        }

        Err(WiringError::ModuleNotFound {
            module: name.to_string(),
            reason: format!(
                "not in {:?} nor {:?}",
                self.modules_dir, self.package_cache_dir
            ),
        })
    }

    fn manifest_in(&self, directory: &Path) -> Option<PathBuf> {
        self.manifest_files
            .iter()
            .map(|file| directory.join(file))
            .find(|candidate| candidate.is_file())
    }

    /// Discover one module; `None` when the package declares no wiring
    pub fn discover_module(&self, name: &str) -> Result<Option<DiscoveredModule>> {
        let (directory, manifest_path) = self.locate(name)?;
        let manifest = ModuleManifest::from_file(&manifest_path)?;

        if !manifest.is_plugin() {
            warn!("Package {} has no plugin block, skipping", name);
            return Ok(None);
        }

        if let ValidationResult::Invalid(errors) = self.validator.validate(&manifest, name) {
            return Err(WiringError::manifest(&manifest_path, errors.join("; ")));
        }

        let declaration = manifest.to_declaration(name)?;
        debug!("Discovered module {} in {:?}", declaration.name, directory);

        Ok(Some(DiscoveredModule {
            directory,
            manifest_path,
            manifest,
            declaration,
        }))
    }

    /// Discover modules in the given order, skipping non-plugin packages
    pub fn discover_modules(&self, names: &[String]) -> Result<Vec<DiscoveredModule>> {
        info!("Discovering {} modules in {:?}", names.len(), self.modules_dir);
        let mut modules = Vec::with_capacity(names.len());
        for name in names {
            if let Some(module) = self.discover_module(name)? {
                modules.push(module);
            }
        }
        info!("Discovered {} modules", modules.len());
        Ok(modules)
    }

    /// Pair a discovered module with its factory: by entry point, then by name
    pub fn load_descriptor(
        discovered: &DiscoveredModule,
        catalog: &FactoryCatalog,
    ) -> Result<ModuleDescriptor> {
        let entry = discovered.entry_point();
        let factory = catalog
            .resolve(entry)
            .or_else(|| catalog.resolve(discovered.name()))
            .ok_or_else(|| WiringError::ModuleNotFound {
                module: discovered.name().to_string(),
                reason: format!("no factory registered for entry point '{}'", entry),
            })?;
        Ok(ModuleDescriptor::from_shared(
            discovered.declaration.clone(),
            factory,
        ))
    }

    /// Descriptors for every discovered module, in order
    pub fn load_descriptors(
        modules: &[DiscoveredModule],
        catalog: &FactoryCatalog,
    ) -> Result<Vec<ModuleDescriptor>> {
        modules
            .iter()
            .map(|module| Self::load_descriptor(module, catalog))
            .collect()
    }
}
