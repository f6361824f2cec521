//! Bootstrap sequence
//!
//! build graph → schedule → activate, strictly in that order. Any failure
//! aborts the whole bootstrap; services already registered by earlier modules
//! are not rolled back, the partially built [`App`] is simply dropped.

use serde_json::Value;
use std::path::Path;
use tracing::info;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::module::activator::ModuleActivator;
use crate::module::descriptor::{ModuleDeclaration, ModuleDescriptor};
use crate::module::graph::DependencyGraph;
use crate::module::loader::{FactoryCatalog, ModuleLoader};
use crate::module::scheduler::TopologicalScheduler;
use crate::registry::app::App;

/// Wires modules into an [`App`]
pub struct Bootstrap;

impl Bootstrap {
    /// Activation order for `declarations`, without invoking any factory
    pub fn plan(declarations: &[ModuleDeclaration]) -> Result<Vec<String>> {
        let graph = DependencyGraph::build(declarations)?;
        TopologicalScheduler::schedule(&graph)
    }

    /// Build, schedule and activate `modules`
    ///
    /// `config` is staged on the app before activation, so every container
    /// and service picks up its slice of it when first registered.
    pub fn run(modules: Vec<ModuleDescriptor>, config: Value) -> Result<App> {
        let order = Self::plan_descriptors(&modules)?;
        info!("Activation order: {}", order.join(", "));

        let mut app = App::with_config(config);
        ModuleActivator::new(&mut app).activate_all(&modules, &order)?;

        info!(
            "Bootstrap complete: {} modules, {} containers",
            order.len(),
            app.containers().len()
        );
        Ok(app)
    }

    /// Load an app manifest from disk and run it
    ///
    /// Module factories are resolved against `catalog`.
    pub fn from_manifest(
        manifest_path: &Path,
        config: Value,
        engine: &EngineConfig,
        catalog: &FactoryCatalog,
    ) -> Result<App> {
        info!("Loading app manifest {:?}", manifest_path);
        let loaded = ModuleLoader::load_app(manifest_path, engine)?;
        let modules = ModuleLoader::load_descriptors(&loaded.modules, catalog)?;
        Self::run(modules, config)
    }

    fn plan_descriptors(modules: &[ModuleDescriptor]) -> Result<Vec<String>> {
        let graph = DependencyGraph::build(modules.iter().map(|m| &m.declaration))?;
        TopologicalScheduler::schedule(&graph)
    }
}
