//! Module system
//!
//! Modules declare the qualified names they provide, consume and extend, and
//! supply a factory that realizes those declarations.
//!
//! ## Pipeline
//!
//! - **Graph**: every consumed/extended name becomes a "provider before
//!   consumer" edge ([`graph`])
//! - **Schedule**: Kahn's algorithm, ties broken by manifest order ([`scheduler`])
//! - **Activate**: factories run in order, and their export trees are checked
//!   against the declarations before registration ([`activator`])
//!
//! Discovery on disk ([`loader`], [`manifest`], [`validation`]) sits in front
//! of this and only produces [`ModuleDescriptor`]s.

pub mod activator;
pub mod descriptor;
pub mod graph;
pub mod loader;
pub mod manifest;
pub mod scheduler;
pub mod validation;

pub use activator::ModuleActivator;
pub use descriptor::{ExportTree, Imports, ModuleDeclaration, ModuleDescriptor, ModuleFactory};
pub use graph::{DependencyGraph, Edge, Origin};
pub use loader::{DiscoveredModule, FactoryCatalog, LoadedApp, ModuleLoader};
pub use manifest::{AppManifest, ModuleManifest, PluginSection};
pub use scheduler::TopologicalScheduler;
pub use validation::{ManifestValidator, ValidationResult};
