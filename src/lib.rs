//! modwire - declarative module wiring
//!
//! Modules declare which `container.service` names they provide, consume or
//! extend. The engine orders them so every provider activates before its
//! consumers, hands each factory its resolved imports, checks the returned
//! exports against the declaration, and registers them into a two-level
//! service registry ([`App`] → [`Container`] → service).
//!
//! ## Example
//!
//! ```rust
//! use modwire::{Bootstrap, ExportTree, ModuleDeclaration, ModuleDescriptor, ServiceDefinition};
//! use serde_json::json;
//!
//! let core = ModuleDescriptor::new(
//!     ModuleDeclaration::parse("core", &["core.router"], &[], &[])?,
//!     |_| Ok(ExportTree::new().service("core", "router", ServiceDefinition::new())),
//! );
//! let hello = ModuleDescriptor::new(
//!     ModuleDeclaration::parse("hello", &[], &["core.router"], &[])?,
//!     |imports| {
//!         imports.require("core.router")?;
//!         Ok(ExportTree::new())
//!     },
//! );
//!
//! let app = Bootstrap::run(vec![hello, core], json!({}))?;
//! assert!(app.contains("core", "router"));
//! # Ok::<(), modwire::WiringError>(())
//! ```

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod module;
pub mod registry;
pub mod utils;

pub use bootstrap::Bootstrap;
pub use config::{EngineConfig, LoggingConfig};
pub use error::{ContractViolationKind, Result, WiringError};
pub use module::{
    ExportTree, FactoryCatalog, Imports, ModuleDeclaration, ModuleDescriptor, ModuleFactory,
    ModuleLoader,
};
pub use registry::{
    App, Container, Entry, QualifiedName, ServiceDefinition, ServiceHandle, ServiceView,
};
