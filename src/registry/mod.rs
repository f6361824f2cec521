//! Two-level service registry (App → Container → ServiceInstance)

pub mod app;
pub mod container;
pub mod name;
pub mod service;

pub use app::{App, Entry};
pub use container::Container;
pub use name::{InvalidQualifiedName, QualifiedName};
pub use service::{
    is_protected, EventHandler, Operation, ServiceDefinition, ServiceHandle, ServiceInstance,
    ServiceView, PROTECTED_NAMES,
};
