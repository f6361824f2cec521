//! Service definitions and live service instances
//!
//! A [`ServiceDefinition`] is what a module factory hands back; a
//! [`ServiceInstance`] is the registry node it becomes. Instances are shared
//! through [`ServiceHandle`] so that imports views and event callbacks can
//! keep referring to the same live object after it has been extended or
//! reconfigured. Consumers only ever see a [`ServiceView`], which can read
//! and call a service but not reshape it.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::config::merge::{empty_tree, merge};
use crate::error::{ContractViolationKind, Result, WiringError};
use crate::registry::name::QualifiedName;

/// Event callback: receives the owning service and the trigger payload
pub type EventHandler = Arc<dyn Fn(&ServiceHandle, &Value) + Send + Sync>;

/// Named operation: receives the owning service and its arguments
pub type Operation = Arc<dyn Fn(&ServiceHandle, &Value) -> anyhow::Result<Value> + Send + Sync>;

/// Names that can never be defined as operations
pub const PROTECTED_NAMES: &[&str] = &["trigger", "configure", "events", "name", "extends"];

/// Whether `name` is reserved by the service shape
pub fn is_protected(name: &str) -> bool {
    PROTECTED_NAMES.contains(&name)
}

/// What a module exports for one service: initial config, handlers, operations
#[derive(Clone)]
pub struct ServiceDefinition {
    config: Value,
    handlers: BTreeMap<String, Vec<EventHandler>>,
    operations: BTreeMap<String, Operation>,
}

impl ServiceDefinition {
    pub fn new() -> Self {
        Self {
            config: empty_tree(),
            handlers: BTreeMap::new(),
            operations: BTreeMap::new(),
        }
    }

    /// Set the initial configuration tree
    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    /// Append a handler for `event`
    pub fn on<F>(mut self, event: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&ServiceHandle, &Value) + Send + Sync + 'static,
    {
        self.handlers
            .entry(event.into())
            .or_default()
            .push(Arc::new(handler));
        self
    }

    /// Define a named operation
    pub fn operation<F>(mut self, name: impl Into<String>, op: F) -> Self
    where
        F: Fn(&ServiceHandle, &Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.operations.insert(name.into(), Arc::new(op));
        self
    }

    pub fn config(&self) -> &Value {
        &self.config
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers.get(event).map_or(0, Vec::len)
    }

    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    /// Operation names that collide with [`PROTECTED_NAMES`]
    pub fn protected_operations(&self) -> Vec<String> {
        self.operations
            .keys()
            .filter(|name| is_protected(name))
            .cloned()
            .collect()
    }
}

impl Default for ServiceDefinition {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ServiceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDefinition")
            .field("config", &self.config)
            .field("events", &self.handlers.keys().collect::<Vec<_>>())
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Live registry node
pub struct ServiceInstance {
    name: QualifiedName,
    config: Value,
    handlers: HashMap<String, Vec<EventHandler>>,
    operations: HashMap<String, Operation>,
}

impl ServiceInstance {
    /// Create an instance from its first definition
    pub fn from_definition(name: QualifiedName, definition: ServiceDefinition) -> Result<Self> {
        let protected = definition.protected_operations();
        if !protected.is_empty() {
            return Err(WiringError::service_contract(
                &name,
                ContractViolationKind::ProtectedName,
                protected,
            ));
        }

        let mut config = empty_tree();
        merge(&mut config, definition.config);
        Ok(Self {
            name,
            config,
            handlers: definition.handlers.into_iter().collect(),
            operations: definition.operations.into_iter().collect(),
        })
    }

    /// Service name inside its container
    pub fn name(&self) -> &str {
        self.name.service()
    }

    pub fn qualified_name(&self) -> &QualifiedName {
        &self.name
    }

    pub fn config(&self) -> &Value {
        &self.config
    }

    /// Deep-merge `options` into this service's configuration
    pub fn configure(&mut self, options: Value) {
        merge(&mut self.config, options);
    }

    /// Merge another definition into this live instance
    ///
    /// Handlers are appended after existing ones; operations are added or
    /// overridden by name. Identity and untouched operations are kept.
    pub fn extend(&mut self, definition: ServiceDefinition) -> Result<()> {
        let protected = definition.protected_operations();
        if !protected.is_empty() {
            return Err(WiringError::service_contract(
                &self.name,
                ContractViolationKind::ProtectedName,
                protected,
            ));
        }

        merge(&mut self.config, definition.config);
        for (event, handlers) in definition.handlers {
            self.handlers.entry(event).or_default().extend(handlers);
        }
        for (name, op) in definition.operations {
            if self.operations.insert(name.clone(), op).is_some() {
                debug!("{}: operation '{}' overridden", self.name, name);
            }
        }
        Ok(())
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers.get(event).map_or(0, Vec::len)
    }

    pub fn has_operation(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Sorted operation names
    pub fn operation_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.operations.keys().cloned().collect();
        names.sort();
        names
    }

    fn handlers_for(&self, event: &str) -> Vec<EventHandler> {
        self.handlers.get(event).cloned().unwrap_or_default()
    }

    fn operation(&self, name: &str) -> Option<Operation> {
        self.operations.get(name).cloned()
    }
}

impl fmt::Debug for ServiceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut events: Vec<_> = self.handlers.keys().collect();
        events.sort();
        f.debug_struct("ServiceInstance")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("events", &events)
            .field("operations", &self.operation_names())
            .finish()
    }
}

/// Shared handle to a live [`ServiceInstance`]
///
/// Cloning the handle never clones the service. Locks are only held for the
/// duration of a single accessor; callbacks run with no lock held so that
/// they can freely reconfigure or trigger the service they belong to.
#[derive(Clone)]
pub struct ServiceHandle {
    inner: Arc<RwLock<ServiceInstance>>,
}

impl ServiceHandle {
    pub fn new(instance: ServiceInstance) -> Self {
        Self {
            inner: Arc::new(RwLock::new(instance)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ServiceInstance> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ServiceInstance> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the instance under a read lock
    pub fn with<R>(&self, f: impl FnOnce(&ServiceInstance) -> R) -> R {
        f(&self.read())
    }

    pub fn name(&self) -> String {
        self.read().name().to_string()
    }

    pub fn qualified_name(&self) -> QualifiedName {
        self.read().qualified_name().clone()
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> Value {
        self.read().config().clone()
    }

    pub fn configure(&self, options: Value) -> &Self {
        self.write().configure(options);
        self
    }

    /// Merge a definition into the live instance
    pub fn extend(&self, definition: ServiceDefinition) -> Result<()> {
        self.write().extend(definition)
    }

    /// Listen for `event` on the live instance
    pub fn on<F>(&self, event: impl Into<String>, handler: F) -> &Self
    where
        F: Fn(&ServiceHandle, &Value) + Send + Sync + 'static,
    {
        self.write()
            .handlers
            .entry(event.into())
            .or_default()
            .push(Arc::new(handler));
        self
    }

    /// Invoke every handler for `event` in registration order
    ///
    /// Unregistered events are a no-op.
    pub fn trigger(&self, event: &str, payload: &Value) -> &Self {
        let handlers = self.read().handlers_for(event);
        for handler in handlers {
            handler(self, payload);
        }
        self
    }

    /// Call a named operation
    pub fn call(&self, operation: &str, args: &Value) -> Result<Value> {
        let (op, service) = {
            let instance = self.read();
            (instance.operation(operation), instance.qualified_name().to_string())
        };
        let op = op.ok_or_else(|| WiringError::NotFound {
            what: "operation",
            name: format!("{service}#{operation}"),
        })?;
        op(self, args).map_err(|source| WiringError::Operation {
            service,
            operation: operation.to_string(),
            source,
        })
    }

    pub fn has_operation(&self, name: &str) -> bool {
        self.read().has_operation(name)
    }

    pub fn operation_names(&self) -> Vec<String> {
        self.read().operation_names()
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.read().handler_count(event)
    }

    /// Read-only view for consumers
    pub fn view(&self) -> ServiceView {
        ServiceView {
            handle: self.clone(),
        }
    }

    /// Whether both handles point at the same live instance
    pub fn ptr_eq(&self, other: &ServiceHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.read(), f)
    }
}

/// Read-only view of a live service
///
/// Imports hand these out instead of [`ServiceHandle`]: a view reads config,
/// calls operations and triggers events, but has no way to reconfigure the
/// service or add handlers and operations to it.
///
/// ```compile_fail
/// fn augment(view: &modwire::registry::ServiceView) {
///     view.extend(modwire::ServiceDefinition::new());
/// }
/// ```
#[derive(Clone)]
pub struct ServiceView {
    handle: ServiceHandle,
}

impl ServiceView {
    pub fn name(&self) -> String {
        self.handle.name()
    }

    pub fn qualified_name(&self) -> QualifiedName {
        self.handle.qualified_name()
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> Value {
        self.handle.config()
    }

    pub fn call(&self, operation: &str, args: &Value) -> Result<Value> {
        self.handle.call(operation, args)
    }

    pub fn trigger(&self, event: &str, payload: &Value) -> &Self {
        self.handle.trigger(event, payload);
        self
    }

    pub fn has_operation(&self, name: &str) -> bool {
        self.handle.has_operation(name)
    }

    pub fn operation_names(&self) -> Vec<String> {
        self.handle.operation_names()
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.handle.handler_count(event)
    }

    /// Whether this view points at `handle`'s instance
    pub fn is(&self, handle: &ServiceHandle) -> bool {
        self.handle.ptr_eq(handle)
    }
}

impl fmt::Debug for ServiceView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.handle, f)
    }
}
