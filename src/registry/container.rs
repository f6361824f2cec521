//! Service containers
//!
//! A container is a named namespace of services. Registration order is kept
//! and drives iteration and event broadcast order.

use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::merge::{empty_tree, merge, subtree};
use crate::error::{Result, WiringError};
use crate::registry::name::QualifiedName;
use crate::registry::service::{ServiceDefinition, ServiceHandle, ServiceInstance};

/// Named group of services
#[derive(Debug)]
pub struct Container {
    name: String,
    order: Vec<String>,
    services: HashMap<String, ServiceHandle>,
    config: Value,
}

impl Container {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: Vec::new(),
            services: HashMap::new(),
            config: empty_tree(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Container-level configuration (keys are service names)
    pub fn config(&self) -> &Value {
        &self.config
    }

    /// Create or extend `service`
    ///
    /// A new service gets any configuration already staged under its name;
    /// an existing one is extended in place.
    pub fn register(&mut self, service: &str, definition: ServiceDefinition) -> Result<ServiceHandle> {
        if let Some(existing) = self.services.get(service) {
            debug!("Extending service {}.{}", self.name, service);
            existing.extend(definition)?;
            return Ok(existing.clone());
        }

        let name = QualifiedName::new(self.name.clone(), service);
        let mut instance = ServiceInstance::from_definition(name, definition)?;
        if let Some(staged) = subtree(&self.config, service) {
            instance.configure(staged.clone());
        }

        debug!("Registered service {}.{}", self.name, service);
        let handle = ServiceHandle::new(instance);
        self.order.push(service.to_string());
        self.services.insert(service.to_string(), handle.clone());
        Ok(handle)
    }

    /// Look up a service
    pub fn get(&self, service: &str) -> Result<ServiceHandle> {
        self.services
            .get(service)
            .cloned()
            .ok_or_else(|| WiringError::NotFound {
                what: "service",
                name: format!("{}.{}", self.name, service),
            })
    }

    pub fn contains(&self, service: &str) -> bool {
        self.services.contains_key(service)
    }

    /// Service names in registration order
    pub fn services(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate services in registration order
    pub fn each(&self, mut f: impl FnMut(&ServiceHandle)) -> &Self {
        for name in &self.order {
            if let Some(service) = self.services.get(name) {
                f(service);
            }
        }
        self
    }

    /// Merge `options` into the container config and push the incoming
    /// per-service sub-trees down to already registered services
    ///
    /// Options that are not a map are ignored.
    pub fn configure(&mut self, options: Value) -> &mut Self {
        let entries = match options {
            Value::Object(entries) => entries,
            other => {
                warn!("{}: ignoring configuration that is not a map: {}", self.name, other);
                return self;
            }
        };
        for name in &self.order {
            if let (Some(service), Some(staged)) = (self.services.get(name), entries.get(name)) {
                service.configure(staged.clone());
            }
        }
        merge(&mut self.config, Value::Object(entries));
        self
    }

    /// Trigger `event` on every service in registration order
    pub fn trigger(&self, event: &str, payload: &Value) -> &Self {
        self.each(|service| {
            service.trigger(event, payload);
        })
    }
}
