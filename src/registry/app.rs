//! Registry root
//!
//! The [`App`] owns every container, which in turn owns its services. It is
//! passed explicitly through bootstrap and runtime calls; there is no
//! process-wide registry.

use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::merge::{empty_tree, merge, subtree};
use crate::error::{Result, WiringError};
use crate::registry::container::Container;
use crate::registry::name::QualifiedName;
use crate::registry::service::{ServiceDefinition, ServiceHandle};

/// Result of [`App::get`]: a whole container or a single service
#[derive(Debug)]
pub enum Entry<'a> {
    Container(&'a Container),
    Service(ServiceHandle),
}

impl<'a> Entry<'a> {
    pub fn into_service(self) -> Option<ServiceHandle> {
        match self {
            Entry::Service(service) => Some(service),
            Entry::Container(_) => None,
        }
    }

    pub fn into_container(self) -> Option<&'a Container> {
        match self {
            Entry::Container(container) => Some(container),
            Entry::Service(_) => None,
        }
    }
}

/// Two-level service registry with global configuration
#[derive(Debug)]
pub struct App {
    order: Vec<String>,
    containers: HashMap<String, Container>,
    config: Value,
}

impl App {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            containers: HashMap::new(),
            config: empty_tree(),
        }
    }

    /// Registry with an initial global configuration
    pub fn with_config(config: Value) -> Self {
        let mut app = Self::new();
        app.configure(config);
        app
    }

    /// Global configuration (keys are container names)
    pub fn config(&self) -> &Value {
        &self.config
    }

    /// Create or extend `name`, creating its container on first use
    pub fn register(
        &mut self,
        name: &QualifiedName,
        definition: ServiceDefinition,
    ) -> Result<ServiceHandle> {
        self.container_mut(name.container())
            .register(name.service(), definition)
    }

    fn container_mut(&mut self, name: &str) -> &mut Container {
        let config = &self.config;
        let order = &mut self.order;
        self.containers.entry(name.to_string()).or_insert_with(|| {
            debug!("Creating container {}", name);
            let mut container = Container::new(name);
            if let Some(staged) = subtree(config, name) {
                container.configure(staged.clone());
            }
            order.push(name.to_string());
            container
        })
    }

    /// Look up a container (`core`) or a service (`core.router`)
    ///
    /// Service names are parsed like declared names, surrounding whitespace
    /// included.
    pub fn get(&self, name: &str) -> Result<Entry<'_>> {
        let name = name.trim();
        if !name.contains('.') {
            return Ok(Entry::Container(self.container(name)?));
        }
        let qualified: QualifiedName = name.parse().map_err(|_| WiringError::NotFound {
            what: "service",
            name: name.to_string(),
        })?;
        Ok(Entry::Service(self.service(&qualified)?))
    }

    pub fn container(&self, name: &str) -> Result<&Container> {
        self.containers.get(name).ok_or_else(|| WiringError::NotFound {
            what: "container",
            name: name.to_string(),
        })
    }

    pub fn service(&self, name: &QualifiedName) -> Result<ServiceHandle> {
        self.container(name.container())?.get(name.service())
    }

    /// Pure existence check
    pub fn contains(&self, container: &str, service: &str) -> bool {
        self.containers
            .get(container)
            .is_some_and(|c| c.contains(service))
    }

    pub fn contains_name(&self, name: &QualifiedName) -> bool {
        self.contains(name.container(), name.service())
    }

    /// Container names in creation order
    pub fn containers(&self) -> &[String] {
        &self.order
    }

    /// Iterate containers in creation order
    pub fn each(&self, mut f: impl FnMut(&Container)) -> &Self {
        for name in &self.order {
            if let Some(container) = self.containers.get(name) {
                f(container);
            }
        }
        self
    }

    /// Merge into the global config and push the incoming sub-trees down
    ///
    /// Existing containers only receive the keys present in `options`; the
    /// accumulated tree is kept for containers created later. A root that is
    /// not a map is ignored.
    pub fn configure(&mut self, options: Value) -> &mut Self {
        let entries = match options {
            Value::Object(entries) => entries,
            other => {
                warn!("Ignoring global configuration that is not a map: {}", other);
                return self;
            }
        };
        for name in &self.order {
            if let (Some(container), Some(staged)) =
                (self.containers.get_mut(name), entries.get(name))
            {
                container.configure(staged.clone());
            }
        }
        merge(&mut self.config, Value::Object(entries));
        self
    }

    /// Broadcast `event` to every container in creation order
    pub fn trigger(&self, event: &str, payload: &Value) -> &Self {
        debug!("Broadcasting event {}", event);
        self.each(|container| {
            container.trigger(event, payload);
        })
    }

    /// Trigger `event` on a single container
    pub fn trigger_in(&self, container: &str, event: &str, payload: &Value) -> Result<&Self> {
        self.container(container)?.trigger(event, payload);
        Ok(self)
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
