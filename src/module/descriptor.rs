//! Module descriptors, factories, export trees and imports views
//!
//! A [`ModuleDescriptor`] pairs what a module declares (its
//! [`ModuleDeclaration`]) with the factory that realizes it. Factories
//! receive an [`Imports`] view and hand back an [`ExportTree`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, WiringError};
use crate::registry::name::QualifiedName;
use crate::registry::service::{ServiceDefinition, ServiceHandle, ServiceView};

/// Capabilities a module declares
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleDeclaration {
    /// Module name (unique within a manifest)
    pub name: String,
    /// Names this module creates
    pub provides: BTreeSet<QualifiedName>,
    /// Names this module reads
    pub consumes: BTreeSet<QualifiedName>,
    /// Names this module augments in place
    pub extends: BTreeSet<QualifiedName>,
}

impl ModuleDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Declaration from `container.service` strings
    pub fn parse(name: &str, provides: &[&str], consumes: &[&str], extends: &[&str]) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            provides: parse_names(name, provides)?,
            consumes: parse_names(name, consumes)?,
            extends: parse_names(name, extends)?,
        })
    }

    pub fn with_provides(mut self, names: impl IntoIterator<Item = QualifiedName>) -> Self {
        self.provides.extend(names);
        self
    }

    pub fn with_consumes(mut self, names: impl IntoIterator<Item = QualifiedName>) -> Self {
        self.consumes.extend(names);
        self
    }

    pub fn with_extends(mut self, names: impl IntoIterator<Item = QualifiedName>) -> Self {
        self.extends.extend(names);
        self
    }

    /// `consumes ∪ extends`: everything that must exist before activation
    pub fn requirements(&self) -> impl Iterator<Item = &QualifiedName> {
        self.consumes.iter().chain(self.extends.iter())
    }

    /// `provides ∪ extends`: everything the export tree must contain
    pub fn exports(&self) -> BTreeSet<QualifiedName> {
        self.provides.union(&self.extends).cloned().collect()
    }

    /// Declares neither `provides` nor `extends`
    pub fn exports_nothing(&self) -> bool {
        self.provides.is_empty() && self.extends.is_empty()
    }

    /// Declares nothing at all
    pub fn is_standalone(&self) -> bool {
        self.exports_nothing() && self.consumes.is_empty()
    }
}

fn parse_names(module: &str, names: &[&str]) -> Result<BTreeSet<QualifiedName>> {
    names
        .iter()
        .map(|raw| {
            raw.parse::<QualifiedName>().map_err(|e| {
                WiringError::manifest(module, e.to_string())
            })
        })
        .collect()
}

/// Produces a module's exports from its imports
pub trait ModuleFactory: Send + Sync {
    fn create(&self, imports: &Imports) -> anyhow::Result<ExportTree>;
}

impl<F> ModuleFactory for F
where
    F: Fn(&Imports) -> anyhow::Result<ExportTree> + Send + Sync,
{
    fn create(&self, imports: &Imports) -> anyhow::Result<ExportTree> {
        self(imports)
    }
}

/// Declaration plus factory
#[derive(Clone)]
pub struct ModuleDescriptor {
    pub declaration: ModuleDeclaration,
    pub factory: Arc<dyn ModuleFactory>,
}

impl ModuleDescriptor {
    /// Descriptor whose factory is a closure
    pub fn new<F>(declaration: ModuleDeclaration, factory: F) -> Self
    where
        F: Fn(&Imports) -> anyhow::Result<ExportTree> + Send + Sync + 'static,
    {
        Self::with_factory(declaration, factory)
    }

    pub fn with_factory(declaration: ModuleDeclaration, factory: impl ModuleFactory + 'static) -> Self {
        Self {
            declaration,
            factory: Arc::new(factory),
        }
    }

    pub fn from_shared(declaration: ModuleDeclaration, factory: Arc<dyn ModuleFactory>) -> Self {
        Self {
            declaration,
            factory,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("declaration", &self.declaration)
            .finish_non_exhaustive()
    }
}

/// Ordered `container → service → definition` mapping returned by a factory
#[derive(Debug, Default, Clone)]
pub struct ExportTree {
    containers: Vec<(String, Vec<(String, ServiceDefinition)>)>,
}

impl ExportTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) one service definition, builder style
    pub fn service(
        mut self,
        container: impl Into<String>,
        service: impl Into<String>,
        definition: ServiceDefinition,
    ) -> Self {
        self.insert(QualifiedName::new(container, service), definition);
        self
    }

    /// Add (or replace) one service definition
    pub fn insert(&mut self, name: QualifiedName, definition: ServiceDefinition) {
        let position = self
            .containers
            .iter()
            .position(|(container, _)| container == name.container());
        let services = match position {
            Some(index) => &mut self.containers[index].1,
            None => {
                self.containers.push((name.container().to_string(), Vec::new()));
                let last = self.containers.len() - 1;
                &mut self.containers[last].1
            }
        };
        match services.iter_mut().find(|(service, _)| service == name.service()) {
            Some(slot) => slot.1 = definition,
            None => services.push((name.service().to_string(), definition)),
        }
    }

    pub fn contains(&self, name: &QualifiedName) -> bool {
        self.names().any(|n| &n == name)
    }

    /// Exported names in insertion order
    pub fn names(&self) -> impl Iterator<Item = QualifiedName> + '_ {
        self.containers.iter().flat_map(|(container, services)| {
            services
                .iter()
                .map(move |(service, _)| QualifiedName::new(container.clone(), service.clone()))
        })
    }

    /// Exported names with their definitions, in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (QualifiedName, &ServiceDefinition)> + '_ {
        self.containers.iter().flat_map(|(container, services)| {
            services.iter().map(move |(service, definition)| {
                (QualifiedName::new(container.clone(), service.clone()), definition)
            })
        })
    }

    pub fn len(&self) -> usize {
        self.containers.iter().map(|(_, services)| services.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IntoIterator for ExportTree {
    type Item = (QualifiedName, ServiceDefinition);
    type IntoIter = std::vec::IntoIter<(QualifiedName, ServiceDefinition)>;

    fn into_iter(self) -> Self::IntoIter {
        self.containers
            .into_iter()
            .flat_map(|(container, services)| {
                services.into_iter().map(move |(service, definition)| {
                    (QualifiedName::new(container.clone(), service), definition)
                })
            })
            .collect::<Vec<_>>()
            .into_iter()
    }
}

/// Read-only view of a module's resolved imports, grouped by container
///
/// Every entry is a [`ServiceView`]: a module can use what it consumes but
/// can only change services it declares as `extends`, through its exports.
#[derive(Debug, Default, Clone)]
pub struct Imports {
    containers: BTreeMap<String, BTreeMap<String, ServiceView>>,
}

impl Imports {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: &QualifiedName, service: &ServiceHandle) {
        self.containers
            .entry(name.container().to_string())
            .or_default()
            .insert(name.service().to_string(), service.view());
    }

    /// Look up an import by `container.service`
    pub fn get(&self, name: &str) -> Option<&ServiceView> {
        let name: QualifiedName = name.parse().ok()?;
        self.containers.get(name.container())?.get(name.service())
    }

    /// Like [`Imports::get`], but a missing import is a `NotFound` error
    pub fn require(&self, name: &str) -> Result<ServiceView> {
        self.get(name).cloned().ok_or_else(|| WiringError::NotFound {
            what: "import",
            name: name.to_string(),
        })
    }

    /// Every import from one container
    pub fn container(&self, name: &str) -> Option<&BTreeMap<String, ServiceView>> {
        self.containers.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (QualifiedName, &ServiceView)> {
        self.containers.iter().flat_map(|(container, services)| {
            services
                .iter()
                .map(move |(service, view)| (QualifiedName::new(container.clone(), service.clone()), view))
        })
    }

    pub fn len(&self) -> usize {
        self.containers.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::service::ServiceInstance;

    #[test]
    fn test_declaration_sets() {
        let decl = ModuleDeclaration::parse(
            "web",
            &["web.app", "web.router"],
            &["core.log"],
            &["core.app"],
        )
        .unwrap();

        let requirements: Vec<String> = decl.requirements().map(|n| n.to_string()).collect();
        assert_eq!(requirements, vec!["core.log", "core.app"]);

        let exports: Vec<String> = decl.exports().iter().map(|n| n.to_string()).collect();
        assert_eq!(exports, vec!["core.app", "web.app", "web.router"]);
        assert!(!decl.exports_nothing());
        assert!(!decl.is_standalone());
        assert!(ModuleDeclaration::new("idle").is_standalone());
    }

    #[test]
    fn test_declaration_rejects_bad_names() {
        let err = ModuleDeclaration::parse("web", &["nodot"], &[], &[]).unwrap_err();
        assert!(matches!(err, WiringError::Manifest { .. }));
    }

    #[test]
    fn test_export_tree_keeps_insertion_order_and_replaces() {
        let mut tree = ExportTree::new()
            .service("plugin", "world", ServiceDefinition::new())
            .service("core", "router", ServiceDefinition::new())
            .service("plugin", "hello", ServiceDefinition::new());
        tree.insert(QualifiedName::new("plugin", "world"), ServiceDefinition::new());

        let names: Vec<String> = tree.names().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["plugin.world", "plugin.hello", "core.router"]);
        assert_eq!(tree.len(), 3);
        assert!(tree.contains(&QualifiedName::new("core", "router")));

        let consumed: Vec<String> = tree.into_iter().map(|(n, _)| n.to_string()).collect();
        assert_eq!(consumed, vec!["plugin.world", "plugin.hello", "core.router"]);
    }

    #[test]
    fn test_imports_lookup() {
        let name = QualifiedName::new("core", "router");
        let handle = ServiceHandle::new(
            ServiceInstance::from_definition(name.clone(), ServiceDefinition::new()).unwrap(),
        );
        let mut imports = Imports::new();
        imports.insert(&name, &handle);

        assert!(imports.get("core.router").unwrap().is(&handle));
        assert!(imports.get(" core.router ").unwrap().is(&handle));
        assert!(imports.get("core.app").is_none());
        assert!(imports.get("core").is_none());
        assert_eq!(imports.container("core").unwrap().len(), 1);
        assert!(imports.require("web.app").is_err());
        assert_eq!(imports.len(), 1);
    }

    #[test]
    fn test_closure_is_a_factory() {
        let descriptor =
            ModuleDescriptor::new(ModuleDeclaration::new("idle"), |_| Ok(ExportTree::new()));
        let tree = descriptor.factory.create(&Imports::new()).unwrap();
        assert!(tree.is_empty());
        assert_eq!(descriptor.name(), "idle");
    }
}
