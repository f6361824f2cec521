//! Dependency graph construction
//!
//! Turns provides/consumes/extends declarations into "must activate before"
//! edges. Every `consumes`/`extends` entry becomes an edge from the module
//! that provides the name to the module that requires it. Modules with no
//! incoming requirement hang off a synthetic root so none are dropped.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use crate::error::{Result, WiringError};
use crate::module::descriptor::ModuleDeclaration;
use crate::registry::name::QualifiedName;

/// Source of an edge
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Origin {
    /// Synthetic root, for modules nothing else must precede
    Root,
    Module(String),
}

/// `from` must activate before `to`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: Origin,
    pub to: String,
    /// Names that caused the edge (empty for root edges)
    pub via: Vec<QualifiedName>,
}

/// Module dependency graph, indexed by declaration order
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    modules: Vec<String>,
    successors: Vec<BTreeSet<usize>>,
    predecessors: Vec<BTreeMap<usize, Vec<QualifiedName>>>,
    providers: BTreeMap<QualifiedName, usize>,
}

impl DependencyGraph {
    /// Build the graph from declarations, in manifest order
    pub fn build<'a>(modules: impl IntoIterator<Item = &'a ModuleDeclaration>) -> Result<Self> {
        let declarations: Vec<&ModuleDeclaration> = modules.into_iter().collect();

        let mut index: HashMap<&str, usize> = HashMap::new();
        for (position, declaration) in declarations.iter().enumerate() {
            if index.insert(declaration.name.as_str(), position).is_some() {
                return Err(WiringError::DuplicateModule {
                    module: declaration.name.clone(),
                });
            }
        }

        let mut providers: BTreeMap<QualifiedName, usize> = BTreeMap::new();
        for (position, declaration) in declarations.iter().enumerate() {
            for name in &declaration.provides {
                if let Some(&first) = providers.get(name) {
                    return Err(WiringError::Conflict {
                        name: name.clone(),
                        first: declarations[first].name.clone(),
                        second: declaration.name.clone(),
                    });
                }
                providers.insert(name.clone(), position);
            }
        }

        let count = declarations.len();
        let mut successors = vec![BTreeSet::new(); count];
        let mut predecessors: Vec<BTreeMap<usize, Vec<QualifiedName>>> = vec![BTreeMap::new(); count];
        for (position, declaration) in declarations.iter().enumerate() {
            for name in declaration.requirements() {
                let provider = *providers.get(name).ok_or_else(|| WiringError::Dependency {
                    module: declaration.name.clone(),
                    name: name.clone(),
                })?;
                successors[provider].insert(position);
                predecessors[position]
                    .entry(provider)
                    .or_default()
                    .push(name.clone());
            }
        }

        let graph = Self {
            modules: declarations.iter().map(|d| d.name.clone()).collect(),
            successors,
            predecessors,
            providers,
        };
        debug!(
            "Dependency graph built: {} modules, {} edges",
            graph.len(),
            graph.edges().len()
        );
        Ok(graph)
    }

    /// Module names in declaration order
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Module that provides `name`
    pub fn provider_of(&self, name: &QualifiedName) -> Option<&str> {
        self.providers.get(name).map(|&i| self.modules[i].as_str())
    }

    /// Modules that must activate before `module`
    pub fn dependencies_of(&self, module: &str) -> Vec<&str> {
        self.position(module)
            .map(|i| {
                self.predecessors[i]
                    .keys()
                    .map(|&p| self.modules[p].as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every edge, root edges included
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges = Vec::new();
        for (position, name) in self.modules.iter().enumerate() {
            if self.predecessors[position].is_empty() {
                edges.push(Edge {
                    from: Origin::Root,
                    to: name.clone(),
                    via: Vec::new(),
                });
            }
            for (&provider, via) in &self.predecessors[position] {
                edges.push(Edge {
                    from: Origin::Module(self.modules[provider].clone()),
                    to: name.clone(),
                    via: via.clone(),
                });
            }
        }
        edges
    }

    pub(crate) fn position(&self, module: &str) -> Option<usize> {
        self.modules.iter().position(|m| m == module)
    }

    pub(crate) fn successors(&self, position: usize) -> &BTreeSet<usize> {
        &self.successors[position]
    }

    pub(crate) fn in_degree(&self, position: usize) -> usize {
        self.predecessors[position].len()
    }

    pub(crate) fn name(&self, position: usize) -> &str {
        &self.modules[position]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(name: &str, provides: &[&str], consumes: &[&str], extends: &[&str]) -> ModuleDeclaration {
        ModuleDeclaration::parse(name, provides, consumes, extends).unwrap()
    }

    #[test]
    fn test_consume_creates_provider_edge() {
        let modules = vec![
            decl("hello", &[], &["core.router"], &[]),
            decl("core", &["core.router"], &[], &[]),
        ];
        let graph = DependencyGraph::build(&modules).unwrap();

        assert_eq!(graph.dependencies_of("hello"), vec!["core"]);
        assert_eq!(graph.provider_of(&"core.router".parse().unwrap()), Some("core"));

        let edges = graph.edges();
        assert!(edges.contains(&Edge {
            from: Origin::Module("core".into()),
            to: "hello".into(),
            via: vec!["core.router".parse().unwrap()],
        }));
    }

    #[test]
    fn test_standalone_modules_get_root_edge() {
        let modules = vec![decl("idle", &[], &[], &[]), decl("core", &["core.app"], &[], &[])];
        let graph = DependencyGraph::build(&modules).unwrap();
        let roots: Vec<String> = graph
            .edges()
            .into_iter()
            .filter(|e| e.from == Origin::Root)
            .map(|e| e.to)
            .collect();
        assert_eq!(roots, vec!["idle", "core"]);
    }

    #[test]
    fn test_duplicate_provider_conflict() {
        let modules = vec![
            decl("a", &["x.s"], &[], &[]),
            decl("b", &["x.s"], &[], &[]),
        ];
        match DependencyGraph::build(&modules).unwrap_err() {
            WiringError::Conflict { name, first, second } => {
                assert_eq!(name.to_string(), "x.s");
                assert_eq!(first, "a");
                assert_eq!(second, "b");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_provider_dependency_error() {
        let modules = vec![decl("hello", &[], &[], &["core.router"])];
        match DependencyGraph::build(&modules).unwrap_err() {
            WiringError::Dependency { module, name } => {
                assert_eq!(module, "hello");
                assert_eq!(name.to_string(), "core.router");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_module_name() {
        let modules = vec![decl("a", &[], &[], &[]), decl("a", &[], &[], &[])];
        assert!(matches!(
            DependencyGraph::build(&modules).unwrap_err(),
            WiringError::DuplicateModule { .. }
        ));
    }

    #[test]
    fn test_multiple_names_from_one_provider_collapse_to_one_edge() {
        let modules = vec![
            decl("core", &["core.app", "core.router"], &[], &[]),
            decl("web", &[], &["core.app"], &["core.router"]),
        ];
        let graph = DependencyGraph::build(&modules).unwrap();
        let position = graph.position("web").unwrap();
        assert_eq!(graph.in_degree(position), 1);
        let edge = graph
            .edges()
            .into_iter()
            .find(|e| e.to == "web")
            .unwrap();
        assert_eq!(edge.via.len(), 2);
    }
}
