//! Test utilities for wiring tests
//!
//! Module builders, a call recorder for ordering assertions, and on-disk
//! package fixtures.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use modwire::{ExportTree, Imports, ModuleDeclaration, ModuleDescriptor, ServiceDefinition};

/// Shared log of events, in the order they happened
#[derive(Clone, Default)]
pub struct Recorder {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

/// Descriptor with a closure factory
pub fn module<F>(
    name: &str,
    provides: &[&str],
    consumes: &[&str],
    extends: &[&str],
    factory: F,
) -> ModuleDescriptor
where
    F: Fn(&Imports) -> anyhow::Result<ExportTree> + Send + Sync + 'static,
{
    ModuleDescriptor::new(
        ModuleDeclaration::parse(name, provides, consumes, extends).unwrap(),
        factory,
    )
}

/// Module that exports an empty definition for every declared name and
/// records its activation
pub fn recording_module(
    recorder: &Recorder,
    name: &str,
    provides: &[&str],
    consumes: &[&str],
    extends: &[&str],
) -> ModuleDescriptor {
    let recorder = recorder.clone();
    let declaration = ModuleDeclaration::parse(name, provides, consumes, extends).unwrap();
    let exports: Vec<_> = declaration.exports().into_iter().collect();
    let module_name = name.to_string();
    ModuleDescriptor::new(declaration, move |_| {
        recorder.record(module_name.clone());
        let mut tree = ExportTree::new();
        for name in &exports {
            tree.insert(name.clone(), ServiceDefinition::new());
        }
        Ok(tree)
    })
}

/// Write `contents` to `root/relative`, creating parent directories
pub fn write_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}
