//! Module activation and export contract enforcement
//!
//! Walks the activation order, hands each factory its imports, and checks the
//! realized export tree against what the module declared before registering
//! anything from it.

use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

use crate::error::{ContractViolationKind, Result, WiringError};
use crate::module::descriptor::{ExportTree, Imports, ModuleDescriptor};
use crate::registry::app::App;
use crate::registry::name::QualifiedName;

/// Activates modules into an [`App`]
pub struct ModuleActivator<'a> {
    app: &'a mut App,
    /// Which module created each service, for conflict reports
    owners: HashMap<QualifiedName, String>,
}

impl<'a> ModuleActivator<'a> {
    pub fn new(app: &'a mut App) -> Self {
        Self {
            app,
            owners: HashMap::new(),
        }
    }

    /// Activate every module of `order`, failing fast on the first error
    pub fn activate_all(&mut self, modules: &[ModuleDescriptor], order: &[String]) -> Result<()> {
        let by_name: HashMap<&str, &ModuleDescriptor> =
            modules.iter().map(|m| (m.name(), m)).collect();
        for name in order {
            let module = by_name
                .get(name.as_str())
                .ok_or_else(|| WiringError::ModuleNotFound {
                    module: name.clone(),
                    reason: "scheduled module has no descriptor".to_string(),
                })?;
            self.activate(module)?;
        }
        Ok(())
    }

    /// Activate a single module
    pub fn activate(&mut self, module: &ModuleDescriptor) -> Result<()> {
        let declaration = &module.declaration;
        debug!("Activating module {}", declaration.name);

        let imports = self.imports_for(module)?;
        let exports = module
            .factory
            .create(&imports)
            .map_err(|source| WiringError::Activation {
                module: declaration.name.clone(),
                source,
            })?;

        if declaration.exports_nothing() {
            if !exports.is_empty() {
                return Err(WiringError::module_contract(
                    &declaration.name,
                    ContractViolationKind::ExportWithoutDeclaration,
                    exports.names(),
                ));
            }
            info!("Module {} activated (no exports)", declaration.name);
            return Ok(());
        }

        self.check_exports(module, &exports)?;

        let mut outstanding: BTreeSet<QualifiedName> = declaration.exports();
        for (name, definition) in exports {
            self.app.register(&name, definition)?;
            if declaration.provides.contains(&name) {
                self.owners.insert(name.clone(), declaration.name.clone());
            }
            debug!("{} exported {}", declaration.name, name);
            outstanding.remove(&name);
        }

        if !outstanding.is_empty() {
            return Err(WiringError::module_contract(
                &declaration.name,
                ContractViolationKind::MissingExport,
                outstanding,
            ));
        }

        info!("Module {} activated", declaration.name);
        Ok(())
    }

    /// Resolve `consumes ∪ extends` against the registry
    fn imports_for(&self, module: &ModuleDescriptor) -> Result<Imports> {
        let mut imports = Imports::new();
        for name in module.declaration.requirements() {
            imports.insert(name, &self.app.service(name)?);
        }
        Ok(imports)
    }

    /// Validate every exported key before anything is registered
    fn check_exports(&self, module: &ModuleDescriptor, exports: &ExportTree) -> Result<()> {
        let declaration = &module.declaration;
        for name in exports.names() {
            if declaration.extends.contains(&name) {
                if !self.app.contains_name(&name) {
                    return Err(WiringError::module_contract(
                        &declaration.name,
                        ContractViolationKind::ExtendTargetMissing,
                        [name],
                    ));
                }
            } else if declaration.provides.contains(&name) {
                if self.app.contains_name(&name) {
                    let first = self
                        .owners
                        .get(&name)
                        .cloned()
                        .unwrap_or_else(|| "<registry>".to_string());
                    return Err(WiringError::Conflict {
                        name,
                        first,
                        second: declaration.name.clone(),
                    });
                }
            } else {
                return Err(WiringError::module_contract(
                    &declaration.name,
                    ContractViolationKind::UndeclaredExport,
                    [name],
                ));
            }
        }

        let mut protected = Vec::new();
        for (name, definition) in exports.iter() {
            for operation in definition.protected_operations() {
                protected.push(format!("{name}#{operation}"));
            }
        }
        if !protected.is_empty() {
            return Err(WiringError::module_contract(
                &declaration.name,
                ContractViolationKind::ProtectedName,
                protected,
            ));
        }
        Ok(())
    }
}
