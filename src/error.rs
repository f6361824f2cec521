//! Wiring error taxonomy
//!
//! Every failure during graph building, scheduling, activation or a runtime
//! lookup surfaces as a [`WiringError`]. None of them are retried.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::registry::name::QualifiedName;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, WiringError>;

/// Which export contract rule a module broke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractViolationKind {
    /// Module exported services while declaring neither `provides` nor `extends`
    ExportWithoutDeclaration,
    /// Exported a name not in `provides ∪ extends`
    UndeclaredExport,
    /// Declared a name the export tree never produced
    MissingExport,
    /// `extends` target does not exist in the registry
    ExtendTargetMissing,
    /// Tried to define one of the protected operation names
    ProtectedName,
}

impl fmt::Display for ContractViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::ExportWithoutDeclaration => "unable to export services without declaring them",
            Self::UndeclaredExport => "undeclared export",
            Self::MissingExport => "missing export",
            Self::ExtendTargetMissing => "extend target missing",
            Self::ProtectedName => "protected name",
        };
        f.write_str(text)
    }
}

/// Wiring engine errors
#[derive(Debug, Error)]
pub enum WiringError {
    #[error("Invalid manifest {path:?}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    #[error("Module not found: {module} ({reason})")]
    ModuleNotFound { module: String, reason: String },

    #[error("{name} is already defined: provided by both '{first}' and '{second}'")]
    Conflict {
        name: QualifiedName,
        first: String,
        second: String,
    },

    #[error("Module '{module}' is declared more than once")]
    DuplicateModule { module: String },

    #[error("Module '{module}' requires {name}, which no module provides")]
    Dependency { module: String, name: QualifiedName },

    #[error("Circular dependency detected: {}", .cycle.join(" -> "))]
    Cycle { cycle: Vec<String> },

    #[error("Contract violation in {origin}: {kind}: {}", .names.join(", "))]
    ContractViolation {
        origin: String,
        kind: ContractViolationKind,
        names: Vec<String>,
    },

    #[error("Undefined {what}: {name}")]
    NotFound { what: &'static str, name: String },

    #[error("Module '{module}' failed to activate: {source}")]
    Activation {
        module: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Operation '{operation}' failed on service '{service}': {source}")]
    Operation {
        service: String,
        operation: String,
        #[source]
        source: anyhow::Error,
    },
}

impl WiringError {
    /// Contract violation raised while activating `module`
    pub fn module_contract(
        module: &str,
        kind: ContractViolationKind,
        names: impl IntoIterator<Item = impl ToString>,
    ) -> Self {
        Self::ContractViolation {
            origin: format!("module '{module}'"),
            kind,
            names: names.into_iter().map(|n| n.to_string()).collect(),
        }
    }

    /// Contract violation raised directly against a registered service
    pub fn service_contract(
        service: &QualifiedName,
        kind: ContractViolationKind,
        names: impl IntoIterator<Item = impl ToString>,
    ) -> Self {
        Self::ContractViolation {
            origin: format!("service '{service}'"),
            kind,
            names: names.into_iter().map(|n| n.to_string()).collect(),
        }
    }

    /// Shorthand for a manifest error
    pub fn manifest(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Manifest {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Contract rule broken, if this is a contract violation
    pub fn contract_kind(&self) -> Option<ContractViolationKind> {
        match self {
            Self::ContractViolation { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
