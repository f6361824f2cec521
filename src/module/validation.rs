//! Manifest validation
//!
//! Checks module manifests for structure before they are turned into
//! declarations: name format, version format, and well-formed, non-overlapping
//! capability lists.

use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::module::manifest::ModuleManifest;
use crate::registry::name::QualifiedName;

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Manifest is valid
    Valid,
    /// Manifest is invalid with specific errors
    Invalid(Vec<String>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

/// Manifest validator
pub struct ManifestValidator {
    /// Maximum module name length
    max_name_len: usize,
}

impl ManifestValidator {
    /// Create a new manifest validator
    pub fn new() -> Self {
        Self { max_name_len: 64 }
    }

    /// Validate a module manifest; `fallback_name` is the module's directory name
    pub fn validate(&self, manifest: &ModuleManifest, fallback_name: &str) -> ValidationResult {
        let mut errors = Vec::new();
        let name = manifest.module_name().unwrap_or(fallback_name);

        if !self.is_valid_name(name) {
            errors.push(format!(
                "Invalid module name: {} (must be alphanumeric with dashes/underscores)",
                name
            ));
        }

        if let Some(version) = &manifest.version {
            if !self.is_valid_version(version) {
                errors.push(format!(
                    "Invalid version format: {} (expected semantic versioning)",
                    version
                ));
            }
        }

        if manifest.entry_point(fallback_name).trim().is_empty() {
            errors.push("Entry point cannot be empty".to_string());
        }

        if let Some(plugin) = &manifest.plugin {
            let provides = self.check_names("provides", &plugin.provides, &mut errors);
            let consumes = self.check_names("consumes", &plugin.consumes, &mut errors);
            let extends = self.check_names("extends", &plugin.extends, &mut errors);

            for name in provides.intersection(&extends) {
                errors.push(format!("{} is both provided and extended", name));
            }
            for name in provides.intersection(&consumes) {
                errors.push(format!("{} is both provided and consumed", name));
            }
        }

        if errors.is_empty() {
            debug!("Manifest validation passed for module: {}", name);
            ValidationResult::Valid
        } else {
            warn!("Manifest validation failed for module {}: {:?}", name, errors);
            ValidationResult::Invalid(errors)
        }
    }

    /// Parse one capability list, recording malformed and duplicated names
    fn check_names(
        &self,
        field: &str,
        names: &[String],
        errors: &mut Vec<String>,
    ) -> BTreeSet<QualifiedName> {
        let mut seen = BTreeSet::new();
        for raw in names {
            match raw.parse::<QualifiedName>() {
                Ok(name) => {
                    if !seen.insert(name) {
                        errors.push(format!("Duplicate entry in {}: {}", field, raw));
                    }
                }
                Err(e) => errors.push(format!("Invalid entry in {}: {}", field, e)),
            }
        }
        seen
    }

    /// Validate module name format
    #[inline]
    fn is_valid_name(&self, name: &str) -> bool {
        if name.is_empty() || name.len() > self.max_name_len {
            return false;
        }

        // Must start with alphanumeric
        if !name.chars().next().is_some_and(|c| c.is_alphanumeric()) {
            return false;
        }

        name.chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    }

    /// Validate version format (semantic versioning)
    ///
    /// Accepts: major.minor[.patch][-prerelease][+build]
    #[inline]
    fn is_valid_version(&self, version: &str) -> bool {
        let base = version.split_once('+').map_or(version, |(base, _)| base);
        let version_part = base.split_once('-').map_or(base, |(part, _)| part);

        let nums: Vec<&str> = version_part.split('.').collect();
        if nums.len() < 2 || nums.len() > 3 {
            return false;
        }

        nums.iter().all(|n| {
            !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()) && n.parse::<u32>().is_ok()
        })
    }
}

impl Default for ManifestValidator {
    fn default() -> Self {
        Self::new()
    }
}
