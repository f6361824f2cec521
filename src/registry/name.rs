//! Qualified service names (`container.service`)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `(container, service)` pair, serialized as `container.service`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QualifiedName {
    container: String,
    service: String,
}

impl QualifiedName {
    pub fn new(container: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            service: service.into(),
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn service(&self) -> &str {
        &self.service
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.container, self.service)
    }
}

/// Rejected qualified name text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid qualified name '{0}' (expected container.service)")]
pub struct InvalidQualifiedName(pub String);

impl FromStr for QualifiedName {
    type Err = InvalidQualifiedName;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        match trimmed.split_once('.') {
            Some((container, service)) if !container.is_empty() && !service.is_empty() => {
                Ok(Self::new(container, service))
            }
            _ => Err(InvalidQualifiedName(value.to_string())),
        }
    }
}

impl TryFrom<String> for QualifiedName {
    type Error = InvalidQualifiedName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QualifiedName> for String {
    fn from(name: QualifiedName) -> Self {
        name.to_string()
    }
}
