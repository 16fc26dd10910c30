//! Container runtime domain types.
//!
//! These are the runtime-agnostic shapes the monitor works with. The runtime
//! client translates its own API models into them.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One entry of the running-container enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSummary {
    /// Full container ID
    pub id: String,
    /// Display name without the leading `/`
    pub name: String,
    /// Image reference as reported by the runtime
    pub image: String,
}

impl fmt::Display for ContainerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) image={}", self.name, crate::short_id(&self.id), self.image)
    }
}

/// Full declared configuration of one container, as returned by inspect.
///
/// Event payloads carry neither labels nor environment, so classification
/// always works from this type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDetails {
    /// Full container ID
    pub id: String,
    /// Display name without the leading `/`
    pub name: String,
    /// Configured image reference
    pub image: String,
    /// Environment entries in `KEY=value` form
    pub env: Vec<String>,
    /// Container labels
    pub labels: HashMap<String, String>,
}

impl ContainerDetails {
    /// Creates details with no environment and no labels.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        image: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            image: image.into(),
            ..Self::default()
        }
    }

    /// Adds an environment entry.
    pub fn with_env(mut self, entry: impl Into<String>) -> Self {
        self.env.push(entry.into());
        self
    }

    /// Adds a label.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Returns the enumeration view of these details.
    pub fn summary(&self) -> ContainerSummary {
        ContainerSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            image: self.image.clone(),
        }
    }
}
