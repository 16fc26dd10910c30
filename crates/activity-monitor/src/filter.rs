//! Exclusion filter -- containers the monitor must never track.
//!
//! Applied before classification. Matching is a plain, case-sensitive
//! substring test: container patterns against the ID and the display name,
//! image patterns against the image reference.

use std::fmt;

use tracing::debug;

use agentwatch_core::short_id;

/// The rule that excluded a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionRule<'a> {
    /// Matched a container ID / name pattern
    Container(&'a str),
    /// Matched an image pattern
    Image(&'a str),
}

impl fmt::Display for ExclusionRule<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Container(pattern) => write!(f, "container filter '{pattern}'"),
            Self::Image(pattern) => write!(f, "image filter '{pattern}'"),
        }
    }
}

/// Configured exclusion patterns.
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    containers: Vec<String>,
    images: Vec<String>,
}

impl ExclusionFilter {
    /// Creates a filter from container and image patterns.
    pub fn new(containers: Vec<String>, images: Vec<String>) -> Self {
        Self { containers, images }
    }

    /// True when no pattern is configured.
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty() && self.images.is_empty()
    }

    /// Returns the first rule matching the container, without logging.
    pub fn matching_rule(&self, id: &str, name: &str, image: &str) -> Option<ExclusionRule<'_>> {
        if let Some(pattern) = self
            .containers
            .iter()
            .find(|p| name.contains(p.as_str()) || id.contains(p.as_str()))
        {
            return Some(ExclusionRule::Container(pattern));
        }

        self.images
            .iter()
            .find(|p| image.contains(p.as_str()))
            .map(|p| ExclusionRule::Image(p))
    }

    /// Whether the container is excluded; logs the rule that matched.
    pub fn is_excluded(&self, id: &str, name: &str, image: &str) -> bool {
        match self.matching_rule(id, name, image) {
            Some(rule) => {
                debug!(
                    container_id = short_id(id),
                    container_name = name,
                    rule = %rule,
                    "container excluded"
                );
                true
            }
            None => false,
        }
    }
}
