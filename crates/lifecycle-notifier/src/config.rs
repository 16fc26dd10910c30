//! Lifecycle notifier configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use agentwatch_core::config::{DEFAULT_AWS_REGION, NotifierConfig};

use crate::error::NotifierError;

const MAX_HEARTBEAT_INTERVAL_SECS: u64 = 3600;

/// Lifecycle notifier settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleNotifierConfig {
    /// ECS cluster name
    pub cluster: String,
    /// Heartbeat period (seconds)
    pub heartbeat_interval_secs: u64,
    /// Resolved AWS region
    pub region: String,
}

impl Default for LifecycleNotifierConfig {
    fn default() -> Self {
        Self {
            cluster: String::new(),
            heartbeat_interval_secs: 30,
            region: DEFAULT_AWS_REGION.to_owned(),
        }
    }
}

impl LifecycleNotifierConfig {
    /// Builds the notifier settings from the core `[notifier]` section,
    /// resolving the region through the environment fallbacks.
    pub fn from_core(core: &NotifierConfig) -> Self {
        Self {
            cluster: core.cluster.clone(),
            heartbeat_interval_secs: core.heartbeat_interval_secs,
            region: core.resolve_region(),
        }
    }

    /// Validates the settings.
    ///
    /// An empty cluster is accepted here: it only leaves the node identity
    /// unresolved.
    pub fn validate(&self) -> Result<(), NotifierError> {
        if self.heartbeat_interval_secs == 0
            || self.heartbeat_interval_secs > MAX_HEARTBEAT_INTERVAL_SECS
        {
            return Err(NotifierError::Config {
                field: "heartbeat_interval_secs".to_owned(),
                reason: format!("must be 1-{MAX_HEARTBEAT_INTERVAL_SECS}"),
            });
        }

        if self.region.is_empty() {
            return Err(NotifierError::Config {
                field: "region".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        Ok(())
    }

    /// Heartbeat period as a duration.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

/// Builder for [`LifecycleNotifierConfig`]
#[derive(Default)]
pub struct LifecycleNotifierConfigBuilder {
    config: LifecycleNotifierConfig,
}

impl LifecycleNotifierConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cluster(mut self, cluster: impl Into<String>) -> Self {
        self.config.cluster = cluster.into();
        self
    }

    pub fn heartbeat_interval_secs(mut self, secs: u64) -> Self {
        self.config.heartbeat_interval_secs = secs;
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.region = region.into();
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<LifecycleNotifierConfig, NotifierError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
