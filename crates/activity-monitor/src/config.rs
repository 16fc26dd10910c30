//! Activity monitor configuration
//!
//! [`ActivityMonitorConfig`] is derived from the core
//! [`MonitorConfig`](agentwatch_core::config::MonitorConfig) section.
//!
//! # Example
//! ```ignore
//! use agentwatch_core::config::AgentwatchConfig;
//! use agentwatch_monitor::config::ActivityMonitorConfig;
//!
//! let core_config = AgentwatchConfig::default();
//! let config = ActivityMonitorConfig::from_core(&core_config.monitor);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::MonitorError;
use crate::filter::ExclusionFilter;

const MAX_CHANNEL_CAPACITY: usize = 10_000;
const MAX_EVENT_LOOKBACK_SECS: u64 = 3600;

/// Activity monitor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityMonitorConfig {
    /// Docker socket path; empty means local defaults
    pub docker_socket: String,
    /// Container ID / name substrings to ignore
    pub exclude_containers: Vec<String>,
    /// Image substrings to ignore
    pub exclude_images: Vec<String>,
    /// Bounded activity channel capacity
    pub channel_capacity: usize,
    /// Event subscription lookback (seconds)
    pub event_lookback_secs: u64,
}

impl Default for ActivityMonitorConfig {
    fn default() -> Self {
        Self {
            docker_socket: String::new(),
            exclude_containers: Vec::new(),
            exclude_images: Vec::new(),
            channel_capacity: 100,
            event_lookback_secs: 60,
        }
    }
}

impl ActivityMonitorConfig {
    /// Builds the monitor settings from the core `[monitor]` section.
    pub fn from_core(core: &agentwatch_core::config::MonitorConfig) -> Self {
        Self {
            docker_socket: core.docker_socket.clone(),
            exclude_containers: core.exclude_containers.clone(),
            exclude_images: core.exclude_images.clone(),
            channel_capacity: core.channel_capacity,
            event_lookback_secs: core.event_lookback_secs,
        }
    }

    /// Validates the settings.
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.channel_capacity == 0 || self.channel_capacity > MAX_CHANNEL_CAPACITY {
            return Err(MonitorError::Config {
                field: "channel_capacity".to_owned(),
                reason: format!("must be 1-{MAX_CHANNEL_CAPACITY}"),
            });
        }

        if self.event_lookback_secs > MAX_EVENT_LOOKBACK_SECS {
            return Err(MonitorError::Config {
                field: "event_lookback_secs".to_owned(),
                reason: format!("must be 0-{MAX_EVENT_LOOKBACK_SECS}"),
            });
        }

        if self.exclude_containers.iter().any(|s| s.is_empty()) {
            return Err(MonitorError::Config {
                field: "exclude_containers".to_owned(),
                reason: "patterns must not be empty".to_owned(),
            });
        }

        if self.exclude_images.iter().any(|s| s.is_empty()) {
            return Err(MonitorError::Config {
                field: "exclude_images".to_owned(),
                reason: "patterns must not be empty".to_owned(),
            });
        }

        Ok(())
    }

    /// Subscription lookback as a duration.
    pub fn event_lookback(&self) -> Duration {
        Duration::from_secs(self.event_lookback_secs)
    }

    /// Exclusion filter built from the configured patterns.
    pub fn exclusion_filter(&self) -> ExclusionFilter {
        ExclusionFilter::new(self.exclude_containers.clone(), self.exclude_images.clone())
    }
}

/// Builder for [`ActivityMonitorConfig`]
#[derive(Default)]
pub struct ActivityMonitorConfigBuilder {
    config: ActivityMonitorConfig,
}

impl ActivityMonitorConfigBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the Docker socket path.
    pub fn docker_socket(mut self, socket: impl Into<String>) -> Self {
        self.config.docker_socket = socket.into();
        self
    }

    /// Adds a container ID / name exclusion.
    pub fn exclude_container(mut self, pattern: impl Into<String>) -> Self {
        self.config.exclude_containers.push(pattern.into());
        self
    }

    /// Adds an image exclusion.
    pub fn exclude_image(mut self, pattern: impl Into<String>) -> Self {
        self.config.exclude_images.push(pattern.into());
        self
    }

    /// Sets the activity channel capacity.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// Sets the event subscription lookback (seconds).
    pub fn event_lookback_secs(mut self, secs: u64) -> Self {
        self.config.event_lookback_secs = secs;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<ActivityMonitorConfig, MonitorError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
