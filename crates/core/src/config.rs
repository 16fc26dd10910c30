//! Configuration -- `agentwatch.toml` parsing and runtime settings
//!
//! [`AgentwatchConfig`] is the top-level structure; each component reads only
//! its own section.
//!
//! # Loading precedence
//! 1. CLI flags (highest, applied by the daemon)
//! 2. Environment variables (`AGENTWATCH_NOTIFIER_CLUSTER=build-fleet`)
//! 3. Configuration file (`agentwatch.toml`)
//! 4. Defaults (`Default` impls)
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), agentwatch_core::error::AgentwatchError> {
//! use agentwatch_core::config::AgentwatchConfig;
//!
//! // file + environment overrides
//! let config = AgentwatchConfig::load("agentwatch.toml").await?;
//!
//! // straight from a TOML string
//! let config = AgentwatchConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AgentwatchError, ConfigError};

/// Upper bounds for numeric settings.
const MAX_CHANNEL_CAPACITY: usize = 10_000;
const MAX_EVENT_LOOKBACK_SECS: u64 = 3600;
const MAX_HEARTBEAT_INTERVAL_SECS: u64 = 3600;

/// Region used when neither the config nor the environment names one.
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Complete agentwatch configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentwatchConfig {
    /// Logging
    #[serde(default)]
    pub general: GeneralConfig,
    /// Activity monitor
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Lifecycle notifier
    #[serde(default)]
    pub notifier: NotifierConfig,
}

impl AgentwatchConfig {
    /// Loads a TOML file, applies environment overrides and validates.
    ///
    /// Validation runs once, after the overrides, so the environment can
    /// complete or correct file values.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, AgentwatchError> {
        let mut config = Self::read_file(path.as_ref()).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file without environment overrides.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, AgentwatchError> {
        let config = Self::read_file(path.as_ref()).await?;
        config.validate()?;
        Ok(config)
    }

    async fn read_file(path: &Path) -> Result<Self, AgentwatchError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AgentwatchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                AgentwatchError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// Parses a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, AgentwatchError> {
        toml::from_str(toml_str).map_err(|e| {
            AgentwatchError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Overrides values from environment variables.
    ///
    /// Naming: `AGENTWATCH_{SECTION}_{FIELD}`, lists as comma separated values.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "AGENTWATCH_GENERAL_LOG_LEVEL");
        override_string(
            &mut self.general.log_format,
            "AGENTWATCH_GENERAL_LOG_FORMAT",
        );

        // Monitor
        override_string(
            &mut self.monitor.docker_socket,
            "AGENTWATCH_MONITOR_DOCKER_SOCKET",
        );
        override_csv(
            &mut self.monitor.exclude_containers,
            "AGENTWATCH_MONITOR_EXCLUDE_CONTAINERS",
        );
        override_csv(
            &mut self.monitor.exclude_images,
            "AGENTWATCH_MONITOR_EXCLUDE_IMAGES",
        );
        override_usize(
            &mut self.monitor.channel_capacity,
            "AGENTWATCH_MONITOR_CHANNEL_CAPACITY",
        );
        override_u64(
            &mut self.monitor.event_lookback_secs,
            "AGENTWATCH_MONITOR_EVENT_LOOKBACK_SECS",
        );

        // Notifier
        override_bool(&mut self.notifier.enabled, "AGENTWATCH_NOTIFIER_ENABLED");
        override_string(&mut self.notifier.cluster, "AGENTWATCH_NOTIFIER_CLUSTER");
        override_u64(
            &mut self.notifier.heartbeat_interval_secs,
            "AGENTWATCH_NOTIFIER_HEARTBEAT_INTERVAL_SECS",
        );
        override_string(&mut self.notifier.region, "AGENTWATCH_NOTIFIER_REGION");
    }

    /// Validates all sections.
    pub fn validate(&self) -> Result<(), AgentwatchError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.monitor.channel_capacity == 0
            || self.monitor.channel_capacity > MAX_CHANNEL_CAPACITY
        {
            return Err(invalid(
                "monitor.channel_capacity",
                format!("must be 1-{MAX_CHANNEL_CAPACITY}"),
            ));
        }

        if self.monitor.event_lookback_secs > MAX_EVENT_LOOKBACK_SECS {
            return Err(invalid(
                "monitor.event_lookback_secs",
                format!("must be 0-{MAX_EVENT_LOOKBACK_SECS}"),
            ));
        }

        // an empty substring matches every container
        if self.monitor.exclude_containers.iter().any(|s| s.is_empty()) {
            return Err(invalid(
                "monitor.exclude_containers",
                "patterns must not be empty".to_owned(),
            ));
        }
        if self.monitor.exclude_images.iter().any(|s| s.is_empty()) {
            return Err(invalid(
                "monitor.exclude_images",
                "patterns must not be empty".to_owned(),
            ));
        }

        if self.notifier.heartbeat_interval_secs == 0
            || self.notifier.heartbeat_interval_secs > MAX_HEARTBEAT_INTERVAL_SECS
        {
            return Err(invalid(
                "notifier.heartbeat_interval_secs",
                format!("must be 1-{MAX_HEARTBEAT_INTERVAL_SECS}"),
            ));
        }

        if self.notifier.enabled && self.notifier.cluster.is_empty() {
            return Err(invalid(
                "notifier.cluster",
                "cluster must not be empty when the notifier is enabled".to_owned(),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> AgentwatchError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// trace, debug, info, warn, error
    pub log_level: String,
    /// json, pretty
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// Activity monitor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Docker socket path; empty means the platform's local defaults
    pub docker_socket: String,
    /// Substrings of container IDs or names to ignore
    pub exclude_containers: Vec<String>,
    /// Substrings of image references to ignore
    pub exclude_images: Vec<String>,
    /// Capacity of the bounded activity channel
    pub channel_capacity: usize,
    /// How far in the past the event subscription starts (seconds)
    pub event_lookback_secs: u64,
}

impl Default for MonitorConfig {
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

/// Lifecycle notifier settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Push activity to the cluster control plane
    pub enabled: bool,
    /// Cluster name
    pub cluster: String,
    /// Heartbeat period (seconds)
    pub heartbeat_interval_secs: u64,
    /// AWS region; empty falls back to the environment
    pub region: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cluster: String::new(),
            heartbeat_interval_secs: 30,
            region: String::new(),
        }
    }
}

impl NotifierConfig {
    /// Resolves the AWS region for the control-plane client.
    ///
    /// Order: configured value, `AWS_REGION`, `AWS_DEFAULT_REGION`,
    /// [`DEFAULT_AWS_REGION`].
    pub fn resolve_region(&self) -> String {
        if !self.region.is_empty() {
            return self.region.clone();
        }
        ["AWS_REGION", "AWS_DEFAULT_REGION"]
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .find(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_AWS_REGION.to_owned())
    }
}

// --- environment override helpers ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
