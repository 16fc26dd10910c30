//! CLI argument definitions for the `agentwatch` binary.
//!
//! Uses `clap` v4 derive macros. Flags are the highest-precedence
//! configuration layer: defaults < file < environment < flags.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use agentwatch_core::config::AgentwatchConfig;

/// Build-agent activity monitor for ECS container hosts.
///
/// Watches Docker for CI build-agent containers and tells ECS whether this
/// host is busy, so an active host is not scaled in.
#[derive(Parser, Debug, Default)]
#[command(name = "agentwatch")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to an agentwatch.toml configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// ECS cluster name.
    #[arg(long)]
    pub cluster: Option<String>,

    /// Heartbeat interval in seconds [default: 30].
    #[arg(long, value_name = "SECS")]
    pub heartbeat: Option<u64>,

    /// Report activity to ECS.
    #[arg(long)]
    pub enable_ecs: bool,

    /// Only watch Docker; never contact ECS.
    #[arg(long)]
    pub monitor_only: bool,

    /// Debug logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Container ID or name substring to ignore (repeatable).
    #[arg(long = "exclude-container", value_name = "PATTERN")]
    pub exclude_containers: Vec<String>,

    /// Image substring to ignore (repeatable).
    #[arg(long = "exclude-image", value_name = "PATTERN")]
    pub exclude_images: Vec<String>,

    /// Validate the configuration and exit.
    #[arg(long)]
    pub validate: bool,
}

impl DaemonCli {
    /// Loads, overrides and validates the effective configuration.
    ///
    /// Without `--config` the defaults are used as the base layer.
    pub async fn resolve_config(&self) -> Result<AgentwatchConfig> {
        let mut config = match &self.config {
            Some(path) => read_config_file(path).await?,
            None => AgentwatchConfig::default(),
        };
        config.apply_env_overrides();
        self.apply_to(&mut config);
        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    /// Applies the flags on top of `config`.
    pub fn apply_to(&self, config: &mut AgentwatchConfig) {
        if let Some(cluster) = &self.cluster {
            config.notifier.cluster = cluster.clone();
        }
        if let Some(secs) = self.heartbeat {
            config.notifier.heartbeat_interval_secs = secs;
        }
        if self.enable_ecs {
            config.notifier.enabled = true;
        }
        if self.monitor_only {
            config.notifier.enabled = false;
        }

        if self.verbose {
            config.general.log_level = "debug".to_owned();
        }
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }

        config
            .monitor
            .exclude_containers
            .extend(self.exclude_containers.iter().cloned());
        config
            .monitor
            .exclude_images
            .extend(self.exclude_images.iter().cloned());
    }
}

async fn read_config_file(path: &Path) -> Result<AgentwatchConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    AgentwatchConfig::parse(&content)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}
