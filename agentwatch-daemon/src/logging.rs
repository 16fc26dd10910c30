//! Logging initialization for the agentwatch daemon.
//!
//! Configures `tracing-subscriber` from the `[general]` section. `RUST_LOG`
//! takes precedence over the configured level.

use anyhow::{Context, Result, bail};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use agentwatch_core::config::GeneralConfig;

/// Dependencies whose debug output drowns ours.
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "aws_smithy_runtime", "aws_config"];

/// Builds the filter: `RUST_LOG` if set, else `level` with chatty
/// dependencies capped at `info`.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives = QUIET_TARGETS
            .iter()
            .fold(level.to_owned(), |acc, target| format!("{acc},{target}=info"));
        EnvFilter::new(directives)
    })
}

/// Initialize the global tracing subscriber.
///
/// Must be called once, before any component starts.
///
/// # Formats
///
/// * `"json"` - JSON lines (default)
/// * `"pretty"` - human-readable output
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(build_filter(&config.log_level));

    let result = match config.log_format.as_str() {
        "json" => registry.with(fmt::layer().json()).try_init(),
        "pretty" => registry.with(fmt::layer().pretty()).try_init(),
        other => bail!("unknown log format '{other}', expected 'json' or 'pretty'"),
    };

    result.context("failed to initialize tracing subscriber")
}
