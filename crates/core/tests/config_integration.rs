//! agentwatch.toml integration tests
//!
//! - parsing the shipped example
//! - partial configs
//! - environment precedence
//! - malformed input

use std::io::Write;

use agentwatch_core::config::{AgentwatchConfig, DEFAULT_AWS_REGION, NotifierConfig};
use agentwatch_core::error::{AgentwatchError, ConfigError};

// =============================================================================
// agentwatch.toml.example
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../agentwatch.toml.example");
    let config = AgentwatchConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../agentwatch.toml.example");
    let config = AgentwatchConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_matches_code_defaults() {
    let content = include_str!("../../../agentwatch.toml.example");
    let example = AgentwatchConfig::parse(content).expect("should parse");
    let defaults = AgentwatchConfig::default();

    assert_eq!(example.monitor.docker_socket, defaults.monitor.docker_socket);
    assert_eq!(
        example.monitor.channel_capacity,
        defaults.monitor.channel_capacity
    );
    assert_eq!(
        example.monitor.event_lookback_secs,
        defaults.monitor.event_lookback_secs
    );
    assert_eq!(example.notifier.enabled, defaults.notifier.enabled);
    assert_eq!(
        example.notifier.heartbeat_interval_secs,
        defaults.notifier.heartbeat_interval_secs
    );
}

// =============================================================================
// partial configs
// =============================================================================

#[test]
fn partial_config_monitor_only() {
    let toml = r#"
[monitor]
exclude_images = ["amazon/amazon-ecs-agent", "datadog/agent"]
"#;
    let config = AgentwatchConfig::parse(toml).expect("should parse");
    assert_eq!(config.monitor.exclude_images.len(), 2);
    assert_eq!(config.monitor.channel_capacity, 100);
    assert!(!config.notifier.enabled);
}

#[test]
fn partial_config_notifier_only() {
    let toml = r#"
[notifier]
enabled = true
cluster = "azure-build-agents"
"#;
    let config = AgentwatchConfig::parse(toml).expect("should parse");
    config.validate().expect("should validate");
    assert_eq!(config.notifier.cluster, "azure-build-agents");
    assert_eq!(config.general.log_level, "info");
}

// =============================================================================
// environment precedence
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let toml = r#"
[notifier]
cluster = "from-file"
"#;

    let original = std::env::var("AGENTWATCH_NOTIFIER_CLUSTER").ok();
    // SAFETY: serialized with serial_test.
    unsafe {
        std::env::set_var("AGENTWATCH_NOTIFIER_CLUSTER", "from-env");
    }

    let mut config = AgentwatchConfig::parse(toml).expect("should parse");
    config.apply_env_overrides();
    let result = config.notifier.cluster.clone();

    // SAFETY: cleanup
    unsafe {
        match original {
            Some(val) => std::env::set_var("AGENTWATCH_NOTIFIER_CLUSTER", val),
            None => std::env::remove_var("AGENTWATCH_NOTIFIER_CLUSTER"),
        }
    }

    assert_eq!(result, "from-env");
}

#[test]
#[serial_test::serial]
fn env_override_csv_for_exclusion_lists() {
    let original = std::env::var("AGENTWATCH_MONITOR_EXCLUDE_CONTAINERS").ok();
    // SAFETY: serialized with serial_test.
    unsafe {
        std::env::set_var("AGENTWATCH_MONITOR_EXCLUDE_CONTAINERS", "ecs-agent, watchtower");
    }

    let mut config = AgentwatchConfig::default();
    config.apply_env_overrides();
    let result = config.monitor.exclude_containers.clone();

    // SAFETY: cleanup
    unsafe {
        match original {
            Some(val) => std::env::set_var("AGENTWATCH_MONITOR_EXCLUDE_CONTAINERS", val),
            None => std::env::remove_var("AGENTWATCH_MONITOR_EXCLUDE_CONTAINERS"),
        }
    }

    assert_eq!(result, vec!["ecs-agent", "watchtower"]);
}

#[test]
#[serial_test::serial]
fn env_override_invalid_number_keeps_toml_value() {
    let toml = r#"
[notifier]
heartbeat_interval_secs = 45
"#;
    let original = std::env::var("AGENTWATCH_NOTIFIER_HEARTBEAT_INTERVAL_SECS").ok();
    // SAFETY: serialized with serial_test.
    unsafe {
        std::env::set_var("AGENTWATCH_NOTIFIER_HEARTBEAT_INTERVAL_SECS", "soon");
    }

    let mut config = AgentwatchConfig::parse(toml).expect("should parse");
    config.apply_env_overrides();
    let result = config.notifier.heartbeat_interval_secs;

    // SAFETY: cleanup
    unsafe {
        match original {
            Some(val) => std::env::set_var("AGENTWATCH_NOTIFIER_HEARTBEAT_INTERVAL_SECS", val),
            None => std::env::remove_var("AGENTWATCH_NOTIFIER_HEARTBEAT_INTERVAL_SECS"),
        }
    }

    assert_eq!(result, 45);
}

#[test]
#[serial_test::serial]
fn region_falls_back_through_environment() {
    let saved_region = std::env::var("AWS_REGION").ok();
    let saved_default = std::env::var("AWS_DEFAULT_REGION").ok();
    let config = NotifierConfig::default();

    // SAFETY: serialized with serial_test.
    unsafe {
        std::env::remove_var("AWS_REGION");
        std::env::remove_var("AWS_DEFAULT_REGION");
    }
    let fallback = config.resolve_region();

    unsafe { std::env::set_var("AWS_DEFAULT_REGION", "eu-central-1") };
    let from_default = config.resolve_region();

    unsafe { std::env::set_var("AWS_REGION", "us-west-2") };
    let from_region = config.resolve_region();

    // SAFETY: cleanup
    unsafe {
        match saved_region {
            Some(val) => std::env::set_var("AWS_REGION", val),
            None => std::env::remove_var("AWS_REGION"),
        }
        match saved_default {
            Some(val) => std::env::set_var("AWS_DEFAULT_REGION", val),
            None => std::env::remove_var("AWS_DEFAULT_REGION"),
        }
    }

    assert_eq!(fallback, DEFAULT_AWS_REGION);
    assert_eq!(from_default, "eu-central-1");
    assert_eq!(from_region, "us-west-2");
}

// =============================================================================
// malformed input
// =============================================================================

#[test]
fn comments_only_parses_with_defaults() {
    let config = AgentwatchConfig::parse("# nothing here\n# still nothing\n").expect("should parse");
    assert_eq!(config.general.log_level, "info");
}

#[test]
fn wrong_type_for_numeric_field() {
    let toml = r#"
[monitor]
channel_capacity = "lots"
"#;
    assert!(matches!(
        AgentwatchConfig::parse(toml),
        Err(AgentwatchError::Config(ConfigError::ParseFailed { .. }))
    ));
}

#[test]
fn unknown_section_is_ignored() {
    let toml = r#"
[general]
log_level = "debug"

[metrics]
port = 9100
"#;
    let config = AgentwatchConfig::parse(toml).expect("unknown sections are ignored");
    assert_eq!(config.general.log_level, "debug");
}

// =============================================================================
// files on disk
// =============================================================================

#[tokio::test]
async fn from_file_nonexistent_returns_file_not_found() {
    let result = AgentwatchConfig::from_file("/tmp/agentwatch_test_nonexistent_12345.toml").await;
    assert!(matches!(
        result.unwrap_err(),
        AgentwatchError::Config(ConfigError::FileNotFound { .. })
    ));
}

#[tokio::test]
async fn from_file_reads_and_validates() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        "[notifier]\nenabled = true\ncluster = \"ci\"\nheartbeat_interval_secs = 10"
    )
    .expect("write");

    let config = AgentwatchConfig::from_file(file.path())
        .await
        .expect("should load");
    assert_eq!(config.notifier.cluster, "ci");
    assert_eq!(config.notifier.heartbeat_interval_secs, 10);
}

#[tokio::test]
async fn from_file_rejects_invalid_values() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[notifier]\nenabled = true").expect("write");

    let result = AgentwatchConfig::from_file(file.path()).await;
    assert!(matches!(
        result.unwrap_err(),
        AgentwatchError::Config(ConfigError::InvalidValue { .. })
    ));
}

#[tokio::test]
#[serial_test::serial]
async fn load_lets_environment_complete_file_values() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[notifier]\nenabled = true").expect("write");

    let original = std::env::var("AGENTWATCH_NOTIFIER_CLUSTER").ok();
    // SAFETY: serialized with serial_test.
    unsafe { std::env::set_var("AGENTWATCH_NOTIFIER_CLUSTER", "ci") };

    let result = AgentwatchConfig::load(file.path()).await;

    // SAFETY: serialized with serial_test.
    unsafe {
        match original {
            Some(val) => std::env::set_var("AGENTWATCH_NOTIFIER_CLUSTER", val),
            None => std::env::remove_var("AGENTWATCH_NOTIFIER_CLUSTER"),
        }
    }

    let config = result.expect("environment should supply the cluster");
    assert!(config.notifier.enabled);
    assert_eq!(config.notifier.cluster, "ci");
}

#[tokio::test]
#[serial_test::serial]
async fn load_validates_after_overrides() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[notifier]\nheartbeat_interval_secs = 10").expect("write");

    let original = std::env::var("AGENTWATCH_NOTIFIER_HEARTBEAT_INTERVAL_SECS").ok();
    // SAFETY: serialized with serial_test.
    unsafe { std::env::set_var("AGENTWATCH_NOTIFIER_HEARTBEAT_INTERVAL_SECS", "0") };

    let result = AgentwatchConfig::load(file.path()).await;

    // SAFETY: serialized with serial_test.
    unsafe {
        match original {
            Some(val) => std::env::set_var("AGENTWATCH_NOTIFIER_HEARTBEAT_INTERVAL_SECS", val),
            None => std::env::remove_var("AGENTWATCH_NOTIFIER_HEARTBEAT_INTERVAL_SECS"),
        }
    }

    assert!(matches!(
        result.unwrap_err(),
        AgentwatchError::Config(ConfigError::InvalidValue { .. })
    ));
}
