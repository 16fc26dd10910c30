//! Configuration resolution through the CLI layer
//!
//! file -> environment -> flags -> validation.

use std::io::Write;

use clap::Parser;
use serial_test::serial;

use agentwatch_daemon::cli::DaemonCli;

const ENV_VARS: &[&str] = &[
    "AGENTWATCH_GENERAL_LOG_LEVEL",
    "AGENTWATCH_NOTIFIER_ENABLED",
    "AGENTWATCH_NOTIFIER_CLUSTER",
    "AGENTWATCH_NOTIFIER_HEARTBEAT_INTERVAL_SECS",
    "AGENTWATCH_MONITOR_EXCLUDE_IMAGES",
];

fn clear_env() {
    for var in ENV_VARS {
        // SAFETY: tests touching the environment are serialized.
        unsafe { std::env::remove_var(var) };
    }
}

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("should create temp file");
    file.write_all(content.as_bytes())
        .expect("should write config");
    file
}

fn cli(args: &[&str]) -> DaemonCli {
    DaemonCli::try_parse_from(std::iter::once("agentwatch").chain(args.iter().copied()))
        .expect("arguments should parse")
}

#[tokio::test]
#[serial]
async fn without_file_defaults_apply() {
    clear_env();
    let config = cli(&[]).resolve_config().await.unwrap();
    assert!(!config.notifier.enabled);
    assert_eq!(config.notifier.heartbeat_interval_secs, 30);
    assert_eq!(config.monitor.channel_capacity, 100);
}

#[tokio::test]
#[serial]
async fn file_values_are_loaded() {
    clear_env();
    let file = write_config(
        r#"
[notifier]
enabled = true
cluster = "azure-builds"
heartbeat_interval_secs = 45

[monitor]
exclude_images = ["datadog/agent"]
"#,
    );
    let path = file.path().to_str().unwrap();

    let config = cli(&["--config", path]).resolve_config().await.unwrap();
    assert!(config.notifier.enabled);
    assert_eq!(config.notifier.cluster, "azure-builds");
    assert_eq!(config.notifier.heartbeat_interval_secs, 45);
    assert_eq!(config.monitor.exclude_images, vec!["datadog/agent"]);
}

#[tokio::test]
#[serial]
async fn flags_override_environment_and_file() {
    clear_env();
    let file = write_config(
        r#"
[notifier]
cluster = "from-file"
heartbeat_interval_secs = 45
"#,
    );
    let path = file.path().to_str().unwrap();

    // SAFETY: serialized test.
    unsafe {
        std::env::set_var("AGENTWATCH_NOTIFIER_CLUSTER", "from-env");
        std::env::set_var("AGENTWATCH_NOTIFIER_HEARTBEAT_INTERVAL_SECS", "20");
    }

    let config = cli(&["--config", path, "--heartbeat", "5"])
        .resolve_config()
        .await
        .unwrap();
    clear_env();

    assert_eq!(config.notifier.cluster, "from-env");
    assert_eq!(config.notifier.heartbeat_interval_secs, 5);
}

#[tokio::test]
#[serial]
async fn monitor_only_overrides_enabled_file() {
    clear_env();
    let file = write_config("[notifier]\nenabled = true\n");
    let path = file.path().to_str().unwrap();

    // enabled without a cluster would fail validation
    let err = cli(&["--config", path]).resolve_config().await.unwrap_err();
    assert!(format!("{err:#}").contains("cluster"));

    let config = cli(&["--config", path, "--monitor-only"])
        .resolve_config()
        .await
        .unwrap();
    assert!(!config.notifier.enabled);
}

#[tokio::test]
#[serial]
async fn missing_file_is_an_error() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = cli(&["--config", path.to_str().unwrap()])
        .resolve_config()
        .await
        .unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));
}

#[tokio::test]
#[serial]
async fn malformed_file_is_an_error() {
    clear_env();
    let file = write_config("[notifier\nenabled = ");
    let path = file.path().to_str().unwrap();

    let err = cli(&["--config", path]).resolve_config().await.unwrap_err();
    assert!(err.to_string().contains("failed to parse config file"));
}

#[tokio::test]
#[serial]
async fn invalid_flag_values_fail_validation() {
    clear_env();
    let err = cli(&["--log-format", "xml"])
        .resolve_config()
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("log_format"));

    let err = cli(&["--heartbeat", "0"]).resolve_config().await.unwrap_err();
    assert!(format!("{err:#}").contains("heartbeat_interval_secs"));
}
