//! Tests for configuration file loading and merging

use crate::app::cli::args::Args;
use crate::app::cli::config::*;
use crate::hybrid::api::QueueMode;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn from_toml(contents: &str) -> Result<Config, ConfigError> {
    Config::from_toml_str(contents, Path::new("test.toml"))
}

#[test]
fn test_empty_file_yields_defaults() {
    let config = from_toml("").unwrap();

    assert_eq!(config, Config::default());
    assert_eq!(config.queue_mode, QueueMode::in_memory());
    assert_eq!(config.broker_settings().poll_interval, Duration::from_millis(100));
    assert_eq!(config.broker_settings().stop_timeout, Duration::from_secs(5));
    assert!(config.validate().is_ok());
}

#[test]
fn test_full_file() {
    let config = from_toml(
        r#"
        [queue-mode]
        use-in-memory = true
        use-secondary = true
        enable-hybrid = true

        [secondary-sink]
        enabled = true
        path = "/tmp/messages.jsonl"

        [broker]
        poll-interval-ms = 20
        stop-timeout-ms = 750

        [logging]
        level = "debug"
        format = "ext"
        color = false
        "#,
    )
    .unwrap();

    assert!(config.queue_mode.is_hybrid());
    assert_eq!(config.sink_path(), Some(Path::new("/tmp/messages.jsonl")));
    assert_eq!(config.broker_settings().poll_interval, Duration::from_millis(20));
    assert_eq!(config.broker_settings().stop_timeout, Duration::from_millis(750));
    assert_eq!(config.logging.level.as_deref(), Some("debug"));
    assert_eq!(config.logging.color, Some(false));
    assert!(config.validate().is_ok());
}

#[test]
fn test_unknown_keys_are_rejected() {
    let result = from_toml("[broker]\npoll-interval = 5\n");
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

#[test]
fn test_cli_overrides_file() {
    let mut config = from_toml(
        r#"
        [broker]
        poll-interval-ms = 20

        [logging]
        level = "warn"
        file = "/tmp/broker.log"
        "#,
    )
    .unwrap();

    let args = Args::try_parse_from([
        "topicbroker",
        "--mode",
        "secondary",
        "--sink-file",
        "out.jsonl",
        "--poll-interval-ms",
        "5",
        "--log-level",
        "trace",
        "--log-file",
        "none",
        "--no-color",
    ])
    .unwrap();
    config.apply_args(&args);

    assert_eq!(config.queue_mode, QueueMode::secondary_only());
    assert!(config.secondary_sink.enabled);
    assert_eq!(config.sink_path(), Some(Path::new("out.jsonl")));
    assert_eq!(config.broker.poll_interval_ms, 5);
    assert_eq!(config.logging.level.as_deref(), Some("trace"));
    assert_eq!(config.logging.file, None);
    assert_eq!(config.logging.color, Some(false));
    assert!(config.validate().is_ok());
}

#[test]
fn test_secondary_mode_requires_sink() {
    let config = from_toml("[queue-mode]\nuse-secondary = true\n").unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    let config = from_toml("[secondary-sink]\nenabled = true\n").unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_sink_unused_in_memory_mode() {
    let config = from_toml("[secondary-sink]\nenabled = true\npath = \"x.jsonl\"\n").unwrap();
    assert_eq!(config.sink_path(), None);
}

#[test]
fn test_zero_poll_interval_is_invalid() {
    let config = from_toml("[broker]\npoll-interval-ms = 0\n").unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_zero_stop_timeout_is_invalid() {
    let config = from_toml("[broker]\nstop-timeout-ms = 0\n").unwrap();
    match config.validate() {
        Err(ConfigError::Invalid(message)) => assert!(message.contains("stop-timeout-ms")),
        other => panic!("expected an invalid config, got {:?}", other),
    }
}

#[test]
fn test_unknown_log_format_is_invalid() {
    let config = from_toml("[logging]\nformat = \"xml\"\n").unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[tokio::test]
async fn test_load_explicit_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("topicbroker.toml");
    tokio::fs::write(&path, "[broker]\nstop-timeout-ms = 100\n")
        .await
        .unwrap();

    let config = Config::load(Some(path.as_path())).await.unwrap();
    assert_eq!(config.broker.stop_timeout_ms, 100);
}

#[tokio::test]
async fn test_missing_explicit_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path: PathBuf = dir.path().join("absent.toml");

    let result = Config::load(Some(path.as_path())).await;
    assert!(matches!(result, Err(ConfigError::Io { .. })));
}

#[test]
fn test_default_path_names_the_application() {
    if let Some(path) = Config::default_path() {
        assert!(path.ends_with("topicbroker/topicbroker.toml"));
    }
}
