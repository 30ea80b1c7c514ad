//! `status` subcommand tests

use super::run_topicbroker;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_status_prints_mode_as_json() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("topicbroker.toml");
    fs::write(&config, "").unwrap();

    let output = run_topicbroker(&[
        "--config-file",
        config.to_str().unwrap(),
        "--log-level",
        "off",
        "status",
    ]);
    assert!(output.status.success());

    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["mode"], "In-Memory Only");
    assert_eq!(status["use_secondary"], false);
}

#[test]
fn test_status_in_hybrid_mode_opens_sink() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("topicbroker.toml");
    let sink = dir.path().join("messages.jsonl");
    fs::write(&config, "").unwrap();

    let output = run_topicbroker(&[
        "--config-file",
        config.to_str().unwrap(),
        "--log-level",
        "off",
        "--mode",
        "hybrid",
        "--sink-file",
        sink.to_str().unwrap(),
        "status",
    ]);
    assert!(output.status.success());

    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["mode"], "Hybrid (In-Memory + Secondary)");
    assert_eq!(status["secondary_sink"], "jsonl");
    assert!(sink.exists());
}

#[test]
fn test_secondary_mode_without_sink_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("topicbroker.toml");
    fs::write(&config, "").unwrap();

    let output = run_topicbroker(&[
        "--config-file",
        config.to_str().unwrap(),
        "--mode",
        "secondary",
        "status",
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("needs a secondary sink"));
}

#[test]
fn test_missing_config_file_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");

    let output = run_topicbroker(&["--config-file", missing.to_str().unwrap(), "status"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Cannot read configuration file"));
}
