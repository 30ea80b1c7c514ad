//! `demo` subcommand tests

use super::run_topicbroker;
use std::fs;
use tempfile::TempDir;

const FAST_DEMO: [&str; 7] = [
    "demo",
    "--warmup-ms",
    "50",
    "--publish-gap-ms",
    "10",
    "--drain-ms",
    "500",
];

#[test]
fn test_demo_delivers_every_message() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("topicbroker.toml");
    fs::write(&config, "[broker]\npoll-interval-ms = 10\n").unwrap();

    let mut args = vec!["--config-file", config.to_str().unwrap(), "--log-level", "off"];
    args.extend_from_slice(&FAST_DEMO);
    let output = run_topicbroker(&args);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Demo (In-Memory Only)"));
    assert!(stdout.contains("5 of 5 published messages delivered"));
}

#[test]
fn test_hybrid_demo_writes_sink_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("topicbroker.toml");
    let sink = dir.path().join("messages.jsonl");
    fs::write(&config, "[broker]\npoll-interval-ms = 10\n").unwrap();

    let mut args = vec![
        "--config-file",
        config.to_str().unwrap(),
        "--log-level",
        "off",
        "--mode",
        "hybrid",
        "--sink-file",
        sink.to_str().unwrap(),
    ];
    args.extend_from_slice(&FAST_DEMO);
    let output = run_topicbroker(&args);
    assert!(output.status.success());

    let lines = fs::read_to_string(&sink).unwrap();
    assert_eq!(lines.lines().count(), 5);
}
