//! CLI Integration Test Modules

pub mod demo;
pub mod status;

use std::process::{Command, Output};

pub fn run_topicbroker(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_topicbroker"))
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to run topicbroker")
}
