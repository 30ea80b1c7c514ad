//! Tests for the CLI module
//!
//! Argument parsing and configuration file handling.

mod config_tests;
