//! Application layer: the `topicbroker` binary's driver

pub mod cli;
pub mod demo;
pub mod startup;
