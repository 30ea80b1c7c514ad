//! Command-line arguments and the configuration file

pub mod args;
pub mod config;

#[cfg(test)]
mod tests;
