//! Command-line arguments
//!
//! Every option here can also be set in the configuration file; values given
//! on the command line win.

use crate::hybrid::api::QueueMode;
use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DEMO_WARMUP_MS: u64 = 500;
pub const DEFAULT_DEMO_PUBLISH_GAP_MS: u64 = 200;
pub const DEFAULT_DEMO_DRAIN_MS: u64 = 1000;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "topicbroker")]
#[command(about = "In-process topic broker with round-robin consumer groups")]
#[command(version)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Force colored output
    #[arg(long = "color", action = ArgAction::SetTrue, overrides_with = "no_color")]
    pub color: bool,

    /// Disable colored output
    #[arg(long = "no-color", action = ArgAction::SetTrue, overrides_with = "color")]
    pub no_color: bool,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(short = 'f', long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    /// More log output (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Less log output (repeatable)
    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    /// Where published messages go
    #[arg(short = 'm', long = "mode", value_enum, value_name = "MODE")]
    pub mode: Option<ModeArg>,

    /// Secondary sink file (JSON lines); enables the sink
    #[arg(short = 's', long = "sink-file", value_name = "FILE")]
    pub sink_file: Option<PathBuf>,

    /// Consumer poll interval in milliseconds
    #[arg(long = "poll-interval-ms", value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Args {
    /// Net verbosity: each -v raises, each -q lowers the log level by one
    pub fn verbosity(&self) -> i8 {
        let verbose = i8::try_from(self.verbose).unwrap_or(i8::MAX);
        let quiet = i8::try_from(self.quiet).unwrap_or(i8::MAX);
        verbose.saturating_sub(quiet)
    }

    /// `Some(true)` for --color, `Some(false)` for --no-color
    pub fn color_choice(&self) -> Option<bool> {
        match (self.color, self.no_color) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }

    /// The subcommand to run; `demo` when none is given
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Demo(DemoArgs::default()))
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the demo scenario (default)
    Demo(DemoArgs),
    /// Print the configured queue mode as JSON and exit
    Status,
}

#[derive(ClapArgs, Debug, Clone, PartialEq, Eq)]
pub struct DemoArgs {
    /// Put every demo consumer into this consumer group
    #[arg(short = 'g', long = "group", value_name = "NAME")]
    pub group: Option<String>,

    /// Pause after starting consumers, in milliseconds
    #[arg(long = "warmup-ms", value_name = "MS", default_value_t = DEFAULT_DEMO_WARMUP_MS)]
    pub warmup_ms: u64,

    /// Pause between two publishes, in milliseconds
    #[arg(long = "publish-gap-ms", value_name = "MS", default_value_t = DEFAULT_DEMO_PUBLISH_GAP_MS)]
    pub publish_gap_ms: u64,

    /// Time left for consumers to drain the topics, in milliseconds
    #[arg(long = "drain-ms", value_name = "MS", default_value_t = DEFAULT_DEMO_DRAIN_MS)]
    pub drain_ms: u64,

    /// Keep demo entities instead of deleting them afterwards
    #[arg(long = "keep")]
    pub keep: bool,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            group: None,
            warmup_ms: DEFAULT_DEMO_WARMUP_MS,
            publish_gap_ms: DEFAULT_DEMO_PUBLISH_GAP_MS,
            drain_ms: DEFAULT_DEMO_DRAIN_MS,
            keep: false,
        }
    }
}

impl DemoArgs {
    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }

    pub fn publish_gap(&self) -> Duration {
        Duration::from_millis(self.publish_gap_ms)
    }

    pub fn drain(&self) -> Duration {
        Duration::from_millis(self.drain_ms)
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    /// In-memory queues only
    InMemory,
    /// Secondary sink only
    Secondary,
    /// In-memory queues and the secondary sink
    Hybrid,
}

impl From<ModeArg> for QueueMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::InMemory => QueueMode::in_memory(),
            ModeArg::Secondary => QueueMode::secondary_only(),
            ModeArg::Hybrid => QueueMode::hybrid(),
        }
    }
}
