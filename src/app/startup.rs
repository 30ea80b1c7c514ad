//! Application startup: arguments, configuration, logging, wiring

use super::cli::args::{Args, Command, DemoArgs};
use super::cli::config::{Config, ConfigError};
use super::demo::{run_scenario, DemoOptions, DemoReport};
use crate::broker::api::{BrokerError, BrokerServices};
use crate::core::error_handling::{log_error_with_context, ContextualError};
use crate::core::logging::{init_logging, level_for_verbosity};
use crate::core::shutdown::ShutdownCoordinator;
use crate::core::version;
use crate::hybrid::api::{HybridBroker, JsonLinesSink, SecondarySink, SinkError};
use clap::Parser;
use colored::Colorize;
use std::io::IsTerminal;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Exit code for bad arguments or configuration
pub const EXIT_USAGE: i32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}

impl ContextualError for StartupError {
    fn is_user_actionable(&self) -> bool {
        match self {
            StartupError::Config(e) => e.is_user_actionable(),
            StartupError::Broker(e) => e.is_user_actionable(),
            StartupError::Sink(e) => e.is_user_actionable(),
            StartupError::Output(_) => false,
        }
    }

    fn user_message(&self) -> Option<String> {
        match self {
            StartupError::Config(e) => e.user_message(),
            StartupError::Broker(e) => e.user_message(),
            StartupError::Sink(e) => e.user_message(),
            StartupError::Output(_) => None,
        }
    }
}

/// Run the application; returns the process exit code
pub async fn startup() -> i32 {
    let args = Args::parse();

    let config = match load_config(&args).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_USAGE;
        }
    };

    let color = resolve_color(config.logging.color);
    colored::control::set_override(color);

    let level = level_for_verbosity(
        config.logging.level.as_deref().unwrap_or("info"),
        args.verbosity(),
    );
    let log_file = config
        .logging
        .file
        .as_ref()
        .map(|path| path.to_string_lossy().into_owned());
    if let Err(e) = init_logging(
        Some(&level),
        config.logging.format.as_deref(),
        log_file.as_deref(),
        color,
    ) {
        eprintln!("Error: failed to initialise logging: {}", e);
        return EXIT_USAGE;
    }

    log::info!(
        "topicbroker {} starting (commit {}, built {})",
        env!("CARGO_PKG_VERSION"),
        version::git_hash(),
        version::build_time()
    );
    log::debug!("Configuration: {:?}", config);

    let command = args.command();
    match ShutdownCoordinator::guard(|shutdown| run(command, config, shutdown)).await {
        Ok(()) => 0,
        Err(e) => {
            log_error_with_context(&e, "Running topicbroker");
            1
        }
    }
}

async fn load_config(args: &Args) -> Result<Config, ConfigError> {
    let mut config = Config::load(args.config_file.as_deref()).await?;
    config.apply_args(args);
    config.validate()?;
    Ok(config)
}

/// Explicit choice first, then NO_COLOR, then whether stdout is a terminal
fn resolve_color(choice: Option<bool>) -> bool {
    choice.unwrap_or_else(|| {
        std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
    })
}

async fn run(
    command: Command,
    config: Config,
    shutdown: broadcast::Receiver<()>,
) -> Result<(), StartupError> {
    let services = BrokerServices::new(config.broker_settings());
    let sink = open_sink(&config).await?;
    let hybrid = HybridBroker::new(Arc::clone(services.broker()), sink, config.queue_mode);

    match command {
        Command::Status => {
            println!("{}", serde_json::to_string_pretty(&hybrid.status())?);
            Ok(())
        }
        Command::Demo(demo) => {
            let result = run_scenario(&services, &hybrid, &demo_options(&demo), shutdown).await;
            // Nothing may keep polling once the scenario has returned
            services.broker().stop_all_consumers().await;
            print_report(&result?);
            Ok(())
        }
    }
}

async fn open_sink(config: &Config) -> Result<Option<Arc<dyn SecondarySink>>, SinkError> {
    match config.sink_path() {
        Some(path) => {
            let sink: Arc<dyn SecondarySink> = Arc::new(JsonLinesSink::open(path).await?);
            Ok(Some(sink))
        }
        None => Ok(None),
    }
}

fn demo_options(demo: &DemoArgs) -> DemoOptions {
    DemoOptions {
        group: demo.group.clone(),
        warmup: demo.warmup(),
        publish_gap: demo.publish_gap(),
        drain: demo.drain(),
        keep: demo.keep,
    }
}

fn print_report(report: &DemoReport) {
    println!("{}", format!("Demo ({})", report.mode).bold());
    for step in &report.steps {
        println!("  {} {}", "✓".green(), step);
    }

    if !report.deliveries.is_empty() {
        println!();
        println!("{}", "Deliveries".bold());
        for (consumer, contents) in &report.deliveries {
            println!("  {} {}", format!("{:<16}", consumer).cyan(), contents.join(", "));
        }
    }

    let summary = format!(
        "{} of {} published messages delivered in memory",
        report.delivered(),
        report.published
    );
    println!();
    if report.interrupted {
        println!("{}", summary.yellow());
    } else {
        println!("{}", summary);
    }
}
