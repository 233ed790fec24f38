//! dlmon - Real-time deadlock monitor
//!
//! Loads configuration, builds a monitor wired to the event channel, runs a
//! scenario against it and renders the final state.

mod cli;
mod demos;
mod display;
mod error;
mod logging;
mod scenario;

use crate::cli::{Cli, Commands, GlobalArgs};
use crate::display::OutputRenderer;
use crate::error::CliError;
use crate::scenario::{RunReport, Scenario};
use clap::Parser;
use dlmon_config::Config;
use dlmon_events::EventReceiver;
use dlmon_monitor::DeadlockMonitor;
use dlmon_types::OutputFormat;
use std::process;
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting dlmon v{}", env!("CARGO_PKG_VERSION"));

    // defaults < file < environment < flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &cli.global);
    config.validate()?;

    let format = if cli.global.json {
        OutputFormat::Json
    } else {
        config.general.default_output
    };
    let renderer = OutputRenderer::new(format);

    let scenario = match cli.command {
        Commands::Config => {
            renderer.render_config(&config)?;
            return Ok(());
        }
        Commands::Run { scenario } => Scenario::load(&scenario).await?,
        Commands::Demo { name } => demos::scenario(name),
    };

    let (event_sender, event_receiver) = dlmon_events::channel();
    let monitor = DeadlockMonitor::with_events(&config, event_sender);
    let report = run_with_events(monitor, &scenario, event_receiver).await?;

    renderer.render_run(&report)?;
    info!("Scenario completed");
    Ok(())
}

/// Apply flag overrides on top of file and environment configuration
fn apply_cli_config(config: &mut Config, global: &GlobalArgs) {
    if let Some(ms) = global.tick_ms {
        config.monitor.tick_interval_ms = ms;
    }
    if let Some(ms) = global.throttle_ms {
        config.monitor.detection_throttle_ms = ms;
    }
    if global.no_auto_resolve {
        config.monitor.auto_resolve = false;
    }
    if let Some(policy) = global.victim_policy {
        config.monitor.victim_policy = policy;
    }
}

/// Run the scenario while logging events as they arrive
async fn run_with_events(
    monitor: DeadlockMonitor,
    scenario: &Scenario,
    mut event_receiver: EventReceiver,
) -> Result<RunReport, CliError> {
    let mut scenario_future =
        Box::pin(async move { crate::scenario::run(&monitor, scenario).await });

    loop {
        select! {
            result = &mut scenario_future => {
                while let Ok(message) = event_receiver.try_recv() {
                    logging::log_event_with_tracing(&message);
                }
                return result;
            }

            message = event_receiver.recv() => {
                if let Some(message) = message {
                    logging::log_event_with_tracing(&message);
                }
            }
        }
    }
}

/// Initialize tracing. Logs go to stderr so stdout only carries results.
fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;
    let filter = |fallback: &str| {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback))
    };

    if json_mode {
        if debug_enabled {
            tracing_subscriber::fmt()
                .json()
                .with_writer(std::io::stderr)
                .with_env_filter(filter("info,dlmon=debug,dlmon_monitor=debug"))
                .init();
        } else {
            // Keep stdout clean for the JSON document
            tracing_subscriber::fmt()
                .with_writer(std::io::sink)
                .with_env_filter("off")
                .init();
        }
    } else if debug_enabled {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter("info,dlmon=debug,dlmon_monitor=debug"))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter("warn,dlmon=info"))
            .init();
    }
}
