//! Command line interface definition

use clap::{Parser, Subcommand, ValueEnum};
use dlmon_types::VictimPolicy;
use std::path::PathBuf;

/// dlmon - Real-time deadlock monitor
#[derive(Parser)]
#[command(name = "dlmon")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Real-time deadlock monitor for simulated processes and resources")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Monitor tick interval in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    pub tick_ms: Option<u64>,

    /// Minimum time between detection scans in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    pub throttle_ms: Option<u64>,

    /// Hand detected cycles to callbacks instead of terminating a victim
    #[arg(long, global = true)]
    pub no_auto_resolve: bool,

    /// Victim selection policy for automatic recovery
    #[arg(long, global = true, value_enum)]
    pub victim_policy: Option<VictimPolicy>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a scenario file against a live monitor
    Run {
        /// Path to the scenario (.toml)
        scenario: PathBuf,
    },

    /// Run one of the built-in scenarios
    Demo {
        /// Scenario to run
        #[arg(value_enum)]
        name: DemoName,
    },

    /// Show the effective configuration
    Config,
}

/// Built-in scenarios
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DemoName {
    /// Two processes trying to swap single-instance resources
    TwoParty,
    /// Three processes waiting on each other in a ring
    Ring,
    /// Several processes competing for multi-instance resources
    Contention,
}
