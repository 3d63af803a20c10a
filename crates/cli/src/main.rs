//! Cadence CLI - cadence command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;
mod system_config;
mod util;

/// Cadence - replay call schedules against debounce, throttle and repeat
#[derive(Parser)]
#[command(name = "cadence")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: $CADENCE_CONFIG or <config dir>/cadence/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a wrapper on a virtual clock and print when the callback runs
    #[command(subcommand)]
    Simulate(SimulateCommands),
    /// View and edit configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum SimulateCommands {
    /// Trailing call after a quiet period
    Debounce {
        /// Quiet period in ms (default: from config)
        #[arg(long)]
        delay: Option<u64>,
        /// Call times in ms, comma separated and non-decreasing
        #[arg(long, value_delimiter = ',', required = true)]
        calls: Vec<u64>,
        /// Stop the simulation at this time in ms
        #[arg(long)]
        until: Option<u64>,
    },
    /// Leading call, then the last deferred call per window
    Throttle {
        /// Window length in ms (default: from config)
        #[arg(long)]
        delay: Option<u64>,
        /// Call times in ms, comma separated and non-decreasing
        #[arg(long, value_delimiter = ',', required = true)]
        calls: Vec<u64>,
        /// Stop the simulation at this time in ms
        #[arg(long)]
        until: Option<u64>,
    },
    /// Frame-gated repetition
    Repeat {
        /// Minimum spacing between fires in ms (default: from config)
        #[arg(long)]
        interval: Option<u64>,
        /// Frame period in ms (default: from config)
        #[arg(long)]
        frame: Option<f64>,
        /// Stop the simulation at this time in ms
        #[arg(long)]
        until: u64,
        /// Cancel the subscription at this time in ms
        #[arg(long)]
        cancel_at: Option<u64>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all configuration values
    List,
    /// Print a single value
    Get {
        /// Key, e.g. throttle.delay_ms
        key: String,
    },
    /// Set a single value
    Set {
        /// Key, e.g. throttle.delay_ms
        key: String,
        /// New value
        value: String,
    },
    /// Show the config file path
    Path {
        /// Create the file with defaults if missing
        #[arg(long)]
        create: bool,
    },
    /// Print an example configuration
    Example,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config_path = system_config::resolve_path(cli.config.as_deref())?;

    match cli.command {
        Commands::Simulate(simulate_cmd) => {
            let config = system_config::load(&config_path)?;
            match simulate_cmd {
                SimulateCommands::Debounce { delay, calls, until } => {
                    cmd::simulate::run_debounce(&config, delay, &calls, until)
                }
                SimulateCommands::Throttle { delay, calls, until } => {
                    cmd::simulate::run_throttle(&config, delay, &calls, until)
                }
                SimulateCommands::Repeat { interval, frame, until, cancel_at } => {
                    cmd::simulate::run_repeat(&config, interval, frame, until, cancel_at)
                }
            }
        }
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list(&config_path),
            ConfigCommands::Get { key } => cmd::config::run_get(&config_path, &key),
            ConfigCommands::Set { key, value } => cmd::config::run_set(&config_path, &key, &value),
            ConfigCommands::Path { create } => cmd::config::run_path(&config_path, create),
            ConfigCommands::Example => cmd::config::run_example(),
        },
    }
}
