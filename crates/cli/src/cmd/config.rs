//! Configuration management command
//!
//! Provides CLI interface to view and edit timing defaults.

use crate::system_config;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;
use timing::config::{FRAME_PERIOD_RANGE_MS, MAX_DELAY_MS};

/// List all configuration values
pub fn run_list(config_path: &Path) -> Result<()> {
    let config = system_config::load(config_path)?;

    println!("{}", "Timing Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), config_path.display().dimmed());

    println!("{}", "[debounce]".yellow());
    println!("  {} = {}", "delay_ms".cyan(), config.debounce.delay_ms);

    println!("\n{}", "[throttle]".yellow());
    println!("  {} = {}", "delay_ms".cyan(), config.throttle.delay_ms);

    println!("\n{}", "[repeat]".yellow());
    println!("  {} = {}", "interval_ms".cyan(), config.repeat.interval_ms);
    println!(
        "  {} = {} {}",
        "frame_period_ms".cyan(),
        config.repeat.frame_period_ms,
        format!("(~{:.0} Hz)", 1000.0 / config.repeat.frame_period_ms).dimmed()
    );

    println!("\n{}", "Valid Ranges:".bold());
    println!("  delay_ms, interval_ms: 0-{}", MAX_DELAY_MS);
    println!(
        "  frame_period_ms: {}-{}",
        FRAME_PERIOD_RANGE_MS.0, FRAME_PERIOD_RANGE_MS.1
    );

    Ok(())
}

/// Get a single configuration value
pub fn run_get(config_path: &Path, key: &str) -> Result<()> {
    let config = system_config::load(config_path)?;

    let value = match key {
        "debounce.delay_ms" => config.debounce.delay_ms.to_string(),
        "throttle.delay_ms" => config.throttle.delay_ms.to_string(),
        "repeat.interval_ms" => config.repeat.interval_ms.to_string(),
        "repeat.frame_period_ms" => config.repeat.frame_period_ms.to_string(),
        _ => anyhow::bail!(
            "Unknown config key: {}. Use 'cadence config list' to see available keys.",
            key
        ),
    };

    println!("{}", value);
    Ok(())
}

/// Set a configuration value
pub fn run_set(config_path: &Path, key: &str, value: &str) -> Result<()> {
    let mut config = system_config::load(config_path)?;

    match key {
        "debounce.delay_ms" => {
            config.debounce.delay_ms = value
                .parse()
                .context("Invalid value: must be a non-negative integer")?;
        }
        "throttle.delay_ms" => {
            config.throttle.delay_ms = value
                .parse()
                .context("Invalid value: must be a non-negative integer")?;
        }
        "repeat.interval_ms" => {
            config.repeat.interval_ms = value
                .parse()
                .context("Invalid value: must be a non-negative integer")?;
        }
        "repeat.frame_period_ms" => {
            config.repeat.frame_period_ms = value
                .parse()
                .context("Invalid value: must be a number")?;
        }
        _ => anyhow::bail!(
            "Unknown config key: {}. Use 'cadence config list' to see available keys.",
            key
        ),
    }

    // Validate before saving
    config.validate().context("Invalid configuration value")?;

    system_config::save(config_path, &config)?;

    println!("{} {} = {}", "✓".green(), key.cyan(), value);
    Ok(())
}

/// Show the config file path and optionally create it
pub fn run_path(config_path: &Path, create: bool) -> Result<()> {
    if create && system_config::init_if_missing(config_path)? {
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else if config_path.exists() {
        println!("{}", config_path.display());
    } else {
        println!("{}", config_path.display());
        println!("{}", "File does not exist. Use --create to create it.".yellow());
    }

    Ok(())
}

/// Show example configuration
pub fn run_example() -> Result<()> {
    print!("{}", timing::config::example_config());
    Ok(())
}
