//! Timing configuration
//!
//! Defaults for the wrappers, loadable from TOML:
//!
//! ```toml
//! [debounce]
//! delay_ms = 500
//!
//! [throttle]
//! delay_ms = 500
//!
//! [repeat]
//! interval_ms = 500
//! frame_period_ms = 16.667
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use crate::delay::parse_millis;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Largest accepted delay or interval (one hour)
pub const MAX_DELAY_MS: u64 = 3_600_000;

/// Accepted frame period range, in milliseconds
pub const FRAME_PERIOD_RANGE_MS: (f64, f64) = (1.0, 1000.0);

/// Combined configuration for all wrappers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default)]
    pub debounce: DebounceConfig,

    #[serde(default)]
    pub throttle: ThrottleConfig,

    #[serde(default)]
    pub repeat: RepeatConfig,
}

/// Debounce settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebounceConfig {
    /// Quiet period before the trailing call (default: 500)
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

/// Throttle settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Window length (default: 500)
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

/// Repeat settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatConfig {
    /// Minimum spacing between fires (default: 500)
    #[serde(default = "default_delay_ms")]
    pub interval_ms: u64,

    /// Tick period of the fallback frame source (default: 16.667, 60 Hz)
    #[serde(default = "default_frame_period_ms")]
    pub frame_period_ms: f64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
        }
    }
}

impl Default for RepeatConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_delay_ms(),
            frame_period_ms: default_frame_period_ms(),
        }
    }
}

fn default_delay_ms() -> u64 {
    500
}

fn default_frame_period_ms() -> f64 {
    16.667
}

impl TimingConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("Failed to parse timing config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Write configuration to a TOML file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let text = toml::to_string_pretty(self).context("Failed to serialize timing config")?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write config file {}", path.display()))
    }

    /// Check every value is in range
    pub fn validate(&self) -> Result<()> {
        check_delay("debounce.delay_ms", self.debounce.delay_ms)?;
        check_delay("throttle.delay_ms", self.throttle.delay_ms)?;
        check_delay("repeat.interval_ms", self.repeat.interval_ms)?;

        check_frame_period(self.repeat.frame_period_ms).context("repeat.frame_period_ms")?;

        Ok(())
    }

    /// Debounce quiet period
    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce.delay_ms)
    }

    /// Throttle window length
    pub fn throttle_delay(&self) -> Duration {
        Duration::from_millis(self.throttle.delay_ms)
    }

    /// Repeat interval
    pub fn repeat_interval(&self) -> Duration {
        Duration::from_millis(self.repeat.interval_ms)
    }

    /// Fallback frame period
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(self.repeat.frame_period_ms / 1000.0)
    }
}

fn check_delay(key: &str, value: u64) -> Result<()> {
    if value > MAX_DELAY_MS {
        anyhow::bail!("{} must be at most {} (got {})", key, MAX_DELAY_MS, value);
    }
    Ok(())
}

/// Validate a frame period in milliseconds against [`FRAME_PERIOD_RANGE_MS`]
pub fn check_frame_period(ms: f64) -> Result<Duration> {
    let period = parse_millis(ms)?;

    let (min, max) = FRAME_PERIOD_RANGE_MS;
    if !(min..=max).contains(&ms) {
        anyhow::bail!("frame period must be between {} and {} ms (got {})", min, max, ms);
    }

    Ok(period)
}

/// Commented example configuration
pub fn example_config() -> &'static str {
    r#"# Cadence timing configuration

[debounce]
# Quiet period before the trailing call (0-3600000 ms)
delay_ms = 500

[throttle]
# Window length; the leading call runs immediately (0-3600000 ms)
delay_ms = 500

[repeat]
# Minimum spacing between fires (0-3600000 ms)
interval_ms = 500
# Tick period of the fallback frame source (1-1000 ms)
frame_period_ms = 16.667
"#
}
