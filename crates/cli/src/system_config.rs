//! Config file location and loading

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use timing::TimingConfig;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "CADENCE_CONFIG";

/// Pick the config file: explicit flag, then $CADENCE_CONFIG, then the
/// platform config directory
pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }

    let base = dirs::config_dir().context("Could not determine config directory")?;
    Ok(base.join("cadence").join("config.toml"))
}

/// Load configuration, falling back to defaults when the file is missing
pub fn load(path: &Path) -> Result<TimingConfig> {
    if !path.exists() {
        tracing::debug!("No config file at {}, using defaults", path.display());
        return Ok(TimingConfig::default());
    }
    TimingConfig::load(path)
}

/// Save configuration
pub fn save(path: &Path, config: &TimingConfig) -> Result<()> {
    config.save(path)
}

/// Create the config file with defaults if it does not exist
///
/// Returns whether a file was created.
pub fn init_if_missing(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, timing::config::example_config())
        .with_context(|| format!("Failed to write config file {}", path.display()))?;
    Ok(true)
}
