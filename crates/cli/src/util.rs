//! Shared utilities for CLI commands

use anyhow::Result;
use std::time::Duration;

/// Check call times are non-decreasing
pub fn validate_schedule(calls: &[u64]) -> Result<()> {
    if calls.is_empty() {
        anyhow::bail!("At least one call time is required");
    }

    if let Some(pair) = calls.windows(2).find(|pair| pair[1] < pair[0]) {
        anyhow::bail!(
            "Call times must be non-decreasing ({}ms comes after {}ms)",
            pair[1],
            pair[0]
        );
    }

    Ok(())
}

/// Default end of a simulation: long enough for a trailing call and the
/// window it re-arms to close
pub fn default_until(calls: &[u64], delay: Duration) -> u64 {
    let last = calls.last().copied().unwrap_or(0);
    let delay_ms = delay.as_millis() as u64;
    last.saturating_add(delay_ms.saturating_mul(2)).saturating_add(1)
}

/// Format a duration as whole milliseconds, or with three decimals when fractional
pub fn format_ms(duration: Duration) -> String {
    if duration.subsec_nanos() % 1_000_000 == 0 {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.3}ms", duration.as_secs_f64() * 1000.0)
    }
}
