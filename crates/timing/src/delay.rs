//! Validated async delays

use crate::{Result, TimingError};
use std::time::Duration;

/// Default duration used by [`delay_default`]
pub const DEFAULT_DELAY_MS: f64 = 1000.0;

/// Convert a millisecond count into a `Duration`
///
/// Fractional milliseconds are kept. NaN, infinite and negative values are
/// rejected.
pub fn parse_millis(ms: f64) -> Result<Duration> {
    if !ms.is_finite() || ms < 0.0 {
        return Err(TimingError::InvalidDuration(ms));
    }
    Ok(Duration::from_secs_f64(ms / 1000.0))
}

/// Suspend the current task for `ms` milliseconds
pub async fn delay(ms: f64) -> Result<()> {
    let duration = parse_millis(ms)?;
    tokio::time::sleep(duration).await;
    Ok(())
}

/// Suspend the current task for one second
pub async fn delay_default() -> Result<()> {
    delay(DEFAULT_DELAY_MS).await
}
