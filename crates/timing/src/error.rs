//! Error types for timing operations

use thiserror::Error;

/// Errors raised by the ambient surfaces of the crate
///
/// The wrappers themselves never fail once constructed.
#[derive(Debug, Error)]
pub enum TimingError {
    /// Millisecond value is NaN, infinite, or negative
    #[error("invalid duration: {0} ms (expected a finite, non-negative number)")]
    InvalidDuration(f64),

    /// No Tokio runtime is available to host timers
    #[error("no Tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    /// The frame source has been shut down
    #[error("frame source has been shut down")]
    SourceShutdown,
}
