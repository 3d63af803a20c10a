//! Timing control for callbacks on a cooperative event loop
//!
//! This crate provides:
//! - Debouncing (trailing call after a quiet period)
//! - Throttling (immediate leading call, chained trailing call)
//! - Repeat-on-frame driven by a pluggable frame source
//! - Validated async delays
//!
//! Every wrapper owns its own state; two wrappers never share a timer.
//! The wrappers are meant for a `current_thread` Tokio runtime, where
//! calls made within the same scheduler turn are observed in order.

pub mod config;
pub mod debounce;
pub mod delay;
pub mod error;
pub mod frame;
pub mod repeat;
pub mod throttle;

use std::time::Duration;

// Re-exports
pub use config::TimingConfig;
pub use debounce::{debounce, Debounce};
pub use delay::{delay, delay_default, parse_millis};
pub use error::TimingError;
pub use frame::{
    FrameCallback, FrameRequestId, FrameSource, FrameTime, IntervalFrameSource,
    ManualFrameSource,
};
pub use repeat::{repeat, Repeat, RepeatState};
pub use throttle::{throttle, Throttle};

/// Result type for timing operations
pub type Result<T> = std::result::Result<T, TimingError>;

/// Default delay for debounce and throttle, and default repeat interval
pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);
