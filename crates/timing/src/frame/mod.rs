//! Frame tick sources
//!
//! A [`FrameSource`] runs one-shot callbacks on the next frame tick, the way
//! a browser's `requestAnimationFrame` does. Two sources are provided:
//! - [`IntervalFrameSource`]: fixed-rate fallback driven by a Tokio interval
//! - [`ManualFrameSource`]: ticked explicitly by the host render loop

mod interval;
mod manual;

pub use interval::{IntervalFrameSource, DEFAULT_FRAME_PERIOD};
pub use manual::ManualFrameSource;

use crate::Result;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tokio::time::Instant;
use tracing::error;

/// Frame timing snapshot passed to frame callbacks
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameTime {
    /// Monotonic timestamp taken at the tick
    pub now: Instant,

    /// Monotonic frame counter, starting at 0
    pub frame_index: u64,
}

/// Identifier of an outstanding frame request
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameRequestId(u64);

impl FrameRequestId {
    /// Raw numeric value
    pub fn get(self) -> u64 {
        self.0
    }
}

/// One-shot callback run on a frame tick
pub type FrameCallback = Box<dyn FnOnce(FrameTime) + Send>;

/// Source of frame ticks
///
/// A request runs once, on the next tick. Requests made while a tick is
/// running are deferred to the following tick.
pub trait FrameSource: Send + Sync + 'static {
    /// Schedule `callback` for the next tick
    ///
    /// Fails once the source has been shut down.
    fn request_frame(&self, callback: FrameCallback) -> Result<FrameRequestId>;

    /// Drop a pending request
    ///
    /// Unknown or already-run ids are ignored.
    fn cancel_frame(&self, id: FrameRequestId);
}

/// Pending callbacks shared by the frame source implementations
#[derive(Default)]
pub(crate) struct FrameQueue {
    next_id: u64,
    frame_index: u64,
    callbacks: Vec<(FrameRequestId, FrameCallback)>,
}

impl FrameQueue {
    pub(crate) fn push(&mut self, callback: FrameCallback) -> FrameRequestId {
        let id = FrameRequestId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.callbacks.push((id, callback));
        id
    }

    pub(crate) fn cancel(&mut self, id: FrameRequestId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(pending, _)| *pending != id);
        self.callbacks.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Remove every pending callback without running it
    pub(crate) fn drain(&mut self) -> Vec<FrameCallback> {
        std::mem::take(&mut self.callbacks)
            .into_iter()
            .map(|(_, callback)| callback)
            .collect()
    }

    /// Take every callback queued so far and stamp the frame
    pub(crate) fn take_frame(&mut self, now: Instant) -> (FrameTime, Vec<FrameCallback>) {
        let frame = FrameTime {
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);

        (frame, self.drain())
    }
}

/// Run every callback of a frame, returning the first panic payload
///
/// A panicking callback does not prevent the rest of the frame from running.
pub(crate) fn run_frame(
    frame: FrameTime,
    callbacks: Vec<FrameCallback>,
) -> Option<Box<dyn Any + Send>> {
    let mut first_panic = None;

    for callback in callbacks {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(move || callback(frame))) {
            error!(
                "frame callback panicked on frame {}: {}",
                frame.frame_index,
                panic_message(payload.as_ref())
            );
            first_panic.get_or_insert(payload);
        }
    }

    first_panic
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
