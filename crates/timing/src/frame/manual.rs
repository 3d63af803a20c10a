//! Host-driven frame source
//!
//! For applications that own a render loop: call [`ManualFrameSource::tick`]
//! once per presented frame and queued callbacks run on the caller's stack.

use super::{run_frame, FrameCallback, FrameQueue, FrameRequestId, FrameSource};
use crate::{Result, TimingError};
use parking_lot::Mutex;
use std::panic::resume_unwind;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::Instant;

/// Frame source ticked by the host
#[derive(Default)]
pub struct ManualFrameSource {
    queue: Mutex<FrameQueue>,
    shutdown: AtomicBool,
}

impl ManualFrameSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one frame stamped with the current time
    ///
    /// Returns the number of callbacks that ran.
    pub fn tick(&self) -> usize {
        self.tick_at(Instant::now())
    }

    /// Run one frame stamped with `now`
    ///
    /// Callbacks requested while the frame runs wait for the next tick.
    /// Every callback runs even if an earlier one panics; the first panic
    /// is resumed once the frame is complete.
    pub fn tick_at(&self, now: Instant) -> usize {
        let (frame, callbacks) = self.queue.lock().take_frame(now);
        let count = callbacks.len();

        if let Some(payload) = run_frame(frame, callbacks) {
            resume_unwind(payload);
        }

        count
    }

    /// Number of callbacks waiting for the next tick
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Drop every pending callback and refuse new requests
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let dropped = self.queue.lock().drain();
        drop(dropped);
    }
}

impl FrameSource for ManualFrameSource {
    fn request_frame(&self, callback: FrameCallback) -> Result<FrameRequestId> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(TimingError::SourceShutdown);
        }
        Ok(self.queue.lock().push(callback))
    }

    fn cancel_frame(&self, id: FrameRequestId) {
        self.queue.lock().cancel(id);
    }
}

impl std::fmt::Debug for ManualFrameSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualFrameSource")
            .field("pending", &self.pending())
            .finish()
    }
}
