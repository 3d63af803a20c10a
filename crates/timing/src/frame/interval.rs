//! Fixed-rate frame source
//!
//! Stands in for a display refresh callback on hosts without one. A
//! background task ticks at a fixed period and runs the callbacks queued
//! before the tick. The task parks while nothing is queued.

use super::{run_frame, FrameCallback, FrameQueue, FrameRequestId, FrameSource};
use crate::{Result, TimingError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// Default frame period (60 Hz)
pub const DEFAULT_FRAME_PERIOD: Duration = Duration::from_nanos(16_666_667);

/// Frame source driven by a Tokio interval
///
/// Dropping the source stops its driver task.
pub struct IntervalFrameSource {
    /// State shared with the driver task
    shared: Arc<Shared>,

    /// Tick period
    period: Duration,

    /// Background driver
    driver: JoinHandle<()>,
}

struct Shared {
    queue: Mutex<FrameQueue>,
    wake: Notify,
    shutdown: AtomicBool,
}

impl IntervalFrameSource {
    /// Create a source ticking every `period`
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime, or if `period` is zero.
    pub fn new(period: Duration) -> Self {
        Self::with_handle(&Handle::current(), period)
    }

    /// Like [`IntervalFrameSource::new`], but reports a missing runtime as an error
    pub fn try_new(period: Duration) -> Result<Self> {
        Ok(Self::with_handle(&Handle::try_current()?, period))
    }

    /// Create a 60 Hz source
    pub fn with_default_period() -> Self {
        Self::new(DEFAULT_FRAME_PERIOD)
    }

    /// Create a source whose driver runs on `runtime`
    pub fn with_handle(runtime: &Handle, period: Duration) -> Self {
        assert!(!period.is_zero(), "frame period must be non-zero");

        let shared = Arc::new(Shared {
            queue: Mutex::new(FrameQueue::default()),
            wake: Notify::new(),
            shutdown: AtomicBool::new(false),
        });

        let driver = runtime.spawn(drive(Arc::clone(&shared), period));

        debug!("Started interval frame source (period: {:?})", period);

        Self {
            shared,
            period,
            driver,
        }
    }

    /// Tick period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of callbacks waiting for the next tick
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Stop ticking and drop every pending callback
    ///
    /// Later requests fail with [`TimingError::SourceShutdown`].
    pub fn shutdown(&self) {
        if self.shared.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        self.driver.abort();

        // Dropped outside the lock: callbacks may own the last handle to a subscriber
        let dropped = self.shared.queue.lock().drain();
        drop(dropped);
        debug!("Interval frame source shut down");
    }

    /// Whether [`IntervalFrameSource::shutdown`] has been called
    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.load(Ordering::SeqCst)
    }
}

impl FrameSource for IntervalFrameSource {
    fn request_frame(&self, callback: FrameCallback) -> Result<FrameRequestId> {
        if self.is_shutdown() {
            return Err(TimingError::SourceShutdown);
        }
        let id = self.shared.queue.lock().push(callback);
        self.shared.wake.notify_one();
        Ok(id)
    }

    fn cancel_frame(&self, id: FrameRequestId) {
        self.shared.queue.lock().cancel(id);
    }
}

impl Drop for IntervalFrameSource {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for IntervalFrameSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntervalFrameSource")
            .field("period", &self.period)
            .field("pending", &self.pending())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

/// Driver loop
///
/// Missed ticks are skipped rather than bursted, like a display that drops
/// frames under load.
async fn drive(shared: Arc<Shared>, period: Duration) {
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let now = timer.tick().await;

        let (frame, callbacks) = shared.queue.lock().take_frame(now);

        if callbacks.is_empty() {
            // Nothing to draw: park until the next request, then start a
            // fresh period from that point
            trace!("Frame source idle after frame {}", frame.frame_index);
            shared.wake.notified().await;
            timer.reset();
            continue;
        }

        trace!("Frame {}: running {} callbacks", frame.frame_index, callbacks.len());

        // Panics are logged by run_frame; the driver keeps ticking
        let _ = run_frame(frame, callbacks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameTime;
    use tokio::time::sleep;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn record_into(log: &Arc<Mutex<Vec<FrameTime>>>) -> FrameCallback {
        let log = Arc::clone(log);
        Box::new(move |frame| log.lock().push(frame))
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_runs_on_next_tick() {
        let source = IntervalFrameSource::new(ms(10));
        let log = Arc::new(Mutex::new(Vec::new()));
        let start = Instant::now();

        source.request_frame(record_into(&log)).unwrap();
        assert_eq!(source.pending(), 1);

        sleep(ms(15)).await;
        let frames = log.lock().clone();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].now - start, ms(10));
        assert_eq!(source.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_runs_once() {
        let source = IntervalFrameSource::new(ms(10));
        let log = Arc::new(Mutex::new(Vec::new()));

        source.request_frame(record_into(&log)).unwrap();
        sleep(ms(100)).await;

        assert_eq!(log.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_request_does_not_run() {
        let source = IntervalFrameSource::new(ms(10));
        let log = Arc::new(Mutex::new(Vec::new()));

        let id = source.request_frame(record_into(&log)).unwrap();
        source.cancel_frame(id);
        source.cancel_frame(id);

        sleep(ms(50)).await;
        assert!(log.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resumes_after_idle() {
        let source = IntervalFrameSource::new(ms(10));
        let log = Arc::new(Mutex::new(Vec::new()));

        source.request_frame(record_into(&log)).unwrap();
        sleep(ms(200)).await;

        let resumed_at = Instant::now();
        source.request_frame(record_into(&log)).unwrap();
        sleep(ms(25)).await;

        let frames = log.lock().clone();
        assert_eq!(frames.len(), 2);
        assert!(frames[1].now > resumed_at);
        assert!(frames[1].frame_index > frames[0].frame_index);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_callback_keeps_driver_alive() {
        let source = IntervalFrameSource::new(ms(10));
        let log = Arc::new(Mutex::new(Vec::new()));

        source.request_frame(Box::new(|_| panic!("bad frame"))).unwrap();
        sleep(ms(15)).await;

        source.request_frame(record_into(&log)).unwrap();
        sleep(ms(25)).await;
        assert_eq!(log.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_rejects_requests() {
        let source = IntervalFrameSource::new(ms(10));
        let log = Arc::new(Mutex::new(Vec::new()));

        source.request_frame(record_into(&log)).unwrap();
        source.shutdown();
        source.shutdown();
        assert!(source.is_shutdown());
        assert_eq!(source.pending(), 0);

        let result = source.request_frame(record_into(&log));
        assert!(matches!(result, Err(TimingError::SourceShutdown)));

        sleep(ms(50)).await;
        assert!(log.lock().is_empty());
    }
}
