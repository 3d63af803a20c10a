//! Frame-gated repetition
//!
//! Runs a callback on frame ticks, no more often than a configured interval.
//! This is not a fixed-period timer: fires land on ticks, so the cadence
//! jitters with the frame rate and intervals shorter than one frame period
//! collapse to once per frame.

use crate::frame::{panic_message, FrameRequestId, FrameSource, FrameTime};
use crate::DEFAULT_DELAY;
use parking_lot::Mutex;
use std::fmt;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Lifecycle of a repeat subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatState {
    /// Subscribed to frame ticks
    Active,
    /// Cancelled through the handle
    Cancelled,
    /// Ended by a panicking callback or a shut-down frame source
    Stopped,
}

/// Handle to a running repeat subscription
///
/// Dropping the handle does not cancel the subscription; call
/// [`Repeat::cancel`]. Clones refer to the same subscription.
#[must_use = "dropping the handle leaves the subscription running with no way to cancel it"]
#[derive(Clone)]
pub struct Repeat {
    inner: Arc<Inner>,
}

struct Inner {
    source: Arc<dyn FrameSource>,
    callback: Box<dyn Fn() + Send + Sync>,
    interval: Duration,
    subscription: Mutex<Subscription>,
}

struct Subscription {
    state: RepeatState,

    /// Outstanding frame request
    request: Option<FrameRequestId>,

    /// Timestamp of the tick that last ran the callback
    last_fire: Option<Instant>,

    /// Number of times the callback has run
    fires: u64,
}

impl Repeat {
    /// Subscribe `callback` to `source`, running it at most once per `interval`
    ///
    /// The first frame is requested immediately. If the source refuses the
    /// request the returned handle is already [`RepeatState::Stopped`].
    pub fn start<F>(source: Arc<dyn FrameSource>, callback: F, interval: Duration) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let inner = Arc::new(Inner {
            source,
            callback: Box::new(callback),
            interval,
            subscription: Mutex::new(Subscription {
                state: RepeatState::Active,
                request: None,
                last_fire: None,
                fires: 0,
            }),
        });

        {
            let mut subscription = inner.subscription.lock();
            inner.request_next(&mut subscription);
        }

        debug!("repeat: started (interval: {:?})", interval);

        Self { inner }
    }

    /// Subscribe with the default 500ms interval
    pub fn with_default_interval<F>(source: Arc<dyn FrameSource>, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::start(source, callback, DEFAULT_DELAY)
    }

    /// Unsubscribe from frame ticks
    ///
    /// Returns `true` if this call ended an active subscription. Further
    /// calls do nothing and return `false`.
    pub fn cancel(&self) -> bool {
        let request = {
            let mut subscription = self.inner.subscription.lock();
            if subscription.state != RepeatState::Active {
                return false;
            }
            subscription.state = RepeatState::Cancelled;
            subscription.request.take()
        };

        if let Some(id) = request {
            self.inner.source.cancel_frame(id);
        }

        debug!("repeat: cancelled");
        true
    }

    /// Current lifecycle state
    pub fn state(&self) -> RepeatState {
        self.inner.subscription.lock().state
    }

    /// Whether the subscription is still receiving ticks
    pub fn is_active(&self) -> bool {
        self.state() == RepeatState::Active
    }

    /// Number of times the callback has run
    pub fn fire_count(&self) -> u64 {
        self.inner.subscription.lock().fires
    }

    /// Minimum spacing between fires
    pub fn interval(&self) -> Duration {
        self.inner.interval
    }
}

impl Inner {
    /// Ask the source for the next frame; caller holds the subscription lock
    fn request_next(self: &Arc<Self>, subscription: &mut Subscription) {
        let inner = Arc::clone(self);
        match self
            .source
            .request_frame(Box::new(move |frame| inner.on_frame(frame)))
        {
            Ok(id) => subscription.request = Some(id),
            Err(e) => {
                warn!("repeat: frame request refused, stopping: {}", e);
                subscription.state = RepeatState::Stopped;
                subscription.request = None;
            }
        }
    }

    fn on_frame(self: &Arc<Self>, frame: FrameTime) {
        let due = {
            let mut subscription = self.subscription.lock();
            if subscription.state != RepeatState::Active {
                return;
            }
            subscription.request = None;

            let due = match subscription.last_fire {
                None => true,
                Some(last) => frame.now.saturating_duration_since(last) >= self.interval,
            };
            if due {
                subscription.last_fire = Some(frame.now);
                subscription.fires += 1;
            }
            due
        };

        if due {
            // The next frame is only requested once the callback returns, so
            // a panic ends the subscription
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| (self.callback)())) {
                self.subscription.lock().state = RepeatState::Stopped;
                error!(
                    "repeat: callback panicked on frame {}, subscription stopped: {}",
                    frame.frame_index,
                    panic_message(payload.as_ref())
                );
                resume_unwind(payload);
            }
        }

        // The callback may have cancelled us
        let mut subscription = self.subscription.lock();
        if subscription.state == RepeatState::Active {
            self.request_next(&mut subscription);
        }
    }
}

impl fmt::Debug for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscription = self.inner.subscription.lock();
        f.debug_struct("Repeat")
            .field("interval", &self.inner.interval)
            .field("state", &subscription.state)
            .field("fires", &subscription.fires)
            .finish()
    }
}

/// Run `callback` on frame ticks of `source`, at most once per `interval`
pub fn repeat<F>(source: Arc<dyn FrameSource>, callback: F, interval: Duration) -> Repeat
where
    F: Fn() + Send + Sync + 'static,
{
    Repeat::start(source, callback, interval)
}
