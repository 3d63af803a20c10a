//! Leading-edge throttling with a chained trailing call
//!
//! The first call in an idle period runs immediately and opens a window.
//! Calls made inside the window overwrite a single pending slot. When the
//! window closes the pending call (if any) runs and opens a fresh window,
//! so a steady stream of calls is executed at most once per `delay`.

use crate::{Result, DEFAULT_DELAY};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::trace;

type Callback<A> = Box<dyn Fn(A) + Send + Sync>;

/// Throttled wrapper around a callback
///
/// Cloning the wrapper yields another handle to the same instance.
pub struct Throttle<A> {
    inner: Arc<Inner<A>>,
}

struct Inner<A> {
    callback: Callback<A>,
    delay: Duration,
    runtime: Handle,
    state: Mutex<State<A>>,
}

struct State<A> {
    /// A window is open; calls are deferred
    throttled: bool,

    /// Most recent call made while throttled
    pending: Option<A>,
}

impl<A: Send + 'static> Throttle<A> {
    /// Wrap `callback` with the given window length
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime, like `tokio::spawn`.
    pub fn new<F>(callback: F, delay: Duration) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::with_handle(Handle::current(), callback, delay)
    }

    /// Like [`Throttle::new`], but reports a missing runtime as an error
    pub fn try_new<F>(callback: F, delay: Duration) -> Result<Self>
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Ok(Self::with_handle(Handle::try_current()?, callback, delay))
    }

    /// Wrap `callback` with the default 500ms window
    pub fn with_default_delay<F>(callback: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::new(callback, DEFAULT_DELAY)
    }

    /// Wrap `callback`, scheduling windows on an explicit runtime
    pub fn with_handle<F>(runtime: Handle, callback: F, delay: Duration) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                callback: Box::new(callback),
                delay,
                runtime,
                state: Mutex::new(State {
                    throttled: false,
                    pending: None,
                }),
            }),
        }
    }

    /// Record a call
    ///
    /// Runs the callback synchronously when idle; otherwise stores `args` as
    /// the pending call, replacing any earlier one.
    pub fn call(&self, args: A) {
        {
            let mut state = self.inner.state.lock();
            if state.throttled {
                trace!("throttle: deferring call");
                state.pending = Some(args);
                return;
            }
            state.throttled = true;
        }

        // Window is armed before the callback runs so a panic cannot leave
        // the instance throttled forever
        self.inner.arm_window();
        (self.inner.callback)(args);
    }

    /// Whether a window is currently open
    pub fn is_throttled(&self) -> bool {
        self.inner.state.lock().throttled
    }

    /// Whether a deferred call will run when the window closes
    pub fn has_pending(&self) -> bool {
        self.inner.state.lock().pending.is_some()
    }

    /// Configured window length
    pub fn delay(&self) -> Duration {
        self.inner.delay
    }
}

impl<A: Send + 'static> Inner<A> {
    fn arm_window(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            tokio::time::sleep(inner.delay).await;
            inner.close_window();
        });
    }

    fn close_window(self: &Arc<Self>) {
        let next = {
            let mut state = self.state.lock();
            match state.pending.take() {
                Some(args) => args,
                None => {
                    state.throttled = false;
                    trace!("throttle: window closed, idle");
                    return;
                }
            }
        };

        // Stay throttled: the trailing call opens a new window
        trace!("throttle: window closed, running pending call");
        self.arm_window();
        (self.callback)(next);
    }
}

impl<A> Clone for Throttle<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> fmt::Debug for Throttle<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Throttle")
            .field("delay", &self.inner.delay)
            .field("throttled", &state.throttled)
            .field("pending", &state.pending.is_some())
            .finish()
    }
}

/// Create a throttled wrapper around `callback`
pub fn throttle<A, F>(callback: F, delay: Duration) -> Throttle<A>
where
    A: Send + 'static,
    F: Fn(A) + Send + Sync + 'static,
{
    Throttle::new(callback, delay)
}
