//! Trailing-edge debouncing
//!
//! Coalesces a burst of calls into a single invocation once the caller has
//! been quiet for the configured delay. Only the last call's arguments reach
//! the callback.

use crate::{Result, DEFAULT_DELAY};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::trace;

type Callback<A> = Box<dyn Fn(A) + Send + Sync>;

/// Debounced wrapper around a callback
///
/// Cloning the wrapper yields another handle to the same instance: calls
/// through either clone supersede each other.
pub struct Debounce<A> {
    inner: Arc<Inner<A>>,
}

struct Inner<A> {
    /// Wrapped callback
    callback: Callback<A>,

    /// Quiet period before the trailing invocation
    delay: Duration,

    /// Runtime hosting the pending timer
    runtime: Handle,

    /// Currently scheduled invocation, if any
    pending: Mutex<Pending>,
}

#[derive(Default)]
struct Pending {
    /// Bumped on every call; a timer only fires if it still holds the latest value
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl<A: Send + 'static> Debounce<A> {
    /// Wrap `callback` with the given quiet period
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

    /// Like [`Debounce::new`], but reports a missing runtime as an error
    pub fn try_new<F>(callback: F, delay: Duration) -> Result<Self>
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Ok(Self::with_handle(Handle::try_current()?, callback, delay))
    }

    /// Wrap `callback` with the default 500ms quiet period
    pub fn with_default_delay<F>(callback: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::new(callback, DEFAULT_DELAY)
    }

    /// Wrap `callback`, scheduling timers on an explicit runtime
    pub fn with_handle<F>(runtime: Handle, callback: F, delay: Duration) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                callback: Box::new(callback),
                delay,
                runtime,
                pending: Mutex::new(Pending::default()),
            }),
        }
    }

    /// Record a call
    ///
    /// Cancels the previously scheduled invocation of this instance and
    /// schedules a new one `delay` from now carrying `args`.
    pub fn call(&self, args: A) {
        let mut pending = self.inner.pending.lock();

        if let Some(previous) = pending.task.take() {
            previous.abort();
        }

        pending.generation = pending.generation.wrapping_add(1);
        let generation = pending.generation;
        let inner = Arc::clone(&self.inner);

        trace!("debounce: scheduling invocation in {:?}", self.inner.delay);

        pending.task = Some(self.inner.runtime.spawn(async move {
            tokio::time::sleep(inner.delay).await;
            inner.fire(generation, args);
        }));
    }

    /// Whether a trailing invocation is scheduled
    pub fn is_pending(&self) -> bool {
        self.inner.pending.lock().task.is_some()
    }

    /// Configured quiet period
    pub fn delay(&self) -> Duration {
        self.inner.delay
    }
}

impl<A> Inner<A> {
    fn fire(&self, generation: u64, args: A) {
        {
            let mut pending = self.pending.lock();
            if pending.generation != generation {
                // Superseded after the timer elapsed but before it ran
                return;
            }
            pending.task = None;
        }

        // Lock released: the callback may call back into the wrapper
        (self.callback)(args);
    }
}

impl<A> Clone for Debounce<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> fmt::Debug for Debounce<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debounce")
            .field("delay", &self.inner.delay)
            .field("pending", &self.inner.pending.lock().task.is_some())
            .finish()
    }
}

/// Create a debounced wrapper around `callback`
pub fn debounce<A, F>(callback: F, delay: Duration) -> Debounce<A>
where
    A: Send + 'static,
    F: Fn(A) + Send + Sync + 'static,
{
    Debounce::new(callback, delay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Instant};

    type Log<T> = Arc<Mutex<Vec<(u64, T)>>>;

    /// Callback that records (elapsed ms, args) for every invocation
    fn recorder<T: Send + 'static>() -> (Log<T>, impl Fn(T) + Send + Sync + 'static) {
        let log: Log<T> = Arc::new(Mutex::new(Vec::new()));
        let start = Instant::now();
        let sink = Arc::clone(&log);
        let callback = move |args: T| {
            sink.lock().push((start.elapsed().as_millis() as u64, args));
        };
        (log, callback)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_fires_once_with_last_args() {
        let (log, callback) = recorder();
        let debounced = debounce(callback, ms(200));

        debounced.call("t0");
        sleep(ms(50)).await;
        debounced.call("t50");
        sleep(ms(50)).await;
        debounced.call("t100");

        sleep(ms(150)).await; // t=250
        assert!(log.lock().is_empty());
        assert!(debounced.is_pending());

        sleep(ms(100)).await; // t=350
        assert_eq!(*log.lock(), vec![(300, "t100")]);
        assert!(!debounced.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_call_fires_after_delay() {
        let (log, callback) = recorder();
        let debounced = debounce(callback, ms(200));

        debounced.call(7u32);

        sleep(ms(199)).await;
        assert!(log.lock().is_empty());

        sleep(ms(300)).await;
        assert_eq!(*log.lock(), vec![(200, 7)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_after_quiet_period_fire_again() {
        let (log, callback) = recorder();
        let debounced = debounce(callback, ms(100));

        debounced.call(1);
        sleep(ms(150)).await;
        debounced.call(2);
        sleep(ms(150)).await;

        assert_eq!(*log.lock(), vec![(100, 1), (250, 2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_coalesces_same_turn() {
        let (log, callback) = recorder();
        let debounced = debounce(callback, Duration::ZERO);

        debounced.call(1);
        debounced.call(2);
        debounced.call(3);
        assert!(log.lock().is_empty());

        sleep(ms(1)).await;
        let fired: Vec<_> = log.lock().iter().map(|(_, n)| *n).collect();
        assert_eq!(fired, vec![3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_instances_do_not_share_timers() {
        let (log_a, callback_a) = recorder();
        let (log_b, callback_b) = recorder();
        let a = debounce(callback_a, ms(100));
        let b = debounce(callback_b, ms(100));

        a.call('a');
        sleep(ms(50)).await;
        b.call('b');
        sleep(ms(200)).await;

        assert_eq!(*log_a.lock(), vec![(100, 'a')]);
        assert_eq!(*log_b.lock(), vec![(150, 'b')]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clones_share_one_instance() {
        let (log, callback) = recorder();
        let debounced = debounce(callback, ms(100));
        let other = debounced.clone();

        debounced.call(1);
        sleep(ms(50)).await;
        other.call(2);
        sleep(ms(200)).await;

        assert_eq!(*log.lock(), vec![(150, 2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_panicking_callback() {
        let (log, record) = recorder();
        let debounced = debounce(
            move |n: u32| {
                if n == 0 {
                    panic!("boom");
                }
                record(n);
            },
            ms(100),
        );

        debounced.call(0);
        sleep(ms(150)).await;
        assert!(!debounced.is_pending());

        debounced.call(1);
        sleep(ms(150)).await;
        assert_eq!(*log.lock(), vec![(250, 1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_delay() {
        let (log, callback) = recorder();
        let debounced = Debounce::with_default_delay(callback);
        assert_eq!(debounced.delay(), DEFAULT_DELAY);

        debounced.call(());
        sleep(ms(600)).await;
        assert_eq!(*log.lock(), vec![(500, ())]);
    }

    #[test]
    fn test_try_new_without_runtime() {
        let result = Debounce::try_new(|_: ()| {}, ms(10));
        assert!(matches!(result, Err(crate::TimingError::NoRuntime(_))));
    }
}
