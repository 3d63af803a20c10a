//! Replay call schedules on a virtual clock
//!
//! Every simulation runs on a paused current-thread runtime, so timers fire
//! at their exact deadlines and the printed timeline is deterministic.

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use timing::{Debounce, IntervalFrameSource, Repeat, Throttle, TimingConfig};
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// One callback invocation observed during a simulation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fire {
    /// Virtual time since the start of the simulation
    pub at: Duration,

    /// Index of the call whose arguments reached the callback
    pub call: Option<usize>,
}

type FireLog = Arc<Mutex<Vec<Fire>>>;

/// Run `body` on a fresh paused runtime
fn on_virtual_clock<F, T>(body: impl FnOnce() -> F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .context("Failed to build simulation runtime")?;

    runtime.block_on(body())
}

/// Issue call `i` at `start + calls[i]` for every scheduled call
async fn replay(start: Instant, calls: &[u64], call: impl Fn(usize)) {
    for (i, at) in calls.iter().enumerate() {
        sleep_until(start + Duration::from_millis(*at)).await;
        debug!("call {} at {}ms", i, at);
        call(i);
    }
}

fn check_until(calls: &[u64], until: u64) -> Result<()> {
    if let Some(last) = calls.last() {
        if until < *last {
            anyhow::bail!("--until ({}ms) is before the last call ({}ms)", until, last);
        }
    }
    Ok(())
}

/// Debounce `calls` with the given quiet period
pub fn simulate_debounce(delay: Duration, calls: &[u64], until: u64) -> Result<Vec<Fire>> {
    util::validate_schedule(calls)?;
    check_until(calls, until)?;

    on_virtual_clock(|| async move {
        let start = Instant::now();
        let fires: FireLog = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&fires);
        let debounced = Debounce::try_new(
            move |i: usize| {
                sink.lock().push(Fire {
                    at: start.elapsed(),
                    call: Some(i),
                })
            },
            delay,
        )?;

        replay(start, calls, |i| debounced.call(i)).await;
        sleep_until(start + Duration::from_millis(until)).await;

        let timeline = fires.lock().clone();
        Ok::<_, anyhow::Error>(timeline)
    })
}

/// Throttle `calls` with the given window
pub fn simulate_throttle(delay: Duration, calls: &[u64], until: u64) -> Result<Vec<Fire>> {
    util::validate_schedule(calls)?;
    check_until(calls, until)?;

    on_virtual_clock(|| async move {
        let start = Instant::now();
        let fires: FireLog = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&fires);
        let throttled = Throttle::try_new(
            move |i: usize| {
                sink.lock().push(Fire {
                    at: start.elapsed(),
                    call: Some(i),
                })
            },
            delay,
        )?;

        replay(start, calls, |i| throttled.call(i)).await;
        sleep_until(start + Duration::from_millis(until)).await;

        let timeline = fires.lock().clone();
        Ok::<_, anyhow::Error>(timeline)
    })
}

/// Repeat on a fixed-rate frame source until `until`, optionally cancelling early
pub fn simulate_repeat(
    interval: Duration,
    frame_period: Duration,
    until: u64,
    cancel_at: Option<u64>,
) -> Result<Vec<Fire>> {
    timing::config::check_frame_period(frame_period.as_secs_f64() * 1000.0)
        .context("Invalid frame period")?;

    on_virtual_clock(|| async move {
        let start = Instant::now();
        let fires: FireLog = Arc::new(Mutex::new(Vec::new()));
        let source = Arc::new(IntervalFrameSource::try_new(frame_period)?);

        let sink = Arc::clone(&fires);
        let handle = Repeat::start(
            source.clone(),
            move || {
                sink.lock().push(Fire {
                    at: start.elapsed(),
                    call: None,
                })
            },
            interval,
        );

        if let Some(cancel_at) = cancel_at.filter(|at| *at < until) {
            sleep_until(start + Duration::from_millis(cancel_at)).await;
            handle.cancel();
            debug!("cancelled at {}ms", cancel_at);
        }

        sleep_until(start + Duration::from_millis(until)).await;
        handle.cancel();
        source.shutdown();

        let timeline = fires.lock().clone();
        Ok::<_, anyhow::Error>(timeline)
    })
}

fn print_timeline(title: &str, settings: &str, fires: &[Fire], calls: Option<usize>) {
    println!("{} {}", title.bold(), settings.dimmed());

    for (n, fire) in fires.iter().enumerate() {
        let at = util::format_ms(fire.at);
        match fire.call {
            Some(call) => println!("t={} fire #{} (call {})", at, n + 1, call),
            None => println!("t={} fire #{}", at, n + 1),
        }
    }

    let summary = match calls {
        Some(calls) => format!("{} invocations for {} calls", fires.len(), calls),
        None => format!("{} invocations", fires.len()),
    };
    println!("{}", summary.cyan());
}

pub fn run_debounce(
    config: &TimingConfig,
    delay: Option<u64>,
    calls: &[u64],
    until: Option<u64>,
) -> Result<()> {
    let delay = delay.map(Duration::from_millis).unwrap_or_else(|| config.debounce_delay());
    let until = until.unwrap_or_else(|| util::default_until(calls, delay));

    let fires = simulate_debounce(delay, calls, until)?;
    let settings = format!("(delay {}, until {}ms)", util::format_ms(delay), until);
    print_timeline("Debounce", &settings, &fires, Some(calls.len()));
    Ok(())
}

pub fn run_throttle(
    config: &TimingConfig,
    delay: Option<u64>,
    calls: &[u64],
    until: Option<u64>,
) -> Result<()> {
    let delay = delay.map(Duration::from_millis).unwrap_or_else(|| config.throttle_delay());
    let until = until.unwrap_or_else(|| util::default_until(calls, delay));

    let fires = simulate_throttle(delay, calls, until)?;
    let settings = format!("(delay {}, until {}ms)", util::format_ms(delay), until);
    print_timeline("Throttle", &settings, &fires, Some(calls.len()));
    Ok(())
}

pub fn run_repeat(
    config: &TimingConfig,
    interval: Option<u64>,
    frame: Option<f64>,
    until: u64,
    cancel_at: Option<u64>,
) -> Result<()> {
    let interval = interval
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.repeat_interval());
    let frame_period = match frame {
        Some(ms) => timing::config::check_frame_period(ms).context("Invalid --frame value")?,
        None => config.frame_period(),
    };

    let fires = simulate_repeat(interval, frame_period, until, cancel_at)?;

    let mut settings = format!(
        "(interval {}, frame {}, until {}ms",
        util::format_ms(interval),
        util::format_ms(frame_period),
        until
    );
    if let Some(cancel_at) = cancel_at {
        settings.push_str(&format!(", cancel at {}ms", cancel_at));
    }
    settings.push(')');

    print_timeline("Repeat", &settings, &fires, None);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn fire(at: u64, call: usize) -> Fire {
        Fire {
            at: ms(at),
            call: Some(call),
        }
    }

    #[test]
    fn test_debounce_timeline() -> Result<()> {
        let fires = simulate_debounce(ms(200), &[0, 50, 100], 500)?;
        assert_eq!(fires, vec![fire(300, 2)]);
        Ok(())
    }

    #[test]
    fn test_throttle_timeline() -> Result<()> {
        let fires = simulate_throttle(ms(300), &[0, 100, 250], 1000)?;
        assert_eq!(fires, vec![fire(0, 0), fire(300, 2)]);
        Ok(())
    }

    #[test]
    fn test_throttle_chained_window() -> Result<()> {
        let fires = simulate_throttle(ms(300), &[0, 250, 400], 1000)?;
        assert_eq!(fires, vec![fire(0, 0), fire(300, 1), fire(600, 2)]);
        Ok(())
    }

    #[test]
    fn test_repeat_timeline() -> Result<()> {
        let fires = simulate_repeat(ms(0), ms(10), 55, None)?;
        let times: Vec<Duration> = fires.iter().map(|f| f.at).collect();
        assert_eq!(times, vec![ms(10), ms(20), ms(30), ms(40), ms(50)]);
        Ok(())
    }

    #[test]
    fn test_repeat_cancel_at() -> Result<()> {
        let fires = simulate_repeat(ms(0), ms(10), 100, Some(35))?;
        assert_eq!(fires.len(), 3);
        Ok(())
    }

    #[test]
    fn test_repeat_rejects_sub_millisecond_frame() {
        let err = simulate_repeat(ms(0), Duration::from_micros(1), 200, None).unwrap_err();
        assert!(format!("{:#}", err).contains("frame period"));

        assert!(simulate_repeat(ms(0), Duration::ZERO, 200, None).is_err());
        assert!(simulate_repeat(ms(0), ms(1001), 2000, None).is_err());
    }

    #[test]
    fn test_rejects_until_before_last_call() {
        let err = simulate_debounce(ms(100), &[0, 500], 200).unwrap_err();
        assert!(err.to_string().contains("--until"));
    }
}
