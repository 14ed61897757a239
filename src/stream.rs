//! Rate-limited streaming emitter.
//!
//! Drains an iterator of harvested items through a handler, pacing delivery
//! per [`Pace`], honoring an optional overall duration bound, and checking a
//! cooperative stop flag between items. Handler time is subtracted from the
//! per-item delay so the configured rate is an arrival rate, not an idle
//! gap.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::DigestError;
use crate::models::ContentItem;

/// Delivery pacing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// Fixed delay between consecutive items.
    PerItem(Duration),
    /// At most `items` deliveries per rolling `period`.
    Windowed { items: u32, period: Duration },
    /// Deliver as fast as the source produces.
    Unpaced,
}

#[derive(Debug, Clone, Copy)]
pub struct StreamOptions {
    pub pace: Pace,
    /// Stop after this much wall time, if set.
    pub duration: Option<Duration>,
}

/// Why the emitter returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    SourceExhausted,
    DurationElapsed,
    Cancelled,
}

/// Tracks deliveries inside a rolling window. Instants are passed in so the
/// accounting is testable without sleeping.
#[derive(Debug)]
pub struct WindowBudget {
    items: u32,
    period: Duration,
    window_start: Instant,
    delivered: u32,
}

impl WindowBudget {
    pub fn new(items: u32, period: Duration, now: Instant) -> Self {
        Self {
            items,
            period,
            window_start: now,
            delivered: 0,
        }
    }

    /// How long to wait before the next delivery is allowed. Zero when the
    /// window still has budget; otherwise the remainder of the window.
    pub fn delay_until_allowed(&mut self, now: Instant) -> Duration {
        let elapsed = now.duration_since(self.window_start);
        if elapsed >= self.period {
            self.window_start = now;
            self.delivered = 0;
            return Duration::ZERO;
        }
        if self.delivered < self.items {
            return Duration::ZERO;
        }
        self.period - elapsed
    }

    pub fn record_delivery(&mut self) {
        self.delivered += 1;
    }
}

/// Per-item delay remaining after the handler already spent `handler_cost`.
pub fn remaining_delay(delay: Duration, handler_cost: Duration) -> Duration {
    delay.saturating_sub(handler_cost)
}

/// Drain `items` through `handler`, pacing per `options`. The `stop` flag is
/// checked between items and while sleeping, so cancellation takes effect
/// within one poll interval.
pub fn run<I, F>(
    items: I,
    options: StreamOptions,
    stop: &AtomicBool,
    mut handler: F,
) -> Result<StopReason, DigestError>
where
    I: Iterator<Item = Result<ContentItem, DigestError>>,
    F: FnMut(&ContentItem) -> Result<(), DigestError>,
{
    let started = Instant::now();
    let deadline = options.duration.map(|d| started + d);
    let mut window = match options.pace {
        Pace::Windowed { items, period } => Some(WindowBudget::new(items, period, started)),
        _ => None,
    };
    let mut delivered: u64 = 0;

    for item in items {
        if stop.load(Ordering::Relaxed) {
            info!(delivered, "stream cancelled");
            return Ok(StopReason::Cancelled);
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                info!(delivered, "stream duration elapsed");
                return Ok(StopReason::DurationElapsed);
            }
        }

        if let Some(window) = window.as_mut() {
            let delay = window.delay_until_allowed(Instant::now());
            if !delay.is_zero() {
                debug!(?delay, "window budget spent, waiting");
                if !interruptible_sleep(delay, stop, deadline) {
                    return Ok(stop_reason_after_sleep(stop, delivered));
                }
                window.delay_until_allowed(Instant::now());
            }
        }

        let item = item?;
        let handler_started = Instant::now();
        handler(&item)?;
        let handler_cost = handler_started.elapsed();
        delivered += 1;
        if let Some(window) = window.as_mut() {
            window.record_delivery();
        }

        if let Pace::PerItem(delay) = options.pace {
            let delay = remaining_delay(delay, handler_cost);
            if !delay.is_zero() && !interruptible_sleep(delay, stop, deadline) {
                return Ok(stop_reason_after_sleep(stop, delivered));
            }
        }
    }

    info!(delivered, "stream source exhausted");
    Ok(StopReason::SourceExhausted)
}

const SLEEP_SLICE: Duration = Duration::from_millis(200);

/// Sleep in short slices so stop and deadline stay responsive. Returns false
/// when the sleep was cut short by either.
fn interruptible_sleep(total: Duration, stop: &AtomicBool, deadline: Option<Instant>) -> bool {
    let until = Instant::now() + total;
    loop {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if let Some(deadline) = deadline {
            if now >= deadline {
                return false;
            }
        }
        if now >= until {
            return true;
        }
        std::thread::sleep(SLEEP_SLICE.min(until - now));
    }
}

fn stop_reason_after_sleep(stop: &AtomicBool, delivered: u64) -> StopReason {
    if stop.load(Ordering::Relaxed) {
        info!(delivered, "stream cancelled");
        StopReason::Cancelled
    } else {
        info!(delivered, "stream duration elapsed");
        StopReason::DurationElapsed
    }
}
