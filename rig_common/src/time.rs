//! Millisecond time source used by the controllers.
//!
//! All supervision (durations, stall windows, timeouts) is expressed in
//! milliseconds from an arbitrary origin. Controllers never touch
//! `std::time` directly; they receive a [`Clock`] so tests and the
//! simulator can drive time explicitly.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic millisecond clock.
pub trait Clock: Send + Sync {
    /// Milliseconds since this clock's origin. Never decreases.
    fn now_ms(&self) -> u64;

    /// Block the caller for `ms` milliseconds of this clock's time.
    fn sleep(&self, ms: u64);

    /// Milliseconds elapsed since `since`, saturating at zero.
    fn elapsed_since(&self, since: u64) -> u64 {
        self.now_ms().saturating_sub(since)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }

    fn sleep(&self, ms: u64) {
        (**self).sleep(ms)
    }
}

// ─── Wall Clock ─────────────────────────────────────────────────────

/// `Instant`-backed clock for the daemon.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn sleep(&self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}

// ─── Manual Clock ───────────────────────────────────────────────────

/// Clock that only moves when told to.
///
/// Clones share the same time base, so a test can hold one handle while the
/// controllers and the simulated rig hold others. `sleep` advances the
/// shared time instead of blocking.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    /// Move to an absolute time. Earlier values are ignored.
    pub fn set(&self, ms: u64) {
        self.now.fetch_max(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    fn sleep(&self, ms: u64) {
        self.advance(ms);
    }
}

// ─── Tick Gate ──────────────────────────────────────────────────────

/// Rate limiter for service functions.
///
/// A service call does real work only when at least `interval_ms` has
/// passed since the last admitted call; the first call is always admitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickGate {
    last: Option<u64>,
}

impl TickGate {
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Returns `true` and records `now_ms` if the interval has elapsed.
    pub fn admit(&mut self, now_ms: u64, interval_ms: u64) -> bool {
        match self.last {
            Some(last) if now_ms.saturating_sub(last) < interval_ms => false,
            _ => {
                self.last = Some(now_ms);
                true
            }
        }
    }

    /// Forget the last admitted call so the next one runs immediately.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
