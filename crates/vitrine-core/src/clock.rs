#![forbid(unsafe_code)]

//! Monotonic time sources.
//!
//! Every time-dependent decision in the crate (frame sampling, hysteresis
//! streaks, pause bookkeeping, glyph ages) reads time through [`MonoClock`],
//! so the embedding host, or a test, controls it explicitly. Timestamps are
//! [`Duration`]s measured from an arbitrary per-clock origin.

use core::time::Duration;
use std::cell::Cell;
use std::rc::Rc;

/// A source of monotonic timestamps.
pub trait MonoClock {
    /// Current time since the clock's origin.
    fn now_mono(&self) -> Duration;

    /// Whether successive readings are guaranteed never to go backwards.
    ///
    /// Hosts without a monotonic source (no `performance.now()`) report
    /// `false`; the quality sampler then accepts every positive delta.
    fn is_monotonic(&self) -> bool {
        true
    }
}

/// Clock handle shared by every component of one coordinator.
pub type SharedClock = Rc<dyn MonoClock>;

/// Host-driven clock. Clones share the same underlying time value, so a test
/// can keep one handle and advance it while components read the other.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
    monotonic: bool,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Create a clock starting at `0`.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(Duration::ZERO)
    }

    /// Create a clock starting at `now`.
    #[must_use]
    pub fn starting_at(now: Duration) -> Self {
        Self {
            now: Rc::new(Cell::new(now)),
            monotonic: true,
        }
    }

    /// Create a clock that reports itself as non-monotonic (wall-clock fallback).
    #[must_use]
    pub fn wall() -> Self {
        Self {
            now: Rc::new(Cell::new(Duration::ZERO)),
            monotonic: false,
        }
    }

    /// Set current time.
    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }

    /// Advance time by `dt`, saturating at [`Duration::MAX`].
    pub fn advance(&self, dt: Duration) {
        self.now.set(self.now.get().saturating_add(dt));
    }

    /// Advance time by `ms` milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Wrap a clone of this clock as a [`SharedClock`].
    #[must_use]
    pub fn shared(&self) -> SharedClock {
        Rc::new(self.clone())
    }
}

impl MonoClock for ManualClock {
    fn now_mono(&self) -> Duration {
        self.now.get()
    }

    fn is_monotonic(&self) -> bool {
        self.monotonic
    }
}

/// Real monotonic clock backed by `web_time::Instant` (works on wasm32).
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: web_time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    /// Create a clock whose origin is "now".
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: web_time::Instant::now(),
        }
    }
}

impl MonoClock for SystemClock {
    fn now_mono(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Exact millisecond value of `d` as `f64`.
///
/// Divides integral nanoseconds so whole-millisecond durations convert
/// without rounding error.
#[inline]
#[must_use]
pub fn duration_ms(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

/// Convert a host timestamp in (fractional) milliseconds to a [`Duration`].
///
/// Negative and non-finite inputs map to zero.
#[must_use]
pub fn duration_from_ms(ms: f64) -> Duration {
    if !ms.is_finite() || ms <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_nanos((ms * 1_000_000.0).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let reader = clock.shared();
        assert_eq!(reader.now_mono(), Duration::ZERO);

        clock.advance_ms(16);
        assert_eq!(reader.now_mono(), Duration::from_millis(16));

        clock.set(Duration::MAX);
        clock.advance(Duration::from_secs(1));
        assert_eq!(reader.now_mono(), Duration::MAX);
    }

    #[test]
    fn wall_clock_is_not_monotonic() {
        assert!(ManualClock::new().is_monotonic());
        assert!(!ManualClock::wall().is_monotonic());
    }

    #[test]
    fn millisecond_conversions_are_exact_for_whole_values() {
        assert_eq!(duration_ms(Duration::from_millis(25)), 25.0);
        assert_eq!(duration_from_ms(16.5), Duration::from_micros(16_500));
        assert_eq!(duration_from_ms(-3.0), Duration::ZERO);
        assert_eq!(duration_from_ms(f64::NAN), Duration::ZERO);
    }
}
