#![forbid(unsafe_code)]

//! Adaptive quality control from live frame timing.
//!
//! The [`QualityController`] is sampled once per animation frame. It keeps a
//! ring buffer of recent frame deltas, derives a smoothed FPS, and moves
//! between two tiers with hysteresis:
//!
//! ```text
//!            fps < drop_fps for >= drop_duration
//!   High  ───────────────────────────────────────▶  Recovery
//!         ◀───────────────────────────────────────
//!            fps > raise_fps for >= raise_duration
//! ```
//!
//! A streak starts on the first qualifying sample and is checked on later
//! ones; a single non-qualifying sample clears it. The controller decides
//! the tier only; every [`QualityConsumer`] derives its own parameters from
//! the [`QualityChange`] it is handed.
//!
//! # Invariants
//!
//! 1. `multiplier() == 1.0` iff `mode() == High`.
//! 2. The running sum equals the total of the buffered deltas.
//! 3. The buffer never holds more than `sample_capacity` deltas.
//! 4. Rejected deltas leave the buffer and both streaks untouched, but the
//!    last-sample timestamp always advances.
//! 5. Threshold comparisons are strict: a stream held exactly at a
//!    threshold never transitions.
//!
//! # Failure Modes
//!
//! None. Without a monotonic clock every positive delta is accepted.

use core::time::Duration;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::event::{Emitter, SubscriptionId};

// ---------------------------------------------------------------------------
// Mode & configuration
// ---------------------------------------------------------------------------

/// Quality tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityMode {
    /// Full fidelity.
    #[default]
    High,
    /// Reduced fidelity while frame rate recovers.
    Recovery,
}

impl QualityMode {
    /// Stable lowercase name, as dispatched to the page.
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Recovery => "recovery",
        }
    }

    /// Whether this is the reduced tier.
    #[inline]
    pub fn is_recovery(self) -> bool {
        matches!(self, Self::Recovery)
    }
}

/// Thresholds and hysteresis windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QualityConfig {
    /// Enter recovery below this FPS. Default: 39.
    pub drop_fps: f64,
    /// Return to high above this FPS. Default: 47.
    pub raise_fps: f64,
    /// Low streak required before dropping. Default: 1600 ms.
    #[serde(with = "crate::config::millis")]
    pub drop_duration: Duration,
    /// High streak required before raising. Default: 1100 ms.
    #[serde(with = "crate::config::millis")]
    pub raise_duration: Duration,
    /// Ring buffer capacity. Default: 80.
    pub sample_capacity: usize,
    /// Deltas at or above this are discarded (tab switches, stalls). Default: 250 ms.
    #[serde(with = "crate::config::millis")]
    pub max_sample_delta: Duration,
    /// Multiplier reported in recovery. Default: 0.8.
    pub recovery_multiplier: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            drop_fps: 39.0,
            raise_fps: 47.0,
            drop_duration: Duration::from_millis(1600),
            raise_duration: Duration::from_millis(1100),
            sample_capacity: 80,
            max_sample_delta: Duration::from_millis(250),
            recovery_multiplier: 0.8,
        }
    }
}

// ---------------------------------------------------------------------------
// Sampler
// ---------------------------------------------------------------------------

/// Bounded ring buffer of frame deltas with an incrementally maintained sum.
///
/// Deltas are stored as integral nanoseconds so the running sum is exact.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    samples: VecDeque<u64>,
    sum: u128,
    capacity: usize,
}

impl FrameSampler {
    /// Sampler holding at most `capacity` deltas (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            sum: 0,
            capacity,
        }
    }

    /// Append a delta, evicting the oldest when full.
    pub fn push(&mut self, delta: Duration) {
        let nanos = u64::try_from(delta.as_nanos()).unwrap_or(u64::MAX);
        self.samples.push_back(nanos);
        self.sum += u128::from(nanos);
        while self.samples.len() > self.capacity {
            if let Some(old) = self.samples.pop_front() {
                self.sum -= u128::from(old);
            }
        }
    }

    /// Smoothed frames per second, or `None` while empty.
    #[must_use]
    pub fn fps(&self) -> Option<f64> {
        if self.samples.is_empty() || self.sum == 0 {
            return None;
        }
        Some(self.samples.len() as f64 * 1e9 / self.sum as f64)
    }

    /// Mean buffered delta.
    #[must_use]
    pub fn average(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let mean = self.sum / self.samples.len() as u128;
        Some(Duration::from_nanos(u64::try_from(mean).unwrap_or(u64::MAX)))
    }

    /// Exact sum of buffered deltas.
    #[must_use]
    pub fn total(&self) -> Duration {
        Duration::from_nanos(u64::try_from(self.sum).unwrap_or(u64::MAX))
    }

    /// Number of buffered deltas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of buffered deltas.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every delta.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.sum = 0;
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Broadcast on every tier transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityChange {
    /// New tier.
    pub mode: QualityMode,
    /// Default multiplier of the new tier.
    pub multiplier: f64,
    /// When the switch happened.
    #[serde(with = "crate::config::millis")]
    pub at: Duration,
    /// Smoothed FPS at the switch (`None` for forced switches).
    pub fps: Option<f64>,
}

/// A visual effect that re-derives its parameters on tier changes.
pub trait QualityConsumer {
    /// Apply the new tier. Called synchronously, within the detecting frame.
    fn apply_quality(&mut self, change: &QualityChange);
}

/// Snapshot of controller state for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityTelemetry {
    /// Current tier.
    pub mode: QualityMode,
    /// Current multiplier.
    pub multiplier: f64,
    /// Smoothed FPS, if any deltas are buffered.
    pub fps: Option<f64>,
    /// Buffered deltas.
    pub samples: usize,
    /// Start of the current low streak.
    pub low_since: Option<Duration>,
    /// Start of the current high streak.
    pub high_since: Option<Duration>,
    /// Number of transitions so far.
    pub transitions: u32,
}

/// Two-tier frame-rate controller with hysteresis.
#[derive(Debug)]
pub struct QualityController {
    config: QualityConfig,
    mode: QualityMode,
    multiplier: f64,
    last_switch: Duration,
    last_sample: Duration,
    sampler: FrameSampler,
    low_since: Option<Duration>,
    high_since: Option<Duration>,
    accept_all_deltas: bool,
    transitions: u32,
    events: Emitter<QualityChange>,
}

impl QualityController {
    /// Controller in [`QualityMode::High`] whose first delta is measured from `start`.
    #[must_use]
    pub fn new(config: QualityConfig, start: Duration) -> Self {
        let sampler = FrameSampler::new(config.sample_capacity);
        Self {
            config,
            mode: QualityMode::High,
            multiplier: 1.0,
            last_switch: start,
            last_sample: start,
            sampler,
            low_since: None,
            high_since: None,
            accept_all_deltas: false,
            transitions: 0,
            events: Emitter::new(),
        }
    }

    /// Accept every positive delta regardless of the stall cutoff. Set when
    /// the host clock is not monotonic.
    pub fn set_accept_all_deltas(&mut self, accept: bool) {
        self.accept_all_deltas = accept;
    }

    /// Feed the timestamp of the current animation frame.
    ///
    /// Returns the transition this sample caused, if any.
    pub fn sample(&mut self, now: Duration) -> Option<QualityChange> {
        let previous = core::mem::replace(&mut self.last_sample, now);
        let Some(delta) = now.checked_sub(previous) else {
            // Clock stepped back: open streaks would start in the future.
            self.low_since = None;
            self.high_since = None;
            return None;
        };
        if delta.is_zero() || (!self.accept_all_deltas && delta >= self.config.max_sample_delta) {
            return None;
        }
        self.sampler.push(delta);
        let fps = self.sampler.fps()?;

        match self.mode {
            QualityMode::High => {
                self.high_since = None;
                if fps < self.config.drop_fps {
                    match self.low_since {
                        None => self.low_since = Some(now),
                        Some(since) if now.saturating_sub(since) >= self.config.drop_duration => {
                            self.low_since = None;
                            return Some(self.switch(QualityMode::Recovery, now, Some(fps)));
                        }
                        Some(_) => {}
                    }
                } else {
                    self.low_since = None;
                }
            }
            QualityMode::Recovery => {
                self.low_since = None;
                if fps > self.config.raise_fps {
                    match self.high_since {
                        None => self.high_since = Some(now),
                        Some(since) if now.saturating_sub(since) >= self.config.raise_duration => {
                            self.high_since = None;
                            return Some(self.switch(QualityMode::High, now, Some(fps)));
                        }
                        Some(_) => {}
                    }
                } else {
                    self.high_since = None;
                }
            }
        }
        None
    }

    /// Switch tiers without waiting for a streak. No-op when already in `mode`.
    pub fn force_mode(&mut self, mode: QualityMode, now: Duration) -> Option<QualityChange> {
        if mode == self.mode {
            return None;
        }
        self.low_since = None;
        self.high_since = None;
        Some(self.switch(mode, now, None))
    }

    fn switch(&mut self, mode: QualityMode, now: Duration, fps: Option<f64>) -> QualityChange {
        self.mode = mode;
        self.multiplier = match mode {
            QualityMode::High => 1.0,
            QualityMode::Recovery => self.config.recovery_multiplier,
        };
        self.last_switch = now;
        self.transitions = self.transitions.saturating_add(1);
        let change = QualityChange {
            mode,
            multiplier: self.multiplier,
            at: now,
            fps,
        };
        info!(
            mode = mode.as_str(),
            multiplier = self.multiplier,
            fps = fps.unwrap_or(f64::NAN),
            "quality mode changed"
        );
        self.events.emit(&change);
        change
    }

    /// Current tier.
    #[inline]
    pub fn mode(&self) -> QualityMode {
        self.mode
    }

    /// Current multiplier (1.0 in high).
    #[inline]
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Time of the last transition (the start time before any).
    #[inline]
    pub fn last_switch(&self) -> Duration {
        self.last_switch
    }

    /// Smoothed FPS over the buffered deltas.
    #[inline]
    pub fn fps(&self) -> Option<f64> {
        self.sampler.fps()
    }

    /// Number of buffered deltas.
    #[inline]
    pub fn sample_count(&self) -> usize {
        self.sampler.len()
    }

    /// The frame-delta buffer.
    #[inline]
    pub fn sampler(&self) -> &FrameSampler {
        &self.sampler
    }

    /// Start of the current low-FPS streak.
    #[inline]
    pub fn low_since(&self) -> Option<Duration> {
        self.low_since
    }

    /// Start of the current high-FPS streak.
    #[inline]
    pub fn high_since(&self) -> Option<Duration> {
        self.high_since
    }

    /// Configuration in use.
    #[inline]
    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Capture a diagnostics snapshot.
    pub fn telemetry(&self) -> QualityTelemetry {
        QualityTelemetry {
            mode: self.mode,
            multiplier: self.multiplier,
            fps: self.sampler.fps(),
            samples: self.sampler.len(),
            low_since: self.low_since,
            high_since: self.high_since,
            transitions: self.transitions,
        }
    }

    /// Subscribe a closure to transitions.
    pub fn subscribe(&mut self, handler: impl FnMut(&QualityChange) + 'static) -> SubscriptionId {
        self.events.subscribe(handler)
    }

    /// Subscribe a shared consumer. Only a weak reference is held; once the
    /// consumer is dropped the subscription goes quiet.
    pub fn subscribe_consumer<C>(&mut self, consumer: &Rc<RefCell<C>>) -> SubscriptionId
    where
        C: QualityConsumer + 'static,
    {
        let weak: Weak<RefCell<C>> = Rc::downgrade(consumer);
        self.events.subscribe(move |change| {
            if let Some(consumer) = weak.upgrade() {
                consumer.borrow_mut().apply_quality(change);
            } else {
                debug!("quality consumer dropped");
            }
        })
    }

    /// Remove a subscription.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.events.len()
    }
}
