//! Property-based invariant tests for the adaptive quality controller.
//!
//! 1. The sampler's running sum equals the total of its last `capacity`
//!    pushed deltas, and its length never exceeds the capacity.
//! 2. `multiplier == 1.0` iff the mode is high, after any delta stream.
//! 3. Deltas at or above the stall cutoff never reach the buffer.
//! 4. A steady low frame rate drops exactly once, no earlier than the drop
//!    window after the streak started.
//! 5. A stream held exactly at the drop threshold never drops.
//! 6. A steady high frame rate in recovery raises exactly once.

use core::time::Duration;

use proptest::prelude::*;
use vitrine_core::quality::{FrameSampler, QualityConfig, QualityController, QualityMode};

// ── Helpers ─────────────────────────────────────────────────────────────

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn delta_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..400, 0..300)
}

/// Feed deltas (ms) and return every transition with its timestamp.
fn run(controller: &mut QualityController, deltas: &[u64]) -> Vec<(Duration, QualityMode)> {
    let mut now = Duration::ZERO;
    let mut transitions = Vec::new();
    for d in deltas {
        now += ms(*d);
        if let Some(change) = controller.sample(now) {
            transitions.push((now, change.mode));
        }
    }
    transitions
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Running sum is exact and the buffer is bounded
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn running_sum_matches_window(
        capacity in 1usize..100,
        deltas in prop::collection::vec(1u64..1_000_000_000, 0..300),
    ) {
        let mut sampler = FrameSampler::new(capacity);
        for d in &deltas {
            sampler.push(Duration::from_nanos(*d));
            prop_assert!(sampler.len() <= capacity);
        }
        let window = &deltas[deltas.len().saturating_sub(capacity)..];
        let expected: u64 = window.iter().sum();
        prop_assert_eq!(sampler.total(), Duration::from_nanos(expected));
        prop_assert_eq!(sampler.len(), window.len());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Multiplier tracks the mode
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn multiplier_tracks_mode(deltas in delta_strategy()) {
        let mut controller = QualityController::new(QualityConfig::default(), Duration::ZERO);
        let mut now = Duration::ZERO;
        for d in &deltas {
            now += ms(*d);
            controller.sample(now);
            let high = controller.mode() == QualityMode::High;
            prop_assert_eq!(controller.multiplier() == 1.0, high);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Stalls are discarded
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn stalls_never_reach_the_buffer(deltas in delta_strategy()) {
        let mut controller = QualityController::new(QualityConfig::default(), Duration::ZERO);
        let mut now = Duration::ZERO;
        let mut accepted = 0usize;
        for d in &deltas {
            now += ms(*d);
            controller.sample(now);
            if *d > 0 && *d < 250 {
                accepted += 1;
            }
            prop_assert_eq!(controller.sample_count(), accepted.min(80));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Steady low rate drops once, after the window
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn steady_low_rate_drops_once(delta in 30u64..=200, frames in 100usize..400) {
        let mut controller = QualityController::new(QualityConfig::default(), Duration::ZERO);
        let transitions = run(&mut controller, &vec![delta; frames]);

        // The streak starts on the first sample, at `delta`.
        let window = 1600u64;
        let first_due = delta + window.div_ceil(delta) * delta;
        if (frames as u64) * delta >= first_due {
            prop_assert_eq!(transitions, vec![(ms(first_due), QualityMode::Recovery)]);
        } else {
            prop_assert!(transitions.is_empty());
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Boundary streams never drop
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn stream_at_threshold_never_drops(frames in 1usize..500) {
        let config = QualityConfig {
            drop_fps: 40.0,
            ..QualityConfig::default()
        };
        let mut controller = QualityController::new(config, Duration::ZERO);
        prop_assert!(run(&mut controller, &vec![25; frames]).is_empty());
        prop_assert_eq!(controller.fps(), Some(40.0));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Steady high rate raises once
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn steady_high_rate_raises_once(delta in 5u64..=20, frames in 300usize..600) {
        let mut controller = QualityController::new(QualityConfig::default(), Duration::ZERO);
        controller.force_mode(QualityMode::Recovery, Duration::ZERO);
        let transitions = run(&mut controller, &vec![delta; frames]);
        prop_assert_eq!(transitions.len(), 1);
        prop_assert_eq!(transitions[0].1, QualityMode::High);
        prop_assert!(transitions[0].0 >= ms(delta + 1100));
    }
}
