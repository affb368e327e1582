#![forbid(unsafe_code)]

//! Reference-counted pause gate for a continuous animation.
//!
//! Reveal sequences hold the gate while they run; nested sequences simply
//! hold it again. Only the outermost release resumes the animation, after
//! shifting every time-based entity forward by the time spent paused so
//! ages pick up exactly where they stopped.
//!
//! # Invariants
//!
//! 1. `count` never underflows; releasing an open gate is a no-op.
//! 2. The animation is frozen exactly once per 0 → 1 transition.
//! 3. Timestamps are shifted exactly once per 1 → 0 transition, by the
//!    whole time spent held (never per nested release).

use core::time::Duration;

use tracing::debug;

/// An animation the gate can freeze and resume.
pub trait GatedAnimation {
    /// Stop the frame loop and drop transient input state.
    fn freeze(&mut self);
    /// Shift every entity's reference timestamp forward by `by`.
    fn shift_timeline(&mut self, by: Duration);
    /// Whether any entity still needs frames.
    fn has_pending_work(&self) -> bool;
    /// Accept input again; start the frame loop when `restart` is set.
    /// Returns `true` if a loop was started.
    fn thaw(&mut self, restart: bool) -> bool;
}

/// Outcome of an acquire or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateTransition {
    /// 0 → 1: the animation was frozen.
    Paused,
    /// Already held; the count went up.
    Nested,
    /// Released, but another holder remains.
    StillHeld,
    /// 1 → 0: timeline shifted by `elapsed`; `restarted` tells whether the
    /// loop started again.
    Resumed {
        /// Time spent held.
        elapsed: Duration,
        /// Whether the animation loop restarted.
        restarted: bool,
    },
    /// Release of an open gate; ignored.
    Unbalanced,
}

/// Reentrant pause counter with elapsed-time bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct SequencePauseGate {
    count: u32,
    started_at: Option<Duration>,
    total_paused: Duration,
}

impl SequencePauseGate {
    /// Open gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the gate. On the first hold the animation is frozen.
    pub fn acquire<A: GatedAnimation + ?Sized>(&mut self, now: Duration, anim: &mut A) -> GateTransition {
        self.count = self.count.saturating_add(1);
        if self.count > 1 {
            return GateTransition::Nested;
        }
        anim.freeze();
        self.started_at = Some(now);
        debug!("animation paused for sequence");
        GateTransition::Paused
    }

    /// Release one hold. On the last release the timeline is shifted and the
    /// loop restarts if work remains and the page is visible.
    pub fn release<A: GatedAnimation + ?Sized>(
        &mut self,
        now: Duration,
        anim: &mut A,
        page_visible: bool,
    ) -> GateTransition {
        if self.count == 0 {
            return GateTransition::Unbalanced;
        }
        self.count -= 1;
        if self.count > 0 {
            return GateTransition::StillHeld;
        }
        let elapsed = self
            .started_at
            .take()
            .map_or(Duration::ZERO, |start| now.saturating_sub(start));
        if !elapsed.is_zero() {
            anim.shift_timeline(elapsed);
        }
        self.total_paused += elapsed;
        let restart = page_visible && anim.has_pending_work();
        let restarted = anim.thaw(restart);
        debug!(elapsed_ms = elapsed.as_millis() as u64, restarted, "animation resumed");
        GateTransition::Resumed { elapsed, restarted }
    }

    /// Number of outstanding holds.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Whether anyone holds the gate.
    #[inline]
    pub fn is_paused(&self) -> bool {
        self.count > 0
    }

    /// When the current pause began.
    #[inline]
    pub fn paused_since(&self) -> Option<Duration> {
        self.started_at
    }

    /// Total time spent held over completed pauses.
    #[inline]
    pub fn total_paused(&self) -> Duration {
        self.total_paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Anim {
        running: bool,
        freezes: u32,
        births: Vec<Duration>,
    }

    impl GatedAnimation for Anim {
        fn freeze(&mut self) {
            self.running = false;
            self.freezes += 1;
        }
        fn shift_timeline(&mut self, by: Duration) {
            for b in &mut self.births {
                *b += by;
            }
        }
        fn has_pending_work(&self) -> bool {
            !self.births.is_empty()
        }
        fn thaw(&mut self, restart: bool) -> bool {
            self.running = restart;
            restart
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn nested_holds_resume_once_with_total_shift() {
        let mut gate = SequencePauseGate::new();
        let mut anim = Anim {
            running: true,
            births: vec![ms(100), ms(150)],
            ..Anim::default()
        };

        assert_eq!(gate.acquire(ms(1000), &mut anim), GateTransition::Paused);
        assert_eq!(gate.acquire(ms(1200), &mut anim), GateTransition::Nested);
        assert!(!anim.running);
        assert_eq!(anim.freezes, 1);

        assert_eq!(gate.release(ms(1500), &mut anim, true), GateTransition::StillHeld);
        assert!(!anim.running);
        assert_eq!(anim.births, vec![ms(100), ms(150)]);

        assert_eq!(
            gate.release(ms(1700), &mut anim, true),
            GateTransition::Resumed { elapsed: ms(700), restarted: true }
        );
        assert!(anim.running);
        assert_eq!(anim.births, vec![ms(800), ms(850)]);
        assert_eq!(gate.total_paused(), ms(700));
        assert!(!gate.is_paused());
    }

    #[test]
    fn release_without_hold_is_ignored() {
        let mut gate = SequencePauseGate::new();
        let mut anim = Anim::default();
        assert_eq!(gate.release(ms(10), &mut anim, true), GateTransition::Unbalanced);
        assert_eq!(gate.count(), 0);
    }

    #[test]
    fn hidden_page_or_no_work_keeps_loop_stopped() {
        let mut gate = SequencePauseGate::new();
        let mut anim = Anim {
            births: vec![ms(0)],
            ..Anim::default()
        };
        gate.acquire(ms(0), &mut anim);
        assert_eq!(
            gate.release(ms(50), &mut anim, false),
            GateTransition::Resumed { elapsed: ms(50), restarted: false }
        );
        assert!(!anim.running);

        let mut idle = Anim::default();
        gate.acquire(ms(100), &mut idle);
        assert_eq!(gate.paused_since(), Some(ms(100)));
        assert_eq!(
            gate.release(ms(160), &mut idle, true),
            GateTransition::Resumed { elapsed: ms(60), restarted: false }
        );
    }
}
