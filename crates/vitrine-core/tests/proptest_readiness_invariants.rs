//! Property-based invariant tests for readiness tracking.
//!
//! 1. Each component's stored detail is the value of its first signal.
//! 2. The aggregate resolves iff every tracked component was signaled,
//!    whatever the order, and its report is complete.
//! 3. `AllReady` is emitted at most once, after every `ComponentReady`.
//! 4. Unknown names never change state.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use proptest::prelude::*;
use vitrine_core::readiness::{ReadinessEvent, ReadinessTracker};

// ── Helpers ─────────────────────────────────────────────────────────────

const NAMES: [&str; 3] = ["canvas", "webgl", "audio"];

/// (name index, detail); index 3 is an untracked name.
fn signal_strategy() -> impl Strategy<Value = Vec<(usize, u32)>> {
    prop::collection::vec((0usize..4, any::<u32>()), 0..20)
}

fn name(index: usize) -> &'static str {
    NAMES.get(index).copied().unwrap_or("shader")
}

fn tracker() -> ReadinessTracker<u32> {
    ReadinessTracker::new(NAMES)
}

// ═════════════════════════════════════════════════════════════════════════
// 1. First signal wins
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn first_signal_wins(signals in signal_strategy()) {
        let mut tracker = tracker();
        let mut first: HashMap<&str, u32> = HashMap::new();
        for (index, detail) in &signals {
            let name = name(*index);
            let stored = tracker.signal(name, *detail);
            if *index < NAMES.len() {
                let expected = *first.entry(name).or_insert(*detail);
                prop_assert_eq!(stored, Some(expected));
            } else {
                prop_assert_eq!(stored, None);
            }
        }
        for name in NAMES {
            prop_assert_eq!(tracker.component_detail(name), first.get(name).copied());
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Aggregate resolves iff all components resolved
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn aggregate_requires_every_component(signals in signal_strategy()) {
        let mut tracker = tracker();
        let ready = tracker.when_ready();
        for (index, detail) in &signals {
            tracker.signal(name(*index), *detail);
        }
        let all = NAMES.iter().all(|n| tracker.is_component_ready(n));
        prop_assert_eq!(tracker.is_ready(), all);
        match ready.now_or_never() {
            Some(report) => {
                prop_assert!(all);
                prop_assert_eq!(report.len(), NAMES.len());
                for name in NAMES {
                    prop_assert_eq!(report.get(name).copied(), tracker.component_detail(name));
                }
            }
            None => prop_assert!(!all),
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Aggregate notification comes once, last
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn aggregate_notification_is_last_and_single(signals in signal_strategy()) {
        let mut tracker = tracker();
        let log: Rc<RefCell<Vec<Option<String>>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        tracker.subscribe(move |event| {
            let entry = match event {
                ReadinessEvent::ComponentReady { component, .. } => Some(component.clone()),
                ReadinessEvent::AllReady(_) => None,
            };
            sink.borrow_mut().push(entry);
        });
        for (index, detail) in &signals {
            tracker.signal(name(*index), *detail);
        }

        let log = log.borrow();
        let aggregates = log.iter().filter(|e| e.is_none()).count();
        prop_assert!(aggregates <= 1);
        if aggregates == 1 {
            prop_assert_eq!(log.last(), Some(&None));
            prop_assert_eq!(log.len(), NAMES.len() + 1);
        } else {
            prop_assert!(log.len() < NAMES.len());
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Unknown names are inert
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn unknown_names_are_inert(detail in any::<u32>(), unknown in "[a-z]{1,8}") {
        prop_assume!(!NAMES.contains(&unknown.as_str()));
        let mut tracker = tracker();
        prop_assert_eq!(tracker.signal(&unknown, detail), None);
        prop_assert!(!tracker.is_component_ready(&unknown));
        prop_assert!(tracker.when_component_ready(&unknown).is_err());
        prop_assert!(NAMES.iter().all(|n| !tracker.is_component_ready(n)));
    }
}
