#![forbid(unsafe_code)]

//! Single-resolution values.
//!
//! [`Deferred`] is the one at-most-once primitive of the crate. Component
//! readiness, aggregate readiness, glass surface readiness, and the
//! hardware-acceleration advisory are all built on it.
//!
//! # Invariants
//!
//! 1. A deferred transitions unresolved → resolved exactly once.
//! 2. Later [`resolve`](Deferred::resolve) calls are no-ops that hand back
//!    the cached value.
//! 3. Any number of [`Wait`] futures may be created, before or after
//!    resolution; each completes with a clone of the cached value.
//!
//! The futures are single-threaded (`Rc` based) and never block: a pending
//! [`Wait`] parks its waker, which is woken by the resolving call.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

#[derive(Debug)]
struct Slot<T> {
    value: Option<T>,
    wakers: Vec<Waker>,
}

/// Outcome of a [`Deferred::resolve`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum Settle<T> {
    /// This call resolved the deferred; carries the stored value.
    First(T),
    /// The deferred was already resolved; carries the originally stored value.
    Cached(T),
}

impl<T> Settle<T> {
    /// Whether this call performed the resolution.
    #[must_use]
    pub fn is_first(&self) -> bool {
        matches!(self, Self::First(_))
    }

    /// The stored value, regardless of which call stored it.
    #[must_use]
    pub fn into_value(self) -> T {
        match self {
            Self::First(v) | Self::Cached(v) => v,
        }
    }
}

/// A value container that resolves at most once and can be awaited many times.
///
/// Clones share state.
#[derive(Debug)]
pub struct Deferred<T> {
    slot: Rc<RefCell<Slot<T>>>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T: Clone> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Deferred<T> {
    /// Create an unresolved deferred.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Rc::new(RefCell::new(Slot {
                value: None,
                wakers: Vec::new(),
            })),
        }
    }

    /// Resolve with `value` unless already resolved.
    pub fn resolve(&self, value: T) -> Settle<T> {
        let wakers = {
            let mut slot = self.slot.borrow_mut();
            if let Some(existing) = &slot.value {
                return Settle::Cached(existing.clone());
            }
            slot.value = Some(value.clone());
            std::mem::take(&mut slot.wakers)
        };
        for waker in wakers {
            waker.wake();
        }
        Settle::First(value)
    }

    /// Whether a value has been stored.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.slot.borrow().value.is_some()
    }

    /// A clone of the stored value, if resolved.
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.slot.borrow().value.clone()
    }

    /// A future completing with the stored value.
    #[must_use]
    pub fn wait(&self) -> Wait<T> {
        Wait {
            slot: Rc::clone(&self.slot),
        }
    }
}

/// Future returned by [`Deferred::wait`].
#[derive(Debug)]
#[must_use = "futures do nothing unless awaited"]
pub struct Wait<T> {
    slot: Rc<RefCell<Slot<T>>>,
}

impl<T: Clone> Wait<T> {
    /// The value if already available, without registering a waker.
    #[must_use]
    pub fn now_or_never(&self) -> Option<T> {
        self.slot.borrow().value.clone()
    }
}

impl<T: Clone> Future for Wait<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let mut slot = self.slot.borrow_mut();
        if let Some(value) = &slot.value {
            return Poll::Ready(value.clone());
        }
        if !slot.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            slot.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::task::Waker;

    fn poll_once<T: Clone>(wait: &mut Wait<T>) -> Poll<T> {
        let mut cx = Context::from_waker(Waker::noop());
        Pin::new(wait).poll(&mut cx)
    }

    #[test]
    fn first_resolution_wins() {
        let d = Deferred::new();
        assert!(!d.is_resolved());
        assert_eq!(d.resolve(1), Settle::First(1));
        assert_eq!(d.resolve(2), Settle::Cached(1));
        assert_eq!(d.get(), Some(1));
    }

    #[test]
    fn wait_is_pending_until_resolved() {
        let d: Deferred<&str> = Deferred::new();
        let mut early = d.wait();
        assert_eq!(poll_once(&mut early), Poll::Pending);

        d.resolve("ready");
        assert_eq!(poll_once(&mut early), Poll::Ready("ready"));

        let late = d.wait();
        assert_eq!(pollster::block_on(late), "ready");
    }

    #[test]
    fn clones_share_state() {
        let a: Deferred<u8> = Deferred::new();
        let b = a.clone();
        b.resolve(7);
        assert!(a.is_resolved());
        assert_eq!(a.wait().now_or_never(), Some(7));
    }

    #[test]
    fn settle_reports_origin() {
        assert!(Settle::First(()).is_first());
        assert!(!Settle::Cached(()).is_first());
        assert_eq!(Settle::Cached(3).into_value(), 3);
    }
}
