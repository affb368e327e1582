#![forbid(unsafe_code)]

//! Typed, synchronous event emitters.
//!
//! Each component owns an [`Emitter`] for its own notification type.
//! Dispatch is synchronous and deterministic: handlers run in subscription
//! order, on the caller's stack, before `emit` returns.

use std::fmt;

/// Identifier returned by [`Emitter::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// A list of handlers for events of type `E`.
pub struct Emitter<E> {
    next_id: u64,
    handlers: Vec<(SubscriptionId, Box<dyn FnMut(&E)>)>,
}

impl<E> fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("subscribers", &self.handlers.len())
            .finish()
    }
}

impl<E> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Emitter<E> {
    /// Create an emitter with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            handlers: Vec::new(),
        }
    }

    /// Register `handler`; it receives every subsequent event.
    pub fn subscribe(&mut self, handler: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Remove a handler. Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(sid, _)| *sid != id);
        self.handlers.len() != before
    }

    /// Deliver `event` to every handler in subscription order.
    pub fn emit(&mut self, event: &E) {
        for (_, handler) in &mut self.handlers {
            handler(event);
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether nobody is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Drop every subscription.
    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn dispatch_follows_subscription_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut emitter = Emitter::new();

        let first = Rc::clone(&log);
        emitter.subscribe(move |v: &u32| first.borrow_mut().push(("first", *v)));
        let second = Rc::clone(&log);
        emitter.subscribe(move |v: &u32| second.borrow_mut().push(("second", *v)));

        emitter.emit(&3);
        assert_eq!(*log.borrow(), vec![("first", 3), ("second", 3)]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let hits = Rc::new(RefCell::new(0));
        let mut emitter = Emitter::new();
        let counter = Rc::clone(&hits);
        let id = emitter.subscribe(move |_: &()| *counter.borrow_mut() += 1);

        emitter.emit(&());
        assert!(emitter.unsubscribe(id));
        assert!(!emitter.unsubscribe(id));
        emitter.emit(&());

        assert_eq!(*hits.borrow(), 1);
        assert!(emitter.is_empty());
    }
}
