#![forbid(unsafe_code)]

//! Deferred delivery of coordinator events.
//!
//! Events raised while the coordinator is borrowed are queued and handed
//! to page listeners from a later task, so a listener may call straight
//! back into `VitrineEffects`.

/// Events waiting for the next flush.
#[derive(Debug)]
pub struct DeferredEvents<T> {
    queue: Vec<T>,
    flush_scheduled: bool,
}

impl<T> Default for DeferredEvents<T> {
    fn default() -> Self {
        Self {
            queue: Vec::new(),
            flush_scheduled: false,
        }
    }
}

impl<T> DeferredEvents<T> {
    /// Queue `event`. Returns `true` when the caller must schedule a flush.
    pub fn push(&mut self, event: T) -> bool {
        self.queue.push(event);
        !core::mem::replace(&mut self.flush_scheduled, true)
    }

    /// Take everything queued so far; later pushes schedule a new flush.
    pub fn drain(&mut self) -> Vec<T> {
        self.flush_scheduled = false;
        core::mem::take(&mut self.queue)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
