#![forbid(unsafe_code)]

//! Shared per-frame scheduling primitive.
//!
//! The host owns the real animation-frame loop (`requestAnimationFrame` in a
//! browser). Components ask for the *next* frame through [`FrameScheduler`];
//! the host runs one frame whenever [`FrameScheduler::has_pending`] is true
//! and the coordinator drains the due clients with
//! [`FrameScheduler::take_due`]. A client that wants another frame must
//! request again, so loops terminate on their own when work runs out.
//!
//! # Invariants
//!
//! 1. A client has at most one pending request; requesting again returns the
//!    existing id.
//! 2. Due clients are returned in request order.
//! 3. Cancelled requests are never returned.

/// Per-frame callback owners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FrameClient {
    /// Frame-time sampler feeding the quality controller.
    Sampler,
    /// Cursor-trail canvas animation.
    Trail,
    /// Coalesced glass surface updates.
    Glass,
    /// One-shot hand-off that reports the background renderer ready on the
    /// frame after its instance was created.
    RendererReady,
}

/// Handle for a pending frame request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameRequestId(u64);

/// Queue of next-frame requests.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    next_id: u64,
    pending: Vec<(FrameRequestId, FrameClient)>,
}

impl FrameScheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for `client` to run on the next frame.
    pub fn request(&mut self, client: FrameClient) -> FrameRequestId {
        if let Some((id, _)) = self.pending.iter().find(|(_, c)| *c == client) {
            return *id;
        }
        self.next_id += 1;
        let id = FrameRequestId(self.next_id);
        self.pending.push((id, client));
        id
    }

    /// Cancel a request by id. Returns `false` if it was not pending.
    pub fn cancel(&mut self, id: FrameRequestId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(rid, _)| *rid != id);
        self.pending.len() != before
    }

    /// Cancel the pending request of `client`, if any.
    pub fn cancel_client(&mut self, client: FrameClient) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(_, c)| *c != client);
        self.pending.len() != before
    }

    /// Cancel everything. Returns the number of dropped requests.
    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    /// Whether `client` has a pending request.
    #[must_use]
    pub fn is_pending(&self, client: FrameClient) -> bool {
        self.pending.iter().any(|(_, c)| *c == client)
    }

    /// Whether the host should schedule another frame.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drain the clients due on this frame, in request order.
    pub fn take_due(&mut self) -> Vec<FrameClient> {
        self.pending.drain(..).map(|(_, client)| client).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_requests_collapse() {
        let mut s = FrameScheduler::new();
        let a = s.request(FrameClient::Trail);
        let b = s.request(FrameClient::Trail);
        assert_eq!(a, b);
        assert_eq!(s.take_due(), vec![FrameClient::Trail]);
        assert!(!s.has_pending());
    }

    #[test]
    fn due_clients_keep_request_order() {
        let mut s = FrameScheduler::new();
        s.request(FrameClient::RendererReady);
        s.request(FrameClient::Sampler);
        s.request(FrameClient::Trail);
        assert_eq!(
            s.take_due(),
            vec![
                FrameClient::RendererReady,
                FrameClient::Sampler,
                FrameClient::Trail
            ]
        );
    }

    #[test]
    fn cancelled_requests_never_run() {
        let mut s = FrameScheduler::new();
        let id = s.request(FrameClient::Sampler);
        s.request(FrameClient::Trail);

        assert!(s.cancel(id));
        assert!(!s.cancel(id));
        assert!(s.cancel_client(FrameClient::Trail));
        assert!(s.take_due().is_empty());

        s.request(FrameClient::Sampler);
        assert_eq!(s.cancel_all(), 1);
        assert!(!s.is_pending(FrameClient::Sampler));
    }
}
