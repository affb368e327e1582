#![forbid(unsafe_code)]

//! Bookkeeping between media ids and the DOM nodes a visibility observer
//! watches.
//!
//! Ids are assigned inside `MediaPlaybackCoordinator::register`, so the
//! element of the registration in progress is staged first and claimed by
//! the observer's `observe(id)` callback.

use vitrine_core::MediaId;

/// Observed elements keyed by media id.
#[derive(Debug)]
pub struct ObservedTargets<E> {
    staged: Option<E>,
    observed: Vec<(MediaId, E)>,
}

impl<E> Default for ObservedTargets<E> {
    fn default() -> Self {
        Self {
            staged: None,
            observed: Vec::new(),
        }
    }
}

impl<E: PartialEq> ObservedTargets<E> {
    /// Element of the next `register` call.
    pub fn stage(&mut self, element: E) {
        self.staged = Some(element);
    }

    /// Drop a staged element nobody claimed (non-video registrations).
    pub fn unstage(&mut self) {
        self.staged = None;
    }

    /// Bind the staged element to `id`. Returns it for the observer to watch.
    pub fn claim(&mut self, id: MediaId) -> Option<&E> {
        let element = self.staged.take()?;
        self.observed.push((id, element));
        self.observed.last().map(|(_, el)| el)
    }

    /// Forget `id`. Returns the element the observer must stop watching.
    pub fn release(&mut self, id: MediaId) -> Option<E> {
        let pos = self.observed.iter().position(|(m, _)| *m == id)?;
        Some(self.observed.remove(pos).1)
    }

    /// Media id behind an observer entry's target.
    pub fn id_of(&self, target: &E) -> Option<MediaId> {
        self.observed
            .iter()
            .find(|(_, el)| el == target)
            .map(|(id, _)| *id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use vitrine_core::media::ViewportObserver;
    use vitrine_core::{MediaElement, MediaKind, MediaPlaybackCoordinator, PlaybackError};

    struct Clip {
        paused: Cell<bool>,
    }

    impl MediaElement for Clip {
        fn is_paused(&self) -> bool {
            self.paused.get()
        }
        fn is_ended(&self) -> bool {
            false
        }
        fn pause(&self) {
            self.paused.set(true);
        }
        fn play(&self) -> Result<(), PlaybackError> {
            self.paused.set(false);
            Ok(())
        }
        fn rewind(&self) {}
        fn source(&self) -> String {
            String::new()
        }
        fn set_source(&self, _src: &str) {}
        fn load(&self) {}
    }

    fn clip() -> Rc<dyn MediaElement> {
        Rc::new(Clip {
            paused: Cell::new(true),
        })
    }

    /// Observer recording which nodes it watches.
    struct Watcher {
        targets: Rc<RefCell<ObservedTargets<&'static str>>>,
        watching: Rc<RefCell<Vec<&'static str>>>,
    }

    impl ViewportObserver for Watcher {
        fn observe(&mut self, id: MediaId) {
            if let Some(el) = self.targets.borrow_mut().claim(id) {
                self.watching.borrow_mut().push(*el);
            }
        }

        fn unobserve(&mut self, id: MediaId) {
            if let Some(el) = self.targets.borrow_mut().release(id) {
                self.watching.borrow_mut().retain(|w| *w != el);
            }
        }
    }

    #[test]
    fn deregistered_videos_stop_being_watched() {
        let targets = Rc::new(RefCell::new(ObservedTargets::default()));
        let watching = Rc::new(RefCell::new(Vec::new()));
        let mut media = MediaPlaybackCoordinator::default();
        media.set_viewport_observer(Box::new(Watcher {
            targets: Rc::clone(&targets),
            watching: Rc::clone(&watching),
        }));

        targets.borrow_mut().stage("#hero");
        let hero = media.register(clip(), MediaKind::Video);
        targets.borrow_mut().unstage();
        targets.borrow_mut().stage("#voice");
        media.register(clip(), MediaKind::Audio);
        targets.borrow_mut().unstage();
        targets.borrow_mut().stage("#loop");
        let looped = media.register(clip(), MediaKind::Video);
        targets.borrow_mut().unstage();

        assert_eq!(*watching.borrow(), vec!["#hero", "#loop"]);
        assert_eq!(targets.borrow().id_of(&"#loop"), Some(looped));
        assert_eq!(targets.borrow().id_of(&"#voice"), None);

        assert!(media.deregister(hero));
        assert!(media.deregister(looped));
        assert!(watching.borrow().is_empty());
        assert!(targets.borrow().is_empty());
    }
}
