#![forbid(unsafe_code)]

//! Exclusive media playback.
//!
//! [`MediaPlaybackCoordinator`] keeps at most one managed element playing
//! across *both* kinds: starting a video pauses every other video and every
//! audio, and starting an audio pauses every other audio and every video.
//! The host forwards element events (`play`, `pause`, `ended`, viewport
//! intersection) to the `notify_*` methods; UI sequencing calls
//! [`pause_all`](MediaPlaybackCoordinator::pause_all).
//!
//! # Invariants
//!
//! 1. After any coordinator call returns, at most one managed element is
//!    playing, and it is the one named by `current_video` or
//!    `current_audio`.
//! 2. `current_*` only ever names a registered element.
//! 3. Registration followed by deregistration leaves no residual state.
//!
//! # Failure Modes
//!
//! Play requests refused by the environment are logged, never propagated;
//! the element is reconciled to "paused".

use core::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PlaybackError;
use crate::event::{Emitter, SubscriptionId};

// ---------------------------------------------------------------------------
// Element seam
// ---------------------------------------------------------------------------

/// Identifier of a registered element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MediaId(u64);

impl MediaId {
    /// Raw value, as handed to the page.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Exclusivity domain member kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// `<video>`; also observed for viewport visibility.
    Video,
    /// `<audio>`; optionally backed by a [`TrackList`].
    Audio,
}

/// A playable element. Methods take `&self` like DOM handles do.
pub trait MediaElement {
    /// Whether playback is paused.
    fn is_paused(&self) -> bool;
    /// Whether playback reached the end.
    fn is_ended(&self) -> bool;
    /// Request pause.
    fn pause(&self);
    /// Request playback. An `Err` means the environment refused.
    fn play(&self) -> Result<(), PlaybackError>;
    /// Seek to the start.
    fn rewind(&self);
    /// Current source URI.
    fn source(&self) -> String;
    /// Replace the source URI.
    fn set_source(&self, src: &str);
    /// Reload after a source change.
    fn load(&self);

    /// Neither paused nor ended.
    fn is_playing(&self) -> bool {
        !self.is_paused() && !self.is_ended()
    }
}

/// Viewport visibility observation for videos.
pub trait ViewportObserver {
    /// Start reporting intersection changes of `id`.
    fn observe(&mut self, id: MediaId);
    /// Stop reporting intersection changes of `id`.
    fn unobserve(&mut self, id: MediaId);
}

/// Media coordination settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MediaConfig {
    /// Videos whose visible ratio falls below this are paused. Default: 0.1.
    pub visibility_threshold: f64,
    /// Accessible label of audio messages without their own. Default: "Audio message".
    pub default_audio_label: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: 0.1,
            default_audio_label: "Audio message".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Track lists
// ---------------------------------------------------------------------------

/// Ordered sources of a multi-track audio message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackList {
    tracks: Vec<String>,
    index: usize,
    label: String,
}

impl TrackList {
    /// Build from source URIs. Blank entries are dropped; `fallback` is used
    /// when nothing remains. The index is clamped into range.
    pub fn new<I, S>(tracks: I, fallback: &str, index: i64, label: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tracks: Vec<String> = tracks
            .into_iter()
            .map(|t| t.as_ref().trim().to_owned())
            .filter(|t| !t.is_empty())
            .collect();
        if tracks.is_empty() && !fallback.is_empty() {
            tracks.push(fallback.to_owned());
        }
        let last = tracks.len().saturating_sub(1) as i64;
        let index = index.clamp(0, last) as usize;
        Self {
            tracks,
            index,
            label: label.into(),
        }
    }

    /// Parse a `data-audio-tracks` JSON array. Non-string entries are
    /// dropped; malformed JSON falls back to `fallback`.
    pub fn from_json_attr(
        attr: &str,
        fallback: &str,
        index_attr: Option<&str>,
        label: impl Into<String>,
    ) -> Self {
        let parsed: Vec<String> = match serde_json::from_str::<serde_json::Value>(attr) {
            Ok(serde_json::Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect(),
            _ => Vec::new(),
        };
        let index = index_attr
            .and_then(|s| s.trim().parse::<i64>().ok())
            .unwrap_or(0);
        Self::new(parsed, fallback, index, label)
    }

    /// Number of tracks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Whether there are no tracks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Index of the selected track.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.index
    }

    /// Source of the selected track.
    #[must_use]
    pub fn current_source(&self) -> Option<&str> {
        self.tracks.get(self.index).map(String::as_str)
    }

    /// Whether navigation controls apply.
    #[must_use]
    pub fn has_multiple(&self) -> bool {
        self.tracks.len() > 1
    }

    /// Wrap any integer into `0..len`.
    #[must_use]
    pub fn wrap(&self, index: isize) -> Option<usize> {
        let total = isize::try_from(self.tracks.len()).ok()?;
        if total == 0 {
            return None;
        }
        Some(index.rem_euclid(total) as usize)
    }

    fn select(&mut self, index: usize) {
        self.index = index;
    }

    /// Accessible label of the message, e.g. `Audio message (2 of 3)`.
    #[must_use]
    pub fn aria_label(&self) -> String {
        if self.has_multiple() {
            format!("{} ({} of {})", self.label, self.index + 1, self.len())
        } else {
            self.label.clone()
        }
    }

    /// Label of the "previous" control.
    #[must_use]
    pub fn previous_label(&self) -> String {
        self.nav_label("Previous", -1)
    }

    /// Label of the "next" control.
    #[must_use]
    pub fn next_label(&self) -> String {
        self.nav_label("Next", 1)
    }

    fn nav_label(&self, verb: &str, step: isize) -> String {
        if !self.has_multiple() {
            return format!("{verb} audio message");
        }
        let target = self.wrap(self.index as isize + step).unwrap_or(0);
        format!("{verb} audio ({} of {})", target + 1, self.len())
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Result of a routed play request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Playback started; others were paused.
    Started,
    /// Already playing; nothing changed.
    AlreadyPlaying,
    /// The environment refused; the element is considered paused.
    Rejected,
    /// `toggle` paused a playing element.
    Paused,
}

/// Result of a track switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSwitch {
    /// The element has no tracks.
    NoTracks,
    /// The wrapped target equals the current index.
    Unchanged,
    /// Switched to `index`; `resumed` tells whether playback restarted.
    Switched {
        /// New index.
        index: usize,
        /// Playback restarted on the new track.
        resumed: bool,
    },
}

/// Notification emitted by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    /// An element became the current player.
    Started {
        /// Element.
        id: MediaId,
        /// Its kind.
        kind: MediaKind,
    },
    /// An element stopped (paused, ended, rejected).
    Stopped {
        /// Element.
        id: MediaId,
        /// Its kind.
        kind: MediaKind,
    },
    /// A video was paused for leaving the viewport.
    LeftViewport(MediaId),
    /// An audio message switched track.
    TrackChanged {
        /// Element.
        id: MediaId,
        /// New index.
        index: usize,
    },
}

struct Managed {
    id: MediaId,
    kind: MediaKind,
    element: Rc<dyn MediaElement>,
    tracks: Option<TrackList>,
    observed: bool,
}

/// Single exclusivity domain over registered video and audio elements.
pub struct MediaPlaybackCoordinator {
    config: MediaConfig,
    next_id: u64,
    managed: Vec<Managed>,
    current_video: Option<MediaId>,
    current_audio: Option<MediaId>,
    observer: Option<Box<dyn ViewportObserver>>,
    events: Emitter<MediaEvent>,
}

impl fmt::Debug for MediaPlaybackCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaPlaybackCoordinator")
            .field("managed", &self.managed.len())
            .field("current_video", &self.current_video)
            .field("current_audio", &self.current_audio)
            .finish()
    }
}

impl Default for MediaPlaybackCoordinator {
    fn default() -> Self {
        Self::new(MediaConfig::default())
    }
}

impl MediaPlaybackCoordinator {
    /// Empty coordinator.
    #[must_use]
    pub fn new(config: MediaConfig) -> Self {
        Self {
            config,
            next_id: 1,
            managed: Vec::new(),
            current_video: None,
            current_audio: None,
            observer: None,
            events: Emitter::new(),
        }
    }

    /// Install the viewport observer used for videos registered afterwards.
    pub fn set_viewport_observer(&mut self, observer: Box<dyn ViewportObserver>) {
        self.observer = Some(observer);
    }

    /// Begin tracking `element`. Registering the same handle again returns
    /// the existing id. An element that is already playing takes over the
    /// exclusivity domain immediately.
    pub fn register(&mut self, element: Rc<dyn MediaElement>, kind: MediaKind) -> MediaId {
        if let Some(existing) = self
            .managed
            .iter()
            .find(|m| Rc::ptr_eq(&m.element, &element))
        {
            return existing.id;
        }
        let id = MediaId(self.next_id);
        self.next_id += 1;
        let observed = kind == MediaKind::Video;
        if observed && let Some(observer) = &mut self.observer {
            observer.observe(id);
        }
        let playing = element.is_playing();
        self.managed.push(Managed {
            id,
            kind,
            element,
            tracks: None,
            observed,
        });
        debug!(%id, ?kind, "media registered");
        if playing {
            self.began_playing(id);
        }
        id
    }

    /// Register an audio message backed by `tracks` and load its selected
    /// source if the element is not already pointing at it.
    pub fn register_audio_tracks(
        &mut self,
        element: Rc<dyn MediaElement>,
        tracks: TrackList,
    ) -> MediaId {
        let id = self.register(Rc::clone(&element), MediaKind::Audio);
        if let Some(src) = tracks.current_source()
            && element.source() != src
        {
            element.set_source(src);
            element.load();
        }
        if let Some(entry) = self.entry_mut(id) {
            entry.tracks = Some(tracks);
        }
        id
    }

    /// Stop tracking `id`. Returns `false` if it was not registered.
    pub fn deregister(&mut self, id: MediaId) -> bool {
        let Some(pos) = self.managed.iter().position(|m| m.id == id) else {
            return false;
        };
        let entry = self.managed.remove(pos);
        if entry.observed
            && let Some(observer) = &mut self.observer
        {
            observer.unobserve(id);
        }
        if self.current_video == Some(id) {
            self.current_video = None;
        }
        if self.current_audio == Some(id) {
            self.current_audio = None;
        }
        debug!(%id, "media deregistered");
        true
    }

    // -- element events --------------------------------------------------

    /// The element fired `play`.
    pub fn notify_play(&mut self, id: MediaId) {
        if self.entry(id).is_some() {
            self.began_playing(id);
        }
    }

    /// The element fired `pause`.
    pub fn notify_pause(&mut self, id: MediaId) {
        let Some(entry) = self.entry(id) else { return };
        if !entry.element.is_playing() {
            let kind = entry.kind;
            self.clear_current(id, kind);
        }
    }

    /// The element fired `ended`. Audio messages rewind for replay.
    pub fn notify_ended(&mut self, id: MediaId) {
        let Some(entry) = self.entry(id) else { return };
        let kind = entry.kind;
        if kind == MediaKind::Audio {
            entry.element.rewind();
        }
        self.clear_current(id, kind);
    }

    /// An asynchronous play request was refused after the fact.
    pub fn notify_play_rejected(&mut self, id: MediaId) {
        let Some(entry) = self.entry(id) else { return };
        warn!(%id, "playback rejected");
        if !entry.element.is_playing() {
            let kind = entry.kind;
            self.clear_current(id, kind);
        }
    }

    /// Visible ratio of a video changed. Returns `true` if it was paused.
    pub fn notify_intersection(&mut self, id: MediaId, ratio: f64) -> bool {
        let threshold = self.config.visibility_threshold;
        let Some(entry) = self.entry(id) else {
            return false;
        };
        if entry.kind != MediaKind::Video || ratio >= threshold || !entry.element.is_playing() {
            return false;
        }
        self.pause_one(id);
        self.events.emit(&MediaEvent::LeftViewport(id));
        true
    }

    // -- commands --------------------------------------------------------

    /// Start `id` through the coordinator.
    pub fn play(&mut self, id: MediaId) -> Result<PlayOutcome, PlaybackError> {
        let entry = self.entry(id).ok_or(PlaybackError::UnknownElement(id))?;
        if entry.element.is_playing() {
            return Ok(PlayOutcome::AlreadyPlaying);
        }
        let element = Rc::clone(&entry.element);
        Ok(self.start(id, &*element))
    }

    /// Pause `id` if playing, otherwise start it.
    pub fn toggle(&mut self, id: MediaId) -> Result<PlayOutcome, PlaybackError> {
        let entry = self.entry(id).ok_or(PlaybackError::UnknownElement(id))?;
        if entry.element.is_playing() {
            self.pause_one(id);
            Ok(PlayOutcome::Paused)
        } else {
            self.play(id)
        }
    }

    /// Select track `index` (wrapped in both directions) of an audio message.
    ///
    /// The element is paused, rewound and reloaded. Playback resumes when it
    /// was playing before, or when `autoplay` says so.
    pub fn set_track(
        &mut self,
        id: MediaId,
        index: isize,
        autoplay: Option<bool>,
        force: bool,
    ) -> Result<TrackSwitch, PlaybackError> {
        let entry = self.entry_mut(id).ok_or(PlaybackError::UnknownElement(id))?;
        let Some(tracks) = entry.tracks.as_mut() else {
            return Ok(TrackSwitch::NoTracks);
        };
        let Some(target) = tracks.wrap(index) else {
            return Ok(TrackSwitch::NoTracks);
        };
        if !force && target == tracks.current_index() {
            return Ok(TrackSwitch::Unchanged);
        }
        tracks.select(target);
        let src = tracks.current_source().map(str::to_owned);
        let element = Rc::clone(&entry.element);
        let kind = entry.kind;

        let was_playing = autoplay.unwrap_or_else(|| element.is_playing());
        element.pause();
        element.rewind();
        if let Some(src) = src
            && element.source() != src
        {
            element.set_source(&src);
        }
        element.load();
        self.clear_current(id, kind);
        self.events
            .emit(&MediaEvent::TrackChanged { id, index: target });
        debug!(%id, index = target, "audio track switched");

        let resumed = was_playing && self.start(id, &*element) == PlayOutcome::Started;
        Ok(TrackSwitch::Switched {
            index: target,
            resumed,
        })
    }

    /// Step to the next track.
    pub fn next_track(&mut self, id: MediaId) -> Result<TrackSwitch, PlaybackError> {
        let current = self.current_track(id)?;
        self.set_track(id, current as isize + 1, None, false)
    }

    /// Step to the previous track.
    pub fn previous_track(&mut self, id: MediaId) -> Result<TrackSwitch, PlaybackError> {
        let current = self.current_track(id)?;
        self.set_track(id, current as isize - 1, None, false)
    }

    /// Pause every managed element of both kinds except `except`.
    /// Returns how many were paused.
    pub fn pause_all(&mut self, except: Option<MediaId>) -> usize {
        self.pause_matching(|m| Some(m.id) != except)
    }

    /// Pause every managed video except `except`.
    pub fn pause_all_videos(&mut self, except: Option<MediaId>) -> usize {
        self.pause_matching(|m| m.kind == MediaKind::Video && Some(m.id) != except)
    }

    /// Pause every managed audio except `except`.
    pub fn pause_all_audios(&mut self, except: Option<MediaId>) -> usize {
        self.pause_matching(|m| m.kind == MediaKind::Audio && Some(m.id) != except)
    }

    // -- queries ---------------------------------------------------------

    /// The video currently holding the domain.
    #[must_use]
    pub fn current_video(&self) -> Option<MediaId> {
        self.current_video
    }

    /// The audio currently holding the domain.
    #[must_use]
    pub fn current_audio(&self) -> Option<MediaId> {
        self.current_audio
    }

    /// Whichever element currently holds the domain.
    #[must_use]
    pub fn now_playing(&self) -> Option<MediaId> {
        self.current_video.or(self.current_audio)
    }

    /// Whether `id` is registered.
    #[must_use]
    pub fn is_managed(&self, id: MediaId) -> bool {
        self.entry(id).is_some()
    }

    /// Kind of `id`.
    #[must_use]
    pub fn kind(&self, id: MediaId) -> Option<MediaKind> {
        self.entry(id).map(|m| m.kind)
    }

    /// Track list of an audio message.
    #[must_use]
    pub fn tracks(&self, id: MediaId) -> Option<&TrackList> {
        self.entry(id).and_then(|m| m.tracks.as_ref())
    }

    /// Whether `id` is under viewport observation.
    #[must_use]
    pub fn is_observed(&self, id: MediaId) -> bool {
        self.entry(id).is_some_and(|m| m.observed)
    }

    /// Number of videos under viewport observation.
    #[must_use]
    pub fn observed_count(&self) -> usize {
        self.managed.iter().filter(|m| m.observed).count()
    }

    /// Number of registered elements.
    #[must_use]
    pub fn managed_count(&self) -> usize {
        self.managed.len()
    }

    /// Ids of registered elements, in registration order.
    pub fn ids(&self) -> impl Iterator<Item = MediaId> + '_ {
        self.managed.iter().map(|m| m.id)
    }

    /// Subscribe to playback notifications.
    pub fn subscribe(&mut self, handler: impl FnMut(&MediaEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(handler)
    }

    /// Remove a subscription.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    // -- internals -------------------------------------------------------

    fn entry(&self, id: MediaId) -> Option<&Managed> {
        self.managed.iter().find(|m| m.id == id)
    }

    fn entry_mut(&mut self, id: MediaId) -> Option<&mut Managed> {
        self.managed.iter_mut().find(|m| m.id == id)
    }

    fn current_track(&self, id: MediaId) -> Result<usize, PlaybackError> {
        let entry = self.entry(id).ok_or(PlaybackError::UnknownElement(id))?;
        Ok(entry.tracks.as_ref().map_or(0, TrackList::current_index))
    }

    fn start(&mut self, id: MediaId, element: &dyn MediaElement) -> PlayOutcome {
        if let Some(MediaKind::Audio) = self.kind(id) {
            self.pause_all_audios(Some(id));
        }
        match element.play() {
            Ok(()) => {
                self.began_playing(id);
                PlayOutcome::Started
            }
            Err(err) => {
                warn!(%id, error = %err, "playback rejected");
                if let Some(kind) = self.kind(id) {
                    self.clear_current(id, kind);
                }
                PlayOutcome::Rejected
            }
        }
    }

    fn began_playing(&mut self, id: MediaId) {
        let Some(kind) = self.kind(id) else { return };
        match kind {
            MediaKind::Video => {
                self.pause_all_videos(Some(id));
                self.pause_all_audios(None);
                self.current_video = Some(id);
            }
            MediaKind::Audio => {
                self.pause_all_audios(Some(id));
                self.pause_all_videos(None);
                self.current_audio = Some(id);
            }
        }
        self.events.emit(&MediaEvent::Started { id, kind });
    }

    fn pause_matching(&mut self, mut select: impl FnMut(&Managed) -> bool) -> usize {
        let targets: Vec<MediaId> = self
            .managed
            .iter()
            .filter(|m| select(m) && !m.element.is_paused())
            .map(|m| m.id)
            .collect();
        for id in &targets {
            self.pause_one(*id);
        }
        targets.len()
    }

    fn pause_one(&mut self, id: MediaId) {
        let Some(entry) = self.entry(id) else { return };
        let kind = entry.kind;
        if !entry.element.is_paused() {
            entry.element.pause();
        }
        self.clear_current(id, kind);
    }

    fn clear_current(&mut self, id: MediaId, kind: MediaKind) {
        let slot = match kind {
            MediaKind::Video => &mut self.current_video,
            MediaKind::Audio => &mut self.current_audio,
        };
        if *slot == Some(id) {
            *slot = None;
            self.events.emit(&MediaEvent::Stopped { id, kind });
        }
    }
}

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

/// `m:ss` for a playback position in seconds. Non-finite and non-positive
/// values render as `0:00`.
#[must_use]
pub fn format_playback_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_owned();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Duration badge of an audio message: full length while paused, remaining
/// time while playing, elapsed time when the length is unknown.
#[must_use]
pub fn duration_label(duration: f64, current_time: f64, paused: bool) -> String {
    if duration.is_finite() && duration > 0.0 {
        let value = if paused {
            duration
        } else {
            (duration - current_time).max(0.0)
        };
        format_playback_time(value)
    } else if current_time > 0.0 {
        format_playback_time(current_time)
    } else {
        format_playback_time(0.0)
    }
}

/// Progress in `0.0..=1.0`; `0.0` when the length is unknown.
#[must_use]
pub fn progress_ratio(current_time: f64, duration: f64) -> f64 {
    if !duration.is_finite() || duration == 0.0 {
        return 0.0;
    }
    (current_time / duration).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct FakeMedia {
        playing: Cell<bool>,
        ended: Cell<bool>,
        refuse: Cell<bool>,
        src: RefCell<String>,
        loads: Cell<u32>,
        rewinds: Cell<u32>,
    }

    impl MediaElement for FakeMedia {
        fn is_paused(&self) -> bool {
            !self.playing.get()
        }
        fn is_ended(&self) -> bool {
            self.ended.get()
        }
        fn pause(&self) {
            self.playing.set(false);
        }
        fn play(&self) -> Result<(), PlaybackError> {
            if self.refuse.get() {
                return Err(PlaybackError::Rejected("NotAllowedError".into()));
            }
            self.playing.set(true);
            self.ended.set(false);
            Ok(())
        }
        fn rewind(&self) {
            self.rewinds.set(self.rewinds.get() + 1);
        }
        fn source(&self) -> String {
            self.src.borrow().clone()
        }
        fn set_source(&self, src: &str) {
            *self.src.borrow_mut() = src.to_owned();
        }
        fn load(&self) {
            self.loads.set(self.loads.get() + 1);
        }
    }

    #[derive(Default)]
    struct RecordingObserver(Rc<RefCell<Vec<(bool, MediaId)>>>);

    impl ViewportObserver for RecordingObserver {
        fn observe(&mut self, id: MediaId) {
            self.0.borrow_mut().push((true, id));
        }
        fn unobserve(&mut self, id: MediaId) {
            self.0.borrow_mut().push((false, id));
        }
    }

    fn fake() -> Rc<FakeMedia> {
        Rc::new(FakeMedia::default())
    }

    #[test]
    fn starting_one_pauses_every_other_kind() {
        let mut media = MediaPlaybackCoordinator::default();
        let (a, b, c) = (fake(), fake(), fake());
        let ia = media.register(a.clone(), MediaKind::Video);
        let ib = media.register(b.clone(), MediaKind::Video);
        let ic = media.register(c.clone(), MediaKind::Audio);

        assert_eq!(media.play(ia).unwrap(), PlayOutcome::Started);
        assert_eq!(media.play(ib).unwrap(), PlayOutcome::Started);
        assert!(a.is_paused());
        assert!(b.is_playing());
        assert_eq!(media.current_video(), Some(ib));

        assert_eq!(media.play(ic).unwrap(), PlayOutcome::Started);
        assert!(b.is_paused());
        assert!(c.is_playing());
        assert_eq!(media.current_video(), None);
        assert_eq!(media.now_playing(), Some(ic));
    }

    #[test]
    fn externally_started_element_is_reconciled_on_play_event() {
        let mut media = MediaPlaybackCoordinator::default();
        let (a, b) = (fake(), fake());
        let ia = media.register(a.clone(), MediaKind::Audio);
        let ib = media.register(b.clone(), MediaKind::Video);
        media.play(ia).unwrap();

        b.play().unwrap();
        media.notify_play(ib);
        assert!(a.is_paused());
        assert_eq!(media.current_audio(), None);
        assert_eq!(media.current_video(), Some(ib));
    }

    #[test]
    fn registering_a_playing_element_enforces_exclusivity() {
        let mut media = MediaPlaybackCoordinator::default();
        let a = fake();
        let ia = media.register(a.clone(), MediaKind::Video);
        media.play(ia).unwrap();

        let b = fake();
        b.play().unwrap();
        let ib = media.register(b.clone(), MediaKind::Audio);
        assert!(a.is_paused());
        assert_eq!(media.current_audio(), Some(ib));
    }

    #[test]
    fn duplicate_registration_returns_same_id() {
        let mut media = MediaPlaybackCoordinator::default();
        let a = fake();
        let first = media.register(a.clone(), MediaKind::Video);
        let second = media.register(a, MediaKind::Video);
        assert_eq!(first, second);
        assert_eq!(media.managed_count(), 1);
    }

    #[test]
    fn deregister_leaves_no_residue() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut media = MediaPlaybackCoordinator::default();
        media.set_viewport_observer(Box::new(RecordingObserver(Rc::clone(&log))));
        let a = fake();
        let ia = media.register(a.clone(), MediaKind::Video);
        media.play(ia).unwrap();
        assert!(media.is_observed(ia));

        assert!(media.deregister(ia));
        assert!(!media.deregister(ia));
        assert_eq!(media.current_video(), None);
        assert_eq!(media.observed_count(), 0);
        assert_eq!(*log.borrow(), vec![(true, ia), (false, ia)]);
        assert_eq!(media.play(ia), Err(PlaybackError::UnknownElement(ia)));
    }

    #[test]
    fn pause_and_ended_clear_the_current_reference() {
        let mut media = MediaPlaybackCoordinator::default();
        let a = fake();
        let ia = media.register(a.clone(), MediaKind::Audio);
        media.play(ia).unwrap();

        // A stale pause event while still playing is ignored.
        media.notify_pause(ia);
        assert_eq!(media.current_audio(), Some(ia));

        a.ended.set(true);
        media.notify_ended(ia);
        assert_eq!(media.current_audio(), None);
        assert_eq!(a.rewinds.get(), 1);
    }

    #[test]
    fn rejected_play_is_reconciled_to_paused() {
        let mut media = MediaPlaybackCoordinator::default();
        let (a, b) = (fake(), fake());
        let ia = media.register(a.clone(), MediaKind::Audio);
        let ib = media.register(b.clone(), MediaKind::Audio);
        media.play(ia).unwrap();

        b.refuse.set(true);
        assert_eq!(media.play(ib).unwrap(), PlayOutcome::Rejected);
        assert!(b.is_paused());
        assert_eq!(media.current_audio(), None);
        assert!(a.is_paused(), "audio exclusivity applies before play()");
    }

    #[test]
    fn leaving_the_viewport_pauses_videos_only() {
        let mut media = MediaPlaybackCoordinator::default();
        let (v, s) = (fake(), fake());
        let iv = media.register(v.clone(), MediaKind::Video);
        let is = media.register(s.clone(), MediaKind::Audio);
        media.play(iv).unwrap();

        assert!(!media.notify_intersection(iv, 0.5));
        assert!(media.notify_intersection(iv, 0.05));
        assert!(v.is_paused());
        assert_eq!(media.current_video(), None);

        media.play(is).unwrap();
        assert!(!media.notify_intersection(is, 0.0));
        assert!(s.is_playing());
    }

    #[test]
    fn toggle_flips_state() {
        let mut media = MediaPlaybackCoordinator::default();
        let a = fake();
        let ia = media.register(a.clone(), MediaKind::Audio);
        assert_eq!(media.toggle(ia).unwrap(), PlayOutcome::Started);
        assert_eq!(media.toggle(ia).unwrap(), PlayOutcome::Paused);
        assert!(a.is_paused());
        assert_eq!(media.now_playing(), None);
    }

    #[test]
    fn pause_all_respects_exception() {
        let mut media = MediaPlaybackCoordinator::default();
        let (a, b) = (fake(), fake());
        let ia = media.register(a.clone(), MediaKind::Video);
        let _ib = media.register(b.clone(), MediaKind::Audio);
        a.play().unwrap();
        b.play().unwrap();

        assert_eq!(media.pause_all(Some(ia)), 1);
        assert!(a.is_playing());
        assert!(b.is_paused());
        assert_eq!(media.pause_all(None), 1);
        assert!(a.is_paused());
    }

    #[test]
    fn track_switch_wraps_reloads_and_resumes() {
        let mut media = MediaPlaybackCoordinator::default();
        let a = fake();
        let tracks = TrackList::new(["one.mp3", " ", "two.mp3", "three.mp3"], "", 0, "Audio message");
        let ia = media.register_audio_tracks(a.clone(), tracks);
        assert_eq!(a.source(), "one.mp3");
        assert_eq!(a.loads.get(), 1);

        assert_eq!(media.set_track(ia, 0, None, false).unwrap(), TrackSwitch::Unchanged);

        media.play(ia).unwrap();
        assert_eq!(
            media.previous_track(ia).unwrap(),
            TrackSwitch::Switched { index: 2, resumed: true }
        );
        assert_eq!(a.source(), "three.mp3");
        assert!(a.is_playing());
        assert_eq!(media.current_audio(), Some(ia));

        media.pause_all(None);
        assert_eq!(
            media.next_track(ia).unwrap(),
            TrackSwitch::Switched { index: 0, resumed: false }
        );
        assert!(a.is_paused());

        a.refuse.set(true);
        assert_eq!(
            media.set_track(ia, 7, Some(true), false).unwrap(),
            TrackSwitch::Switched { index: 1, resumed: false }
        );
        assert_eq!(media.current_audio(), None);

        assert_eq!(
            media.set_track(ia, 1, Some(false), true).unwrap(),
            TrackSwitch::Switched { index: 1, resumed: false }
        );
    }

    #[test]
    fn track_labels() {
        let tracks = TrackList::new(["a", "b", "c"], "", 0, "Voice note");
        assert_eq!(tracks.aria_label(), "Voice note (1 of 3)");
        assert_eq!(tracks.previous_label(), "Previous audio (3 of 3)");
        assert_eq!(tracks.next_label(), "Next audio (2 of 3)");

        let single = TrackList::from_json_attr("not json", "solo.mp3", Some("4"), "Audio message");
        assert_eq!(single.len(), 1);
        assert_eq!(single.current_index(), 0);
        assert_eq!(single.aria_label(), "Audio message");
        assert_eq!(single.next_label(), "Next audio message");

        let parsed = TrackList::from_json_attr(r#"["x", 3, "y"]"#, "", Some("9"), "Audio message");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.current_index(), 1);
    }

    #[test]
    fn time_formatting() {
        assert_eq!(format_playback_time(f64::NAN), "0:00");
        assert_eq!(format_playback_time(-3.0), "0:00");
        assert_eq!(format_playback_time(5.9), "0:05");
        assert_eq!(format_playback_time(125.0), "2:05");
        assert_eq!(duration_label(90.0, 30.0, false), "1:00");
        assert_eq!(duration_label(90.0, 30.0, true), "1:30");
        assert_eq!(duration_label(f64::INFINITY, 12.0, false), "0:12");
        assert_eq!(progress_ratio(3.0, 0.0), 0.0);
        assert_eq!(progress_ratio(30.0, 60.0), 0.5);
        assert_eq!(progress_ratio(90.0, 60.0), 1.0);
    }
}
