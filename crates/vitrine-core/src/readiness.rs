#![forbid(unsafe_code)]

//! Readiness tracking for independently initialized effects.
//!
//! A [`ReadinessTracker`] owns one [`Deferred`] per named component plus one
//! aggregate deferred. Page bootstrap code waits on
//! [`when_ready`](ReadinessTracker::when_ready) to dismiss the loading screen.
//!
//! # Invariants
//!
//! 1. Each component stores the detail of its *first* `signal`; later
//!    signals are ignored and return the stored detail.
//! 2. `ComponentReady` fires once per component, in resolution order.
//! 3. `AllReady` fires exactly once, after the last `ComponentReady`, and
//!    only when every component has resolved.
//! 4. Presentation markers are set exactly once each.
//!
//! # Failure Modes
//!
//! - Signals for unknown names are logged and dropped.
//! - [`when_component_ready`](ReadinessTracker::when_component_ready) with an
//!   unknown name fails immediately instead of returning a future that
//!   never completes.
//! - A failed effect still resolves its component (with
//!   [`EffectDetail::Failed`]), so aggregate readiness is never blocked.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::deferred::{Deferred, Settle, Wait};
use crate::error::EffectError;
use crate::event::{Emitter, SubscriptionId};
use crate::renderer::RendererReadyInfo;
use crate::trail::CanvasInfo;

/// Component name of the cursor-trail canvas.
pub const CANVAS: &str = "canvas";
/// Component name of the WebGL background renderer.
pub const WEBGL: &str = "webgl";

/// Global marker key set once everything is ready.
pub const READY_MARKER: &str = "effectsReady";
/// CSS class added to the document root once everything is ready.
pub const READY_CLASS: &str = "effects-ready";

/// Which components are tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReadinessConfig {
    /// Component names, in report order. Default: `["canvas", "webgl"]`.
    pub components: Vec<String>,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            components: vec![CANVAS.to_owned(), WEBGL.to_owned()],
        }
    }
}

/// Detail attached to a resolved component.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectDetail {
    /// The trail canvas is sized and has a drawing context.
    Canvas(CanvasInfo),
    /// The background renderer instance exists.
    Renderer(RendererReadyInfo),
    /// Detail supplied by the host for a component it initializes itself.
    Custom(Value),
    /// The effect could not start; the page continues degraded.
    Failed(EffectError),
}

impl EffectDetail {
    /// Whether this detail records a failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// The failure, if any.
    #[must_use]
    pub fn error(&self) -> Option<&EffectError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// JSON form handed to the page (`{kind, payload}` or `{error}`).
    #[must_use]
    pub fn to_json(&self) -> Value {
        let (kind, payload) = match self {
            Self::Canvas(info) => ("canvas", serde_json::to_value(info).unwrap_or_default()),
            Self::Renderer(info) => ("renderer", serde_json::to_value(info).unwrap_or_default()),
            Self::Custom(value) => ("custom", value.clone()),
            Self::Failed(err) => return json!({ "error": err.to_string() }),
        };
        json!({ "kind": kind, "payload": payload })
    }
}

/// Details of every component, in tracker order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadyReport<D> {
    entries: Vec<(String, D)>,
}

impl<D> ReadyReport<D> {
    /// Detail of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&D> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, detail)| detail)
    }

    /// `(name, detail)` pairs in tracker order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &D)> {
        self.entries.iter().map(|(n, d)| (n.as_str(), d))
    }

    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no components are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ReadyReport<EffectDetail> {
    /// Whether any component resolved with a failure.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.entries.iter().any(|(_, d)| d.is_failure())
    }

    /// JSON object keyed by component name.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(name, detail)| (name.clone(), detail.to_json()))
            .collect();
        Value::Object(map)
    }
}

/// Notification emitted by a [`ReadinessTracker`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReadinessEvent<D> {
    /// A component resolved for the first time.
    ComponentReady {
        /// Component name.
        component: String,
        /// Stored detail.
        payload: D,
    },
    /// Every component has resolved.
    AllReady(ReadyReport<D>),
}

/// Discoverable presentation hooks (document dataset and class list).
pub trait ReadinessMarkers {
    /// Set the boolean marker of one component, e.g. `effectsCanvasReady`.
    fn mark_component(&mut self, marker_key: &str);
    /// Set the global marker and add the "ready" CSS class.
    fn mark_all_ready(&mut self, marker_key: &str, class_name: &str);
}

/// Dataset key of a component marker: `canvas` → `effectsCanvasReady`.
#[must_use]
pub fn component_marker_key(name: &str) -> String {
    let mut chars = name.chars();
    let capitalized: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("effects{capitalized}Ready")
}

/// Tracks a fixed set of named components and their aggregate readiness.
pub struct ReadinessTracker<D = EffectDetail> {
    components: Vec<(String, Deferred<D>)>,
    aggregate: Deferred<ReadyReport<D>>,
    events: Emitter<ReadinessEvent<D>>,
    markers: Option<Box<dyn ReadinessMarkers>>,
}

impl<D> std::fmt::Debug for ReadinessTracker<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessTracker")
            .field(
                "components",
                &self.components.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .field("subscribers", &self.events.len())
            .field("markers", &self.markers.is_some())
            .finish()
    }
}

impl ReadinessTracker<EffectDetail> {
    /// Tracker for the components named in `config`.
    #[must_use]
    pub fn from_config(config: &ReadinessConfig) -> Self {
        Self::new(config.components.iter().cloned())
    }
}

impl<D: Clone> ReadinessTracker<D> {
    /// Track `names`. Duplicates are collapsed; an empty set is ready at once.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut components: Vec<(String, Deferred<D>)> = Vec::new();
        for name in names {
            let name = name.into();
            if !components.iter().any(|(n, _)| *n == name) {
                components.push((name, Deferred::new()));
            }
        }
        let aggregate = Deferred::new();
        if components.is_empty() {
            aggregate.resolve(ReadyReport {
                entries: Vec::new(),
            });
        }
        Self {
            components,
            aggregate,
            events: Emitter::new(),
            markers: None,
        }
    }

    /// Install presentation hooks. They are not replayed for components that
    /// already resolved.
    pub fn set_markers(&mut self, markers: Box<dyn ReadinessMarkers>) {
        self.markers = Some(markers);
    }

    /// Resolve `name` with `detail` unless it already resolved.
    ///
    /// Returns the stored detail (the first one ever signaled), or `None`
    /// for an unknown name.
    pub fn signal(&mut self, name: &str, detail: D) -> Option<D> {
        let Some(deferred) = self.deferred(name).cloned() else {
            warn!(component = name, "unknown effects component");
            return None;
        };
        match deferred.resolve(detail) {
            Settle::Cached(existing) => {
                debug!(component = name, "repeat signal ignored");
                Some(existing)
            }
            Settle::First(stored) => {
                debug!(component = name, "effects component ready");
                self.events.emit(&ReadinessEvent::ComponentReady {
                    component: name.to_owned(),
                    payload: stored.clone(),
                });
                if let Some(markers) = &mut self.markers {
                    markers.mark_component(&component_marker_key(name));
                }
                self.settle_aggregate();
                Some(stored)
            }
        }
    }

    /// Whether `name` has resolved. Unknown names are never ready.
    #[must_use]
    pub fn is_component_ready(&self, name: &str) -> bool {
        self.deferred(name).is_some_and(Deferred::is_resolved)
    }

    /// Stored detail of `name`, if resolved.
    #[must_use]
    pub fn component_detail(&self, name: &str) -> Option<D> {
        self.deferred(name).and_then(Deferred::get)
    }

    /// Future completing with the detail of `name`.
    pub fn when_component_ready(&self, name: &str) -> Result<Wait<D>, EffectError> {
        self.deferred(name)
            .map(Deferred::wait)
            .ok_or_else(|| EffectError::UnknownComponent(name.to_owned()))
    }

    /// Future completing with every component's detail once all resolved.
    pub fn when_ready(&self) -> Wait<ReadyReport<D>> {
        self.aggregate.wait()
    }

    /// Whether the aggregate has resolved.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.aggregate.is_resolved()
    }

    /// Tracked component names, in report order.
    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(|(n, _)| n.as_str())
    }

    /// Subscribe to readiness notifications.
    pub fn subscribe(
        &mut self,
        handler: impl FnMut(&ReadinessEvent<D>) + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(handler)
    }

    /// Remove a subscription.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    fn deferred(&self, name: &str) -> Option<&Deferred<D>> {
        self.components
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d)
    }

    fn settle_aggregate(&mut self) {
        if self.aggregate.is_resolved() {
            return;
        }
        let mut entries = Vec::with_capacity(self.components.len());
        for (name, deferred) in &self.components {
            match deferred.get() {
                Some(detail) => entries.push((name.clone(), detail)),
                None => return,
            }
        }
        let report = ReadyReport { entries };
        if !self.aggregate.resolve(report.clone()).is_first() {
            return;
        }
        info!(components = report.len(), "all effects components ready");
        if let Some(markers) = &mut self.markers {
            markers.mark_all_ready(READY_MARKER, READY_CLASS);
        }
        self.events.emit(&ReadinessEvent::AllReady(report));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    #[derive(Default)]
    struct RecordingMarkers {
        log: Rc<RefCell<Vec<String>>>,
    }

    impl ReadinessMarkers for RecordingMarkers {
        fn mark_component(&mut self, marker_key: &str) {
            self.log.borrow_mut().push(marker_key.to_owned());
        }

        fn mark_all_ready(&mut self, marker_key: &str, class_name: &str) {
            self.log
                .borrow_mut()
                .push(format!("{marker_key}+{class_name}"));
        }
    }

    fn tracker() -> ReadinessTracker<&'static str> {
        ReadinessTracker::new([CANVAS, WEBGL])
    }

    #[test]
    fn first_signal_wins() {
        let mut t = tracker();
        assert_eq!(t.signal(CANVAS, "first"), Some("first"));
        assert_eq!(t.signal(CANVAS, "second"), Some("first"));
        assert_eq!(t.component_detail(CANVAS), Some("first"));
        assert!(t.is_component_ready(CANVAS));
        assert!(!t.is_component_ready(WEBGL));
    }

    #[test]
    fn aggregate_waits_for_every_component() {
        let mut t = tracker();
        let ready = t.when_ready();
        t.signal(WEBGL, "gl");
        assert!(!t.is_ready());
        assert!(ready.now_or_never().is_none());

        t.signal(CANVAS, "2d");
        let report = pollster::block_on(ready);
        assert_eq!(report.get(CANVAS), Some(&"2d"));
        assert_eq!(report.get(WEBGL), Some(&"gl"));
        assert_eq!(
            report.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            vec![CANVAS, WEBGL]
        );
    }

    #[test]
    fn events_fire_once_and_aggregate_comes_last() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut t = tracker();
        let sink = Rc::clone(&log);
        t.subscribe(move |event| {
            let line = match event {
                ReadinessEvent::ComponentReady { component, payload } => {
                    format!("{component}={payload}")
                }
                ReadinessEvent::AllReady(report) => format!("all({})", report.len()),
            };
            sink.borrow_mut().push(line);
        });

        t.signal(WEBGL, "gl");
        t.signal(WEBGL, "again");
        t.signal(CANVAS, "2d");
        t.signal(CANVAS, "again");

        assert_eq!(
            *log.borrow(),
            vec!["webgl=gl".to_owned(), "canvas=2d".to_owned(), "all(2)".to_owned()]
        );
    }

    #[test]
    fn unknown_component_lookup_fails_fast() {
        let t = tracker();
        assert_eq!(
            t.when_component_ready("audio").unwrap_err(),
            EffectError::UnknownComponent("audio".into())
        );
        assert!(!t.is_component_ready("audio"));
    }

    #[test]
    fn component_future_resolves_after_the_fact() {
        let mut t = tracker();
        t.signal(CANVAS, "2d");
        let wait = t.when_component_ready(CANVAS).unwrap();
        assert_eq!(pollster::block_on(wait), "2d");
    }

    #[traced_test]
    #[test]
    fn unknown_signal_is_logged_and_dropped() {
        let mut t = tracker();
        assert_eq!(t.signal("audio", "x"), None);
        assert!(logs_contain("unknown effects component"));
        assert!(!t.is_ready());
    }

    #[test]
    fn markers_fire_exactly_once() {
        let markers = RecordingMarkers::default();
        let log = Rc::clone(&markers.log);
        let mut t = tracker();
        t.set_markers(Box::new(markers));

        t.signal(CANVAS, "a");
        t.signal(CANVAS, "b");
        t.signal(WEBGL, "c");
        t.signal(WEBGL, "d");

        assert_eq!(
            *log.borrow(),
            vec![
                "effectsCanvasReady".to_owned(),
                "effectsWebglReady".to_owned(),
                "effectsReady+effects-ready".to_owned(),
            ]
        );
    }

    #[test]
    fn empty_tracker_is_ready_immediately() {
        let t: ReadinessTracker<()> = ReadinessTracker::new(Vec::<String>::new());
        assert!(t.is_ready());
        assert!(pollster::block_on(t.when_ready()).is_empty());
    }

    #[test]
    fn failed_components_still_complete_the_aggregate() {
        let mut t = ReadinessTracker::from_config(&ReadinessConfig::default());
        t.signal(
            WEBGL,
            EffectDetail::Failed(EffectError::AsyncLoad("import rejected".into())),
        );
        t.signal(CANVAS, EffectDetail::Custom(json!({ "width": 10 })));

        let report = pollster::block_on(t.when_ready());
        assert!(report.is_degraded());
        assert_eq!(
            report.to_json(),
            json!({
                "canvas": { "kind": "custom", "payload": { "width": 10 } },
                "webgl": { "error": "load failed: import rejected" }
            })
        );
    }
}
