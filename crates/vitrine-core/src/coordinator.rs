#![forbid(unsafe_code)]

//! Top-level effect coordinator.
//!
//! [`EffectCoordinator`] owns every piece of effect state for one page and
//! is driven by the host, the same way a step program is:
//!
//! 1. [`init`](EffectCoordinator::init) once the page is parsed;
//! 2. forward environment signals (pointer, visibility, resize, profile);
//! 3. call [`frame`](EffectCoordinator::frame) once per animation frame
//!    while [`has_pending_frames`](EffectCoordinator::has_pending_frames);
//! 4. [`teardown`](EffectCoordinator::teardown) on unload.
//!
//! Every frame-driven client (quality sampler, cursor trail, glass updates,
//! renderer ready hand-off) goes through one [`FrameScheduler`].
//!
//! # Invariants
//!
//! 1. One renderer instance per coordinator; re-initialization updates it.
//! 2. Each advisory is raised at most once.
//! 3. After teardown no frame is pending and later teardowns are no-ops.
//! 4. Quality transitions reach every consumer within the detecting frame.
//!
//! # Failure Modes
//!
//! Effect failures never escape: they resolve their readiness component
//! with [`EffectDetail::Failed`], so [`when_ready`](EffectCoordinator::when_ready)
//! still completes.

use core::time::Duration;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, error, info, warn};

use crate::clock::SharedClock;
use crate::config::VitrineConfig;
use crate::deferred::{Deferred, Wait};
use crate::error::EffectError;
use crate::event::{Emitter, SubscriptionId};
use crate::frame::{FrameClient, FrameScheduler};
use crate::glass::{DistortionBackend, GlassOptions, GlassSurfaces, HostKey, SurfaceId};
use crate::gpu::{GpuAssessment, GpuProbe};
use crate::media::MediaPlaybackCoordinator;
use crate::pause_gate::{GateTransition, GatedAnimation, SequencePauseGate};
use crate::quality::{QualityChange, QualityConsumer, QualityController, QualityMode};
use crate::readiness::{
    CANVAS, EffectDetail, ReadinessMarkers, ReadinessTracker, ReadyReport, WEBGL,
};
use crate::renderer::{
    InitStep, RendererBackend, RendererHandle, RendererProfile, RendererReadyInfo, RendererState,
};
use crate::trail::{CanvasInfo, TrailAnimation, TrailFrame};

// ---------------------------------------------------------------------------
// Host-facing types
// ---------------------------------------------------------------------------

/// Snapshot of the page handed to [`EffectCoordinator::init`].
#[derive(Debug, Clone, PartialEq)]
pub struct PageEnvironment {
    /// Viewport width in CSS pixels.
    pub viewport_width: f64,
    /// Viewport height in CSS pixels.
    pub viewport_height: f64,
    /// `window.devicePixelRatio`.
    pub device_pixel_ratio: f64,
    /// The trail canvas and its 2D context exist.
    pub has_canvas: bool,
    /// Identifier of the renderer container, if present.
    pub renderer_container: Option<String>,
    /// `(hover: hover)` matches.
    pub can_hover: bool,
    /// `(pointer: fine)` matches.
    pub fine_pointer: bool,
    /// Touch events or touch points are available.
    pub touch_capable: bool,
    /// The document is visible.
    pub page_visible: bool,
}

impl Default for PageEnvironment {
    fn default() -> Self {
        Self {
            viewport_width: 1280.0,
            viewport_height: 720.0,
            device_pixel_ratio: 1.0,
            has_canvas: true,
            renderer_container: None,
            can_hover: true,
            fine_pointer: true,
            touch_capable: false,
            page_visible: true,
        }
    }
}

impl PageEnvironment {
    /// Profile implied by the pointer capabilities.
    #[must_use]
    pub fn profile(&self) -> RendererProfile {
        RendererProfile::detect(self.can_hover, self.fine_pointer, self.touch_capable)
    }
}

/// One-shot notices shown to the visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Advisory {
    /// Rendering looks software-only.
    HardwareAcceleration,
    /// The page is viewed on a touch device.
    PreferDesktop,
}

impl Advisory {
    /// Stable identifier, also the name of the DOM event for
    /// [`HardwareAcceleration`](Self::HardwareAcceleration).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HardwareAcceleration => "hardwareaccelerationdisabled",
            Self::PreferDesktop => "preferdesktop",
        }
    }

    /// Notification text.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::HardwareAcceleration => {
                "Turn on hardware acceleration in browser settings for smoother viewing."
            }
            Self::PreferDesktop => "View on computer for best experience.",
        }
    }
}

/// Coordinator lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinatorState {
    /// Constructed, `init` not yet called.
    #[default]
    Created,
    /// Initialized and frame-driven.
    Running,
    /// Torn down. Terminal.
    TornDown,
}

/// Notifications for the host.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorEvent {
    /// The quality tier changed; consumers were already updated.
    QualityChanged(QualityChange),
    /// The trail canvas backing store must be resized.
    CanvasResized(CanvasInfo),
    /// The host should load the renderer module and report back.
    RendererLoadRequested,
    /// A one-shot advisory was raised.
    Advisory(Advisory),
    /// A reveal sequence started or ended.
    Sequence(GateTransition),
    /// Teardown ran.
    TornDown,
}

/// What [`EffectCoordinator::init`] did.
#[derive(Debug, Clone, PartialEq)]
pub struct InitReport {
    /// Trail canvas geometry, or `None` if the canvas is missing.
    pub canvas: Option<CanvasInfo>,
    /// Renderer initialization step.
    pub renderer: InitStep,
    /// Profile in effect.
    pub profile: RendererProfile,
}

/// What one [`EffectCoordinator::frame`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// The quality sampler ran.
    pub sampled: bool,
    /// Transition detected on this frame.
    pub quality: Option<QualityChange>,
    /// Trail animation outcome, if it ran.
    pub trail: Option<TrailFrame>,
    /// Glass surfaces presented.
    pub glass_presented: usize,
    /// The renderer readiness signal was delivered.
    pub renderer_ready: bool,
    /// Another frame is wanted.
    pub wants_frame: bool,
}

// ---------------------------------------------------------------------------
// Trail loop adapter
// ---------------------------------------------------------------------------

/// Binds the trail to its frame requests while the pause gate drives it.
struct TrailLoop<'a> {
    trail: &'a mut TrailAnimation,
    frames: &'a mut FrameScheduler,
}

impl GatedAnimation for TrailLoop<'_> {
    fn freeze(&mut self) {
        self.trail.freeze();
        self.frames.cancel_client(FrameClient::Trail);
    }

    fn shift_timeline(&mut self, by: Duration) {
        self.trail.shift_timeline(by);
    }

    fn has_pending_work(&self) -> bool {
        self.trail.has_pending_work()
    }

    fn thaw(&mut self, restart: bool) -> bool {
        let started = self.trail.thaw(restart);
        if started {
            self.frames.request(FrameClient::Trail);
        }
        started
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Owner of every effect on a page.
pub struct EffectCoordinator {
    config: VitrineConfig,
    clock: SharedClock,
    state: CoordinatorState,
    page_visible: bool,
    readiness: ReadinessTracker,
    quality: QualityController,
    media: MediaPlaybackCoordinator,
    gate: SequencePauseGate,
    frames: FrameScheduler,
    trail: Rc<RefCell<TrailAnimation>>,
    renderer: Rc<RefCell<RendererHandle>>,
    glass: Option<Rc<RefCell<GlassSurfaces>>>,
    renderer_ready: Option<RendererReadyInfo>,
    gpu: Option<GpuAssessment>,
    hardware_advisory: Deferred<()>,
    desktop_advisory: Deferred<()>,
    events: Emitter<CoordinatorEvent>,
}

impl fmt::Debug for EffectCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectCoordinator")
            .field("state", &self.state)
            .field("page_visible", &self.page_visible)
            .field("quality", &self.quality.mode())
            .field("renderer", &self.renderer.borrow().state())
            .field("frames", &self.frames)
            .field("gate", &self.gate)
            .finish()
    }
}

impl EffectCoordinator {
    /// Build every component from `config`. Nothing starts until
    /// [`init`](Self::init).
    pub fn new(config: VitrineConfig, clock: SharedClock) -> Self {
        let now = clock.now_mono();
        let mut quality = QualityController::new(config.quality.clone(), now);
        if !clock.is_monotonic() {
            quality.set_accept_all_deltas(true);
        }
        let trail = Rc::new(RefCell::new(TrailAnimation::new(config.trail.clone())));
        let renderer = Rc::new(RefCell::new(RendererHandle::new(config.renderer.clone())));
        quality.subscribe_consumer(&renderer);
        quality.subscribe_consumer(&trail);

        Self {
            readiness: ReadinessTracker::from_config(&config.readiness),
            media: MediaPlaybackCoordinator::new(config.media.clone()),
            config,
            clock,
            state: CoordinatorState::Created,
            page_visible: true,
            quality,
            gate: SequencePauseGate::new(),
            frames: FrameScheduler::new(),
            trail,
            renderer,
            glass: None,
            renderer_ready: None,
            gpu: None,
            hardware_advisory: Deferred::new(),
            desktop_advisory: Deferred::new(),
            events: Emitter::new(),
        }
    }

    fn now(&self) -> Duration {
        self.clock.now_mono()
    }

    // -- lifecycle -------------------------------------------------------

    /// Start the page's effects.
    ///
    /// Sizes the trail canvas and signals `canvas`, selects the renderer
    /// profile and starts the renderer, raises the touch-device advisory,
    /// and starts the quality sampler. Calling it again re-applies the
    /// environment without creating anything twice.
    pub fn init(&mut self, env: &PageEnvironment) -> InitReport {
        let profile = env.profile();
        if self.state == CoordinatorState::TornDown {
            return InitReport {
                canvas: None,
                renderer: InitStep::Ignored,
                profile,
            };
        }
        self.page_visible = env.page_visible;

        let canvas = if env.has_canvas {
            let info = self.trail.borrow_mut().resize(
                env.viewport_width,
                env.viewport_height,
                env.device_pixel_ratio,
                true,
            );
            if let Some(info) = info {
                self.readiness.signal(CANVAS, EffectDetail::Canvas(info));
                self.events.emit(&CoordinatorEvent::CanvasResized(info));
            }
            info
        } else {
            self.readiness.signal(
                CANVAS,
                EffectDetail::Failed(EffectError::MissingResource("trail canvas".into())),
            );
            None
        };

        self.renderer.borrow_mut().set_profile(profile);
        let renderer = self.init_or_update_renderer(env.renderer_container.as_deref());
        let profile = self.renderer.borrow().profile();
        if profile == RendererProfile::Mobile {
            self.raise(Advisory::PreferDesktop);
        }

        if self.state == CoordinatorState::Created {
            self.state = CoordinatorState::Running;
        }
        self.frames.request(FrameClient::Sampler);
        debug!(profile = profile.as_str(), "effects initialized");

        InitReport {
            canvas,
            renderer,
            profile,
        }
    }

    /// Start the renderer, or update it in place if it exists.
    pub fn init_or_update_renderer(&mut self, container: Option<&str>) -> InitStep {
        let step = self.renderer.borrow_mut().begin(container);
        match step {
            InitStep::MissingContainer => {
                warn!("renderer container missing");
                self.readiness.signal(
                    WEBGL,
                    EffectDetail::Failed(EffectError::MissingResource(
                        "renderer container".into(),
                    )),
                );
            }
            InitStep::LoadRequested => {
                self.events.emit(&CoordinatorEvent::RendererLoadRequested);
            }
            InitStep::Queued | InitStep::Updated | InitStep::Ignored => {}
        }
        step
    }

    /// The renderer module finished loading. Returns `true` if an instance
    /// was created; `webgl` is signaled on the next frame.
    pub fn renderer_module_loaded(&mut self, backend: &mut dyn RendererBackend) -> bool {
        let created = self.renderer.borrow_mut().module_loaded(backend);
        match created {
            Ok(Some(info)) => {
                self.renderer_ready = Some(info);
                self.frames.request(FrameClient::RendererReady);
                true
            }
            Ok(None) => false,
            Err(err) => {
                error!(error = %err, "renderer creation failed");
                self.readiness.signal(WEBGL, EffectDetail::Failed(err));
                false
            }
        }
    }

    /// The renderer module could not be loaded. `webgl` resolves degraded;
    /// a later [`init_or_update_renderer`](Self::init_or_update_renderer)
    /// retries the load.
    pub fn renderer_module_failed(&mut self, reason: impl Into<String>) {
        let err = self.renderer.borrow_mut().module_failed(reason);
        error!(error = %err, "renderer module failed to load");
        self.readiness.signal(WEBGL, EffectDetail::Failed(err));
    }

    /// Tear everything down. Components still loading settle as failed so
    /// waiters on readiness are released. Returns `false` if already torn down.
    pub fn teardown(&mut self) -> bool {
        if self.state == CoordinatorState::TornDown {
            return false;
        }
        self.renderer.borrow_mut().destroy();
        self.trail.borrow_mut().clear();
        let paused = self.media.pause_all(None);
        let cancelled = self.frames.cancel_all();
        self.renderer_ready = None;
        let unsettled: Vec<String> = self
            .readiness
            .component_names()
            .filter(|name| !self.readiness.is_component_ready(name))
            .map(str::to_owned)
            .collect();
        for name in unsettled {
            let err = EffectError::AsyncLoad("torn down".to_owned());
            self.readiness.signal(&name, EffectDetail::Failed(err));
        }
        self.state = CoordinatorState::TornDown;
        debug!(paused, cancelled, "effects torn down");
        self.events.emit(&CoordinatorEvent::TornDown);
        true
    }

    // -- frames ----------------------------------------------------------

    /// Run one animation frame at the clock's current time.
    pub fn frame(&mut self) -> FrameReport {
        let now = self.now();
        self.frame_at(now)
    }

    /// Run one animation frame at `now`.
    pub fn frame_at(&mut self, now: Duration) -> FrameReport {
        let mut report = FrameReport::default();
        if self.state == CoordinatorState::TornDown {
            return report;
        }
        for client in self.frames.take_due() {
            match client {
                FrameClient::Sampler => {
                    report.sampled = true;
                    if let Some(change) = self.quality.sample(now) {
                        self.after_quality_change(change);
                        report.quality = Some(change);
                    }
                    self.frames.request(FrameClient::Sampler);
                }
                FrameClient::Trail => {
                    let frame = self.trail.borrow_mut().tick(now, self.page_visible);
                    if frame.wants_frame {
                        self.frames.request(FrameClient::Trail);
                    }
                    report.trail = Some(frame);
                }
                FrameClient::Glass => {
                    if let Some(glass) = &self.glass {
                        let mut glass = glass.borrow_mut();
                        glass.retry_pending();
                        report.glass_presented = glass.run_scheduled();
                    }
                }
                FrameClient::RendererReady => {
                    if let Some(info) = self.renderer_ready.take() {
                        self.readiness.signal(WEBGL, EffectDetail::Renderer(info));
                        report.renderer_ready = true;
                    }
                }
            }
        }
        self.request_glass_frame();
        report.wants_frame = self.frames.has_pending();
        report
    }

    /// Whether any client wants a frame.
    #[must_use]
    pub fn has_pending_frames(&self) -> bool {
        self.frames.has_pending()
    }

    fn request_glass_frame(&mut self) {
        let scheduled = self
            .glass
            .as_ref()
            .is_some_and(|glass| glass.borrow().has_scheduled());
        if scheduled {
            self.frames.request(FrameClient::Glass);
        }
    }

    // -- quality ---------------------------------------------------------

    fn after_quality_change(&mut self, change: QualityChange) {
        let resized = self.trail.borrow_mut().take_surface_update();
        if let Some(info) = resized {
            self.events.emit(&CoordinatorEvent::CanvasResized(info));
        }
        self.request_glass_frame();
        self.events.emit(&CoordinatorEvent::QualityChanged(change));
    }

    /// Switch tiers immediately.
    pub fn force_quality(&mut self, mode: QualityMode) -> Option<QualityChange> {
        let now = self.now();
        let change = self.quality.force_mode(mode, now)?;
        self.after_quality_change(change);
        Some(change)
    }

    // -- environment -----------------------------------------------------

    /// Pointer entered the page.
    pub fn pointer_enter(&mut self, x: f64, y: f64) {
        let now = self.now();
        self.trail.borrow_mut().pointer_enter(x, y, now);
    }

    /// Pointer moved. Returns `true` if a trail glyph was emitted.
    pub fn pointer_move(&mut self, x: f64, y: f64) -> bool {
        let now = self.now();
        let mut trail = self.trail.borrow_mut();
        let emitted = trail.pointer_move(x, y, now);
        if emitted && self.state == CoordinatorState::Running && trail.request_loop(self.page_visible) {
            self.frames.request(FrameClient::Trail);
        }
        emitted
    }

    /// Pointer left the page.
    pub fn pointer_leave(&mut self) {
        self.trail.borrow_mut().pointer_leave();
    }

    /// Page visibility changed. Hidden pages stop the trail loop; becoming
    /// visible restarts it if glyphs remain.
    pub fn set_page_visible(&mut self, visible: bool) {
        if self.page_visible == visible {
            return;
        }
        self.page_visible = visible;
        if self.state != CoordinatorState::Running {
            return;
        }
        let mut trail = self.trail.borrow_mut();
        if !visible {
            trail.stop_loop();
            self.frames.cancel_client(FrameClient::Trail);
        } else if !self.gate.is_paused() && trail.request_loop(true) {
            self.frames.request(FrameClient::Trail);
        }
    }

    /// Viewport resized. Glass surfaces are re-measured on the next frame.
    /// Returns the new canvas geometry, if it changed.
    pub fn resize(&mut self, width: f64, height: f64, device_pixel_ratio: f64) -> Option<CanvasInfo> {
        let info = self
            .trail
            .borrow_mut()
            .resize(width, height, device_pixel_ratio, false);
        if let Some(info) = info {
            self.events.emit(&CoordinatorEvent::CanvasResized(info));
        }
        if let Some(glass) = &self.glass {
            glass.borrow_mut().refresh_all();
        }
        self.request_glass_frame();
        info
    }

    /// Switch the renderer profile. A renderer whose last load failed is
    /// retried. Returns `true` if the profile changed.
    pub fn set_profile(&mut self, profile: RendererProfile) -> bool {
        let (changed, retry) = {
            let mut renderer = self.renderer.borrow_mut();
            let changed = renderer.set_profile(profile);
            let retry = (changed && renderer.state() == RendererState::Uninitialized)
                .then(|| renderer.container().map(str::to_owned))
                .flatten();
            (changed, retry)
        };
        if let Some(container) = retry {
            self.init_or_update_renderer(Some(&container));
        }
        changed
    }

    // -- sequences -------------------------------------------------------

    /// A reveal sequence starts: the trail pauses and all media stop.
    pub fn begin_sequence(&mut self) -> GateTransition {
        let transition = self.pause_gate_acquire();
        let paused = self.media.pause_all(None);
        debug!(paused, "sequence started");
        self.events.emit(&CoordinatorEvent::Sequence(transition));
        transition
    }

    /// A reveal sequence ends.
    pub fn end_sequence(&mut self) -> GateTransition {
        let transition = self.pause_gate_release();
        self.events.emit(&CoordinatorEvent::Sequence(transition));
        transition
    }

    /// Hold the trail pause gate without touching media.
    pub fn pause_gate_acquire(&mut self) -> GateTransition {
        let now = self.now();
        let mut trail = self.trail.borrow_mut();
        let mut anim = TrailLoop {
            trail: &mut *trail,
            frames: &mut self.frames,
        };
        self.gate.acquire(now, &mut anim)
    }

    /// Release one hold of the trail pause gate.
    pub fn pause_gate_release(&mut self) -> GateTransition {
        let now = self.now();
        let running = self.state == CoordinatorState::Running;
        let mut trail = self.trail.borrow_mut();
        let mut anim = TrailLoop {
            trail: &mut *trail,
            frames: &mut self.frames,
        };
        self.gate.release(now, &mut anim, self.page_visible && running)
    }

    // -- advisories ------------------------------------------------------

    /// Classify the host's WebGL probe. The first assessment is cached; a
    /// disabled result raises the hardware-acceleration advisory.
    pub fn report_gpu_probe(&mut self, probe: &GpuProbe) -> GpuAssessment {
        if let Some(cached) = self.gpu {
            return cached;
        }
        let assessment = probe.assess();
        self.gpu = Some(assessment);
        if assessment.is_disabled() {
            self.raise(Advisory::HardwareAcceleration);
        }
        assessment
    }

    /// Cached GPU assessment.
    #[must_use]
    pub fn gpu_assessment(&self) -> Option<GpuAssessment> {
        self.gpu
    }

    /// Raise an advisory. Returns `false` if it was already raised.
    pub fn raise(&mut self, advisory: Advisory) -> bool {
        let first = self.advisory(advisory).resolve(()).is_first();
        if first {
            info!(advisory = advisory.as_str(), "advisory raised");
            self.events.emit(&CoordinatorEvent::Advisory(advisory));
        }
        first
    }

    /// Future completing when `advisory` is raised.
    pub fn when_advisory(&self, advisory: Advisory) -> Wait<()> {
        self.advisory(advisory).wait()
    }

    fn advisory(&self, advisory: Advisory) -> &Deferred<()> {
        match advisory {
            Advisory::HardwareAcceleration => &self.hardware_advisory,
            Advisory::PreferDesktop => &self.desktop_advisory,
        }
    }

    // -- glass -----------------------------------------------------------

    /// Install the glass registry. It follows quality changes from now on.
    pub fn install_glass(&mut self, backend: Box<dyn DistortionBackend>) -> Rc<RefCell<GlassSurfaces>> {
        let glass = Rc::new(RefCell::new(GlassSurfaces::new(backend)));
        if self.quality.mode() != QualityMode::High {
            glass.borrow_mut().apply_quality(&QualityChange {
                mode: self.quality.mode(),
                multiplier: self.quality.multiplier(),
                at: self.now(),
                fps: None,
            });
        }
        self.quality.subscribe_consumer(&glass);
        self.glass = Some(Rc::clone(&glass));
        glass
    }

    /// Attach a glass surface and schedule its first update. `None` until
    /// glass is installed.
    pub fn attach_glass(&mut self, host: HostKey, options: GlassOptions) -> Option<SurfaceId> {
        let id = self.glass.as_ref()?.borrow_mut().attach(host, options);
        self.frames.request(FrameClient::Glass);
        Some(id)
    }

    /// Detach a glass surface.
    pub fn detach_glass(&mut self, id: SurfaceId) -> bool {
        self.glass
            .as_ref()
            .is_some_and(|glass| glass.borrow_mut().detach(id))
    }

    // -- readiness -------------------------------------------------------

    /// Signal a component. See [`ReadinessTracker::signal`].
    pub fn signal(&mut self, name: &str, detail: EffectDetail) -> Option<EffectDetail> {
        self.readiness.signal(name, detail)
    }

    /// Future completing once every component is ready.
    pub fn when_ready(&self) -> Wait<ReadyReport<EffectDetail>> {
        self.readiness.when_ready()
    }

    /// Future completing once `name` is ready; fails for unknown names.
    pub fn when_component_ready(&self, name: &str) -> Result<Wait<EffectDetail>, EffectError> {
        self.readiness.when_component_ready(name)
    }

    /// Whether every component is ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    /// Install readiness presentation hooks.
    pub fn set_readiness_markers(&mut self, markers: Box<dyn ReadinessMarkers>) {
        self.readiness.set_markers(markers);
    }

    // -- accessors -------------------------------------------------------

    /// Subscribe to coordinator notifications.
    pub fn subscribe(&mut self, handler: impl FnMut(&CoordinatorEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(handler)
    }

    /// Remove a subscription.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Whether the page is visible.
    #[must_use]
    pub fn page_visible(&self) -> bool {
        self.page_visible
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &VitrineConfig {
        &self.config
    }

    /// Readiness tracker.
    #[must_use]
    pub fn readiness(&self) -> &ReadinessTracker {
        &self.readiness
    }

    /// Readiness tracker, mutably (for subscriptions).
    pub fn readiness_mut(&mut self) -> &mut ReadinessTracker {
        &mut self.readiness
    }

    /// Quality controller.
    #[must_use]
    pub fn quality(&self) -> &QualityController {
        &self.quality
    }

    /// Quality controller, mutably (for subscriptions).
    pub fn quality_mut(&mut self) -> &mut QualityController {
        &mut self.quality
    }

    /// Media coordinator.
    #[must_use]
    pub fn media(&self) -> &MediaPlaybackCoordinator {
        &self.media
    }

    /// Media coordinator, mutably.
    pub fn media_mut(&mut self) -> &mut MediaPlaybackCoordinator {
        &mut self.media
    }

    /// Sequence pause gate.
    #[must_use]
    pub fn pause_gate(&self) -> &SequencePauseGate {
        &self.gate
    }

    /// Shared cursor trail.
    #[must_use]
    pub fn trail(&self) -> Rc<RefCell<TrailAnimation>> {
        Rc::clone(&self.trail)
    }

    /// Shared renderer handle.
    #[must_use]
    pub fn renderer(&self) -> Rc<RefCell<RendererHandle>> {
        Rc::clone(&self.renderer)
    }

    /// Installed glass registry.
    #[must_use]
    pub fn glass(&self) -> Option<Rc<RefCell<GlassSurfaces>>> {
        self.glass.clone()
    }

    /// Whether `client` has a frame pending.
    #[must_use]
    pub fn is_frame_pending(&self, client: FrameClient) -> bool {
        self.frames.is_pending(client)
    }
}
