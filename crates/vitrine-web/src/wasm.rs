#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use js_sys::{Array, Function, JSON, Object, Reflect};
use serde::Serialize;
use tracing::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};
use web_sys::{
    CanvasRenderingContext2d, Document, Element, HtmlCanvasElement, HtmlElement,
    HtmlMediaElement, IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit,
    Window,
};

use vitrine_core::coordinator::{EffectCoordinator, PageEnvironment};
use vitrine_core::error::{EffectError, PlaybackError};
use vitrine_core::glass::{
    AssetRef, DisplacementStyle, DistortionBackend, GlassOptions, HostKey, SurfaceId,
    SurfaceMeasure, SurfaceRender,
};
use vitrine_core::gpu::{GlInfo, GpuProbe};
use vitrine_core::media::{
    MediaElement, MediaId, MediaKind, MediaPlaybackCoordinator, TrackList, TrackSwitch,
    ViewportObserver,
};
use vitrine_core::readiness::{EffectDetail, ReadinessMarkers};
use vitrine_core::renderer::{RendererBackend, RendererInstance, RendererOptions, RendererProfile};
use vitrine_core::trail::CanvasInfo;
use vitrine_core::{SystemClock, VitrineConfig};

use crate::bridge;
use crate::deliver::DeferredEvents;
use crate::paint::{self, GlyphDraw};
use crate::viewport::ObservedTargets;

// ---------------------------------------------------------------------------
// JS helpers
// ---------------------------------------------------------------------------

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Serialize through JSON so the JS side receives plain objects.
fn to_js<T: Serialize + ?Sized>(value: &T) -> JsValue {
    serde_json::to_string(value)
        .ok()
        .and_then(|text| JSON::parse(&text).ok())
        .unwrap_or(JsValue::NULL)
}

fn from_js(value: &JsValue) -> serde_json::Value {
    JSON::stringify(value)
        .ok()
        .map(String::from)
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or(serde_json::Value::Null)
}

fn call_method(target: &JsValue, name: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let method: Function = Reflect::get(target, &JsValue::from_str(name))?.dyn_into()?;
    let args: Array = args.iter().collect();
    method.apply(target, &args)
}

fn window() -> Result<Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("no window"))
}

fn document() -> Result<Document, JsValue> {
    window()?
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))
}

fn media_matches(window: &Window, query: &str) -> bool {
    window
        .match_media(query)
        .ok()
        .flatten()
        .is_some_and(|list| list.matches())
}

// ---------------------------------------------------------------------------
// DOM adapters
// ---------------------------------------------------------------------------

/// Readiness markers on `document.documentElement`.
struct DocumentMarkers {
    root: HtmlElement,
}

impl ReadinessMarkers for DocumentMarkers {
    fn mark_component(&mut self, marker_key: &str) {
        if let Err(err) = self.root.dataset().set(marker_key, "true") {
            warn!(?err, marker_key, "failed to set readiness marker");
        }
    }

    fn mark_all_ready(&mut self, marker_key: &str, class_name: &str) {
        self.mark_component(marker_key);
        if let Err(err) = self.root.class_list().add_1(class_name) {
            warn!(?err, class_name, "failed to add ready class");
        }
    }
}

/// `<video>` / `<audio>` handle.
struct DomMedia(HtmlMediaElement);

impl MediaElement for DomMedia {
    fn is_paused(&self) -> bool {
        self.0.paused()
    }

    fn is_ended(&self) -> bool {
        self.0.ended()
    }

    fn pause(&self) {
        if let Err(err) = self.0.pause() {
            warn!(?err, "media pause failed");
        }
    }

    /// The returned promise settles later; an asynchronous refusal reaches
    /// the coordinator through `notifyPlayRejected`.
    fn play(&self) -> Result<(), PlaybackError> {
        self.0
            .play()
            .map(|_| ())
            .map_err(|err| PlaybackError::Rejected(format!("{err:?}")))
    }

    fn rewind(&self) {
        self.0.set_current_time(0.0);
    }

    fn source(&self) -> String {
        self.0.src()
    }

    fn set_source(&self, src: &str) {
        self.0.set_src(src);
    }

    fn load(&self) {
        self.0.load();
    }
}

/// Ripple-grid module loaded by page script.
struct JsRendererBackend {
    module: JsValue,
    document: Document,
}

struct JsRendererInstance {
    handle: JsValue,
}

impl RendererBackend for JsRendererBackend {
    fn create(
        &mut self,
        container: &str,
        options: &RendererOptions,
    ) -> Result<Box<dyn RendererInstance>, EffectError> {
        let element = self
            .document
            .query_selector(container)
            .ok()
            .flatten()
            .ok_or_else(|| EffectError::MissingResource(container.to_owned()))?;
        let factory: Function = Reflect::get(&self.module, &JsValue::from_str("createRippleGrid"))
            .ok()
            .and_then(|f| f.dyn_into().ok())
            .ok_or_else(|| EffectError::AsyncLoad("createRippleGrid is not exported".into()))?;
        let handle = factory
            .call2(&JsValue::NULL, &element, &to_js(options))
            .map_err(|err| EffectError::AsyncLoad(format!("{err:?}")))?;
        Ok(Box::new(JsRendererInstance { handle }))
    }
}

impl RendererInstance for JsRendererInstance {
    fn update(&mut self, options: &RendererOptions) {
        if let Err(err) = call_method(&self.handle, "update", &[to_js(options)]) {
            warn!(?err, "renderer update failed");
        }
    }

    fn destroy(&mut self) {
        if let Err(err) = call_method(&self.handle, "destroy", &[]) {
            warn!(?err, "renderer destroy failed");
        }
    }
}

type HostTable = Rc<RefCell<HashMap<HostKey, HtmlElement>>>;

/// Glass surfaces on DOM elements. The displacement map itself is drawn by
/// a page-supplied `(width, height, radius, style) => dataUri` function.
struct DomGlassBackend {
    hosts: HostTable,
    builder: Function,
}

fn parse_px(value: &str) -> f64 {
    value
        .split_whitespace()
        .next()
        .and_then(|token| token.trim_end_matches("px").parse::<f64>().ok())
        .unwrap_or(0.0)
}

impl DomGlassBackend {
    fn host(&self, host: HostKey) -> Option<HtmlElement> {
        self.hosts.borrow().get(&host).cloned()
    }
}

impl DistortionBackend for DomGlassBackend {
    fn is_connected(&self, host: HostKey) -> bool {
        self.host(host).is_some_and(|el| el.is_connected())
    }

    fn measure(&self, host: HostKey) -> Option<SurfaceMeasure> {
        let el = self.host(host)?;
        let rect = el.get_bounding_client_rect();
        if rect.width() <= 0.0 || rect.height() <= 0.0 {
            return None;
        }
        let window = window().ok()?;
        let radius = window
            .get_computed_style(&el)
            .ok()
            .flatten()
            .and_then(|style| style.get_property_value("border-top-left-radius").ok())
            .map_or(0.0, |v| parse_px(&v));
        Some(SurfaceMeasure {
            width: rect.width(),
            height: rect.height(),
            radius,
            device_pixel_ratio: window.device_pixel_ratio(),
        })
    }

    fn build_displacement_asset(
        &mut self,
        width: u32,
        height: u32,
        radius: f64,
        style: &DisplacementStyle,
    ) -> AssetRef {
        let args: Array = [
            JsValue::from(width),
            JsValue::from(height),
            JsValue::from(radius),
            to_js(style),
        ]
        .iter()
        .collect();
        match self.builder.apply(&JsValue::NULL, &args) {
            Ok(uri) => AssetRef(uri.as_string().unwrap_or_default()),
            Err(err) => {
                warn!(?err, "displacement map builder failed");
                AssetRef(String::new())
            }
        }
    }

    fn present(
        &mut self,
        host: HostKey,
        id: SurfaceId,
        render: &SurfaceRender,
        asset: Option<&AssetRef>,
    ) {
        let Some(el) = self.host(host) else { return };
        let style = el.style();
        let classes = el.class_list();
        let result = match (render, asset) {
            (SurfaceRender::Filter(params), Some(asset)) => classes
                .remove_1("glass-fallback")
                .and_then(|()| el.dataset().set("glassId", &id.to_string()))
                .and_then(|()| {
                    let filter = serde_json::to_string(params).unwrap_or_default();
                    el.dataset().set("glassFilter", &filter)
                })
                .and_then(|()| style.set_property("--glass-map", &format!("url(\"{}\")", asset.0)))
                .and_then(|()| {
                    style.set_property("--glass-blur", &format!("{}px", params.std_deviation))
                })
                .and_then(|()| {
                    style.set_property("--glass-saturation", &params.saturation.to_string())
                })
                .and_then(|()| {
                    style.set_property(
                        "--glass-background-opacity",
                        &params.background_opacity.to_string(),
                    )
                }),
            _ => classes.add_1("glass-fallback"),
        };
        if let Err(err) = result {
            warn!(?err, %id, "glass presentation failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Trail canvas
// ---------------------------------------------------------------------------

/// The 2D canvas the cursor trail is painted on.
struct TrailCanvas {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    applied: Option<CanvasInfo>,
}

impl TrailCanvas {
    fn find(document: &Document, selector: &str) -> Result<Option<Self>, JsValue> {
        let Some(canvas) = document
            .query_selector(selector)?
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
        else {
            return Ok(None);
        };
        let ctx = canvas
            .get_context("2d")?
            .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok());
        Ok(ctx.map(|ctx| Self {
            canvas,
            ctx,
            applied: None,
        }))
    }

    /// Resize the backing store and rescale the context.
    fn apply(&mut self, info: CanvasInfo) {
        if self.applied == Some(info) {
            return;
        }
        self.canvas.set_width(info.width);
        self.canvas.set_height(info.height);
        let style = self.canvas.style();
        let sized = style
            .set_property("width", &format!("{}px", info.css_width))
            .and_then(|()| style.set_property("height", &format!("{}px", info.css_height)))
            .and_then(|()| {
                self.ctx
                    .set_transform(info.pixel_ratio, 0.0, 0.0, info.pixel_ratio, 0.0, 0.0)
            });
        if let Err(err) = sized {
            warn!(?err, "trail canvas sizing failed");
        }
        self.applied = Some(info);
    }

    fn clear(&self) {
        if let Some(info) = self.applied {
            let (width, height) = paint::clear_extent(&info);
            self.ctx.clear_rect(0.0, 0.0, width, height);
        }
    }

    fn paint(&self, draws: &[GlyphDraw]) {
        self.clear();
        for draw in draws {
            self.ctx.save();
            self.ctx.set_font(&draw.font);
            self.ctx.set_fill_style_str(&draw.fill);
            let drawn = self
                .ctx
                .translate(draw.x, draw.y)
                .and_then(|()| self.ctx.rotate(draw.angle))
                .and_then(|()| self.ctx.fill_text(&draw.ch.to_string(), 0.0, 0.0));
            self.ctx.restore();
            if let Err(err) = drawn {
                warn!(?err, "trail glyph draw failed");
                return;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Video visibility
// ---------------------------------------------------------------------------

type ViewportTargets = ObservedTargets<Element>;

/// `IntersectionObserver` forwarding visible ratios to the coordinator.
struct DomViewport {
    observer: IntersectionObserver,
    targets: Rc<RefCell<ViewportTargets>>,
    _callback: Closure<dyn FnMut(Array)>,
}

impl DomViewport {
    fn new(
        fx: Weak<RefCell<EffectCoordinator>>,
        targets: Rc<RefCell<ViewportTargets>>,
        threshold: f64,
    ) -> Result<Self, JsValue> {
        let lookup = Rc::clone(&targets);
        let callback = Closure::<dyn FnMut(Array)>::new(move |entries: Array| {
            let Some(fx) = fx.upgrade() else { return };
            for entry in entries.iter() {
                let Ok(entry) = entry.dyn_into::<IntersectionObserverEntry>() else {
                    continue;
                };
                let Some(id) = lookup.borrow().id_of(&entry.target()) else {
                    continue;
                };
                match fx.try_borrow_mut() {
                    Ok(mut fx) => {
                        fx.media_mut()
                            .notify_intersection(id, entry.intersection_ratio());
                    }
                    Err(_) => warn!(%id, "coordinator busy, intersection dropped"),
                }
            }
        });
        let init = IntersectionObserverInit::new();
        init.set_threshold(&JsValue::from(threshold));
        let observer =
            IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init)?;
        Ok(Self {
            observer,
            targets,
            _callback: callback,
        })
    }
}

impl ViewportObserver for DomViewport {
    fn observe(&mut self, id: MediaId) {
        if let Some(el) = self.targets.borrow_mut().claim(id) {
            self.observer.observe(el);
        }
    }

    fn unobserve(&mut self, id: MediaId) {
        if let Some(el) = self.targets.borrow_mut().release(id) {
            self.observer.unobserve(&el);
        }
    }
}

impl Drop for DomViewport {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}

// ---------------------------------------------------------------------------
// Console and event delivery
// ---------------------------------------------------------------------------

/// Developer console, one method per level.
#[cfg(feature = "console-log")]
struct BrowserConsole;

#[cfg(feature = "console-log")]
impl crate::console::ConsoleSink for BrowserConsole {
    fn write(&self, level: tracing::Level, line: &str) {
        use tracing::Level;

        let line = JsValue::from_str(line);
        if level == Level::ERROR {
            web_sys::console::error_1(&line);
        } else if level == Level::WARN {
            web_sys::console::warn_1(&line);
        } else if level == Level::INFO {
            web_sys::console::info_1(&line);
        } else {
            web_sys::console::debug_1(&line);
        }
    }
}

/// JS listeners plus events waiting for the next microtask.
#[derive(Default)]
struct Listeners {
    callbacks: Vec<Function>,
    pending: DeferredEvents<JsValue>,
}

/// Queue `payload`; delivery happens once the running export returned.
fn enqueue(listeners: &Rc<RefCell<Listeners>>, payload: JsValue) {
    if listeners.borrow_mut().pending.push(payload) {
        let listeners = Rc::clone(listeners);
        spawn_local(async move { flush(&listeners) });
    }
}

fn flush(listeners: &Rc<RefCell<Listeners>>) {
    let (events, callbacks) = {
        let mut state = listeners.borrow_mut();
        (state.pending.drain(), state.callbacks.clone())
    };
    for payload in &events {
        for callback in &callbacks {
            if let Err(err) = callback.call1(&JsValue::NULL, payload) {
                warn!(?err, "effects listener threw");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// GPU probe
// ---------------------------------------------------------------------------

fn gl_string(gl: &JsValue, owner: &JsValue, constant: &str) -> Option<String> {
    let key = Reflect::get(owner, &JsValue::from_str(constant)).ok()?;
    call_method(gl, "getParameter", &[key]).ok()?.as_string()
}

fn gl_info(gl: &JsValue) -> GlInfo {
    let debug = call_method(gl, "getExtension", &[JsValue::from_str("WEBGL_debug_renderer_info")])
        .ok()
        .filter(|ext| !ext.is_null() && !ext.is_undefined());
    let info = GlInfo {
        renderer: gl_string(gl, gl, "RENDERER").unwrap_or_default(),
        vendor: gl_string(gl, gl, "VENDOR").unwrap_or_default(),
        unmasked_renderer: debug
            .as_ref()
            .and_then(|ext| gl_string(gl, ext, "UNMASKED_RENDERER_WEBGL")),
        unmasked_vendor: debug
            .as_ref()
            .and_then(|ext| gl_string(gl, ext, "UNMASKED_VENDOR_WEBGL")),
    };
    if let Ok(lose) = call_method(gl, "getExtension", &[JsValue::from_str("WEBGL_lose_context")])
        && !lose.is_null()
    {
        if let Err(err) = call_method(&lose, "loseContext", &[]) {
            warn!(?err, "failed to release probe context");
        }
    }
    info
}

fn context(canvas: &HtmlCanvasElement, attributes: &JsValue) -> Option<JsValue> {
    ["webgl2", "webgl"].into_iter().find_map(|kind| {
        canvas
            .get_context_with_context_options(kind, attributes)
            .ok()
            .flatten()
            .map(JsValue::from)
    })
}

fn probe_gpu(document: &Document) -> GpuProbe {
    let Some(canvas) = document
        .create_element("canvas")
        .ok()
        .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
    else {
        return GpuProbe::default();
    };
    let strict_attrs = Object::new();
    if let Err(err) = Reflect::set(
        &strict_attrs,
        &JsValue::from_str("failIfMajorPerformanceCaveat"),
        &JsValue::TRUE,
    ) {
        warn!(?err, "failed to build strict context attributes");
    }
    let strict = context(&canvas, &strict_attrs).map(|gl| gl_info(&gl));
    let relaxed = match strict {
        Some(_) => None,
        None => context(&canvas, &Object::new()).map(|gl| gl_info(&gl)),
    };
    GpuProbe { strict, relaxed }
}

// ---------------------------------------------------------------------------
// Exported class
// ---------------------------------------------------------------------------

/// Page-level effect coordinator.
#[wasm_bindgen]
pub struct VitrineEffects {
    fx: Rc<RefCell<EffectCoordinator>>,
    hosts: HostTable,
    surfaces: HashMap<u32, SurfaceId>,
    next_host: u32,
    media: Vec<(MediaId, HtmlMediaElement)>,
    viewport: Rc<RefCell<ViewportTargets>>,
    trail_canvas: Option<TrailCanvas>,
    listeners: Rc<RefCell<Listeners>>,
}

impl VitrineEffects {
    /// Media ids cross into JS as numbers.
    fn media_id(&self, raw: f64) -> Option<MediaId> {
        self.media
            .iter()
            .map(|(id, _)| *id)
            .find(|id| id.get() as f64 == raw)
    }

    fn with_media<R>(&self, f: impl FnOnce(&mut MediaPlaybackCoordinator) -> R) -> R {
        f(self.fx.borrow_mut().media_mut())
    }

    /// Drop an earlier registration of the same element.
    fn forget_element(&mut self, element: &HtmlMediaElement) {
        if let Some(pos) = self.media.iter().position(|(_, el)| el == element) {
            let (id, _) = self.media.remove(pos);
            self.with_media(|media| media.deregister(id));
        }
    }

    fn paint_trail(&mut self) {
        let Some(canvas) = self.trail_canvas.as_mut() else {
            return;
        };
        let trail = self.fx.borrow().trail();
        let trail = trail.borrow();
        if let Some(info) = trail.surface() {
            canvas.apply(info);
        }
        canvas.paint(&paint::glyph_draws(trail.glyphs()));
    }
}

#[wasm_bindgen]
impl VitrineEffects {
    /// Create from an optional (partial) JSON config.
    #[wasm_bindgen(constructor)]
    pub fn new(config: Option<String>) -> Result<VitrineEffects, JsValue> {
        #[cfg(feature = "console-panic")]
        console_error_panic_hook::set_once();
        #[cfg(feature = "console-log")]
        if !crate::console::install(
            BrowserConsole,
            tracing_subscriber::filter::LevelFilter::INFO,
        ) {
            tracing::debug!("global subscriber already installed");
        }

        let config = match config {
            Some(text) => VitrineConfig::from_json_str(&text).map_err(js_error)?,
            None => VitrineConfig::default(),
        };
        let threshold = config.media.visibility_threshold;
        let fx = Rc::new(RefCell::new(EffectCoordinator::new(
            config,
            Rc::new(SystemClock::new()),
        )));

        let listeners = Rc::new(RefCell::new(Listeners::default()));
        let sink = Rc::clone(&listeners);
        fx.borrow_mut().subscribe(move |event| {
            enqueue(&sink, to_js(&bridge::event_json(event)));
        });

        if let Some(root) = document()?
            .document_element()
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
        {
            fx.borrow_mut()
                .set_readiness_markers(Box::new(DocumentMarkers { root }));
        }

        let viewport = Rc::new(RefCell::new(ViewportTargets::default()));
        match DomViewport::new(Rc::downgrade(&fx), Rc::clone(&viewport), threshold) {
            Ok(observer) => fx
                .borrow_mut()
                .media_mut()
                .set_viewport_observer(Box::new(observer)),
            Err(err) => warn!(?err, "IntersectionObserver unavailable, videos stay manual"),
        }

        Ok(Self {
            fx,
            hosts: Rc::new(RefCell::new(HashMap::new())),
            surfaces: HashMap::new(),
            next_host: 1,
            media: Vec::new(),
            viewport,
            trail_canvas: None,
            listeners,
        })
    }

    /// Listen to coordinator events (`{type, ...}` objects). Listeners run
    /// in a microtask after the triggering call returned.
    pub fn subscribe(&mut self, listener: Function) {
        self.listeners.borrow_mut().callbacks.push(listener);
    }

    // -- lifecycle -------------------------------------------------------

    /// Size the trail canvas, start the renderer, and begin sampling.
    /// Returns `{canvas, renderer, profile}`; `renderer == "loadRequested"`
    /// asks the page to import the renderer module.
    pub fn init(&mut self, canvas_selector: &str, renderer_selector: &str) -> Result<JsValue, JsValue> {
        let window = window()?;
        let document = document()?;
        self.trail_canvas = TrailCanvas::find(&document, canvas_selector)?;
        let renderer_container = document
            .query_selector(renderer_selector)?
            .map(|_| renderer_selector.to_owned());

        let env = PageEnvironment {
            viewport_width: window.inner_width()?.as_f64().unwrap_or(0.0),
            viewport_height: window.inner_height()?.as_f64().unwrap_or(0.0),
            device_pixel_ratio: window.device_pixel_ratio(),
            has_canvas: self.trail_canvas.is_some(),
            renderer_container,
            can_hover: media_matches(&window, "(hover: hover)"),
            fine_pointer: media_matches(&window, "(pointer: fine)"),
            touch_capable: Reflect::has(&window, &JsValue::from_str("ontouchstart"))
                .unwrap_or(false)
                || window.navigator().max_touch_points() > 0,
            page_visible: !document.hidden(),
        };
        let report = self.fx.borrow_mut().init(&env);
        if let (Some(canvas), Some(info)) = (self.trail_canvas.as_mut(), report.canvas) {
            canvas.apply(info);
        }
        let probe = probe_gpu(&document);
        self.fx.borrow_mut().report_gpu_probe(&probe);
        Ok(to_js(&bridge::init_report_json(&report)))
    }

    /// The renderer module resolved.
    #[wasm_bindgen(js_name = rendererModuleLoaded)]
    pub fn renderer_module_loaded(&mut self, module: JsValue) -> Result<bool, JsValue> {
        let mut backend = JsRendererBackend {
            module,
            document: document()?,
        };
        Ok(self.fx.borrow_mut().renderer_module_loaded(&mut backend))
    }

    /// The renderer module import rejected.
    #[wasm_bindgen(js_name = rendererModuleFailed)]
    pub fn renderer_module_failed(&mut self, reason: String) {
        self.fx.borrow_mut().renderer_module_failed(reason);
    }

    /// Run one animation frame and repaint the trail when it changed.
    /// Returns whether another frame is wanted.
    pub fn frame(&mut self) -> bool {
        let report = self.fx.borrow_mut().frame();
        if report.trail.is_some_and(|trail| trail.rendered) || report.quality.is_some() {
            self.paint_trail();
        }
        report.wants_frame
    }

    /// Unload: destroy the renderer, stop the canvas, pause all media.
    pub fn teardown(&mut self) -> bool {
        let torn_down = self.fx.borrow_mut().teardown();
        if let Some(canvas) = &self.trail_canvas {
            canvas.clear();
        }
        torn_down
    }

    // -- environment -----------------------------------------------------

    #[wasm_bindgen(js_name = pointerEnter)]
    pub fn pointer_enter(&mut self, x: f64, y: f64) {
        self.fx.borrow_mut().pointer_enter(x, y);
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&mut self, x: f64, y: f64) -> bool {
        self.fx.borrow_mut().pointer_move(x, y)
    }

    #[wasm_bindgen(js_name = pointerLeave)]
    pub fn pointer_leave(&mut self) {
        self.fx.borrow_mut().pointer_leave();
    }

    #[wasm_bindgen(js_name = setPageVisible)]
    pub fn set_page_visible(&mut self, visible: bool) {
        self.fx.borrow_mut().set_page_visible(visible);
    }

    /// Viewport resized; also re-evaluates the desktop/mobile profile.
    pub fn resize(&mut self, width: f64, height: f64, device_pixel_ratio: f64) -> Result<JsValue, JsValue> {
        let window = window()?;
        let profile = RendererProfile::detect(
            media_matches(&window, "(hover: hover)"),
            media_matches(&window, "(pointer: fine)"),
            window.navigator().max_touch_points() > 0,
        );
        let info = {
            let mut fx = self.fx.borrow_mut();
            fx.set_profile(profile);
            fx.resize(width, height, device_pixel_ratio)
        };
        if info.is_some() {
            self.paint_trail();
        }
        Ok(to_js(&info))
    }

    // -- sequences -------------------------------------------------------

    #[wasm_bindgen(js_name = beginSequence)]
    pub fn begin_sequence(&mut self) -> String {
        bridge::transition_str(self.fx.borrow_mut().begin_sequence()).to_owned()
    }

    #[wasm_bindgen(js_name = endSequence)]
    pub fn end_sequence(&mut self) -> String {
        bridge::transition_str(self.fx.borrow_mut().end_sequence()).to_owned()
    }

    // -- readiness -------------------------------------------------------

    /// Promise of `{canvas, webgl}` details once every effect reported.
    #[wasm_bindgen(js_name = whenReady)]
    pub fn when_ready(&self) -> js_sys::Promise {
        let wait = self.fx.borrow().when_ready();
        future_to_promise(async move { Ok(to_js(&wait.await.to_json())) })
    }

    /// Promise of one component's detail; throws for unknown names.
    #[wasm_bindgen(js_name = whenComponentReady)]
    pub fn when_component_ready(&self, name: &str) -> Result<js_sys::Promise, JsValue> {
        let wait = self.fx.borrow().when_component_ready(name).map_err(js_error)?;
        Ok(future_to_promise(async move { Ok(to_js(&wait.await.to_json())) }))
    }

    /// Signal a component the page initializes itself.
    pub fn signal(&mut self, name: &str, detail: JsValue) -> bool {
        self.fx
            .borrow_mut()
            .signal(name, EffectDetail::Custom(from_js(&detail)))
            .is_some()
    }

    // -- media -----------------------------------------------------------

    /// Register a video; it autoplays while visible in the viewport.
    #[wasm_bindgen(js_name = registerVideo)]
    pub fn register_video(&mut self, element: HtmlMediaElement) -> f64 {
        self.forget_element(&element);
        self.viewport.borrow_mut().stage(element.clone().into());
        let id = self.with_media(|media| {
            media.register(Rc::new(DomMedia(element.clone())), MediaKind::Video)
        });
        self.viewport.borrow_mut().unstage();
        self.media.push((id, element));
        id.get() as f64
    }

    /// Register an audio message with its `data-audio-tracks` attribute.
    #[wasm_bindgen(js_name = registerAudio)]
    pub fn register_audio(
        &mut self,
        element: HtmlMediaElement,
        tracks_attr: Option<String>,
        index_attr: Option<String>,
        label: Option<String>,
    ) -> f64 {
        self.forget_element(&element);
        let fallback = element.src();
        let label = label.unwrap_or_else(|| self.fx.borrow().config().media.default_audio_label.clone());
        let managed: Rc<dyn MediaElement> = Rc::new(DomMedia(element.clone()));
        let id = self.with_media(|media| match tracks_attr {
            Some(attr) => {
                let tracks = TrackList::from_json_attr(&attr, &fallback, index_attr.as_deref(), label);
                media.register_audio_tracks(managed, tracks)
            }
            None => media.register(managed, MediaKind::Audio),
        });
        self.media.push((id, element));
        id.get() as f64
    }

    #[wasm_bindgen(js_name = deregisterMedia)]
    pub fn deregister_media(&mut self, id: f64) -> bool {
        let Some(id) = self.media_id(id) else {
            return false;
        };
        self.media.retain(|(m, _)| *m != id);
        self.with_media(|media| media.deregister(id))
    }

    #[wasm_bindgen(js_name = notifyPlay)]
    pub fn notify_play(&mut self, id: f64) {
        if let Some(id) = self.media_id(id) {
            self.with_media(|media| media.notify_play(id));
        }
    }

    #[wasm_bindgen(js_name = notifyPause)]
    pub fn notify_pause(&mut self, id: f64) {
        if let Some(id) = self.media_id(id) {
            self.with_media(|media| media.notify_pause(id));
        }
    }

    #[wasm_bindgen(js_name = notifyEnded)]
    pub fn notify_ended(&mut self, id: f64) {
        if let Some(id) = self.media_id(id) {
            self.with_media(|media| media.notify_ended(id));
        }
    }

    #[wasm_bindgen(js_name = notifyPlayRejected)]
    pub fn notify_play_rejected(&mut self, id: f64) {
        if let Some(id) = self.media_id(id) {
            self.with_media(|media| media.notify_play_rejected(id));
        }
    }

    /// Manual visibility report, for pages driving their own observer.
    #[wasm_bindgen(js_name = notifyIntersection)]
    pub fn notify_intersection(&mut self, id: f64, ratio: f64) -> bool {
        self.media_id(id)
            .is_some_and(|id| self.with_media(|media| media.notify_intersection(id, ratio)))
    }

    pub fn play(&mut self, id: f64) -> Result<String, JsValue> {
        let id = self.media_id(id).ok_or_else(|| js_error("media element is not managed"))?;
        let outcome = self.with_media(|media| media.play(id)).map_err(js_error)?;
        Ok(bridge::play_outcome_str(outcome).to_owned())
    }

    pub fn toggle(&mut self, id: f64) -> Result<String, JsValue> {
        let id = self.media_id(id).ok_or_else(|| js_error("media element is not managed"))?;
        let outcome = self.with_media(|media| media.toggle(id)).map_err(js_error)?;
        Ok(bridge::play_outcome_str(outcome).to_owned())
    }

    /// Step an audio message's track. Returns the new index, if it changed.
    #[wasm_bindgen(js_name = stepTrack)]
    pub fn step_track(&mut self, id: f64, forward: bool) -> Result<Option<u32>, JsValue> {
        let id = self.media_id(id).ok_or_else(|| js_error("media element is not managed"))?;
        let switch = self
            .with_media(|media| {
                if forward {
                    media.next_track(id)
                } else {
                    media.previous_track(id)
                }
            })
            .map_err(js_error)?;
        Ok(match switch {
            TrackSwitch::Switched { index, .. } => u32::try_from(index).ok(),
            TrackSwitch::NoTracks | TrackSwitch::Unchanged => None,
        })
    }

    #[wasm_bindgen(js_name = pauseAllMedia)]
    pub fn pause_all_media(&mut self) -> u32 {
        u32::try_from(self.with_media(|media| media.pause_all(None))).unwrap_or(u32::MAX)
    }

    // -- glass -----------------------------------------------------------

    /// Install glass surfaces drawing maps with `builder`.
    #[wasm_bindgen(js_name = installGlass)]
    pub fn install_glass(&mut self, builder: Function) {
        let backend = DomGlassBackend {
            hosts: Rc::clone(&self.hosts),
            builder,
        };
        self.fx.borrow_mut().install_glass(Box::new(backend));
    }

    /// Attach a glass surface with a named preset or a JSON options object.
    /// Returns a key for `detachGlass`.
    #[wasm_bindgen(js_name = attachGlass)]
    pub fn attach_glass(&mut self, element: Element, preset: &str) -> Result<Option<u32>, JsValue> {
        let element: HtmlElement = element.dyn_into()?;
        let options = match bridge::preset_from_name(preset) {
            Some(preset) => preset.options(),
            None => serde_json::from_str::<GlassOptions>(preset).map_err(js_error)?,
        };
        let key = self.next_host;
        let host = HostKey(u64::from(key));
        self.hosts.borrow_mut().insert(host, element);
        let Some(id) = self.fx.borrow_mut().attach_glass(host, options) else {
            self.hosts.borrow_mut().remove(&host);
            return Ok(None);
        };
        self.next_host += 1;
        self.surfaces.insert(key, id);
        Ok(Some(key))
    }

    #[wasm_bindgen(js_name = detachGlass)]
    pub fn detach_glass(&mut self, key: u32) -> bool {
        self.hosts.borrow_mut().remove(&HostKey(u64::from(key)));
        self.surfaces
            .remove(&key)
            .is_some_and(|id| self.fx.borrow_mut().detach_glass(id))
    }

    /// Promise settled after the surface's first presentation.
    #[wasm_bindgen(js_name = whenGlassReady)]
    pub fn when_glass_ready(&self, key: u32) -> Option<js_sys::Promise> {
        let id = *self.surfaces.get(&key)?;
        let glass = self.fx.borrow().glass()?;
        let wait = glass.borrow().when_surface_ready(id)?;
        Some(future_to_promise(async move {
            wait.await;
            Ok(JsValue::UNDEFINED)
        }))
    }

    // -- diagnostics -----------------------------------------------------

    /// `"high"` or `"recovery"`.
    #[wasm_bindgen(js_name = qualityMode)]
    pub fn quality_mode(&self) -> String {
        self.fx.borrow().quality().mode().as_str().to_owned()
    }

    /// Re-run a GPU check supplied by page script (JSON of the strict and
    /// relaxed contexts). The first assessment is kept.
    #[wasm_bindgen(js_name = reportGpuProbe)]
    pub fn report_gpu_probe(&mut self, strict: Option<String>, relaxed: Option<String>) -> Result<String, JsValue> {
        let probe = bridge::parse_probe(strict.as_deref(), relaxed.as_deref()).map_err(js_error)?;
        Ok(bridge::assessment_str(self.fx.borrow_mut().report_gpu_probe(&probe)).to_owned())
    }
}
