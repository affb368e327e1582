#![forbid(unsafe_code)]

//! Glass distortion surfaces.
//!
//! Each surface is a host element rendered through a displacement filter.
//! [`GlassSurfaces`] keeps the registry, derives filter parameters from the
//! surface options, its measured size, and the current quality tier, and
//! hands them to a [`DistortionBackend`] which owns the actual drawing.
//!
//! Parameter derivation is a pure function, [`derive_render`]:
//!
//! - size is rounded to a tenth of a pixel, minimum 1;
//! - surfaces larger than `disable_filter_above` fall back to a plain style;
//! - blur scales by `0.7 + 0.3q`, displacement and distortion by `q`;
//! - the displacement map resolution is clamped by the max/min filter
//!   resolution (in CSS pixels, times the device pixel ratio).
//!
//! # Failure Modes
//!
//! A host that is not connected, or cannot be measured, is left pending and
//! picked up by the next refresh. Its ready signal waits until then.

use core::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::deferred::{Deferred, Wait};
use crate::quality::{QualityChange, QualityConsumer, QualityMode};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Displacement channel selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorChannel {
    /// Red.
    R,
    /// Green.
    G,
    /// Blue.
    B,
    /// Alpha.
    A,
}

impl ColorChannel {
    /// Attribute value of the channel selector.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::R => "R",
            Self::G => "G",
            Self::B => "B",
            Self::A => "A",
        }
    }
}

/// Per-surface options. Every field has a default, so JSON may be partial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GlassOptions {
    /// Edge width as a fraction of the shorter side. Default: 0.07.
    pub border_width: f64,
    /// Inner fill lightness in percent. Default: 40.
    pub brightness: f64,
    /// Inner fill opacity. Default: 0.93.
    pub opacity: f64,
    /// Inner fill blur in pixels. Default: 11.
    pub blur: f64,
    /// Output blur standard deviation. Default: 0.
    pub displace: f64,
    /// Backdrop saturation. Default: 2.4.
    pub saturation: f64,
    /// Frost layer opacity. Default: 0.
    pub background_opacity: f64,
    /// Base displacement scale. Default: -180.
    pub distortion_scale: f64,
    /// Red channel scale offset. Default: 0.
    pub red_offset: f64,
    /// Green channel scale offset. Default: 10.
    pub green_offset: f64,
    /// Blue channel scale offset. Default: 20.
    pub blue_offset: f64,
    /// Horizontal displacement channel. Default: R.
    pub x_channel: ColorChannel,
    /// Vertical displacement channel. Default: G.
    pub y_channel: ColorChannel,
    /// Blend mode of the map's blue gradient. Default: "difference".
    pub mix_blend_mode: String,
    /// Multiplier in recovery; the global one is used when unset.
    pub recovery_multiplier: Option<f64>,
    /// Largest map dimension, in CSS pixels.
    pub max_filter_resolution: Option<f64>,
    /// Smallest map dimension, in CSS pixels.
    pub min_filter_resolution: Option<f64>,
    /// Surfaces wider or taller than this use the fallback style.
    pub disable_filter_above: Option<f64>,
}

impl Default for GlassOptions {
    fn default() -> Self {
        Self {
            border_width: 0.07,
            brightness: 40.0,
            opacity: 0.93,
            blur: 11.0,
            displace: 0.0,
            saturation: 2.4,
            background_opacity: 0.0,
            distortion_scale: -180.0,
            red_offset: 0.0,
            green_offset: 10.0,
            blue_offset: 20.0,
            x_channel: ColorChannel::R,
            y_channel: ColorChannel::G,
            mix_blend_mode: "difference".to_owned(),
            recovery_multiplier: None,
            max_filter_resolution: None,
            min_filter_resolution: None,
            disable_filter_above: None,
        }
    }
}

/// Named option sets used by the page chrome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GlassPreset {
    /// Project launcher buttons.
    ProjectButton,
    /// Plain chat bubbles.
    Message,
    /// Chat bubbles holding images or video.
    MessageMedia,
    /// Chat bubbles holding a 3D model viewer.
    MessageModel,
    /// The "typing" dots.
    TypingIndicator,
    /// Zoom buttons of the media viewer.
    ZoomControls,
}

impl GlassPreset {
    /// Options of this preset.
    #[must_use]
    pub fn options(self) -> GlassOptions {
        let chat = GlassOptions {
            border_width: 0.1,
            background_opacity: 0.1,
            blur: 12.0,
            displace: 2.0,
            distortion_scale: -150.0,
            red_offset: 4.0,
            green_offset: 12.0,
            blue_offset: 20.0,
            recovery_multiplier: Some(0.7),
            max_filter_resolution: Some(750.0),
            min_filter_resolution: Some(500.0),
            ..GlassOptions::default()
        };
        match self {
            Self::ProjectButton => GlassOptions {
                border_width: 0.03,
                background_opacity: 0.155,
                blur: 7.0,
                displace: 1.2,
                distortion_scale: -110.0,
                red_offset: 4.0,
                green_offset: 12.0,
                blue_offset: 20.0,
                recovery_multiplier: Some(0.7),
                ..GlassOptions::default()
            },
            Self::Message => chat,
            Self::MessageMedia => GlassOptions {
                border_width: 0.13,
                max_filter_resolution: Some(5.0),
                min_filter_resolution: Some(5.0),
                disable_filter_above: Some(350.0),
                ..chat
            },
            Self::MessageModel => GlassOptions {
                border_width: 0.13,
                max_filter_resolution: Some(50.0),
                min_filter_resolution: Some(30.0),
                ..chat
            },
            Self::TypingIndicator => GlassOptions {
                background_opacity: 0.15,
                blur: 12.0,
                displace: 2.0,
                distortion_scale: -150.0,
                red_offset: 4.0,
                green_offset: 12.0,
                blue_offset: 20.0,
                mix_blend_mode: "screen".to_owned(),
                recovery_multiplier: Some(0.6),
                ..GlassOptions::default()
            },
            Self::ZoomControls => GlassOptions {
                background_opacity: 0.4,
                blur: 9.0,
                displace: 0.45,
                distortion_scale: -110.0,
                red_offset: 2.0,
                green_offset: 8.0,
                blue_offset: 14.0,
                mix_blend_mode: "screen".to_owned(),
                recovery_multiplier: Some(0.7),
                ..GlassOptions::default()
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Measured geometry of a host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceMeasure {
    /// Layout width in CSS pixels.
    pub width: f64,
    /// Layout height in CSS pixels.
    pub height: f64,
    /// Corner radius in CSS pixels.
    pub radius: f64,
    /// Device pixel ratio.
    pub device_pixel_ratio: f64,
}

/// Inputs of the displacement map drawing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplacementStyle {
    /// Edge width fraction.
    pub border_width: f64,
    /// Inner fill lightness.
    pub brightness: f64,
    /// Inner fill opacity.
    pub opacity: f64,
    /// Quality-adjusted inner blur.
    pub blur: f64,
    /// Blend mode of the blue gradient.
    pub mix_blend_mode: String,
}

/// Quality-adjusted filter parameters of one surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    /// Rounded layout width.
    pub width: f64,
    /// Rounded layout height.
    pub height: f64,
    /// Layout corner radius.
    pub radius: f64,
    /// Map width after resolution clamping.
    pub render_width: u32,
    /// Map height after resolution clamping.
    pub render_height: u32,
    /// Map corner radius after resolution clamping.
    pub render_radius: f64,
    /// Displacement scale of the red, green, and blue passes.
    pub channel_scales: [f64; 3],
    /// Horizontal displacement channel.
    pub x_channel: ColorChannel,
    /// Vertical displacement channel.
    pub y_channel: ColorChannel,
    /// Output blur standard deviation.
    pub std_deviation: f64,
    /// Frost layer opacity.
    pub background_opacity: f64,
    /// Backdrop saturation.
    pub saturation: f64,
    /// Map drawing inputs.
    pub style: DisplacementStyle,
}

/// How a surface is presented.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceRender {
    /// Plain translucent style without a filter.
    Fallback,
    /// Displacement filter.
    Filter(FilterParams),
}

/// Effective quality multiplier of `options` in `mode`.
#[must_use]
pub fn quality_multiplier(options: &GlassOptions, mode: QualityMode, global: f64) -> f64 {
    match mode {
        QualityMode::High => 1.0,
        QualityMode::Recovery => options.recovery_multiplier.unwrap_or(global),
    }
}

fn round_tenth(v: f64) -> f64 {
    ((v * 10.0).round() / 10.0).max(1.0)
}

/// Derive the presentation of a surface.
#[must_use]
pub fn derive_render(options: &GlassOptions, measure: SurfaceMeasure, quality: f64) -> SurfaceRender {
    let width = round_tenth(measure.width);
    let height = round_tenth(measure.height);

    if let Some(limit) = options.disable_filter_above.filter(|t| *t > 0.0)
        && (width > limit || height > limit)
    {
        return SurfaceRender::Fallback;
    }

    let blur = (options.blur * (0.7 + 0.3 * quality)).max(0.0);
    let displace = options.displace * quality;
    let distortion = options.distortion_scale * quality;

    let dpr = if measure.device_pixel_ratio > 0.0 {
        measure.device_pixel_ratio
    } else {
        1.0
    };
    let max_dimension = width.max(height);
    let mut scale: f64 = 1.0;
    if let Some(max_res) = options.max_filter_resolution.filter(|r| *r > 0.0) {
        let limit = max_res * dpr;
        if max_dimension > limit {
            scale = limit / max_dimension;
        }
    }
    if let Some(min_res) = options.min_filter_resolution.filter(|r| *r > 0.0) {
        let min_scale = (min_res * dpr / max_dimension).min(1.0);
        scale = scale.max(min_scale);
    }

    let radius = measure.radius.max(0.0);
    SurfaceRender::Filter(FilterParams {
        width,
        height,
        radius,
        render_width: (width * scale).round().max(1.0) as u32,
        render_height: (height * scale).round().max(1.0) as u32,
        render_radius: (radius * scale).max(0.0),
        channel_scales: [
            distortion + options.red_offset,
            distortion + options.green_offset,
            distortion + options.blue_offset,
        ],
        x_channel: options.x_channel,
        y_channel: options.y_channel,
        std_deviation: displace.max(0.0),
        background_opacity: options.background_opacity,
        saturation: options.saturation,
        style: DisplacementStyle {
            border_width: options.border_width,
            brightness: options.brightness,
            opacity: options.opacity,
            blur,
            mix_blend_mode: options.mix_blend_mode.clone(),
        },
    })
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Embedder-assigned identity of a host element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostKey(pub u64);

/// Identifier of an attached surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SurfaceId(u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "glass-{}", self.0)
    }
}

/// Opaque handle to a built displacement map (a data URI in browsers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef(pub String);

/// The drawing side of glass surfaces.
pub trait DistortionBackend {
    /// Whether the host is attached to the document.
    fn is_connected(&self, host: HostKey) -> bool;
    /// Measure the host; `None` while it has no layout.
    fn measure(&self, host: HostKey) -> Option<SurfaceMeasure>;
    /// Build a displacement map of `width × height` map pixels.
    fn build_displacement_asset(
        &mut self,
        width: u32,
        height: u32,
        radius: f64,
        style: &DisplacementStyle,
    ) -> AssetRef;
    /// Apply the derived presentation to the host.
    fn present(
        &mut self,
        host: HostKey,
        id: SurfaceId,
        render: &SurfaceRender,
        asset: Option<&AssetRef>,
    );
}

struct Surface {
    id: SurfaceId,
    host: HostKey,
    options: GlassOptions,
    ready: Deferred<()>,
    pending: bool,
    last: Option<SurfaceRender>,
}

/// Registry of glass surfaces sharing one backend.
pub struct GlassSurfaces {
    backend: Box<dyn DistortionBackend>,
    surfaces: Vec<Surface>,
    scheduled: Vec<SurfaceId>,
    next_id: u64,
    mode: QualityMode,
    global_multiplier: f64,
}

impl fmt::Debug for GlassSurfaces {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlassSurfaces")
            .field("surfaces", &self.surfaces.len())
            .field("scheduled", &self.scheduled)
            .field("mode", &self.mode)
            .finish()
    }
}

impl GlassSurfaces {
    /// Empty registry drawing through `backend`.
    pub fn new(backend: Box<dyn DistortionBackend>) -> Self {
        Self {
            backend,
            surfaces: Vec::new(),
            scheduled: Vec::new(),
            next_id: 1,
            mode: QualityMode::High,
            global_multiplier: 1.0,
        }
    }

    /// Attach a surface to `host`, or replace the options of the surface
    /// already attached there. Either way an update is scheduled.
    pub fn attach(&mut self, host: HostKey, options: GlassOptions) -> SurfaceId {
        let id = if let Some(existing) = self.surfaces.iter_mut().find(|s| s.host == host) {
            existing.options = options;
            existing.id
        } else {
            let id = SurfaceId(self.next_id);
            self.next_id += 1;
            self.surfaces.push(Surface {
                id,
                host,
                options,
                ready: Deferred::new(),
                pending: false,
                last: None,
            });
            debug!(%id, "glass surface attached");
            id
        };
        self.schedule(id);
        id
    }

    /// Attach with a preset.
    pub fn attach_preset(&mut self, host: HostKey, preset: GlassPreset) -> SurfaceId {
        self.attach(host, preset.options())
    }

    /// Remove a surface. Returns `false` if unknown.
    pub fn detach(&mut self, id: SurfaceId) -> bool {
        let before = self.surfaces.len();
        self.surfaces.retain(|s| s.id != id);
        self.scheduled.retain(|s| *s != id);
        self.surfaces.len() != before
    }

    /// Queue an update of `id` for the next frame.
    pub fn schedule(&mut self, id: SurfaceId) {
        if !self.scheduled.contains(&id) {
            self.scheduled.push(id);
        }
    }

    /// Queue an update of every surface.
    pub fn refresh_all(&mut self) {
        let ids: Vec<SurfaceId> = self.surfaces.iter().map(|s| s.id).collect();
        for id in ids {
            self.schedule(id);
        }
    }

    /// Whether updates are queued.
    #[must_use]
    pub fn has_scheduled(&self) -> bool {
        !self.scheduled.is_empty()
    }

    /// Run queued updates. Returns how many surfaces were presented.
    pub fn run_scheduled(&mut self) -> usize {
        let due = core::mem::take(&mut self.scheduled);
        due.into_iter()
            .filter(|id| self.refresh(*id).is_some())
            .count()
    }

    /// Update `id` immediately, dropping any queued update of it.
    pub fn refresh(&mut self, id: SurfaceId) -> Option<SurfaceRender> {
        self.scheduled.retain(|s| *s != id);
        let mode = self.mode;
        let global = self.global_multiplier;
        let surface = self.surfaces.iter_mut().find(|s| s.id == id)?;

        if !self.backend.is_connected(surface.host) {
            surface.pending = true;
            return None;
        }
        let Some(measure) = self.backend.measure(surface.host) else {
            surface.pending = true;
            return None;
        };
        let quality = quality_multiplier(&surface.options, mode, global);
        let render = derive_render(&surface.options, measure, quality);
        match &render {
            SurfaceRender::Fallback => {
                self.backend.present(surface.host, id, &render, None);
            }
            SurfaceRender::Filter(params) => {
                let asset = self.backend.build_displacement_asset(
                    params.render_width,
                    params.render_height,
                    params.render_radius,
                    &params.style,
                );
                self.backend.present(surface.host, id, &render, Some(&asset));
            }
        }
        surface.pending = false;
        surface.last = Some(render.clone());
        surface.ready.resolve(());
        Some(render)
    }

    /// Re-run every surface left pending by a disconnected or unmeasured host.
    pub fn retry_pending(&mut self) -> usize {
        let ids: Vec<SurfaceId> = self
            .surfaces
            .iter()
            .filter(|s| s.pending)
            .map(|s| s.id)
            .collect();
        ids.into_iter()
            .filter(|id| self.refresh(*id).is_some())
            .count()
    }

    /// Future completing after the first successful presentation of `id`.
    pub fn when_surface_ready(&self, id: SurfaceId) -> Option<Wait<()>> {
        self.surface(id).map(|s| s.ready.wait())
    }

    /// Whether `id` has been presented at least once.
    #[must_use]
    pub fn is_surface_ready(&self, id: SurfaceId) -> bool {
        self.surface(id).is_some_and(|s| s.ready.is_resolved())
    }

    /// Last presentation of `id`.
    #[must_use]
    pub fn last_render(&self, id: SurfaceId) -> Option<&SurfaceRender> {
        self.surface(id).and_then(|s| s.last.as_ref())
    }

    /// Options of `id`.
    #[must_use]
    pub fn options(&self, id: SurfaceId) -> Option<&GlassOptions> {
        self.surface(id).map(|s| &s.options)
    }

    /// Surface attached to `host`.
    #[must_use]
    pub fn surface_for(&self, host: HostKey) -> Option<SurfaceId> {
        self.surfaces.iter().find(|s| s.host == host).map(|s| s.id)
    }

    /// Number of surfaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    /// Whether no surfaces are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    fn surface(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.iter().find(|s| s.id == id)
    }
}

impl QualityConsumer for GlassSurfaces {
    fn apply_quality(&mut self, change: &QualityChange) {
        self.mode = change.mode;
        self.global_multiplier = change.multiplier;
        self.refresh_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use std::cell::RefCell;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Log {
        presented: Vec<(SurfaceId, bool)>,
        built: Vec<(u32, u32)>,
    }

    struct FakeBackend {
        size: (f64, f64),
        connected: Rc<RefCell<bool>>,
        log: Rc<RefCell<Log>>,
    }

    impl DistortionBackend for FakeBackend {
        fn is_connected(&self, _host: HostKey) -> bool {
            *self.connected.borrow()
        }
        fn measure(&self, _host: HostKey) -> Option<SurfaceMeasure> {
            Some(SurfaceMeasure {
                width: self.size.0,
                height: self.size.1,
                radius: 20.0,
                device_pixel_ratio: 2.0,
            })
        }
        fn build_displacement_asset(
            &mut self,
            width: u32,
            height: u32,
            _radius: f64,
            _style: &DisplacementStyle,
        ) -> AssetRef {
            self.log.borrow_mut().built.push((width, height));
            AssetRef(format!("map:{width}x{height}"))
        }
        fn present(
            &mut self,
            _host: HostKey,
            id: SurfaceId,
            render: &SurfaceRender,
            asset: Option<&AssetRef>,
        ) {
            assert_eq!(asset.is_some(), matches!(render, SurfaceRender::Filter(_)));
            self.log
                .borrow_mut()
                .presented
                .push((id, matches!(render, SurfaceRender::Filter(_))));
        }
    }

    fn measure(width: f64, height: f64, dpr: f64) -> SurfaceMeasure {
        SurfaceMeasure {
            width,
            height,
            radius: 10.0,
            device_pixel_ratio: dpr,
        }
    }

    fn filter(render: SurfaceRender) -> FilterParams {
        match render {
            SurfaceRender::Filter(params) => params,
            SurfaceRender::Fallback => panic!("expected filter"),
        }
    }

    #[test]
    fn full_quality_keeps_option_values() {
        let options = GlassPreset::ProjectButton.options();
        let p = filter(derive_render(&options, measure(120.04, 40.0, 1.0), 1.0));
        assert_eq!(p.width, 120.0);
        assert_eq!(p.style.blur, 7.0);
        assert_eq!(p.std_deviation, 1.2);
        assert_eq!(p.channel_scales, [-106.0, -98.0, -90.0]);
        assert_eq!((p.render_width, p.render_height), (120, 40));
        assert_eq!(p.style.mix_blend_mode, "difference");
    }

    #[test]
    fn recovery_curves_scale_parameters() {
        let options = GlassPreset::TypingIndicator.options();
        let q = quality_multiplier(&options, QualityMode::Recovery, 0.8);
        assert_eq!(q, 0.6);
        let p = filter(derive_render(&options, measure(60.0, 30.0, 1.0), q));
        assert!((p.style.blur - 12.0 * 0.88).abs() < 1e-9);
        assert!((p.std_deviation - 1.2).abs() < 1e-9);
        assert!((p.channel_scales[0] - (-90.0 + 4.0)).abs() < 1e-9);

        let plain = GlassOptions::default();
        assert_eq!(quality_multiplier(&plain, QualityMode::Recovery, 0.8), 0.8);
        assert_eq!(quality_multiplier(&plain, QualityMode::High, 0.8), 1.0);
    }

    #[test]
    fn resolution_is_clamped_between_limits() {
        let options = GlassPreset::Message.options();
        // 2000px wide at dpr 1: capped to 750.
        let p = filter(derive_render(&options, measure(2000.0, 100.0, 1.0), 1.0));
        assert_eq!((p.render_width, p.render_height), (750, 38));
        assert!((p.render_radius - 3.75).abs() < 1e-9);

        // 300px wide: min limit 500 would upscale, but never past 1.
        let p = filter(derive_render(&options, measure(300.0, 100.0, 1.0), 1.0));
        assert_eq!(p.render_width, 300);

        // Model bubbles are rendered tiny and scaled up by the filter.
        let model = GlassPreset::MessageModel.options();
        let p = filter(derive_render(&model, measure(400.0, 200.0, 2.0), 1.0));
        assert_eq!((p.render_width, p.render_height), (100, 50));
    }

    #[test]
    fn large_media_bubbles_fall_back() {
        let options = GlassPreset::MessageMedia.options();
        assert_eq!(
            derive_render(&options, measure(351.0, 100.0, 1.0), 1.0),
            SurfaceRender::Fallback
        );
        assert!(matches!(
            derive_render(&options, measure(350.0, 100.0, 1.0), 1.0),
            SurfaceRender::Filter(_)
        ));
    }

    #[test]
    fn tiny_hosts_round_to_one_pixel() {
        let p = filter(derive_render(&GlassOptions::default(), measure(0.0, 0.02, 1.0), 1.0));
        assert_eq!((p.width, p.height), (1.0, 1.0));
        assert_eq!((p.render_width, p.render_height), (1, 1));
    }

    #[test]
    fn registry_schedules_refreshes_and_signals_ready_once_presented() {
        let connected = Rc::new(RefCell::new(false));
        let log = Rc::new(RefCell::new(Log::default()));
        let mut glass = GlassSurfaces::new(Box::new(FakeBackend {
            size: (200.0, 80.0),
            connected: Rc::clone(&connected),
            log: Rc::clone(&log),
        }));

        let id = glass.attach_preset(HostKey(7), GlassPreset::ZoomControls);
        assert_eq!(glass.attach(HostKey(7), GlassOptions::default()), id);
        assert_eq!(glass.len(), 1);
        assert!(glass.has_scheduled());

        let ready = glass.when_surface_ready(id).unwrap();
        assert_eq!(glass.run_scheduled(), 0, "host not connected yet");
        assert!(ready.now_or_never().is_none());

        *connected.borrow_mut() = true;
        assert_eq!(glass.retry_pending(), 1);
        assert!(glass.is_surface_ready(id));
        pollster::block_on(ready);
        assert_eq!(log.borrow().built, vec![(200, 80)]);
        assert_eq!(glass.options(id), Some(&GlassOptions::default()));
    }

    #[test]
    fn quality_change_refreshes_every_surface() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut glass = GlassSurfaces::new(Box::new(FakeBackend {
            size: (100.0, 40.0),
            connected: Rc::new(RefCell::new(true)),
            log: Rc::clone(&log),
        }));
        let a = glass.attach_preset(HostKey(1), GlassPreset::ProjectButton);
        let b = glass.attach_preset(HostKey(2), GlassPreset::TypingIndicator);
        assert_eq!(glass.run_scheduled(), 2);

        glass.apply_quality(&QualityChange {
            mode: QualityMode::Recovery,
            multiplier: 0.8,
            at: Duration::ZERO,
            fps: Some(30.0),
        });
        assert_eq!(glass.run_scheduled(), 2);
        let scales = |id| match glass.last_render(id) {
            Some(SurfaceRender::Filter(p)) => p.channel_scales[0],
            _ => f64::NAN,
        };
        assert!((scales(a) - (-110.0 * 0.7 + 4.0)).abs() < 1e-9);
        assert!((scales(b) - (-150.0 * 0.6 + 4.0)).abs() < 1e-9);
        assert_eq!(log.borrow().presented.len(), 4);

        assert!(glass.detach(a));
        assert_eq!(glass.surface_for(HostKey(1)), None);
    }
}
