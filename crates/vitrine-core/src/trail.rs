#![forbid(unsafe_code)]

//! Cursor-trail text animation model.
//!
//! Pointer motion lays glyphs of a source text along the cursor path; each
//! glyph then ages through a fixed lifecycle:
//!
//! ```text
//!  0 ─── color_delay ─── hold ─── +shrink_hold ─── +shrink_duration
//!  │ initial color │ fade to target │ steady │ shuffle + shrink │ expired
//! ```
//!
//! The host draws [`TrailAnimation::glyphs`] after every rendered
//! [`tick`](TrailAnimation::tick). Ticks are throttled to `target_fps`;
//! the loop stops on its own once every glyph has expired.
//!
//! # Invariants
//!
//! 1. `glyphs().len() <= max_glyphs()` after every call.
//! 2. While frozen, pointer input is ignored and no tick renders.
//! 3. Glyph sizes stay within `[min_font_size, max_font_size]`.

use core::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::duration_ms;
use crate::pause_gate::GatedAnimation;
use crate::quality::{QualityChange, QualityConsumer, QualityMode};

const DEFAULT_SOURCE_TEXT: &str = "There was a table set out under a tree in front of the house, \
and the March Hare and the Hatter were having tea at it: a Dormouse was sitting between them, \
fast asleep, and the other two were using it as a cushion, resting their elbows on it, and \
talking over its head.";

const DEFAULT_SHUFFLE_CHARS: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()_+-=[]{}|;:,.<>?/~`";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Timings, caps, and text of the trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrailConfig {
    /// Full-size lifetime. Default: 1800 ms.
    #[serde(with = "crate::config::millis")]
    pub hold: Duration,
    /// Initial-color phase at the start of `hold`. Default: 450 ms.
    #[serde(with = "crate::config::millis")]
    pub color_delay: Duration,
    /// Steady phase after `hold`. Default: 200 ms.
    #[serde(with = "crate::config::millis")]
    pub shrink_hold: Duration,
    /// Shrink-to-nothing phase. Default: 800 ms.
    #[serde(with = "crate::config::millis")]
    pub shrink_duration: Duration,
    /// Character shuffle period while shrinking. Default: 100 ms.
    #[serde(with = "crate::config::millis")]
    pub shuffle_interval: Duration,
    /// Render throttle. Default: 30.
    pub target_fps: f64,
    /// Glyph cap in high quality. Default: 270.
    pub max_glyphs_high: usize,
    /// Glyph cap in recovery. Default: 190.
    pub max_glyphs_recovery: usize,
    /// Minimum spacing between emitted glyphs in high quality. Default: 10 ms.
    #[serde(with = "crate::config::millis")]
    pub min_emit_interval_high: Duration,
    /// Minimum spacing between emitted glyphs in recovery. Default: 16 ms.
    #[serde(with = "crate::config::millis")]
    pub min_emit_interval_recovery: Duration,
    /// Device-pixel-ratio cap in high quality. Default: 1.5.
    pub dpr_cap_high: f64,
    /// Device-pixel-ratio cap in recovery. Default: 1.0.
    pub dpr_cap_recovery: f64,
    /// Pointer idle time after which drawing stops. Default: 4000 ms.
    #[serde(with = "crate::config::millis")]
    pub inactivity_timeout: Duration,
    /// Smallest glyph size in CSS pixels. Default: 5.
    pub min_font_size: f64,
    /// Largest glyph size in CSS pixels. Default: 180.
    pub max_font_size: f64,
    /// Pen advance per glyph as a fraction of its size. Default: 0.55.
    pub advance_ratio: f64,
    /// Text laid along the cursor path.
    pub source_text: String,
    /// Characters cycled through while a glyph shrinks.
    pub shuffle_chars: String,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            hold: Duration::from_millis(1800),
            color_delay: Duration::from_millis(450),
            shrink_hold: Duration::from_millis(200),
            shrink_duration: Duration::from_millis(800),
            shuffle_interval: Duration::from_millis(100),
            target_fps: 30.0,
            max_glyphs_high: 270,
            max_glyphs_recovery: 190,
            min_emit_interval_high: Duration::from_millis(10),
            min_emit_interval_recovery: Duration::from_millis(16),
            dpr_cap_high: 1.5,
            dpr_cap_recovery: 1.0,
            inactivity_timeout: Duration::from_millis(4000),
            min_font_size: 5.0,
            max_font_size: 180.0,
            advance_ratio: 0.55,
            source_text: DEFAULT_SOURCE_TEXT.to_owned(),
            shuffle_chars: DEFAULT_SHUFFLE_CHARS.to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Glyphs
// ---------------------------------------------------------------------------

/// Gray level and alpha of a glyph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GlyphColor {
    /// Gray level, nominally 0..=255.
    pub value: f64,
    /// Alpha, nominally 0..=1.
    pub alpha: f64,
}

impl GlyphColor {
    /// Color of a freshly emitted glyph.
    pub const INITIAL: Self = Self { value: 250.0, alpha: -0.05 };
    /// Color at the end of the fade-in.
    pub const TARGET: Self = Self { value: 120.0, alpha: 1.0 };
    /// Color when fully shrunk.
    pub const END: Self = Self { value: 0.0, alpha: 0.9 };

    fn lerp(self, to: Self, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self {
            value: self.value + (to.value - self.value) * t,
            alpha: self.alpha + (to.alpha - self.alpha) * t,
        }
    }

    /// CSS `rgba()` fill style, clamped into range.
    #[must_use]
    pub fn css(self) -> String {
        let gray = self.value.clamp(0.0, 255.0).round() as u8;
        let alpha = self.alpha.clamp(0.0, 1.0);
        format!("rgba({gray}, {gray}, {gray}, {alpha})")
    }
}

/// One emitted glyph.
#[derive(Debug, Clone, PartialEq)]
pub struct TrailGlyph {
    /// Character currently shown.
    pub ch: char,
    /// Anchor x in CSS pixels.
    pub x: f64,
    /// Anchor y in CSS pixels.
    pub y: f64,
    /// Rotation in radians (direction of travel).
    pub angle: f64,
    /// Size at emission.
    pub base_size: f64,
    /// Current scale in `0.0..=1.0`.
    pub scale: f64,
    /// Current color.
    pub color: GlyphColor,
    /// Reference timestamp of the lifecycle.
    pub born_at: Duration,
    seed: usize,
    shuffle_step: usize,
    last_shuffle: Option<Duration>,
}

impl TrailGlyph {
    /// Current font size.
    #[must_use]
    pub fn size(&self) -> f64 {
        self.base_size * self.scale
    }

    /// Whether the glyph is large enough to draw.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.scale > 0.01
    }

    /// Advance the lifecycle to `now`. Returns `true` once expired.
    fn update(&mut self, now: Duration, config: &TrailConfig, shuffle: &[char]) -> bool {
        let age = now.saturating_sub(self.born_at);
        if age <= config.hold {
            self.scale = 1.0;
            let color_delay = config.color_delay.min(config.hold);
            self.color = if age <= color_delay {
                GlyphColor::INITIAL
            } else {
                let span = duration_ms(config.hold - color_delay).max(1.0);
                let progress = duration_ms(age - color_delay) / span;
                GlyphColor::INITIAL.lerp(GlyphColor::TARGET, progress)
            };
            return false;
        }

        let shrink_age = age - config.hold;
        if shrink_age <= config.shrink_hold {
            self.scale = 1.0;
            self.color = GlyphColor::TARGET;
            self.last_shuffle = None;
            return false;
        }

        let due = self
            .last_shuffle
            .is_none_or(|at| now.saturating_sub(at) > config.shuffle_interval);
        if due && !shuffle.is_empty() {
            self.ch = shuffle[(self.seed + self.shuffle_step) % shuffle.len()];
            self.shuffle_step += 1;
            self.last_shuffle = Some(now);
        }

        let progress = if config.shrink_duration.is_zero() {
            1.0
        } else {
            (duration_ms(shrink_age - config.shrink_hold) / duration_ms(config.shrink_duration))
                .min(1.0)
        };
        self.scale = (1.0 - progress).max(0.0);
        self.color = GlyphColor::TARGET.lerp(GlyphColor::END, progress);
        progress >= 1.0
    }
}

/// Glyph size for a pointer step of `distance` CSS pixels.
///
/// Slow steps stay at the minimum; growth is logarithmic up to 600px, with
/// extra damping for medium speeds.
#[must_use]
pub fn glyph_size_for_distance(distance: f64, min_size: f64, max_size: f64) -> f64 {
    if distance < 15.0 {
        return min_size;
    }
    let normalized = (distance / 600.0).min(1.0);
    let log_curve = (normalized * 2.0 + 1.0).log2() / 3f64.log2();
    let mut scale = log_curve.powf(1.1);
    if distance > 30.0 && distance < 200.0 {
        scale *= 0.7;
    }
    (min_size + scale * (max_size - min_size)).clamp(min_size, max_size)
}

// ---------------------------------------------------------------------------
// Canvas surface
// ---------------------------------------------------------------------------

/// Backing-store geometry of the trail canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasInfo {
    /// Effective pixel ratio (device ratio capped by quality).
    pub pixel_ratio: f64,
    /// Backing width in device pixels.
    pub width: u32,
    /// Backing height in device pixels.
    pub height: u32,
    /// Layout width in CSS pixels.
    pub css_width: f64,
    /// Layout height in CSS pixels.
    pub css_height: f64,
}

/// Result of one animation frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrailFrame {
    /// Glyphs were updated and should be redrawn.
    pub rendered: bool,
    /// Glyphs removed on this frame.
    pub expired: usize,
    /// Glyphs alive after the frame.
    pub live: usize,
    /// The loop wants another frame.
    pub wants_frame: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Point {
    x: f64,
    y: f64,
}

// ---------------------------------------------------------------------------
// Animation
// ---------------------------------------------------------------------------

/// Cursor-trail state machine.
#[derive(Debug, Clone)]
pub struct TrailAnimation {
    config: TrailConfig,
    text: Vec<char>,
    shuffle: Vec<char>,
    mode: QualityMode,
    glyphs: Vec<TrailGlyph>,
    pointer: Point,
    pen: Point,
    drawing: bool,
    idle_deadline: Option<Duration>,
    last_emit: Option<Duration>,
    text_index: usize,
    loop_active: bool,
    last_render: Option<Duration>,
    frozen: bool,
    viewport: Option<(f64, f64, f64)>,
    surface: Option<CanvasInfo>,
    surface_dirty: bool,
}

impl TrailAnimation {
    /// Idle animation with no glyphs.
    #[must_use]
    pub fn new(config: TrailConfig) -> Self {
        let mut text: Vec<char> = config.source_text.chars().collect();
        if text.is_empty() {
            text = DEFAULT_SOURCE_TEXT.chars().collect();
        }
        let shuffle = config.shuffle_chars.chars().collect();
        Self {
            config,
            text,
            shuffle,
            mode: QualityMode::High,
            glyphs: Vec::new(),
            pointer: Point::default(),
            pen: Point::default(),
            drawing: false,
            idle_deadline: None,
            last_emit: None,
            text_index: 0,
            loop_active: false,
            last_render: None,
            frozen: false,
            viewport: None,
            surface: None,
            surface_dirty: false,
        }
    }

    // -- pointer input ---------------------------------------------------

    /// Pointer entered the page.
    pub fn pointer_enter(&mut self, x: f64, y: f64, now: Duration) {
        if self.frozen {
            return;
        }
        self.drawing = true;
        self.pen = Point { x, y };
        self.touch(now);
    }

    /// Pointer moved. Returns `true` if a glyph was emitted.
    pub fn pointer_move(&mut self, x: f64, y: f64, now: Duration) -> bool {
        if self.frozen {
            return false;
        }
        self.poll_idle(now);
        self.pointer = Point { x, y };
        if !self.drawing {
            self.pen = self.pointer;
            self.drawing = true;
        }
        let emitted = self.emit(now);
        self.touch(now);
        emitted
    }

    /// Pointer left the page.
    pub fn pointer_leave(&mut self) {
        self.drawing = false;
        self.idle_deadline = None;
    }

    fn touch(&mut self, now: Duration) {
        self.idle_deadline = Some(now + self.config.inactivity_timeout);
    }

    fn poll_idle(&mut self, now: Duration) {
        if self.idle_deadline.is_some_and(|deadline| now >= deadline) {
            self.drawing = false;
            self.idle_deadline = None;
        }
    }

    fn emit(&mut self, now: Duration) -> bool {
        if !self.drawing || self.frozen {
            return false;
        }
        let interval = match self.mode {
            QualityMode::High => self.config.min_emit_interval_high,
            QualityMode::Recovery => self.config.min_emit_interval_recovery,
        };
        if self
            .last_emit
            .is_some_and(|last| now.saturating_sub(last) < interval)
        {
            return false;
        }
        let dx = self.pointer.x - self.pen.x;
        let dy = self.pointer.y - self.pen.y;
        let distance = dx.hypot(dy);
        if distance <= self.config.min_font_size {
            return false;
        }

        let size =
            glyph_size_for_distance(distance, self.config.min_font_size, self.config.max_font_size);
        let angle = dy.atan2(dx);
        let ch = self.text[self.text_index % self.text.len()];
        self.glyphs.push(TrailGlyph {
            ch,
            x: self.pen.x,
            y: self.pen.y,
            angle,
            base_size: size,
            scale: 1.0,
            color: GlyphColor::INITIAL,
            born_at: now,
            seed: self.text_index.wrapping_mul(7),
            shuffle_step: 0,
            last_shuffle: None,
        });
        self.enforce_cap();

        let advance = size * self.config.advance_ratio;
        self.pen.x += angle.cos() * advance;
        self.pen.y += angle.sin() * advance;
        self.text_index += 1;
        self.last_emit = Some(now);
        true
    }

    fn enforce_cap(&mut self) {
        let cap = self.max_glyphs();
        if self.glyphs.len() > cap {
            let excess = self.glyphs.len() - cap;
            self.glyphs.drain(..excess);
        }
    }

    // -- frame loop ------------------------------------------------------

    /// Start the loop if there is work, the page is visible, and the
    /// animation is not frozen. Returns `true` when the caller must request
    /// a frame.
    pub fn request_loop(&mut self, page_visible: bool) -> bool {
        if self.frozen || self.loop_active || self.glyphs.is_empty() || !page_visible {
            return false;
        }
        self.loop_active = true;
        true
    }

    /// Stop the loop. Returns whether it was running.
    pub fn stop_loop(&mut self) -> bool {
        self.last_render = None;
        core::mem::replace(&mut self.loop_active, false)
    }

    /// Run one animation frame.
    pub fn tick(&mut self, now: Duration, page_visible: bool) -> TrailFrame {
        if self.frozen || !self.loop_active {
            self.loop_active = false;
            return TrailFrame {
                live: self.glyphs.len(),
                ..TrailFrame::default()
            };
        }
        self.poll_idle(now);

        let interval = Duration::from_secs_f64(1.0 / self.config.target_fps.max(1.0));
        if self
            .last_render
            .is_some_and(|last| now.saturating_sub(last) < interval)
        {
            return TrailFrame {
                rendered: false,
                expired: 0,
                live: self.glyphs.len(),
                wants_frame: true,
            };
        }
        self.last_render = Some(now);

        let before = self.glyphs.len();
        let config = &self.config;
        let shuffle = &self.shuffle;
        self.glyphs.retain_mut(|g| !g.update(now, config, shuffle));
        let live = self.glyphs.len();

        let wants_frame = live > 0 && page_visible;
        self.loop_active = wants_frame;
        TrailFrame {
            rendered: true,
            expired: before - live,
            live,
            wants_frame,
        }
    }

    // -- surface ---------------------------------------------------------

    /// Size the canvas for a `css_width × css_height` viewport. Returns the
    /// new geometry, or `None` when nothing changed and `force` is unset.
    pub fn resize(
        &mut self,
        css_width: f64,
        css_height: f64,
        device_pixel_ratio: f64,
        force: bool,
    ) -> Option<CanvasInfo> {
        self.viewport = Some((css_width, css_height, device_pixel_ratio));
        let device = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        let pixel_ratio = device.min(self.pixel_ratio_cap());
        let info = CanvasInfo {
            pixel_ratio,
            width: (css_width * pixel_ratio).round().max(0.0) as u32,
            height: (css_height * pixel_ratio).round().max(0.0) as u32,
            css_width,
            css_height,
        };
        if !force && self.surface == Some(info) {
            return None;
        }
        self.surface = Some(info);
        Some(info)
    }

    /// Geometry changed by a quality switch since the last call.
    pub fn take_surface_update(&mut self) -> Option<CanvasInfo> {
        if core::mem::take(&mut self.surface_dirty) {
            self.surface
        } else {
            None
        }
    }

    fn pixel_ratio_cap(&self) -> f64 {
        match self.mode {
            QualityMode::High => self.config.dpr_cap_high,
            QualityMode::Recovery => self.config.dpr_cap_recovery,
        }
    }

    // -- queries ---------------------------------------------------------

    /// Live glyphs, oldest first.
    #[must_use]
    pub fn glyphs(&self) -> &[TrailGlyph] {
        &self.glyphs
    }

    /// Current glyph cap.
    #[must_use]
    pub fn max_glyphs(&self) -> usize {
        match self.mode {
            QualityMode::High => self.config.max_glyphs_high,
            QualityMode::Recovery => self.config.max_glyphs_recovery,
        }
    }

    /// Current canvas geometry.
    #[must_use]
    pub fn surface(&self) -> Option<CanvasInfo> {
        self.surface
    }

    /// Effective pixel ratio (1.0 before the first resize).
    #[must_use]
    pub fn pixel_ratio(&self) -> f64 {
        self.surface.map_or(1.0, |s| s.pixel_ratio)
    }

    /// Whether pointer input is being turned into glyphs.
    #[must_use]
    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    /// Whether a pause gate holds the animation.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Whether a frame loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.loop_active
    }

    /// Quality tier the caps follow.
    #[must_use]
    pub fn mode(&self) -> QualityMode {
        self.mode
    }

    /// Drop every glyph and stop.
    pub fn clear(&mut self) {
        self.glyphs.clear();
        self.stop_loop();
    }
}

impl QualityConsumer for TrailAnimation {
    fn apply_quality(&mut self, change: &QualityChange) {
        self.mode = change.mode;
        let before = self.glyphs.len();
        if change.mode.is_recovery() {
            self.enforce_cap();
        }
        if let Some((w, h, dpr)) = self.viewport {
            self.resize(w, h, dpr, true);
            self.surface_dirty = true;
        }
        debug!(
            mode = change.mode.as_str(),
            dropped = before - self.glyphs.len(),
            "trail quality applied"
        );
    }
}

impl GatedAnimation for TrailAnimation {
    fn freeze(&mut self) {
        self.frozen = true;
        self.drawing = false;
        self.idle_deadline = None;
        self.stop_loop();
    }

    fn shift_timeline(&mut self, by: Duration) {
        for glyph in &mut self.glyphs {
            glyph.born_at += by;
        }
    }

    fn has_pending_work(&self) -> bool {
        !self.glyphs.is_empty()
    }

    fn thaw(&mut self, restart: bool) -> bool {
        self.frozen = false;
        restart && self.request_loop(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn recovery() -> QualityChange {
        QualityChange {
            mode: QualityMode::Recovery,
            multiplier: 0.8,
            at: Duration::ZERO,
            fps: None,
        }
    }

    /// Emit `n` glyphs, 20ms apart.
    fn scribble(trail: &mut TrailAnimation, n: usize, start: Duration) -> Duration {
        let mut now = start;
        trail.pointer_enter(0.0, 0.0, now);
        let mut x = 0.0;
        for _ in 0..n {
            now += ms(20);
            x += 400.0;
            trail.pointer_move(x, 0.0, now);
        }
        now
    }

    #[test]
    fn size_curve_is_monotone_and_bounded() {
        assert_eq!(glyph_size_for_distance(10.0, 5.0, 180.0), 5.0);
        let mut last = 0.0;
        for d in [15.0, 30.0, 200.0, 400.0, 600.0, 5000.0] {
            let size = glyph_size_for_distance(d, 5.0, 180.0);
            assert!((5.0..=180.0).contains(&size));
            assert!(size >= last, "d={d}");
            last = size;
        }
        assert_eq!(glyph_size_for_distance(600.0, 5.0, 180.0), 180.0);
        // Medium speeds are damped.
        let damped = glyph_size_for_distance(100.0, 5.0, 180.0);
        let undamped = glyph_size_for_distance(200.0, 5.0, 180.0);
        assert!(damped < undamped * 0.7);
    }

    #[test]
    fn emission_follows_text_and_throttle() {
        let mut trail = TrailAnimation::new(TrailConfig {
            source_text: "ab".into(),
            ..TrailConfig::default()
        });
        trail.pointer_enter(0.0, 0.0, ms(0));
        assert!(trail.pointer_move(100.0, 0.0, ms(20)));
        assert!(!trail.pointer_move(300.0, 0.0, ms(25)), "within 10ms");
        assert!(trail.pointer_move(300.0, 0.0, ms(40)));
        assert!(trail.pointer_move(600.0, 0.0, ms(60)));
        let chars: String = trail.glyphs().iter().map(|g| g.ch).collect();
        assert_eq!(chars, "aba");
        assert!(trail.glyphs()[1].x > 0.0, "pen advanced along the path");
    }

    #[test]
    fn lifecycle_fades_shrinks_and_expires() {
        let mut trail = TrailAnimation::new(TrailConfig::default());
        trail.pointer_enter(0.0, 0.0, ms(0));
        trail.pointer_move(300.0, 0.0, ms(0));
        assert!(trail.request_loop(true));

        let frame = trail.tick(ms(100), true);
        assert!(frame.rendered);
        assert_eq!(trail.glyphs()[0].color, GlyphColor::INITIAL);

        trail.tick(ms(2000), true);
        assert_eq!(trail.glyphs()[0].color, GlyphColor::TARGET);
        assert_eq!(trail.glyphs()[0].scale, 1.0);

        trail.tick(ms(2400), true);
        let g = &trail.glyphs()[0];
        assert!((g.scale - 0.5).abs() < 1e-9);
        assert_ne!(g.ch, 'T', "shuffled while shrinking");

        let done = trail.tick(ms(2800), true);
        assert_eq!(done.expired, 1);
        assert_eq!(done.live, 0);
        assert!(!done.wants_frame);
        assert!(!trail.is_running());
    }

    #[test]
    fn ticks_are_throttled() {
        let mut trail = TrailAnimation::new(TrailConfig::default());
        scribble(&mut trail, 1, ms(0));
        trail.request_loop(true);
        assert!(trail.tick(ms(100), true).rendered);
        let skipped = trail.tick(ms(110), true);
        assert!(!skipped.rendered);
        assert!(skipped.wants_frame);
        assert!(trail.tick(ms(134), true).rendered);
    }

    #[test]
    fn hidden_page_stops_the_loop() {
        let mut trail = TrailAnimation::new(TrailConfig::default());
        scribble(&mut trail, 1, ms(0));
        assert!(!trail.request_loop(false));
        assert!(trail.request_loop(true));
        assert!(!trail.request_loop(true), "already running");
        let frame = trail.tick(ms(50), false);
        assert!(!frame.wants_frame);
        assert!(!trail.is_running());
    }

    #[test]
    fn recovery_truncates_to_most_recent() {
        let mut trail = TrailAnimation::new(TrailConfig::default());
        scribble(&mut trail, 300, ms(0));
        assert_eq!(trail.glyphs().len(), 270);
        let newest = trail.glyphs().last().map(|g| g.born_at);

        trail.apply_quality(&recovery());
        assert_eq!(trail.glyphs().len(), 190);
        assert_eq!(trail.glyphs().last().map(|g| g.born_at), newest);
        assert_eq!(trail.max_glyphs(), 190);
    }

    #[test]
    fn recovery_caps_pixel_ratio() {
        let mut trail = TrailAnimation::new(TrailConfig::default());
        let info = trail.resize(1000.0, 500.0, 2.0, false).unwrap();
        assert_eq!(info.pixel_ratio, 1.5);
        assert_eq!((info.width, info.height), (1500, 750));
        assert_eq!(trail.resize(1000.0, 500.0, 2.0, false), None);

        trail.apply_quality(&recovery());
        let info = trail.take_surface_update().unwrap();
        assert_eq!(info.pixel_ratio, 1.0);
        assert_eq!(info.width, 1000);
        assert_eq!(trail.take_surface_update(), None);
    }

    #[test]
    fn frozen_trail_ignores_input_and_shifts_births() {
        let mut trail = TrailAnimation::new(TrailConfig::default());
        let now = scribble(&mut trail, 2, ms(0));
        let births: Vec<_> = trail.glyphs().iter().map(|g| g.born_at).collect();

        trail.freeze();
        assert!(!trail.pointer_move(900.0, 900.0, now + ms(50)));
        assert!(!trail.request_loop(true));
        assert!(!trail.tick(now + ms(60), true).rendered);

        trail.shift_timeline(ms(500));
        assert!(trail.thaw(true));
        let shifted: Vec<_> = trail.glyphs().iter().map(|g| g.born_at).collect();
        assert_eq!(shifted, births.iter().map(|b| *b + ms(500)).collect::<Vec<_>>());
        assert!(!trail.is_drawing());
    }

    #[test]
    fn idle_pointer_stops_drawing() {
        let mut trail = TrailAnimation::new(TrailConfig::default());
        trail.pointer_enter(0.0, 0.0, ms(0));
        trail.pointer_move(100.0, 0.0, ms(20));
        // After the idle window the pen restarts at the pointer.
        assert!(!trail.pointer_move(5000.0, 0.0, ms(5000)));
        assert!(trail.is_drawing());
        assert!(trail.pointer_move(5200.0, 0.0, ms(5100)));
        trail.pointer_leave();
        assert!(!trail.is_drawing());
    }

    #[test]
    fn glyph_color_css_is_clamped() {
        assert_eq!(GlyphColor::INITIAL.css(), "rgba(250, 250, 250, 0)");
        assert_eq!(GlyphColor::TARGET.css(), "rgba(120, 120, 120, 1)");
    }
}
