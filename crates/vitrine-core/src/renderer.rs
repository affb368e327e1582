#![forbid(unsafe_code)]

//! Background renderer handle.
//!
//! The shader itself lives outside this crate, behind [`RendererBackend`].
//! [`RendererHandle`] owns the single instance and walks it through
//! `Uninitialized → Loading → Active → Destroyed`:
//!
//! - [`begin`](RendererHandle::begin) requests the module load on first use
//!   and updates the live instance on later calls;
//! - [`module_loaded`](RendererHandle::module_loaded) creates the instance
//!   with the options derived for the current profile and quality;
//! - [`destroy`](RendererHandle::destroy) tears it down for good.
//!
//! # Invariants
//!
//! 1. At most one instance is ever created per handle.
//! 2. `Destroyed` is terminal; later `begin` calls are ignored.
//! 3. A rejected module load returns to `Uninitialized`, so a later `begin`
//!    retries the load.
//! 4. `destroy` calls the instance's `destroy` at most once.

use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::ConfigError;
use crate::error::EffectError;
use crate::quality::{QualityChange, QualityConsumer};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Device class the option profile is tuned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererProfile {
    /// Hover-capable fine pointer: pointer-driven ripples.
    #[default]
    Desktop,
    /// Touch device: automatic ripples, lighter grid.
    Mobile,
}

impl RendererProfile {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
        }
    }

    /// Classify the device from its pointer capabilities.
    ///
    /// Agreeing media queries decide directly; mixed answers fall back to
    /// touch support.
    #[must_use]
    pub fn detect(can_hover: bool, fine_pointer: bool, touch_capable: bool) -> Self {
        match (can_hover, fine_pointer) {
            (true, true) => Self::Desktop,
            (false, false) => Self::Mobile,
            _ if touch_capable => Self::Mobile,
            _ => Self::Desktop,
        }
    }
}

impl fmt::Display for RendererProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of the ripple-grid shader.
///
/// Every field has a default, so partial JSON is accepted and unknown keys
/// are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RendererOptions {
    /// Cycle grid colors. Default: `false`.
    pub enable_rainbow: bool,
    /// Hex grid color. Default: `#ffffff`.
    pub grid_color: String,
    /// Ripple displacement. Default: `0.06`.
    pub ripple_intensity: f64,
    /// Grid cell count scale. Default: `10`.
    pub grid_size: f64,
    /// Line thickness. Default: `15`.
    pub grid_thickness: f64,
    /// Distance fade. Default: `1.5`.
    pub fade_distance: f64,
    /// Default: `2`.
    pub vignette_strength: f64,
    /// Default: `0.1`.
    pub glow_intensity: f64,
    /// Default: `1`.
    pub opacity: f64,
    /// Degrees. Default: `0`.
    pub grid_rotation: f64,
    /// Follow the pointer. Default: `true`.
    pub mouse_interaction: bool,
    /// Default: `1`.
    pub mouse_interaction_radius: f64,
    /// Default: `1`.
    pub auto_ripple_strength: f64,
    /// Default: `1`.
    pub auto_ripple_speed: f64,
    /// Default: `0.3`.
    pub mouse_ripple_strength: f64,
    /// Barrel curvature. Default: `0`.
    pub curvature_amount: f64,
    /// Default: `1`.
    pub time_multiplier: f64,
    /// Device-pixel-ratio cap of the backing buffer. Default: `2`.
    pub max_dpr: f64,
    /// Pointer smoothing. Default: `0.1`.
    pub mouse_lerp: f64,
    /// Pointer influence smoothing. Default: `0.08`.
    pub influence_lerp: f64,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            enable_rainbow: false,
            grid_color: "#ffffff".to_owned(),
            ripple_intensity: 0.06,
            grid_size: 10.0,
            grid_thickness: 15.0,
            fade_distance: 1.5,
            vignette_strength: 2.0,
            glow_intensity: 0.1,
            opacity: 1.0,
            grid_rotation: 0.0,
            mouse_interaction: true,
            mouse_interaction_radius: 1.0,
            auto_ripple_strength: 1.0,
            auto_ripple_speed: 1.0,
            mouse_ripple_strength: 0.3,
            curvature_amount: 0.0,
            time_multiplier: 1.0,
            max_dpr: 2.0,
            mouse_lerp: 0.1,
            influence_lerp: 0.08,
        }
    }
}

impl RendererOptions {
    /// Look shared by both profiles, over the shader defaults.
    #[must_use]
    pub fn shared() -> Self {
        Self {
            grid_color: "#cde4ff".to_owned(),
            ripple_intensity: 0.07,
            grid_size: 8.6,
            grid_thickness: 17.5,
            fade_distance: 2.0,
            vignette_strength: 2.5,
            glow_intensity: 0.5,
            opacity: 0.6,
            curvature_amount: 0.2,
            auto_ripple_speed: 0.5,
            mouse_interaction_radius: 0.24,
            mouse_ripple_strength: 0.95,
            mouse_lerp: 0.12,
            influence_lerp: 0.12,
            ..Self::default()
        }
    }

    /// Shared look refined for `profile`.
    #[must_use]
    pub fn for_profile(profile: RendererProfile) -> Self {
        let shared = Self::shared();
        match profile {
            RendererProfile::Desktop => Self {
                auto_ripple_strength: 0.0,
                mouse_interaction: true,
                ripple_intensity: 0.095,
                grid_size: 15.0,
                grid_thickness: 35.0,
                fade_distance: 1.7,
                vignette_strength: 2.5,
                curvature_amount: 0.3,
                auto_ripple_speed: 0.55,
                glow_intensity: 0.5,
                mouse_ripple_strength: 0.5,
                mouse_interaction_radius: 0.35,
                mouse_lerp: 0.15,
                influence_lerp: 0.18,
                ..shared
            },
            RendererProfile::Mobile => Self {
                auto_ripple_strength: 1.0,
                mouse_interaction: false,
                ripple_intensity: 0.055,
                grid_size: 7.8,
                grid_thickness: 16.0,
                fade_distance: 1.25,
                vignette_strength: 1.6,
                curvature_amount: 0.18,
                auto_ripple_speed: 0.75,
                glow_intensity: 0.26,
                time_multiplier: 0.85,
                opacity: 0.9,
                ..shared
            },
        }
    }

    /// Overlay the keys of `patch` (camelCase) on these options.
    ///
    /// Unknown keys are ignored; a known key with the wrong type is an error.
    pub fn apply_patch(&self, patch: &Map<String, Value>) -> Result<Self, ConfigError> {
        if patch.is_empty() {
            return Ok(self.clone());
        }
        let mut merged = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in patch {
            merged.insert(key.clone(), value.clone());
        }
        Ok(serde_json::from_value(Value::Object(merged))?)
    }

    /// Options with the buffer resolution scaled by a quality multiplier.
    ///
    /// The DPR cap never drops below 1.
    #[must_use]
    pub fn scaled_for_quality(&self, multiplier: f64) -> Self {
        Self {
            max_dpr: (self.max_dpr * multiplier).max(1.0),
            ..self.clone()
        }
    }
}

/// Renderer section of [`VitrineConfig`](crate::config::VitrineConfig).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RendererConfig {
    /// Forced profile. `None` (default) lets the host detect it.
    pub profile: Option<RendererProfile>,
    /// Option keys applied over the profile. Default: empty.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub overrides: Map<String, Value>,
}

/// Readiness detail of the background renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RendererReadyInfo {
    /// Profile the instance was created with.
    pub profile: RendererProfile,
    /// Options the instance was created with.
    pub options: RendererOptions,
}

// ---------------------------------------------------------------------------
// Backend seam
// ---------------------------------------------------------------------------

/// A live shader instance.
pub trait RendererInstance {
    /// Replace the shader parameters in place.
    fn update(&mut self, options: &RendererOptions);
    /// Release GPU resources and detach from the container.
    fn destroy(&mut self);
}

/// Factory for shader instances, available once the module has loaded.
pub trait RendererBackend {
    /// Create an instance inside `container`.
    fn create(
        &mut self,
        container: &str,
        options: &RendererOptions,
    ) -> Result<Box<dyn RendererInstance>, EffectError>;
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Lifecycle state of the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RendererState {
    /// Nothing requested yet, or the last load failed.
    #[default]
    Uninitialized,
    /// Module load in flight.
    Loading,
    /// Instance live.
    Active,
    /// Torn down. Terminal.
    Destroyed,
}

impl RendererState {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Loading => "loading",
            Self::Active => "active",
            Self::Destroyed => "destroyed",
        }
    }
}

/// What a [`begin`](RendererHandle::begin) call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStep {
    /// No container; the renderer cannot start.
    MissingContainer,
    /// The host should load the module and report back.
    LoadRequested,
    /// A load is in flight; the latest options apply when it lands.
    Queued,
    /// The live instance received fresh options.
    Updated,
    /// The handle is destroyed.
    Ignored,
}

/// Owner of the single background renderer instance.
pub struct RendererHandle {
    config: RendererConfig,
    state: RendererState,
    profile: RendererProfile,
    last_profile: Option<RendererProfile>,
    quality: f64,
    container: Option<String>,
    instance: Option<Box<dyn RendererInstance>>,
    created: u32,
}

impl fmt::Debug for RendererHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererHandle")
            .field("state", &self.state)
            .field("profile", &self.profile)
            .field("quality", &self.quality)
            .field("container", &self.container)
            .field("has_instance", &self.instance.is_some())
            .finish()
    }
}

impl RendererHandle {
    /// Handle for `config`. The profile starts at the forced one, if any.
    #[must_use]
    pub fn new(config: RendererConfig) -> Self {
        let profile = config.profile.unwrap_or_default();
        Self {
            config,
            state: RendererState::Uninitialized,
            profile,
            last_profile: None,
            quality: 1.0,
            container: None,
            instance: None,
            created: 0,
        }
    }

    /// Initialize or update.
    ///
    /// `container` is the host's identifier for the element the canvas is
    /// mounted in, or `None` if the page lacks it.
    pub fn begin(&mut self, container: Option<&str>) -> InitStep {
        if self.state == RendererState::Destroyed {
            debug!("renderer init ignored after destroy");
            return InitStep::Ignored;
        }
        let Some(container) = container else {
            return InitStep::MissingContainer;
        };
        self.container = Some(container.to_owned());
        match self.state {
            RendererState::Uninitialized => {
                self.state = RendererState::Loading;
                debug!(container, "renderer module load requested");
                InitStep::LoadRequested
            }
            RendererState::Loading => InitStep::Queued,
            RendererState::Active => {
                self.push_options();
                InitStep::Updated
            }
            RendererState::Destroyed => InitStep::Ignored,
        }
    }

    /// The module resolved: create the instance.
    ///
    /// Returns `Ok(None)` when no load was pending (for example the handle
    /// was destroyed meanwhile). A creation error resets the handle so the
    /// next `begin` retries.
    pub fn module_loaded(
        &mut self,
        backend: &mut dyn RendererBackend,
    ) -> Result<Option<RendererReadyInfo>, EffectError> {
        if self.state != RendererState::Loading {
            debug!(state = self.state.as_str(), "renderer module arrived late");
            return Ok(None);
        }
        let Some(container) = self.container.clone() else {
            self.state = RendererState::Uninitialized;
            return Err(EffectError::MissingResource("renderer container".into()));
        };
        let options = self.options();
        match backend.create(&container, &options) {
            Ok(instance) => {
                self.instance = Some(instance);
                self.created += 1;
                self.state = RendererState::Active;
                self.last_profile = Some(self.profile);
                debug!(profile = self.profile.as_str(), "renderer created");
                Ok(Some(RendererReadyInfo {
                    profile: self.profile,
                    options,
                }))
            }
            Err(err) => {
                self.state = RendererState::Uninitialized;
                Err(err)
            }
        }
    }

    /// The module load was rejected. Resets for a retry.
    pub fn module_failed(&mut self, reason: impl Into<String>) -> EffectError {
        if self.state == RendererState::Loading {
            self.state = RendererState::Uninitialized;
        }
        EffectError::AsyncLoad(reason.into())
    }

    /// Tear down. Returns `false` if already destroyed.
    pub fn destroy(&mut self) -> bool {
        if self.state == RendererState::Destroyed {
            return false;
        }
        if let Some(mut instance) = self.instance.take() {
            instance.destroy();
        }
        self.state = RendererState::Destroyed;
        debug!("renderer destroyed");
        true
    }

    /// Switch profile. A live instance receives the new options.
    ///
    /// Returns `true` if the profile changed. A forced profile in the
    /// config wins over detection.
    pub fn set_profile(&mut self, profile: RendererProfile) -> bool {
        let profile = self.config.profile.unwrap_or(profile);
        if profile == self.profile {
            return false;
        }
        self.profile = profile;
        debug!(profile = profile.as_str(), "renderer profile changed");
        if self.state == RendererState::Active {
            self.push_options();
        }
        true
    }

    /// Effective options: profile, then overrides, then quality scaling.
    #[must_use]
    pub fn options(&self) -> RendererOptions {
        let base = RendererOptions::for_profile(self.profile);
        let patched = base.apply_patch(&self.config.overrides).unwrap_or_else(|err| {
            warn!(error = %err, "renderer overrides ignored");
            base
        });
        patched.scaled_for_quality(self.quality)
    }

    /// Lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> RendererState {
        self.state
    }

    /// Current profile.
    #[inline]
    #[must_use]
    pub fn profile(&self) -> RendererProfile {
        self.profile
    }

    /// Profile the live instance was created with.
    #[inline]
    #[must_use]
    pub fn last_profile(&self) -> Option<RendererProfile> {
        self.last_profile
    }

    /// Whether an instance is live.
    #[inline]
    #[must_use]
    pub fn has_instance(&self) -> bool {
        self.instance.is_some()
    }

    /// Number of instances ever created (0 or 1).
    #[inline]
    #[must_use]
    pub fn created_count(&self) -> u32 {
        self.created
    }

    /// Container of the last successful `begin`.
    #[must_use]
    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    fn push_options(&mut self) {
        let options = self.options();
        if let Some(instance) = self.instance.as_mut() {
            instance.update(&options);
            self.last_profile = Some(self.profile);
        }
    }
}

impl QualityConsumer for RendererHandle {
    fn apply_quality(&mut self, change: &QualityChange) {
        self.quality = change.multiplier;
        if self.state == RendererState::Active {
            self.push_options();
        }
    }
}
