#![forbid(unsafe_code)]

//! Core: effect readiness, adaptive quality, media exclusivity, and the
//! pause gate of the cursor-trail animation.
//!
//! Everything here is host-agnostic and single-threaded. Time comes from an
//! injected [`clock::MonoClock`] and frames from the host calling
//! [`coordinator::EffectCoordinator::frame`], so the whole layer runs the
//! same under a browser event loop and under a test.

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod deferred;
pub mod error;
pub mod event;
pub mod frame;
pub mod glass;
pub mod gpu;
pub mod media;
pub mod pause_gate;
pub mod quality;
pub mod readiness;
pub mod renderer;
pub mod trail;

pub use clock::{ManualClock, MonoClock, SharedClock, SystemClock};
pub use config::{ConfigError, VitrineConfig};
pub use coordinator::{
    Advisory, CoordinatorEvent, CoordinatorState, EffectCoordinator, FrameReport, InitReport,
    PageEnvironment,
};
pub use deferred::{Deferred, Settle, Wait};
pub use error::{EffectError, PlaybackError};
pub use media::{MediaElement, MediaId, MediaKind, MediaPlaybackCoordinator};
pub use pause_gate::{GateTransition, GatedAnimation, SequencePauseGate};
pub use quality::{QualityChange, QualityConsumer, QualityController, QualityMode};
pub use readiness::{EffectDetail, ReadinessTracker, ReadyReport};
pub use renderer::{RendererBackend, RendererHandle, RendererInstance, RendererOptions};
