#![forbid(unsafe_code)]

//! WASM frontend for Vitrine.
//!
//! Exposes [`vitrine_core::EffectCoordinator`] to page script as the
//! `VitrineEffects` class: readiness promises, the per-frame entry point,
//! media registration, reveal sequences, glass surfaces, and teardown. The
//! trail canvas is painted from `frame`, and videos are observed for
//! visibility. The page keeps ownership of `requestAnimationFrame` and of
//! module loading.

pub mod bridge;
pub mod console;
pub mod deliver;
pub mod paint;
pub mod viewport;

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::VitrineEffects;

/// Placeholder on non-wasm targets, where only [`bridge`] is functional.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Default)]
pub struct VitrineEffects;

#[cfg(not(target_arch = "wasm32"))]
impl VitrineEffects {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }
}
