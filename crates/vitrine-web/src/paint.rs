#![forbid(unsafe_code)]

//! Draw list of the cursor trail.
//!
//! The trail model lives in core; this module turns its glyphs into the
//! exact 2D-context calls the canvas needs (font, fill, translate/rotate),
//! so the wasm layer only replays them.

use serde::Serialize;

use vitrine_core::trail::{CanvasInfo, TrailGlyph};

/// Font family of trail glyphs.
pub const GLYPH_FONT_FAMILY: &str = "Georgia";

/// One `fillText` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlyphDraw {
    pub ch: char,
    pub x: f64,
    pub y: f64,
    pub angle: f64,
    /// CSS font shorthand, e.g. `42px Georgia`.
    pub font: String,
    /// CSS `rgba()` fill.
    pub fill: String,
}

/// Draw calls for every visible glyph, oldest first.
#[must_use]
pub fn glyph_draws(glyphs: &[TrailGlyph]) -> Vec<GlyphDraw> {
    glyphs
        .iter()
        .filter(|glyph| glyph.is_visible())
        .map(|glyph| GlyphDraw {
            ch: glyph.ch,
            x: glyph.x,
            y: glyph.y,
            angle: glyph.angle,
            font: format!("{}px {GLYPH_FONT_FAMILY}", glyph.size()),
            fill: glyph.color.css(),
        })
        .collect()
}

/// Area to clear, in the CSS pixels of the scaled context.
#[must_use]
pub fn clear_extent(info: &CanvasInfo) -> (f64, f64) {
    if info.pixel_ratio > 0.0 {
        (
            f64::from(info.width) / info.pixel_ratio,
            f64::from(info.height) / info.pixel_ratio,
        )
    } else {
        (info.css_width, info.css_height)
    }
}
