#![forbid(unsafe_code)]

//! Software-rendering detection.
//!
//! The host creates throwaway WebGL contexts and reports their identification
//! strings as a [`GpuProbe`]; [`GpuProbe::assess`] decides whether hardware
//! acceleration is likely off. Matching is a case-insensitive substring scan
//! over known software rasterizer names.

/// Lowercase fragments identifying software rasterizers.
pub const SOFTWARE_RENDERER_MARKERS: [&str; 9] = [
    "swiftshader",
    "software",
    "llvmpipe",
    "softpipe",
    "mesa",
    "basic render driver",
    "warp",
    "reference",
    "angle (software",
];

/// The first marker found in `text`, if any.
#[must_use]
pub fn software_marker(text: &str) -> Option<&'static str> {
    let lower = text.to_ascii_lowercase();
    SOFTWARE_RENDERER_MARKERS
        .iter()
        .copied()
        .find(|marker| lower.contains(marker))
}

/// Whether `text` names a software rasterizer.
#[must_use]
pub fn is_likely_software_renderer(text: &str) -> bool {
    software_marker(text).is_some()
}

/// Identification strings of one WebGL context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlInfo {
    /// `RENDERER` parameter.
    pub renderer: String,
    /// `VENDOR` parameter.
    pub vendor: String,
    /// Unmasked renderer, when the debug extension is exposed.
    pub unmasked_renderer: Option<String>,
    /// Unmasked vendor, when the debug extension is exposed.
    pub unmasked_vendor: Option<String>,
}

impl GlInfo {
    /// The software marker this context matches. Unmasked strings are checked
    /// first.
    #[must_use]
    pub fn software_marker(&self) -> Option<&'static str> {
        let unmasked = [&self.unmasked_renderer, &self.unmasked_vendor];
        unmasked
            .into_iter()
            .flatten()
            .chain([&self.renderer, &self.vendor])
            .find_map(|s| software_marker(s))
    }
}

/// Contexts obtained by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GpuProbe {
    /// Context created with `failIfMajorPerformanceCaveat`.
    pub strict: Option<GlInfo>,
    /// Context created without it, tried when the strict one failed.
    pub relaxed: Option<GlInfo>,
}

/// Outcome of a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuAssessment {
    /// A hardware renderer answered.
    Accelerated,
    /// The renderer strings name a software rasterizer.
    SoftwareRenderer {
        /// Matched marker.
        marker: &'static str,
    },
    /// No WebGL context at all.
    NoContext,
}

impl GpuAssessment {
    /// Whether hardware acceleration is likely off.
    #[must_use]
    pub fn is_disabled(self) -> bool {
        !matches!(self, Self::Accelerated)
    }
}

impl GpuProbe {
    /// Classify the probe. The strict context is authoritative when present.
    #[must_use]
    pub fn assess(&self) -> GpuAssessment {
        let Some(info) = self.strict.as_ref().or(self.relaxed.as_ref()) else {
            return GpuAssessment::NoContext;
        };
        match info.software_marker() {
            Some(marker) => GpuAssessment::SoftwareRenderer { marker },
            None => GpuAssessment::Accelerated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(renderer: &str, vendor: &str) -> GlInfo {
        GlInfo {
            renderer: renderer.into(),
            vendor: vendor.into(),
            ..GlInfo::default()
        }
    }

    #[test]
    fn markers_match_case_insensitively() {
        assert!(is_likely_software_renderer("Google SwiftShader"));
        assert!(is_likely_software_renderer("ANGLE (Software Adapter)"));
        assert!(is_likely_software_renderer("Microsoft Basic Render Driver"));
        assert!(!is_likely_software_renderer("ANGLE (Apple, Apple M2, OpenGL 4.1)"));
        assert_eq!(software_marker("llvmpipe (LLVM 15.0.7)"), Some("llvmpipe"));
    }

    #[test]
    fn unmasked_strings_take_priority() {
        let gl = GlInfo {
            unmasked_renderer: Some("SwiftShader".into()),
            ..info("WebKit WebGL", "WebKit")
        };
        assert_eq!(gl.software_marker(), Some("swiftshader"));
        assert_eq!(info("WebKit WebGL", "WebKit").software_marker(), None);
    }

    #[test]
    fn strict_context_decides_before_relaxed() {
        let probe = GpuProbe {
            strict: Some(info("NVIDIA GeForce", "NVIDIA")),
            relaxed: Some(info("llvmpipe", "Mesa")),
        };
        assert_eq!(probe.assess(), GpuAssessment::Accelerated);

        let relaxed_only = GpuProbe {
            strict: None,
            relaxed: Some(info("llvmpipe", "VMware")),
        };
        assert_eq!(
            relaxed_only.assess(),
            GpuAssessment::SoftwareRenderer { marker: "llvmpipe" }
        );
    }

    #[test]
    fn missing_context_means_disabled() {
        let assessment = GpuProbe::default().assess();
        assert_eq!(assessment, GpuAssessment::NoContext);
        assert!(assessment.is_disabled());
        assert!(!GpuAssessment::Accelerated.is_disabled());
    }
}
