#![forbid(unsafe_code)]

//! Configuration.
//!
//! [`VitrineConfig`] gathers the per-component configs. Every field has a
//! documented default, so hosts may pass partial JSON: missing fields keep
//! their defaults and unrecognized fields are ignored. Durations are written
//! as milliseconds.
//!
//! ```
//! use vitrine_core::config::VitrineConfig;
//!
//! let config = VitrineConfig::from_json_str(r#"{ "quality": { "dropFps": 30 } }"#).unwrap();
//! assert_eq!(config.quality.drop_fps, 30.0);
//! assert_eq!(config.quality.raise_fps, 47.0);
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::media::MediaConfig;
use crate::quality::QualityConfig;
use crate::readiness::ReadinessConfig;
use crate::renderer::RendererConfig;
use crate::trail::TrailConfig;

/// Top-level configuration of an [`EffectCoordinator`](crate::coordinator::EffectCoordinator).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VitrineConfig {
    /// Tracked readiness components.
    pub readiness: ReadinessConfig,
    /// Frame-time thresholds and hysteresis.
    pub quality: QualityConfig,
    /// Cursor-trail timings and caps.
    pub trail: TrailConfig,
    /// Media coordination.
    pub media: MediaConfig,
    /// Background renderer profile and overrides.
    pub renderer: RendererConfig,
}

impl VitrineConfig {
    /// Parse a (possibly partial) JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to a JSON string.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Invalid configuration document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    /// Human-readable reason.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid config: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

/// `serde(with)` adapter storing a `Duration` as fractional milliseconds.
pub(crate) mod millis {
    use core::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    use crate::clock::{duration_from_ms, duration_ms};

    pub(crate) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(duration_ms(*d))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(duration_from_ms(f64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(
            VitrineConfig::from_json_str("{}").unwrap(),
            VitrineConfig::default()
        );
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let config =
            VitrineConfig::from_json_str(r#"{ "shader": 3, "trail": { "sparkle": true } }"#)
                .unwrap();
        assert_eq!(config, VitrineConfig::default());
    }

    #[test]
    fn durations_are_milliseconds() {
        let config =
            VitrineConfig::from_json_str(r#"{ "quality": { "dropDuration": 2000 } }"#).unwrap();
        assert_eq!(config.quality.drop_duration, Duration::from_secs(2));
    }

    #[test]
    fn round_trips_through_json() {
        let config = VitrineConfig::default();
        let text = config.to_json_string().unwrap();
        assert_eq!(VitrineConfig::from_json_str(&text).unwrap(), config);
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = VitrineConfig::from_json_str("{ quality: ").unwrap_err();
        assert!(err.to_string().starts_with("invalid config:"));
    }
}
