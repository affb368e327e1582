#![forbid(unsafe_code)]

//! Error taxonomy.
//!
//! None of these errors escape the lifecycle methods of the coordinator.
//! Initialization failures are folded into the readiness channel as a
//! failure detail, playback rejections are reconciled to "paused", and only
//! lookups of unknown components fail fast to the caller.

use core::fmt;

use crate::media::MediaId;

/// Failure of a tracked visual effect or of a lookup against one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectError {
    /// A resource required at init time (container, canvas, 2D context) is absent.
    MissingResource(String),
    /// An asynchronous module or resource load was rejected.
    AsyncLoad(String),
    /// `when_component_ready` was asked about a name that is not tracked.
    UnknownComponent(String),
}

impl fmt::Display for EffectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingResource(what) => write!(f, "missing resource: {what}"),
            Self::AsyncLoad(msg) => write!(f, "load failed: {msg}"),
            Self::UnknownComponent(name) => write!(f, "unknown effects component: {name}"),
        }
    }
}

impl std::error::Error for EffectError {}

/// Failure of a playback request routed through the media coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// The environment refused to start playback (autoplay policy, decode error).
    Rejected(String),
    /// The element is not registered with the coordinator.
    UnknownElement(MediaId),
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(reason) => write!(f, "playback rejected: {reason}"),
            Self::UnknownElement(id) => write!(f, "media element {id} is not managed"),
        }
    }
}

impl std::error::Error for PlaybackError {}
