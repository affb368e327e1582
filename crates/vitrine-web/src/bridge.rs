#![forbid(unsafe_code)]

//! Host-agnostic translation between coordinator types and the JSON shapes
//! handed to JavaScript. Compiled on every target so it can be tested
//! natively.

use serde::Deserialize;
use serde_json::{Value, json};

use vitrine_core::coordinator::{CoordinatorEvent, InitReport};
use vitrine_core::glass::GlassPreset;
use vitrine_core::gpu::{GlInfo, GpuAssessment, GpuProbe};
use vitrine_core::media::PlayOutcome;
use vitrine_core::pause_gate::GateTransition;
use vitrine_core::renderer::InitStep;

/// WebGL identification strings as collected by page script.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GlInfoDto {
    pub renderer: String,
    pub vendor: String,
    pub unmasked_renderer: Option<String>,
    pub unmasked_vendor: Option<String>,
}

impl From<GlInfoDto> for GlInfo {
    fn from(dto: GlInfoDto) -> Self {
        Self {
            renderer: dto.renderer,
            vendor: dto.vendor,
            unmasked_renderer: dto.unmasked_renderer,
            unmasked_vendor: dto.unmasked_vendor,
        }
    }
}

/// Build a probe from the JSON of the strict and relaxed contexts.
pub fn parse_probe(strict: Option<&str>, relaxed: Option<&str>) -> Result<GpuProbe, serde_json::Error> {
    let parse = |text: Option<&str>| -> Result<Option<GlInfo>, serde_json::Error> {
        text.map(|t| serde_json::from_str::<GlInfoDto>(t).map(GlInfo::from))
            .transpose()
    };
    Ok(GpuProbe {
        strict: parse(strict)?,
        relaxed: parse(relaxed)?,
    })
}

/// JS name of an assessment.
#[must_use]
pub fn assessment_str(assessment: GpuAssessment) -> &'static str {
    match assessment {
        GpuAssessment::Accelerated => "accelerated",
        GpuAssessment::SoftwareRenderer { .. } => "software",
        GpuAssessment::NoContext => "noContext",
    }
}

/// Preset by its camelCase name.
#[must_use]
pub fn preset_from_name(name: &str) -> Option<GlassPreset> {
    serde_json::from_value(Value::String(name.to_owned())).ok()
}

#[must_use]
pub fn init_step_str(step: InitStep) -> &'static str {
    match step {
        InitStep::MissingContainer => "missingContainer",
        InitStep::LoadRequested => "loadRequested",
        InitStep::Queued => "queued",
        InitStep::Updated => "updated",
        InitStep::Ignored => "ignored",
    }
}

#[must_use]
pub fn play_outcome_str(outcome: PlayOutcome) -> &'static str {
    match outcome {
        PlayOutcome::Started => "started",
        PlayOutcome::AlreadyPlaying => "alreadyPlaying",
        PlayOutcome::Rejected => "rejected",
        PlayOutcome::Paused => "paused",
    }
}

#[must_use]
pub fn transition_str(transition: GateTransition) -> &'static str {
    match transition {
        GateTransition::Paused => "paused",
        GateTransition::Nested => "nested",
        GateTransition::StillHeld => "stillHeld",
        GateTransition::Resumed { .. } => "resumed",
        GateTransition::Unbalanced => "unbalanced",
    }
}

/// JSON form of an init report.
#[must_use]
pub fn init_report_json(report: &InitReport) -> Value {
    json!({
        "canvas": report.canvas,
        "renderer": init_step_str(report.renderer),
        "profile": report.profile.as_str(),
    })
}

/// JSON form of a coordinator event (`{type, ...}`).
#[must_use]
pub fn event_json(event: &CoordinatorEvent) -> Value {
    match event {
        CoordinatorEvent::QualityChanged(change) => json!({
            "type": "quality",
            "mode": change.mode.as_str(),
            "multiplier": change.multiplier,
            "fps": change.fps,
        }),
        CoordinatorEvent::CanvasResized(info) => json!({
            "type": "canvasResized",
            "canvas": info,
        }),
        CoordinatorEvent::RendererLoadRequested => json!({ "type": "rendererLoadRequested" }),
        CoordinatorEvent::Advisory(advisory) => json!({
            "type": "advisory",
            "name": advisory.as_str(),
            "message": advisory.message(),
        }),
        CoordinatorEvent::Sequence(transition) => json!({
            "type": "sequence",
            "transition": transition_str(*transition),
        }),
        CoordinatorEvent::TornDown => json!({ "type": "tornDown" }),
    }
}
