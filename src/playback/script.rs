use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{Action, EventStatus, UiVersion};
use crate::error::{ReplayError, ReplayResult};

use super::step::PlaybackStep;

/// One authored step of a scripted persona flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedStep {
    pub screen_id: String,
    pub action: Action,
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// First-person narration shown alongside the step.
    pub reasoning: String,
    #[serde(default = "default_status")]
    pub status: EventStatus,
    #[serde(default)]
    pub wait_before_ms: u64,
    #[serde(default = "default_wait_after_ms")]
    pub wait_after_ms: u64,
}

impl ScriptedStep {
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.wait_before_ms.saturating_add(self.wait_after_ms)
    }

    fn to_playback_step(&self, index: u32) -> PlaybackStep {
        PlaybackStep {
            index,
            screen_id: Some(self.screen_id.clone()),
            action: self.action,
            selector: self.selector.clone(),
            value: self.value.clone(),
            reasoning: self.reasoning.clone(),
            status: self.status,
            duration_ms: Some(self.duration_ms()),
        }
    }
}

/// A complete scripted run for one persona on one UI version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedFlow {
    pub persona_id: String,
    pub persona_name: String,
    pub ui_version: UiVersion,
    pub scenario_id: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<ScriptedStep>,
}

impl ScriptedFlow {
    /// Parses a flow document without validating it.
    pub fn from_json_str(input: &str) -> ReplayResult<Self> {
        serde_json::from_str(input)
            .map_err(|e| ReplayError::InvalidFlow(format!("failed to parse scripted flow: {e}")))
    }

    pub fn validate(&self) -> ReplayResult<()> {
        if self.persona_id.trim().is_empty() {
            return Err(ReplayError::InvalidFlow(
                "persona_id must be non-empty".to_owned(),
            ));
        }
        if self.steps.is_empty() {
            return Err(ReplayError::InvalidFlow(
                "steps must contain at least one step".to_owned(),
            ));
        }
        for (index, step) in self.steps.iter().enumerate() {
            if step.reasoning.trim().is_empty() {
                return Err(ReplayError::InvalidFlow(format!(
                    "step {index}: reasoning must be non-empty"
                )));
            }
            if step.selector.trim().is_empty() {
                return Err(ReplayError::InvalidFlow(format!(
                    "step {index}: selector must be non-empty"
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn playback_steps(&self) -> Vec<PlaybackStep> {
        self.steps
            .iter()
            .enumerate()
            .map(|(index, step)| step.to_playback_step(index as u32))
            .collect()
    }
}

/// Which flow to play and how fast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackRequest {
    pub persona_id: String,
    pub ui_version: UiVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

impl PlaybackRequest {
    #[must_use]
    pub fn new(persona_id: impl Into<String>, ui_version: UiVersion) -> Self {
        Self {
            persona_id: persona_id.into(),
            ui_version,
            speed: None,
        }
    }

    #[must_use]
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }
}

/// Scripted flows keyed by UI version and persona.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowCatalog {
    flows: BTreeMap<(UiVersion, String), ScriptedFlow>,
}

impl FlowCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a flow as-is; validation happens when it is played.
    pub fn insert(&mut self, flow: ScriptedFlow) -> Option<ScriptedFlow> {
        let key = (flow.ui_version, flow.persona_id.clone());
        self.flows.insert(key, flow)
    }

    /// Parses, validates and registers a flow document. Returns its step
    /// count.
    pub fn load_json(&mut self, input: &str) -> ReplayResult<usize> {
        let flow = ScriptedFlow::from_json_str(input)?;
        flow.validate()?;
        debug!(
            persona_id = %flow.persona_id,
            ui_version = flow.ui_version.as_str(),
            steps = flow.steps.len(),
            "loaded scripted flow"
        );
        let steps = flow.steps.len();
        self.insert(flow);
        Ok(steps)
    }

    #[must_use]
    pub fn get(&self, persona_id: &str, ui_version: UiVersion) -> Option<&ScriptedFlow> {
        self.flows.get(&(ui_version, persona_id.to_owned()))
    }

    /// Personas with a flow for `ui_version`, in sorted order.
    #[must_use]
    pub fn personas(&self, ui_version: UiVersion) -> Vec<&str> {
        self.flows
            .keys()
            .filter(|(version, _)| *version == ui_version)
            .map(|(_, persona)| persona.as_str())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

fn default_status() -> EventStatus {
    EventStatus::Success
}

fn default_wait_after_ms() -> u64 {
    1000
}
