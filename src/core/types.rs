use serde::{Deserialize, Serialize};

use crate::core::metadata::UpdateMetadata;

/// Interaction performed by a persona on the target UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[serde(alias = "CLICK")]
    Click,
    #[serde(alias = "HOVER")]
    Hover,
    #[serde(alias = "TYPE")]
    Type,
    #[serde(alias = "WAIT")]
    Wait,
    #[serde(alias = "NAVIGATE")]
    Navigate,
    #[serde(alias = "SELECT")]
    Select,
    #[serde(alias = "SCROLL")]
    Scroll,
}

impl Action {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Click => "click",
            Action::Hover => "hover",
            Action::Type => "type",
            Action::Wait => "wait",
            Action::Navigate => "navigate",
            Action::Select => "select",
            Action::Scroll => "scroll",
        }
    }
}

/// Outcome the persona reported for a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Success,
    Confused,
    Blocked,
    Delighted,
}

impl EventStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Success => "success",
            EventStatus::Confused => "confused",
            EventStatus::Blocked => "blocked",
            EventStatus::Delighted => "delighted",
        }
    }
}

/// One discrete interaction logged during a run.
///
/// `timestamp` is absolute Unix seconds (UTC). `elapsed`, when present, is
/// seconds since run start measured by the runner's own clock and wins over
/// anything derived from `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(alias = "run_id")]
    pub run_id: String,
    #[serde(alias = "persona_id")]
    pub persona_id: String,
    #[serde(alias = "step_index")]
    pub step_index: u32,
    #[serde(default, alias = "screen_id", skip_serializing_if = "Option::is_none")]
    pub screen_id: Option<String>,
    #[serde(alias = "target_selector")]
    pub target_selector: String,
    #[serde(
        default,
        alias = "target_element_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_element_id: Option<String>,
    pub action: Action,
    #[serde(alias = "reasoning_text")]
    pub reasoning_text: String,
    pub status: EventStatus,
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<f64>,
    #[serde(default, alias = "duration_ms", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl Event {
    #[must_use]
    pub fn new(
        run_id: impl Into<String>,
        persona_id: impl Into<String>,
        step_index: u32,
        target_selector: impl Into<String>,
        action: Action,
        status: EventStatus,
        timestamp: f64,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            persona_id: persona_id.into(),
            step_index,
            screen_id: None,
            target_selector: target_selector.into(),
            target_element_id: None,
            action,
            reasoning_text: String::new(),
            status,
            timestamp,
            elapsed: None,
            duration_ms: None,
        }
    }

    #[must_use]
    pub fn with_element(mut self, element_id: impl Into<String>) -> Self {
        self.target_element_id = Some(element_id.into());
        self
    }

    #[must_use]
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning_text = reasoning.into();
        self
    }

    #[must_use]
    pub fn with_elapsed(mut self, elapsed: f64) -> Self {
        self.elapsed = Some(elapsed);
        self
    }

    #[must_use]
    pub fn with_screen(mut self, screen_id: impl Into<String>) -> Self {
        self.screen_id = Some(screen_id.into());
        self
    }

    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Element identity used for grouping; falls back to the selector when the
    /// runner could not resolve an element id.
    #[must_use]
    pub fn element_key(&self) -> &str {
        self.target_element_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(&self.target_selector)
    }
}

/// Append-only knowledge-store record describing one edit of the accumulated
/// findings text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightUpdate {
    pub id: String,
    #[serde(alias = "created_at")]
    pub created_at: String,
    #[serde(default, alias = "old_text")]
    pub old_text: String,
    #[serde(default, alias = "new_text")]
    pub new_text: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub metadata: UpdateMetadata,
}

impl InsightUpdate {
    #[must_use]
    pub fn new(id: impl Into<String>, created_at: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: created_at.into(),
            old_text: String::new(),
            new_text: String::new(),
            reasoning: String::new(),
            metadata: UpdateMetadata::default(),
        }
    }

    #[must_use]
    pub fn with_text(mut self, new_text: impl Into<String>) -> Self {
        self.new_text = new_text.into();
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key, value);
        self
    }

    /// Offset into the run carried in `metadata.elapsed`, if parseable.
    #[must_use]
    pub fn metadata_elapsed(&self) -> Option<f64> {
        self.metadata.try_get_number("elapsed")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    #[serde(rename = "scripted")]
    Scripted,
    #[serde(rename = "llm-driven")]
    LlmDriven,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiVersion {
    V1,
    V2,
}

impl UiVersion {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UiVersion::V1 => "v1",
            UiVersion::V2 => "v2",
        }
    }
}

/// Row shown in a run list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    #[serde(alias = "run_id")]
    pub run_id: String,
    #[serde(alias = "persona_id")]
    pub persona_id: String,
    pub mode: RunMode,
    pub status: RunStatus,
    #[serde(alias = "started_at")]
    pub started_at: String,
    #[serde(default, alias = "duration_ms", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    #[serde(alias = "run_id")]
    pub run_id: String,
    #[serde(alias = "persona_id")]
    pub persona_id: String,
    #[serde(alias = "scenario_id")]
    pub scenario_id: String,
    #[serde(alias = "ui_version")]
    pub ui_version: UiVersion,
    pub mode: RunMode,
    pub status: RunStatus,
    /// ISO-like start instant; may omit the zone, in which case it is UTC.
    #[serde(alias = "started_at")]
    pub started_at: String,
    #[serde(default, alias = "completed_at", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, alias = "duration_ms", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunMetadata {
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id.clone(),
            persona_id: self.persona_id.clone(),
            mode: self.mode,
            status: self.status,
            started_at: self.started_at.clone(),
            duration_ms: self.duration_ms,
        }
    }

    #[must_use]
    pub fn duration_seconds(&self) -> Option<f64> {
        self.duration_ms.map(|ms| ms as f64 / 1000.0)
    }
}
