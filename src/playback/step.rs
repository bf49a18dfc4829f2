use serde::{Deserialize, Serialize};

use crate::core::{Action, EventStatus};

/// One step delivered by the playback engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStep {
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_id: Option<String>,
    pub action: Action,
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default)]
    pub reasoning: String,
    pub status: EventStatus,
    /// Delay before the following step; the engine default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl PlaybackStep {
    #[must_use]
    pub fn new(index: u32, action: Action, selector: impl Into<String>) -> Self {
        Self {
            index,
            screen_id: None,
            action,
            selector: selector.into(),
            value: None,
            reasoning: String::new(),
            status: EventStatus::Success,
            duration_ms: None,
        }
    }

    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    #[must_use]
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }
}

/// Push notifications emitted by the playback engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlaybackNotification {
    Step { index: usize, step: PlaybackStep },
    Complete { delivered: usize },
    Error { message: String },
}
