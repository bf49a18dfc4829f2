use serde::{Deserialize, Serialize};

/// Lifecycle of a playback run.
///
/// `Idle -> Running -> {Paused <-> Running} -> Completed | Failed`. `stop`
/// returns to `Idle` from anywhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
    Failed,
}

impl PlaybackStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, PlaybackStatus::Completed | PlaybackStatus::Failed)
    }
}
