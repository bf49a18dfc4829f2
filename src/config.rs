use serde::{Deserialize, Serialize};

use crate::core::DEFAULT_ACTIVE_TOLERANCE_SECONDS;
use crate::error::{ReplayError, ReplayResult};
use crate::extensions::DEFAULT_GROUP_THRESHOLD_PERCENT;

pub const DEFAULT_MATCH_EPSILON_SECONDS: f64 = 0.5;
pub const DEFAULT_LAST_FRAME_MARGIN_SECONDS: f64 = 0.05;
pub const DEFAULT_STEP_DURATION_MS: u64 = 1000;

/// Replay session setup.
///
/// Serializable so hosts can persist and reload tuning without inventing their
/// own format. Every field has a default, so partial documents are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplayConfig {
    #[serde(default = "default_active_tolerance_seconds")]
    pub active_tolerance_seconds: f64,
    #[serde(default = "default_match_epsilon_seconds")]
    pub match_epsilon_seconds: f64,
    #[serde(default = "default_group_threshold_percent")]
    pub group_threshold_percent: f64,
    #[serde(default = "default_last_frame_margin_seconds")]
    pub last_frame_margin_seconds: f64,
    #[serde(default)]
    pub severity: SeverityConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            active_tolerance_seconds: default_active_tolerance_seconds(),
            match_epsilon_seconds: default_match_epsilon_seconds(),
            group_threshold_percent: default_group_threshold_percent(),
            last_frame_margin_seconds: default_last_frame_margin_seconds(),
            severity: SeverityConfig::default(),
            playback: PlaybackConfig::default(),
        }
    }
}

impl ReplayConfig {
    #[must_use]
    pub fn with_active_tolerance(mut self, seconds: f64) -> Self {
        self.active_tolerance_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_match_epsilon(mut self, seconds: f64) -> Self {
        self.match_epsilon_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_group_threshold(mut self, percent: f64) -> Self {
        self.group_threshold_percent = percent;
        self
    }

    #[must_use]
    pub fn with_last_frame_margin(mut self, seconds: f64) -> Self {
        self.last_frame_margin_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: SeverityConfig) -> Self {
        self.severity = severity;
        self
    }

    #[must_use]
    pub fn with_playback(mut self, playback: PlaybackConfig) -> Self {
        self.playback = playback;
        self
    }

    pub fn validate(self) -> ReplayResult<Self> {
        for (value, name) in [
            (self.active_tolerance_seconds, "active_tolerance_seconds"),
            (self.match_epsilon_seconds, "match_epsilon_seconds"),
            (self.last_frame_margin_seconds, "last_frame_margin_seconds"),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ReplayError::InvalidConfig(format!(
                    "`{name}` must be finite and >= 0"
                )));
            }
        }
        if !self.group_threshold_percent.is_finite() || self.group_threshold_percent <= 0.0 {
            return Err(ReplayError::InvalidConfig(
                "`group_threshold_percent` must be finite and > 0".to_owned(),
            ));
        }
        self.severity.validate()?;
        self.playback.validate()?;
        Ok(self)
    }

    pub fn from_json_str(input: &str) -> ReplayResult<Self> {
        let config: Self = serde_json::from_str(input)
            .map_err(|e| ReplayError::InvalidConfig(format!("failed to parse config json: {e}")))?;
        config.validate()
    }

    pub fn to_json_pretty(&self) -> ReplayResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ReplayError::InvalidConfig(format!("failed to serialize config: {e}")))
    }
}

/// Weights of the insight severity function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityConfig {
    /// Score given to an insight on its first occurrence.
    #[serde(default = "default_initial_score")]
    pub initial_score: u8,
    #[serde(default = "default_persona_cap")]
    pub persona_cap: usize,
    #[serde(default = "default_evidence_cap")]
    pub evidence_cap: usize,
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            initial_score: default_initial_score(),
            persona_cap: default_persona_cap(),
            evidence_cap: default_evidence_cap(),
        }
    }
}

impl SeverityConfig {
    pub fn validate(self) -> ReplayResult<Self> {
        if !(1..=10).contains(&self.initial_score) {
            return Err(ReplayError::InvalidConfig(
                "severity `initial_score` must be within 1..=10".to_owned(),
            ));
        }
        if self.persona_cap == 0 || self.evidence_cap == 0 {
            return Err(ReplayError::InvalidConfig(
                "severity caps must be > 0".to_owned(),
            ));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Delay applied after a step that carries no duration of its own.
    #[serde(default = "default_step_duration_ms")]
    pub default_step_duration_ms: u64,
    #[serde(default = "default_speed")]
    pub default_speed: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_step_duration_ms: default_step_duration_ms(),
            default_speed: default_speed(),
        }
    }
}

impl PlaybackConfig {
    #[must_use]
    pub fn with_default_step_duration_ms(mut self, duration_ms: u64) -> Self {
        self.default_step_duration_ms = duration_ms;
        self
    }

    #[must_use]
    pub fn with_default_speed(mut self, speed: f64) -> Self {
        self.default_speed = speed;
        self
    }

    pub fn validate(self) -> ReplayResult<Self> {
        if !self.default_speed.is_finite() || self.default_speed <= 0.0 {
            return Err(ReplayError::InvalidConfig(
                "playback `default_speed` must be finite and > 0".to_owned(),
            ));
        }
        Ok(self)
    }
}

fn default_active_tolerance_seconds() -> f64 {
    DEFAULT_ACTIVE_TOLERANCE_SECONDS
}

fn default_match_epsilon_seconds() -> f64 {
    DEFAULT_MATCH_EPSILON_SECONDS
}

fn default_group_threshold_percent() -> f64 {
    DEFAULT_GROUP_THRESHOLD_PERCENT
}

fn default_last_frame_margin_seconds() -> f64 {
    DEFAULT_LAST_FRAME_MARGIN_SECONDS
}

fn default_initial_score() -> u8 {
    3
}

fn default_persona_cap() -> usize {
    3
}

fn default_evidence_cap() -> usize {
    5
}

fn default_step_duration_ms() -> u64 {
    DEFAULT_STEP_DURATION_MS
}

fn default_speed() -> f64 {
    1.0
}
