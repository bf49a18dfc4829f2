use std::fmt;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightType {
    Confusion,
    Friction,
    Delight,
    Opportunity,
}

impl InsightType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            InsightType::Confusion => "confusion",
            InsightType::Friction => "friction",
            InsightType::Delight => "delight",
            InsightType::Opportunity => "opportunity",
        }
    }

    /// Base weight of the severity function. Blocking issues outrank
    /// confusion, which outranks positive signals.
    #[must_use]
    pub fn base_severity(self) -> u32 {
        match self {
            InsightType::Friction => 7,
            InsightType::Confusion => 5,
            InsightType::Opportunity => 3,
            InsightType::Delight => 2,
        }
    }
}

impl fmt::Display for InsightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed tag taxonomy attached to insights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsightTag {
    CopyClarity,
    Navigation,
    VisualHierarchy,
    InteractionDesign,
    InformationOverload,
    MissingGuidance,
    PositiveExperience,
}

impl InsightTag {
    pub const ALL: [InsightTag; 7] = [
        InsightTag::CopyClarity,
        InsightTag::Navigation,
        InsightTag::VisualHierarchy,
        InsightTag::InteractionDesign,
        InsightTag::InformationOverload,
        InsightTag::MissingGuidance,
        InsightTag::PositiveExperience,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            InsightTag::CopyClarity => "copy-clarity",
            InsightTag::Navigation => "navigation",
            InsightTag::VisualHierarchy => "visual-hierarchy",
            InsightTag::InteractionDesign => "interaction-design",
            InsightTag::InformationOverload => "information-overload",
            InsightTag::MissingGuidance => "missing-guidance",
            InsightTag::PositiveExperience => "positive-experience",
        }
    }
}

/// Grouping key of an insight: `<element>::<type>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InsightKey(String);

impl InsightKey {
    #[must_use]
    pub fn new(element: &str, insight_type: InsightType) -> Self {
        Self(format!("{element}::{}", insight_type.as_str()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InsightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Evidence-backed finding about one UI element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub id: String,
    pub key: InsightKey,
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub persona_ids: IndexSet<String>,
    pub element_ids: IndexSet<String>,
    pub tags: IndexSet<InsightTag>,
    pub summary: String,
    /// Step indices in the order they were processed.
    pub evidence: Vec<u32>,
    pub severity_score: u8,
    /// Timestamp (Unix seconds) of the event that created the insight.
    pub created_at: f64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_severity: Option<u8>,
}

impl Insight {
    #[must_use]
    pub fn persona_count(&self) -> usize {
        self.persona_ids.len()
    }

    #[must_use]
    pub fn occurrence_count(&self) -> usize {
        self.evidence.len()
    }
}
