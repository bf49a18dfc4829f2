use smallvec::SmallVec;

use crate::core::EventStatus;

use super::model::{InsightTag, InsightType};

/// Result of classifying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub insight_type: InsightType,
    /// Never empty.
    pub tags: SmallVec<[InsightTag; 4]>,
}

/// Maps an event's reasoning text and status to an insight type and tags.
///
/// `None` means the event is not evidence of anything worth recording.
pub trait InsightClassifier: Send + Sync {
    fn classify(&self, text: &str, status: EventStatus) -> Option<Classification>;
}

const TAG_KEYWORDS: [(InsightTag, &[&str]); 7] = [
    (
        InsightTag::CopyClarity,
        &["wording", "label", "unclear", "jargon", "ambiguous", "copy", "what does"],
    ),
    (
        InsightTag::Navigation,
        &["navigat", "menu", "back button", "where is", "find the", "lost", "breadcrumb"],
    ),
    (
        InsightTag::VisualHierarchy,
        &["hard to see", "hidden", "notice", "contrast", "buried", "too small", "prominent"],
    ),
    (
        InsightTag::InteractionDesign,
        &["click", "button", "tap", "drag", "unresponsive", "nothing happened", "doesn't work"],
    ),
    (
        InsightTag::InformationOverload,
        &["too much", "too many", "overwhelm", "clutter", "busy", "dense"],
    ),
    (
        InsightTag::MissingGuidance,
        &["not sure", "don't know", "no instructions", "guidance", "hint", "help text", "expected"],
    ),
    (
        InsightTag::PositiveExperience,
        &["love", "easy", "great", "intuitive", "smooth", "delight", "fast"],
    ),
];

const OPPORTUNITY_PHRASES: [&str; 4] = ["wish", "would be nice", "would love", "suggest"];

/// Case-insensitive substring classifier over a fixed vocabulary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn insight_type(text: &str, status: EventStatus) -> Option<InsightType> {
        match status {
            EventStatus::Success => None,
            EventStatus::Blocked => Some(InsightType::Friction),
            EventStatus::Delighted => Some(InsightType::Delight),
            EventStatus::Confused => {
                if OPPORTUNITY_PHRASES.iter().any(|phrase| text.contains(phrase)) {
                    Some(InsightType::Opportunity)
                } else {
                    Some(InsightType::Confusion)
                }
            }
        }
    }

    fn fallback_tag(insight_type: InsightType) -> InsightTag {
        match insight_type {
            InsightType::Delight => InsightTag::PositiveExperience,
            _ => InsightTag::InteractionDesign,
        }
    }
}

impl InsightClassifier for KeywordClassifier {
    fn classify(&self, text: &str, status: EventStatus) -> Option<Classification> {
        let lowered = text.to_lowercase();
        let insight_type = Self::insight_type(&lowered, status)?;

        let mut tags: SmallVec<[InsightTag; 4]> = TAG_KEYWORDS
            .iter()
            .filter(|(tag, _)| {
                // positive wording on a problem report is not a positive signal
                *tag != InsightTag::PositiveExperience || insight_type == InsightType::Delight
            })
            .filter(|(_, keywords)| keywords.iter().any(|keyword| lowered.contains(keyword)))
            .map(|(tag, _)| *tag)
            .collect();
        if tags.is_empty() {
            tags.push(Self::fallback_tag(insight_type));
        }

        Some(Classification { insight_type, tags })
    }
}
