use crate::config::SeverityConfig;

use super::model::InsightType;

pub const MIN_SEVERITY: u8 = 1;
pub const MAX_SEVERITY: u8 = 10;

/// `base(type) + min(personas, persona_cap) + min(occurrences, evidence_cap)`,
/// clamped to `1..=10`. Recomputed from counts on every update.
#[must_use]
pub fn severity_score(
    insight_type: InsightType,
    persona_count: usize,
    evidence_count: usize,
    config: &SeverityConfig,
) -> u8 {
    let breadth = persona_count.min(config.persona_cap) as u32;
    let persistence = evidence_count.min(config.evidence_cap) as u32;
    let raw = insight_type.base_severity() + breadth + persistence;
    raw.clamp(u32::from(MIN_SEVERITY), u32::from(MAX_SEVERITY)) as u8
}
