use smallvec::SmallVec;
use tracing::trace;

use crate::core::Elapsed;
use crate::error::{ReplayError, ReplayResult};

pub const DEFAULT_GROUP_THRESHOLD_PERCENT: f64 = 1.0;

/// Records sharing one visual slot on the 0-100% timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineGroup<'a, T> {
    pub members: SmallVec<[&'a T; 2]>,
    /// Position of the first member, in percent of the timeline duration.
    pub position: f64,
    pub representative_elapsed: f64,
}

impl<'a, T> TimelineGroup<'a, T> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[must_use]
    pub fn member(&self, index: usize) -> Option<&'a T> {
        self.members.get(index).copied()
    }
}

/// Clusters records whose timeline positions are closer than
/// `threshold_percent`.
///
/// Single greedy pass in input order: each record joins the first existing
/// group within the threshold, otherwise it opens a new group. Records
/// without an elapsed time are skipped. Inputs are never mutated.
pub fn group_by_position<T: Elapsed>(
    records: &[T],
    timeline_duration: f64,
    threshold_percent: f64,
) -> ReplayResult<Vec<TimelineGroup<'_, T>>> {
    if !threshold_percent.is_finite() || threshold_percent <= 0.0 {
        return Err(ReplayError::InvalidConfig(
            "group threshold percent must be finite and > 0".to_owned(),
        ));
    }
    if records.is_empty() || !timeline_duration.is_finite() || timeline_duration <= 0.0 {
        return Ok(Vec::new());
    }

    let mut groups: Vec<TimelineGroup<'_, T>> = Vec::new();
    for record in records {
        let Some(elapsed) = record.elapsed() else {
            continue;
        };
        let position = elapsed / timeline_duration * 100.0;
        match groups
            .iter_mut()
            .find(|group| (position - group.position).abs() < threshold_percent)
        {
            Some(group) => group.members.push(record),
            None => {
                let mut members = SmallVec::new();
                members.push(record);
                groups.push(TimelineGroup {
                    members,
                    position,
                    representative_elapsed: elapsed,
                });
            }
        }
    }

    trace!(
        records = records.len(),
        groups = groups.len(),
        threshold_percent,
        "grouped timeline records"
    );
    Ok(groups)
}

/// Next member index to reveal when a group is selected again.
///
/// Empty groups stay at 0.
#[must_use]
pub fn cycle<T>(group: &TimelineGroup<'_, T>, current_index: usize) -> usize {
    if group.members.is_empty() {
        return 0;
    }
    (current_index + 1) % group.members.len()
}

/// Caller-owned selection state over a set of groups.
///
/// Tracks which member each group currently displays and which group was
/// selected last. Must be reset whenever the groups are recomputed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupSelection {
    displayed: Vec<usize>,
    selected_group: Option<usize>,
}

impl GroupSelection {
    #[must_use]
    pub fn new(group_count: usize) -> Self {
        Self {
            displayed: vec![0; group_count],
            selected_group: None,
        }
    }

    pub fn reset(&mut self, group_count: usize) {
        self.displayed.clear();
        self.displayed.resize(group_count, 0);
        self.selected_group = None;
    }

    /// Selects a group and returns the member index now displayed.
    ///
    /// Re-selecting the current group cycles through its members; a
    /// single-member group never cycles. Out-of-range groups return `None`.
    pub fn select<T>(&mut self, group_index: usize, groups: &[TimelineGroup<'_, T>]) -> Option<usize> {
        let group = groups.get(group_index)?;
        if self.displayed.len() != groups.len() {
            self.reset(groups.len());
        }
        let displayed = &mut self.displayed[group_index];
        if self.selected_group == Some(group_index) && group.len() > 1 {
            *displayed = cycle(group, *displayed);
        }
        self.selected_group = Some(group_index);
        Some(*displayed)
    }

    #[must_use]
    pub fn displayed(&self, group_index: usize) -> Option<usize> {
        self.displayed.get(group_index).copied()
    }

    #[must_use]
    pub fn selected_group(&self) -> Option<usize> {
        self.selected_group
    }
}
