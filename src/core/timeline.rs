//! Timeline location over elapsed-stamped records.
//!
//! Every query assumes records are sorted by non-decreasing elapsed time.
//! That invariant is checked once at ingestion (`ensure_sorted`,
//! `EventTimeline::from_events`), never on the query path.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::clock::normalize_start;
use crate::core::{Event, InsightUpdate, RunClock};
use crate::error::{ReplayError, ReplayResult};

pub const DEFAULT_ACTIVE_TOLERANCE_SECONDS: f64 = 0.1;

/// A record positioned on the run timeline.
///
/// `None` means the record cannot be placed; queries skip it.
pub trait Elapsed {
    fn elapsed(&self) -> Option<f64>;
}

impl<T: Elapsed + ?Sized> Elapsed for &T {
    fn elapsed(&self) -> Option<f64> {
        (**self).elapsed()
    }
}

impl Elapsed for f64 {
    fn elapsed(&self) -> Option<f64> {
        self.is_finite().then_some(*self)
    }
}

/// Index of the last record at or before `query + tolerance`.
///
/// Scanning stops at the first record past the bound.
#[must_use]
pub fn find_active_index<T: Elapsed>(records: &[T], query: f64, tolerance: f64) -> Option<usize> {
    let bound = query + tolerance;
    let mut active = None;
    for (index, record) in records.iter().enumerate() {
        let Some(elapsed) = record.elapsed() else {
            continue;
        };
        if elapsed > bound {
            break;
        }
        active = Some(index);
    }
    active
}

/// The record active at `query`: latest at or before `query + tolerance`.
#[must_use]
pub fn find_active<T: Elapsed>(records: &[T], query: f64, tolerance: f64) -> Option<&T> {
    find_active_index(records, query, tolerance).map(|index| &records[index])
}

/// Index of the first record strictly after `query`.
#[must_use]
pub fn find_next_index<T: Elapsed>(records: &[T], query: f64) -> Option<usize> {
    records
        .iter()
        .position(|record| record.elapsed().is_some_and(|elapsed| elapsed > query))
}

#[must_use]
pub fn find_next<T: Elapsed>(records: &[T], query: f64) -> Option<&T> {
    find_next_index(records, query).map(|index| &records[index])
}

/// Rejects sequences whose placed records go backwards in time.
pub fn ensure_sorted<T: Elapsed>(records: &[T]) -> ReplayResult<()> {
    let mut previous: Option<f64> = None;
    for (index, record) in records.iter().enumerate() {
        let Some(current) = record.elapsed() else {
            continue;
        };
        if let Some(previous) = previous {
            if current < previous {
                return Err(ReplayError::UnsortedTimeline {
                    index,
                    previous,
                    current,
                });
            }
        }
        previous = Some(current);
    }
    Ok(())
}

/// Checks the run-level ordering invariant: strictly increasing step index and
/// non-decreasing elapsed time under `clock`.
pub fn validate_run_events(events: &[Event], clock: RunClock) -> ReplayResult<()> {
    let mut previous: Option<(u32, f64)> = None;
    for (index, event) in events.iter().enumerate() {
        let elapsed = clock.elapsed_of(event);
        if !elapsed.is_finite() {
            return Err(ReplayError::InvalidData(format!(
                "event {index} (step {}) has a non-finite elapsed time",
                event.step_index
            )));
        }
        if let Some((previous_step, previous_elapsed)) = previous {
            if event.step_index <= previous_step {
                return Err(ReplayError::StepOrder {
                    index,
                    previous: previous_step,
                    current: event.step_index,
                });
            }
            if elapsed < previous_elapsed {
                return Err(ReplayError::UnsortedTimeline {
                    index,
                    previous: previous_elapsed,
                    current: elapsed,
                });
            }
        }
        previous = Some((event.step_index, elapsed));
    }
    Ok(())
}

/// An event with its resolved offset into the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedEvent {
    pub event: Event,
    pub elapsed: f64,
}

impl Elapsed for TimedEvent {
    fn elapsed(&self) -> Option<f64> {
        Some(self.elapsed)
    }
}

/// A knowledge-store update with its resolved offset into the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedUpdate {
    pub update: InsightUpdate,
    pub elapsed: f64,
}

impl Elapsed for TimedUpdate {
    fn elapsed(&self) -> Option<f64> {
        Some(self.elapsed)
    }
}

/// Validated, elapsed-resolved events of one run in step order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTimeline {
    events: Vec<TimedEvent>,
}

impl EventTimeline {
    pub fn from_events(events: Vec<Event>, clock: RunClock) -> ReplayResult<Self> {
        validate_run_events(&events, clock)?;
        let events: Vec<TimedEvent> = events
            .into_iter()
            .map(|event| TimedEvent {
                elapsed: clock.elapsed_of(&event),
                event,
            })
            .collect();
        debug!(count = events.len(), "built event timeline");
        Ok(Self { events })
    }

    #[must_use]
    pub fn events(&self) -> &[TimedEvent] {
        &self.events
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[must_use]
    pub fn last_elapsed(&self) -> Option<f64> {
        self.events.last().map(|event| event.elapsed)
    }

    #[must_use]
    pub fn active_at(&self, query: f64, tolerance: f64) -> Option<&TimedEvent> {
        find_active(&self.events, query, tolerance)
    }

    #[must_use]
    pub fn next_after(&self, query: f64) -> Option<&TimedEvent> {
        find_next(&self.events, query)
    }
}

/// Knowledge-store updates placed on a run timeline, sorted by elapsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateTimeline {
    updates: Vec<TimedUpdate>,
    skipped: usize,
}

impl UpdateTimeline {
    /// Resolves each update's offset from `metadata.elapsed`, falling back to
    /// `created_at` relative to the run start. Updates with neither are
    /// dropped. Ties keep their log order.
    #[must_use]
    pub fn from_updates(updates: Vec<InsightUpdate>, clock: RunClock) -> Self {
        let mut skipped = 0;
        let mut placed = Vec::with_capacity(updates.len());
        for update in updates {
            let elapsed = update.metadata_elapsed().or_else(|| {
                normalize_start(&update.created_at)
                    .ok()
                    .map(|created| clock.elapsed_of_instant(created))
            });
            match elapsed {
                Some(elapsed) if elapsed.is_finite() => placed.push(TimedUpdate { update, elapsed }),
                _ => {
                    warn!(update_id = %update.id, "dropping update without a usable elapsed time");
                    skipped += 1;
                }
            }
        }
        placed.sort_by_key(|update| OrderedFloat(update.elapsed));
        debug!(count = placed.len(), skipped, "built update timeline");
        Self {
            updates: placed,
            skipped,
        }
    }

    #[must_use]
    pub fn updates(&self) -> &[TimedUpdate] {
        &self.updates
    }

    /// Number of updates dropped because no offset could be resolved.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}
