//! Data collaborators feeding a replay session.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use tracing::{debug, trace};

use crate::core::{Event, InsightUpdate, RunMetadata, RunSummary, normalize_start};
use crate::error::{ReplayError, ReplayResult};

pub const MAX_STORED_EVENTS: usize = 100_000;
pub const MAX_STORED_UPDATES: usize = 100_000;
/// Metadata key that ties a knowledge update to one run.
pub const RUN_ID_METADATA_KEY: &str = "runId";

/// Metadata equality filter for knowledge-store updates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateFilter {
    pub metadata: BTreeMap<String, String>,
}

impl UpdateFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates tagged with `runId == run_id`.
    #[must_use]
    pub fn for_run(run_id: impl Into<String>) -> Self {
        Self::new().with(RUN_ID_METADATA_KEY, run_id)
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn matches(&self, update: &InsightUpdate) -> bool {
        update.metadata.matches(&self.metadata)
    }

    /// Like `matches`, but updates without a `runId` tag pass as well.
    /// Runners that keep one knowledge log per session never tag updates.
    #[must_use]
    pub fn matches_or_untagged(&self, update: &InsightUpdate) -> bool {
        update.metadata.get(RUN_ID_METADATA_KEY).is_none() || self.matches(update)
    }
}

/// Supplier of runs, events and knowledge updates.
pub trait RunSource {
    fn list_runs(&self) -> ReplayResult<Vec<RunSummary>>;
    fn get_run_metadata(&self, run_id: &str) -> ReplayResult<RunMetadata>;
    /// Events of one run ordered by step index.
    fn get_run_events(&self, run_id: &str) -> ReplayResult<Vec<Event>>;
    /// Opaque media locator; `None` when the run has no recording.
    fn get_media_url(&self, run_id: &str) -> ReplayResult<Option<String>>;
    fn fetch_insight_updates(&self, filter: &UpdateFilter) -> ReplayResult<Vec<InsightUpdate>>;
    fn fetch_knowledge_snapshot(&self) -> ReplayResult<String>;
}

#[derive(Debug, Clone)]
struct StoredRun {
    metadata: RunMetadata,
    media_url: Option<String>,
}

/// Bounded in-memory `RunSource`.
///
/// Events are indexed by run and persona on insert. Both logs reject writes
/// once their capacity is reached.
#[derive(Debug, Clone)]
pub struct InMemoryRunStore {
    runs: IndexMap<String, StoredRun>,
    events: Vec<Event>,
    run_index: HashMap<String, Vec<usize>>,
    persona_index: HashMap<String, Vec<usize>>,
    updates: Vec<InsightUpdate>,
    knowledge: String,
    max_events: usize,
    max_updates: usize,
}

impl Default for InMemoryRunStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRunStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_STORED_EVENTS, MAX_STORED_UPDATES)
    }

    #[must_use]
    pub fn with_capacity(max_events: usize, max_updates: usize) -> Self {
        Self {
            runs: IndexMap::new(),
            events: Vec::new(),
            run_index: HashMap::new(),
            persona_index: HashMap::new(),
            updates: Vec::new(),
            knowledge: String::new(),
            max_events,
            max_updates,
        }
    }

    /// Registers or replaces a run. An existing media URL is kept.
    pub fn upsert_run(&mut self, metadata: RunMetadata) {
        let run_id = metadata.run_id.clone();
        match self.runs.get_mut(&run_id) {
            Some(stored) => stored.metadata = metadata,
            None => {
                self.runs.insert(
                    run_id,
                    StoredRun {
                        metadata,
                        media_url: None,
                    },
                );
            }
        }
    }

    pub fn set_media_url(&mut self, run_id: &str, url: impl Into<String>) -> ReplayResult<()> {
        let stored = self
            .runs
            .get_mut(run_id)
            .ok_or_else(|| ReplayError::RunNotFound(run_id.to_owned()))?;
        stored.media_url = Some(url.into());
        Ok(())
    }

    pub fn add_event(&mut self, event: Event) -> ReplayResult<()> {
        if self.events.len() >= self.max_events {
            return Err(ReplayError::StoreFull {
                capacity: self.max_events,
            });
        }
        let index = self.events.len();
        self.run_index
            .entry(event.run_id.clone())
            .or_default()
            .push(index);
        self.persona_index
            .entry(event.persona_id.clone())
            .or_default()
            .push(index);
        trace!(run_id = %event.run_id, step = event.step_index, "stored event");
        self.events.push(event);
        Ok(())
    }

    /// Appends an update and replaces the knowledge snapshot with
    /// `full_content`, the document as of this update.
    pub fn add_update(
        &mut self,
        update: InsightUpdate,
        full_content: impl Into<String>,
    ) -> ReplayResult<()> {
        if self.updates.len() >= self.max_updates {
            return Err(ReplayError::StoreFull {
                capacity: self.max_updates,
            });
        }
        trace!(update_id = %update.id, "stored knowledge update");
        self.updates.push(update);
        self.knowledge = full_content.into();
        Ok(())
    }

    pub fn seed_knowledge(&mut self, full_content: impl Into<String>) {
        self.knowledge = full_content.into();
    }

    /// Slice of the event log plus its total length. Out-of-range offsets
    /// give an empty page.
    #[must_use]
    pub fn events_page(&self, offset: usize, limit: usize) -> (Vec<Event>, usize) {
        (page(&self.events, offset, limit), self.events.len())
    }

    #[must_use]
    pub fn updates_page(&self, offset: usize, limit: usize) -> (Vec<InsightUpdate>, usize) {
        (page(&self.updates, offset, limit), self.updates.len())
    }

    #[must_use]
    pub fn events_by_run(&self, run_id: &str) -> Vec<&Event> {
        self.indexed(&self.run_index, run_id)
    }

    #[must_use]
    pub fn events_by_persona(&self, persona_id: &str) -> Vec<&Event> {
        self.indexed(&self.persona_index, persona_id)
    }

    #[must_use]
    pub fn updates_matching(&self, filter: &UpdateFilter) -> Vec<&InsightUpdate> {
        self.updates
            .iter()
            .filter(|update| filter.matches(update))
            .collect()
    }

    fn indexed(&self, index: &HashMap<String, Vec<usize>>, key: &str) -> Vec<&Event> {
        index
            .get(key)
            .map(|positions| {
                positions
                    .iter()
                    .filter_map(|&position| self.events.get(position))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl RunSource for InMemoryRunStore {
    /// Newest first by `started_at`; unparseable start times sort last.
    fn list_runs(&self) -> ReplayResult<Vec<RunSummary>> {
        let mut summaries: Vec<(Option<f64>, RunSummary)> = self
            .runs
            .values()
            .map(|stored| {
                (
                    normalize_start(&stored.metadata.started_at).ok(),
                    stored.metadata.summary(),
                )
            })
            .collect();
        summaries.sort_by_key(|(started, _)| Reverse(started.map(OrderedFloat)));
        Ok(summaries.into_iter().map(|(_, summary)| summary).collect())
    }

    fn get_run_metadata(&self, run_id: &str) -> ReplayResult<RunMetadata> {
        self.runs
            .get(run_id)
            .map(|stored| stored.metadata.clone())
            .ok_or_else(|| ReplayError::RunNotFound(run_id.to_owned()))
    }

    fn get_run_events(&self, run_id: &str) -> ReplayResult<Vec<Event>> {
        if !self.runs.contains_key(run_id) && !self.run_index.contains_key(run_id) {
            return Err(ReplayError::RunNotFound(run_id.to_owned()));
        }
        let mut events: Vec<Event> = self.events_by_run(run_id).into_iter().cloned().collect();
        events.sort_by_key(|event| event.step_index);
        debug!(run_id, count = events.len(), "loaded run events");
        Ok(events)
    }

    fn get_media_url(&self, run_id: &str) -> ReplayResult<Option<String>> {
        self.runs
            .get(run_id)
            .map(|stored| stored.media_url.clone())
            .ok_or_else(|| ReplayError::RunNotFound(run_id.to_owned()))
    }

    fn fetch_insight_updates(&self, filter: &UpdateFilter) -> ReplayResult<Vec<InsightUpdate>> {
        Ok(self
            .updates_matching(filter)
            .into_iter()
            .cloned()
            .collect())
    }

    fn fetch_knowledge_snapshot(&self) -> ReplayResult<String> {
        Ok(self.knowledge.clone())
    }
}

fn page<T: Clone>(items: &[T], offset: usize, limit: usize) -> Vec<T> {
    items.iter().skip(offset).take(limit).cloned().collect()
}
