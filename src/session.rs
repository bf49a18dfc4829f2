use tracing::{debug, warn};

use crate::config::ReplayConfig;
use crate::core::{
    EventTimeline, InsightUpdate, MatchOutcome, RunClock, RunMetadata, SeekTarget, TimedEvent,
    TimedUpdate, UpdateTimeline, is_beyond_media, resolve, seek_target,
};
use crate::error::{ReplayError, ReplayResult};
use crate::extensions::{TimelineGroup, group_by_position};
use crate::source::{RunSource, UpdateFilter};

/// Synchronized view of one recorded run.
///
/// Owns the run clock, the validated event timeline and the placed
/// knowledge updates. All queries take the media player's current position
/// in seconds.
#[derive(Debug, Clone)]
pub struct ReplaySession {
    metadata: RunMetadata,
    clock: RunClock,
    events: EventTimeline,
    updates: UpdateTimeline,
    media_url: Option<String>,
    media_duration: Option<f64>,
    config: ReplayConfig,
}

impl ReplaySession {
    /// Pulls a run from `source` and validates it.
    ///
    /// Knowledge updates tagged with this run's `runId` are kept, as are
    /// untagged ones; updates tagged with another run are not. Fails on a
    /// malformed start time or on events that violate step or time ordering.
    pub fn load<S: RunSource + ?Sized>(
        source: &S,
        run_id: &str,
        config: ReplayConfig,
    ) -> ReplayResult<Self> {
        let filter = UpdateFilter::for_run(run_id);
        let updates: Vec<InsightUpdate> = source
            .fetch_insight_updates(&UpdateFilter::new())?
            .into_iter()
            .filter(|update| filter.matches_or_untagged(update))
            .collect();
        Self::assemble(source, run_id, updates, config)
    }

    /// Same as [`ReplaySession::load`], with the knowledge updates selected
    /// by `filter` alone.
    pub fn load_with_update_filter<S: RunSource + ?Sized>(
        source: &S,
        run_id: &str,
        filter: &UpdateFilter,
        config: ReplayConfig,
    ) -> ReplayResult<Self> {
        let updates = source.fetch_insight_updates(filter)?;
        Self::assemble(source, run_id, updates, config)
    }

    fn assemble<S: RunSource + ?Sized>(
        source: &S,
        run_id: &str,
        updates: Vec<InsightUpdate>,
        config: ReplayConfig,
    ) -> ReplayResult<Self> {
        let config = config.validate()?;
        let metadata = source.get_run_metadata(run_id)?;
        let clock = RunClock::from_start(&metadata.started_at)?;
        let events = EventTimeline::from_events(source.get_run_events(run_id)?, clock)?;
        let updates = UpdateTimeline::from_updates(updates, clock);
        let media_url = source.get_media_url(run_id)?;
        if updates.skipped() > 0 {
            warn!(run_id, skipped = updates.skipped(), "some updates could not be placed");
        }
        debug!(
            run_id,
            events = events.len(),
            updates = updates.updates().len(),
            start_epoch = clock.start_epoch(),
            "loaded replay session"
        );

        Ok(Self {
            media_duration: metadata.duration_seconds(),
            metadata,
            clock,
            events,
            updates,
            media_url,
            config,
        })
    }

    #[must_use]
    pub fn metadata(&self) -> &RunMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn clock(&self) -> RunClock {
        self.clock
    }

    #[must_use]
    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    #[must_use]
    pub fn events(&self) -> &[TimedEvent] {
        self.events.events()
    }

    #[must_use]
    pub fn updates(&self) -> &[TimedUpdate] {
        self.updates.updates()
    }

    #[must_use]
    pub fn media_url(&self) -> Option<&str> {
        self.media_url.as_deref()
    }

    #[must_use]
    pub fn media_duration(&self) -> Option<f64> {
        self.media_duration
    }

    /// Records the duration reported by the media player once it is known.
    pub fn set_media_duration(&mut self, seconds: f64) -> ReplayResult<()> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(ReplayError::InvalidData(
                "media duration must be finite and >= 0".to_owned(),
            ));
        }
        self.media_duration = Some(seconds);
        Ok(())
    }

    #[must_use]
    pub fn active_event_at(&self, time: f64) -> Option<&TimedEvent> {
        self.events
            .active_at(time, self.config.active_tolerance_seconds)
    }

    #[must_use]
    pub fn next_event_after(&self, time: f64) -> Option<&TimedEvent> {
        self.events.next_after(time)
    }

    /// Update to show next to `active_event`, or the latest one at `time`.
    #[must_use]
    pub fn active_update_at(
        &self,
        time: f64,
        active_event: Option<&TimedEvent>,
    ) -> Option<MatchOutcome<'_, TimedUpdate>> {
        resolve(
            active_event,
            self.updates.updates(),
            time,
            self.config.match_epsilon_seconds,
        )
    }

    /// Marker groups for the run's events on a timeline of `duration` seconds.
    pub fn groups_for(&self, duration: f64) -> ReplayResult<Vec<TimelineGroup<'_, TimedEvent>>> {
        group_by_position(
            self.events.events(),
            duration,
            self.config.group_threshold_percent,
        )
    }

    /// Length of the scrubbable timeline: the media duration, stretched to
    /// cover events recorded past the end of the media.
    #[must_use]
    pub fn timeline_duration(&self) -> f64 {
        let last_event = self.events.last_elapsed().unwrap_or(0.0);
        match self.media_duration {
            Some(media) => media.max(last_event),
            None => last_event,
        }
    }

    #[must_use]
    pub fn is_beyond_media(&self, elapsed: f64) -> bool {
        self.media_duration
            .is_some_and(|media| is_beyond_media(elapsed, media))
    }

    /// Media position for showing the record at `elapsed`.
    #[must_use]
    pub fn seek_target(&self, elapsed: f64) -> SeekTarget {
        seek_target(
            elapsed,
            self.media_duration.unwrap_or(f64::INFINITY),
            self.config.last_frame_margin_seconds,
        )
    }
}
