pub mod clock;
pub mod matcher;
pub mod metadata;
pub mod primitives;
pub mod timeline;
pub mod types;

pub use clock::{RunClock, backfill_elapsed, elapsed_of, normalize_start};
pub use matcher::{
    MatchOutcome, MatchTier, SeekTarget, is_beyond_media, latest_at_or_before,
    match_by_proximity, resolve, seek_target,
};
pub use metadata::UpdateMetadata;
pub use timeline::{
    DEFAULT_ACTIVE_TOLERANCE_SECONDS, Elapsed, EventTimeline, TimedEvent, TimedUpdate,
    UpdateTimeline, ensure_sorted, find_active, find_active_index, find_next, find_next_index,
    validate_run_events,
};
pub use types::{
    Action, Event, EventStatus, InsightUpdate, RunMetadata, RunMode, RunStatus, RunSummary,
    UiVersion,
};
