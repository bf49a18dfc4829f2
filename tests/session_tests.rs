use approx::assert_relative_eq;
use persona_replay::core::{
    Action, Event, EventStatus, InsightUpdate, MatchTier, RunMetadata, RunMode, RunStatus,
    UiVersion,
};
use persona_replay::source::{InMemoryRunStore, UpdateFilter};
use persona_replay::{ReplayConfig, ReplayError, ReplaySession};
use serde_json::json;

const NOON_2024_01_01: f64 = 1_704_110_400.0;

fn metadata(run_id: &str, started_at: &str, duration_ms: Option<u64>) -> RunMetadata {
    RunMetadata {
        run_id: run_id.to_owned(),
        persona_id: "alex".to_owned(),
        scenario_id: "checkout".to_owned(),
        ui_version: UiVersion::V2,
        mode: RunMode::LlmDriven,
        status: RunStatus::Completed,
        started_at: started_at.to_owned(),
        completed_at: None,
        duration_ms,
        error: None,
    }
}

fn event(run_id: &str, step: u32, offset: f64, status: EventStatus) -> Event {
    Event::new(
        run_id,
        "alex",
        step,
        format!("#step-{step}"),
        Action::Click,
        status,
        NOON_2024_01_01 + offset,
    )
}

fn store() -> InMemoryRunStore {
    let mut store = InMemoryRunStore::new();
    store.upsert_run(metadata("r1", "2024-01-01T12:00:00", Some(30_000)));
    store
        .set_media_url("r1", "media/r1.webm")
        .expect("known run");

    for (step, offset) in [(1, 1.0), (2, 5.0), (3, 12.0)] {
        store
            .add_event(event("r1", step, offset, EventStatus::Confused))
            .expect("add");
    }
    // Runner clock says 40s even though the wall clock says 20s.
    store
        .add_event(event("r1", 4, 20.0, EventStatus::Success).with_elapsed(40.0))
        .expect("add");

    let updates = [
        InsightUpdate::new("near-step-2", "2024-01-01T12:00:30")
            .with_metadata("runId", json!("r1"))
            .with_metadata("elapsed", json!("5.2")),
        InsightUpdate::new("by-created-at", "2024-01-01T12:00:11")
            .with_metadata("runId", json!("r1")),
        InsightUpdate::new("other-run", "2024-01-01T12:00:02")
            .with_metadata("runId", json!("r2")),
        InsightUpdate::new("unplaceable", "sometime").with_metadata("runId", json!("r1")),
    ];
    for update in updates {
        store.add_update(update, "doc").expect("add update");
    }
    store
}

fn session() -> ReplaySession {
    ReplaySession::load(&store(), "r1", ReplayConfig::default()).expect("valid run")
}

#[test]
fn load_places_events_and_updates() {
    let session = session();

    let elapsed: Vec<f64> = session.events().iter().map(|e| e.elapsed).collect();
    assert_eq!(elapsed, vec![1.0, 5.0, 12.0, 40.0]);

    let ids: Vec<&str> = session
        .updates()
        .iter()
        .map(|u| u.update.id.as_str())
        .collect();
    assert_eq!(ids, vec!["near-step-2", "by-created-at"]);
    assert_relative_eq!(session.updates()[1].elapsed, 11.0);

    assert_eq!(session.media_url(), Some("media/r1.webm"));
    assert_eq!(session.media_duration(), Some(30.0));
    assert_relative_eq!(session.clock().start_epoch(), NOON_2024_01_01);
}

#[test]
fn active_and_next_events_follow_the_playhead() {
    let session = session();

    let active = session.active_event_at(5.05).expect("step 2 is active");
    assert_eq!(active.event.step_index, 2);

    assert!(session.active_event_at(0.5).is_none());
    assert_eq!(
        session.active_event_at(0.95).map(|e| e.event.step_index),
        Some(1)
    );

    let next = session.next_event_after(5.0).expect("step 3 follows");
    assert_eq!(next.event.step_index, 3);
    assert!(session.next_event_after(40.0).is_none());
}

#[test]
fn update_lookup_prefers_the_active_event() {
    let session = session();

    let active = session.active_event_at(5.05);
    let outcome = session
        .active_update_at(5.05, active)
        .expect("update near step 2");
    assert_eq!(outcome.tier, MatchTier::Anchor);
    assert_eq!(outcome.candidate.update.id, "near-step-2");

    let active = session.active_event_at(13.0);
    assert_eq!(active.map(|e| e.event.step_index), Some(3));
    let outcome = session
        .active_update_at(13.0, active)
        .expect("latest update");
    assert_eq!(outcome.tier, MatchTier::LatestAtOrBefore);
    assert_eq!(outcome.candidate.update.id, "by-created-at");

    assert!(session.active_update_at(1.0, None).is_none());
}

#[test]
fn timeline_extends_past_media_and_seeks_clamp() {
    let session = session();
    assert_relative_eq!(session.timeline_duration(), 40.0);

    let target = session.seek_target(40.0);
    assert_relative_eq!(target.position, 29.95, epsilon = 1e-9);
    assert!(target.beyond_media);
    assert!(session.is_beyond_media(40.0));

    let target = session.seek_target(12.0);
    assert_relative_eq!(target.position, 12.0);
    assert!(!target.beyond_media);
}

#[test]
fn media_duration_can_be_corrected_by_the_player() {
    let mut session = session();

    assert!(matches!(
        session.set_media_duration(f64::NAN),
        Err(ReplayError::InvalidData(_))
    ));
    assert!(matches!(
        session.set_media_duration(-1.0),
        Err(ReplayError::InvalidData(_))
    ));
    assert_eq!(session.media_duration(), Some(30.0));

    session.set_media_duration(50.0).expect("valid duration");
    assert_relative_eq!(session.timeline_duration(), 50.0);
    assert!(!session.is_beyond_media(40.0));
}

#[test]
fn markers_group_by_position_on_the_timeline() {
    let session = session();
    let groups = session.groups_for(40.0).expect("valid threshold");
    assert_eq!(groups.len(), 4);
    assert!(groups.iter().all(|group| group.len() == 1));

    let coarse = ReplaySession::load(
        &store(),
        "r1",
        ReplayConfig::default().with_group_threshold(15.0),
    )
    .expect("valid run");
    let groups = coarse.groups_for(40.0).expect("valid threshold");
    let sizes: Vec<usize> = groups.iter().map(|group| group.len()).collect();
    assert_eq!(sizes, vec![2, 1, 1]);
}

#[test]
fn run_without_recording_has_no_media_bounds() {
    let mut store = InMemoryRunStore::new();
    store.upsert_run(metadata("r2", "2024-01-01T12:00:00Z", None));
    store
        .add_event(event("r2", 0, 3.0, EventStatus::Success))
        .expect("add");

    let session = ReplaySession::load(&store, "r2", ReplayConfig::default()).expect("valid run");
    assert_eq!(session.media_url(), None);
    assert_eq!(session.media_duration(), None);
    assert_relative_eq!(session.timeline_duration(), 3.0);
    assert!(!session.is_beyond_media(1_000.0));

    let target = session.seek_target(1_000.0);
    assert_relative_eq!(target.position, 1_000.0);
    assert!(!target.beyond_media);
}

#[test]
fn malformed_start_is_rejected() {
    let mut store = InMemoryRunStore::new();
    store.upsert_run(metadata("bad", "yesterday", Some(1_000)));

    assert!(matches!(
        ReplaySession::load(&store, "bad", ReplayConfig::default()),
        Err(ReplayError::MalformedTimestamp { .. })
    ));
}

#[test]
fn out_of_order_events_are_rejected() {
    let mut store = InMemoryRunStore::new();
    store.upsert_run(metadata("r3", "2024-01-01T12:00:00", None));
    store
        .add_event(event("r3", 1, 5.0, EventStatus::Success))
        .expect("add");
    store
        .add_event(event("r3", 2, 1.0, EventStatus::Success))
        .expect("add");

    assert!(matches!(
        ReplaySession::load(&store, "r3", ReplayConfig::default()),
        Err(ReplayError::UnsortedTimeline { index: 1, .. })
    ));

    let mut store = InMemoryRunStore::new();
    store.upsert_run(metadata("r4", "2024-01-01T12:00:00", None));
    store
        .add_event(event("r4", 1, 1.0, EventStatus::Success))
        .expect("add");
    store
        .add_event(event("r4", 1, 2.0, EventStatus::Success))
        .expect("add");

    assert!(matches!(
        ReplaySession::load(&store, "r4", ReplayConfig::default()),
        Err(ReplayError::StepOrder { previous: 1, current: 1, .. })
    ));
}

#[test]
fn unknown_run_and_bad_config_fail_to_load() {
    let store = store();
    assert!(matches!(
        ReplaySession::load(&store, "ghost", ReplayConfig::default()),
        Err(ReplayError::RunNotFound(_))
    ));
    assert!(matches!(
        ReplaySession::load(&store, "r1", ReplayConfig::default().with_match_epsilon(-1.0)),
        Err(ReplayError::InvalidConfig(_))
    ));
}

#[test]
fn untagged_updates_belong_to_the_loaded_run() {
    let mut store = InMemoryRunStore::new();
    store.upsert_run(metadata("r5", "2024-01-01T12:00:00", Some(10_000)));
    store
        .add_event(event("r5", 0, 1.0, EventStatus::Confused))
        .expect("add");
    store
        .add_update(InsightUpdate::new("u1", "2024-01-01T12:00:01"), "doc v1")
        .expect("add update");
    store
        .add_update(
            InsightUpdate::new("u2", "2024-01-01T12:00:02").with_metadata("runId", json!("r6")),
            "doc v2",
        )
        .expect("add update");

    let session = ReplaySession::load(&store, "r5", ReplayConfig::default()).expect("valid run");
    let ids: Vec<&str> = session
        .updates()
        .iter()
        .map(|u| u.update.id.as_str())
        .collect();
    assert_eq!(ids, vec!["u1"]);

    let outcome = session
        .active_update_at(2.0, session.active_event_at(2.0))
        .expect("untagged update is placed");
    assert_eq!(outcome.candidate.update.id, "u1");
    assert_eq!(outcome.tier, MatchTier::Anchor);
}

#[test]
fn explicit_update_filter_is_applied_verbatim() {
    let store = store();

    let strict = ReplaySession::load_with_update_filter(
        &store,
        "r1",
        &UpdateFilter::for_run("r1").with("elapsed", "5.2"),
        ReplayConfig::default(),
    )
    .expect("valid run");
    let ids: Vec<&str> = strict
        .updates()
        .iter()
        .map(|u| u.update.id.as_str())
        .collect();
    assert_eq!(ids, vec!["near-step-2"]);

    let everything = ReplaySession::load_with_update_filter(
        &store,
        "r1",
        &UpdateFilter::new(),
        ReplayConfig::default(),
    )
    .expect("valid run");
    assert_eq!(everything.updates().len(), 3);
}
