use persona_replay::ReplayError;
use persona_replay::core::{
    Action, DEFAULT_ACTIVE_TOLERANCE_SECONDS, Event, EventStatus, EventTimeline, InsightUpdate,
    RunClock, UpdateTimeline, ensure_sorted, find_active, find_active_index, find_next,
    find_next_index,
};
use serde_json::json;

fn event(step: u32, elapsed: f64) -> Event {
    Event::new("run-1", "p1", step, "#cta", Action::Click, EventStatus::Success, 0.0)
        .with_elapsed(elapsed)
}

fn timeline(elapsed: &[f64]) -> EventTimeline {
    let events = elapsed
        .iter()
        .enumerate()
        .map(|(index, value)| event(index as u32, *value))
        .collect();
    EventTimeline::from_events(events, RunClock::from_epoch(0.0).expect("clock")).expect("sorted")
}

#[test]
fn active_record_honors_tolerance() {
    let records = [1.0, 2.0, 3.0];

    assert_eq!(find_active(&records, 1.95, 0.1), Some(&2.0));
    assert_eq!(find_active(&records, 1.85, 0.1), Some(&1.0));
    assert_eq!(find_active(&records, 0.5, DEFAULT_ACTIVE_TOLERANCE_SECONDS), None);
    assert_eq!(find_active(&records, 10.0, 0.1), Some(&3.0));
}

#[test]
fn next_record_is_strictly_after_query() {
    let records = [1.0, 2.0, 3.0];

    assert_eq!(find_next(&records, 1.0), Some(&2.0));
    assert_eq!(find_next(&records, 0.0), Some(&1.0));
    assert_eq!(find_next(&records, 3.0), None);
    assert_eq!(find_next_index(&records, 2.5), Some(2));
}

#[test]
fn empty_inputs_yield_none() {
    let records: [f64; 0] = [];
    assert_eq!(find_active(&records, 1.0, 0.1), None);
    assert_eq!(find_next(&records, 1.0), None);
}

#[test]
fn unplaceable_records_are_skipped() {
    let records = [1.0, f64::NAN, 2.0];
    assert_eq!(find_active_index(&records, 1.5, 0.0), Some(0));
    assert_eq!(find_next_index(&records, 1.0), Some(2));
    assert!(ensure_sorted(&records).is_ok());
}

#[test]
fn queries_are_not_clamped_to_media_duration() {
    let timeline = timeline(&[10.0, 25.0, 42.0]);
    let active = timeline.active_at(45.0, 0.1).expect("active beyond media");
    assert_eq!(active.elapsed, 42.0);
    assert_eq!(timeline.last_elapsed(), Some(42.0));
}

#[test]
fn unsorted_records_are_rejected_at_ingestion() {
    let err = ensure_sorted(&[1.0, 3.0, 2.0]).expect_err("unsorted");
    assert!(matches!(err, ReplayError::UnsortedTimeline { index: 2, .. }));

    let clock = RunClock::from_epoch(0.0).expect("clock");
    let backwards = EventTimeline::from_events(vec![event(0, 2.0), event(1, 1.0)], clock);
    assert!(matches!(backwards, Err(ReplayError::UnsortedTimeline { .. })));

    let repeated = EventTimeline::from_events(vec![event(3, 1.0), event(3, 2.0)], clock);
    assert!(matches!(
        repeated,
        Err(ReplayError::StepOrder {
            index: 1,
            previous: 3,
            current: 3
        })
    ));
}

#[test]
fn event_timeline_resolves_elapsed_from_timestamps() {
    let clock = RunClock::from_epoch(1_000.0).expect("clock");
    let events = vec![
        Event::new("run-1", "p1", 0, "#a", Action::Click, EventStatus::Success, 1_001.5),
        Event::new("run-1", "p1", 1, "#b", Action::Type, EventStatus::Success, 1_004.0),
    ];
    let timeline = EventTimeline::from_events(events, clock).expect("timeline");

    let elapsed: Vec<f64> = timeline.events().iter().map(|event| event.elapsed).collect();
    assert_eq!(elapsed, vec![1.5, 4.0]);
    assert_eq!(timeline.next_after(1.5).map(|event| event.event.step_index), Some(1));
}

#[test]
fn update_timeline_places_and_sorts_updates() {
    let clock = RunClock::from_start("2024-01-01T12:00:00").expect("clock");
    let updates = vec![
        InsightUpdate::new("u-late", "2024-01-01T12:00:59").with_metadata("elapsed", json!("3.5")),
        InsightUpdate::new("u-first", "2024-01-01T12:00:59").with_metadata("elapsed", json!(1.0)),
        InsightUpdate::new("u-created", "2024-01-01T12:00:02"),
        InsightUpdate::new("u-lost", "garbage"),
    ];

    let timeline = UpdateTimeline::from_updates(updates, clock);

    let placed: Vec<(&str, f64)> = timeline
        .updates()
        .iter()
        .map(|update| (update.update.id.as_str(), update.elapsed))
        .collect();
    assert_eq!(placed, vec![("u-first", 1.0), ("u-created", 2.0), ("u-late", 3.5)]);
    assert_eq!(timeline.skipped(), 1);
}

#[test]
fn update_ties_keep_log_order() {
    let clock = RunClock::from_epoch(0.0).expect("clock");
    let updates = vec![
        InsightUpdate::new("a", "x").with_metadata("elapsed", json!(2.0)),
        InsightUpdate::new("b", "x").with_metadata("elapsed", json!("2")),
    ];
    let timeline = UpdateTimeline::from_updates(updates, clock);
    let ids: Vec<&str> = timeline.updates().iter().map(|u| u.update.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}
