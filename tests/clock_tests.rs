use approx::assert_relative_eq;
use chrono::{DateTime, Utc};
use persona_replay::ReplayError;
use persona_replay::core::primitives::{datetime_to_unix_seconds, unix_seconds_to_datetime};
use persona_replay::core::{Action, Event, EventStatus, RunClock, backfill_elapsed, elapsed_of, normalize_start};

const NOON_2024_01_01: f64 = 1_704_110_400.0;

fn event_at(step: u32, timestamp: f64) -> Event {
    Event::new("run-1", "p1", step, "#cta", Action::Click, EventStatus::Success, timestamp)
}

#[test]
fn zone_less_start_is_read_as_utc() {
    let naive = normalize_start("2024-01-01T12:00:00").expect("naive start");
    let explicit = normalize_start("2024-01-01T12:00:00Z").expect("utc start");
    assert_eq!(naive, NOON_2024_01_01);
    assert_eq!(explicit, NOON_2024_01_01);
}

#[test]
fn explicit_offsets_are_honored() {
    let plus_two = normalize_start("2024-01-01T12:00:00+02:00").expect("offset start");
    assert_eq!(plus_two, NOON_2024_01_01 - 7_200.0);
}

#[test]
fn space_separator_and_fractional_seconds_parse() {
    let start = normalize_start("2024-01-01 12:00:00.250").expect("space separated");
    assert_relative_eq!(start, NOON_2024_01_01 + 0.25, epsilon = 1e-6);

    let midnight = normalize_start("2024-01-01").expect("date only");
    assert_eq!(midnight, NOON_2024_01_01 - 43_200.0);
}

#[test]
fn unparseable_start_is_a_hard_error() {
    for input in ["", "   ", "yesterday", "2024-13-01T00:00:00", "12:00 2024-01-01"] {
        let err = normalize_start(input).expect_err("must reject");
        assert!(
            matches!(err, ReplayError::MalformedTimestamp { .. }),
            "unexpected error for {input:?}: {err}"
        );
    }
}

#[test]
fn timestamp_fallback_is_not_shifted_by_local_offset() {
    let start = normalize_start("2024-01-01T12:00:00").expect("start");
    let event_time = normalize_start("2024-01-01T12:00:05Z").expect("event time");
    let event = event_at(0, event_time);

    assert_relative_eq!(elapsed_of(&event, start), 5.0);
}

#[test]
fn recorded_elapsed_wins_over_timestamp() {
    let event = event_at(0, NOON_2024_01_01 + 90.0).with_elapsed(2.5);
    assert_eq!(elapsed_of(&event, NOON_2024_01_01), 2.5);
    assert_eq!(elapsed_of(&event, 0.0), 2.5);
}

#[test]
fn run_clock_wraps_normalized_start() {
    let clock = RunClock::from_start("2024-01-01T12:00:00").expect("clock");
    assert_eq!(clock.start_epoch(), NOON_2024_01_01);
    assert_eq!(clock.elapsed_of(&event_at(0, NOON_2024_01_01 + 3.0)), 3.0);
    assert_eq!(clock.elapsed_of_instant(NOON_2024_01_01 + 7.5), 7.5);

    assert!(RunClock::from_epoch(f64::NAN).is_err());
    assert!(matches!(
        RunClock::from_start("not a date"),
        Err(ReplayError::MalformedTimestamp { .. })
    ));
}

#[test]
fn backfill_fills_only_missing_elapsed_values() {
    let mut events = vec![
        event_at(0, 100.0),
        event_at(1, 101.2345).with_elapsed(9.0),
        event_at(2, 103.0004),
    ];

    let filled = backfill_elapsed(&mut events);

    assert_eq!(filled, 2);
    assert_eq!(events[0].elapsed, Some(0.0));
    assert_eq!(events[1].elapsed, Some(9.0));
    assert_relative_eq!(events[2].elapsed.expect("filled"), 3.0, epsilon = 1e-9);
    assert_eq!(backfill_elapsed(&mut []), 0);
}

#[test]
fn epoch_seconds_convert_back_to_utc_instants() {
    let expected: DateTime<Utc> = DateTime::parse_from_rfc3339("2024-01-01T12:00:00.5Z")
        .expect("rfc3339")
        .with_timezone(&Utc);
    let converted = unix_seconds_to_datetime(NOON_2024_01_01 + 0.5).expect("finite seconds");

    assert_eq!(converted, expected);
    assert_eq!(datetime_to_unix_seconds(converted), NOON_2024_01_01 + 0.5);
    assert!(unix_seconds_to_datetime(f64::INFINITY).is_none());
}
