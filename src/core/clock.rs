//! Run clock normalization.
//!
//! Event timestamps are UTC Unix seconds. Run start instants arrive as
//! ISO-like strings that frequently omit the zone; those are read as UTC so
//! the derived offsets never absorb the host's local UTC offset.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::Event;
use crate::core::primitives::{datetime_to_unix_seconds, round_to_millis};
use crate::error::{ReplayError, ReplayResult};

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Converts a run start string into epoch seconds (UTC).
///
/// Inputs without `Z` or a numeric offset are interpreted as UTC. Anything
/// unparseable is a hard error; callers must not guess.
pub fn normalize_start(input: &str) -> ReplayResult<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(malformed(input, "empty start time"));
    }

    let epoch = if has_explicit_zone(trimmed) {
        let parsed = DateTime::parse_from_rfc3339(trimmed)
            .or_else(|_| DateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f%z"))
            .map_err(|err| malformed(input, &err.to_string()))?;
        datetime_to_unix_seconds(parsed.with_timezone(&Utc))
    } else {
        let naive = parse_naive(trimmed).ok_or_else(|| {
            malformed(input, "expected `YYYY-MM-DD[THH:MM[:SS[.fff]]]` with optional zone")
        })?;
        datetime_to_unix_seconds(naive.and_utc())
    };

    trace!(input = trimmed, epoch, "normalized run start");
    Ok(epoch)
}

/// Offset of `event` into the run, in seconds.
///
/// A recorded `elapsed` is returned verbatim; only when it is absent is the
/// wall-clock `timestamp` compared against the run start.
#[must_use]
pub fn elapsed_of(event: &Event, run_start_epoch: f64) -> f64 {
    match event.elapsed {
        Some(elapsed) => elapsed,
        None => event.timestamp - run_start_epoch,
    }
}

/// The run's start instant in epoch seconds. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunClock {
    start_epoch: f64,
}

impl RunClock {
    pub fn from_start(started_at: &str) -> ReplayResult<Self> {
        Self::from_epoch(normalize_start(started_at)?)
    }

    pub fn from_epoch(start_epoch: f64) -> ReplayResult<Self> {
        if !start_epoch.is_finite() {
            return Err(ReplayError::InvalidData(
                "run start epoch must be finite".to_owned(),
            ));
        }
        Ok(Self { start_epoch })
    }

    #[must_use]
    pub fn start_epoch(self) -> f64 {
        self.start_epoch
    }

    #[must_use]
    pub fn elapsed_of(self, event: &Event) -> f64 {
        elapsed_of(event, self.start_epoch)
    }

    /// Offset of an arbitrary absolute instant (epoch seconds) into the run.
    #[must_use]
    pub fn elapsed_of_instant(self, epoch_seconds: f64) -> f64 {
        epoch_seconds - self.start_epoch
    }
}

/// Fills in missing `elapsed` values as seconds since the first event's
/// timestamp, rounded to milliseconds. Existing values are left alone.
///
/// Returns how many events were filled.
pub fn backfill_elapsed(events: &mut [Event]) -> usize {
    let Some(first_timestamp) = events.first().map(|event| event.timestamp) else {
        return 0;
    };
    if !first_timestamp.is_finite() {
        return 0;
    }

    let mut filled = 0;
    for event in events.iter_mut() {
        if event.elapsed.is_some() || !event.timestamp.is_finite() {
            continue;
        }
        event.elapsed = Some(round_to_millis(event.timestamp - first_timestamp));
        filled += 1;
    }

    debug!(filled, total = events.len(), "backfilled event elapsed values");
    filled
}

fn parse_naive(input: &str) -> Option<NaiveDateTime> {
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// True when the time-of-day part carries `Z` or a `+HH:MM`/`-HH:MM` offset.
fn has_explicit_zone(input: &str) -> bool {
    let Some(separator) = input
        .char_indices()
        .skip(10)
        .find(|(_, ch)| matches!(ch, 'T' | 't' | ' '))
        .map(|(index, _)| index)
    else {
        return false;
    };

    let time_part = &input[separator + 1..];
    time_part.ends_with(['Z', 'z']) || time_part.contains(['+', '-'])
}

fn malformed(input: &str, reason: &str) -> ReplayError {
    ReplayError::MalformedTimestamp {
        input: input.to_owned(),
        reason: reason.to_owned(),
    }
}
