//! Correlation between the event stream and the knowledge-update stream.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::timeline::{Elapsed, find_active};

/// Which tier of `resolve` produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchTier {
    /// Within epsilon of the active anchor event.
    Anchor,
    /// Latest candidate at or before the query time.
    LatestAtOrBefore,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOutcome<'a, T> {
    pub candidate: &'a T,
    pub tier: MatchTier,
}

/// First candidate, in input order, within `epsilon` of `anchor_elapsed`.
///
/// Several candidates may qualify; the earliest in the slice wins even when a
/// later one is closer.
#[must_use]
pub fn match_by_proximity<T: Elapsed>(
    anchor_elapsed: f64,
    candidates: &[T],
    epsilon: f64,
) -> Option<&T> {
    if !anchor_elapsed.is_finite() {
        return None;
    }
    candidates.iter().find(|candidate| {
        candidate
            .elapsed()
            .is_some_and(|elapsed| (elapsed - anchor_elapsed).abs() <= epsilon)
    })
}

/// Latest candidate whose elapsed time is at or before `query + epsilon`.
#[must_use]
pub fn latest_at_or_before<T: Elapsed>(candidates: &[T], query: f64, epsilon: f64) -> Option<&T> {
    find_active(candidates, query, epsilon)
}

/// Two-tier lookup: proximity to the anchor first, then time alone.
///
/// An anchor without an elapsed time, or one with no candidate in range, falls
/// through to `latest_at_or_before`.
#[must_use]
pub fn resolve<'a, A: Elapsed, T: Elapsed>(
    anchor: Option<&A>,
    candidates: &'a [T],
    query: f64,
    epsilon: f64,
) -> Option<MatchOutcome<'a, T>> {
    if let Some(anchor_elapsed) = anchor.and_then(Elapsed::elapsed) {
        if let Some(candidate) = match_by_proximity(anchor_elapsed, candidates, epsilon) {
            trace!(anchor_elapsed, "matched candidate by anchor proximity");
            return Some(MatchOutcome {
                candidate,
                tier: MatchTier::Anchor,
            });
        }
    }
    latest_at_or_before(candidates, query, epsilon).map(|candidate| MatchOutcome {
        candidate,
        tier: MatchTier::LatestAtOrBefore,
    })
}

/// True when `elapsed` lies past the end of the available media.
///
/// An unknown (non-finite) media duration never reports beyond-media.
#[must_use]
pub fn is_beyond_media(elapsed: f64, media_duration: f64) -> bool {
    media_duration.is_finite() && elapsed > media_duration
}

/// Where the media player should seek for a logical record position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeekTarget {
    /// Clamped media position in seconds.
    pub position: f64,
    /// The requested record lies past the end of the media.
    pub beyond_media: bool,
}

/// Clamps a seek to the last representable frame (`duration - margin`) while
/// keeping the beyond-media flag for the caller.
#[must_use]
pub fn seek_target(elapsed: f64, media_duration: f64, last_frame_margin: f64) -> SeekTarget {
    let requested = elapsed.max(0.0);
    if !media_duration.is_finite() {
        return SeekTarget {
            position: requested,
            beyond_media: false,
        };
    }
    let last_frame = (media_duration - last_frame_margin).max(0.0);
    SeekTarget {
        position: requested.min(last_frame),
        beyond_media: is_beyond_media(elapsed, media_duration),
    }
}
