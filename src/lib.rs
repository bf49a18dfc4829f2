//! persona-replay: synchronization and aggregation core for persona-driven UX
//! test runs.
//!
//! A run produces a discrete event log and a media recording on independent
//! clocks. This crate normalizes both onto one elapsed-time axis, locates and
//! correlates records for a playback position, groups overlapping timeline
//! markers, folds events into ranked insights with baseline diffing, and
//! replays scripted step sequences on a cancellable timer.

pub mod config;
pub mod core;
pub mod error;
pub mod extensions;
pub mod insights;
pub mod playback;
pub mod session;
pub mod source;
pub mod telemetry;

pub use config::{PlaybackConfig, ReplayConfig, SeverityConfig};
pub use error::{ReplayError, ReplayResult};
pub use insights::{DiffReport, Insight, InsightAggregator, InsightReport};
pub use playback::{PlaybackEngine, PlaybackNotification, PlaybackStatus};
pub use session::ReplaySession;
pub use source::{InMemoryRunStore, RunSource, UpdateFilter};
