//! Live simulation of a step sequence on a virtual clock.

pub mod engine;
pub mod script;
pub mod state;
pub mod step;

pub use engine::PlaybackEngine;
pub use script::{FlowCatalog, PlaybackRequest, ScriptedFlow, ScriptedStep};
pub use state::PlaybackStatus;
pub use step::{PlaybackNotification, PlaybackStep};
