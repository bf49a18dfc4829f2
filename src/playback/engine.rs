use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::config::PlaybackConfig;
use crate::error::{ReplayError, ReplayResult};

use super::script::{FlowCatalog, PlaybackRequest};
use super::state::PlaybackStatus;
use super::step::{PlaybackNotification, PlaybackStep};

const NOTIFICATION_CAPACITY: usize = 256;

#[derive(Debug)]
struct EngineState {
    status: PlaybackStatus,
    steps: Vec<PlaybackStep>,
    /// Index of the next step to deliver.
    cursor: usize,
    speed: f64,
    /// Bumped on every cancellation; a delivery task only acts while its
    /// generation is current.
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl EngineState {
    fn cancel_pending(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

/// Replays a sequence of steps on a cancellable timer.
///
/// Each delivery is a spawned tokio task sleeping for the previous step's
/// `duration / speed`. `pause` and `stop` abort that task before returning,
/// so no step fires after either call. Cloning yields another handle to the
/// same engine.
#[derive(Debug, Clone)]
pub struct PlaybackEngine {
    state: Arc<Mutex<EngineState>>,
    notifications: broadcast::Sender<PlaybackNotification>,
    runtime: Handle,
    config: PlaybackConfig,
}

impl PlaybackEngine {
    /// Builds an engine bound to the current tokio runtime.
    pub fn new(config: PlaybackConfig) -> ReplayResult<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            ReplayError::InvalidConfig(format!("playback engine needs a tokio runtime: {e}"))
        })?;
        Self::with_runtime(config, runtime)
    }

    pub fn with_runtime(config: PlaybackConfig, runtime: Handle) -> ReplayResult<Self> {
        let config = config.validate()?;
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Ok(Self {
            state: Arc::new(Mutex::new(EngineState {
                status: PlaybackStatus::Idle,
                steps: Vec::new(),
                cursor: 0,
                speed: config.default_speed,
                generation: 0,
                pending: None,
            })),
            notifications,
            runtime,
            config,
        })
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackNotification> {
        self.notifications.subscribe()
    }

    #[must_use]
    pub fn status(&self) -> PlaybackStatus {
        self.lock().status
    }

    /// Index of the next step to deliver.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.lock().cursor
    }

    #[must_use]
    pub fn speed(&self) -> f64 {
        self.lock().speed
    }

    /// Starts a new run from step 0, cancelling whatever was playing.
    ///
    /// An empty step list emits an `Error` notification and leaves the engine
    /// untouched. Returns whether a run was started.
    pub fn start(&self, steps: Vec<PlaybackStep>) -> bool {
        self.start_with_speed(steps, self.config.default_speed)
    }

    /// Looks up a scripted flow and plays it.
    ///
    /// A missing or empty flow is reported as an `Error` notification with no
    /// state change. A flow that fails validation is reported and leaves the
    /// engine `Failed`.
    pub fn start_flow(&self, catalog: &FlowCatalog, request: &PlaybackRequest) -> bool {
        let Some(flow) = catalog
            .get(&request.persona_id, request.ui_version)
            .filter(|flow| !flow.steps.is_empty())
        else {
            self.emit(PlaybackNotification::Error {
                message: format!(
                    "no steps found for persona `{}` on ui {}",
                    request.persona_id,
                    request.ui_version.as_str()
                ),
            });
            return false;
        };

        if let Err(err) = flow.validate() {
            let mut state = self.lock();
            state.cancel_pending();
            state.status = PlaybackStatus::Failed;
            drop(state);
            warn!(persona_id = %request.persona_id, error = %err, "scripted flow rejected");
            self.emit(PlaybackNotification::Error {
                message: err.to_string(),
            });
            return false;
        }

        let speed = match request.speed {
            Some(speed) if speed.is_finite() && speed > 0.0 => speed,
            Some(speed) => {
                self.emit(PlaybackNotification::Error {
                    message: format!("playback speed must be finite and > 0, got {speed}"),
                });
                return false;
            }
            None => self.config.default_speed,
        };
        self.start_with_speed(flow.playback_steps(), speed)
    }

    fn start_with_speed(&self, steps: Vec<PlaybackStep>, speed: f64) -> bool {
        if steps.is_empty() {
            self.emit(PlaybackNotification::Error {
                message: "no steps found for playback".to_owned(),
            });
            return false;
        }
        if let Err(err) = check_delays(&steps, self.config.default_step_duration_ms, speed) {
            self.emit(PlaybackNotification::Error {
                message: err.to_string(),
            });
            return false;
        }

        let mut state = self.lock();
        state.cancel_pending();
        debug!(steps = steps.len(), speed, "starting playback");
        state.steps = steps;
        state.cursor = 0;
        state.speed = speed;
        state.status = PlaybackStatus::Running;
        self.schedule(&mut state, Duration::ZERO);
        true
    }

    /// Cancels the pending delivery and keeps the cursor. Only a running
    /// engine can pause.
    pub fn pause(&self) -> bool {
        let mut state = self.lock();
        if state.status != PlaybackStatus::Running {
            return false;
        }
        state.cancel_pending();
        state.status = PlaybackStatus::Paused;
        debug!(cursor = state.cursor, "paused playback");
        true
    }

    /// Resumes a paused run at `speed`.
    ///
    /// The last delivered step is not emitted again; the next one follows
    /// after that step's duration at the new speed. A speed that makes any
    /// remaining delay unrepresentable is rejected and the run stays paused.
    pub fn resume(&self, speed: f64) -> ReplayResult<bool> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(ReplayError::InvalidConfig(format!(
                "playback speed must be finite and > 0, got {speed}"
            )));
        }
        let mut state = self.lock();
        if state.status != PlaybackStatus::Paused {
            return Ok(false);
        }
        let last_delivered = state.cursor.saturating_sub(1);
        let remaining = state.steps.get(last_delivered..).unwrap_or_default();
        check_delays(remaining, self.config.default_step_duration_ms, speed)?;
        let delay = match state.cursor.checked_sub(1).and_then(|last| state.steps.get(last)) {
            Some(step) => delay_for(step, self.config.default_step_duration_ms, speed)?,
            None => Duration::ZERO,
        };
        state.speed = speed;
        state.status = PlaybackStatus::Running;
        debug!(cursor = state.cursor, speed, "resumed playback");
        self.schedule(&mut state, delay);
        Ok(true)
    }

    /// Cancels the pending delivery, discards the run and returns to `Idle`.
    pub fn stop(&self) {
        let mut state = self.lock();
        state.cancel_pending();
        state.steps.clear();
        state.cursor = 0;
        state.status = PlaybackStatus::Idle;
        debug!("stopped playback");
    }

    /// Explicit teardown for owners that keep the engine for a session.
    pub fn dispose(&self) {
        self.stop();
    }

    fn schedule(&self, state: &mut MutexGuard<'_, EngineState>, delay: Duration) {
        let generation = state.generation;
        let shared: Weak<Mutex<EngineState>> = Arc::downgrade(&self.state);
        let notifications = self.notifications.clone();
        let default_duration_ms = self.config.default_step_duration_ms;

        let handle = self.runtime.spawn(async move {
            let mut delay = delay;
            loop {
                tokio::time::sleep(delay).await;
                // The engine was dropped while this delivery was pending.
                let Some(shared) = shared.upgrade() else {
                    return;
                };
                let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
                if state.generation != generation || state.status != PlaybackStatus::Running {
                    return;
                }
                let Some(step) = state.steps.get(state.cursor).cloned() else {
                    let delivered = state.cursor;
                    state.status = PlaybackStatus::Completed;
                    state.pending = None;
                    drop(state);
                    debug!(delivered, "playback completed");
                    let _ = notifications.send(PlaybackNotification::Complete { delivered });
                    return;
                };

                delay = match delay_for(&step, default_duration_ms, state.speed) {
                    Ok(delay) => delay,
                    Err(err) => {
                        state.status = PlaybackStatus::Failed;
                        state.pending = None;
                        drop(state);
                        warn!(error = %err, "playback step has no representable delay");
                        let _ = notifications.send(PlaybackNotification::Error {
                            message: err.to_string(),
                        });
                        return;
                    }
                };
                let index = state.cursor;
                state.cursor += 1;
                // Sent under the lock so a concurrent pause cannot interleave.
                trace!(index, "delivering playback step");
                let _ = notifications.send(PlaybackNotification::Step { index, step });
            }
        });
        state.pending = Some(handle);
    }

    fn emit(&self, notification: PlaybackNotification) {
        if let PlaybackNotification::Error { message } = &notification {
            warn!(%message, "playback error");
        }
        // No subscribers is not an error.
        let _ = self.notifications.send(notification);
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for EngineState {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

/// Wait after `step` at `speed`. Fails when the scaled wait does not fit in a
/// `Duration`.
fn delay_for(step: &PlaybackStep, default_duration_ms: u64, speed: f64) -> ReplayResult<Duration> {
    let duration_ms = step.duration_ms.unwrap_or(default_duration_ms) as f64;
    Duration::try_from_secs_f64(duration_ms / speed / 1000.0).map_err(|e| {
        ReplayError::InvalidConfig(format!(
            "step {} cannot be scheduled at speed {speed}: {e}",
            step.index
        ))
    })
}

fn check_delays(steps: &[PlaybackStep], default_duration_ms: u64, speed: f64) -> ReplayResult<()> {
    steps
        .iter()
        .try_for_each(|step| delay_for(step, default_duration_ms, speed).map(|_| ()))
}
