//! Tokio-driven escalation countdown

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::emergency::{AlertDispatcher, EmergencyAlert, LocationSource};
use crate::escalation::{EscalationConfig, EscalationState, EscalationTimer, TickOutcome};
use crate::EscalationError;

/// Handle to a running countdown task
pub struct EscalationHandle {
    timer: Arc<EscalationTimer>,
    wake: Arc<Notify>,
    countdown: watch::Receiver<u64>,
    task: JoinHandle<EscalationState>,
}

impl EscalationHandle {
    /// Start the countdown on the current tokio runtime.
    ///
    /// On expiry the alert is built from `location` and handed to
    /// `dispatcher` exactly once before the task finishes.
    pub fn spawn(
        config: &EscalationConfig,
        location: Arc<dyn LocationSource>,
        dispatcher: Arc<dyn AlertDispatcher>,
    ) -> Result<Self, EscalationError> {
        let timer = Arc::new(EscalationTimer::start(config)?);
        let wake = Arc::new(Notify::new());
        let (tx, rx) = watch::channel(timer.remaining_ticks());

        let task = tokio::spawn(run_countdown(
            Arc::clone(&timer),
            Arc::clone(&wake),
            tx,
            location,
            dispatcher,
        ));

        Ok(Self {
            timer,
            wake,
            countdown: rx,
            task,
        })
    }

    /// Cancel the countdown. Returns `false` if it had already finished.
    pub fn cancel(&self) -> bool {
        let cancelled = self.timer.cancel();
        self.wake.notify_one();
        cancelled
    }

    /// Remaining whole ticks, updated every tick
    pub fn countdown(&self) -> watch::Receiver<u64> {
        self.countdown.clone()
    }

    pub fn state(&self) -> EscalationState {
        self.timer.state()
    }

    /// Wait for the terminal state
    pub async fn join(self) -> Result<EscalationState, EscalationError> {
        self.task
            .await
            .map_err(|e| EscalationError::Task(e.to_string()))
    }
}

async fn run_countdown(
    timer: Arc<EscalationTimer>,
    wake: Arc<Notify>,
    countdown: watch::Sender<u64>,
    location: Arc<dyn LocationSource>,
    dispatcher: Arc<dyn AlertDispatcher>,
) -> EscalationState {
    let mut interval = tokio::time::interval(Duration::from_millis(timer.tick_ms()));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => match timer.tick() {
                TickOutcome::Counting { .. } => {
                    let _ = countdown.send(timer.remaining_ticks());
                }
                TickOutcome::Expired => {
                    let _ = countdown.send(0);
                    let alert = EmergencyAlert::new(location.last_known());
                    info!(location = ?alert.location, "dispatching emergency alert");
                    dispatcher.dispatch(&alert);
                    return EscalationState::Expired;
                }
                TickOutcome::Inactive(state) => return state,
            },
            _ = wake.notified() => {
                let state = timer.state();
                if state.is_terminal() {
                    return state;
                }
                warn!("countdown woken while still running");
            }
        }
    }
}
