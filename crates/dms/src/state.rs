//! Drowsiness state tracking

use serde::{Deserialize, Serialize};

/// Per-session eye-closure state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrowsinessState {
    /// Monotonic time (ms) at which the current closure started
    pub eyes_closed_since: Option<u64>,

    /// An eyes-closed event has fired for the current closure episode
    pub is_alerting: bool,

    /// Monotonic time (ms) of the last eyes-closed event (fixed-cooldown policy)
    pub last_closure_event: Option<u64>,
}

impl DrowsinessState {
    /// How long the eyes have been closed at `now_ms`
    pub fn closed_for(&self, now_ms: u64) -> Option<u64> {
        self.eyes_closed_since.map(|since| now_ms.saturating_sub(since))
    }

    /// Eyes observed open: end the closure episode
    pub fn mark_open(&mut self) {
        self.eyes_closed_since = None;
        self.is_alerting = false;
    }

    /// Reset state (on session start)
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
