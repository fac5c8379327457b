//! Escalation timer state machine
//!
//! `Running -> {Cancelled, Expired}`. Both terminal transitions go through a
//! single compare-and-swap on the state cell, so when a cancel and the last
//! tick race exactly one of them wins and the other observes a no-op.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use tracing::{debug, info};
use crate::EscalationError;

const RUNNING: u8 = 0;
const CANCELLED: u8 = 1;
const EXPIRED: u8 = 2;

/// Escalation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Total countdown before the emergency alert (milliseconds)
    pub duration_ms: u64,
    /// Countdown tick (milliseconds)
    pub tick_ms: u64,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            duration_ms: 30_000,
            tick_ms: 1_000,
        }
    }
}

impl EscalationConfig {
    pub fn validate(&self) -> Result<(), EscalationError> {
        if self.tick_ms == 0 {
            return Err(EscalationError::Config("tick_ms must be greater than zero".into()));
        }
        if self.duration_ms < self.tick_ms {
            return Err(EscalationError::Config(format!(
                "duration_ms ({}) must be at least one tick ({})",
                self.duration_ms, self.tick_ms
            )));
        }
        if self.duration_ms % self.tick_ms != 0 {
            return Err(EscalationError::Config(format!(
                "duration_ms ({}) must be a whole number of ticks ({})",
                self.duration_ms, self.tick_ms
            )));
        }
        Ok(())
    }
}

/// Timer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationState {
    Running,
    Cancelled,
    Expired,
}

impl EscalationState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            RUNNING => Self::Running,
            CANCELLED => Self::Cancelled,
            _ => Self::Expired,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Result of advancing the countdown by one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still running
    Counting { remaining_ms: u64 },
    /// This tick expired the timer; the caller must send the alert
    Expired,
    /// Timer already terminal; nothing happened
    Inactive(EscalationState),
}

/// Cancellable crash-confirmation countdown
#[derive(Debug)]
pub struct EscalationTimer {
    duration_ms: u64,
    tick_ms: u64,
    remaining_ms: AtomicU64,
    state: AtomicU8,
}

impl EscalationTimer {
    /// Start a countdown in the `Running` state
    pub fn start(config: &EscalationConfig) -> Result<Self, EscalationError> {
        config.validate()?;
        info!(duration_ms = config.duration_ms, tick_ms = config.tick_ms, "escalation countdown started");
        Ok(Self {
            duration_ms: config.duration_ms,
            tick_ms: config.tick_ms,
            remaining_ms: AtomicU64::new(config.duration_ms),
            state: AtomicU8::new(RUNNING),
        })
    }

    pub fn state(&self) -> EscalationState {
        EscalationState::from_raw(self.state.load(Ordering::Acquire))
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms.load(Ordering::Acquire)
    }

    /// Remaining whole ticks, for countdown display
    pub fn remaining_ticks(&self) -> u64 {
        self.remaining_ms().div_ceil(self.tick_ms)
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn tick_ms(&self) -> u64 {
        self.tick_ms
    }

    /// Advance by one tick
    pub fn tick(&self) -> TickOutcome {
        let state = self.state();
        if state.is_terminal() {
            return TickOutcome::Inactive(state);
        }

        let tick = self.tick_ms;
        let previous = self
            .remaining_ms
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |r| Some(r.saturating_sub(tick)))
            .unwrap_or(0);
        let remaining_ms = previous.saturating_sub(tick);

        if remaining_ms > 0 {
            debug!(remaining_ms, "escalation tick");
            return TickOutcome::Counting { remaining_ms };
        }

        match self
            .state
            .compare_exchange(RUNNING, EXPIRED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                info!("escalation countdown expired");
                TickOutcome::Expired
            }
            Err(raw) => TickOutcome::Inactive(EscalationState::from_raw(raw)),
        }
    }

    /// Cancel a running countdown. Returns `false` (no-op) when already terminal.
    pub fn cancel(&self) -> bool {
        match self
            .state
            .compare_exchange(RUNNING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                info!(remaining_ms = self.remaining_ms(), "escalation cancelled");
                true
            }
            Err(raw) => {
                debug!(state = ?EscalationState::from_raw(raw), "cancel ignored");
                false
            }
        }
    }
}
