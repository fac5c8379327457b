//! Alerting System
//!
//! Crash escalation: a cancellable countdown that sends one emergency
//! alert if nobody cancels it in time.

mod countdown;
mod emergency;
mod escalation;

pub use countdown::EscalationHandle;
pub use emergency::{AlertDispatcher, AlertLocation, EmergencyAlert, GeoPoint, LocationSource};
pub use escalation::{EscalationConfig, EscalationState, EscalationTimer, TickOutcome};

use thiserror::Error;

/// Alerting error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EscalationError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Countdown task failed: {0}")]
    Task(String),
}
