//! Trip Monitor
//!
//! Wires driver-state inference, crash detection and emergency escalation
//! into a single session per trip:
//! - Trip lifecycle (start, pause, resume, stop)
//! - Drowsiness events recorded with location and severity
//! - Crash flag -> pause -> countdown -> cancel or emergency alert
//! - Safety score and end-of-trip summary

pub mod config;
pub mod events;
pub mod session;
pub mod telemetry;

pub use config::SafetyConfig;
pub use events::{EventSink, NullSink, SafetyEvent, Severity, TripSummary};
pub use session::{TripSession, TripState, EYES_CLOSED_PENALTY, INITIAL_SAFETY_SCORE};

use thiserror::Error;

/// Trip session error types
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Dms(#[from] dms::DmsError),

    #[error(transparent)]
    Crash(#[from] crash_detection::CrashError),

    #[error(transparent)]
    Escalation(#[from] alerting::EscalationError),

    #[error("Invalid trip state: {0}")]
    InvalidState(String),
}
