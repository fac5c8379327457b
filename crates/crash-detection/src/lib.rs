//! Crash Detection
//!
//! Inertial crash-candidate detection for a trip in progress:
//! - Independently latched accelerometer / gyroscope values
//! - Magnitude thresholds on either signal
//! - Re-entrancy guard held until the escalation outcome clears it

pub mod detector;
pub mod imu;

pub use detector::{CrashConfig, CrashDetector, CrashFlag, CrashTrigger};
pub use imu::{ImuLatch, InertialSample, Vector3};

use thiserror::Error;

/// Crash detection error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CrashError {
    #[error("Configuration error: {0}")]
    Config(String),
}
