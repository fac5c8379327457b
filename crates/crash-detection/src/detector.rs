//! Amplitude-threshold crash detector
//!
//! A crash candidate is any moment where the acceleration magnitude or the
//! angular-velocity magnitude exceeds its threshold. This is a heuristic
//! trigger for a user-confirmable countdown, not a forensic classifier.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use crate::imu::{ImuLatch, InertialSample};
use crate::CrashError;

/// Crash detector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrashConfig {
    /// Acceleration magnitude threshold (m/s²)
    pub accel_threshold: f32,
    /// Angular velocity magnitude threshold (rad/s)
    pub gyro_threshold: f32,
}

impl Default for CrashConfig {
    fn default() -> Self {
        Self {
            accel_threshold: 15.0,
            gyro_threshold: 5.0,
        }
    }
}

impl CrashConfig {
    pub fn validate(&self) -> Result<(), CrashError> {
        for (name, value) in [
            ("accel_threshold", self.accel_threshold),
            ("gyro_threshold", self.gyro_threshold),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(CrashError::Config(format!(
                    "{} must be a positive finite number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Which signal crossed its threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrashTrigger {
    Acceleration,
    Rotation,
    Both,
}

/// A flagged crash candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrashFlag {
    pub trigger: CrashTrigger,
    /// Acceleration magnitude at flag time (m/s²)
    pub accel_magnitude: f32,
    /// Angular velocity magnitude at flag time (rad/s)
    pub gyro_magnitude: f32,
    /// Monotonic timestamp (ms)
    pub timestamp_ms: u64,
}

/// Crash detector holding the sensor latches and the re-entrancy guard
#[derive(Debug)]
pub struct CrashDetector {
    config: CrashConfig,
    latch: ImuLatch,
    crash_detected: bool,
}

impl CrashDetector {
    pub fn new(config: CrashConfig) -> Result<Self, CrashError> {
        config.validate()?;
        Ok(Self {
            config,
            latch: ImuLatch::default(),
            crash_detected: false,
        })
    }

    /// Latch a sensor update and evaluate. Returns a flag only on the
    /// transition into the crash state; while flagged, samples are latched
    /// but not evaluated.
    pub fn update(&mut self, sample: InertialSample, now_ms: u64) -> Option<CrashFlag> {
        self.record(sample);

        if self.crash_detected {
            return None;
        }

        let accel_magnitude = self.latch.accel_magnitude();
        let gyro_magnitude = self.latch.gyro_magnitude();

        let trigger = match (
            accel_magnitude > self.config.accel_threshold,
            gyro_magnitude > self.config.gyro_threshold,
        ) {
            (true, true) => CrashTrigger::Both,
            (true, false) => CrashTrigger::Acceleration,
            (false, true) => CrashTrigger::Rotation,
            (false, false) => return None,
        };

        self.crash_detected = true;
        info!(
            ?trigger,
            accel_magnitude, gyro_magnitude, now_ms, "crash candidate flagged"
        );

        Some(CrashFlag {
            trigger,
            accel_magnitude,
            gyro_magnitude,
            timestamp_ms: now_ms,
        })
    }

    /// Latch a sensor update without evaluating it
    pub fn record(&mut self, sample: InertialSample) {
        self.latch.apply(sample);
    }

    /// Release the guard so evaluation resumes
    pub fn clear(&mut self) {
        if self.crash_detected {
            debug!("crash guard released");
        }
        self.crash_detected = false;
    }

    pub fn is_crash_detected(&self) -> bool {
        self.crash_detected
    }

    /// Latest sensor values
    pub fn latch(&self) -> &ImuLatch {
        &self.latch
    }

    pub fn config(&self) -> &CrashConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imu::Vector3;
    use proptest::prelude::*;

    fn accel(z: f32) -> InertialSample {
        InertialSample::Accelerometer(Vector3::new(0.0, 0.0, z))
    }

    fn gyro(x: f32) -> InertialSample {
        InertialSample::Gyroscope(Vector3::new(x, 0.0, 0.0))
    }

    #[test]
    fn test_invalid_config() {
        let config = CrashConfig {
            accel_threshold: -15.0,
            ..Default::default()
        };
        assert!(CrashDetector::new(config).is_err());
    }

    #[test]
    fn test_resting_phone_is_quiet() {
        let mut detector = CrashDetector::new(CrashConfig::default()).unwrap();
        assert!(detector.update(accel(9.81), 0).is_none());
        assert!(detector.update(gyro(0.2), 10).is_none());
        assert!(!detector.is_crash_detected());
    }

    #[test]
    fn test_flags_once_while_above() {
        let mut detector = CrashDetector::new(CrashConfig::default()).unwrap();
        let flags: Vec<_> = [9.8, 12.0, 16.0, 18.0, 25.0, 30.0]
            .iter()
            .enumerate()
            .filter_map(|(i, z)| detector.update(accel(*z), i as u64 * 10))
            .collect();

        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].trigger, CrashTrigger::Acceleration);
        assert_eq!(flags[0].timestamp_ms, 20);
        assert!(detector.is_crash_detected());
    }

    #[test]
    fn test_gyro_trigger_uses_latched_accel() {
        let mut detector = CrashDetector::new(CrashConfig::default()).unwrap();
        detector.update(accel(9.8), 0);
        let flag = detector.update(gyro(6.0), 5).unwrap();
        assert_eq!(flag.trigger, CrashTrigger::Rotation);
        assert!((flag.accel_magnitude - 9.8).abs() < 1e-5);
    }

    #[test]
    fn test_both_trigger() {
        let mut detector = CrashDetector::new(CrashConfig::default()).unwrap();
        detector.update(gyro(7.0), 0);
        // Guard already set by the gyro flag
        assert!(detector.update(accel(20.0), 1).is_none());

        detector.clear();
        let flag = detector.update(accel(20.0), 2).unwrap();
        assert_eq!(flag.trigger, CrashTrigger::Both);
    }

    #[test]
    fn test_clear_rearms() {
        let mut detector = CrashDetector::new(CrashConfig::default()).unwrap();
        assert!(detector.update(accel(20.0), 0).is_some());
        assert!(detector.update(accel(20.0), 1).is_none());
        detector.clear();
        assert!(detector.update(accel(9.8), 2).is_none());
        assert!(detector.update(accel(20.0), 3).is_some());
    }

    #[test]
    fn test_record_latches_without_flagging() {
        let mut detector = CrashDetector::new(CrashConfig::default()).unwrap();
        detector.record(accel(40.0));
        assert!(!detector.is_crash_detected());
        assert!((detector.latch().accel_magnitude() - 40.0).abs() < 1e-5);

        // Next evaluation sees the recorded value
        let flag = detector.update(gyro(0.1), 1).unwrap();
        assert_eq!(flag.trigger, CrashTrigger::Acceleration);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut detector = CrashDetector::new(CrashConfig::default()).unwrap();
        assert!(detector.update(accel(15.0), 0).is_none());
        assert!(detector.update(gyro(5.0), 1).is_none());
    }

    proptest! {
        #[test]
        fn at_most_one_flag_without_clear(
            zs in prop::collection::vec(0.0f32..60.0, 1..200)
        ) {
            let mut detector = CrashDetector::new(CrashConfig::default()).unwrap();
            let flags = zs
                .iter()
                .enumerate()
                .filter(|(i, z)| detector.update(accel(**z), *i as u64).is_some())
                .count();
            prop_assert!(flags <= 1);
            prop_assert_eq!(flags == 1, zs.iter().any(|z| *z > 15.0));
        }
    }
}
