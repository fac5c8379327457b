//! DMS configuration

use serde::{Deserialize, Serialize};
use crate::DmsError;

/// Debounce policy for eye-closure events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ClosurePolicy {
    /// One event per closure episode; re-armed when the eyes are seen open
    UntilReopened,
    /// At most one event per cooldown window, independent of reopening
    FixedCooldown { cooldown_ms: u64 },
}

impl Default for ClosurePolicy {
    fn default() -> Self {
        Self::UntilReopened
    }
}

/// DMS configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Eye aspect ratio below which an eye counts as closed
    pub ear_threshold: f32,

    /// Eye-open probability below which an eye counts as closed
    pub eye_closed_prob_threshold: f32,

    /// Continuous closure before an eyes-closed event (milliseconds)
    pub closed_time_threshold_ms: u64,

    /// Mouth height/width ratio above which a yawn is reported
    pub yawn_ratio_threshold: f32,

    /// Absolute pitch above which a head nod is reported (degrees)
    pub head_nod_threshold_deg: f32,

    /// Absolute roll above which a head tilt is reported (degrees)
    pub head_tilt_threshold_deg: f32,

    /// Eye-closure debounce policy
    pub closure_policy: ClosurePolicy,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.20,
            eye_closed_prob_threshold: 0.45,
            closed_time_threshold_ms: 1500,
            yawn_ratio_threshold: 0.55,
            head_nod_threshold_deg: 18.0,
            head_tilt_threshold_deg: 20.0,
            closure_policy: ClosurePolicy::UntilReopened,
        }
    }
}

impl DmsConfig {
    /// Tuned for contour-based landmark detectors
    pub fn landmark_detector() -> Self {
        Self::default()
    }

    /// Tuned for detectors that report eye-open probabilities
    pub fn classifier_detector() -> Self {
        Self {
            closed_time_threshold_ms: 1800,
            ..Default::default()
        }
    }

    /// Create strict config (lower thresholds)
    pub fn strict() -> Self {
        Self {
            closed_time_threshold_ms: 1000,
            head_nod_threshold_deg: 15.0,
            head_tilt_threshold_deg: 15.0,
            ..Default::default()
        }
    }

    /// Create lenient config (higher thresholds)
    pub fn lenient() -> Self {
        Self {
            closed_time_threshold_ms: 2500,
            yawn_ratio_threshold: 0.65,
            head_nod_threshold_deg: 25.0,
            head_tilt_threshold_deg: 28.0,
            ..Default::default()
        }
    }

    /// Switch to the fixed-cooldown eye-closure policy
    pub fn with_cooldown(mut self, cooldown_ms: u64) -> Self {
        self.closure_policy = ClosurePolicy::FixedCooldown { cooldown_ms };
        self
    }

    /// Reject thresholds that cannot produce meaningful decisions
    pub fn validate(&self) -> Result<(), DmsError> {
        let positive = [
            ("ear_threshold", self.ear_threshold),
            ("eye_closed_prob_threshold", self.eye_closed_prob_threshold),
            ("yawn_ratio_threshold", self.yawn_ratio_threshold),
            ("head_nod_threshold_deg", self.head_nod_threshold_deg),
            ("head_tilt_threshold_deg", self.head_tilt_threshold_deg),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(DmsError::Config(format!(
                    "{} must be a positive finite number, got {}",
                    name, value
                )));
            }
        }

        if self.eye_closed_prob_threshold > 1.0 {
            return Err(DmsError::Config(format!(
                "eye_closed_prob_threshold must be within (0, 1], got {}",
                self.eye_closed_prob_threshold
            )));
        }

        if let ClosurePolicy::FixedCooldown { cooldown_ms: 0 } = self.closure_policy {
            return Err(DmsError::Config("cooldown_ms must be greater than zero".into()));
        }

        Ok(())
    }
}
