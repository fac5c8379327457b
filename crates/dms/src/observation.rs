//! Per-frame facial measurements produced by the upstream landmark detector

use serde::{Deserialize, Serialize};
use crate::geometry::Point;

/// Head pose (Euler angles)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadPose {
    /// Pitch (up-down nod, X axis) in degrees
    pub pitch: f32,
    /// Yaw (left-right rotation, Y axis) in degrees
    pub yaw: f32,
    /// Roll (side tilt, Z axis) in degrees
    pub roll: f32,
}

/// Eye-open probabilities from a classifier-style detector (0 = closed, 1 = open)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeOpenProbability {
    pub left: f32,
    pub right: f32,
}

impl EyeOpenProbability {
    /// Both values are finite and inside [0, 1]
    pub fn is_valid(&self) -> bool {
        [self.left, self.right]
            .iter()
            .all(|p| p.is_finite() && (0.0..=1.0).contains(p))
    }
}

/// Landmarks and pose for one analyzed frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacialObservation {
    /// Left eye contour, ordered
    pub left_eye: Vec<Point>,
    /// Right eye contour, ordered
    pub right_eye: Vec<Point>,
    /// Top edge of the upper lip
    pub upper_lip_top: Vec<Point>,
    /// Bottom edge of the lower lip
    pub lower_lip_bottom: Vec<Point>,
    /// Precomputed eye-open probabilities, when the detector classifies instead of tracing contours
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eye_open_probability: Option<EyeOpenProbability>,
    /// Head pose
    pub head_pose: HeadPose,
}

impl FacialObservation {
    /// Observation carrying only eye-open probabilities and a pose
    pub fn from_probabilities(left: f32, right: f32, head_pose: HeadPose) -> Self {
        Self {
            eye_open_probability: Some(EyeOpenProbability { left, right }),
            head_pose,
            ..Default::default()
        }
    }
}
