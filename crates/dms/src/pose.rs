//! Head nod / tilt thresholding

use serde::{Deserialize, Serialize};
use crate::observation::HeadPose;
use crate::DmsConfig;

/// Head nod or tilt beyond the configured limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadNod {
    /// Pitch (X) in degrees
    pub pitch: f32,
    /// Roll (Z) in degrees
    pub roll: f32,
}

/// Stateless head-pose evaluator. Every frame over the limits is reported.
#[derive(Debug, Clone, Copy)]
pub struct HeadPoseEvaluator {
    nod_threshold_deg: f32,
    tilt_threshold_deg: f32,
}

impl HeadPoseEvaluator {
    pub fn new(config: &DmsConfig) -> Self {
        Self {
            nod_threshold_deg: config.head_nod_threshold_deg,
            tilt_threshold_deg: config.head_tilt_threshold_deg,
        }
    }

    pub fn evaluate(&self, pose: &HeadPose) -> Option<HeadNod> {
        let nodding = pose.pitch.abs() > self.nod_threshold_deg;
        let tilted = pose.roll.abs() > self.tilt_threshold_deg;

        (nodding || tilted).then_some(HeadNod {
            pitch: pose.pitch,
            roll: pose.roll,
        })
    }
}
