//! DMS analysis results and events

use serde::{Deserialize, Serialize};
use crate::eye::EyeReading;
use crate::observation::HeadPose;

/// Drowsiness event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DrowsinessKind {
    /// Eyes closed past the time threshold
    EyesClosed,

    /// Mouth opened past the yawn ratio
    Yawn,

    /// Head pitched or rolled past the limits
    HeadNod,
}

impl DrowsinessKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EyesClosed => "EYES_CLOSED",
            Self::Yawn => "YAWN",
            Self::HeadNod => "HEAD_NOD",
        }
    }
}

/// Measured value attached to an event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventMetric {
    ClosedDuration { ms: u64 },
    MouthRatio { ratio: f32 },
    HeadAngles { pitch: f32, roll: f32 },
}

/// A discrete drowsiness event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrowsinessEvent {
    pub kind: DrowsinessKind,
    pub description: String,
    pub metric: EventMetric,
    /// Monotonic timestamp (ms)
    pub timestamp_ms: u64,
}

/// Per-frame status for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
    /// Face present, nothing abnormal
    #[default]
    Normal,

    /// Face present and at least one drowsiness condition holds
    Drowsy,

    /// No face in the frame
    NoFace,
}

/// Complete result of evaluating one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalysis {
    pub status: FrameStatus,

    /// Eye openness (None when unmeasurable or no face)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eye: Option<EyeReading>,

    /// Mouth height/width ratio
    pub mouth_ratio: f32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_pose: Option<HeadPose>,

    /// Milliseconds the eyes have been continuously closed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_for_ms: Option<u64>,

    /// Events emitted this frame
    pub events: Vec<DrowsinessEvent>,
}

impl FrameAnalysis {
    pub fn no_face() -> Self {
        Self {
            status: FrameStatus::NoFace,
            ..Default::default()
        }
    }

    /// Check if any events fired
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Most severe event this frame
    pub fn most_severe(&self) -> Option<&DrowsinessEvent> {
        // Priority: EyesClosed > HeadNod > Yawn
        [DrowsinessKind::EyesClosed, DrowsinessKind::HeadNod, DrowsinessKind::Yawn]
            .iter()
            .find_map(|kind| self.events.iter().find(|e| e.kind == *kind))
    }
}
