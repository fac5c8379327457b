//! Trip event records and the outbound event sink

use alerting::{EmergencyAlert, EscalationState, GeoPoint};
use chrono::{DateTime, Utc};
use crash_detection::CrashFlag;
use dms::{DrowsinessEvent, DrowsinessKind, FrameAnalysis};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl From<DrowsinessKind> for Severity {
    fn from(kind: DrowsinessKind) -> Self {
        match kind {
            DrowsinessKind::EyesClosed => Self::High,
            DrowsinessKind::HeadNod => Self::Medium,
            DrowsinessKind::Yawn => Self::Low,
        }
    }
}

/// A drowsiness event recorded against a trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyEvent {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub kind: DrowsinessKind,
    pub severity: Severity,
    pub description: String,
    /// Monotonic timestamp of the frame (ms)
    pub timestamp_ms: u64,
    pub recorded_at: DateTime<Utc>,
    pub location: Option<GeoPoint>,
}

impl SafetyEvent {
    pub(crate) fn record(trip_id: Uuid, event: &DrowsinessEvent, location: Option<GeoPoint>) -> Self {
        Self {
            id: Uuid::new_v4(),
            trip_id,
            kind: event.kind,
            severity: event.kind.into(),
            description: event.description.clone(),
            timestamp_ms: event.timestamp_ms,
            recorded_at: Utc::now(),
            location,
        }
    }
}

/// End-of-trip report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSummary {
    pub trip_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Monotonic time between start and stop (ms)
    pub duration_ms: u64,
    pub safety_score: u8,
    pub eyes_closed_events: usize,
    pub yawn_events: usize,
    pub head_nod_events: usize,
    pub crash_flags: usize,
    pub emergency_alerts: usize,
    /// Where drowsiness events happened, when the position was known
    pub drowsy_locations: Vec<GeoPoint>,
    pub events: Vec<SafetyEvent>,
}

impl TripSummary {
    pub fn drowsy_events(&self) -> usize {
        self.eyes_closed_events + self.yawn_events + self.head_nod_events
    }
}

/// Receives everything a trip session produces. All methods default to
/// no-ops so consumers implement only what they display or deliver.
pub trait EventSink {
    /// Every evaluated frame, for live status display
    fn on_frame(&mut self, _analysis: &FrameAnalysis) {}

    fn on_event(&mut self, _event: &SafetyEvent) {}

    fn on_crash(&mut self, _flag: &CrashFlag) {}

    /// Remaining whole ticks of the escalation countdown
    fn on_countdown(&mut self, _remaining_ticks: u64) {}

    /// Deliver the emergency alert (SMS, push, ...)
    fn on_emergency_alert(&mut self, _alert: &EmergencyAlert) {}

    fn on_escalation_finished(&mut self, _state: EscalationState) {}
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {}
