//! Metric names and recording helpers
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! host process installs a recorder.

use dms::DrowsinessKind;

pub const DROWSINESS_EVENTS: &str = "ridesafe_drowsiness_events_total";
pub const CRASH_FLAGS: &str = "ridesafe_crash_flags_total";
pub const ESCALATIONS: &str = "ridesafe_escalations_total";
pub const SAFETY_SCORE: &str = "ridesafe_safety_score";

pub(crate) fn drowsiness_event(kind: DrowsinessKind) {
    metrics::counter!(DROWSINESS_EVENTS, "kind" => kind.as_str()).increment(1);
}

pub(crate) fn crash_flag() {
    metrics::counter!(CRASH_FLAGS).increment(1);
}

/// `outcome` is `cancelled` or `expired`
pub(crate) fn escalation(outcome: &'static str) {
    metrics::counter!(ESCALATIONS, "outcome" => outcome).increment(1);
}

pub(crate) fn safety_score(score: u8) {
    metrics::gauge!(SAFETY_SCORE).set(f64::from(score));
}
