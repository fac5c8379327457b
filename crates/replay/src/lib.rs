//! Recorded-session replay
//!
//! A recording is JSON lines, one timestamped record per line:
//!
//! ```text
//! {"type":"location","t_ms":0,"position":{"latitude":12.97,"longitude":77.59}}
//! {"type":"frame","t_ms":33,"face":{"eye_open_probability":{"left":0.1,"right":0.2}}}
//! {"type":"frame","t_ms":66}
//! {"type":"inertial","t_ms":70,"sample":{"sensor":"accelerometer","value":{"x":0,"y":0,"z":25}}}
//! {"type":"cancel","t_ms":4000}
//! ```
//!
//! A frame without `face` is a frame where no face was found. Blank lines
//! and lines starting with `#` are skipped.

use std::io::{BufRead, Write};

use alerting::{EmergencyAlert, EscalationState, GeoPoint};
use anyhow::{bail, Context, Result};
use crash_detection::{CrashFlag, InertialSample};
use dms::FacialObservation;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use trip_monitor::{EventSink, SafetyEvent, TripSession, TripSummary};

/// One line of a recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplayRecord {
    Frame {
        t_ms: u64,
        #[serde(default)]
        face: Option<FacialObservation>,
    },
    Inertial {
        t_ms: u64,
        sample: InertialSample,
    },
    Location {
        t_ms: u64,
        position: GeoPoint,
    },
    /// Rider pressed "I'm OK"
    Cancel { t_ms: u64 },
    Pause { t_ms: u64 },
    Resume { t_ms: u64 },
    /// Clock advance with no sensor input
    Tick { t_ms: u64 },
}

impl ReplayRecord {
    pub fn t_ms(&self) -> u64 {
        match self {
            Self::Frame { t_ms, .. }
            | Self::Inertial { t_ms, .. }
            | Self::Location { t_ms, .. }
            | Self::Cancel { t_ms }
            | Self::Pause { t_ms }
            | Self::Resume { t_ms }
            | Self::Tick { t_ms } => *t_ms,
        }
    }
}

/// Parse a recording, skipping blanks and `#` comments
pub fn parse_recording<R: BufRead>(input: R) -> Result<Vec<ReplayRecord>> {
    let mut records = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let line = line.with_context(|| format!("reading line {}", index + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let record: ReplayRecord = serde_json::from_str(trimmed)
            .with_context(|| format!("parsing line {}", index + 1))?;
        records.push(record);
    }
    Ok(records)
}

/// Drive a session through a recording and return the trip summary.
///
/// The trip starts at the first record's timestamp and stops at the last.
/// A countdown still running at the end of the recording is run out.
pub fn replay<S: EventSink>(records: &[ReplayRecord], session: &mut TripSession<S>) -> Result<TripSummary> {
    let Some(first) = records.first() else {
        bail!("recording is empty");
    };
    session.start(first.t_ms())?;

    let mut last_t = first.t_ms();
    for record in records {
        let t_ms = record.t_ms();
        if t_ms < last_t {
            bail!("record at {}ms is out of order (previous {}ms)", t_ms, last_t);
        }
        last_t = t_ms;

        match record {
            ReplayRecord::Frame { face, .. } => {
                session.process_frame(face.as_ref(), t_ms)?;
            }
            ReplayRecord::Inertial { sample, .. } => {
                session.process_inertial(*sample, t_ms)?;
            }
            ReplayRecord::Location { position, .. } => {
                session.advance(t_ms);
                session.update_location(*position);
            }
            ReplayRecord::Cancel { .. } => {
                session.advance(t_ms);
                if !session.cancel_escalation() {
                    warn!(t_ms, "cancel ignored, no countdown running");
                }
            }
            ReplayRecord::Pause { .. } => {
                session.advance(t_ms);
                session.pause().with_context(|| format!("pause at {}ms", t_ms))?;
            }
            ReplayRecord::Resume { .. } => {
                session.advance(t_ms);
                session.resume().with_context(|| format!("resume at {}ms", t_ms))?;
            }
            ReplayRecord::Tick { .. } => {
                session.advance(t_ms);
            }
        }
    }

    if session.countdown().is_some() {
        let deadline = last_t.saturating_add(session.config().escalation.duration_ms);
        warn!(deadline, "recording ended during a crash countdown, running it out");
        session.advance(deadline);
        last_t = deadline;
    }

    let summary = session.stop(last_t)?;
    info!(records = records.len(), safety_score = summary.safety_score, "replay finished");
    Ok(summary)
}

/// Writes every session output as one JSON object per line
pub struct JsonLinesSink<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, value: serde_json::Value) {
        if let Err(e) = writeln!(self.out, "{}", value) {
            warn!("failed to write replay output: {}", e);
        }
    }
}

impl<W: Write> EventSink for JsonLinesSink<W> {
    fn on_event(&mut self, event: &SafetyEvent) {
        self.emit(json!({ "type": "event", "event": event }));
    }

    fn on_crash(&mut self, flag: &CrashFlag) {
        self.emit(json!({ "type": "crash", "flag": flag }));
    }

    fn on_countdown(&mut self, remaining_ticks: u64) {
        self.emit(json!({ "type": "countdown", "remaining": remaining_ticks }));
    }

    fn on_emergency_alert(&mut self, alert: &EmergencyAlert) {
        self.emit(json!({
            "type": "emergency_alert",
            "alert": alert,
            "message": alert.message(),
        }));
    }

    fn on_escalation_finished(&mut self, state: EscalationState) {
        self.emit(json!({ "type": "escalation_finished", "state": state }));
    }
}

/// Initialize logging to stderr. `RUST_LOG` overrides the default `info` level.
pub fn init_logging(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    installed.context("Failed to set tracing subscriber")
}

#[cfg(test)]
mod tests {
    use super::*;
    use trip_monitor::{NullSink, SafetyConfig, TripState};

    const CRASH_THEN_CANCEL: &str = r#"
# rider drops the phone, then confirms they are fine
{"type":"location","t_ms":0,"position":{"latitude":12.97,"longitude":77.59}}
{"type":"frame","t_ms":0,"face":{"eye_open_probability":{"left":0.9,"right":0.9}}}
{"type":"inertial","t_ms":100,"sample":{"sensor":"accelerometer","value":{"x":0,"y":0,"z":25}}}
{"type":"tick","t_ms":4100}
{"type":"cancel","t_ms":4500}
{"type":"frame","t_ms":5000}
"#;

    fn closed_frame(t_ms: u64) -> String {
        format!(
            r#"{{"type":"frame","t_ms":{},"face":{{"eye_open_probability":{{"left":0.1,"right":0.1}}}}}}"#,
            t_ms
        )
    }

    #[test]
    fn test_parse_skips_comments() {
        let records = parse_recording(CRASH_THEN_CANCEL.as_bytes()).unwrap();
        assert_eq!(records.len(), 6);
        assert_eq!(records[5], ReplayRecord::Frame { t_ms: 5_000, face: None });
    }

    #[test]
    fn test_parse_reports_line() {
        let err = parse_recording("\n{\"type\":\"warp\",\"t_ms\":1}\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_crash_then_cancel() {
        let records = parse_recording(CRASH_THEN_CANCEL.as_bytes()).unwrap();
        let mut session = TripSession::new(SafetyConfig::default(), JsonLinesSink::new(Vec::new())).unwrap();

        let summary = replay(&records, &mut session).unwrap();
        assert_eq!(summary.crash_flags, 1);
        assert_eq!(summary.emergency_alerts, 0);
        assert_eq!(session.state(), TripState::Stopped);

        let output = String::from_utf8(session.into_sink().into_inner()).unwrap();
        let lines: Vec<serde_json::Value> =
            output.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines[0]["type"], "crash");
        assert_eq!(lines[1]["remaining"], 30);
        assert_eq!(lines.last().unwrap()["state"], "cancelled");
    }

    #[test]
    fn test_countdown_run_out_at_end() {
        let records = parse_recording(
            r#"{"type":"inertial","t_ms":0,"sample":{"sensor":"gyroscope","value":{"x":7,"y":0,"z":0}}}"#
                .as_bytes(),
        )
        .unwrap();
        let mut session = TripSession::new(SafetyConfig::default(), NullSink).unwrap();

        let summary = replay(&records, &mut session).unwrap();
        assert_eq!(summary.emergency_alerts, 1);
        assert_eq!(summary.duration_ms, 30_000);
    }

    #[test]
    fn test_drowsy_recording() {
        let recording: String = (0..=20).map(|i| closed_frame(i * 100) + "\n").collect();
        let records = parse_recording(recording.as_bytes()).unwrap();
        let mut session = TripSession::new(SafetyConfig::default(), NullSink).unwrap();

        let summary = replay(&records, &mut session).unwrap();
        assert_eq!(summary.eyes_closed_events, 1);
        assert_eq!(summary.safety_score, 98);
    }

    #[test]
    fn test_bundled_commute_recording() {
        let recording = include_str!("../recordings/commute_crash_cancelled.jsonl");
        let records = parse_recording(recording.as_bytes()).unwrap();
        let mut session = TripSession::new(SafetyConfig::default(), NullSink).unwrap();

        let summary = replay(&records, &mut session).unwrap();
        assert_eq!(summary.eyes_closed_events, 1);
        assert_eq!(summary.yawn_events, 3);
        assert_eq!(summary.head_nod_events, 0);
        assert_eq!(summary.crash_flags, 1);
        assert_eq!(summary.emergency_alerts, 0);
        assert_eq!(summary.safety_score, 98);
        assert_eq!(summary.drowsy_locations.len(), 4);
        assert_eq!(summary.drowsy_locations[0], GeoPoint::new(12.9731, 77.5960));
    }

    #[test]
    fn test_countdown_run_out_near_clock_limit() {
        let t_ms = u64::MAX - 1_000;
        let records = vec![
            ReplayRecord::Tick { t_ms: t_ms - 100 },
            ReplayRecord::Inertial {
                t_ms,
                sample: InertialSample::Gyroscope(crash_detection::Vector3::new(7.0, 0.0, 0.0)),
            },
        ];
        let mut session = TripSession::new(SafetyConfig::default(), NullSink).unwrap();

        let summary = replay(&records, &mut session).unwrap();
        assert_eq!(summary.crash_flags, 1);
        assert_eq!(summary.emergency_alerts, 1);
        assert_eq!(summary.duration_ms, u64::MAX - (t_ms - 100));
    }

    #[test]
    fn test_out_of_order_rejected() {
        let records = vec![
            ReplayRecord::Tick { t_ms: 100 },
            ReplayRecord::Tick { t_ms: 50 },
        ];
        let mut session = TripSession::new(SafetyConfig::default(), NullSink).unwrap();
        assert!(replay(&records, &mut session).is_err());
    }

    #[test]
    fn test_empty_recording_rejected() {
        let mut session = TripSession::new(SafetyConfig::default(), NullSink).unwrap();
        assert!(replay(&[], &mut session).is_err());
    }
}
