//! Per-trip safety session
//!
//! One `TripSession` owns everything a trip needs: the drowsiness monitor,
//! the crash detector, the escalation countdown, the last known location and
//! the safety score. Inputs arrive through `&mut self` in timestamp order, so
//! the session needs no locking.
//!
//! Lifecycle: `Idle -> Active <-> Paused -> Stopped`. A crash flag pauses the
//! trip and starts the countdown; cancelling resumes the trip, expiry sends
//! the emergency alert and leaves the trip paused.

use alerting::{EmergencyAlert, EscalationState, EscalationTimer, GeoPoint, TickOutcome};
use chrono::{DateTime, Utc};
use crash_detection::{CrashDetector, CrashFlag, InertialSample};
use dms::{DrowsinessEvent, DrowsinessKind, DrowsinessMonitor, FacialObservation, FrameAnalysis};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::SafetyConfig;
use crate::events::{EventSink, NullSink, SafetyEvent, TripSummary};
use crate::{telemetry, SessionError};

/// Starting safety score
pub const INITIAL_SAFETY_SCORE: u8 = 100;
/// Deducted per eyes-closed event
pub const EYES_CLOSED_PENALTY: u8 = 2;

/// Trip lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripState {
    Idle,
    Active,
    Paused,
    Stopped,
}

struct Escalation {
    timer: EscalationTimer,
    next_tick_ms: u64,
}

/// Safety monitoring for one trip
pub struct TripSession<S: EventSink = NullSink> {
    config: SafetyConfig,
    monitor: DrowsinessMonitor,
    crash: CrashDetector,
    escalation: Option<Escalation>,
    state: TripState,
    trip_id: Uuid,
    started_at: Option<DateTime<Utc>>,
    started_ms: u64,
    location: Option<GeoPoint>,
    safety_score: u8,
    events: Vec<SafetyEvent>,
    crash_flags: usize,
    emergency_alerts: usize,
    sink: S,
}

impl<S: EventSink> TripSession<S> {
    /// Create an idle session. Every configuration section is validated.
    pub fn new(config: SafetyConfig, sink: S) -> Result<Self, SessionError> {
        config.validate()?;
        let monitor = DrowsinessMonitor::new(config.dms.clone())?;
        let crash = CrashDetector::new(config.crash.clone())?;

        Ok(Self {
            config,
            monitor,
            crash,
            escalation: None,
            state: TripState::Idle,
            trip_id: Uuid::new_v4(),
            started_at: None,
            started_ms: 0,
            location: None,
            safety_score: INITIAL_SAFETY_SCORE,
            events: Vec::new(),
            crash_flags: 0,
            emergency_alerts: 0,
            sink,
        })
    }

    /// Start the trip
    pub fn start(&mut self, now_ms: u64) -> Result<Uuid, SessionError> {
        if self.state != TripState::Idle {
            return Err(self.invalid("start"));
        }

        self.monitor.reset_state();
        self.crash.clear();
        self.started_at = Some(Utc::now());
        self.started_ms = now_ms;
        self.safety_score = INITIAL_SAFETY_SCORE;
        self.state = TripState::Active;
        telemetry::safety_score(self.safety_score);

        info!(trip_id = %self.trip_id, now_ms, "trip started");
        Ok(self.trip_id)
    }

    /// Pause monitoring. Frames are ignored until `resume`.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        if self.state != TripState::Active {
            return Err(self.invalid("pause"));
        }
        self.state = TripState::Paused;
        info!(trip_id = %self.trip_id, "trip paused");
        Ok(())
    }

    /// Resume a paused trip. Not allowed while a crash countdown runs; the
    /// rider resumes by cancelling it.
    pub fn resume(&mut self) -> Result<(), SessionError> {
        if self.state != TripState::Paused {
            return Err(self.invalid("resume"));
        }
        if self.escalation.is_some() {
            return Err(SessionError::InvalidState(
                "cannot resume while a crash escalation is running".into(),
            ));
        }
        self.resume_monitoring();
        Ok(())
    }

    /// Stop the trip and produce its summary
    pub fn stop(&mut self, now_ms: u64) -> Result<TripSummary, SessionError> {
        if !matches!(self.state, TripState::Active | TripState::Paused) {
            return Err(self.invalid("stop"));
        }
        if self.escalation.is_some() {
            return Err(SessionError::InvalidState(
                "cannot stop while a crash escalation is running".into(),
            ));
        }

        self.state = TripState::Stopped;
        let summary = self.summary(now_ms);
        info!(
            trip_id = %self.trip_id,
            safety_score = summary.safety_score,
            drowsy_events = summary.drowsy_events(),
            crash_flags = summary.crash_flags,
            "trip stopped"
        );
        Ok(summary)
    }

    /// Feed one camera frame (`None` when no face was found).
    ///
    /// Returns `Ok(None)` while the trip is paused.
    pub fn process_frame(
        &mut self,
        observation: Option<&FacialObservation>,
        now_ms: u64,
    ) -> Result<Option<FrameAnalysis>, SessionError> {
        self.ensure_running("process frames")?;
        self.advance(now_ms);

        if self.state == TripState::Paused {
            debug!(now_ms, "frame skipped, trip paused");
            return Ok(None);
        }

        let analysis = self.monitor.process(observation, now_ms);
        for event in &analysis.events {
            self.record_event(event);
        }
        self.sink.on_frame(&analysis);
        Ok(Some(analysis))
    }

    /// Feed one inertial sample. Samples are always latched; they are only
    /// evaluated while the trip is active.
    pub fn process_inertial(
        &mut self,
        sample: InertialSample,
        now_ms: u64,
    ) -> Result<Option<CrashFlag>, SessionError> {
        self.ensure_running("process inertial samples")?;
        self.advance(now_ms);

        if self.state == TripState::Paused {
            self.crash.record(sample);
            return Ok(None);
        }

        let flag = self.crash.update(sample, now_ms);
        if let Some(flag) = flag {
            self.begin_escalation(flag, now_ms)?;
        }
        Ok(flag)
    }

    /// Run every countdown tick that is due at `now_ms`. Returns the terminal
    /// state if the countdown finished.
    pub fn advance(&mut self, now_ms: u64) -> Option<EscalationState> {
        while let Some(escalation) = self.escalation.as_mut() {
            if now_ms < escalation.next_tick_ms {
                break;
            }
            escalation.next_tick_ms = escalation.next_tick_ms.saturating_add(escalation.timer.tick_ms());

            match self.tick_escalation() {
                Some(TickOutcome::Counting { .. }) => {}
                Some(TickOutcome::Expired) => return Some(EscalationState::Expired),
                Some(TickOutcome::Inactive(state)) => return Some(state),
                None => break,
            }
        }
        None
    }

    /// Advance the countdown by one tick, for hosts that drive their own
    /// timer. `None` when no countdown is running.
    pub fn tick_escalation(&mut self) -> Option<TickOutcome> {
        let escalation = self.escalation.as_ref()?;
        let outcome = escalation.timer.tick();

        match outcome {
            TickOutcome::Counting { .. } => {
                let remaining = escalation.timer.remaining_ticks();
                self.sink.on_countdown(remaining);
            }
            TickOutcome::Expired => {
                self.sink.on_countdown(0);
                self.send_emergency_alert();
            }
            TickOutcome::Inactive(state) => {
                warn!(?state, "dropping finished escalation");
                self.escalation = None;
            }
        }
        Some(outcome)
    }

    /// Rider confirmed they are fine. Returns `false` when no countdown was
    /// running.
    pub fn cancel_escalation(&mut self) -> bool {
        let cancelled = self
            .escalation
            .as_ref()
            .is_some_and(|escalation| escalation.timer.cancel());
        if !cancelled {
            return false;
        }

        self.escalation = None;
        self.crash.clear();
        telemetry::escalation("cancelled");
        info!(trip_id = %self.trip_id, "crash escalation cancelled by rider");

        if self.state == TripState::Paused {
            self.resume_monitoring();
        }
        self.sink.on_escalation_finished(EscalationState::Cancelled);
        true
    }

    /// Latest position fix
    pub fn update_location(&mut self, point: GeoPoint) {
        self.location = Some(point);
    }

    pub fn state(&self) -> TripState {
        self.state
    }

    pub fn trip_id(&self) -> Uuid {
        self.trip_id
    }

    pub fn safety_score(&self) -> u8 {
        self.safety_score
    }

    pub fn events(&self) -> &[SafetyEvent] {
        &self.events
    }

    pub fn location(&self) -> Option<GeoPoint> {
        self.location
    }

    /// Remaining countdown ticks, if a countdown is running
    pub fn countdown(&self) -> Option<u64> {
        self.escalation.as_ref().map(|e| e.timer.remaining_ticks())
    }

    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn record_event(&mut self, event: &DrowsinessEvent) {
        let record = SafetyEvent::record(self.trip_id, event, self.location);

        if event.kind == DrowsinessKind::EyesClosed {
            self.safety_score = self.safety_score.saturating_sub(EYES_CLOSED_PENALTY);
            telemetry::safety_score(self.safety_score);
        }
        telemetry::drowsiness_event(event.kind);

        self.sink.on_event(&record);
        self.events.push(record);
    }

    fn begin_escalation(&mut self, flag: CrashFlag, now_ms: u64) -> Result<(), SessionError> {
        let timer = EscalationTimer::start(&self.config.escalation)?;

        self.crash_flags += 1;
        self.state = TripState::Paused;
        telemetry::crash_flag();
        warn!(
            trip_id = %self.trip_id,
            trigger = ?flag.trigger,
            accel = flag.accel_magnitude,
            gyro = flag.gyro_magnitude,
            "possible crash, trip paused and countdown started"
        );

        self.sink.on_crash(&flag);
        self.sink.on_countdown(timer.remaining_ticks());
        self.escalation = Some(Escalation {
            next_tick_ms: now_ms.saturating_add(timer.tick_ms()),
            timer,
        });
        Ok(())
    }

    fn send_emergency_alert(&mut self) {
        let alert = EmergencyAlert::new(self.location);
        error!(trip_id = %self.trip_id, location = ?alert.location, "crash not cancelled, sending emergency alert");

        self.sink.on_emergency_alert(&alert);
        self.emergency_alerts += 1;
        telemetry::escalation("expired");

        self.escalation = None;
        self.crash.clear();
        self.sink.on_escalation_finished(EscalationState::Expired);
    }

    fn resume_monitoring(&mut self) {
        // Closure timing from before the pause is stale
        self.monitor.reset_state();
        self.state = TripState::Active;
        info!(trip_id = %self.trip_id, "trip resumed");
    }

    fn ensure_running(&self, action: &str) -> Result<(), SessionError> {
        match self.state {
            TripState::Active | TripState::Paused => Ok(()),
            _ => Err(self.invalid(action)),
        }
    }

    fn invalid(&self, action: &str) -> SessionError {
        SessionError::InvalidState(format!("cannot {} a trip that is {:?}", action, self.state))
    }

    fn summary(&self, now_ms: u64) -> TripSummary {
        let count = |kind: DrowsinessKind| self.events.iter().filter(|e| e.kind == kind).count();

        TripSummary {
            trip_id: self.trip_id,
            started_at: self.started_at.unwrap_or_else(Utc::now),
            ended_at: Utc::now(),
            duration_ms: now_ms.saturating_sub(self.started_ms),
            safety_score: self.safety_score,
            eyes_closed_events: count(DrowsinessKind::EyesClosed),
            yawn_events: count(DrowsinessKind::Yawn),
            head_nod_events: count(DrowsinessKind::HeadNod),
            crash_flags: self.crash_flags,
            emergency_alerts: self.emergency_alerts,
            drowsy_locations: self.events.iter().filter_map(|e| e.location).collect(),
            events: self.events.clone(),
        }
    }
}
