//! Driver Monitoring System (DMS)
//!
//! Drowsiness inference from per-frame facial measurements:
//! - Eye closure (contour aspect ratio or classifier probabilities)
//! - Yawning (mouth opening ratio)
//! - Head nod / tilt (pitch and roll limits)
//!
//! Eye closure is debounced into one event per closure episode (or per
//! cooldown window). Yawn and head-nod events are reported on every frame
//! where the condition holds.

pub mod analysis;
pub mod config;
pub mod eye;
pub mod geometry;
pub mod observation;
pub mod pose;
pub mod state;
pub mod yawn;

pub use analysis::{DrowsinessEvent, DrowsinessKind, EventMetric, FrameAnalysis, FrameStatus};
pub use config::{ClosurePolicy, DmsConfig};
pub use eye::{EyeClosureEstimator, EyeReading, EyeSignalSource};
pub use geometry::Point;
pub use observation::{EyeOpenProbability, FacialObservation, HeadPose};
pub use pose::{HeadNod, HeadPoseEvaluator};
pub use state::DrowsinessState;

use thiserror::Error;
use tracing::{debug, info};

/// DMS error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DmsError {
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Drowsiness state machine for one monitoring session
pub struct DrowsinessMonitor {
    config: DmsConfig,
    eye_estimator: EyeClosureEstimator,
    pose_evaluator: HeadPoseEvaluator,
    state: DrowsinessState,
}

impl DrowsinessMonitor {
    /// Create a new monitor; the configuration is validated eagerly
    pub fn new(config: DmsConfig) -> Result<Self, DmsError> {
        config.validate()?;
        Ok(Self {
            eye_estimator: EyeClosureEstimator::new(&config),
            pose_evaluator: HeadPoseEvaluator::new(&config),
            state: DrowsinessState::default(),
            config,
        })
    }

    /// Evaluate a frame, or a frame without a face when `observation` is `None`
    pub fn process(&mut self, observation: Option<&FacialObservation>, now_ms: u64) -> FrameAnalysis {
        match observation {
            Some(obs) => self.evaluate(obs, now_ms),
            None => self.no_face(now_ms),
        }
    }

    /// Frame without a detectable face. Closure state is left as it was so a
    /// brief detector dropout neither restarts nor completes an episode.
    pub fn no_face(&mut self, now_ms: u64) -> FrameAnalysis {
        debug!(now_ms, closed_since = ?self.state.eyes_closed_since, "no face detected");
        FrameAnalysis::no_face()
    }

    /// Evaluate one frame with a face
    pub fn evaluate(&mut self, observation: &FacialObservation, now_ms: u64) -> FrameAnalysis {
        let mut events = Vec::new();

        // Eye closure
        let eye = self.eye_estimator.estimate(observation);
        match eye {
            Some(reading) if reading.closed => {
                let since = *self.state.eyes_closed_since.get_or_insert(now_ms);
                let closed_for = now_ms.saturating_sub(since);

                if closed_for >= self.config.closed_time_threshold_ms && self.closure_may_fire(now_ms) {
                    self.state.is_alerting = true;
                    self.state.last_closure_event = Some(now_ms);
                    events.push(DrowsinessEvent {
                        kind: DrowsinessKind::EyesClosed,
                        description: describe_closure(closed_for, &reading),
                        metric: EventMetric::ClosedDuration { ms: closed_for },
                        timestamp_ms: now_ms,
                    });
                }
            }
            Some(_) => self.state.mark_open(),
            None => debug!(now_ms, "no eye measurement, closure state unchanged"),
        }

        // Yawn
        let mouth_ratio = yawn::mouth_ratio(&observation.upper_lip_top, &observation.lower_lip_bottom);
        let yawning = yawn::is_yawn(mouth_ratio, self.config.yawn_ratio_threshold);
        if yawning {
            events.push(DrowsinessEvent {
                kind: DrowsinessKind::Yawn,
                description: format!("Yawn detected (ratio={:.2})", mouth_ratio),
                metric: EventMetric::MouthRatio { ratio: mouth_ratio },
                timestamp_ms: now_ms,
            });
        }

        // Head nod / tilt
        let nod = self.pose_evaluator.evaluate(&observation.head_pose);
        if let Some(nod) = nod {
            events.push(DrowsinessEvent {
                kind: DrowsinessKind::HeadNod,
                description: format!(
                    "Head nod/tilt detected (X={:.1}°, Z={:.1}°)",
                    nod.pitch, nod.roll
                ),
                metric: EventMetric::HeadAngles { pitch: nod.pitch, roll: nod.roll },
                timestamp_ms: now_ms,
            });
        }

        for event in &events {
            info!(kind = event.kind.as_str(), timestamp_ms = event.timestamp_ms, "{}", event.description);
        }

        let status = if self.state.is_alerting || yawning || nod.is_some() {
            FrameStatus::Drowsy
        } else {
            FrameStatus::Normal
        };

        debug!(
            eye = ?eye.map(|r| r.value),
            mouth_ratio,
            pitch = observation.head_pose.pitch,
            roll = observation.head_pose.roll,
            ?status,
            "frame evaluated"
        );

        FrameAnalysis {
            status,
            eye,
            mouth_ratio,
            head_pose: Some(observation.head_pose),
            closed_for_ms: self.state.closed_for(now_ms),
            events,
        }
    }

    fn closure_may_fire(&self, now_ms: u64) -> bool {
        match self.config.closure_policy {
            ClosurePolicy::UntilReopened => !self.state.is_alerting,
            ClosurePolicy::FixedCooldown { cooldown_ms } => self
                .state
                .last_closure_event
                .map_or(true, |last| now_ms.saturating_sub(last) >= cooldown_ms),
        }
    }

    /// Current drowsiness state
    pub fn state(&self) -> &DrowsinessState {
        &self.state
    }

    pub fn config(&self) -> &DmsConfig {
        &self.config
    }

    /// Reset drowsiness state (on session start)
    pub fn reset_state(&mut self) {
        self.state.reset();
    }
}

fn describe_closure(closed_for: u64, reading: &EyeReading) -> String {
    match reading.source {
        EyeSignalSource::AspectRatio => {
            format!("Eyes closed for {}ms (EAR={:.2})", closed_for, reading.value)
        }
        EyeSignalSource::Probability => {
            format!("Eyes closed for {}ms (open p={:.2})", closed_for, reading.value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed() -> FacialObservation {
        FacialObservation::from_probabilities(0.1, 0.1, HeadPose::default())
    }

    fn open() -> FacialObservation {
        FacialObservation::from_probabilities(0.9, 0.9, HeadPose::default())
    }

    fn closure_events(analysis: &FrameAnalysis) -> usize {
        analysis
            .events
            .iter()
            .filter(|e| e.kind == DrowsinessKind::EyesClosed)
            .count()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DmsConfig {
            yawn_ratio_threshold: -1.0,
            ..Default::default()
        };
        assert!(DrowsinessMonitor::new(config).is_err());
    }

    #[test]
    fn test_single_event_at_threshold() {
        let mut monitor = DrowsinessMonitor::new(DmsConfig::default()).unwrap();
        let mut emitted = Vec::new();

        for t in (0..=3000).step_by(100) {
            let analysis = monitor.evaluate(&closed(), t);
            if closure_events(&analysis) > 0 {
                emitted.push(t);
            }
        }

        assert_eq!(emitted, vec![1500]);
        assert!(monitor.state().is_alerting);
    }

    #[test]
    fn test_no_event_before_threshold() {
        let mut monitor = DrowsinessMonitor::new(DmsConfig::default()).unwrap();
        monitor.evaluate(&closed(), 0);
        let analysis = monitor.evaluate(&closed(), 1499);
        assert_eq!(closure_events(&analysis), 0);
        assert_eq!(analysis.closed_for_ms, Some(1499));
        assert_eq!(analysis.status, FrameStatus::Normal);
    }

    #[test]
    fn test_reopen_rearms() {
        let mut monitor = DrowsinessMonitor::new(DmsConfig::default()).unwrap();
        monitor.evaluate(&closed(), 0);
        assert_eq!(closure_events(&monitor.evaluate(&closed(), 1600)), 1);

        let analysis = monitor.evaluate(&open(), 1700);
        assert!(analysis.events.is_empty());
        assert!(!monitor.state().is_alerting);
        assert_eq!(monitor.state().eyes_closed_since, None);

        monitor.evaluate(&closed(), 2000);
        assert_eq!(closure_events(&monitor.evaluate(&closed(), 3400)), 0);
        assert_eq!(closure_events(&monitor.evaluate(&closed(), 3500)), 1);
    }

    #[test]
    fn test_no_face_keeps_closure_running() {
        let mut monitor = DrowsinessMonitor::new(DmsConfig::default()).unwrap();
        monitor.evaluate(&closed(), 0);

        let analysis = monitor.process(None, 800);
        assert_eq!(analysis.status, FrameStatus::NoFace);
        assert_eq!(monitor.state().eyes_closed_since, Some(0));

        assert_eq!(closure_events(&monitor.evaluate(&closed(), 1500)), 1);
    }

    #[test]
    fn test_no_measurement_keeps_state() {
        let mut monitor = DrowsinessMonitor::new(DmsConfig::default()).unwrap();
        monitor.evaluate(&closed(), 0);

        let analysis = monitor.evaluate(&FacialObservation::default(), 700);
        assert!(analysis.eye.is_none());
        assert_eq!(monitor.state().eyes_closed_since, Some(0));
    }

    #[test]
    fn test_no_measurement_never_starts_closure() {
        let mut monitor = DrowsinessMonitor::new(DmsConfig::default()).unwrap();
        for t in (0..5000).step_by(100) {
            let analysis = monitor.evaluate(&FacialObservation::default(), t);
            assert!(analysis.events.is_empty());
        }
        assert_eq!(monitor.state().eyes_closed_since, None);
    }

    #[test]
    fn test_fixed_cooldown_reemits_during_long_closure() {
        let config = DmsConfig::default().with_cooldown(30_000);
        let mut monitor = DrowsinessMonitor::new(config).unwrap();
        let mut emitted = Vec::new();

        for t in (0..=65_000).step_by(500) {
            if closure_events(&monitor.evaluate(&closed(), t)) > 0 {
                emitted.push(t);
            }
        }

        assert_eq!(emitted, vec![1500, 31_500, 61_500]);
    }

    #[test]
    fn test_fixed_cooldown_suppresses_new_episode() {
        let config = DmsConfig::default().with_cooldown(30_000);
        let mut monitor = DrowsinessMonitor::new(config).unwrap();

        monitor.evaluate(&closed(), 0);
        assert_eq!(closure_events(&monitor.evaluate(&closed(), 1500)), 1);
        monitor.evaluate(&open(), 2000);

        monitor.evaluate(&closed(), 3000);
        assert_eq!(closure_events(&monitor.evaluate(&closed(), 5000)), 0);
        assert!(!monitor.state().is_alerting);
    }

    #[test]
    fn test_yawn_every_frame() {
        let mut monitor = DrowsinessMonitor::new(DmsConfig::default()).unwrap();
        let mut obs = open();
        obs.upper_lip_top = vec![Point::new(0.0, 0.0), Point::new(40.0, 0.0)];
        obs.lower_lip_bottom = vec![Point::new(0.0, 24.0), Point::new(40.0, 24.0)];

        for t in 0..3 {
            let analysis = monitor.evaluate(&obs, t * 33);
            assert_eq!(analysis.events.len(), 1);
            assert_eq!(analysis.events[0].kind, DrowsinessKind::Yawn);
            assert_eq!(analysis.status, FrameStatus::Drowsy);
        }
    }

    #[test]
    fn test_collapsed_landmarks_are_not_measured() {
        let mut monitor = DrowsinessMonitor::new(DmsConfig::default()).unwrap();
        monitor.evaluate(&closed(), 0);

        let column: Vec<Point> = (0..6).map(|i| Point::new(5.0, i as f32)).collect();
        let obs = FacialObservation {
            left_eye: column.clone(),
            right_eye: column,
            upper_lip_top: vec![Point::new(10.0, 0.0)],
            lower_lip_bottom: vec![Point::new(10.0, 30.0)],
            ..Default::default()
        };
        let analysis = monitor.evaluate(&obs, 700);

        assert!(analysis.eye.is_none());
        assert!(analysis.events.is_empty());
        assert_eq!(monitor.state().eyes_closed_since, Some(0));
        assert_eq!(closure_events(&monitor.evaluate(&closed(), 1500)), 1);
    }

    #[test]
    fn test_head_nod_event() {
        let mut monitor = DrowsinessMonitor::new(DmsConfig::default()).unwrap();
        let obs = FacialObservation::from_probabilities(
            0.9,
            0.9,
            HeadPose { pitch: 22.0, yaw: 0.0, roll: 3.0 },
        );

        let analysis = monitor.evaluate(&obs, 0);
        assert_eq!(analysis.events.len(), 1);
        let event = &analysis.events[0];
        assert_eq!(event.kind, DrowsinessKind::HeadNod);
        assert_eq!(event.metric, EventMetric::HeadAngles { pitch: 22.0, roll: 3.0 });
        assert_eq!(event.description, "Head nod/tilt detected (X=22.0°, Z=3.0°)");
    }

    #[test]
    fn test_normal_frame() {
        let mut monitor = DrowsinessMonitor::new(DmsConfig::default()).unwrap();
        let analysis = monitor.evaluate(&open(), 0);
        assert_eq!(analysis.status, FrameStatus::Normal);
        assert!(!analysis.has_events());
    }

    #[test]
    fn test_reset_state() {
        let mut monitor = DrowsinessMonitor::new(DmsConfig::default()).unwrap();
        monitor.evaluate(&closed(), 0);
        monitor.evaluate(&closed(), 2000);
        monitor.reset_state();
        assert_eq!(monitor.state(), &DrowsinessState::default());
    }
}
