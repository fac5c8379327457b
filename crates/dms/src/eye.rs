//! Eye-closure estimation from contours or classifier probabilities

use serde::{Deserialize, Serialize};
use tracing::trace;
use crate::geometry::{average_point, horizontal_extrema, Point};
use crate::observation::FacialObservation;
use crate::DmsConfig;

/// Minimum contour length for an aspect-ratio measurement
pub const MIN_EYE_CONTOUR_POINTS: usize = 4;

/// Where an eye reading came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EyeSignalSource {
    /// Mean of the detector's eye-open probabilities
    Probability,
    /// Eye aspect ratio from contour landmarks
    AspectRatio,
}

/// Eye openness for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeReading {
    /// Left eye value (probability or EAR), if measurable
    pub left: Option<f32>,
    /// Right eye value (probability or EAR), if measurable
    pub right: Option<f32>,
    /// Combined openness value compared against the threshold
    pub value: f32,
    /// Whether the eyes count as closed this frame
    pub closed: bool,
    pub source: EyeSignalSource,
}

/// Eye aspect ratio of a single contour.
///
/// Width is the distance between the horizontal extrema. Height is the
/// distance between the mean of the top third and the mean of the bottom
/// third of the points ordered by y. Returns `None` for contours shorter
/// than [`MIN_EYE_CONTOUR_POINTS`] or with zero width.
pub fn eye_aspect_ratio(contour: &[Point]) -> Option<f32> {
    if contour.len() < MIN_EYE_CONTOUR_POINTS {
        return None;
    }

    let (left, right) = horizontal_extrema(contour)?;
    let horizontal = left.distance(&right);
    if !(horizontal > 0.0) {
        return None;
    }

    let mut by_y = contour.to_vec();
    by_y.sort_by(|a, b| a.y.total_cmp(&b.y));
    let third = contour.len() / 3;
    let top = average_point(&by_y[..third]);
    let bottom = average_point(&by_y[by_y.len() - third..]);

    let ratio = top.distance(&bottom) / horizontal;
    ratio.is_finite().then_some(ratio)
}

/// Average both eyes when available, otherwise whichever one measured
pub fn combine(left: Option<f32>, right: Option<f32>) -> Option<f32> {
    match (left, right) {
        (Some(l), Some(r)) => Some((l + r) / 2.0),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    }
}

/// Eye-closure estimator
#[derive(Debug, Clone)]
pub struct EyeClosureEstimator {
    ear_threshold: f32,
    prob_threshold: f32,
}

impl EyeClosureEstimator {
    pub fn new(config: &DmsConfig) -> Self {
        Self {
            ear_threshold: config.ear_threshold,
            prob_threshold: config.eye_closed_prob_threshold,
        }
    }

    /// Estimate eye state. `None` means no measurement was possible.
    pub fn estimate(&self, observation: &FacialObservation) -> Option<EyeReading> {
        if let Some(prob) = observation.eye_open_probability.filter(|p| p.is_valid()) {
            return Some(EyeReading {
                left: Some(prob.left),
                right: Some(prob.right),
                value: (prob.left + prob.right) / 2.0,
                closed: prob.left < self.prob_threshold && prob.right < self.prob_threshold,
                source: EyeSignalSource::Probability,
            });
        }

        let left = eye_aspect_ratio(&observation.left_eye);
        let right = eye_aspect_ratio(&observation.right_eye);
        trace!(?left, ?right, "eye aspect ratios");

        let value = combine(left, right)?;
        Some(EyeReading {
            left,
            right,
            value,
            closed: value < self.ear_threshold,
            source: EyeSignalSource::AspectRatio,
        })
    }
}
