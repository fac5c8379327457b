//! Mouth-opening ratio for yawn detection

use crate::geometry::{average_point, horizontal_extrema, Point};

/// Mouth height over mouth width.
///
/// Height runs between the centroids of the upper-lip-top and
/// lower-lip-bottom contours; width spans the horizontal extrema of both
/// contours together. Missing contours or a zero width give 0.0 (no yawn).
pub fn mouth_ratio(upper_lip_top: &[Point], lower_lip_bottom: &[Point]) -> f32 {
    if upper_lip_top.is_empty() || lower_lip_bottom.is_empty() {
        return 0.0;
    }

    let combined: Vec<Point> = upper_lip_top.iter().chain(lower_lip_bottom).copied().collect();
    let Some((left, right)) = horizontal_extrema(&combined) else {
        return 0.0;
    };

    let width = left.distance(&right);
    if !(width > 0.0) {
        return 0.0;
    }

    let height = average_point(upper_lip_top).distance(&average_point(lower_lip_bottom));
    let ratio = height / width;
    if ratio.is_finite() { ratio } else { 0.0 }
}

/// Whether a mouth ratio counts as a yawn
pub fn is_yawn(ratio: f32, threshold: f32) -> bool {
    ratio > threshold
}
