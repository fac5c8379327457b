//! 2D landmark geometry helpers

use serde::{Deserialize, Serialize};

/// A landmark point in image space (pixels)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// Centroid of a set of points. An empty set averages to the origin.
pub fn average_point(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::default();
    }

    let n = points.len() as f32;
    let (sx, sy) = points
        .iter()
        .fold((0.0f32, 0.0f32), |(sx, sy), p| (sx + p.x, sy + p.y));

    Point::new(sx / n, sy / n)
}

/// Left-most and right-most points by x. Ties go to the earliest point.
pub fn horizontal_extrema(points: &[Point]) -> Option<(Point, Point)> {
    let left = points.iter().reduce(|a, b| if b.x < a.x { b } else { a })?;
    let right = points.iter().reduce(|a, b| if b.x > a.x { b } else { a })?;
    Some((*left, *right))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
        assert!((b.distance(&a) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_average_point() {
        let pts = [Point::new(0.0, 0.0), Point::new(2.0, 4.0), Point::new(4.0, 2.0)];
        let avg = average_point(&pts);
        assert!((avg.x - 2.0).abs() < 1e-6);
        assert!((avg.y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_average_of_empty_is_origin() {
        assert_eq!(average_point(&[]), Point::default());
    }

    #[test]
    fn test_horizontal_extrema() {
        let pts = [Point::new(5.0, 1.0), Point::new(-1.0, 3.0), Point::new(9.0, 0.0)];
        let (left, right) = horizontal_extrema(&pts).unwrap();
        assert_eq!(left, Point::new(-1.0, 3.0));
        assert_eq!(right, Point::new(9.0, 0.0));
        assert!(horizontal_extrema(&[]).is_none());
    }

    #[test]
    fn test_horizontal_extrema_ties_keep_first() {
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(40.0, 0.0),
            Point::new(0.0, 24.0),
            Point::new(40.0, 24.0),
        ];
        let (left, right) = horizontal_extrema(&pts).unwrap();
        assert_eq!(left, Point::new(0.0, 0.0));
        assert_eq!(right, Point::new(40.0, 0.0));

        // A vertical column has no width
        let column = [Point::new(5.0, 0.0), Point::new(5.0, 3.0)];
        let (left, right) = horizontal_extrema(&column).unwrap();
        assert_eq!(left.distance(&right), 0.0);
    }
}
