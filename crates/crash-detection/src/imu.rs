//! Inertial sensor values

use serde::{Deserialize, Serialize};

/// 3-axis vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean norm
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

impl From<[f32; 3]> for Vector3 {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

/// One sensor callback: either axis group, updated independently
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "sensor", content = "value", rename_all = "snake_case")]
pub enum InertialSample {
    /// Acceleration (m/s²)
    Accelerometer(Vector3),
    /// Angular velocity (rad/s)
    Gyroscope(Vector3),
}

/// Latest accelerometer and gyroscope values.
///
/// The two cells are updated by separate sensor callbacks and read
/// together at evaluation time; they are not a synchronized pair.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImuLatch {
    /// Acceleration (m/s²)
    pub accel: Vector3,
    /// Angular velocity (rad/s)
    pub gyro: Vector3,
}

impl ImuLatch {
    /// Replace the cell the sample belongs to
    pub fn apply(&mut self, sample: InertialSample) {
        match sample {
            InertialSample::Accelerometer(v) => self.accel = v,
            InertialSample::Gyroscope(v) => self.gyro = v,
        }
    }

    pub fn accel_magnitude(&self) -> f32 {
        self.accel.magnitude()
    }

    pub fn gyro_magnitude(&self) -> f32 {
        self.gyro.magnitude()
    }
}
