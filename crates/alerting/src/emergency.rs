//! Emergency alert payload and delivery seam

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// WGS84 position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Map link for the position
    pub fn maps_url(&self) -> String {
        format!(
            "https://www.google.com/maps?q={},{}&z=18",
            self.latitude, self.longitude
        )
    }
}

/// Location attached to an alert
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AlertLocation {
    Known(GeoPoint),
    Unavailable,
}

impl From<Option<GeoPoint>> for AlertLocation {
    fn from(point: Option<GeoPoint>) -> Self {
        point.map_or(Self::Unavailable, Self::Known)
    }
}

/// The irrevocable "send emergency alert" signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyAlert {
    pub location: AlertLocation,
    pub issued_at: DateTime<Utc>,
}

impl EmergencyAlert {
    pub fn new(location: impl Into<AlertLocation>) -> Self {
        Self {
            location: location.into(),
            issued_at: Utc::now(),
        }
    }

    /// Text body for SMS / notification delivery
    pub fn message(&self) -> String {
        match &self.location {
            AlertLocation::Known(point) => {
                format!("EMERGENCY! Crash detected. My location: {}", point.maps_url())
            }
            AlertLocation::Unavailable => {
                "EMERGENCY! Crash detected. Location not available. Please call me.".to_string()
            }
        }
    }
}

/// Delivers emergency alerts (SMS, push, ...)
pub trait AlertDispatcher: Send + Sync {
    fn dispatch(&self, alert: &EmergencyAlert);
}

/// Best-effort last known location
pub trait LocationSource: Send + Sync {
    fn last_known(&self) -> Option<GeoPoint>;
}

impl<F> LocationSource for F
where
    F: Fn() -> Option<GeoPoint> + Send + Sync,
{
    fn last_known(&self) -> Option<GeoPoint> {
        self()
    }
}
