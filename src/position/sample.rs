use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const MS_TO_KMH: f64 = 3.6;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(transparent)]
pub struct VehicleId(String);

impl VehicleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VehicleId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A raw reading as handed over by a capture source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RawFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Ground speed in m/s.
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    /// Horizontal accuracy radius in meters.
    #[serde(default)]
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl RawFix {
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            speed: None,
            heading: None,
            accuracy: None,
            timestamp,
        }
    }
}

/// A normalized fix bound to a vehicle. This is also the collector wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PositionSample {
    #[serde(rename = "bus_id")]
    pub vehicle_id: VehicleId,
    pub latitude: f64,
    pub longitude: f64,
    /// km/h
    pub speed: f64,
    pub heading: f64,
    pub accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

impl PositionSample {
    pub fn from_fix(vehicle_id: VehicleId, fix: &RawFix) -> Self {
        let speed = fix
            .speed
            .filter(|s| s.is_finite())
            .map(|s| (s * MS_TO_KMH).max(0.0))
            .unwrap_or(0.0);
        let heading = fix
            .heading
            .filter(|h| h.is_finite())
            .map(wrap_heading)
            .unwrap_or(0.0);

        Self {
            vehicle_id,
            latitude: fix.latitude,
            longitude: fix.longitude,
            speed,
            heading,
            accuracy: fix.accuracy.unwrap_or(0.0),
            timestamp: fix.timestamp,
        }
    }
}

/// Wraps into [0, 360). `rem_euclid` rounds tiny negatives up to 360 itself.
fn wrap_heading(heading: f64) -> f64 {
    let wrapped = heading.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
