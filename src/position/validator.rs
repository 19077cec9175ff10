use serde::Deserialize;
use thiserror::Error;

use super::sample::PositionSample;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("coordinates out of range")]
    OutOfRange,
    #[error("accuracy above threshold")]
    PoorAccuracy,
    #[error("implausible jump from last accepted position")]
    ImplausibleJump,
}

pub type Verdict = Result<(), Rejection>;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_accuracy_threshold")]
    pub accuracy_threshold_m: f64,
    #[serde(default = "default_max_jump")]
    pub max_jump_m: f64,
}

fn default_accuracy_threshold() -> f64 {
    50.0
}

fn default_max_jump() -> f64 {
    1000.0
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            accuracy_threshold_m: default_accuracy_threshold(),
            max_jump_m: default_max_jump(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PositionValidator {
    config: ValidationConfig,
}

impl PositionValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Checks range, then accuracy, then distance from `reference`.
    pub fn validate(
        &self,
        candidate: &PositionSample,
        reference: Option<&PositionSample>,
    ) -> Verdict {
        if !in_range(candidate.latitude, 90.0) || !in_range(candidate.longitude, 180.0) {
            return Err(Rejection::OutOfRange);
        }

        let accuracy = candidate.accuracy;
        if !accuracy.is_finite() || accuracy < 0.0 || accuracy > self.config.accuracy_threshold_m {
            return Err(Rejection::PoorAccuracy);
        }

        if let Some(reference) = reference {
            let distance = haversine_m(
                reference.latitude,
                reference.longitude,
                candidate.latitude,
                candidate.longitude,
            );
            if distance > self.config.max_jump_m {
                return Err(Rejection::ImplausibleJump);
            }
        }

        Ok(())
    }
}

fn in_range(value: f64, bound: f64) -> bool {
    value.is_finite() && (-bound..=bound).contains(&value)
}

/// Great-circle distance in meters.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c * 1000.0
}
