mod sample;
mod validator;

pub use sample::{PositionSample, RawFix, VehicleId};
pub use validator::{haversine_m, PositionValidator, Rejection, ValidationConfig, Verdict};
