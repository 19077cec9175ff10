use thiserror::Error;

use crate::capture::CaptureError;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("vehicle id must not be empty")]
    EmptyVehicleId,
    #[error("foreground capture subscription failed: {0}")]
    Subscription(#[from] CaptureError),
}
