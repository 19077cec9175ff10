mod controller;
mod error;
mod session;
mod worker;

pub use controller::{TrackerConfig, TrackingController, LAST_POSITION_KEY};
pub use error::TrackerError;
pub use session::{SessionStats, TrackerState, TrackingSession};

pub(crate) use session::SharedSession;
#[cfg(test)]
pub(crate) use session::new_shared;
