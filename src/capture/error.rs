use thiserror::Error;

use super::CaptureMode;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("{0} capture is unavailable")]
    Unavailable(CaptureMode),
    #[error("no live {0} subscription")]
    NotSubscribed(CaptureMode),
    #[error("{0} subscriber is not keeping up, fix dropped")]
    Overloaded(CaptureMode),
}
