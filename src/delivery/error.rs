use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("collector responded with status {0}")]
    Status(u16),
    #[error("send timed out after {0:?}")]
    Timeout(Duration),
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return DeliveryError::Transport(format!("request timed out: {}", err));
        }
        DeliveryError::Transport(err.to_string())
    }
}
