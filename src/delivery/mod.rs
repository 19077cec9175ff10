//! Transport towards the remote collector.
//!
//! [`DeliveryClient`] is the seam between the agent and the network. [`HttpDeliveryClient`]
//! talks to the collector's JSON API; tests substitute their own implementations.

mod error;
mod http;

use std::future::Future;
use std::time::Duration;

pub use error::DeliveryError;
pub use http::HttpDeliveryClient;

use crate::position::PositionSample;

pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(15);

pub trait DeliveryClient: Send + Sync + 'static {
    fn send_one(
        &self,
        sample: &PositionSample,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;

    fn send_batch(
        &self,
        samples: &[PositionSample],
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// Runs a send, turning an overrun of `limit` into [`DeliveryError::Timeout`].
pub async fn bounded<F>(limit: Duration, send: F) -> Result<(), DeliveryError>
where
    F: Future<Output = Result<(), DeliveryError>>,
{
    match tokio::time::timeout(limit, send).await {
        Ok(result) => result,
        Err(_) => Err(DeliveryError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_bounded_times_out() {
        let result = bounded(Duration::from_secs(10), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(DeliveryError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_bounded_passes_through() {
        let ok = bounded(Duration::from_secs(1), async { Ok(()) }).await;
        assert!(ok.is_ok());

        let err = bounded(Duration::from_secs(1), async {
            Err(DeliveryError::Status(503))
        })
        .await;
        assert!(matches!(err, Err(DeliveryError::Status(503))));
    }
}
