use std::time::Duration;

use log::debug;
use serde::Serialize;

use super::{DeliveryClient, DeliveryError};
use crate::position::PositionSample;

#[derive(Serialize)]
struct BulkBody<'a> {
    positions: &'a [PositionSample],
}

/// Posts samples to `{base_url}/positions` and `{base_url}/positions/bulk`.
pub struct HttpDeliveryClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpDeliveryClient {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<(), DeliveryError> {
        let payload = serde_json::to_vec(body)?;
        let mut request = self
            .http
            .post(self.endpoint(path))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload);

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!("POST {} -> {}", path, status);

        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }
        Ok(())
    }
}

impl DeliveryClient for HttpDeliveryClient {
    async fn send_one(&self, sample: &PositionSample) -> Result<(), DeliveryError> {
        self.post("/positions", sample).await
    }

    async fn send_batch(&self, samples: &[PositionSample]) -> Result<(), DeliveryError> {
        self.post("/positions/bulk", &BulkBody { positions: samples })
            .await
    }
}
