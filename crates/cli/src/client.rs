//! API client for communicating with the detector service

use anyhow::{Context, Result};
use detector_lib::{BatchResult, HealthResponse};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the detector service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

/// Error body returned by the detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Submit a request body to `/v1/detect`
    pub async fn detect<B: Serialize>(&self, body: &B) -> Result<BatchResult> {
        let url = self.base_url.join("v1/detect").context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response, &[]).await
    }

    /// Fetch `/healthz`; an unhealthy detector still reports its components
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = self.base_url.join("healthz").context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response, &[StatusCode::SERVICE_UNAVAILABLE]).await
    }

    async fn parse<T: DeserializeOwned>(response: Response, also_ok: &[StatusCode]) -> Result<T> {
        let status = response.status();
        if !status.is_success() && !also_ok.contains(&status) {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }
}
