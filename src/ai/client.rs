use super::types::ModelCallPayload;
use super::ModelService;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const RESPONSES_PATH: &str = "/v1/responses";

/// HTTP client for the hosted responses endpoint.
///
/// One instance is shared by every request; the underlying connection pool
/// is reused across calls.
pub struct ResponsesClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ResponsesClient {
    pub fn new(timeout: Duration) -> Self {
        Self::new_with_client(Client::new(), timeout)
    }

    pub fn new_with_client(client: Client, timeout: Duration) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            tracing::error!("Model API call exceeded {:?}", self.timeout);
            Error::UpstreamTimeout(self.timeout.as_millis() as u64)
        } else {
            tracing::error!("Failed to reach model API: {}", e);
            Error::Http(e)
        }
    }
}

#[async_trait]
impl ModelService for ResponsesClient {
    async fn create_response(&self, api_key: &str, payload: &ModelCallPayload) -> Result<Value> {
        let url = format!("{}{}", self.base_url, RESPONSES_PATH);
        tracing::debug!(
            model = %payload.model,
            images = payload.image_count(),
            "Sending request to model API"
        );

        // The timeout spans connect, headers and the full body read.
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            tracing::error!("Model API error (status {}): {}", status, body);
            return Err(Error::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse model API response: {}\nBody: {}", e, body);
            Error::UpstreamParse(e.to_string())
        })
    }
}
