//! Client side of the backend proxy API

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::{ClaimError, Result};

/// Status and JSON body returned by the backend
///
/// Bodies that are not valid JSON are kept as a JSON string.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendReply {
    pub status: u16,
    pub body: Value,
}

impl BackendReply {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Status code embedded by the settlement service under `details.statusCode`
    pub fn embedded_status(&self) -> Option<u16> {
        self.body
            .pointer("/details/statusCode")
            .and_then(Value::as_u64)
            .and_then(|code| u16::try_from(code).ok())
    }

    /// Best human-readable error message carried by the body
    pub fn error_message(&self) -> Option<String> {
        let candidates = [
            self.body.pointer("/details/message"),
            self.body.pointer("/error"),
            self.body.pointer("/details"),
            self.body.pointer("/message"),
        ];

        candidates
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .find(|s| !s.is_empty())
            .map(str::to_string)
    }

    fn from_text(status: u16, text: &str) -> Self {
        let body = serde_json::from_str::<Value>(text)
            .unwrap_or_else(|_| Value::String(text.to_string()));
        Self { status, body }
    }
}

/// Wire body of a consolidation submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonateRequest {
    pub donate_address: String,
    pub user_address: String,
    pub signature: String,
}

/// Backend operations used by the allocation and consolidation components
#[async_trait]
pub trait ClaimBackend: Send + Sync {
    /// `GET /api/statistics?address=`
    async fn statistics(&self, address: &str) -> Result<BackendReply>;

    /// `POST /api/donate`
    async fn donate(&self, request: &DonateRequest) -> Result<BackendReply>;
}

/// [`ClaimBackend`] over HTTP against a running proxy
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a backend client for the proxy at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClaimError::Settings(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ClaimBackend for HttpBackend {
    async fn statistics(&self, address: &str) -> Result<BackendReply> {
        let url = format!("{}/api/statistics", self.base_url);
        debug!("GET {} for {}", url, address);

        let response = self
            .client
            .get(&url)
            .query(&[("address", address)])
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        Ok(BackendReply::from_text(status, &text))
    }

    async fn donate(&self, request: &DonateRequest) -> Result<BackendReply> {
        let url = format!("{}/api/donate", self.base_url);
        debug!(
            "POST {} from {} to {}",
            url, request.user_address, request.donate_address
        );

        let response = self.client.post(&url).json(request).send().await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        Ok(BackendReply::from_text(status, &text))
    }
}
