//! HTTP client for the remote settlement service

use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::ProxyError;

/// Raw status and body returned by the settlement service
#[derive(Debug, Clone)]
pub struct RemoteReply {
    pub status: StatusCode,
    pub text: String,
}

/// Client for the settlement service's statistics and donation endpoints
#[derive(Clone)]
pub struct SettlementClient {
    client: Client,
    base_url: Url,
}

impl SettlementClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProxyError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ProxyError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ProxyError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL with percent-encoded path segments appended
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ProxyError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProxyError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `GET /statistics/{address}`
    pub async fn statistics(&self, address: &str) -> Result<RemoteReply, ProxyError> {
        let url = self.endpoint(&["statistics", address])?;
        debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;
        Ok(RemoteReply { status, text })
    }

    /// `POST /donate_to/{donate_address}/{user_address}/{signature}` with an empty JSON body
    pub async fn donate_to(
        &self,
        donate_address: &str,
        user_address: &str,
        signature: &str,
    ) -> Result<RemoteReply, ProxyError> {
        let url = self.endpoint(&["donate_to", donate_address, user_address, signature])?;
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        Ok(RemoteReply { status, text })
    }
}
