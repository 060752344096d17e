// SPDX-License-Identifier: Apache-2.0

//! HTTP transport for outbound API calls.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use apifed_core::{ApiRequest, ApiResponse, ApiTransport, FederationError, FederationResult};

use crate::config::ServiceConfig;

pub const DEFAULT_USER_AGENT: &str = concat!("apifed/", env!("CARGO_PKG_VERSION"));

// ─── HTTP ────────────────────────────────────────────────────

/// Sends requests as HTTP GETs and negotiates the response format
pub struct HttpTransport {
    client: Client,
    format: &'static str,
}

impl HttpTransport {
    pub fn new(format: &'static str, timeout: Duration, user_agent: &str) -> FederationResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FederationError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, format })
    }

    pub fn from_config(config: &ServiceConfig) -> FederationResult<Self> {
        Self::new(
            config.format.as_str(),
            Duration::from_millis(config.timeout_ms),
            &config.user_agent,
        )
    }

    /// Request params plus the negotiated `format`, unless the template fixes one.
    fn query_params<'a>(&'a self, request: &'a ApiRequest) -> Vec<(&'a str, &'a str)> {
        let mut params: Vec<(&str, &str)> = request
            .params
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();
        if request.param("format").is_none() {
            params.push(("format", self.format));
        }
        params
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    fn transport_id(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, request: &ApiRequest) -> FederationResult<ApiResponse> {
        let response = self
            .client
            .get(request.target.clone())
            .query(&self.query_params(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FederationError::transport(format!("Request to {} timed out", request.target))
                } else {
                    FederationError::transport(format!("Request to {} failed: {e}", request.target))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), body = %body, "Non-success response");
            return Err(FederationError::http_status(
                status.as_u16(),
                format!("HTTP {} from {}", status, request.target),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FederationError::transport(format!("Failed to read response body: {e}")))?;
        Ok(ApiResponse {
            status: status.as_u16(),
            body,
        })
    }
}
