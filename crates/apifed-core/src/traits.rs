// SPDX-License-Identifier: Apache-2.0

//! ApiTransport trait definition
//!
//! The seam between the federation engine and whatever actually talks to the
//! external API. The engine only ever sees requests and response bodies.

use async_trait::async_trait;

use crate::error::FederationResult;
use crate::types::{ApiRequest, ApiResponse};

/// Dispatches outbound API calls
///
/// Implementations own connection handling, format negotiation and timeouts.
/// Non-success statuses must be reported as `FederationError::Transport`.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Returns the unique identifier for this transport (e.g., "http", "mock")
    fn transport_id(&self) -> &'static str;

    /// Performs one call and returns its successful response
    async fn fetch(&self, request: &ApiRequest) -> FederationResult<ApiResponse>;
}
