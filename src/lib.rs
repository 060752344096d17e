// SPDX-License-Identifier: Apache-2.0

// apifed - template-driven web API federation
// Core library

pub mod binding;
pub mod config;
pub mod executor;
pub mod extract;
pub mod metrics;
pub mod observability;
pub mod request;
pub mod service;
pub mod template;
pub mod transport;

pub use apifed_core::{
    ApiRequest, ApiResponse, ApiTransport, FederationError, FederationResult, InvocationId,
    ParamBinding, Row, ServiceParams, Value, Variable,
};

pub use config::ServiceConfig;
pub use executor::ResultRows;
pub use extract::{PathExtractor, ResponseFormat, ResultItem};
pub use service::{ApiService, ServiceCall};
pub use template::{ApiTemplate, TemplateRegistry};
pub use transport::HttpTransport;

/// Initializes tracing and builds the service from the process environment.
pub fn init_from_env() -> FederationResult<ApiService> {
    observability::init_tracing();
    let config = ServiceConfig::from_env()?;
    ApiService::from_config(&config)
}
