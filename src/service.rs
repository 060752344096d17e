// SPDX-License-Identifier: Apache-2.0

//! Service facade
//!
//! Entry point for the host engine: looks up a template, resolves the call
//! site once and hands out lazy result rows for each batch of input rows.

use std::sync::Arc;

use tracing::{debug, info, instrument};
use url::Url;

use apifed_core::{
    ApiTransport, FederationError, FederationResult, InvocationId, ParamBinding, Row,
    ServiceParams, Variable,
};

use crate::binding::{resolve_inputs, resolve_outputs};
use crate::config::ServiceConfig;
use crate::executor::{CallPlan, ResultRows};
use crate::extract::PathExtractor;
use crate::template::{ApiTemplate, TemplateRegistry};
use crate::transport::HttpTransport;

/// Reserved call-site parameter naming the template to invoke
pub const API_PARAM: &str = "api";

/// Federation service bound to one external API endpoint
pub struct ApiService {
    registry: Arc<TemplateRegistry>,
    transport: Arc<dyn ApiTransport>,
    extractor: Arc<dyn PathExtractor>,
    endpoint: Url,
}

impl ApiService {
    pub fn new(
        registry: Arc<TemplateRegistry>,
        transport: Arc<dyn ApiTransport>,
        extractor: Arc<dyn PathExtractor>,
        endpoint: Url,
    ) -> Self {
        Self {
            registry,
            transport,
            extractor,
            endpoint,
        }
    }

    /// Loads the template document and builds the HTTP transport.
    ///
    /// Any failure is returned as is; no partially configured service is built.
    pub fn from_config(config: &ServiceConfig) -> FederationResult<Self> {
        let registry = TemplateRegistry::load(&config.templates_path)?;
        let transport = HttpTransport::from_config(config)?;
        info!(
            endpoint = %config.endpoint,
            format = config.format.as_str(),
            templates = registry.len(),
            "API service configured"
        );
        Ok(Self::new(
            Arc::new(registry),
            Arc::new(transport),
            config.format.extractor(),
            config.endpoint.clone(),
        ))
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Binds `template_name` against the call-site parameters.
    ///
    /// Resolution errors surface here, before any external call.
    #[instrument(skip(self, params), fields(invocation = tracing::field::Empty))]
    pub fn create(
        &self,
        template_name: &str,
        params: &ServiceParams,
    ) -> FederationResult<ServiceCall> {
        let template = self.registry.get(template_name)?;
        self.bind(template, params)
    }

    /// Like [`ApiService::create`], taking the template name from the
    /// reserved `api` parameter. That parameter is not passed on.
    pub fn create_from_params(&self, mut params: ServiceParams) -> FederationResult<ServiceCall> {
        let name = match params.remove(API_PARAM) {
            None => {
                return Err(FederationError::invalid_invocation(format!(
                    "Parameter {API_PARAM} must be bound to the name of an API template"
                )))
            }
            Some(ParamBinding::Constant(value)) => value.as_param().ok_or_else(|| {
                FederationError::invalid_invocation(format!("Parameter {API_PARAM} is null"))
            })?,
            Some(other) => {
                return Err(FederationError::invalid_invocation(format!(
                    "Parameter {API_PARAM} must be a constant, got {}",
                    other.kind()
                )))
            }
        };
        self.create(&name, &params)
    }

    fn bind(
        &self,
        template: Arc<ApiTemplate>,
        params: &ServiceParams,
    ) -> FederationResult<ServiceCall> {
        let inputs = resolve_inputs(&template, params)?;
        let outputs = resolve_outputs(&template, params)?;

        let id = InvocationId::new();
        tracing::Span::current().record("invocation", tracing::field::display(id));
        debug!(
            template = template.name(),
            inputs = inputs.len(),
            outputs = outputs.len(),
            "Invocation resolved"
        );

        Ok(ServiceCall {
            plan: Arc::new(CallPlan {
                id,
                template,
                inputs: inputs.into(),
                outputs: outputs.into(),
                endpoint: self.endpoint.clone(),
            }),
            transport: Arc::clone(&self.transport),
            extractor: Arc::clone(&self.extractor),
        })
    }
}

impl std::fmt::Debug for ApiService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiService")
            .field("templates", &self.registry.names())
            .field("transport", &self.transport.transport_id())
            .field("format", &self.extractor.format())
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

/// A resolved invocation, ready to run against batches of input rows
#[derive(Clone)]
pub struct ServiceCall {
    plan: Arc<CallPlan>,
    transport: Arc<dyn ApiTransport>,
    extractor: Arc<dyn PathExtractor>,
}

impl ServiceCall {
    pub fn id(&self) -> InvocationId {
        self.plan.id
    }

    pub fn template(&self) -> &ApiTemplate {
        &self.plan.template
    }

    /// Variables the emitted rows may bind, for plan-time registration
    pub fn output_variables(&self) -> Vec<Variable> {
        self.plan.output_variables()
    }

    /// Returns the lazy output rows for `rows`. No call is made until the
    /// result is pulled.
    pub fn call(&self, rows: Vec<Row>) -> ResultRows {
        debug!(invocation = %self.plan.id, rows = rows.len(), "Starting result rows");
        ResultRows::new(
            Arc::clone(&self.plan),
            rows,
            Arc::clone(&self.transport),
            Arc::clone(&self.extractor),
        )
    }
}

impl std::fmt::Debug for ServiceCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCall")
            .field("plan", &self.plan)
            .field("transport", &self.transport.transport_id())
            .field("format", &self.extractor.format())
            .finish()
    }
}
