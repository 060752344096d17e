// SPDX-License-Identifier: Apache-2.0

//! Request Builder
//!
//! Turns one input row into a fully parameterized outbound request.
//! Pure: performs no I/O.

use url::Url;

use apifed_core::{ApiRequest, FederationError, FederationResult, Row};

use crate::binding::{InputSource, ResolvedInput};
use crate::template::ApiTemplate;

/// Builds the request for `row`: fixed params first, then every resolved input.
///
/// A variable input that is unbound in the row falls back to the template
/// default; without one the row cannot be sent.
pub fn build_request(
    template: &ApiTemplate,
    inputs: &[ResolvedInput],
    endpoint: &Url,
    row: &Row,
) -> FederationResult<ApiRequest> {
    let mut request = ApiRequest::get(endpoint.clone());
    request.params.reserve(template.fixed_params().len() + inputs.len());
    request.params.extend(template.fixed_params().iter().cloned());

    for input in inputs {
        let value = match &input.source {
            InputSource::Constant(value) => value.as_param(),
            InputSource::Variable(variable) => row.get(variable).and_then(|v| v.as_param()),
            InputSource::Default => None,
        };
        let value = match value {
            Some(value) => value,
            None => template
                .input_default(&input.name)
                .map(str::to_string)
                .ok_or_else(|| unbound(template, input))?,
        };
        request.params.push((input.name.clone(), value));
    }

    Ok(request)
}

fn unbound(template: &ApiTemplate, input: &ResolvedInput) -> FederationError {
    match &input.source {
        InputSource::Variable(variable) => FederationError::invalid_invocation(format!(
            "Parameter {} of {} is bound to {}, which has no value in the input row and no default",
            input.name,
            template.name(),
            variable
        )),
        _ => FederationError::invalid_invocation(format!(
            "Parameter {} of {} has no value",
            input.name,
            template.name()
        )),
    }
}
