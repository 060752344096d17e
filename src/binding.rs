// SPDX-License-Identifier: Apache-2.0

//! Binding Resolver
//!
//! Binds a template against the parameters of one call site. Both tables are
//! computed once per invocation and reused for every input row.

use apifed_core::{FederationError, FederationResult, ParamBinding, ServiceParams, Value, Variable};

use crate::extract::PathExpr;
use crate::template::ApiTemplate;

/// Where the value of an input parameter comes from
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    /// Unbound at the call site; the template default applies.
    Default,
    Constant(Value),
    /// Read from each input row, falling back to the template default.
    Variable(Variable),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInput {
    pub name: String,
    pub source: InputSource,
}

/// An output parameter the call site observes through a variable
#[derive(Debug, Clone, PartialEq)]
pub struct OutputBinding {
    pub name: String,
    pub path: PathExpr,
    pub variable: Variable,
}

/// Resolves every input parameter of `template`, in declaration order.
pub fn resolve_inputs(
    template: &ApiTemplate,
    params: &ServiceParams,
) -> FederationResult<Vec<ResolvedInput>> {
    template
        .input_params()
        .iter()
        .map(|input| {
            let source = match params.get(&input.name) {
                None if input.default.is_none() => {
                    return Err(FederationError::invalid_invocation(format!(
                        "Parameter {} must be bound",
                        input.name
                    )))
                }
                None => InputSource::Default,
                Some(ParamBinding::Constant(value)) => InputSource::Constant(value.clone()),
                Some(ParamBinding::Variable(variable)) => InputSource::Variable(variable.clone()),
                Some(other) => {
                    return Err(FederationError::invalid_invocation(format!(
                        "Parameter {} must be constant or variable, got {}",
                        input.name,
                        other.kind()
                    )))
                }
            };
            Ok(ResolvedInput {
                name: input.name.clone(),
                source,
            })
        })
        .collect()
}

/// Resolves the output parameters the call site binds, in declaration order.
///
/// Outputs left unbound or bound to an anonymous variable are dropped.
pub fn resolve_outputs(
    template: &ApiTemplate,
    params: &ServiceParams,
) -> FederationResult<Vec<OutputBinding>> {
    let mut outputs = Vec::with_capacity(template.output_params().len());
    for output in template.output_params() {
        let variable = match params.get(&output.name) {
            None => continue,
            Some(ParamBinding::Variable(variable)) => variable,
            Some(other) => {
                return Err(FederationError::invalid_invocation(format!(
                    "Output parameter {} must be bound to a variable, got {}",
                    output.name,
                    other.kind()
                )))
            }
        };
        if variable.is_anonymous() {
            continue;
        }
        outputs.push(OutputBinding {
            name: output.name.clone(),
            path: output.path.clone(),
            variable: variable.clone(),
        });
    }
    Ok(outputs)
}
