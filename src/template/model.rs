// SPDX-License-Identifier: Apache-2.0

//! Compiled API templates
//!
//! An `ApiTemplate` is built once from its definition and is read-only
//! afterwards; invocations share it through `Arc`.

use std::collections::HashSet;

use apifed_core::{FederationError, FederationResult};

use crate::extract::PathExpr;

use super::definition::TemplateDefinition;

/// A request parameter supplied per invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputParam {
    pub name: String,
    /// `None` means the parameter must be bound at the call site.
    pub default: Option<String>,
}

/// A value extracted from each result item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputParam {
    pub name: String,
    pub path: PathExpr,
}

/// Compiled representation of one named API template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiTemplate {
    name: String,
    fixed_params: Vec<(String, String)>,
    input_params: Vec<InputParam>,
    output_params: Vec<OutputParam>,
    items_path: PathExpr,
}

impl ApiTemplate {
    /// Compiles a template definition.
    ///
    /// Fails when a parameter is declared twice, when a fixed or input
    /// parameter is also declared as output, or when a path does not parse.
    pub fn compile(name: &str, definition: &TemplateDefinition) -> FederationResult<Self> {
        let invalid =
            |msg: String| FederationError::config(format!("Template '{name}': {msg}"));

        let mut declared: HashSet<&str> = HashSet::new();
        let mut fixed_params = Vec::new();
        let mut input_params = Vec::new();

        for (param, value) in definition.params.iter() {
            if !declared.insert(param) {
                return Err(invalid(format!("Repeated input parameter '{param}'")));
            }

            match value {
                serde_json::Value::Object(spec) => {
                    // Only `default` is meaningful; other fields (e.g. `type`) are ignored.
                    let default = match spec.get("default") {
                        None | Some(serde_json::Value::Null) => None,
                        Some(v) => Some(scalar_text(v).ok_or_else(|| {
                            invalid(format!("Default of parameter '{param}' must be a scalar"))
                        })?),
                    };
                    input_params.push(InputParam {
                        name: param.to_string(),
                        default,
                    });
                }
                other => {
                    let value = scalar_text(other).ok_or_else(|| {
                        invalid(format!(
                            "Parameter '{param}' must be a scalar (fixed) or an object (input)"
                        ))
                    })?;
                    fixed_params.push((param.to_string(), value));
                }
            }
        }

        let items_path = PathExpr::parse(&definition.output.items)
            .map_err(|e| invalid(format!("items: {}", e.message())))?;
        if !items_path.selects_nodes() {
            return Err(invalid(format!(
                "items path '{items_path}' must select nodes, not attributes or text"
            )));
        }

        let mut output_params: Vec<OutputParam> = Vec::new();
        for (param, path) in definition.output.vars.iter() {
            if declared.contains(param) {
                return Err(invalid(format!(
                    "Parameter '{param}' declared as both input and output"
                )));
            }
            if output_params.iter().any(|o| o.name == param) {
                return Err(invalid(format!("Repeated output parameter '{param}'")));
            }
            let path = PathExpr::parse(path)
                .map_err(|e| invalid(format!("output '{param}': {}", e.message())))?;
            output_params.push(OutputParam {
                name: param.to_string(),
                path,
            });
        }

        Ok(Self {
            name: name.to_string(),
            fixed_params,
            input_params,
            output_params,
            items_path,
        })
    }

    /// Parses and compiles a single template definition.
    pub fn from_json(name: &str, json: &str) -> FederationResult<Self> {
        let definition: TemplateDefinition = serde_json::from_str(json)
            .map_err(|e| FederationError::config(format!("Template '{name}': {e}")))?;
        Self::compile(name, &definition)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameters sent with every call, in declaration order
    pub fn fixed_params(&self) -> &[(String, String)] {
        &self.fixed_params
    }

    pub fn input_params(&self) -> &[InputParam] {
        &self.input_params
    }

    pub fn output_params(&self) -> &[OutputParam] {
        &self.output_params
    }

    pub fn items_path(&self) -> &PathExpr {
        &self.items_path
    }

    /// Declared default of an input parameter, if any
    pub fn input_default(&self, name: &str) -> Option<&str> {
        self.input_params
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.default.as_deref())
    }
}

fn scalar_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
