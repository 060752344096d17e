// SPDX-License-Identifier: Apache-2.0

//! Boundary data types shared with the host query engine
//!
//! These types model just enough of the host's term and binding-set
//! representation for templates to be invoked against it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Unique identifier for one template invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvocationId(pub Uuid);

impl InvocationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Universal value representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Json(serde_json::Value),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Renders the value as an outbound request parameter.
    ///
    /// `Null` has no parameter form and is treated as unbound by callers.
    pub fn as_param(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Json(v) => Some(v.to_string()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

/// A query variable as seen by the host engine
///
/// Anonymous variables are placeholders the host introduces itself; their
/// values are never observed by the query author.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    name: Arc<str>,
    anonymous: bool,
}

impl Variable {
    pub fn named(name: impl AsRef<str>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            anonymous: false,
        }
    }

    pub fn anonymous(name: impl AsRef<str>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            anonymous: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.name)
    }
}

/// What a call site binds a template parameter to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamBinding {
    Constant(Value),
    Variable(Variable),
    /// Any other host term (function call, path, blank node...), kept only
    /// for error reporting.
    Expression(String),
}

impl ParamBinding {
    pub fn kind(&self) -> &'static str {
        match self {
            ParamBinding::Constant(_) => "constant",
            ParamBinding::Variable(_) => "variable",
            ParamBinding::Expression(_) => "expression",
        }
    }
}

/// Call-site parameter bindings for one invocation
///
/// A parameter absent from the map is unbound.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceParams {
    bindings: HashMap<String, ParamBinding>,
}

impl ServiceParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_constant(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bindings
            .insert(name.into(), ParamBinding::Constant(value.into()));
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, variable: Variable) -> Self {
        self.bindings
            .insert(name.into(), ParamBinding::Variable(variable));
        self
    }

    pub fn with_binding(mut self, name: impl Into<String>, binding: ParamBinding) -> Self {
        self.bindings.insert(name.into(), binding);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, binding: ParamBinding) {
        self.bindings.insert(name.into(), binding);
    }

    pub fn get(&self, name: &str) -> Option<&ParamBinding> {
        self.bindings.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamBinding> {
        self.bindings.remove(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// An immutable binding set flowing through the pipeline
///
/// Bindings keep insertion order. Deriving a row never touches the source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    bindings: Vec<(Variable, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bindings(bindings: impl IntoIterator<Item = (Variable, Value)>) -> Self {
        Row::new().joined(bindings)
    }

    /// Returns a copy of this row with one more binding.
    pub fn with(&self, variable: Variable, value: impl Into<Value>) -> Self {
        self.joined([(variable, value.into())])
    }

    /// Returns this row's bindings plus `extra`.
    ///
    /// A variable already bound keeps its position and takes the new value.
    pub fn joined(&self, extra: impl IntoIterator<Item = (Variable, Value)>) -> Self {
        let mut bindings = self.bindings.clone();
        for (variable, value) in extra {
            match bindings.iter_mut().find(|(v, _)| *v == variable) {
                Some(slot) => slot.1 = value,
                None => bindings.push((variable, value)),
            }
        }
        Self { bindings }
    }

    pub fn get(&self, variable: &Variable) -> Option<&Value> {
        self.bindings
            .iter()
            .find(|(v, _)| v == variable)
            .map(|(_, value)| value)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.bindings
            .iter()
            .find(|(v, _)| v.name() == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Value)> {
        self.bindings.iter().map(|(v, value)| (v, value))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// HTTP method of an outbound call. The federation only issues reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HttpMethod {
    #[default]
    Get,
}

/// A fully parameterized outbound request, ready for dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub target: Url,
    pub params: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn get(target: Url) -> Self {
        Self {
            method: HttpMethod::Get,
            target,
            params: Vec::new(),
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// The target URL with all parameters appended to its query string.
    pub fn url(&self) -> Url {
        let mut url = self.target.clone();
        if !self.params.is_empty() {
            url.query_pairs_mut().extend_pairs(self.params.iter());
        }
        url
    }

    pub fn query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter())
            .finish()
    }
}

/// Successful response of an outbound call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }
}
