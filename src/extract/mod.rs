// SPDX-License-Identifier: Apache-2.0

//! Response extraction
//!
//! Turns a response body into result items and result items into values,
//! independently of the wire format. The executor only sees these traits.

pub mod json;
pub mod path;
pub mod xml;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use apifed_core::{FederationError, FederationResult, Value};

pub use json::JsonExtractor;
pub use path::PathExpr;
pub use xml::XmlExtractor;

/// One item selected from a response by a template's items path
pub trait ResultItem: Send + Sync + fmt::Debug {
    /// Evaluates `path` against this item and returns the first match.
    fn extract(&self, path: &PathExpr) -> Option<Value>;
}

/// Parses response bodies of one format and selects result items
pub trait PathExtractor: Send + Sync {
    /// Format name negotiated with the external API (sent as `format=`)
    fn format(&self) -> &'static str;

    /// Parses `body` and returns every item matched by `path`, in document order.
    ///
    /// An unparsable body is a transport error.
    fn extract_items(
        &self,
        body: &str,
        path: &PathExpr,
    ) -> FederationResult<Vec<Box<dyn ResultItem>>>;
}

/// Response formats with a built-in extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    #[default]
    Xml,
    Json,
}

impl ResponseFormat {
    pub fn extractor(self) -> Arc<dyn PathExtractor> {
        match self {
            ResponseFormat::Xml => Arc::new(XmlExtractor::new()),
            ResponseFormat::Json => Arc::new(JsonExtractor::new()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResponseFormat::Xml => "xml",
            ResponseFormat::Json => "json",
        }
    }
}

impl FromStr for ResponseFormat {
    type Err = FederationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xml" => Ok(ResponseFormat::Xml),
            "json" => Ok(ResponseFormat::Json),
            other => Err(FederationError::config(format!(
                "Unknown response format '{other}' (expected 'xml' or 'json')"
            ))),
        }
    }
}
