// SPDX-License-Identifier: Apache-2.0

//! Normalized error types for the apifed federation engine
//!
//! Template loading, invocation resolution and outbound calls all report
//! through this single error type so the host sees one taxonomy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all federation operations
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FederationError {
    /// Malformed template definition or unparsable configuration document.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invocation references a template that is not registered.
    #[error("Template not found: {name}")]
    NotFound { name: String },

    /// Call-site bindings violate the template contract.
    #[error("Invalid invocation: {message}")]
    InvalidInvocation { message: String },

    /// The outbound call failed (network, status, unparsable response).
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        status: Option<u16>,
    },
}

impl FederationError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config { message: msg.into() }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn invalid_invocation(msg: impl Into<String>) -> Self {
        Self::InvalidInvocation { message: msg.into() }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            message: msg.into(),
            status: None,
        }
    }

    pub fn http_status(status: u16, msg: impl Into<String>) -> Self {
        Self::Transport {
            message: msg.into(),
            status: Some(status),
        }
    }

    /// The bare message, without the category prefix of `Display`.
    pub fn message(&self) -> &str {
        match self {
            Self::Config { message }
            | Self::InvalidInvocation { message }
            | Self::Transport { message, .. } => message,
            Self::NotFound { name } => name,
        }
    }

    /// True for errors raised while iterating (as opposed to load or resolution time).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Result type alias for federation operations
pub type FederationResult<T> = Result<T, FederationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = FederationError::not_found("Categories");
        assert_eq!(err.to_string(), "Template not found: Categories");

        let err = FederationError::http_status(503, "Service Unavailable");
        assert_eq!(err.to_string(), "Transport error: Service Unavailable");
        assert!(err.is_transport());
        assert!(!FederationError::config("bad").is_transport());
    }

    #[test]
    fn test_serializes_externally_tagged() {
        let err = FederationError::invalid_invocation("Parameter titles must be bound");
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(
            json,
            r#"{"InvalidInvocation":{"message":"Parameter titles must be bound"}}"#
        );
    }
}
