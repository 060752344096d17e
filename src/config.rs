// SPDX-License-Identifier: Apache-2.0

//! Process configuration
//!
//! Read once at startup from the environment. Every setting has a default;
//! a value that is present but malformed is a configuration error.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use apifed_core::{FederationError, FederationResult};

use crate::extract::ResponseFormat;
use crate::transport::DEFAULT_USER_AGENT;

pub const ENV_CONFIG: &str = "APIFED_CONFIG";
pub const ENV_ENDPOINT: &str = "APIFED_ENDPOINT";
pub const ENV_FORMAT: &str = "APIFED_FORMAT";
pub const ENV_TIMEOUT_MS: &str = "APIFED_TIMEOUT_MS";
pub const ENV_USER_AGENT: &str = "APIFED_USER_AGENT";

pub const DEFAULT_CONFIG_PATH: &str = "mwservices.json";
pub const DEFAULT_ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Template configuration document
    pub templates_path: PathBuf,
    pub endpoint: Url,
    pub format: ResponseFormat,
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            templates_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            endpoint: default_endpoint(),
            format: ResponseFormat::default(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ServiceConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> FederationResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> FederationResult<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(path) = get(ENV_CONFIG) {
            config.templates_path = PathBuf::from(path);
        }
        if let Some(endpoint) = get(ENV_ENDPOINT) {
            config.endpoint = parse_endpoint(&endpoint)?;
        }
        if let Some(format) = get(ENV_FORMAT) {
            config.format = format
                .parse()
                .map_err(|e: FederationError| invalid(ENV_FORMAT, e.message()))?;
        }
        if let Some(timeout) = get(ENV_TIMEOUT_MS) {
            config.timeout_ms = match timeout.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => ms,
                _ => {
                    return Err(invalid(
                        ENV_TIMEOUT_MS,
                        &format!("'{timeout}' is not a positive number of milliseconds"),
                    ))
                }
            };
        }
        if let Some(user_agent) = get(ENV_USER_AGENT) {
            config.user_agent = user_agent;
        }

        Ok(config)
    }
}

fn default_endpoint() -> Url {
    match Url::parse(DEFAULT_ENDPOINT) {
        Ok(url) => url,
        Err(e) => unreachable!("default endpoint is a valid URL: {e}"),
    }
}

fn parse_endpoint(raw: &str) -> FederationResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| invalid(ENV_ENDPOINT, &format!("'{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(invalid(
            ENV_ENDPOINT,
            &format!("unsupported scheme '{scheme}'"),
        )),
    }
}

fn invalid(key: &str, reason: &str) -> FederationError {
    FederationError::config(format!("Invalid {key}: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.templates_path, PathBuf::from("mwservices.json"));
        assert_eq!(config.endpoint.as_str(), DEFAULT_ENDPOINT);
        assert_eq!(config.format, ResponseFormat::Xml);
        assert_eq!(config.timeout_ms, 30_000);
        assert!(config.user_agent.starts_with("apifed/"));
    }

    #[test]
    fn test_overrides() {
        let config = ServiceConfig::from_lookup(lookup(&[
            (ENV_CONFIG, "/etc/apifed/services.json"),
            (ENV_ENDPOINT, "https://www.wikidata.org/w/api.php"),
            (ENV_FORMAT, "json"),
            (ENV_TIMEOUT_MS, "1500"),
            (ENV_USER_AGENT, "federation-test/1.0"),
        ]))
        .unwrap();

        assert_eq!(config.templates_path, PathBuf::from("/etc/apifed/services.json"));
        assert_eq!(config.endpoint.host_str(), Some("www.wikidata.org"));
        assert_eq!(config.format, ResponseFormat::Json);
        assert_eq!(config.timeout_ms, 1500);
        assert_eq!(config.user_agent, "federation-test/1.0");
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = ServiceConfig::from_lookup(lookup(&[(ENV_FORMAT, "  ")])).unwrap();
        assert_eq!(config.format, ResponseFormat::Xml);
    }

    #[test]
    fn test_malformed_values() {
        let cases = [
            (ENV_ENDPOINT, "not a url"),
            (ENV_ENDPOINT, "ftp://example.org/api"),
            (ENV_FORMAT, "yaml"),
            (ENV_TIMEOUT_MS, "soon"),
            (ENV_TIMEOUT_MS, "0"),
        ];
        for (key, value) in cases {
            let err = ServiceConfig::from_lookup(lookup(&[(key, value)])).unwrap_err();
            assert!(matches!(err, FederationError::Config { .. }), "{key}={value}");
            assert!(err.message().contains(key), "{err}");
        }
    }
}
