// SPDX-License-Identifier: Apache-2.0

//! In-memory transport shared by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use url::Url;

use apifed_lib::{ApiRequest, ApiResponse, ApiTransport, FederationResult};

type Responder = dyn Fn(&ApiRequest) -> FederationResult<String> + Send + Sync;

/// Answers every request through a closure and records what it was sent.
pub struct MockTransport {
    respond: Box<Responder>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new(
        respond: impl Fn(&ApiRequest) -> FederationResult<String> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ApiTransport for MockTransport {
    fn transport_id(&self) -> &'static str {
        "mock"
    }

    async fn fetch(&self, request: &ApiRequest) -> FederationResult<ApiResponse> {
        self.requests.lock().unwrap().push(request.clone());
        (self.respond)(request).map(ApiResponse::ok)
    }
}

pub fn endpoint() -> Url {
    Url::parse("https://en.wikipedia.org/w/api.php").unwrap()
}

/// A MediaWiki-style XML response with one `<page>` per title.
pub fn pages_xml(titles: &[&str]) -> String {
    let pages: String = titles
        .iter()
        .map(|t| format!(r#"<page ns="0" title="{t}"/>"#))
        .collect();
    format!(r#"<?xml version="1.0"?><api><query><pages>{pages}</pages></query></api>"#)
}
