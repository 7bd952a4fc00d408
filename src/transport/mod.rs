//! Seam between tool adapters and the network.
//!
//! Integrations build an [`UpstreamRequest`] and hand it to a [`Transport`];
//! tests swap in a recording transport to assert call counts without any
//! sockets.

mod http;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::credentials::ServiceKey;
use crate::error::{FailureCategory, Result, ToolkitError};

pub use http::HttpTransport;

const EXCERPT_LIMIT: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Clone)]
pub struct UpstreamRequest {
    pub service: ServiceKey,
    /// Short label for logs; the URL itself may embed secrets.
    pub endpoint: &'static str,
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub timeout: Option<Duration>,
}

impl UpstreamRequest {
    pub fn new(
        service: ServiceKey,
        endpoint: &'static str,
        method: Method,
        url: impl Into<String>,
    ) -> Self {
        Self {
            service,
            endpoint,
            method,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(service: ServiceKey, endpoint: &'static str, url: impl Into<String>) -> Self {
        Self::new(service, endpoint, Method::Get, url)
    }

    pub fn post(service: ServiceKey, endpoint: &'static str, url: impl Into<String>) -> Self {
        Self::new(service, endpoint, Method::Post, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Debug for UpstreamRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamRequest")
            .field("service", &self.service)
            .field("endpoint", &self.endpoint)
            .field("method", &self.method)
            .field(
                "headers",
                &self.headers.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json_body(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn excerpt(&self) -> String {
        let text = String::from_utf8_lossy(&self.body);
        let mut excerpt: String = text.chars().take(EXCERPT_LIMIT).collect();
        if text.chars().count() > EXCERPT_LIMIT {
            excerpt.push('…');
        }
        excerpt
    }

    pub fn json<T: DeserializeOwned>(&self, service: ServiceKey) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|err| {
            ToolkitError::execution(
                service,
                FailureCategory::Decode,
                Some(self.status),
                format!("malformed response: {err}"),
            )
        })
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    pub fn category(&self) -> FailureCategory {
        match self {
            TransportError::Timeout(_) => FailureCategory::Timeout,
            TransportError::Connect(_) => FailureCategory::Connect,
            TransportError::Other(_) => FailureCategory::Upstream,
        }
    }

    pub fn into_toolkit_error(self, service: ServiceKey) -> ToolkitError {
        ToolkitError::execution(service, self.category(), None, self.to_string())
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: UpstreamRequest,
    ) -> std::result::Result<UpstreamResponse, TransportError>;
}

pub type DynTransport = Arc<dyn Transport>;

/// Sends `request` and converts transport failures and non-success statuses
/// into `ToolExecution` errors.
pub async fn execute(transport: &dyn Transport, request: UpstreamRequest) -> Result<UpstreamResponse> {
    let service = request.service;
    let response = transport
        .send(request)
        .await
        .map_err(|err| err.into_toolkit_error(service))?;
    check_status(service, &response)?;
    Ok(response)
}

pub fn check_status(service: ServiceKey, response: &UpstreamResponse) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }
    let category = if response.status == 429 {
        FailureCategory::RateLimited
    } else {
        FailureCategory::Status
    };
    Err(ToolkitError::execution(
        service,
        category,
        Some(response.status),
        response.excerpt(),
    ))
}
