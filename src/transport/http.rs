use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{debug, instrument};

use crate::error::{Result, ToolkitError};

use super::{Method, Transport, TransportError, UpstreamRequest, UpstreamResponse};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// reqwest-backed transport sharing one connection pool across invocations.
///
/// Connections are checked out per request and returned to the pool when the
/// request future finishes or is dropped, so cancelling an invocation never
/// leaks a socket. An optional cap bounds in-flight requests; the permit is
/// owned by the request future and released the same way.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    default_timeout: Duration,
    in_flight: Option<Arc<Semaphore>>,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("pyramid-tools/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ToolkitError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            default_timeout: REQUEST_TIMEOUT,
            in_flight: None,
        })
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_max_in_flight(mut self, limit: usize) -> Self {
        self.in_flight = Some(Arc::new(Semaphore::new(limit.max(1))));
        self
    }

    pub fn available_permits(&self) -> Option<usize> {
        self.in_flight.as_ref().map(|s| s.available_permits())
    }
}

/// Drops the URL from the message; some upstreams carry secrets in the path.
fn classify(err: reqwest::Error) -> TransportError {
    let err = err.without_url();
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip_all, fields(service = %request.service, endpoint = request.endpoint))]
    async fn send(
        &self,
        request: UpstreamRequest,
    ) -> std::result::Result<UpstreamResponse, TransportError> {
        let _permit = match &self.in_flight {
            Some(semaphore) => Some(
                Arc::clone(semaphore)
                    .acquire_owned()
                    .await
                    .map_err(|_| TransportError::Other("transport closed".to_string()))?,
            ),
            None => None,
        };

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };
        let mut builder = self
            .client
            .request(method, &request.url)
            .timeout(request.timeout.unwrap_or(self.default_timeout));
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(classify)?;
        debug!(status, bytes = body.len(), "upstream responded");

        Ok(UpstreamResponse {
            status,
            body: body.to_vec(),
        })
    }
}
