//! Jina neural search and page extraction.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::credentials::{Credential, CredentialResolver, ServiceKey};
use crate::error::{Result, ToolkitError};
use crate::schema::{Schema, SchemaKind};
use crate::tools::{ParamError, ToolAdapter, ToolDescriptor, Toolkit, ToolkitCategory, TypedTool, Validate};
use crate::transport::{self, DynTransport, UpstreamRequest};
use crate::utils::ConfigValidator;

use super::{bearer, normalize_base_url, require};

pub const DEFAULT_BASE_URL: &str = "https://api.jina.ai/v1";
pub const MAX_SEARCH_LIMIT: u32 = 50;

/// Slack added to the caller's fetch timeout so Jina can report its own
/// timeout before ours fires.
const FETCH_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JinaSearchResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JinaSearchResponse {
    #[serde(default)]
    pub results: Vec<JinaSearchResult>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub took_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchedPage {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

fn default_limit() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

fn default_fetch_timeout() -> Option<u32> {
    Some(30)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_filters: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default = "default_true")]
    pub safe_search: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

impl Validate for SearchParams {
    fn validate(&self) -> std::result::Result<(), ParamError> {
        match ConfigValidator::check_non_empty(&self.query) {
            Some(problem) => Err(ParamError::new("query", problem)),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FetchParams {
    pub url: String,
    #[serde(default)]
    pub include_html: bool,
    #[serde(default = "default_fetch_timeout")]
    pub timeout: Option<u32>,
}

impl Validate for FetchParams {
    fn validate(&self) -> std::result::Result<(), ParamError> {
        match ConfigValidator::check_url(&self.url) {
            Some(problem) => Err(ParamError::new("url", problem)),
            None => Ok(()),
        }
    }
}

#[derive(Clone)]
pub struct JinaClient {
    transport: DynTransport,
    base_url: String,
}

impl JinaClient {
    pub fn new(transport: DynTransport) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = normalize_base_url(base_url);
        self
    }

    /// `limit` is clamped to [`MAX_SEARCH_LIMIT`].
    pub async fn search(
        &self,
        credential: &Credential,
        mut params: SearchParams,
    ) -> Result<JinaSearchResponse> {
        params.limit = params.limit.min(MAX_SEARCH_LIMIT);
        let request = UpstreamRequest::post(
            ServiceKey::Jina,
            "search",
            format!("{}/search", self.base_url),
        )
        .header("Authorization", bearer(credential)?)
        .json(encode(&params)?);
        transport::execute(self.transport.as_ref(), request)
            .await?
            .json(ServiceKey::Jina)
    }

    pub async fn fetch_page(&self, credential: &Credential, params: FetchParams) -> Result<FetchedPage> {
        let mut request = UpstreamRequest::post(
            ServiceKey::Jina,
            "fetch",
            format!("{}/fetch", self.base_url),
        )
        .header("Authorization", bearer(credential)?)
        .json(encode(&params)?);
        if let Some(seconds) = params.timeout {
            request = request.timeout(Duration::from_secs(u64::from(seconds)) + FETCH_TIMEOUT_SLACK);
        }
        transport::execute(self.transport.as_ref(), request)
            .await?
            .json(ServiceKey::Jina)
    }
}

fn encode<T: Serialize>(params: &T) -> Result<Value> {
    serde_json::to_value(params).map_err(|err| ToolkitError::Other(err.into()))
}

static SEARCH: Lazy<ToolDescriptor> = Lazy::new(|| {
    ToolDescriptor::builder("jina_search", ServiceKey::Jina)
        .description("Search the web using Jina's neural search engine")
        .instructions("Pass next_page_token back as page_token to read further results")
        .parameters(
            Schema::object()
                .required_property("query", Schema::string().with_description("Search query"))
                .property(
                    "limit",
                    Schema::new(SchemaKind::Integer {
                        minimum: Some(1),
                        maximum: None,
                    })
                    .with_description("Number of results; values above 50 are clamped"),
                )
                .property("domain_filters", Schema::array(Schema::string()).optional())
                .property("language", Schema::string().optional())
                .property("safe_search", Schema::boolean())
                .property("page_token", Schema::string().optional())
                .deny_additional(),
        )
        .result(
            Schema::object()
                .required_property("results", Schema::array(Schema::object()))
                .required_property("total", Schema::integer()),
        )
        .tag("search")
        .build()
});

static FETCH: Lazy<ToolDescriptor> = Lazy::new(|| {
    ToolDescriptor::builder("jina_fetch_page", ServiceKey::Jina)
        .description("Fetch and extract content from a web page using Jina's content extractor")
        .instructions("Set include_html only when the markup itself is needed")
        .parameters(
            Schema::object()
                .required_property("url", Schema::string().with_description("Page URL"))
                .property("include_html", Schema::boolean())
                .property("timeout", Schema::integer_range(1, 120).optional())
                .deny_additional(),
        )
        .result(
            Schema::object()
                .required_property("url", Schema::string())
                .required_property("text", Schema::string()),
        )
        .tag("scrape")
        .build()
});

pub struct JinaSearch {
    client: JinaClient,
}

#[async_trait]
impl TypedTool for JinaSearch {
    type Params = SearchParams;
    type Output = JinaSearchResponse;

    fn descriptor(&self) -> &ToolDescriptor {
        &SEARCH
    }

    async fn execute(
        &self,
        params: SearchParams,
        credential: Option<&Credential>,
    ) -> Result<JinaSearchResponse> {
        self.client
            .search(require(ServiceKey::Jina, credential)?, params)
            .await
    }
}

pub struct JinaFetchPage {
    client: JinaClient,
}

#[async_trait]
impl TypedTool for JinaFetchPage {
    type Params = FetchParams;
    type Output = FetchedPage;

    fn descriptor(&self) -> &ToolDescriptor {
        &FETCH
    }

    async fn execute(&self, params: FetchParams, credential: Option<&Credential>) -> Result<FetchedPage> {
        self.client
            .fetch_page(require(ServiceKey::Jina, credential)?, params)
            .await
    }
}

pub fn toolkit(client: JinaClient, resolver: &CredentialResolver) -> Result<Toolkit> {
    Toolkit::builder("jina_toolkit", "Jina Toolkit")
        .description("Tools for web search and content extraction using Jina's neural search engine")
        .service(ServiceKey::Jina)
        .category(ToolkitCategory::Tool)
        .app_default(true)
        .tool(
            ToolAdapter::new(
                JinaSearch {
                    client: client.clone(),
                },
                resolver.clone(),
            )
            .into_dyn(),
        )
        .tool(ToolAdapter::new(JinaFetchPage { client }, resolver.clone()).into_dyn())
        .build()
}
