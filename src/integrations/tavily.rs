//! Tavily web search.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::credentials::{Credential, CredentialResolver, ServiceKey};
use crate::error::{FailureCategory, Result, ToolkitError};
use crate::schema::Schema;
use crate::tools::{ParamError, ToolAdapter, ToolDescriptor, Toolkit, ToolkitCategory, TypedTool, Validate};
use crate::transport::{self, DynTransport, UpstreamRequest};
use crate::utils::ConfigValidator;

use super::{bearer, normalize_base_url};

pub const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    #[default]
    Basic,
    Advanced,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    #[default]
    General,
    News,
    Finance,
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchRequest {
    pub query: String,
    pub search_depth: SearchDepth,
    pub topic: Topic,
    pub max_results: u32,
    pub include_answer: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_domains: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_domains: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            search_depth: SearchDepth::Basic,
            topic: Topic::General,
            max_results: 5,
            include_answer: false,
            include_domains: None,
            exclude_domains: None,
            days: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    #[serde(default)]
    pub results: Vec<SearchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<f64>,
}

#[derive(Clone)]
pub struct TavilyClient {
    transport: DynTransport,
    base_url: String,
}

impl TavilyClient {
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

    pub async fn search(
        &self,
        credential: &Credential,
        request: &SearchRequest,
    ) -> Result<SearchResponse> {
        let body = serde_json::to_value(request)
            .map_err(|err| ToolkitError::validation("tavily_search", err.to_string()))?;
        let upstream = UpstreamRequest::post(
            ServiceKey::Tavily,
            "search",
            format!("{}/search", self.base_url),
        )
        .header("Authorization", bearer(credential)?)
        .json(body);
        transport::execute(self.transport.as_ref(), upstream)
            .await?
            .json(ServiceKey::Tavily)
    }
}

static SEARCH: Lazy<ToolDescriptor> = Lazy::new(|| {
    ToolDescriptor::builder("tavily_search", ServiceKey::Tavily)
        .description("Perform a web search using a fast web search (Tavily)")
        .instructions("Use for current events and facts; returns up to five ranked results")
        .parameters(
            Schema::object()
                .required_property("query", Schema::string().with_description("Search query"))
                .deny_additional(),
        )
        .result(
            Schema::object()
                .required_property("query", Schema::string())
                .required_property("results", Schema::array(Schema::object())),
        )
        .tag("search")
        .build()
});

static QNA: Lazy<ToolDescriptor> = Lazy::new(|| {
    ToolDescriptor::builder("tavily_qna_search", ServiceKey::Tavily)
        .description("Answer a question from a Tavily web search")
        .instructions("Returns a single short answer rather than a result list")
        .parameters(
            Schema::object()
                .required_property("query", Schema::string().with_description("Question to answer"))
                .property("search_depth", Schema::one_of(["basic", "advanced"]))
                .property("topic", Schema::one_of(["general", "news", "finance"]))
                .property("max_results", Schema::integer_range(1, 20))
                .property("include_domains", Schema::array(Schema::string()).optional())
                .property("exclude_domains", Schema::array(Schema::string()).optional())
                .property("days", Schema::integer_range(1, 365).optional())
                .deny_additional(),
        )
        .result(Schema::object().required_property("answer", Schema::string()))
        .tag("search")
        .build()
});

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
}

impl Validate for SearchParams {
    fn validate(&self) -> std::result::Result<(), ParamError> {
        match ConfigValidator::check_non_empty(&self.query) {
            Some(problem) => Err(ParamError::new("query", problem)),
            None => Ok(()),
        }
    }
}

pub struct TavilySearch {
    client: TavilyClient,
}

#[async_trait]
impl TypedTool for TavilySearch {
    type Params = SearchParams;
    type Output = SearchResponse;

    fn descriptor(&self) -> &ToolDescriptor {
        &SEARCH
    }

    async fn execute(
        &self,
        params: SearchParams,
        credential: Option<&Credential>,
    ) -> Result<SearchResponse> {
        let credential = super::require(ServiceKey::Tavily, credential)?;
        self.client
            .search(credential, &SearchRequest::new(params.query))
            .await
    }
}

fn default_max_results() -> u32 {
    5
}

#[derive(Debug, Deserialize)]
pub struct QnaParams {
    pub query: String,
    #[serde(default = "advanced")]
    pub search_depth: SearchDepth,
    #[serde(default)]
    pub topic: Topic,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default)]
    pub include_domains: Option<Vec<String>>,
    #[serde(default)]
    pub exclude_domains: Option<Vec<String>>,
    #[serde(default)]
    pub days: Option<u32>,
}

fn advanced() -> SearchDepth {
    SearchDepth::Advanced
}

impl Validate for QnaParams {
    fn validate(&self) -> std::result::Result<(), ParamError> {
        if let Some(problem) = ConfigValidator::check_non_empty(&self.query) {
            return Err(ParamError::new("query", problem));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct QnaAnswer {
    pub query: String,
    pub answer: String,
}

pub struct TavilyQnaSearch {
    client: TavilyClient,
}

#[async_trait]
impl TypedTool for TavilyQnaSearch {
    type Params = QnaParams;
    type Output = QnaAnswer;

    fn descriptor(&self) -> &ToolDescriptor {
        &QNA
    }

    async fn execute(&self, params: QnaParams, credential: Option<&Credential>) -> Result<QnaAnswer> {
        let credential = super::require(ServiceKey::Tavily, credential)?;
        let request = SearchRequest {
            search_depth: params.search_depth,
            topic: params.topic,
            max_results: params.max_results,
            include_answer: true,
            include_domains: params.include_domains,
            exclude_domains: params.exclude_domains,
            days: params.days,
            ..SearchRequest::new(params.query)
        };
        let response = self.client.search(credential, &request).await?;
        let answer = response.answer.ok_or_else(|| {
            ToolkitError::execution(
                ServiceKey::Tavily,
                FailureCategory::Decode,
                None,
                "response carried no answer",
            )
        })?;
        Ok(QnaAnswer {
            query: response.query,
            answer,
        })
    }
}

pub fn toolkit(client: TavilyClient, resolver: &CredentialResolver) -> Result<Toolkit> {
    Toolkit::builder("tavily_toolkit", "Search Toolkit (Tavily)")
        .description("Tools for performing web searches using Tavily API")
        .service(ServiceKey::Tavily)
        .category(ToolkitCategory::Tool)
        .app_default(true)
        .tool(
            ToolAdapter::new(
                TavilySearch {
                    client: client.clone(),
                },
                resolver.clone(),
            )
            .into_dyn(),
        )
        .tool(ToolAdapter::new(TavilyQnaSearch { client }, resolver.clone()).into_dyn())
        .build()
}
