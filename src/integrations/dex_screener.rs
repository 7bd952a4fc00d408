//! DEX Screener trading-pair lookups. Public API, no credential.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::credentials::{Credential, CredentialResolver, ServiceKey};
use crate::error::{FailureCategory, Result, ToolkitError};
use crate::schema::Schema;
use crate::tools::{ParamError, ToolAdapter, ToolDescriptor, Toolkit, ToolkitCategory, TypedTool, Validate};
use crate::transport::{self, DynTransport, UpstreamRequest};
use crate::utils::ConfigValidator;

use super::{endpoint, normalize_base_url};

pub const DEFAULT_BASE_URL: &str = "https://api.dexscreener.com/latest";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dex_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_token: Option<TokenInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_token: Option<TokenInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_native: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_usd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fdv: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquidity: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_change: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txns: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct PairsEnvelope {
    #[serde(default)]
    pair: Option<PairInfo>,
    #[serde(default)]
    pairs: Option<Vec<PairInfo>>,
}

#[derive(Clone)]
pub struct DexScreenerClient {
    transport: DynTransport,
    base_url: String,
}

impl DexScreenerClient {
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

    /// Search by token address, symbol or name.
    pub async fn search_pairs(&self, query: &str) -> Result<Vec<PairInfo>> {
        let request = UpstreamRequest::get(
            ServiceKey::DexScreener,
            "search",
            format!("{}/dex/search", self.base_url),
        )
        .query("q", query);
        let envelope: PairsEnvelope = transport::execute(self.transport.as_ref(), request)
            .await?
            .json(ServiceKey::DexScreener)?;
        Ok(envelope.pairs.unwrap_or_default())
    }

    pub async fn get_pair(&self, chain_id: &str, pair_address: &str) -> Result<PairInfo> {
        let url = endpoint(&self.base_url, &["dex", "pairs", chain_id, pair_address])?;
        let request = UpstreamRequest::get(ServiceKey::DexScreener, "pairs", url);
        let response = transport::execute(self.transport.as_ref(), request).await?;
        let envelope: PairsEnvelope = response.json(ServiceKey::DexScreener)?;
        envelope
            .pair
            .or_else(|| envelope.pairs.and_then(|pairs| pairs.into_iter().next()))
            .ok_or_else(|| {
                ToolkitError::execution(
                    ServiceKey::DexScreener,
                    FailureCategory::Upstream,
                    Some(response.status),
                    format!("pair {chain_id}/{pair_address} not found"),
                )
            })
    }
}

static SEARCH_PAIRS: Lazy<ToolDescriptor> = Lazy::new(|| {
    ToolDescriptor::builder("dex_search_pairs", ServiceKey::DexScreener)
        .description(
            "Search for trading pairs on DEX Screener using a token address, symbol, or name",
        )
        .instructions("Use this tool to find tokens on DEX Screener")
        .parameters(
            Schema::object()
                .required_property(
                    "query",
                    Schema::string().with_description("Token address, symbol, or name"),
                )
                .deny_additional(),
        )
        .result(Schema::array(Schema::object()))
        .tag("crypto")
        .build()
});

static GET_PAIR: Lazy<ToolDescriptor> = Lazy::new(|| {
    ToolDescriptor::builder("dex_get_pair", ServiceKey::DexScreener)
        .description("Get detailed information about a specific trading pair on DEX Screener")
        .instructions("Look the pair up with dex_search_pairs first to learn its chain and address")
        .parameters(
            Schema::object()
                .required_property(
                    "pair_address",
                    Schema::string().with_description("Address of the trading pair"),
                )
                .required_property(
                    "chain_id",
                    Schema::string().with_description("Chain the pair lives on, e.g. ethereum, bsc"),
                )
                .deny_additional(),
        )
        .result(Schema::object())
        .tag("crypto")
        .build()
});

#[derive(Debug, Deserialize)]
pub struct SearchPairsParams {
    pub query: String,
}

impl Validate for SearchPairsParams {
    fn validate(&self) -> std::result::Result<(), ParamError> {
        match ConfigValidator::check_non_empty(&self.query) {
            Some(problem) => Err(ParamError::new("query", problem)),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GetPairParams {
    pub pair_address: String,
    pub chain_id: String,
}

impl Validate for GetPairParams {
    fn validate(&self) -> std::result::Result<(), ParamError> {
        if let Some(problem) = ConfigValidator::check_slug(&self.chain_id) {
            return Err(ParamError::new("chain_id", problem));
        }
        if let Some(problem) = ConfigValidator::check_slug(&self.pair_address) {
            return Err(ParamError::new("pair_address", problem));
        }
        Ok(())
    }
}

pub struct DexSearchPairs {
    client: DexScreenerClient,
}

#[async_trait]
impl TypedTool for DexSearchPairs {
    type Params = SearchPairsParams;
    type Output = Vec<PairInfo>;

    fn descriptor(&self) -> &ToolDescriptor {
        &SEARCH_PAIRS
    }

    async fn execute(&self, params: SearchPairsParams, _: Option<&Credential>) -> Result<Vec<PairInfo>> {
        self.client.search_pairs(params.query.trim()).await
    }
}

pub struct DexGetPair {
    client: DexScreenerClient,
}

#[async_trait]
impl TypedTool for DexGetPair {
    type Params = GetPairParams;
    type Output = PairInfo;

    fn descriptor(&self) -> &ToolDescriptor {
        &GET_PAIR
    }

    async fn execute(&self, params: GetPairParams, _: Option<&Credential>) -> Result<PairInfo> {
        self.client
            .get_pair(&params.chain_id, &params.pair_address)
            .await
    }
}

pub fn toolkit(client: DexScreenerClient, resolver: &CredentialResolver) -> Result<Toolkit> {
    Toolkit::builder("dex_screener_toolkit", "DEX Screener Toolkit")
        .description("Tools for searching and getting information about trading pairs on DEX Screener")
        .service(ServiceKey::DexScreener)
        .category(ToolkitCategory::Tool)
        .app_default(true)
        .tool(
            ToolAdapter::new(
                DexSearchPairs {
                    client: client.clone(),
                },
                resolver.clone(),
            )
            .into_dyn(),
        )
        .tool(ToolAdapter::new(DexGetPair { client }, resolver.clone()).into_dyn())
        .build()
}
