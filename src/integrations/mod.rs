//! Thin wrappers over upstream APIs, each exposed as a toolkit.

pub mod dex_screener;
pub mod github;
pub mod jina;
pub mod tavily;
pub mod telegram;

use reqwest::Url;

use crate::credentials::{Credential, CredentialResolver, ServiceKey};
use crate::error::{Result, ToolkitError};
use crate::tools::{ToolRegistry, Toolkit};
use crate::transport::DynTransport;

/// Upstream base URLs; overridden in tests to point at a local server.
#[derive(Clone, Debug)]
pub struct BaseUrls {
    pub tavily: String,
    pub jina: String,
    pub dex_screener: String,
    pub github: String,
    pub telegram: String,
}

impl Default for BaseUrls {
    fn default() -> Self {
        Self {
            tavily: tavily::DEFAULT_BASE_URL.to_string(),
            jina: jina::DEFAULT_BASE_URL.to_string(),
            dex_screener: dex_screener::DEFAULT_BASE_URL.to_string(),
            github: github::DEFAULT_BASE_URL.to_string(),
            telegram: telegram::DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl BaseUrls {
    /// Every service rooted at one server, e.g. a wiremock instance.
    pub fn all(base_url: &str) -> Self {
        let base = normalize_base_url(base_url);
        Self {
            tavily: base.clone(),
            jina: base.clone(),
            dex_screener: base.clone(),
            github: base.clone(),
            telegram: base,
        }
    }
}

pub fn builtin_toolkits(resolver: &CredentialResolver, transport: DynTransport) -> Result<Vec<Toolkit>> {
    builtin_toolkits_with(resolver, transport, &BaseUrls::default())
}

pub fn builtin_toolkits_with(
    resolver: &CredentialResolver,
    transport: DynTransport,
    urls: &BaseUrls,
) -> Result<Vec<Toolkit>> {
    Ok(vec![
        tavily::toolkit(
            tavily::TavilyClient::new(transport.clone()).with_base_url(&urls.tavily),
            resolver,
        )?,
        jina::toolkit(
            jina::JinaClient::new(transport.clone()).with_base_url(&urls.jina),
            resolver,
        )?,
        dex_screener::toolkit(
            dex_screener::DexScreenerClient::new(transport.clone())
                .with_base_url(&urls.dex_screener),
            resolver,
        )?,
        github::toolkit(
            github::GithubClient::new(transport.clone()).with_base_url(&urls.github),
            resolver,
        )?,
        telegram::toolkit(
            telegram::TelegramClient::new(transport).with_base_url(&urls.telegram),
            resolver,
        )?,
    ])
}

pub fn builtin_registry(resolver: &CredentialResolver, transport: DynTransport) -> Result<ToolRegistry> {
    builtin_registry_with(resolver, transport, &BaseUrls::default())
}

pub fn builtin_registry_with(
    resolver: &CredentialResolver,
    transport: DynTransport,
    urls: &BaseUrls,
) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    for toolkit in builtin_toolkits_with(resolver, transport, urls)? {
        registry.register_toolkit(toolkit)?;
    }
    Ok(registry)
}

pub(crate) fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Appends `segments` to `base_url`, percent-encoding each one so a value
/// can never add path levels, a query or a fragment.
pub(crate) fn endpoint(base_url: &str, segments: &[&str]) -> Result<String> {
    let mut url = Url::parse(base_url)
        .map_err(|err| ToolkitError::Config(format!("invalid base url `{base_url}`: {err}")))?;
    url.path_segments_mut()
        .map_err(|_| ToolkitError::Config(format!("base url `{base_url}` cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.into())
}

/// The adapter always supplies a credential for authenticated services; a
/// direct caller might not.
pub(crate) fn require(service: ServiceKey, credential: Option<&Credential>) -> Result<&Credential> {
    credential.ok_or_else(|| ToolkitError::missing_credential(service, "no credential supplied"))
}

pub(crate) fn primary(credential: &Credential) -> Result<&str> {
    credential.primary().ok_or_else(|| {
        ToolkitError::missing_credential(
            credential.service(),
            format!("credential has no `{}` field", credential.service().primary_field()),
        )
    })
}

pub(crate) fn bearer(credential: &Credential) -> Result<String> {
    primary(credential).map(|token| format!("Bearer {token}"))
}
