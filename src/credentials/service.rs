use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::ToolkitError;

/// Every upstream service a tool may authenticate against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKey {
    Tavily,
    Jina,
    Apify,
    Github,
    Telegram,
    Slack,
    Discord,
    Twitter,
    DexScreener,
}

impl ServiceKey {
    pub const ALL: [ServiceKey; 9] = [
        ServiceKey::Tavily,
        ServiceKey::Jina,
        ServiceKey::Apify,
        ServiceKey::Github,
        ServiceKey::Telegram,
        ServiceKey::Slack,
        ServiceKey::Discord,
        ServiceKey::Twitter,
        ServiceKey::DexScreener,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKey::Tavily => "tavily",
            ServiceKey::Jina => "jina",
            ServiceKey::Apify => "apify",
            ServiceKey::Github => "github",
            ServiceKey::Telegram => "telegram",
            ServiceKey::Slack => "slack",
            ServiceKey::Discord => "discord",
            ServiceKey::Twitter => "twitter",
            ServiceKey::DexScreener => "dex_screener",
        }
    }

    /// Key under which an invocation context carries this service's credential
    /// bundle.
    pub fn auth_key(&self) -> &'static str {
        match self {
            ServiceKey::Tavily => "tavily_api_key",
            ServiceKey::Jina => "jina_api_key",
            ServiceKey::Apify => "apify_api_key",
            ServiceKey::Github => "github_token",
            ServiceKey::Telegram => "telegram_bot_token",
            ServiceKey::Slack => "slack_api_token",
            ServiceKey::Discord => "discord_bot_token",
            ServiceKey::Twitter => "twitter_auth",
            ServiceKey::DexScreener => "dex_screener",
        }
    }

    /// Field that a bare string bundle is stored under.
    pub fn primary_field(&self) -> &'static str {
        match self {
            ServiceKey::Tavily | ServiceKey::Jina | ServiceKey::Apify => "api_key",
            ServiceKey::Github | ServiceKey::Slack => "token",
            ServiceKey::Telegram | ServiceKey::Discord => "bot_token",
            ServiceKey::Twitter => "auth_token",
            ServiceKey::DexScreener => "api_key",
        }
    }

    pub fn requires_auth(&self) -> bool {
        !matches!(self, ServiceKey::DexScreener)
    }

    /// Environment variable(s) that satisfy this service from process
    /// configuration.
    pub fn env_hint(&self) -> String {
        match self {
            ServiceKey::Tavily => "TAVILY_API_KEY".into(),
            ServiceKey::Jina => "JINA_API_KEY".into(),
            ServiceKey::Apify => "APIFY_API_KEY".into(),
            ServiceKey::Github => "GITHUB_TOKEN".into(),
            ServiceKey::Telegram => "TELEGRAM_BOT_TOKEN".into(),
            ServiceKey::Slack => "SLACK_API_TOKEN".into(),
            ServiceKey::Discord => "DISCORD_BOT_TOKEN".into(),
            ServiceKey::Twitter => {
                "TWITTER_AUTH_TOKEN or TWITTER_USERNAME/TWITTER_PASSWORD".into()
            }
            ServiceKey::DexScreener => "nothing (public API)".into(),
        }
    }

    /// Whether a set of secret fields is enough to authenticate.
    pub(crate) fn is_complete(&self, fields: &BTreeMap<String, SecretString>) -> bool {
        match self {
            ServiceKey::Twitter => {
                fields.contains_key("auth_token")
                    || (fields.contains_key("username") && fields.contains_key("password"))
            }
            _ => fields.contains_key(self.primary_field()),
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ServiceKey {
    type Err = ToolkitError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim().to_ascii_lowercase();
        ServiceKey::ALL
            .into_iter()
            .find(|key| key.as_str() == needle || key.auth_key() == needle)
            .ok_or_else(|| ToolkitError::Config(format!("unknown service `{value}`")))
    }
}
