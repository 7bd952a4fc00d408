use std::env;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::credentials::{Credential, CredentialSource, ServiceKey};
use crate::utils::ConfigValidator;

macro_rules! provider_settings {
    ($( $field:ident => $env:literal, $service:ident . $slot:literal; )*) => {
        /// Process-wide fallback credentials, one optional secret per
        /// supported upstream field.
        #[derive(Debug, Default)]
        pub struct ProviderSettings {
            $( pub $field: Option<SecretString>, )*
        }

        impl ProviderSettings {
            pub const ENV_VARS: &'static [&'static str] = &[$($env),*];

            pub fn from_lookup<F>(lookup: F) -> Self
            where
                F: Fn(&str) -> Option<String>,
            {
                Self {
                    $( $field: read_secret(&lookup, $env), )*
                }
            }

            fn slots(&self) -> Vec<SettingSlot<'_>> {
                vec![
                    $( SettingSlot {
                        service: ServiceKey::$service,
                        field: $slot,
                        env: $env,
                        value: self.$field.as_ref(),
                    }, )*
                ]
            }
        }
    };
}

provider_settings! {
    tavily_api_key => "TAVILY_API_KEY", Tavily."api_key";
    jina_api_key => "JINA_API_KEY", Jina."api_key";
    apify_api_key => "APIFY_API_KEY", Apify."api_key";
    github_token => "GITHUB_TOKEN", Github."token";
    telegram_bot_token => "TELEGRAM_BOT_TOKEN", Telegram."bot_token";
    slack_api_token => "SLACK_API_TOKEN", Slack."token";
    discord_bot_token => "DISCORD_BOT_TOKEN", Discord."bot_token";
    discord_public_key => "DISCORD_PUBLIC_KEY", Discord."public_key";
    twitter_username => "TWITTER_USERNAME", Twitter."username";
    twitter_password => "TWITTER_PASSWORD", Twitter."password";
    twitter_email => "TWITTER_EMAIL", Twitter."email";
    twitter_auth_token => "TWITTER_AUTH_TOKEN", Twitter."auth_token";
    twitter_ct0 => "TWITTER_CT0", Twitter."ct0";
    twitter_twid => "TWITTER_TWID", Twitter."twid";
}

struct SettingSlot<'a> {
    service: ServiceKey,
    field: &'static str,
    env: &'static str,
    value: Option<&'a SecretString>,
}

fn read_secret<F>(lookup: &F, env: &str) -> Option<SecretString>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(env)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Err(err) = ConfigValidator::validate_secret(env, trimmed) {
        warn!(%err, "ignoring configured secret");
        return None;
    }
    Some(SecretString::from(trimmed.to_string()))
}

/// Per-service view used by diagnostics; never carries secret values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceStatus {
    pub service: ServiceKey,
    pub configured: bool,
    pub fields: Vec<&'static str>,
    pub env_vars: Vec<&'static str>,
}

impl ProviderSettings {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(err) if err.not_found() => {}
            Err(err) => warn!(%err, "failed to read .env"),
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Settings-derived credential, if every required field is present.
    pub fn credential_for(&self, service: ServiceKey) -> Option<Credential> {
        let mut credential = Credential::new(service, CredentialSource::Settings);
        for slot in self.slots().into_iter().filter(|s| s.service == service) {
            if let Some(secret) = slot.value {
                credential = credential.with_field(slot.field, secret.expose_secret());
            }
        }
        credential.is_usable().then_some(credential)
    }

    pub fn configured_services(&self) -> Vec<ServiceKey> {
        ServiceKey::ALL
            .into_iter()
            .filter(|service| service.requires_auth() && self.credential_for(*service).is_some())
            .collect()
    }

    pub fn status(&self) -> Vec<ServiceStatus> {
        let slots = self.slots();
        ServiceKey::ALL
            .into_iter()
            .filter(|service| service.requires_auth())
            .map(|service| {
                let own: Vec<_> = slots.iter().filter(|s| s.service == service).collect();
                ServiceStatus {
                    service,
                    configured: self.credential_for(service).is_some(),
                    fields: own
                        .iter()
                        .filter(|s| s.value.is_some())
                        .map(|s| s.field)
                        .collect(),
                    env_vars: own.iter().map(|s| s.env).collect(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> ProviderSettings {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ProviderSettings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn reads_each_declared_variable() {
        let s = settings(&[
            ("TAVILY_API_KEY", "tvly-abcdef123456"),
            ("GITHUB_TOKEN", " ghp_abcdef123456 "),
        ]);
        assert_eq!(
            s.tavily_api_key.as_ref().map(|v| v.expose_secret().to_string()),
            Some("tvly-abcdef123456".to_string())
        );
        assert_eq!(
            s.credential_for(ServiceKey::Github).unwrap().primary(),
            Some("ghp_abcdef123456")
        );
        assert!(s.jina_api_key.is_none());
    }

    #[test]
    fn empty_and_placeholder_values_are_absent() {
        let s = settings(&[("JINA_API_KEY", "   "), ("APIFY_API_KEY", "your_apify_key")]);
        assert!(s.jina_api_key.is_none());
        assert!(s.apify_api_key.is_none());
        assert!(s.configured_services().is_empty());
    }

    #[test]
    fn multi_field_services_need_complete_sets() {
        let partial = settings(&[("TWITTER_USERNAME", "bob")]);
        assert!(partial.credential_for(ServiceKey::Twitter).is_none());

        let login = settings(&[
            ("TWITTER_USERNAME", "bob"),
            ("TWITTER_PASSWORD", "correct-horse-battery"),
        ]);
        let cred = login.credential_for(ServiceKey::Twitter).unwrap();
        assert_eq!(cred.secret("username"), Some("bob"));
        assert_eq!(cred.source(), CredentialSource::Settings);
    }

    #[test]
    fn every_service_hint_is_a_declared_variable() {
        for service in ServiceKey::ALL.into_iter().filter(|s| s.requires_auth()) {
            let hint = service.env_hint();
            assert!(
                ProviderSettings::ENV_VARS.iter().any(|var| hint.contains(var)),
                "{service} hint `{hint}` names no declared variable"
            );
        }
    }

    #[test]
    fn status_lists_fields_without_values() {
        let s = settings(&[("DISCORD_BOT_TOKEN", "discord-token-123456")]);
        let discord = s
            .status()
            .into_iter()
            .find(|st| st.service == ServiceKey::Discord)
            .unwrap();
        assert!(discord.configured);
        assert_eq!(discord.fields, vec!["bot_token"]);
        assert_eq!(discord.env_vars, vec!["DISCORD_BOT_TOKEN", "DISCORD_PUBLIC_KEY"]);
        assert!(!s.status().iter().any(|st| st.service == ServiceKey::DexScreener));
    }
}
