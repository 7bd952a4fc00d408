use std::sync::Arc;

use tracing::debug;

use crate::config::ProviderSettings;
use crate::context::{self, InvocationContext};
use crate::error::{Result, ToolkitError};

use super::{Credential, ServiceKey};

/// Locates the credential a tool should use for one invocation.
///
/// Context-scoped bundles win over process settings; the two sources are
/// never merged. Nothing is cached, so every call observes the context that
/// is visible at that moment.
#[derive(Clone, Debug)]
pub struct CredentialResolver {
    settings: Arc<ProviderSettings>,
}

impl CredentialResolver {
    pub fn new(settings: Arc<ProviderSettings>) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// Resolves against the ambient invocation context, if one is installed.
    pub fn resolve(&self, service: ServiceKey) -> Result<Credential> {
        let ctx = context::current_context();
        self.resolve_in(service, ctx.as_deref())
    }

    pub fn resolve_in(
        &self,
        service: ServiceKey,
        ctx: Option<&InvocationContext>,
    ) -> Result<Credential> {
        if let Some(ctx) = ctx {
            if let Some(bundle) = ctx.auth_bundle(service.auth_key()) {
                match Credential::from_bundle(service, &bundle) {
                    Some(credential) if credential.is_expired() => {
                        debug!(%service, source = "context", "context credential expired");
                        return Err(ToolkitError::missing_credential(
                            service,
                            "context credential expired",
                        ));
                    }
                    Some(credential) => {
                        debug!(%service, source = "context", "credential resolved");
                        return Ok(credential);
                    }
                    None => {
                        debug!(%service, "context bundle unusable, falling back to settings");
                    }
                }
            }
        }

        if let Some(credential) = self.settings.credential_for(service) {
            debug!(%service, source = "settings", "credential resolved");
            return Ok(credential);
        }

        Err(ToolkitError::missing_credential(
            service,
            "not found in invocation context or settings",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::CredentialSource;
    use serde_json::json;

    fn resolver_with(vars: &[(&str, &str)]) -> CredentialResolver {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let settings = ProviderSettings::from_lookup(|key| {
            vars.iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.clone())
        });
        CredentialResolver::new(Arc::new(settings))
    }

    #[test]
    fn context_wins_over_settings() {
        let resolver = resolver_with(&[("TAVILY_API_KEY", "tvly-settings")]);
        let ctx = InvocationContext::builder()
            .auth("tavily_api_key", json!("tvly-context"))
            .build();

        let cred = resolver.resolve_in(ServiceKey::Tavily, Some(&ctx)).unwrap();
        assert_eq!(cred.primary(), Some("tvly-context"));
        assert_eq!(cred.source(), CredentialSource::Context);
    }

    #[test]
    fn settings_used_when_context_lacks_key() {
        let resolver = resolver_with(&[("GITHUB_TOKEN", "ghp_settings")]);
        let ctx = InvocationContext::builder()
            .auth("tavily_api_key", json!("tvly-context"))
            .build();

        let cred = resolver.resolve_in(ServiceKey::Github, Some(&ctx)).unwrap();
        assert_eq!(cred.primary(), Some("ghp_settings"));
        assert_eq!(cred.source(), CredentialSource::Settings);
    }

    #[test]
    fn missing_everywhere_names_the_key() {
        let resolver = resolver_with(&[]);
        let err = resolver.resolve_in(ServiceKey::Jina, None).unwrap_err();
        match err {
            ToolkitError::AuthenticationMissing { tool_key, .. } => {
                assert_eq!(tool_key, "jina_api_key")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn expired_context_credential_does_not_fall_back() {
        let resolver = resolver_with(&[("SLACK_API_TOKEN", "xoxb-settings")]);
        let ctx = InvocationContext::builder()
            .auth(
                "slack_api_token",
                json!({"token": "xoxb-old", "expires_at": "2001-01-01T00:00:00Z"}),
            )
            .build();

        let err = resolver.resolve_in(ServiceKey::Slack, Some(&ctx)).unwrap_err();
        assert_eq!(err.kind(), "authentication_missing");
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn unusable_context_bundle_falls_back() {
        let resolver = resolver_with(&[("JINA_API_KEY", "jina-settings")]);
        let ctx = InvocationContext::builder()
            .auth("jina_api_key", json!(""))
            .build();

        let cred = resolver.resolve_in(ServiceKey::Jina, Some(&ctx)).unwrap();
        assert_eq!(cred.primary(), Some("jina-settings"));
    }

    #[test]
    fn ambient_context_is_consulted() {
        let resolver = resolver_with(&[("APIFY_API_KEY", "apify-settings")]);
        let ctx = InvocationContext::builder()
            .auth("apify_api_key", json!("apify-context"))
            .build();

        let inside = context::sync_scope(Arc::new(ctx), || {
            resolver.resolve(ServiceKey::Apify).unwrap()
        });
        assert_eq!(inside.primary(), Some("apify-context"));

        let outside = resolver.resolve(ServiceKey::Apify).unwrap();
        assert_eq!(outside.primary(), Some("apify-settings"));
    }
}
