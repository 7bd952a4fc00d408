mod common;

use std::sync::Arc;

use pyramid_tools::{
    sync_scope, CredentialResolver, CredentialSource, InvocationContext, ServiceKey, ToolkitError,
};
use serde_json::json;

fn authenticated_services() -> impl Iterator<Item = ServiceKey> {
    ServiceKey::ALL.into_iter().filter(|s| s.requires_auth())
}

fn full_settings() -> Arc<pyramid_tools::ProviderSettings> {
    common::settings(&[
        ("TAVILY_API_KEY", "settings-tavily-0001"),
        ("JINA_API_KEY", "settings-jina-0001"),
        ("APIFY_API_KEY", "settings-apify-0001"),
        ("GITHUB_TOKEN", "settings-github-0001"),
        ("TELEGRAM_BOT_TOKEN", "settings-telegram-0001"),
        ("SLACK_API_TOKEN", "settings-slack-0001"),
        ("DISCORD_BOT_TOKEN", "settings-discord-0001"),
        ("TWITTER_AUTH_TOKEN", "settings-twitter-0001"),
    ])
}

#[test]
fn context_credential_wins_for_every_service() -> anyhow::Result<()> {
    let resolver = CredentialResolver::new(full_settings());
    for service in authenticated_services() {
        let ctx = InvocationContext::builder()
            .auth(service.auth_key(), json!(format!("context-{service}")))
            .build();
        let credential = resolver.resolve_in(service, Some(&ctx))?;
        assert_eq!(credential.source(), CredentialSource::Context, "{service}");
        assert_eq!(credential.primary(), Some(format!("context-{service}").as_str()));
    }
    Ok(())
}

#[test]
fn settings_fill_in_when_context_is_silent() -> anyhow::Result<()> {
    let resolver = CredentialResolver::new(full_settings());
    let unrelated = InvocationContext::builder()
        .auth("some_other_tool", json!("x"))
        .build();
    for service in authenticated_services() {
        let credential = resolver.resolve_in(service, Some(&unrelated))?;
        assert_eq!(credential.source(), CredentialSource::Settings, "{service}");
        assert!(credential.primary().is_some_and(|v| v.starts_with("settings-")));
    }
    Ok(())
}

#[test]
fn absence_everywhere_names_the_tool_key() {
    let resolver = CredentialResolver::new(common::settings(&[]));
    for service in authenticated_services() {
        match resolver.resolve_in(service, None) {
            Err(ToolkitError::AuthenticationMissing { tool_key, .. }) => {
                assert_eq!(tool_key, service.auth_key());
            }
            other => panic!("{service}: expected AuthenticationMissing, got {other:?}"),
        }
    }
}

#[test]
fn callback_sources_are_consulted_per_lookup() -> anyhow::Result<()> {
    let resolver = CredentialResolver::new(common::settings(&[]));
    let ctx = Arc::new(
        InvocationContext::builder()
            .execution_id("tenant-9")
            .auth_callback(|key: &str, ctx: &InvocationContext| {
                (key == "github_token")
                    .then(|| json!(format!("minted-for-{}", ctx.execution_id().unwrap_or("?"))))
            })
            .build(),
    );

    let credential = sync_scope(ctx, || resolver.resolve(ServiceKey::Github))?;
    assert_eq!(credential.primary(), Some("minted-for-tenant-9"));
    assert!(resolver.resolve(ServiceKey::Github).is_err());
    Ok(())
}

#[test]
fn expired_context_credentials_do_not_fall_back() {
    let resolver = CredentialResolver::new(full_settings());
    let ctx = InvocationContext::builder()
        .auth(
            "jina_api_key",
            json!({"api_key": "old-key", "expires_at": "2001-01-01T00:00:00Z"}),
        )
        .build();
    let err = resolver.resolve_in(ServiceKey::Jina, Some(&ctx)).unwrap_err();
    assert_eq!(err.kind(), "authentication_missing");
}
