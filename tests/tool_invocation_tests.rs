mod common;

use std::sync::Arc;

use common::{Behavior, RecordingTransport};
use pyramid_tools::{
    scope, FailureCategory, InvocationContext, ServiceKey, ToolkitError,
};
use secrecy::ExposeSecret;
use serde_json::json;

fn tenant(jina_key: &str) -> Arc<InvocationContext> {
    Arc::new(
        InvocationContext::builder()
            .execution_id(jina_key)
            .auth("jina_api_key", json!(jina_key))
            .build(),
    )
}

#[tokio::test]
async fn invalid_params_issue_zero_network_calls() {
    let transport = RecordingTransport::new(Behavior::EchoAuth);
    let settings = common::settings(&[("JINA_API_KEY", "settings-jina-0001")]);
    let registry = common::registry(&settings, Arc::clone(&transport));

    let cases = [
        ("jina_search", json!({})),
        ("jina_search", json!({"query": 42})),
        ("jina_fetch_page", json!({"url": "not a url"})),
        ("github_create_issue", json!({"owner": "o", "repo": "r"})),
        ("dex_get_pair", json!({"chain_id": "ethereum"})),
        ("tavily_search", json!({"query": "q", "unexpected": true})),
    ];
    for (tool, params) in cases {
        let err = registry.invoke(tool, params, None).await.unwrap_err();
        assert!(
            matches!(err, ToolkitError::Validation { .. }),
            "{tool}: expected validation error, got {err:?}"
        );
    }
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn missing_credentials_issue_zero_network_calls() {
    let transport = RecordingTransport::new(Behavior::EchoAuth);
    let registry = common::registry(&common::settings(&[]), Arc::clone(&transport));

    let err = registry
        .invoke("jina_search", json!({"query": "rust"}), None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("JINA_API_KEY"), "{err}");
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn timeout_is_one_tool_execution_error_and_settings_survive() {
    let transport = RecordingTransport::new(Behavior::Timeout);
    let settings = common::settings(&[("JINA_API_KEY", "settings-jina-0001")]);
    let registry = common::registry(&settings, Arc::clone(&transport));

    let err = registry
        .invoke("jina_search", json!({"query": "rust"}), None)
        .await
        .unwrap_err();
    match &err {
        ToolkitError::ToolExecution {
            service, category, status, ..
        } => {
            assert_eq!(*service, ServiceKey::Jina);
            assert_eq!(*category, FailureCategory::Timeout);
            assert_eq!(*status, None);
        }
        other => panic!("expected ToolExecution, got {other:?}"),
    }
    assert!(err.is_retryable());
    assert_eq!(transport.calls(), 1);
    assert_eq!(
        settings.jina_api_key.as_ref().map(|s| s.expose_secret().to_string()),
        Some("settings-jina-0001".to_string())
    );
    assert!(settings.credential_for(ServiceKey::Jina).is_some());
}

#[tokio::test]
async fn upstream_statuses_are_categorized() {
    let limited = RecordingTransport::new(Behavior::Status(429, json!({"error": "slow down"})));
    let settings = common::settings(&[("GITHUB_TOKEN", "settings-github-0001")]);
    let registry = common::registry(&settings, Arc::clone(&limited));
    let err = registry
        .invoke(
            "github_get_file_contents",
            json!({"owner": "o", "repo": "r", "path": "README.md"}),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ToolkitError::ToolExecution {
            category: FailureCategory::RateLimited,
            status: Some(429),
            ..
        }
    ));

    let garbled = RecordingTransport::new(Behavior::Status(200, json!("garbage")));
    let registry = common::registry(&settings, Arc::clone(&garbled));
    let err = registry
        .invoke("dex_get_pair", json!({"chain_id": "bsc", "pair_address": "0x1"}), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ToolkitError::ToolExecution {
            category: FailureCategory::Decode,
            ..
        }
    ));
}

#[tokio::test]
async fn concurrent_contexts_never_cross_resolve() -> anyhow::Result<()> {
    let transport = RecordingTransport::with_rendezvous(Behavior::EchoAuth, 2);
    let settings = common::settings(&[("JINA_API_KEY", "settings-jina-0001")]);
    let registry = Arc::new(common::registry(&settings, Arc::clone(&transport)));

    let a = {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            registry
                .invoke("jina_search", json!({"query": "a"}), Some(tenant("X")))
                .await
        })
    };
    let b = {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            registry
                .invoke("jina_search", json!({"query": "b"}), Some(tenant("Y")))
                .await
        })
    };
    let (a, b) = (a.await??, b.await??);

    assert_eq!(a["results"][0]["title"], "Bearer X");
    assert_eq!(b["results"][0]["title"], "Bearer Y");
    let mut seen = transport.seen_auth();
    seen.sort();
    assert_eq!(seen, vec!["Bearer X", "Bearer Y"]);
    Ok(())
}

#[tokio::test]
async fn interleaved_scopes_on_one_task_stay_isolated() -> anyhow::Result<()> {
    let transport = RecordingTransport::with_rendezvous(Behavior::EchoAuth, 2);
    let settings = common::settings(&[]);
    let registry = common::registry(&settings, Arc::clone(&transport));
    let tool = registry.get("jina_search").expect("jina_search registered");

    let (a, b) = tokio::join!(
        scope(tenant("X"), tool.invoke(json!({"query": "a"}))),
        scope(tenant("Y"), tool.invoke(json!({"query": "b"}))),
    );
    assert_eq!(a?["results"][0]["title"], "Bearer X");
    assert_eq!(b?["results"][0]["title"], "Bearer Y");
    assert!(pyramid_tools::current_context().is_none());
    Ok(())
}
