use std::future::Future;
use std::sync::Arc;

use futures::future::Either;

use super::InvocationContext;

tokio::task_local! {
    static CURRENT: Arc<InvocationContext>;
}

/// Runs `fut` with `ctx` as the only visible invocation context.
///
/// An outer context is hidden, not merged, and becomes visible again once
/// `fut` completes, fails, panics or is dropped.
pub async fn scope<F>(ctx: Arc<InvocationContext>, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT.scope(ctx, fut).await
}

pub fn sync_scope<F, R>(ctx: Arc<InvocationContext>, f: F) -> R
where
    F: FnOnce() -> R,
{
    CURRENT.sync_scope(ctx, f)
}

pub fn current_context() -> Option<Arc<InvocationContext>> {
    CURRENT.try_with(Arc::clone).ok()
}

/// Carries the current context into a future that will run elsewhere, e.g.
/// on a task spawned with `tokio::spawn`, which does not inherit it.
pub fn bind<F>(fut: F) -> impl Future<Output = F::Output>
where
    F: Future,
{
    match current_context() {
        Some(ctx) => Either::Left(CURRENT.scope(ctx, fut)),
        None => Either::Right(fut),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(tag: &str) -> Arc<InvocationContext> {
        Arc::new(InvocationContext::builder().value("tag", json!(tag)).build())
    }

    fn current_tag() -> Option<String> {
        current_context().and_then(|c| c.get("tag").and_then(|v| v.as_str()).map(String::from))
    }

    #[tokio::test]
    async fn absent_outside_scope() {
        assert!(current_context().is_none());
        let seen = scope(ctx("a"), async { current_tag() }).await;
        assert_eq!(seen.as_deref(), Some("a"));
        assert!(current_context().is_none());
    }

    #[tokio::test]
    async fn nested_scope_replaces_then_restores() {
        scope(ctx("outer"), async {
            assert_eq!(current_tag().as_deref(), Some("outer"));
            scope(ctx("inner"), async {
                assert_eq!(current_tag().as_deref(), Some("inner"));
            })
            .await;
            assert_eq!(current_tag().as_deref(), Some("outer"));
        })
        .await;
    }

    #[tokio::test]
    async fn restored_after_failure() {
        let result: Result<(), &str> = scope(ctx("failing"), async { Err("boom") }).await;
        assert!(result.is_err());
        assert!(current_context().is_none());
    }

    #[tokio::test]
    async fn bind_carries_context_into_spawned_task() {
        let handle = scope(ctx("spawner"), async {
            tokio::spawn(bind(async { current_tag() }))
        })
        .await;
        assert_eq!(handle.await.unwrap().as_deref(), Some("spawner"));

        let unbound = scope(ctx("spawner"), async { tokio::spawn(async { current_tag() }) }).await;
        assert_eq!(unbound.await.unwrap(), None);
    }

    #[test]
    fn sync_scope_restores_after_panic() {
        let result = std::panic::catch_unwind(|| {
            sync_scope(ctx("panicking"), || panic!("tool blew up"))
        });
        assert!(result.is_err());
        assert!(current_context().is_none());
    }
}
