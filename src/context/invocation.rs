use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

/// Looks up a credential bundle on demand, so secrets need not be embedded in
/// the context itself.
pub trait AuthCallback: Send + Sync {
    fn lookup(&self, auth_key: &str, ctx: &InvocationContext) -> Option<Value>;
}

impl<F> AuthCallback for F
where
    F: Fn(&str, &InvocationContext) -> Option<Value> + Send + Sync,
{
    fn lookup(&self, auth_key: &str, ctx: &InvocationContext) -> Option<Value> {
        self(auth_key, ctx)
    }
}

#[derive(Clone, Default)]
pub enum AuthSource {
    #[default]
    None,
    Static(Map<String, Value>),
    Callback(Arc<dyn AuthCallback>),
}

impl fmt::Debug for AuthSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthSource::None => f.write_str("None"),
            AuthSource::Static(map) => f
                .debug_tuple("Static")
                .field(&map.keys().collect::<Vec<_>>())
                .finish(),
            AuthSource::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// Per-execution configuration handed to tools by the calling workflow.
#[derive(Clone, Default)]
pub struct InvocationContext {
    execution_id: Option<String>,
    values: Map<String, Value>,
    auth: AuthSource,
}

impl InvocationContext {
    pub fn builder() -> InvocationContextBuilder {
        InvocationContextBuilder::default()
    }

    /// Accepts a workflow context object; an `auth` member becomes the auth
    /// source and everything else stays a plain value.
    pub fn from_value(value: Value) -> Self {
        let mut values = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let auth = match values.remove("auth") {
            Some(Value::Object(map)) => AuthSource::Static(map),
            _ => AuthSource::None,
        };
        let execution_id = values
            .get("execution_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self {
            execution_id,
            values,
            auth,
        }
    }

    pub fn execution_id(&self) -> Option<&str> {
        self.execution_id.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn auth(&self) -> &AuthSource {
        &self.auth
    }

    /// Credential bundle for `auth_key`: the auth source first, then a
    /// top-level value of the same name.
    pub fn auth_bundle(&self, auth_key: &str) -> Option<Value> {
        let from_auth = match &self.auth {
            AuthSource::None => None,
            AuthSource::Static(map) => map.get(auth_key).cloned(),
            AuthSource::Callback(callback) => callback.lookup(auth_key, self),
        };
        from_auth
            .filter(|bundle| !bundle.is_null())
            .or_else(|| self.values.get(auth_key).filter(|v| !v.is_null()).cloned())
    }
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("execution_id", &self.execution_id)
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .field("auth", &self.auth)
            .finish()
    }
}

#[derive(Default)]
pub struct InvocationContextBuilder {
    execution_id: Option<String>,
    values: Map<String, Value>,
    auth: Map<String, Value>,
    callback: Option<Arc<dyn AuthCallback>>,
}

impl InvocationContextBuilder {
    pub fn execution_id(mut self, id: impl Into<String>) -> Self {
        self.execution_id = Some(id.into());
        self
    }

    pub fn value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn auth(mut self, auth_key: impl Into<String>, bundle: Value) -> Self {
        self.auth.insert(auth_key.into(), bundle);
        self
    }

    /// A callback replaces any static bundles added with [`Self::auth`].
    pub fn auth_callback<C>(mut self, callback: C) -> Self
    where
        C: AuthCallback + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> InvocationContext {
        let auth = match (self.callback, self.auth.is_empty()) {
            (Some(callback), _) => AuthSource::Callback(callback),
            (None, false) => AuthSource::Static(self.auth),
            (None, true) => AuthSource::None,
        };
        InvocationContext {
            execution_id: self.execution_id,
            values: self.values,
            auth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_splits_auth_from_values() {
        let ctx = InvocationContext::from_value(json!({
            "execution_id": "run-7",
            "auth": {"tavily_api_key": "tvly-1"},
            "github_token": "ghp_top",
            "topic": "news"
        }));

        assert_eq!(ctx.execution_id(), Some("run-7"));
        assert_eq!(ctx.get("topic"), Some(&json!("news")));
        assert!(ctx.get("auth").is_none());
        assert_eq!(ctx.auth_bundle("tavily_api_key"), Some(json!("tvly-1")));
        assert_eq!(ctx.auth_bundle("github_token"), Some(json!("ghp_top")));
        assert_eq!(ctx.auth_bundle("jina_api_key"), None);
    }

    #[test]
    fn callback_receives_key_and_context() {
        let ctx = InvocationContext::builder()
            .value("tenant", json!("acme"))
            .auth_callback(|key: &str, ctx: &InvocationContext| {
                let tenant = ctx.get("tenant")?.as_str()?;
                (key == "jina_api_key").then(|| json!(format!("{tenant}-jina")))
            })
            .build();

        assert_eq!(ctx.auth_bundle("jina_api_key"), Some(json!("acme-jina")));
        assert_eq!(ctx.auth_bundle("tavily_api_key"), None);
    }

    #[test]
    fn debug_hides_auth_values() {
        let ctx = InvocationContext::builder()
            .auth("github_token", json!("ghp_very_secret"))
            .build();
        let rendered = format!("{ctx:?}");
        assert!(rendered.contains("github_token"));
        assert!(!rendered.contains("ghp_very_secret"));
    }

    #[test]
    fn null_auth_entry_is_absent() {
        let ctx = InvocationContext::from_value(json!({"auth": {"jina_api_key": null}}));
        assert_eq!(ctx.auth_bundle("jina_api_key"), None);
    }
}
