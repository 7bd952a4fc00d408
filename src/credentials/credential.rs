use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use super::ServiceKey;

/// Where a resolved credential came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialSource {
    Context,
    Settings,
}

impl CredentialSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialSource::Context => "context",
            CredentialSource::Settings => "settings",
        }
    }
}

/// Secret material for one upstream service.
///
/// Values are wrapped in [`SecretString`]; the `Debug` output lists field
/// names only and there is no `Serialize` impl.
pub struct Credential {
    service: ServiceKey,
    fields: BTreeMap<String, SecretString>,
    expires_at: Option<DateTime<Utc>>,
    source: CredentialSource,
}

impl Credential {
    pub fn new(service: ServiceKey, source: CredentialSource) -> Self {
        Self {
            service,
            fields: BTreeMap::new(),
            expires_at: None,
            source,
        }
    }

    /// Single-secret credential stored under the service's primary field.
    pub fn single(service: ServiceKey, secret: impl Into<String>, source: CredentialSource) -> Self {
        Self::new(service, source).with_field(service.primary_field(), secret)
    }

    pub fn with_field(mut self, name: impl Into<String>, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if !secret.trim().is_empty() {
            self.fields
                .insert(name.into(), SecretString::from(secret.trim().to_string()));
        }
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Builds a credential from a context bundle.
    ///
    /// A JSON string is the primary secret; an object maps field names to
    /// string secrets, with an optional RFC 3339 `expires_at`. Returns `None`
    /// when the bundle does not carry enough to authenticate.
    pub fn from_bundle(service: ServiceKey, bundle: &Value) -> Option<Self> {
        let credential = match bundle {
            Value::String(secret) => Self::single(service, secret.as_str(), CredentialSource::Context),
            Value::Object(map) => {
                let mut credential = Self::new(service, CredentialSource::Context);
                for (name, value) in map {
                    if name == "expires_at" {
                        if let Some(expiry) = value
                            .as_str()
                            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                        {
                            credential.expires_at = Some(expiry.with_timezone(&Utc));
                        }
                        continue;
                    }
                    if let Some(secret) = value.as_str() {
                        credential = credential.with_field(name.as_str(), secret);
                    }
                }
                credential
            }
            _ => return None,
        };
        credential.is_usable().then_some(credential)
    }

    pub fn service(&self) -> ServiceKey {
        self.service
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn secret(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(|secret| secret.expose_secret())
    }

    pub fn primary(&self) -> Option<&str> {
        self.secret(self.service.primary_field())
    }

    pub fn bearer(&self) -> Option<String> {
        self.primary().map(|token| format!("Bearer {token}"))
    }

    pub fn is_usable(&self) -> bool {
        self.service.is_complete(&self.fields)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl Clone for Credential {
    fn clone(&self) -> Self {
        Self {
            service: self.service,
            fields: self
                .fields
                .iter()
                .map(|(name, secret)| {
                    (name.clone(), SecretString::from(secret.expose_secret().to_owned()))
                })
                .collect(),
            expires_at: self.expires_at,
            source: self.source,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("service", &self.service)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("expires_at", &self.expires_at)
            .field("source", &self.source)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn string_bundle_becomes_primary_field() {
        let cred = Credential::from_bundle(ServiceKey::Tavily, &json!("tvly-123")).unwrap();
        assert_eq!(cred.primary(), Some("tvly-123"));
        assert_eq!(cred.secret("api_key"), Some("tvly-123"));
        assert_eq!(cred.source(), CredentialSource::Context);
    }

    #[test]
    fn object_bundle_reads_fields_and_expiry() {
        let bundle = json!({
            "bot_token": "123:abc",
            "public_key": "pk",
            "expires_at": "2030-01-01T00:00:00Z",
            "ignored": 42
        });
        let cred = Credential::from_bundle(ServiceKey::Discord, &bundle).unwrap();
        assert_eq!(cred.primary(), Some("123:abc"));
        assert_eq!(cred.secret("public_key"), Some("pk"));
        assert!(cred.secret("ignored").is_none());
        assert!(cred.expires_at().is_some());
        assert!(!cred.is_expired());
    }

    #[test]
    fn empty_or_incomplete_bundles_are_rejected() {
        assert!(Credential::from_bundle(ServiceKey::Jina, &json!("   ")).is_none());
        assert!(Credential::from_bundle(ServiceKey::Jina, &json!({"other": "x"})).is_none());
        assert!(Credential::from_bundle(ServiceKey::Jina, &json!(7)).is_none());
    }

    #[test]
    fn debug_output_never_contains_secrets() {
        let cred = Credential::single(ServiceKey::Github, "ghp_secret", CredentialSource::Settings);
        let rendered = format!("{cred:?}");
        assert!(!rendered.contains("ghp_secret"), "{rendered}");
        assert!(rendered.contains("token"));
    }

    #[test]
    fn expiry_is_inclusive() {
        let now = Utc::now();
        let cred = Credential::single(ServiceKey::Slack, "xoxb", CredentialSource::Context)
            .with_expiry(now);
        assert!(cred.is_expired_at(now));
        assert!(!cred.is_expired_at(now - Duration::seconds(1)));
    }

    #[test]
    fn bearer_uses_primary_field() {
        let cred = Credential::single(ServiceKey::Jina, "jina_1", CredentialSource::Settings);
        assert_eq!(cred.bearer().as_deref(), Some("Bearer jina_1"));
        let clone = cred.clone();
        assert_eq!(clone.primary(), Some("jina_1"));
    }
}
