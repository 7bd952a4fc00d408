#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pyramid_tools::{
    builtin_registry_with, BaseUrls, CredentialResolver, DynTransport, ProviderSettings,
    ToolRegistry, Transport, TransportError, UpstreamRequest, UpstreamResponse,
};
use serde_json::{json, Value};
use tokio::sync::Barrier;

pub enum Behavior {
    /// Reply with the request's Authorization header echoed as a Jina result.
    EchoAuth,
    Status(u16, Value),
    Timeout,
}

/// In-memory transport that counts calls and records auth headers.
pub struct RecordingTransport {
    behavior: Behavior,
    calls: AtomicUsize,
    seen_auth: Mutex<Vec<String>>,
    rendezvous: Option<Arc<Barrier>>,
}

impl RecordingTransport {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            seen_auth: Mutex::new(Vec::new()),
            rendezvous: None,
        })
    }

    /// Every call waits until `parties` calls are in flight at once.
    pub fn with_rendezvous(behavior: Behavior, parties: usize) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            seen_auth: Mutex::new(Vec::new()),
            rendezvous: Some(Arc::new(Barrier::new(parties))),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_auth(&self) -> Vec<String> {
        self.seen_auth.lock().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let auth = request.header_value("authorization").unwrap_or_default().to_string();
        self.seen_auth.lock().push(auth.clone());
        if let Some(barrier) = &self.rendezvous {
            barrier.wait().await;
        }
        match &self.behavior {
            Behavior::EchoAuth => Ok(UpstreamResponse::json_body(
                200,
                &json!({"results": [{"title": auth, "url": request.endpoint}], "total": 1}),
            )),
            Behavior::Status(status, body) => Ok(UpstreamResponse::json_body(*status, body)),
            Behavior::Timeout => Err(TransportError::Timeout("deadline elapsed".into())),
        }
    }
}

pub fn settings(vars: &[(&str, &str)]) -> Arc<ProviderSettings> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Arc::new(ProviderSettings::from_lookup(|key| map.get(key).cloned()))
}

pub fn registry(settings: &Arc<ProviderSettings>, transport: Arc<RecordingTransport>) -> ToolRegistry {
    let resolver = CredentialResolver::new(Arc::clone(settings));
    let transport: DynTransport = transport;
    builtin_registry_with(&resolver, transport, &BaseUrls::all("http://upstream.test"))
        .expect("builtin registry")
}
