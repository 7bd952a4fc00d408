use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::config::ProviderSettings;
use crate::context::InvocationContext;
use crate::credentials::ServiceKey;
use crate::error::{Result, ToolkitError};
use crate::tools::ToolRegistry;

#[derive(Clone, Debug, Serialize)]
pub struct ToolCatalogEntry {
    pub name: String,
    pub service: ServiceKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toolkit: Option<String>,
    pub requires_auth: bool,
    /// Whether process settings alone can satisfy the tool.
    pub configured: bool,
    pub description: String,
}

pub fn tool_catalog(registry: &ToolRegistry, settings: &ProviderSettings) -> Vec<ToolCatalogEntry> {
    registry
        .descriptors()
        .into_iter()
        .map(|descriptor| {
            let requires_auth = descriptor.requires_auth();
            ToolCatalogEntry {
                name: descriptor.name.clone(),
                service: descriptor.service,
                toolkit: registry
                    .toolkits()
                    .iter()
                    .find(|kit| kit.tools().iter().any(|t| t.name() == descriptor.name))
                    .map(|kit| kit.id().to_string()),
                requires_auth,
                configured: !requires_auth
                    || settings.credential_for(descriptor.service).is_some(),
                description: descriptor.description.clone(),
            }
        })
        .collect()
}

/// JSON-Schema rendering of every registered tool, for protocol bridges.
pub fn descriptor_exports(registry: &ToolRegistry) -> Vec<Value> {
    registry
        .descriptors()
        .into_iter()
        .map(|descriptor| descriptor.to_json())
        .collect()
}

/// Reads an invocation context from a JSON file shaped like
/// `{"execution_id": "...", "auth": {"github_token": "..."}, ...}`.
pub fn load_context_file(path: &Path) -> Result<InvocationContext> {
    let raw = fs::read_to_string(path).map_err(|err| {
        ToolkitError::Config(format!("failed to read context file `{}`: {err}", path.display()))
    })?;
    let value: Value = serde_json::from_str(&raw).map_err(|err| {
        ToolkitError::Config(format!("context file `{}` is not valid JSON: {err}", path.display()))
    })?;
    if !value.is_object() {
        return Err(ToolkitError::Config(format!(
            "context file `{}` must contain a JSON object",
            path.display()
        )));
    }
    Ok(InvocationContext::from_value(value))
}

pub fn parse_params(raw: &str) -> Result<Value> {
    serde_json::from_str(raw)
        .map_err(|err| ToolkitError::Config(format!("--params is not valid JSON: {err}")))
}
