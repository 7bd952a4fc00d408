use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::credentials::ServiceKey;
use crate::error::{Result, ToolkitError};
use crate::tools::tool::DynTool;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolkitCategory {
    Channel,
    Tool,
    #[default]
    Other,
}

/// Which members of a toolkit are exposed to agents.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveTools {
    #[default]
    All,
    Only(Vec<String>),
}

impl ActiveTools {
    pub fn contains(&self, name: &str) -> bool {
        match self {
            ActiveTools::All => true,
            ActiveTools::Only(names) => names.iter().any(|n| n == name),
        }
    }
}

/// A named group of tools bound to one upstream service.
#[derive(Clone)]
pub struct Toolkit {
    id: String,
    name: String,
    description: String,
    category: ToolkitCategory,
    service: Option<ServiceKey>,
    requires_config: bool,
    is_app_default: bool,
    tools: Vec<DynTool>,
    active: ActiveTools,
}

/// Serializable view for listings.
#[derive(Clone, Debug, Serialize)]
pub struct ToolkitSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: ToolkitCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_key: Option<&'static str>,
    pub requires_config: bool,
    pub is_app_default: bool,
    pub tools: Vec<String>,
    pub active_tools: Vec<String>,
}

impl Toolkit {
    pub fn builder(id: impl Into<String>, name: impl Into<String>) -> ToolkitBuilder {
        ToolkitBuilder::new(id, name)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> ToolkitCategory {
        self.category
    }

    pub fn service(&self) -> Option<ServiceKey> {
        self.service
    }

    /// Context key the toolkit's credential bundle is read from.
    pub fn auth_key(&self) -> Option<&'static str> {
        self.service
            .filter(ServiceKey::requires_auth)
            .map(|service| service.auth_key())
    }

    pub fn requires_config(&self) -> bool {
        self.requires_config
    }

    pub fn is_app_default(&self) -> bool {
        self.is_app_default
    }

    pub fn active_tools(&self) -> &ActiveTools {
        &self.active
    }

    /// Every member, active or not.
    pub fn tools(&self) -> &[DynTool] {
        &self.tools
    }

    pub fn to_tool_list(&self) -> Vec<DynTool> {
        self.tools
            .iter()
            .filter(|tool| self.active.contains(tool.name()))
            .cloned()
            .collect()
    }

    fn member(&self, name: &str) -> Result<&DynTool> {
        self.tools
            .iter()
            .find(|tool| tool.name() == name)
            .ok_or_else(|| ToolkitError::ToolNotRegistered(format!("{}/{name}", self.id)))
    }

    pub fn add_tool(&mut self, name: &str) -> Result<()> {
        self.member(name)?;
        if let ActiveTools::Only(names) = &mut self.active {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        Ok(())
    }

    pub fn remove_tool(&mut self, name: &str) -> Result<()> {
        self.member(name)?;
        self.active = match std::mem::take(&mut self.active) {
            ActiveTools::All => ActiveTools::Only(
                self.tools
                    .iter()
                    .map(|tool| tool.name().to_string())
                    .filter(|n| n != name)
                    .collect(),
            ),
            ActiveTools::Only(mut names) => {
                names.retain(|n| n != name);
                ActiveTools::Only(names)
            }
        };
        Ok(())
    }

    /// Runs an active member under whatever context is currently installed.
    pub async fn run_tool(&self, name: &str, params: Value) -> Result<Value> {
        let tool = self.member(name)?;
        if !self.active.contains(name) {
            return Err(ToolkitError::ToolNotRegistered(format!("{}/{name}", self.id)));
        }
        tool.invoke(params).await
    }

    pub fn summary(&self) -> ToolkitSummary {
        ToolkitSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category,
            auth_key: self.auth_key(),
            requires_config: self.requires_config,
            is_app_default: self.is_app_default,
            tools: self.tools.iter().map(|t| t.name().to_string()).collect(),
            active_tools: self
                .to_tool_list()
                .iter()
                .map(|t| t.name().to_string())
                .collect(),
        }
    }
}

impl std::fmt::Debug for Toolkit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolkit")
            .field("id", &self.id)
            .field("service", &self.service)
            .field(
                "tools",
                &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("active", &self.active)
            .finish()
    }
}

pub struct ToolkitBuilder {
    toolkit: Toolkit,
}

impl ToolkitBuilder {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            toolkit: Toolkit {
                id: id.into(),
                name: name.into(),
                description: String::new(),
                category: ToolkitCategory::default(),
                service: None,
                requires_config: false,
                is_app_default: false,
                tools: Vec::new(),
                active: ActiveTools::All,
            },
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.toolkit.description = description.into();
        self
    }

    pub fn category(mut self, category: ToolkitCategory) -> Self {
        self.toolkit.category = category;
        self
    }

    pub fn service(mut self, service: ServiceKey) -> Self {
        self.toolkit.service = Some(service);
        self
    }

    pub fn requires_config(mut self, requires_config: bool) -> Self {
        self.toolkit.requires_config = requires_config;
        self
    }

    pub fn app_default(mut self, is_app_default: bool) -> Self {
        self.toolkit.is_app_default = is_app_default;
        self
    }

    pub fn tool(mut self, tool: DynTool) -> Self {
        self.toolkit.tools.push(tool);
        self
    }

    pub fn active_tools(mut self, active: ActiveTools) -> Self {
        self.toolkit.active = active;
        self
    }

    pub fn build(self) -> Result<Toolkit> {
        let toolkit = self.toolkit;
        for (idx, tool) in toolkit.tools.iter().enumerate() {
            if let Some(service) = toolkit.service {
                if tool.descriptor().service != service {
                    return Err(ToolkitError::ManifestMismatch {
                        kind: "toolkit",
                        name: tool.name().to_string(),
                    });
                }
            }
            if toolkit.tools[..idx].iter().any(|t| t.name() == tool.name()) {
                return Err(ToolkitError::DuplicateTool(tool.name().to_string()));
            }
        }
        if let ActiveTools::Only(names) = &toolkit.active {
            if let Some(unknown) = names
                .iter()
                .find(|n| !toolkit.tools.iter().any(|t| t.name() == n.as_str()))
            {
                return Err(ToolkitError::ToolNotRegistered(format!(
                    "{}/{unknown}",
                    toolkit.id
                )));
            }
        }
        Ok(toolkit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::tools::{Tool, ToolDescriptor};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct Named(ToolDescriptor);

    #[async_trait]
    impl Tool for Named {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.0
        }

        async fn invoke(&self, params: Value) -> Result<Value> {
            Ok(json!({"tool": self.0.name, "params": params}))
        }
    }

    fn tool(name: &str, service: ServiceKey) -> DynTool {
        Arc::new(Named(
            ToolDescriptor::builder(name, service)
                .parameters(Schema::object())
                .build(),
        ))
    }

    fn dex_toolkit() -> Toolkit {
        Toolkit::builder("dex_toolkit", "DEX")
            .service(ServiceKey::DexScreener)
            .category(ToolkitCategory::Tool)
            .tool(tool("dex_search_pairs", ServiceKey::DexScreener))
            .tool(tool("dex_get_pair", ServiceKey::DexScreener))
            .build()
            .unwrap()
    }

    #[test]
    fn public_toolkits_have_no_auth_key() {
        let toolkit = dex_toolkit();
        assert_eq!(toolkit.auth_key(), None);
        assert_eq!(toolkit.to_tool_list().len(), 2);
        assert_eq!(toolkit.summary().tools, vec!["dex_search_pairs", "dex_get_pair"]);
    }

    #[test]
    fn remove_then_add_round_trips_active_set() {
        let mut toolkit = dex_toolkit();
        toolkit.remove_tool("dex_get_pair").unwrap();
        assert_eq!(
            toolkit.active_tools(),
            &ActiveTools::Only(vec!["dex_search_pairs".into()])
        );
        assert_eq!(toolkit.to_tool_list().len(), 1);

        toolkit.add_tool("dex_get_pair").unwrap();
        assert_eq!(toolkit.to_tool_list().len(), 2);
        assert!(toolkit.add_tool("nope").is_err());
        assert!(toolkit.remove_tool("nope").is_err());
    }

    #[tokio::test]
    async fn run_tool_only_runs_active_members() {
        let mut toolkit = dex_toolkit();
        let out = toolkit
            .run_tool("dex_search_pairs", json!({"query": "sol"}))
            .await
            .unwrap();
        assert_eq!(out["tool"], "dex_search_pairs");

        toolkit.remove_tool("dex_search_pairs").unwrap();
        let err = toolkit
            .run_tool("dex_search_pairs", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "tool_not_registered");
    }

    #[test]
    fn builder_rejects_foreign_and_duplicate_members() {
        let foreign = Toolkit::builder("github_toolkit", "GitHub")
            .service(ServiceKey::Github)
            .tool(tool("jina_search", ServiceKey::Jina))
            .build()
            .unwrap_err();
        assert!(matches!(foreign, ToolkitError::ManifestMismatch { .. }));

        let duplicate = Toolkit::builder("dex", "DEX")
            .tool(tool("dex_get_pair", ServiceKey::DexScreener))
            .tool(tool("dex_get_pair", ServiceKey::DexScreener))
            .build()
            .unwrap_err();
        assert!(matches!(duplicate, ToolkitError::DuplicateTool(_)));

        let unknown_active = Toolkit::builder("dex", "DEX")
            .tool(tool("dex_get_pair", ServiceKey::DexScreener))
            .active_tools(ActiveTools::Only(vec!["dex_search_pairs".into()]))
            .build();
        assert!(unknown_active.is_err());
    }

    #[test]
    fn auth_key_follows_service() {
        let toolkit = Toolkit::builder("telegram_toolkit", "Telegram")
            .service(ServiceKey::Telegram)
            .category(ToolkitCategory::Channel)
            .build()
            .unwrap();
        assert_eq!(toolkit.auth_key(), Some("telegram_bot_token"));
    }
}
