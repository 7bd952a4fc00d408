use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::context::{self, InvocationContext};
use crate::error::{Result, ToolkitError};
use crate::tools::descriptor::ToolDescriptor;
use crate::tools::tool::DynTool;
use crate::tools::toolkit::Toolkit;

/// Name-indexed catalog of tools, the discovery surface for agent runtimes
/// and protocol bridges.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, DynTool>,
    toolkits: Vec<Toolkit>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: DynTool) -> Result<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolkitError::DuplicateTool(name));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Registers the toolkit's active tools and keeps the toolkit for listings.
    pub fn register_toolkit(&mut self, toolkit: Toolkit) -> Result<()> {
        for tool in toolkit.to_tool_list() {
            self.register(tool)?;
        }
        self.toolkits.push(toolkit);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<DynTool> {
        self.tools.get(name).map(Arc::clone)
    }

    pub fn descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name).map(|tool| tool.descriptor())
    }

    /// All descriptors, ordered by tool name.
    pub fn descriptors(&self) -> Vec<&ToolDescriptor> {
        self.tools.values().map(|tool| tool.descriptor()).collect()
    }

    pub fn toolkits(&self) -> &[Toolkit] {
        &self.toolkits
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invokes `name` with `ctx` as the only visible invocation context.
    ///
    /// With `ctx = None` the tool runs under whatever context the caller has
    /// already installed.
    pub async fn invoke(
        &self,
        name: &str,
        params: Value,
        ctx: Option<Arc<InvocationContext>>,
    ) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolkitError::ToolNotRegistered(name.to_string()))?;
        match ctx {
            Some(ctx) => context::scope(ctx, tool.invoke(params)).await,
            None => tool.invoke(params).await,
        }
    }
}
