use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::credentials::Credential;
use crate::error::Result;
use crate::tools::descriptor::ToolDescriptor;

/// Object-safe tool surface consumed by registries and agent runtimes.
#[async_trait]
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> &ToolDescriptor;

    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Runs the tool. Errors are always `Validation`,
    /// `AuthenticationMissing` or `ToolExecution`.
    async fn invoke(&self, params: Value) -> Result<Value>;
}

pub type DynTool = Arc<dyn Tool>;

/// A single invalid parameter found by [`Validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamError {
    pub field: String,
    pub message: String,
}

impl ParamError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Semantic checks that a schema cannot express.
pub trait Validate {
    fn validate(&self) -> std::result::Result<(), ParamError> {
        Ok(())
    }
}

/// Strongly typed tool body; wrap it in a
/// [`ToolAdapter`](crate::tools::ToolAdapter) to expose it as a [`Tool`].
#[async_trait]
pub trait TypedTool: Send + Sync + 'static {
    type Params: DeserializeOwned + Validate + Send;
    type Output: Serialize + Send;

    fn descriptor(&self) -> &ToolDescriptor;

    /// `credential` is `Some` whenever the descriptor's service requires
    /// auth.
    async fn execute(
        &self,
        params: Self::Params,
        credential: Option<&Credential>,
    ) -> Result<Self::Output>;
}
