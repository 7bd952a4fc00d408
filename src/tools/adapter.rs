use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, field, info_span, warn, Instrument};

use crate::context;
use crate::credentials::{CredentialResolver, ServiceKey};
use crate::error::{FailureCategory, Result, ToolkitError};
use crate::schema::{validate_value, SchemaError};
use crate::tools::descriptor::ToolDescriptor;
use crate::tools::tool::{DynTool, ParamError, Tool, TypedTool, Validate};

/// Exposes a [`TypedTool`] through the uniform [`Tool`] contract.
///
/// Per invocation: validate input, resolve the credential (only when the
/// service needs one), execute, serialize. Credentials are resolved lazily
/// and never cached, so each call observes its own invocation context.
pub struct ToolAdapter<T> {
    inner: T,
    resolver: CredentialResolver,
}

impl<T: TypedTool> ToolAdapter<T> {
    pub fn new(inner: T, resolver: CredentialResolver) -> Self {
        Self { inner, resolver }
    }

    pub fn into_dyn(self) -> DynTool {
        Arc::new(self)
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    fn parse(&self, params: Value) -> Result<T::Params> {
        let descriptor = self.inner.descriptor();
        let mut path = Vec::new();
        if let Err(SchemaError::Validation { message, path }) =
            validate_value(&descriptor.parameters, &params, &mut path)
        {
            return Err(ToolkitError::Validation {
                tool: descriptor.name.clone(),
                message,
                path,
            });
        }

        let typed: T::Params = serde_json::from_value(params)
            .map_err(|err| ToolkitError::validation(&descriptor.name, err.to_string()))?;

        if let Err(ParamError { field, message }) = typed.validate() {
            return Err(ToolkitError::Validation {
                tool: descriptor.name.clone(),
                message: format!("`{field}` {message}"),
                path: vec![field],
            });
        }
        Ok(typed)
    }

    async fn run(&self, params: Value) -> Result<Value> {
        let descriptor = self.inner.descriptor();
        let service = descriptor.service;
        let typed = self.parse(params)?;

        let credential = if descriptor.requires_auth() {
            Some(self.resolver.resolve(service)?)
        } else {
            None
        };

        let output = self
            .inner
            .execute(typed, credential.as_ref())
            .await
            .map_err(|err| into_boundary(service, err))?;

        serde_json::to_value(output).map_err(|err| {
            ToolkitError::execution(
                service,
                FailureCategory::Decode,
                None,
                format!("failed to encode result: {err}"),
            )
        })
    }
}

fn into_boundary(service: ServiceKey, err: ToolkitError) -> ToolkitError {
    if err.is_boundary_kind() {
        err
    } else {
        ToolkitError::execution(service, FailureCategory::Upstream, None, err.to_string())
    }
}

#[async_trait]
impl<T: TypedTool> Tool for ToolAdapter<T> {
    fn descriptor(&self) -> &ToolDescriptor {
        self.inner.descriptor()
    }

    async fn invoke(&self, params: Value) -> Result<Value> {
        let descriptor = self.inner.descriptor();
        let span = info_span!(
            "tool.invoke",
            tool = %descriptor.name,
            service = %descriptor.service,
            execution_id = field::Empty,
        );
        if let Some(id) = context::current_context()
            .as_deref()
            .and_then(|ctx| ctx.execution_id().map(str::to_owned))
        {
            span.record("execution_id", id.as_str());
        }

        async {
            let outcome = self.run(params).await;
            match &outcome {
                Ok(_) => debug!("tool invocation succeeded"),
                Err(err) => warn!(kind = err.kind(), %err, "tool invocation failed"),
            }
            outcome
        }
        .instrument(span)
        .await
    }
}
