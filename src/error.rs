use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::credentials::ServiceKey;

pub type Result<T> = std::result::Result<T, ToolkitError>;

/// Coarse classification of an upstream failure, used by callers to pick a
/// retry policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    Timeout,
    Connect,
    Status,
    RateLimited,
    Decode,
    Upstream,
}

impl FailureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCategory::Timeout => "timeout",
            FailureCategory::Connect => "connect",
            FailureCategory::Status => "status",
            FailureCategory::RateLimited => "rate_limited",
            FailureCategory::Decode => "decode",
            FailureCategory::Upstream => "upstream",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" {s}")).unwrap_or_default()
}

#[derive(Debug, Error)]
pub enum ToolkitError {
    #[error("invalid parameters for `{tool}`: {message}")]
    Validation {
        tool: String,
        message: String,
        path: Vec<String>,
    },
    #[error("no credential for `{tool_key}` ({reason}); provide it in the invocation context or set {env_hint}")]
    AuthenticationMissing {
        tool_key: String,
        reason: String,
        env_hint: String,
    },
    #[error("{service} call failed [{category}{}]: {message}", status_suffix(.status))]
    ToolExecution {
        service: ServiceKey,
        category: FailureCategory,
        status: Option<u16>,
        message: String,
    },
    #[error("tool `{0}` not registered")]
    ToolNotRegistered(String),
    #[error("tool `{0}` is already registered")]
    DuplicateTool(String),
    #[error("{kind} descriptor does not match `{name}`")]
    ManifestMismatch { kind: &'static str, name: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ToolkitError {
    pub fn validation(tool: impl Into<String>, message: impl Into<String>) -> Self {
        ToolkitError::Validation {
            tool: tool.into(),
            message: message.into(),
            path: Vec::new(),
        }
    }

    pub fn missing_credential(service: ServiceKey, reason: impl Into<String>) -> Self {
        ToolkitError::AuthenticationMissing {
            tool_key: service.auth_key().to_string(),
            reason: reason.into(),
            env_hint: service.env_hint(),
        }
    }

    pub fn execution(
        service: ServiceKey,
        category: FailureCategory,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        ToolkitError::ToolExecution {
            service,
            category,
            status,
            message: message.into(),
        }
    }

    /// Stable code for logs and machine-readable output.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolkitError::Validation { .. } => "validation",
            ToolkitError::AuthenticationMissing { .. } => "authentication_missing",
            ToolkitError::ToolExecution { .. } => "tool_execution",
            ToolkitError::ToolNotRegistered(_) => "tool_not_registered",
            ToolkitError::DuplicateTool(_) => "duplicate_tool",
            ToolkitError::ManifestMismatch { .. } => "manifest_mismatch",
            ToolkitError::Config(_) => "config",
            ToolkitError::Other(_) => "other",
        }
    }

    /// Whether the caller's retry policy may reasonably try again. The crate
    /// itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            ToolkitError::ToolExecution {
                category, status, ..
            } => match category {
                FailureCategory::Timeout
                | FailureCategory::Connect
                | FailureCategory::RateLimited => true,
                FailureCategory::Status => status.is_some_and(|s| s >= 500),
                FailureCategory::Decode | FailureCategory::Upstream => false,
            },
            _ => false,
        }
    }

    /// True for the three kinds allowed to cross the adapter boundary.
    pub fn is_boundary_kind(&self) -> bool {
        matches!(
            self,
            ToolkitError::Validation { .. }
                | ToolkitError::AuthenticationMissing { .. }
                | ToolkitError::ToolExecution { .. }
        )
    }
}
