pub mod cli;
pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod integrations;
pub mod schema;
pub mod tools;
pub mod transport;
pub mod utils;

pub use cli::{descriptor_exports, load_context_file, tool_catalog, ToolCatalogEntry};
pub use config::{ProviderSettings, ServiceStatus};
pub use context::{
    bind, current_context, scope, sync_scope, AuthCallback, AuthSource, InvocationContext,
    InvocationContextBuilder,
};
pub use credentials::{Credential, CredentialResolver, CredentialSource, ServiceKey};
pub use error::{FailureCategory, Result, ToolkitError};
pub use integrations::{builtin_registry, builtin_registry_with, builtin_toolkits, BaseUrls};
pub use schema::{validate_value, Schema, SchemaError, SchemaKind};
pub use tools::{
    ActiveTools, DynTool, ParamError, Tool, ToolAdapter, ToolDescriptor, ToolDescriptorBuilder,
    ToolRegistry, Toolkit, ToolkitCategory, TypedTool, Validate,
};
pub use transport::{
    DynTransport, HttpTransport, Transport, TransportError, UpstreamRequest, UpstreamResponse,
};
pub use utils::{logging, validation, LoggingConfig};
