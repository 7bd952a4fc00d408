//! Tool descriptors, the adapter that gives every tool the same invocation
//! contract, and the registry/toolkit aggregation surfaces.

pub mod adapter;
pub mod descriptor;
pub mod registry;
pub mod tool;
pub mod toolkit;

pub use adapter::ToolAdapter;
pub use descriptor::{ToolDescriptor, ToolDescriptorBuilder};
pub use registry::ToolRegistry;
pub use tool::{DynTool, ParamError, Tool, TypedTool, Validate};
pub use toolkit::{ActiveTools, Toolkit, ToolkitBuilder, ToolkitCategory, ToolkitSummary};
