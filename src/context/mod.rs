//! Invocation context and the per-execution channel that carries it to tools.

mod invocation;
mod scope;

pub use invocation::{AuthCallback, AuthSource, InvocationContext, InvocationContextBuilder};
pub use scope::{bind, current_context, scope, sync_scope};
