mod credential;
mod resolver;
mod service;

pub use credential::{Credential, CredentialSource};
pub use resolver::CredentialResolver;
pub use service::ServiceKey;
