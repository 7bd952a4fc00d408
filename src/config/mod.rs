mod settings;

pub use settings::{ProviderSettings, ServiceStatus};
