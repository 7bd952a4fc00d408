use std::env;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEBUG_VAR: &str = "PYRAMID_TOOLS_DEBUG";

/// Logging setup for binaries and examples embedding the toolkit.
pub struct LoggingConfig;

impl LoggingConfig {
    /// Installs a global subscriber.
    ///
    /// - `RUST_LOG` overrides the filter (error, warn, info, debug, trace)
    /// - `PYRAMID_TOOLS_DEBUG` switches to verbose output with targets,
    ///   file/line and thread ids
    ///
    /// Safe to call more than once; later calls are ignored.
    ///
    /// ```no_run
    /// use pyramid_tools::utils::LoggingConfig;
    ///
    /// LoggingConfig::init();
    /// tracing::info!("ready");
    /// ```
    pub fn init() {
        let is_debug = Self::is_debug();

        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => {
                if is_debug {
                    EnvFilter::new("pyramid_tools=debug,info")
                } else {
                    EnvFilter::new("pyramid_tools=info,warn")
                }
            }
        };

        let fmt_layer = if is_debug {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true)
        } else {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_file(false)
                .with_line_number(false)
                .with_thread_ids(false)
        };

        let installed = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .is_ok();

        if installed && is_debug {
            tracing::debug!("debug logging enabled");
        }
    }

    /// Installs a subscriber with an explicit filter, e.g. `"pyramid_tools=trace"`.
    pub fn init_with_filter(filter: &str) {
        let env_filter = EnvFilter::new(filter);

        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init();
    }

    pub fn is_debug() -> bool {
        env::var(DEBUG_VAR).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_debug() {
        env::remove_var(DEBUG_VAR);
        assert!(!LoggingConfig::is_debug());

        env::set_var(DEBUG_VAR, "1");
        assert!(LoggingConfig::is_debug());

        env::remove_var(DEBUG_VAR);
    }
}
