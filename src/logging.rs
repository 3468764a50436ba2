//! Logging setup for the modscope binary.
//!
//! Logs go to stderr so that stdout carries only exported records.

use anyhow::{anyhow, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "modscope=info";
const VERBOSE_LOG_FILTER: &str = "modscope=debug";

/// Logging configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogConfig {
    pub verbose: bool,
}

impl LogConfig {
    /// The filter used when `RUST_LOG` is not set.
    pub fn default_filter(&self) -> &'static str {
        if self.verbose {
            VERBOSE_LOG_FILTER
        } else {
            DEFAULT_LOG_FILTER
        }
    }
}

/// Initialize tracing with stderr output.
///
/// `RUST_LOG` takes precedence over the verbosity flag.
pub fn init_logging(config: LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_filter()));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(LogConfig { verbose: false }.default_filter(), "modscope=info");
        assert_eq!(LogConfig { verbose: true }.default_filter(), "modscope=debug");
    }
}
