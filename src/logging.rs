//! Tracing setup for the host binary.
//!
//! All output goes to stderr so stdout stays a clean JSON-lines channel.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Build the filter: `RUST_LOG` if set and valid, otherwise the configured
/// level, otherwise `info`.
pub fn filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global stderr subscriber.
///
/// A second call is a no-op.
pub fn init(config: &LoggingConfig) {
    let installed = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter(config))
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_is_harmless() {
        let config = LoggingConfig::default();
        init(&config);
        init(&config);
    }

    #[test]
    fn bad_level_falls_back() {
        let config = LoggingConfig {
            level: "=[not a directive".into(),
        };
        // Must not panic; the exact directive depends on RUST_LOG.
        let _ = filter(&config);
    }
}
