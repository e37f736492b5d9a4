//! Error types for the wordscope-search crate.
//!
//! Errors carry stable string messages for logging. None of them ever
//! reach the display surface: a failing source or provider simply
//! contributes no hits.

/// Errors that can occur while configuring or running word lookups.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Invalid engine, provider or cache configuration.
    #[error("config error: {0}")]
    Config(String),

    /// An upstream fetch failed at the transport or HTTP level.
    #[error("transport error: {0}")]
    Transport(String),

    /// An upstream response could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// A provider's startup hook failed.
    #[error("provider startup failed: {0}")]
    Startup(String),

    /// A provider's shutdown hook failed.
    #[error("provider shutdown failed: {0}")]
    Shutdown(String),

    /// A provider hook panicked instead of returning.
    #[error("provider error: {0}")]
    Provider(String),
}

/// Convenience type alias for wordscope-search results.
pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_config() {
        let err = SearchError::Config("cache_capacity must be greater than 0".into());
        assert_eq!(
            err.to_string(),
            "config error: cache_capacity must be greater than 0"
        );
    }

    #[test]
    fn display_transport() {
        let err = SearchError::Transport("connection refused".into());
        assert_eq!(err.to_string(), "transport error: connection refused");
    }

    #[test]
    fn display_parse() {
        let err = SearchError::Parse("expected a JSON array".into());
        assert_eq!(err.to_string(), "parse error: expected a JSON array");
    }

    #[test]
    fn display_startup() {
        let err = SearchError::Startup("warm-up request rejected".into());
        assert_eq!(
            err.to_string(),
            "provider startup failed: warm-up request rejected"
        );
    }

    #[test]
    fn display_shutdown() {
        let err = SearchError::Shutdown("client already closed".into());
        assert_eq!(
            err.to_string(),
            "provider shutdown failed: client already closed"
        );
    }

    #[test]
    fn display_provider() {
        let err = SearchError::Provider("startup hook panicked".into());
        assert_eq!(
            err.to_string(),
            "provider error: startup hook panicked"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SearchError>();
    }
}
