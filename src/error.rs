//! Error types for the wordscope host.

use wordscope_search::SearchError;

/// Top-level error type for the host process.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Datamuse request or response error.
    #[error("datamuse error: {0}")]
    Datamuse(String),

    /// Stdin/stdout protocol error.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Engine error.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AppError>;
