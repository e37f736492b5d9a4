//! wordscope: incremental word search over the Datamuse API.
//!
//! The search engine itself lives in the `wordscope-search` crate. This
//! crate wires it to a real data source and a headless host:
//! - **Config**: TOML file with `[engine]`, `[provider]`, `[datamuse]` and
//!   `[logging]` sections
//! - **Datamuse**: `reqwest` client implementing [`WordFetcher`], with retries
//! - **Host**: stdin lines in, JSON-line updates out
//!
//! [`WordFetcher`]: wordscope_search::WordFetcher

pub mod config;
pub mod datamuse;
pub mod error;
pub mod host;
pub mod logging;

pub use config::{AppConfig, LoggingConfig};
pub use datamuse::{DatamuseClient, DatamuseConfig};
pub use error::{AppError, Result};
pub use host::{Command, HitView};
