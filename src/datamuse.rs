//! Datamuse word-finding API client.
//!
//! Implements [`WordFetcher`] over the public Datamuse endpoints:
//!
//! | Source        | Request                         |
//! |---------------|---------------------------------|
//! | autocomplete  | `GET {base}/sug?s=..&max=..`    |
//! | sounds-like   | `GET {base}/words?sl=..&max=..` |
//! | means-like    | `GET {base}/words?ml=..&max=..` |
//! | spelled-like  | `GET {base}/words?sp=..&max=..` |
//!
//! Transport errors, 5xx and 429 responses are retried with exponential
//! backoff. The engine never retries on its own.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;
use wordscope_search::{FetchRequest, RawRecord, SearchError, SourceKind, WordFetcher};

use crate::error::{AppError, Result};

/// Largest `max` the API accepts.
pub const MAX_LIMIT: usize = 1000;

/// Datamuse client settings, the `[datamuse]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatamuseConfig {
    /// Register the Datamuse provider at startup.
    pub enabled: bool,
    /// API root, without a trailing path.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout_ms: u64,
    /// Result count used when a request asks for an unsupported limit.
    pub default_limit: usize,
    /// Extra attempts after the first failed one.
    pub retries: u32,
    /// Base delay before the first retry; doubles each attempt.
    pub retry_backoff_ms: u64,
}

impl Default for DatamuseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.datamuse.com".to_owned(),
            timeout_ms: 1000,
            default_limit: 100,
            retries: 5,
            retry_backoff_ms: 500,
        }
    }
}

impl DatamuseConfig {
    /// Validate the section.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] for an empty or unparseable base URL, a
    /// zero timeout, or a default limit outside `1..=1000`.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(AppError::Config("datamuse.base_url must not be empty".into()));
        }
        let url = Url::parse(&self.base_url)
            .map_err(|e| AppError::Config(format!("datamuse.base_url is invalid: {e}")))?;
        if url.cannot_be_a_base() {
            return Err(AppError::Config(format!(
                "datamuse.base_url cannot carry a path: {}",
                self.base_url
            )));
        }
        if self.timeout_ms == 0 {
            return Err(AppError::Config("datamuse.timeout_ms must be > 0".into()));
        }
        if !(1..=MAX_LIMIT).contains(&self.default_limit) {
            return Err(AppError::Config(format!(
                "datamuse.default_limit must be within 1..={MAX_LIMIT}, got {}",
                self.default_limit
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// `limit` if the API accepts it, otherwise the configured default.
    pub fn effective_limit(&self, limit: usize) -> usize {
        if (1..=MAX_LIMIT).contains(&limit) {
            limit
        } else {
            self.default_limit
        }
    }

    /// Delay before retry number `attempt` (0-based), without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.min(16);
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(factor))
    }
}

/// HTTP client for the Datamuse API.
#[derive(Debug, Clone)]
pub struct DatamuseClient {
    client: reqwest::Client,
    base: Url,
    config: DatamuseConfig,
}

impl DatamuseClient {
    /// Build a client from a validated config.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] if `config` is invalid, or
    /// [`AppError::Http`] if the HTTP client cannot be constructed.
    pub fn new(config: DatamuseConfig) -> Result<Self> {
        config.validate()?;
        let base = Url::parse(&config.base_url)
            .map_err(|e| AppError::Config(format!("datamuse.base_url is invalid: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("wordscope/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base,
            config,
        })
    }

    pub fn config(&self) -> &DatamuseConfig {
        &self.config
    }

    /// The request URL for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the base URL cannot carry a path.
    pub fn request_url(&self, request: &FetchRequest) -> std::result::Result<Url, SearchError> {
        let (endpoint, param) = endpoint(request.kind);
        let value = request.text.trim().to_lowercase();
        let limit = self.config.effective_limit(request.limit);

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| SearchError::Config(format!("base URL cannot carry a path: {}", self.base)))?
            .pop_if_empty()
            .push(endpoint);
        url.query_pairs_mut()
            .append_pair(param, &value)
            .append_pair("max", &limit.to_string());
        Ok(url)
    }

    async fn get_with_retry(&self, url: &Url) -> std::result::Result<String, SearchError> {
        let mut attempt = 0u32;
        loop {
            let failure = match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.text().await.map_err(|e| {
                            SearchError::Transport(format!("failed to read datamuse body: {e}"))
                        });
                    }
                    let err = SearchError::Transport(format!("datamuse returned HTTP {status}"));
                    if !is_retryable(status) {
                        return Err(err);
                    }
                    err
                }
                Err(e) => SearchError::Transport(format!("datamuse request failed: {e}")),
            };

            if attempt >= self.config.retries {
                return Err(failure);
            }
            let delay = with_jitter(self.config.backoff(attempt));
            tracing::debug!(
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "retrying datamuse request"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl WordFetcher for DatamuseClient {
    fn name(&self) -> &str {
        "datamuse"
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
    ) -> std::result::Result<Vec<RawRecord>, SearchError> {
        let url = self.request_url(request)?;
        tracing::trace!(url = %url, "datamuse request");
        let body = self.get_with_retry(&url).await?;
        let records: Vec<RawRecord> = serde_json::from_str(&body)
            .map_err(|e| SearchError::Parse(format!("invalid datamuse response: {e}")))?;
        tracing::debug!(source = request.kind.label(), count = records.len(), "datamuse records");
        Ok(records)
    }

    async fn close(&self) -> std::result::Result<(), SearchError> {
        tracing::debug!("datamuse client closed");
        Ok(())
    }
}

fn endpoint(kind: SourceKind) -> (&'static str, &'static str) {
    match kind {
        SourceKind::Autocomplete => ("sug", "s"),
        SourceKind::SoundsLike => ("words", "sl"),
        SourceKind::MeansLike => ("words", "ml"),
        SourceKind::SpelledLike => ("words", "sp"),
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Add up to 25% random jitter to `delay`.
fn with_jitter(delay: Duration) -> Duration {
    let base = delay.as_millis() as u64;
    if base < 4 {
        return delay;
    }
    let extra = rand::thread_rng().gen_range(0..=base / 4);
    Duration::from_millis(base + extra)
}
