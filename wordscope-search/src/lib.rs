//! # wordscope-search
//!
//! Incremental multi-source word search for wordscope.
//!
//! As the user types, each keystroke starts a search session that
//! classifies the query, fans it out to every registered provider, merges
//! the asynchronously arriving hits into one ranked, deduplicated list and
//! delivers it in batches, while the next keystroke cancels and supersedes
//! everything still in flight.
//!
//! ## Design
//!
//! - [`classifier`] maps raw text to a [`QueryKind`] with ordered patterns
//! - [`provider::LookupProvider`] runs the intent's candidate sources
//!   concurrently, normalizes scores per batch, dedups by text and caches
//!   per normalized query in a FIFO [`cache::FifoCache`]
//! - [`lifecycle::ManagedProvider`] starts each provider once in the
//!   background and disables it for good if startup fails
//! - [`orchestrator::Aggregator`] owns the session, the busy, batch and
//!   no-matches timers, and the [`orchestrator::Signal`] channel
//! - The upstream data source is a [`fetcher::WordFetcher`]; its errors
//!   become "no hits" and are never retried here
//!
//! ## Privacy
//!
//! - Query text is logged only at trace level
//! - Nothing is persisted; the cache lives in memory and is cleared on
//!   provider shutdown

pub mod cache;
pub mod classifier;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod lifecycle;
pub mod orchestrator;
pub mod provider;
pub mod registry;
pub mod source;
pub mod types;

use std::sync::Arc;

pub use cache::{FifoCache, HitCache};
pub use classifier::{classify, QueryClassifier};
pub use config::{EngineConfig, ProviderConfig};
pub use error::{Result, SearchError};
pub use fetcher::{FetchRequest, WildcardSyntax, WordFetcher};
pub use lifecycle::{ManagedProvider, ProviderState};
pub use orchestrator::{Aggregator, SessionId, SessionOutcome, Signal, Update};
pub use provider::{HitStream, LookupProvider, SearchProvider};
pub use registry::{ProviderFactory, ProviderRegistry};
pub use types::{ActionFactory, Hit, HitAction, ParsedQuery, QueryKind, RawRecord, SourceKind};

/// Look up `text` once, without sessions or timers.
///
/// Classifies the query with the provider's length policy and returns the
/// ranked, deduplicated hits from every matching source.
///
/// # Errors
///
/// Returns [`SearchError::Config`] if `config` is invalid. Upstream
/// failures are not errors; they contribute no hits.
///
/// # Examples
///
/// ```no_run
/// # use std::sync::Arc;
/// # async fn example(fetcher: Arc<dyn wordscope_search::WordFetcher>) -> wordscope_search::Result<()> {
/// let config = wordscope_search::ProviderConfig::default();
/// let hits = wordscope_search::lookup_once(fetcher, "apple", config).await?;
/// for hit in &hits {
///     println!("{:.2} {}", hit.score(), hit.text());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn lookup_once(
    fetcher: Arc<dyn WordFetcher>,
    text: &str,
    config: ProviderConfig,
) -> Result<Vec<Hit>> {
    let classifier = QueryClassifier::new(config.min_query_chars);
    let provider = LookupProvider::new("lookup", fetcher, config)?;
    let parsed = classifier.classify(text);
    if !parsed.kind.is_searchable() {
        return Ok(Vec::new());
    }
    Ok(provider.lookup(&parsed).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Fixed;

    #[async_trait]
    impl WordFetcher for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch(&self, request: &FetchRequest) -> Result<Vec<RawRecord>> {
            Ok(vec![
                RawRecord::new(format!("{}-a", request.text), 2.0),
                RawRecord::new(format!("{}-b", request.text), 1.0),
            ])
        }
    }

    #[tokio::test]
    async fn lookup_once_validates_config() {
        let config = ProviderConfig {
            fetch_limit: 0,
            ..Default::default()
        };
        let result = lookup_once(Arc::new(Fixed), "apple", config).await;
        assert!(result.unwrap_err().to_string().contains("fetch_limit"));
    }

    #[tokio::test]
    async fn lookup_once_skips_unknown_queries() {
        let hits = lookup_once(Arc::new(Fixed), "xyz123!", ProviderConfig::default())
            .await
            .expect("lookup");
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn lookup_once_ranks_hits() {
        let hits = lookup_once(Arc::new(Fixed), "Apple", ProviderConfig::default())
            .await
            .expect("lookup");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text(), "apple-a");
    }
}
