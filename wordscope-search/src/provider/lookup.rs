//! The word-lookup provider: classify, replay cache, fan out, rank, cache.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_stream::stream;
use async_trait::async_trait;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use super::dedup::{deduplicate, sort_by_score};
use super::{HitStream, SearchProvider};
use crate::cache::HitCache;
use crate::classifier::QueryClassifier;
use crate::config::ProviderConfig;
use crate::error::SearchError;
use crate::fetcher::WordFetcher;
use crate::source::CandidateSource;
use crate::types::{noop_actions, ActionFactory, Hit, ParsedQuery, QueryKind, SourceKind};

/// Provider backed by one [`WordFetcher`].
///
/// # Pipeline
///
/// 1. Classify with the length policy; `Unknown` yields nothing
/// 2. Replay a non-empty cache entry for the normalized text
/// 3. Run the intent's candidate sources concurrently
/// 4. Deduplicate by text, drop hits below `min_score`, sort descending
/// 5. Cache the ranked list, then yield it
///
/// Every field is shared, so clones are cheap and see the same cache.
#[derive(Clone)]
pub struct LookupProvider {
    name: Arc<str>,
    fetcher: Arc<dyn WordFetcher>,
    classifier: QueryClassifier,
    config: Arc<ProviderConfig>,
    cache: Arc<Mutex<HitCache>>,
    actions: ActionFactory,
}

impl LookupProvider {
    /// Create a provider.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `config` fails validation.
    pub fn new(
        name: impl Into<Arc<str>>,
        fetcher: Arc<dyn WordFetcher>,
        config: ProviderConfig,
    ) -> Result<Self, SearchError> {
        config.validate()?;
        let cache = HitCache::new(config.cache_capacity)?;
        Ok(Self {
            name: name.into(),
            fetcher,
            classifier: QueryClassifier::new(config.min_query_chars),
            config: Arc::new(config),
            cache: Arc::new(Mutex::new(cache)),
            actions: noop_actions(),
        })
    }

    /// Replace the factory that builds each hit's selection action.
    pub fn with_actions(mut self, actions: ActionFactory) -> Self {
        self.actions = actions;
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// The candidate sources queried for an intent, in merge order.
    pub fn sources_for(&self, kind: QueryKind) -> Vec<CandidateSource> {
        let kinds: &[SourceKind] = match kind {
            QueryKind::SpelledLike => &[SourceKind::SpelledLike],
            QueryKind::SuggestSoundsLike => &[SourceKind::Autocomplete, SourceKind::SoundsLike],
            QueryKind::SuggestMeansLike => &[SourceKind::Autocomplete, SourceKind::MeansLike],
            QueryKind::Unknown => &[],
        };
        kinds
            .iter()
            .map(|kind| CandidateSource::new(*kind, Arc::clone(&self.fetcher)))
            .collect()
    }

    /// Cached hits for a normalized query, empty on a miss.
    pub fn cached(&self, text: &str) -> Vec<Hit> {
        self.lock_cache()
            .get(&text.to_string())
            .cloned()
            .unwrap_or_default()
    }

    /// Number of cached queries.
    pub fn cached_queries(&self) -> usize {
        self.lock_cache().len()
    }

    /// Run a fresh lookup and store the ranked result.
    ///
    /// Sub-fetch failures contribute nothing; this never fails.
    pub async fn lookup(&self, query: &ParsedQuery) -> Vec<Hit> {
        let sources = self.sources_for(query.kind);
        if sources.is_empty() {
            return Vec::new();
        }

        let limit = self.config.fetch_limit;
        let batches = join_all(
            sources
                .iter()
                .map(|source| source.collect(&query.text, limit, &self.actions)),
        )
        .await;

        let min_score = self.config.min_score;
        let mut ranked = deduplicate(batches.into_iter().flatten());
        ranked.retain(|hit| hit.score() >= min_score);
        sort_by_score(&mut ranked);

        tracing::debug!(
            provider = %self.name,
            kind = %query.kind,
            count = ranked.len(),
            "lookup ranked hits"
        );

        if let Some((evicted, _)) = self
            .lock_cache()
            .insert(query.text.clone(), ranked.clone())
        {
            tracing::trace!(provider = %self.name, %evicted, "evicted cached query");
        }
        ranked
    }

    fn lock_cache(&self) -> MutexGuard<'_, HitCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SearchProvider for LookupProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn startup(&self) -> Result<(), SearchError> {
        tracing::debug!(provider = %self.name, fetcher = self.fetcher.name(), "lookup provider ready");
        Ok(())
    }

    fn search(&self, query: &str, cancel: CancellationToken) -> HitStream {
        let this = self.clone();
        let parsed = self.classifier.classify(query);

        Box::pin(stream! {
            if !parsed.kind.is_searchable() {
                tracing::trace!(provider = %this.name, query = %parsed.text, "query not searchable");
                return;
            }
            tracing::trace!(provider = %this.name, query = %parsed.text, kind = %parsed.kind, "lookup");

            for hit in this.cached(&parsed.text) {
                if cancel.is_cancelled() {
                    return;
                }
                yield hit.mark_speculative();
            }

            let fresh = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                hits = this.lookup(&parsed) => hits,
            };

            for hit in fresh {
                if cancel.is_cancelled() {
                    return;
                }
                yield hit;
            }
        })
    }

    async fn shutdown(&self) -> Result<(), SearchError> {
        self.lock_cache().clear();
        self.fetcher
            .close()
            .await
            .map_err(|err| SearchError::Shutdown(err.to_string()))
    }
}

impl std::fmt::Debug for LookupProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupProvider")
            .field("name", &self.name)
            .field("fetcher", &self.fetcher.name())
            .field("classifier", &self.classifier)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
