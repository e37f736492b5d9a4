//! A candidate source: one kind of upstream lookup, normalized into hits.

use std::sync::Arc;

use crate::fetcher::{FetchRequest, WordFetcher};
use crate::provider::scoring::normalize_scores;
use crate::types::{ActionFactory, Hit, SourceKind};

/// Performs one [`SourceKind`] lookup through a shared [`WordFetcher`].
#[derive(Clone)]
pub struct CandidateSource {
    kind: SourceKind,
    fetcher: Arc<dyn WordFetcher>,
}

impl CandidateSource {
    pub fn new(kind: SourceKind, fetcher: Arc<dyn WordFetcher>) -> Self {
        Self { kind, fetcher }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Fetch and normalize candidates for `text`.
    ///
    /// Spelled-like patterns are rewritten into the fetcher's wildcard
    /// syntax first. A failed fetch is logged and yields no hits. Each
    /// hit's help text names the source and its normalized score.
    pub async fn collect(&self, text: &str, limit: usize, actions: &ActionFactory) -> Vec<Hit> {
        let text = match self.kind {
            SourceKind::SpelledLike => self.fetcher.wildcard_syntax().translate(text),
            _ => text.to_string(),
        };
        let request = FetchRequest::new(self.kind, text, limit);

        let records = match self.fetcher.fetch(&request).await {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(
                    fetcher = self.fetcher.name(),
                    source = %self.kind,
                    error = %err,
                    "source fetch failed"
                );
                return Vec::new();
            }
        };
        tracing::debug!(
            fetcher = self.fetcher.name(),
            source = %self.kind,
            count = records.len(),
            "source returned records"
        );

        normalize_scores(&records)
            .into_iter()
            .map(|(word, score)| {
                let action = actions(&word);
                Hit::new(score, word)
                    .with_help(format!("{} ({score:.4})", self.kind.display()))
                    .with_action(action)
            })
            .collect()
    }
}

impl std::fmt::Debug for CandidateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateSource")
            .field("kind", &self.kind)
            .field("fetcher", &self.fetcher.name())
            .finish()
    }
}
