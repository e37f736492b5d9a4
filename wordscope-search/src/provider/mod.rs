//! Search providers.
//!
//! A [`SearchProvider`] turns one query into a stream of [`Hit`]s. The
//! stream owns everything it needs (it is `'static`) and stops at its
//! next yield point once the given [`CancellationToken`] fires.
//!
//! [`LookupProvider`] is the stock implementation: it classifies the
//! query, replays cached hits, fans out to the candidate sources matching
//! the intent, then merges, filters and caches the ranked list.

pub mod dedup;
pub mod lookup;
pub mod scoring;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use tokio_util::sync::CancellationToken;

use crate::error::SearchError;
use crate::types::Hit;

pub use lookup::LookupProvider;

/// A boxed stream of hits for one query.
pub type HitStream = Pin<Box<dyn Stream<Item = Hit> + Send>>;

/// Capability interface of every provider.
///
/// Lifecycle (start once, wait before searching, stop once) is enforced
/// by [`ManagedProvider`](crate::lifecycle::ManagedProvider), not by
/// implementors.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Returns the provider name used in logs and the registry.
    fn name(&self) -> &str;

    /// Called once after creation, before the first search.
    async fn startup(&self) -> Result<(), SearchError> {
        Ok(())
    }

    /// Search for hits relevant to `query`. May yield nothing.
    fn search(&self, query: &str, cancel: CancellationToken) -> HitStream;

    /// Called once when the provider is retired.
    async fn shutdown(&self) -> Result<(), SearchError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    struct FixedProvider;

    #[async_trait]
    impl SearchProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn search(&self, query: &str, _cancel: CancellationToken) -> HitStream {
            let hits = vec![Hit::new(1.0, query), Hit::new(0.5, format!("{query}s"))];
            Box::pin(futures::stream::iter(hits))
        }
    }

    #[test]
    fn provider_is_object_safe() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn SearchProvider>();
    }

    #[tokio::test]
    async fn default_hooks_succeed() {
        let provider = FixedProvider;
        assert!(provider.startup().await.is_ok());
        assert!(provider.shutdown().await.is_ok());
    }

    #[tokio::test]
    async fn stream_outlives_query_borrow() {
        let provider = FixedProvider;
        let stream = {
            let query = String::from("pear");
            provider.search(&query, CancellationToken::new())
        };
        let hits: Vec<Hit> = stream.collect().await;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].text(), "pears");
    }
}
