//! Explicit registry of provider factories.

use std::sync::Arc;

use futures::future::join_all;

use crate::error::SearchError;
use crate::lifecycle::ManagedProvider;
use crate::provider::SearchProvider;

/// Builds a fresh provider instance.
pub type ProviderFactory = Box<dyn Fn() -> Arc<dyn SearchProvider> + Send + Sync>;

/// Ordered, named provider factories.
///
/// Registration order is the fan-out order of every search session.
#[derive(Default)]
pub struct ProviderRegistry {
    entries: Vec<(String, ProviderFactory)>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under a unique name.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `name` is empty or already taken.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), SearchError>
    where
        F: Fn() -> Arc<dyn SearchProvider> + Send + Sync + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SearchError::Config("provider name must not be empty".into()));
        }
        if self.entries.iter().any(|(existing, _)| *existing == name) {
            return Err(SearchError::Config(format!(
                "duplicate provider name: {name}"
            )));
        }
        self.entries.push((name, Box::new(factory)));
        Ok(())
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Instantiate every provider and schedule its startup.
    ///
    /// Must be called within a Tokio runtime.
    pub fn start_all(&self) -> Vec<ManagedProvider> {
        self.entries
            .iter()
            .map(|(name, factory)| {
                tracing::debug!(provider = %name, "starting provider");
                ManagedProvider::spawn(name.as_str(), factory())
            })
            .collect()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("names", &self.names())
            .finish()
    }
}

/// Shut every provider down concurrently.
pub async fn shutdown_all(providers: &[ManagedProvider]) {
    join_all(providers.iter().map(|provider| provider.shutdown())).await;
}
