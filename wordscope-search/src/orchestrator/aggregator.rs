//! The top-level controller, invoked once per keystroke.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::display::DisplayEvent;
use super::session::{lock, Dispatcher, SearchSession, SessionOutcome, SharedDispatcher};
use super::{SessionId, Update};
use crate::config::EngineConfig;
use crate::error::SearchError;
use crate::lifecycle::ManagedProvider;
use crate::registry::{shutdown_all, ProviderRegistry};
use crate::types::Hit;

struct ActiveSession {
    id: SessionId,
    cancel: CancellationToken,
    handle: JoinHandle<SessionOutcome>,
}

/// Runs at most one [`SearchSession`] at a time over a fixed provider set.
///
/// Signals for the display surface arrive on the receiver returned by
/// [`Aggregator::new`]. Dropping the aggregator cancels the running
/// session; call [`Aggregator::close`] to also shut providers down.
pub struct Aggregator {
    providers: Vec<ManagedProvider>,
    config: EngineConfig,
    dispatcher: SharedDispatcher,
    active: Option<ActiveSession>,
}

impl Aggregator {
    /// Create an aggregator over already-managed providers.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `config` fails validation.
    pub fn new(
        providers: Vec<ManagedProvider>,
        config: EngineConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Update>), SearchError> {
        config.validate()?;
        Ok(Self::assemble(providers, config))
    }

    /// Start every registered provider and aggregate over them.
    ///
    /// The config is checked before any provider starts. Must be called
    /// within a Tokio runtime.
    pub fn from_registry(
        registry: &ProviderRegistry,
        config: EngineConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Update>), SearchError> {
        config.validate()?;
        Ok(Self::assemble(registry.start_all(), config))
    }

    fn assemble(
        providers: Vec<ManagedProvider>,
        config: EngineConfig,
    ) -> (Self, mpsc::UnboundedReceiver<Update>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let aggregator = Self {
            providers,
            config,
            dispatcher: Arc::new(Mutex::new(Dispatcher::new(tx))),
            active: None,
        };
        (aggregator, rx)
    }

    pub fn providers(&self) -> &[ManagedProvider] {
        &self.providers
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The session whose signals are currently delivered.
    pub fn current_session(&self) -> SessionId {
        lock(&self.dispatcher).current()
    }

    /// Supersede any running session and start one for `text`.
    ///
    /// Must be called within a Tokio runtime.
    pub fn input_changed(&mut self, text: &str) -> SessionId {
        let query = text.trim().to_string();
        let cancel = CancellationToken::new();

        let id = {
            let mut dispatcher = lock(&self.dispatcher);
            if let Some(previous) = self.active.take() {
                previous.cancel.cancel();
            }
            dispatcher.advance()
        };
        tracing::trace!(session = %id, query = %query, "input changed");

        let session = SearchSession::new(
            id,
            query,
            self.providers.clone(),
            self.config.clone(),
            cancel.clone(),
            Arc::clone(&self.dispatcher),
        );
        let handle = tokio::spawn(session.run());
        self.active = Some(ActiveSession { id, cancel, handle });
        id
    }

    /// Cancel the running session, hide the list and report `hit` as chosen.
    ///
    /// The hit's action is not invoked; that is the consumer's call.
    pub fn select(&mut self, hit: Hit) -> SessionId {
        let mut dispatcher = lock(&self.dispatcher);
        if let Some(previous) = self.active.take() {
            previous.cancel.cancel();
        }
        let id = dispatcher.advance();
        dispatcher.dispatch(id, DisplayEvent::Selected(hit));
        id
    }

    /// Wait for the running session to finish.
    ///
    /// Returns `None` when no session is running or its task failed.
    pub async fn wait_settled(&mut self) -> Option<SessionOutcome> {
        let active = self.active.take()?;
        match active.handle.await {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                tracing::error!(session = %active.id, error = %err, "session task failed");
                None
            }
        }
    }

    /// Cancel the running session and shut every provider down.
    ///
    /// No further updates are delivered afterwards.
    pub async fn close(&mut self) {
        {
            let mut dispatcher = lock(&self.dispatcher);
            if let Some(previous) = self.active.take() {
                previous.cancel.cancel();
            }
            dispatcher.advance();
        }
        shutdown_all(&self.providers).await;
        tracing::debug!(providers = self.providers.len(), "aggregator closed");
    }
}

impl Drop for Aggregator {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
    }
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("providers", &self.providers)
            .field("config", &self.config)
            .field("active", &self.active.as_ref().map(|a| a.id))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::Signal;
    use crate::provider::{HitStream, SearchProvider};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn invalid_engine_config_rejected() {
        let config = EngineConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            Aggregator::new(Vec::new(), config),
            Err(SearchError::Config(_))
        ));
    }

    struct Idle;

    #[async_trait::async_trait]
    impl SearchProvider for Idle {
        fn name(&self) -> &str {
            "idle"
        }

        fn search(&self, _query: &str, _cancel: CancellationToken) -> HitStream {
            Box::pin(futures::stream::empty())
        }
    }

    #[tokio::test]
    async fn invalid_config_starts_no_registered_provider() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let mut registry = ProviderRegistry::new();
        registry
            .register("idle", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Arc::new(Idle) as Arc<dyn SearchProvider>
            })
            .expect("register");

        let config = EngineConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(Aggregator::from_registry(&registry, config).is_err());
        assert_eq!(built.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sessions_advance_per_input() {
        let (mut aggregator, _rx) =
            Aggregator::new(Vec::new(), EngineConfig::default()).expect("aggregator");
        let first = aggregator.input_changed("c");
        let second = aggregator.input_changed("ca");
        assert!(second > first);
        assert_eq!(aggregator.current_session(), second);
        let outcome = aggregator.wait_settled().await.expect("outcome");
        assert!(outcome.hits().is_empty());
        assert!(aggregator.wait_settled().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn select_emits_hidden_list_then_selection() {
        let (mut aggregator, mut rx) =
            Aggregator::new(Vec::new(), EngineConfig::default()).expect("aggregator");
        let id = aggregator.select(Hit::new(0.9, "apple"));

        let first = rx.recv().await.expect("update");
        assert_eq!(first.session, id);
        assert!(matches!(first.signal, Signal::Results(hits) if hits.is_empty()));
        let second = rx.recv().await.expect("update");
        assert!(matches!(second.signal, Signal::Selected(hit) if hit.text() == "apple"));
    }

    #[tokio::test(start_paused = true)]
    async fn close_silences_running_session() {
        let (mut aggregator, mut rx) =
            Aggregator::new(Vec::new(), EngineConfig::default()).expect("aggregator");
        aggregator.input_changed("apple");
        aggregator.close().await;
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
    }
}
