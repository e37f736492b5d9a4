//! Provider lifecycle management.
//!
//! ```text
//! Created -> Starting -> Ready | Failed -> ShuttingDown -> Shutdown
//! ```
//!
//! [`ManagedProvider`] wraps a [`SearchProvider`] and enforces the
//! lifecycle: startup is scheduled exactly once as a background task,
//! searches wait for it to finish, a failed startup disables the provider
//! for good, and shutdown runs once. Hook errors and panics are logged,
//! never raised. A startup still running [`STARTUP_GRACE`] after shutdown
//! begins is abandoned and the provider counts as failed.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_stream::stream;
use futures::{FutureExt, StreamExt};
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::error::SearchError;
use crate::provider::{HitStream, SearchProvider};

/// How long shutdown waits for a running startup hook before abandoning it.
pub const STARTUP_GRACE: Duration = Duration::from_secs(2);

/// Lifecycle state of a managed provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderState {
    /// Constructed; no I/O has happened.
    Created,
    /// The startup hook is running.
    Starting,
    /// Startup succeeded; searches run.
    Ready,
    /// Startup failed; searches yield nothing.
    Failed,
    /// The shutdown hook is running.
    ShuttingDown,
    /// Terminal.
    Shutdown,
}

impl ProviderState {
    /// `true` once startup has finished one way or another.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Created | Self::Starting)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::ShuttingDown => "shutting-down",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A provider plus its lifecycle state. Clones share state.
#[derive(Clone)]
pub struct ManagedProvider {
    name: Arc<str>,
    inner: Arc<dyn SearchProvider>,
    state: Arc<watch::Sender<ProviderState>>,
    startup_error: Arc<OnceLock<String>>,
    startup_cancel: CancellationToken,
}

impl ManagedProvider {
    /// Wrap `inner` without starting it.
    pub fn new(name: impl Into<Arc<str>>, inner: Arc<dyn SearchProvider>) -> Self {
        let (state, _) = watch::channel(ProviderState::Created);
        Self {
            name: name.into(),
            inner,
            state: Arc::new(state),
            startup_error: Arc::new(OnceLock::new()),
            startup_cancel: CancellationToken::new(),
        }
    }

    /// Wrap `inner` and schedule its startup immediately.
    ///
    /// Must be called within a Tokio runtime.
    pub fn spawn(name: impl Into<Arc<str>>, inner: Arc<dyn SearchProvider>) -> Self {
        let managed = Self::new(name, inner);
        managed.start();
        managed
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ProviderState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ProviderState> {
        self.state.subscribe()
    }

    /// The recorded startup error, if startup failed.
    pub fn startup_error(&self) -> Option<&str> {
        self.startup_error.get().map(String::as_str)
    }

    /// Schedule the startup hook. Only the first call from `Created` has
    /// any effect.
    pub fn start(&self) {
        let scheduled = self.state.send_if_modified(|state| {
            if *state == ProviderState::Created {
                *state = ProviderState::Starting;
                true
            } else {
                false
            }
        });
        if scheduled {
            let this = self.clone();
            tokio::spawn(async move { this.run_startup().await });
        }
    }

    async fn run_startup(&self) {
        let hook = AssertUnwindSafe(self.inner.startup()).catch_unwind();
        let result = tokio::select! {
            biased;
            _ = self.startup_cancel.cancelled() => {
                Err(SearchError::Startup("abandoned by shutdown".into()))
            }
            outcome = hook => match outcome {
                Ok(result) => result,
                Err(_) => Err(SearchError::Provider("startup hook panicked".into())),
            },
        };

        match result {
            Ok(()) => {
                if self.settle(ProviderState::Ready) {
                    tracing::debug!(provider = %self.name, "provider ready");
                }
            }
            Err(err) => {
                let _ = self.startup_error.set(err.to_string());
                if self.settle(ProviderState::Failed) {
                    tracing::warn!(
                        provider = %self.name,
                        error = %err,
                        "provider startup failed; provider disabled"
                    );
                }
            }
        }
    }

    fn settle(&self, next: ProviderState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == ProviderState::Starting {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    /// Wait until startup has finished and return the settled state.
    ///
    /// Starts the provider if nobody has yet.
    pub async fn wait_started(&self) -> ProviderState {
        self.start();
        let mut rx = self.state.subscribe();
        let settled = match rx.wait_for(ProviderState::is_settled).await {
            Ok(state) => *state,
            // Unreachable while `self` holds the sender.
            Err(_) => ProviderState::Shutdown,
        };
        settled
    }

    /// Search through the lifecycle gate.
    ///
    /// Waits for startup, then forwards the inner stream only when the
    /// provider is `Ready` and `query` is non-empty.
    pub fn search(&self, query: &str, cancel: CancellationToken) -> HitStream {
        let this = self.clone();
        let query = query.to_string();

        Box::pin(stream! {
            let state = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                state = this.wait_started() => state,
            };
            if state != ProviderState::Ready || query.is_empty() {
                return;
            }

            let mut hits = this.inner.search(&query, cancel.clone());
            while let Some(hit) = hits.next().await {
                if cancel.is_cancelled() {
                    return;
                }
                yield hit;
            }
        })
    }

    /// Run the shutdown hook once.
    ///
    /// Waits up to [`STARTUP_GRACE`] for a running startup to finish, then
    /// abandons it. Later calls return immediately. Errors and panics are
    /// logged.
    pub async fn shutdown(&self) {
        loop {
            let mut rx = self.state.subscribe();
            let waited = timeout(
                STARTUP_GRACE,
                rx.wait_for(|state| *state != ProviderState::Starting),
            )
            .await
            .is_ok();
            if !waited {
                tracing::warn!(
                    provider = %self.name,
                    grace_ms = STARTUP_GRACE.as_millis() as u64,
                    "startup still running at shutdown; abandoning it"
                );
                self.startup_cancel.cancel();
                continue;
            }

            let began = self.state.send_if_modified(|state| match state {
                ProviderState::Created | ProviderState::Ready | ProviderState::Failed => {
                    *state = ProviderState::ShuttingDown;
                    true
                }
                _ => false,
            });
            if began {
                break;
            }
            if self.state() != ProviderState::Starting {
                return;
            }
        }

        let result = match AssertUnwindSafe(self.inner.shutdown()).catch_unwind().await {
            Ok(result) => result,
            Err(_) => Err(SearchError::Provider("shutdown hook panicked".into())),
        };
        if let Err(err) = result {
            tracing::warn!(provider = %self.name, error = %err, "provider shutdown failed");
        }

        self.state.send_replace(ProviderState::Shutdown);
        tracing::debug!(provider = %self.name, "provider shut down");
    }
}

impl fmt::Debug for ManagedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedProvider")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Hit;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct ScriptedProvider {
        startup_delay: Option<Duration>,
        startup_fails: bool,
        startup_panics: bool,
        shutdown_fails: bool,
        startups: AtomicUsize,
        searches: AtomicUsize,
        shutdowns: AtomicUsize,
    }

    #[async_trait]
    impl SearchProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn startup(&self) -> Result<(), SearchError> {
            self.startups.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.startup_delay {
                tokio::time::sleep(delay).await;
            }
            if self.startup_panics {
                panic!("startup exploded");
            }
            if self.startup_fails {
                return Err(SearchError::Startup("warm-up rejected".into()));
            }
            Ok(())
        }

        fn search(&self, query: &str, _cancel: CancellationToken) -> HitStream {
            self.searches.fetch_add(1, Ordering::SeqCst);
            Box::pin(futures::stream::iter(vec![Hit::new(1.0, query)]))
        }

        async fn shutdown(&self) -> Result<(), SearchError> {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            if self.shutdown_fails {
                return Err(SearchError::Shutdown("already closed".into()));
            }
            Ok(())
        }
    }

    async fn collect(managed: &ManagedProvider, query: &str) -> Vec<Hit> {
        managed
            .search(query, CancellationToken::new())
            .collect()
            .await
    }

    #[tokio::test]
    async fn new_provider_is_created() {
        let managed = ManagedProvider::new("p", Arc::new(ScriptedProvider::default()));
        assert_eq!(managed.state(), ProviderState::Created);
        assert!(managed.startup_error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn search_waits_for_startup() {
        let inner = Arc::new(ScriptedProvider {
            startup_delay: Some(Duration::from_millis(300)),
            ..Default::default()
        });
        let managed = ManagedProvider::spawn("p", inner.clone());
        assert_eq!(managed.state(), ProviderState::Starting);

        let hits = collect(&managed, "apple").await;
        assert_eq!(hits.len(), 1);
        assert_eq!(managed.state(), ProviderState::Ready);
        assert_eq!(inner.startups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn startup_runs_once() {
        let inner = Arc::new(ScriptedProvider::default());
        let managed = ManagedProvider::spawn("p", inner.clone());
        managed.start();
        managed.clone().start();
        collect(&managed, "a").await;
        collect(&managed, "b").await;
        assert_eq!(inner.startups.load(Ordering::SeqCst), 1);
        assert_eq!(inner.searches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_startup_disables_provider() {
        let inner = Arc::new(ScriptedProvider {
            startup_fails: true,
            ..Default::default()
        });
        let managed = ManagedProvider::spawn("p", inner.clone());
        assert_eq!(managed.wait_started().await, ProviderState::Failed);
        assert!(managed
            .startup_error()
            .is_some_and(|e| e.contains("warm-up rejected")));

        assert!(collect(&managed, "apple").await.is_empty());
        assert!(collect(&managed, "apple").await.is_empty());
        assert_eq!(inner.searches.load(Ordering::SeqCst), 0);
        assert_eq!(inner.startups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panicking_startup_is_isolated() {
        let managed = ManagedProvider::spawn(
            "p",
            Arc::new(ScriptedProvider {
                startup_panics: true,
                ..Default::default()
            }),
        );
        assert_eq!(managed.wait_started().await, ProviderState::Failed);
        assert!(managed
            .startup_error()
            .is_some_and(|e| e.contains("panicked")));
    }

    #[tokio::test]
    async fn empty_query_yields_nothing() {
        let inner = Arc::new(ScriptedProvider::default());
        let managed = ManagedProvider::spawn("p", inner.clone());
        assert!(collect(&managed, "").await.is_empty());
        assert_eq!(inner.searches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn search_on_created_provider_starts_it() {
        let inner = Arc::new(ScriptedProvider::default());
        let managed = ManagedProvider::new("p", inner.clone());
        assert_eq!(collect(&managed, "apple").await.len(), 1);
        assert_eq!(inner.startups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let inner = Arc::new(ScriptedProvider::default());
        let managed = ManagedProvider::spawn("p", inner.clone());
        managed.wait_started().await;

        managed.shutdown().await;
        managed.shutdown().await;
        assert_eq!(managed.state(), ProviderState::Shutdown);
        assert_eq!(inner.shutdowns.load(Ordering::SeqCst), 1);
        assert!(collect(&managed, "apple").await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_running_startup() {
        let inner = Arc::new(ScriptedProvider {
            startup_delay: Some(Duration::from_millis(200)),
            ..Default::default()
        });
        let managed = ManagedProvider::spawn("p", inner.clone());
        managed.shutdown().await;
        assert_eq!(inner.startups.load(Ordering::SeqCst), 1);
        assert_eq!(inner.shutdowns.load(Ordering::SeqCst), 1);
        assert_eq!(managed.state(), ProviderState::Shutdown);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_abandons_hung_startup() {
        let inner = Arc::new(ScriptedProvider {
            startup_delay: Some(Duration::from_secs(3600)),
            ..Default::default()
        });
        let managed = ManagedProvider::spawn("p", inner.clone());
        tokio::task::yield_now().await;
        assert_eq!(managed.state(), ProviderState::Starting);

        let began = tokio::time::Instant::now();
        managed.shutdown().await;
        assert!(began.elapsed() < Duration::from_secs(60));
        assert_eq!(managed.state(), ProviderState::Shutdown);
        assert_eq!(inner.shutdowns.load(Ordering::SeqCst), 1);
        assert!(managed
            .startup_error()
            .is_some_and(|e| e.contains("abandoned")));
    }

    #[tokio::test]
    async fn shutdown_errors_are_swallowed() {
        let inner = Arc::new(ScriptedProvider {
            shutdown_fails: true,
            ..Default::default()
        });
        let managed = ManagedProvider::spawn("p", inner.clone());
        managed.shutdown().await;
        assert_eq!(managed.state(), ProviderState::Shutdown);
    }

    #[tokio::test]
    async fn cancelled_search_does_not_wait() {
        let managed = ManagedProvider::new("p", Arc::new(ScriptedProvider::default()));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let hits: Vec<Hit> = managed.search("apple", cancel).collect().await;
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn subscribers_see_transitions() {
        let managed = ManagedProvider::new("p", Arc::new(ScriptedProvider::default()));
        let mut rx = managed.subscribe();
        managed.start();
        let state = *rx
            .wait_for(|s| *s == ProviderState::Ready)
            .await
            .expect("sender alive");
        assert_eq!(state, ProviderState::Ready);
        assert_eq!(state.to_string(), "ready");
    }
}
