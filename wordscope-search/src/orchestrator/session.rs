//! One search session: fan-out, fan-in, batched flushes and timers.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;

use super::display::{DisplayEvent, DisplayState};
use super::{SessionId, Update};
use crate::config::EngineConfig;
use crate::lifecycle::ManagedProvider;
use crate::provider::dedup::rank;
use crate::types::Hit;

/// Routes display events to the consumer for the current session only.
#[derive(Debug)]
pub(crate) struct Dispatcher {
    current: SessionId,
    display: DisplayState,
    tx: mpsc::UnboundedSender<Update>,
}

impl Dispatcher {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Update>) -> Self {
        Self {
            current: SessionId::default(),
            display: DisplayState::new(),
            tx,
        }
    }

    pub(crate) fn current(&self) -> SessionId {
        self.current
    }

    /// Supersede the current session.
    pub(crate) fn advance(&mut self) -> SessionId {
        self.current = self.current.next();
        self.current
    }

    /// Apply `event` and send the resulting signals, unless `session` has
    /// been superseded. Returns whether the event was applied.
    pub(crate) fn dispatch(&mut self, session: SessionId, event: DisplayEvent) -> bool {
        if session != self.current {
            return false;
        }
        for signal in self.display.apply(event) {
            // A dropped receiver only means nobody is watching.
            let _ = self.tx.send(Update { session, signal });
        }
        true
    }
}

pub(crate) type SharedDispatcher = Arc<Mutex<Dispatcher>>;

pub(crate) fn lock(dispatcher: &SharedDispatcher) -> MutexGuard<'_, Dispatcher> {
    dispatcher.lock().unwrap_or_else(PoisonError::into_inner)
}

/// How a session ended.
#[derive(Debug, Clone)]
pub enum SessionOutcome {
    /// Every provider finished; `hits` is the final ranked list.
    Settled { hits: Vec<Hit> },
    /// A newer session, a selection or `close` superseded this one.
    Cancelled,
}

impl SessionOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The final hits; empty when cancelled.
    pub fn hits(&self) -> &[Hit] {
        match self {
            Self::Settled { hits } => hits.as_slice(),
            Self::Cancelled => &[],
        }
    }
}

/// One message on the fan-in queue.
#[derive(Debug)]
enum Fanned {
    Hit { provider: usize, hit: Hit },
    /// The provider's stream ended, normally or not.
    Done { provider: usize },
}

/// Hits collected so far in one session, tagged by provider index.
///
/// A provider's speculative hits stand until its fresh results begin or
/// its stream ends; after that only fresh hits count.
#[derive(Debug, Default)]
struct Gathered {
    hits: Vec<(usize, Hit)>,
    fresh: HashSet<usize>,
}

impl Gathered {
    /// Add one hit. Returns whether the collection changed.
    fn push(&mut self, provider: usize, hit: Hit) -> bool {
        if hit.is_speculative() {
            if self.fresh.contains(&provider) {
                return false;
            }
        } else {
            self.supersede(provider);
        }
        self.hits.push((provider, hit));
        true
    }

    /// Drop `provider`'s speculative hits. Returns whether any were dropped.
    fn supersede(&mut self, provider: usize) -> bool {
        if !self.fresh.insert(provider) {
            return false;
        }
        let before = self.hits.len();
        self.hits
            .retain(|(from, hit)| *from != provider || !hit.is_speculative());
        self.hits.len() != before
    }

    fn len(&self) -> usize {
        self.hits.len()
    }

    fn ranked(&self) -> Vec<Hit> {
        rank(self.hits.iter().map(|(_, hit)| hit.clone()))
    }
}

/// All work triggered by one input change.
pub struct SearchSession {
    id: SessionId,
    query: String,
    providers: Vec<ManagedProvider>,
    config: EngineConfig,
    cancel: CancellationToken,
    dispatcher: SharedDispatcher,
}

impl SearchSession {
    pub(crate) fn new(
        id: SessionId,
        query: String,
        providers: Vec<ManagedProvider>,
        config: EngineConfig,
        cancel: CancellationToken,
        dispatcher: SharedDispatcher,
    ) -> Self {
        Self {
            id,
            query,
            providers,
            config,
            cancel,
            dispatcher,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Run the session to completion or cancellation.
    ///
    /// # Timeline
    ///
    /// 1. Emit `SessionStarted`, arm the busy timer
    /// 2. Spawn one task per provider, each pushing hits into the fan-in queue
    /// 3. Drain with a bounded wait; flush the re-ranked list at most once
    ///    per batch interval. A provider's cached hits are replaced once its
    ///    fresh results begin or its stream ends
    /// 4. When every producer is done: flush whatever is still pending, `Settled`
    /// 5. If nothing was found, wait the no-matches delay, then report it
    ///
    /// Cancellation at any point aborts the remaining tasks and timers.
    pub async fn run(self) -> SessionOutcome {
        tracing::trace!(session = %self.id, query = %self.query, "session started");
        self.emit(DisplayEvent::SessionStarted);

        let settled = self.cancel.child_token();
        tokio::spawn(busy_timer(
            self.id,
            self.config.busy_delay(),
            settled.clone(),
            Arc::clone(&self.dispatcher),
        ));

        let (tx, mut rx) = mpsc::unbounded_channel::<Fanned>();
        let mut tasks = JoinSet::new();
        for (index, provider) in self.providers.iter().enumerate() {
            tasks.spawn(consume(
                index,
                provider.clone(),
                self.query.clone(),
                self.cancel.child_token(),
                tx.clone(),
            ));
        }
        drop(tx);

        let batch = self.config.batch_interval();
        let poll = self.config.poll_interval();
        let mut gathered = Gathered::default();
        let mut flushed: Option<Vec<Hit>> = None;
        let mut pending = false;
        let mut last_flush = Instant::now();

        let cancelled = loop {
            let received = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break true,
                received = timeout(poll, rx.recv()) => received,
            };
            match received {
                Ok(Some(Fanned::Hit { provider, hit })) => {
                    pending |= gathered.push(provider, hit);
                }
                Ok(Some(Fanned::Done { provider })) => {
                    pending |= gathered.supersede(provider);
                }
                Ok(None) => break false,
                // Poll timeout: fall through to the flush check.
                Err(_) => {}
            }
            if pending && last_flush.elapsed() >= batch {
                flushed = Some(self.flush(&gathered));
                pending = false;
                last_flush = Instant::now();
            }
        };

        if cancelled {
            tasks.shutdown().await;
            tracing::trace!(session = %self.id, "session cancelled");
            return SessionOutcome::Cancelled;
        }

        settled.cancel();
        // The consumer always gets one list per session, even an empty one.
        let hits = match flushed {
            Some(hits) if !pending => hits,
            _ => self.flush(&gathered),
        };
        self.emit(DisplayEvent::Settled);
        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                tracing::error!(session = %self.id, error = %err, "provider task failed");
            }
        }
        tracing::debug!(session = %self.id, count = hits.len(), "session settled");

        if hits.is_empty() {
            let fired = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => false,
                _ = sleep(self.config.no_matches_delay()) => true,
            };
            if fired {
                self.emit(DisplayEvent::NoMatchesTimerFired {
                    has_query: !self.query.is_empty(),
                });
            }
        }

        SessionOutcome::Settled { hits }
    }

    /// Re-rank everything gathered so far and replace the visible list.
    fn flush(&self, gathered: &Gathered) -> Vec<Hit> {
        let ranked = gathered.ranked();
        tracing::debug!(
            session = %self.id,
            gathered = gathered.len(),
            ranked = ranked.len(),
            "flush"
        );
        self.emit(DisplayEvent::Results(ranked.clone()));
        ranked
    }

    fn emit(&self, event: DisplayEvent) -> bool {
        lock(&self.dispatcher).dispatch(self.id, event)
    }
}

async fn busy_timer(
    session: SessionId,
    delay: std::time::Duration,
    settled: CancellationToken,
    dispatcher: SharedDispatcher,
) {
    tokio::select! {
        biased;
        _ = settled.cancelled() => {}
        _ = sleep(delay) => {
            lock(&dispatcher).dispatch(session, DisplayEvent::BusyTimerFired);
        }
    }
}

/// Forward one provider's hits into the fan-in queue until it ends or the
/// session is cancelled. A panic inside the provider is logged and ends
/// only this task.
async fn consume(
    index: usize,
    provider: ManagedProvider,
    query: String,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<Fanned>,
) {
    let name = provider.name().to_string();
    let forward = async {
        let mut hits = provider.search(&query, cancel.clone());
        let mut sent = 0usize;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = hits.next() => next,
            };
            let Some(hit) = next else { break };
            if tx.send(Fanned::Hit { provider: index, hit }).is_err() {
                break;
            }
            sent += 1;
        }
        sent
    };

    match AssertUnwindSafe(forward).catch_unwind().await {
        Ok(sent) => tracing::debug!(provider = %name, sent, "provider stream finished"),
        Err(_) => tracing::error!(provider = %name, "provider search panicked"),
    }
    let _ = tx.send(Fanned::Done { provider: index });
}
