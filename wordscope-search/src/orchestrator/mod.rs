//! Aggregation orchestrator: one exclusive search session per input change.
//!
//! # Architecture
//!
//! ```text
//! input_changed ─► Aggregator ──spawn──► SearchSession
//!                      │                     │ fan-out (JoinSet, one task per provider)
//!                      │                     ▼
//!                      │              mpsc fan-in queue ─► batched flush ─┐
//!                      │                                                  │
//!                      └── Dispatcher (current session + DisplayState) ◄──┘
//!                                   │
//!                                   ▼
//!                        UnboundedReceiver<Update>
//! ```
//!
//! Every signal passes through one dispatcher lock that also
//! guards the current [`SessionId`]. Starting a session advances the id
//! under that lock, so nothing from a superseded session is delivered once
//! its successor exists.

pub mod aggregator;
pub mod display;
pub mod session;

use std::fmt;

use crate::types::Hit;

pub use aggregator::Aggregator;
pub use display::{DisplayEvent, DisplayState};
pub use session::{SearchSession, SessionOutcome};

/// Identifies one search session. Strictly increasing per aggregator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub fn get(&self) -> u64 {
        self.0
    }

    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A display-surface side effect.
#[derive(Debug, Clone)]
pub enum Signal {
    /// Replace the visible list wholesale. Empty hides the list.
    Results(Vec<Hit>),
    /// Show or hide the busy indicator.
    Busy(bool),
    /// Show or hide the "no matches" indicator.
    NoMatches(bool),
    /// The user chose a hit.
    Selected(Hit),
}

/// A signal tagged with the session that produced it.
#[derive(Debug, Clone)]
pub struct Update {
    pub session: SessionId,
    pub signal: Signal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_increase() {
        let first = SessionId::default();
        let second = first.next();
        assert!(second > first);
        assert_eq!(second.get(), 1);
        assert_eq!(second.to_string(), "#1");
    }
}
