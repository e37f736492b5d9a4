//! Display state as a pure transition function.
//!
//! [`DisplayState::apply`] takes one [`DisplayEvent`] and returns the
//! [`Signal`]s the display surface must act on. Indicator signals are
//! only produced on change.

use super::Signal;
use crate::types::Hit;

/// Something the orchestrator observed.
#[derive(Debug, Clone)]
pub enum DisplayEvent {
    /// A new session began.
    SessionStarted,
    /// A flush produced a ranked list.
    Results(Vec<Hit>),
    /// The busy delay elapsed. Ignored once the session has settled.
    BusyTimerFired,
    /// Every provider finished.
    Settled,
    /// The no-matches delay elapsed after an empty, settled session.
    NoMatchesTimerFired { has_query: bool },
    /// The user chose a hit.
    Selected(Hit),
}

/// Visible state of the result list and its indicators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayState {
    list_visible: bool,
    busy: bool,
    no_matches: bool,
    settled: bool,
}

impl DisplayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list_visible(&self) -> bool {
        self.list_visible
    }

    pub fn busy(&self) -> bool {
        self.busy
    }

    pub fn no_matches(&self) -> bool {
        self.no_matches
    }

    /// Apply `event` and return the signals to emit, in order.
    pub fn apply(&mut self, event: DisplayEvent) -> Vec<Signal> {
        let mut signals = Vec::new();
        match event {
            DisplayEvent::SessionStarted => {
                self.settled = false;
                self.set_no_matches(false, &mut signals);
                self.set_busy(false, &mut signals);
            }
            DisplayEvent::Results(hits) => {
                self.list_visible = !hits.is_empty();
                signals.push(Signal::Results(hits));
                if self.list_visible {
                    self.set_no_matches(false, &mut signals);
                } else {
                    // Nothing to be busy over.
                    self.set_busy(false, &mut signals);
                }
            }
            DisplayEvent::BusyTimerFired => {
                if self.list_visible && !self.settled {
                    self.set_busy(true, &mut signals);
                }
            }
            DisplayEvent::Settled => {
                self.settled = true;
                self.set_busy(false, &mut signals);
            }
            DisplayEvent::NoMatchesTimerFired { has_query } => {
                if has_query {
                    self.list_visible = true;
                    self.set_no_matches(true, &mut signals);
                } else if self.list_visible {
                    self.list_visible = false;
                    signals.push(Signal::Results(Vec::new()));
                }
            }
            DisplayEvent::Selected(hit) => {
                self.settled = true;
                self.list_visible = false;
                signals.push(Signal::Results(Vec::new()));
                self.set_busy(false, &mut signals);
                self.set_no_matches(false, &mut signals);
                signals.push(Signal::Selected(hit));
            }
        }
        signals
    }

    fn set_busy(&mut self, busy: bool, signals: &mut Vec<Signal>) {
        if self.busy != busy {
            self.busy = busy;
            signals.push(Signal::Busy(busy));
        }
    }

    fn set_no_matches(&mut self, no_matches: bool, signals: &mut Vec<Signal>) {
        if self.no_matches != no_matches {
            self.no_matches = no_matches;
            signals.push(Signal::NoMatches(no_matches));
        }
    }
}
