//! Engine and provider configuration with sensible defaults.
//!
//! [`EngineConfig`] holds the aggregator's timing rules; [`ProviderConfig`]
//! controls the per-provider cache, score threshold and fetch size. Both
//! deserialize from partial TOML/JSON sections with missing fields
//! defaulted, and are validated once at construction time.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classifier::DEFAULT_MIN_QUERY_CHARS;
use crate::error::SearchError;

/// Timing rules for the aggregation orchestrator. All values are milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Delay before a still-running search shows the busy indicator.
    pub busy_delay_ms: u64,
    /// Minimum interval between two partial-result flushes.
    pub batch_interval_ms: u64,
    /// Bounded wait on the fan-in queue between cancellation checks.
    pub poll_interval_ms: u64,
    /// Delay before an empty, settled search reports "no matches".
    pub no_matches_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            busy_delay_ms: 500,
            batch_interval_ms: 250,
            poll_interval_ms: 100,
            no_matches_delay_ms: 500,
        }
    }
}

impl EngineConfig {
    pub fn busy_delay(&self) -> Duration {
        Duration::from_millis(self.busy_delay_ms)
    }

    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.batch_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn no_matches_delay(&self) -> Duration {
        Duration::from_millis(self.no_matches_delay_ms)
    }

    /// Validates this configuration.
    ///
    /// `poll_interval_ms` must be greater than 0, otherwise the drain loop
    /// would spin.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.poll_interval_ms == 0 {
            return Err(SearchError::Config(
                "poll_interval_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Per-provider pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Number of normalized queries kept in the FIFO result cache.
    pub cache_capacity: usize,
    /// Hits scoring below this are dropped after dedup.
    pub min_score: f64,
    /// Suggest queries shorter than this are not searched.
    pub min_query_chars: usize,
    /// Maximum records requested from each sub-fetch.
    pub fetch_limit: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 50,
            min_score: 0.01,
            min_query_chars: DEFAULT_MIN_QUERY_CHARS,
            fetch_limit: 10,
        }
    }
}

impl ProviderConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `cache_capacity` must be greater than 0
    /// - `min_score` must be a finite value in `[0.0, 1.0]`
    /// - `fetch_limit` must be greater than 0
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.cache_capacity == 0 {
            return Err(SearchError::Config(
                "cache_capacity must be greater than 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(SearchError::Config(
                "min_score must be within 0.0..=1.0".into(),
            ));
        }
        if self.fetch_limit == 0 {
            return Err(SearchError::Config(
                "fetch_limit must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
