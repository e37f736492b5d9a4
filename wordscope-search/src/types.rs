//! Core types for classified queries, raw upstream records and ranked hits.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Placeholder word for upstream records that omit the `word` field.
pub const UNKNOWN_WORD: &str = "__UNKNOWN__";

/// Placeholder raw score for upstream records that omit the `score` field.
pub const UNKNOWN_SCORE: f64 = -1.0;

/// The search intent detected in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryKind {
    /// The query contains `?`/`*` wildcards and is matched by spelling.
    SpelledLike,
    /// A single token: autocomplete plus phonetic matches.
    SuggestSoundsLike,
    /// A multi-word or hyphenated phrase: autocomplete plus semantic matches.
    SuggestMeansLike,
    /// Nothing worth searching for.
    Unknown,
}

impl QueryKind {
    /// Returns `false` only for [`QueryKind::Unknown`].
    pub fn is_searchable(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Returns a stable, human-readable name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SpelledLike => "spelled-like",
            Self::SuggestSoundsLike => "suggest-sounds-like",
            Self::SuggestMeansLike => "suggest-means-like",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A classified query: the detected intent plus the normalized text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParsedQuery {
    /// Detected intent.
    pub kind: QueryKind,
    /// Normalized (lowercased) query text.
    pub text: String,
}

impl ParsedQuery {
    /// Create a parsed query.
    pub fn new(kind: QueryKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// Create an [`QueryKind::Unknown`] query preserving `text`.
    pub fn unknown(text: impl Into<String>) -> Self {
        Self::new(QueryKind::Unknown, text)
    }
}

/// The kind of upstream lookup a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Wildcard pattern match on spelling.
    SpelledLike,
    /// Phonetic similarity.
    SoundsLike,
    /// Semantic similarity.
    MeansLike,
    /// Prefix autocomplete suggestions.
    Autocomplete,
}

impl SourceKind {
    /// Returns the kebab-case label of this source.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SpelledLike => "spelled-like",
            Self::SoundsLike => "sounds-like",
            Self::MeansLike => "means-like",
            Self::Autocomplete => "autocomplete",
        }
    }

    /// Returns the capitalised label shown in hit help text.
    pub fn display(&self) -> &'static str {
        match self {
            Self::SpelledLike => "Spelled-like",
            Self::SoundsLike => "Sounds-like",
            Self::MeansLike => "Means-like",
            Self::Autocomplete => "Autocomplete",
        }
    }

    /// Returns all source kinds.
    pub fn all() -> &'static [SourceKind] {
        &[
            Self::SpelledLike,
            Self::SoundsLike,
            Self::MeansLike,
            Self::Autocomplete,
        ]
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One raw record returned by an upstream source, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// The matched word or phrase.
    #[serde(default = "unknown_word")]
    pub word: String,
    /// Source-specific relevance score; only meaningful within one batch.
    #[serde(default = "unknown_score")]
    pub score: f64,
}

impl RawRecord {
    /// Create a raw record.
    pub fn new(word: impl Into<String>, score: f64) -> Self {
        Self {
            word: word.into(),
            score,
        }
    }
}

fn unknown_word() -> String {
    UNKNOWN_WORD.to_string()
}

fn unknown_score() -> f64 {
    UNKNOWN_SCORE
}

/// Opaque callback run by the consumer when a hit is chosen.
///
/// The engine only carries it; it never invokes it.
#[derive(Clone)]
pub struct HitAction(Arc<dyn Fn() + Send + Sync>);

impl HitAction {
    /// Wrap a callback.
    pub fn new(action: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(action))
    }

    /// An action that does nothing.
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Run the callback.
    pub fn invoke(&self) {
        (self.0)();
    }
}

impl Default for HitAction {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for HitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HitAction(..)")
    }
}

/// Builds the [`HitAction`] for a matched word.
pub type ActionFactory = Arc<dyn Fn(&str) -> HitAction + Send + Sync>;

/// The default factory: every hit gets a no-op action.
pub fn noop_actions() -> ActionFactory {
    Arc::new(|_word: &str| HitAction::noop())
}

/// A ranked, display-ready suggestion.
///
/// Hits compare and order by `score` only, like entries in a ranked list.
#[derive(Debug, Clone)]
pub struct Hit {
    score: f64,
    text: String,
    display: String,
    help: Option<String>,
    action: HitAction,
    speculative: bool,
}

impl Hit {
    /// Create a hit. The score is clamped into `[0.0, 1.0]`; NaN becomes `0.0`.
    pub fn new(score: f64, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            score: clamp_score(score),
            display: text.clone(),
            text,
            help: None,
            action: HitAction::noop(),
            speculative: false,
        }
    }

    /// Replace the display markup (defaults to the plain text).
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = display.into();
        self
    }

    /// Attach help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Attach the selection callback.
    pub fn with_action(mut self, action: HitAction) -> Self {
        self.action = action;
        self
    }

    /// Mark this hit as a cached guess that the provider's fresh results
    /// will replace.
    pub fn mark_speculative(mut self) -> Self {
        self.speculative = true;
        self
    }

    /// Relevance in `[0.0, 1.0]`.
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Canonical match text; the deduplication key.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Display markup.
    pub fn display(&self) -> &str {
        &self.display
    }

    /// Optional help text.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// The selection callback.
    pub fn action(&self) -> &HitAction {
        &self.action
    }

    pub fn is_speculative(&self) -> bool {
        self.speculative
    }
}

impl PartialEq for Hit {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score
    }
}

impl PartialOrd for Hit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.score.partial_cmp(&other.score)
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}
