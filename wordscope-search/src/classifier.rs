//! Query intent classification.
//!
//! [`classify`] lowercases the input and tests it against an ordered
//! table of patterns; the first match decides the [`QueryKind`]:
//!
//! | Order | Kind | Pattern |
//! |-------|------|---------|
//! | 1 | `SpelledLike` | contains `?` or `*` |
//! | 2 | `SuggestSoundsLike` | `^[a-z0-9]+$` |
//! | 3 | `SuggestMeansLike` | `^[a-z0-9\s\-]+$` |
//! | - | `Unknown` | anything else |
//!
//! [`QueryClassifier`] layers the caller-side policy on top: it trims the
//! input and downgrades very short suggest queries to `Unknown` so that
//! trivial keystrokes never trigger fetches. Wildcard queries are always
//! let through.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::{ParsedQuery, QueryKind};

/// Minimum query length (in characters) for suggest queries.
pub const DEFAULT_MIN_QUERY_CHARS: usize = 3;

struct Rule {
    kind: QueryKind,
    pattern: Regex,
}

fn rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            (QueryKind::SpelledLike, r"[?*]+"),
            (QueryKind::SuggestSoundsLike, r"^[a-z0-9]+$"),
            (QueryKind::SuggestMeansLike, r"^[a-z0-9\s\-]+$"),
        ]
        .into_iter()
        .filter_map(|(kind, source)| match Regex::new(source) {
            Ok(pattern) => Some(Rule { kind, pattern }),
            Err(err) => {
                tracing::error!(%kind, error = %err, "invalid classifier pattern");
                None
            }
        })
        .collect()
    })
}

/// Classify raw query text.
///
/// Pure and deterministic. The text is lowercased but not trimmed, so
/// trailing whitespace turns a single word into a phrase.
pub fn classify(text: &str) -> ParsedQuery {
    let text = text.to_lowercase();
    let kind = rules()
        .iter()
        .find(|rule| rule.pattern.is_match(&text))
        .map_or(QueryKind::Unknown, |rule| rule.kind);
    ParsedQuery::new(kind, text)
}

/// Classifier with the provider-side length policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryClassifier {
    min_chars: usize,
}

impl QueryClassifier {
    /// Create a classifier that downgrades suggest queries shorter than
    /// `min_chars` characters.
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }

    /// The minimum suggest query length.
    pub fn min_chars(&self) -> usize {
        self.min_chars
    }

    /// Trim, lowercase and classify `text`, then apply the length policy.
    ///
    /// The returned text is the normalized cache key.
    pub fn classify(&self, text: &str) -> ParsedQuery {
        let parsed = classify(text.trim());
        match parsed.kind {
            QueryKind::SuggestSoundsLike | QueryKind::SuggestMeansLike
                if parsed.text.chars().count() < self.min_chars =>
            {
                ParsedQuery::unknown(parsed.text)
            }
            _ => parsed,
        }
    }
}

impl Default for QueryClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_QUERY_CHARS)
    }
}
