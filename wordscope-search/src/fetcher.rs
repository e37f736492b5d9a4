//! The upstream collaborator seam.
//!
//! A [`WordFetcher`] answers one [`FetchRequest`] with raw scored records.
//! The engine treats any error it returns as "zero records" and never
//! retries; retry policy, if any, belongs to the implementation.

use async_trait::async_trait;

use crate::error::SearchError;
use crate::types::{RawRecord, SourceKind};

/// Parameters for one upstream lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Which kind of lookup to perform.
    pub kind: SourceKind,
    /// Normalized query text, wildcards already translated.
    pub text: String,
    /// Maximum number of records wanted.
    pub limit: usize,
}

impl FetchRequest {
    pub fn new(kind: SourceKind, text: impl Into<String>, limit: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            limit,
        }
    }
}

/// Wildcard characters understood by an upstream source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WildcardSyntax {
    /// Matches any run of characters (query-side `*`).
    pub many: char,
    /// Matches exactly one character (query-side `?`).
    pub one: char,
}

impl WildcardSyntax {
    /// `*` and `?`, the query-side convention.
    pub const NATIVE: Self = Self { many: '*', one: '?' };

    /// Rewrite query-side wildcards into this syntax.
    pub fn translate(&self, pattern: &str) -> String {
        pattern
            .chars()
            .map(|c| match c {
                '*' => self.many,
                '?' => self.one,
                other => other,
            })
            .collect()
    }
}

impl Default for WildcardSyntax {
    fn default() -> Self {
        Self::NATIVE
    }
}

/// An upstream word source.
///
/// All implementations must be `Send + Sync`; one fetcher is shared by
/// every concurrent sub-fetch of a provider.
#[async_trait]
pub trait WordFetcher: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Perform one lookup.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Transport`] or [`SearchError::Parse`] when the
    /// upstream cannot be reached or answers with something unusable.
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<RawRecord>, SearchError>;

    /// The wildcard convention of this source.
    fn wildcard_syntax(&self) -> WildcardSyntax {
        WildcardSyntax::NATIVE
    }

    /// Release held connections.
    async fn close(&self) -> Result<(), SearchError> {
        Ok(())
    }
}
