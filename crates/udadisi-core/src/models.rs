//! Core data models shared by the aggregation engine and its collaborators.
//!
//! [`Occurrence`] and [`Document`] are produced by ingestion and are
//! read-only inside the engine. [`TermTotal`] lives for one aggregation
//! pass; [`TrendRecord`] and [`WordCount`] are what callers receive.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded appearance of a term in a document.
///
/// Not unique by `(document_id, term)`: upstream mining may store the
/// same term for the same document more than once.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    /// Storage row id.
    pub id: i64,
    pub document_id: i64,
    /// Lowercased, non-empty.
    pub term: String,
    pub count: i64,
    /// Publish time of the owning document, copied at ingestion.
    pub timestamp: DateTime<Utc>,
    pub location: String,
}

/// A mined piece of content with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: i64,
    pub origin_uri: String,
    pub location: String,
    /// When the miner captured the document.
    pub captured_at: DateTime<Utc>,
    /// When the source claims the document was published.
    pub published_at: DateTime<Utc>,
    /// Ingestion channel, e.g. `twitter` or `rss`.
    pub origin_label: String,
}

/// Document fields supplied by the ingestion path.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub origin_uri: String,
    pub location: String,
    pub captured_at: DateTime<Utc>,
    pub published_at: DateTime<Utc>,
    pub origin_label: String,
}

/// Result of [`Store::insert_document_if_absent`](crate::store::Store::insert_document_if_absent).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentInsert {
    pub id: i64,
    /// `false` when a document with the same origin URI and location
    /// already existed and its id was returned instead.
    pub created: bool,
}

/// Occurrence fields supplied by the ingestion path.
#[derive(Debug, Clone)]
pub struct NewOccurrence {
    pub document_id: i64,
    pub term: String,
    pub count: i64,
    pub timestamp: DateTime<Utc>,
    pub location: String,
}

/// Filter passed to the occurrence source.
///
/// Empty strings behave like `None` for `location` and `source`.
#[derive(Debug, Clone, Default)]
pub struct OccurrenceFilter {
    /// Case-insensitive substring of the document location.
    pub location: Option<String>,
    /// Case-insensitive LIKE pattern (`%`, `_`). `None` matches every term.
    pub term: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Origin label, compared case-insensitively.
    pub source: Option<String>,
}

impl OccurrenceFilter {
    /// The term filter, with an empty string treated as absent.
    pub fn term(&self) -> Option<&str> {
        self.term.as_deref().filter(|t| !t.is_empty())
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref().filter(|l| !l.is_empty())
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref().filter(|s| !s.is_empty())
    }
}

/// Provenance entry attached to a [`TrendRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Origin label of the ingestion channel.
    pub source: String,
    #[serde(rename = "sourceURI")]
    pub source_uri: String,
    pub posted: DateTime<Utc>,
    pub mined: DateTime<Utc>,
}

impl SourceEntry {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            source: doc.origin_label.clone(),
            source_uri: doc.origin_uri.clone(),
            posted: doc.published_at,
            mined: doc.captured_at,
        }
    }
}

/// A ranked term count with its velocity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordCount {
    pub term: String,
    pub occurrences: i64,
    pub velocity: f64,
}

/// Accumulated counts and provenance for one grouped run of a term.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermTotal {
    pub term: String,
    /// Sub-term → summed count across the expanded documents.
    pub counts: HashMap<String, i64>,
    /// Provenance in encounter order.
    pub sources: Vec<SourceEntry>,
}

impl TermTotal {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            ..Self::default()
        }
    }

    /// Sum of every sub-term count.
    pub fn total_count(&self) -> i64 {
        self.counts.values().fold(0i64, |acc, c| acc.saturating_add(*c))
    }
}

/// Final output unit for a single-term query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendRecord {
    pub term: String,
    pub word_counts: Vec<WordCount>,
    pub sources: Vec<SourceEntry>,
}
