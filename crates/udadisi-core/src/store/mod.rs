//! Storage abstraction for Udadisi.
//!
//! The [`Store`] trait is everything the aggregation engine reads
//! (occurrences and documents) plus the two writes the ingestion path
//! needs. Backends: SQLite in the application crate, [`memory`] here.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Document, DocumentInsert, NewDocument, NewOccurrence, Occurrence, OccurrenceFilter};

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`fetch_occurrences`](Store::fetch_occurrences) | Filtered occurrences, sorted by `(timestamp, term)` |
/// | [`fetch_document`](Store::fetch_document) | Document provenance by id |
/// | [`document_terms`](Store::document_terms) | Every `(term, count)` stored for a document |
/// | [`insert_document_if_absent`](Store::insert_document_if_absent) | Idempotent document insert keyed on `(origin_uri, location)` |
/// | [`insert_occurrence`](Store::insert_occurrence) | Store one term occurrence |
/// | [`insert_document_with_terms`](Store::insert_document_with_terms) | Document plus all its occurrences, all or nothing |
#[async_trait]
pub trait Store: Send + Sync {
    /// Occurrences matching `filter`, ordered by timestamp then term.
    ///
    /// Location is a case-insensitive substring match on the owning
    /// document, term a case-insensitive LIKE pattern, source a
    /// case-insensitive match on the origin label, and the time bounds
    /// are inclusive.
    async fn fetch_occurrences(&self, filter: &OccurrenceFilter) -> Result<Vec<Occurrence>>;

    /// Retrieve a document by id. `Ok(None)` if it does not exist.
    async fn fetch_document(&self, id: i64) -> Result<Option<Document>>;

    /// Every `(term, count)` pair stored for a document, in storage order.
    async fn document_terms(&self, document_id: i64) -> Result<Vec<(String, i64)>>;

    /// Insert a document unless one with the same origin URI and location
    /// exists. Uniqueness must be enforced by the backend itself.
    async fn insert_document_if_absent(&self, doc: &NewDocument) -> Result<DocumentInsert>;

    /// Store an occurrence. The term is lowercased before storage.
    async fn insert_occurrence(&self, occurrence: &NewOccurrence) -> Result<i64>;

    /// Insert a document and one occurrence per `(term, count)` pair as a
    /// single unit. Occurrences take the document's publish time and
    /// location.
    ///
    /// If the document already exists nothing is written and `created` is
    /// `false`. On error no rows from this call remain.
    async fn insert_document_with_terms(
        &self,
        doc: &NewDocument,
        terms: &[(String, i64)],
    ) -> Result<DocumentInsert>;
}

/// Case-insensitive SQL `LIKE` match: `%` matches any run, `_` one char.
///
/// Both sides must already be lowercased.
pub fn like_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '_' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '%' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '%' {
        pi += 1;
    }
    pi == p.len()
}

#[cfg(test)]
mod tests {
    use super::like_match;

    #[test]
    fn like_exact() {
        assert!(like_match("gps", "gps"));
        assert!(!like_match("gps", "gpss"));
    }

    #[test]
    fn like_wildcards() {
        assert!(like_match("gp%", "gps"));
        assert!(like_match("%ter", "water"));
        assert!(like_match("w_ter", "water"));
        assert!(like_match("%", ""));
        assert!(like_match("%a%e%", "water"));
        assert!(!like_match("w_ter", "wter"));
    }
}
