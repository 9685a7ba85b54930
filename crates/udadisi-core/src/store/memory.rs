//! In-memory [`Store`] implementation for tests and embedding.
//!
//! Uses `Vec`s behind `std::sync::RwLock`. Filters are applied by a
//! linear scan that mirrors the SQLite backend's `WHERE` clause.

use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::models::{Document, DocumentInsert, NewDocument, NewOccurrence, Occurrence, OccurrenceFilter};

use super::{like_match, Store};

/// In-memory store; ids are assigned sequentially from 1.
pub struct InMemoryStore {
    docs: RwLock<Vec<Document>>,
    occurrences: RwLock<Vec<Occurrence>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(Vec::new()),
            occurrences: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

// Mirrors the `word_count > 0` check on the SQLite table.
fn check_count(term: &str, count: i64) -> Result<()> {
    if count <= 0 {
        bail!("occurrence count for '{}' must be positive, got {}", term, count);
    }
    Ok(())
}

fn find_document(docs: &[Document], doc: &NewDocument) -> Option<i64> {
    docs.iter()
        .find(|d| d.origin_uri == doc.origin_uri && d.location == doc.location)
        .map(|d| d.id)
}

fn push_document(docs: &mut Vec<Document>, doc: &NewDocument) -> i64 {
    let id = docs.len() as i64 + 1;
    docs.push(Document {
        id,
        origin_uri: doc.origin_uri.clone(),
        location: doc.location.clone(),
        captured_at: doc.captured_at,
        published_at: doc.published_at,
        origin_label: doc.origin_label.clone(),
    });
    id
}

fn push_occurrence(occurrences: &mut Vec<Occurrence>, occurrence: &NewOccurrence) -> i64 {
    let id = occurrences.len() as i64 + 1;
    occurrences.push(Occurrence {
        id,
        document_id: occurrence.document_id,
        term: occurrence.term.to_lowercase(),
        count: occurrence.count,
        timestamp: occurrence.timestamp,
        location: occurrence.location.clone(),
    });
    id
}

#[async_trait]
impl Store for InMemoryStore {
    async fn fetch_occurrences(&self, filter: &OccurrenceFilter) -> Result<Vec<Occurrence>> {
        let docs = self.docs.read().map_err(poisoned)?;
        let occurrences = self.occurrences.read().map_err(poisoned)?;

        let location = filter.location().map(|l| format!("%{}%", l.to_lowercase()));
        let term = filter.term().map(str::to_lowercase);
        let source = filter.source().map(str::to_lowercase);

        let mut rows: Vec<Occurrence> = occurrences
            .iter()
            .filter(|o| {
                // Inner join: occurrences without a document are never returned.
                let Some(doc) = docs.iter().find(|d| d.id == o.document_id) else {
                    return false;
                };
                if let Some(loc) = &location {
                    if !like_match(loc, &doc.location.to_lowercase()) {
                        return false;
                    }
                }
                if let Some(src) = &source {
                    if doc.origin_label.to_lowercase() != *src {
                        return false;
                    }
                }
                if let Some(pattern) = &term {
                    if !like_match(pattern, &o.term.to_lowercase()) {
                        return false;
                    }
                }
                filter.from.map_or(true, |from| o.timestamp >= from)
                    && filter.to.map_or(true, |to| o.timestamp <= to)
            })
            .cloned()
            .collect();

        rows.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.term.cmp(&b.term))
                .then(a.id.cmp(&b.id))
        });
        Ok(rows)
    }

    async fn fetch_document(&self, id: i64) -> Result<Option<Document>> {
        let docs = self.docs.read().map_err(poisoned)?;
        Ok(docs.iter().find(|d| d.id == id).cloned())
    }

    async fn document_terms(&self, document_id: i64) -> Result<Vec<(String, i64)>> {
        let occurrences = self.occurrences.read().map_err(poisoned)?;
        Ok(occurrences
            .iter()
            .filter(|o| o.document_id == document_id)
            .map(|o| (o.term.clone(), o.count))
            .collect())
    }

    async fn insert_document_if_absent(&self, doc: &NewDocument) -> Result<DocumentInsert> {
        // Check and insert under one write lock, so the pair is atomic.
        let mut docs = self.docs.write().map_err(poisoned)?;
        if let Some(id) = find_document(&docs, doc) {
            return Ok(DocumentInsert { id, created: false });
        }
        let id = push_document(&mut docs, doc);
        Ok(DocumentInsert { id, created: true })
    }

    async fn insert_occurrence(&self, occurrence: &NewOccurrence) -> Result<i64> {
        check_count(&occurrence.term, occurrence.count)?;
        let mut occurrences = self.occurrences.write().map_err(poisoned)?;
        Ok(push_occurrence(&mut occurrences, occurrence))
    }

    async fn insert_document_with_terms(
        &self,
        doc: &NewDocument,
        terms: &[(String, i64)],
    ) -> Result<DocumentInsert> {
        // Same lock order as `fetch_occurrences`.
        let mut docs = self.docs.write().map_err(poisoned)?;
        let mut occurrences = self.occurrences.write().map_err(poisoned)?;

        if let Some(id) = find_document(&docs, doc) {
            return Ok(DocumentInsert { id, created: false });
        }
        for (term, count) in terms {
            check_count(term, *count)?;
        }

        let id = push_document(&mut docs, doc);
        for (term, count) in terms {
            push_occurrence(
                &mut occurrences,
                &NewOccurrence {
                    document_id: id,
                    term: term.clone(),
                    count: *count,
                    timestamp: doc.published_at,
                    location: doc.location.clone(),
                },
            );
        }
        Ok(DocumentInsert { id, created: true })
    }
}
