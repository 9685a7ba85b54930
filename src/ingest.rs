//! Ingestion of mined records.
//!
//! Reads JSON Lines, one mined document per line:
//!
//! ```json
//! {"source":"twitter","location":"Nairobi","source_uri":"http://t.co/1",
//!  "posted":"2015-08-04T14:34:00Z","text":"GPS outage near the water plant"}
//! ```
//!
//! `terms` (a `{term: count}` map) may be given instead of `text`. Each
//! record becomes a document plus one occurrence per term, stamped with
//! the record's `posted` time, written in one transaction. A document
//! already stored under the same `source_uri` and `location` is skipped
//! along with its terms.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use udadisi_core::models::NewDocument;
use udadisi_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// One line of an ingestion file.
#[derive(Debug, Clone, Deserialize)]
pub struct MinedRecord {
    pub source: String,
    pub location: String,
    pub source_uri: String,
    pub posted: DateTime<Utc>,
    /// Capture time; defaults to the time of ingestion.
    #[serde(default)]
    pub mined: Option<DateTime<Utc>>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub terms: Option<BTreeMap<String, i64>>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub documents_inserted: usize,
    pub documents_skipped: usize,
    pub occurrences_inserted: usize,
}

/// Counts whitespace-separated words, lowercased, with leading and
/// trailing punctuation removed.
pub fn count_words(text: &str) -> BTreeMap<String, i64> {
    let mut counts = BTreeMap::new();
    for field in text.split_whitespace() {
        let word = field
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if word.is_empty() {
            continue;
        }
        *counts.entry(word).or_insert(0) += 1;
    }
    counts
}

fn record_terms(record: &MinedRecord) -> BTreeMap<String, i64> {
    let raw = match (&record.terms, &record.text) {
        (Some(terms), _) => terms.clone(),
        (None, Some(text)) => count_words(text),
        (None, None) => BTreeMap::new(),
    };
    let mut terms = BTreeMap::new();
    for (term, count) in raw {
        let term = term.trim().to_lowercase();
        if term.is_empty() || count <= 0 {
            continue;
        }
        let total = terms.entry(term).or_insert(0i64);
        *total = total.saturating_add(count);
    }
    terms
}

/// Stores `records` through `store`, returning what was written.
pub async fn ingest_records<S: Store + ?Sized>(
    store: &S,
    records: &[MinedRecord],
) -> Result<IngestStats> {
    let mut stats = IngestStats::default();
    let now = Utc::now();

    for record in records {
        let terms = record_terms(record);
        if terms.is_empty() {
            warn!(source_uri = %record.source_uri, "record has no terms; skipping");
            stats.documents_skipped += 1;
            continue;
        }

        let doc = NewDocument {
            origin_uri: record.source_uri.clone(),
            location: record.location.clone(),
            captured_at: record.mined.unwrap_or(now),
            published_at: record.posted,
            origin_label: record.source.clone(),
        };
        let terms: Vec<(String, i64)> = terms.into_iter().collect();
        let insert = store
            .insert_document_with_terms(&doc, &terms)
            .await
            .with_context(|| format!("Failed to store document {}", record.source_uri))?;

        if insert.created {
            stats.documents_inserted += 1;
            stats.occurrences_inserted += terms.len();
        } else {
            stats.documents_skipped += 1;
        }
    }

    Ok(stats)
}

/// Parses JSON Lines content; blank lines are ignored.
pub fn parse_records(content: &str) -> Result<Vec<MinedRecord>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid record on line {}", i + 1))
        })
        .collect()
}

pub async fn run_ingest(config: &Config, path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read ingestion file: {}", path.display()))?;
    let records = parse_records(&content)?;

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let stats = ingest_records(&store, &records).await?;
    pool.close().await;

    info!(
        inserted = stats.documents_inserted,
        skipped = stats.documents_skipped,
        occurrences = stats.occurrences_inserted,
        "ingestion finished"
    );
    println!("Ingest {}", path.display());
    println!("  records: {}", records.len());
    println!("  inserted documents: {}", stats.documents_inserted);
    println!("  skipped documents: {}", stats.documents_skipped);
    println!("  occurrences: {}", stats.occurrences_inserted);
    println!("ok");
    Ok(())
}
