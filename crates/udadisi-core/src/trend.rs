//! Trend aggregation over a [`Store`] backend.
//!
//! The engine operates entirely through the [`Store`] trait. The caller
//! resolves the time window, builds a [`TrendRequest`] and chooses the
//! backend.
//!
//! # Pipeline
//!
//! With a term filter:
//!
//! 1. Fetch occurrences sorted by `(timestamp, term)`.
//! 2. Group them with a [`GroupingAccumulator`], resolving each new
//!    document and expanding all of its stored sub-term counts.
//! 3. Assemble one [`TrendRecord`] per group: sub-terms ranked by key,
//!    velocity applied, provenance copied in encounter order.
//!
//! Without a term filter, occurrence counts are summed per term across
//! every matched document, ranked by key, given a velocity, and truncated
//! to the caller's limit.
//!
//! Any collaborator failure aborts the request. Under
//! [`UpstreamErrorPolicy::EmitEmpty`] the caller then receives an empty
//! result of the expected shape instead of an error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::accumulator::{GroupingAccumulator, GroupingMode};
use crate::error::TrendError;
use crate::models::{Occurrence, OccurrenceFilter, TermTotal, TrendRecord, WordCount};
use crate::rank::rank_by_key;
use crate::store::Store;
use crate::velocity::velocity;

/// What to do when a collaborator fails mid-request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamErrorPolicy {
    /// Log the failure and answer with an empty trend list.
    #[default]
    EmitEmpty,
    /// Return the error to the caller.
    Propagate,
}

impl std::str::FromStr for UpstreamErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "emit_empty" => Ok(Self::EmitEmpty),
            "propagate" => Ok(Self::Propagate),
            other => Err(format!(
                "Unknown upstream error policy: '{}'. Must be emit_empty or propagate.",
                other
            )),
        }
    }
}

/// Aggregation tuning parameters, decoupled from application config.
#[derive(Debug, Clone, Default)]
pub struct TrendParams {
    /// Window length used as the velocity denominator (0 behaves as 1).
    pub interval: u32,
    /// Maximum entries in a root-level response.
    pub limit: Option<usize>,
    /// Accepted for interface compatibility; not applied.
    pub min_velocity: Option<f64>,
    pub grouping: GroupingMode,
    pub on_upstream_error: UpstreamErrorPolicy,
}

/// Bundles all inputs for a single aggregation.
#[derive(Debug, Clone, Default)]
pub struct TrendRequest {
    pub filter: OccurrenceFilter,
    pub params: TrendParams,
}

/// Response shape: per-term records for a term query, a flat ranked
/// count list otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TrendResponse {
    Terms(Vec<TrendRecord>),
    Root(Vec<WordCount>),
}

impl TrendResponse {
    pub fn len(&self) -> usize {
        match self {
            Self::Terms(records) => records.len(),
            Self::Root(counts) => counts.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Run one aggregation request against `store`.
pub async fn trends<S: Store + ?Sized>(
    store: &S,
    req: &TrendRequest,
) -> Result<TrendResponse, TrendError> {
    if let Some(min) = req.params.min_velocity {
        debug!(min_velocity = min, "minimum velocity filter is not applied");
    }

    let by_term = req.filter.term().is_some();
    let result = if by_term {
        term_trends(store, req).await.map(TrendResponse::Terms)
    } else {
        root_trends(store, req).await.map(TrendResponse::Root)
    };

    match (result, req.params.on_upstream_error) {
        (Ok(response), _) => Ok(response),
        (Err(e), UpstreamErrorPolicy::Propagate) => Err(e),
        (Err(e), UpstreamErrorPolicy::EmitEmpty) => {
            warn!(error = %e, "trend aggregation aborted; returning empty result");
            Ok(if by_term {
                TrendResponse::Terms(Vec::new())
            } else {
                TrendResponse::Root(Vec::new())
            })
        }
    }
}

async fn term_trends<S: Store + ?Sized>(
    store: &S,
    req: &TrendRequest,
) -> Result<Vec<TrendRecord>, TrendError> {
    let rows = store
        .fetch_occurrences(&req.filter)
        .await
        .map_err(TrendError::upstream)?;

    let mut acc = GroupingAccumulator::new(req.params.grouping);
    for row in &rows {
        if !acc.observe(row) {
            continue;
        }
        let doc = store
            .fetch_document(row.document_id)
            .await
            .map_err(TrendError::upstream)?
            .ok_or(TrendError::NotFound(row.document_id))?;
        let terms = store
            .document_terms(doc.id)
            .await
            .map_err(TrendError::upstream)?;
        acc.expand(&doc, &terms);
    }

    Ok(acc
        .finish()
        .iter()
        .map(|total| assemble(total, req.params.interval))
        .collect())
}

async fn root_trends<S: Store + ?Sized>(
    store: &S,
    req: &TrendRequest,
) -> Result<Vec<WordCount>, TrendError> {
    let rows = store
        .fetch_occurrences(&req.filter)
        .await
        .map_err(TrendError::upstream)?;
    Ok(aggregate_root(&rows, req.params.interval, req.params.limit))
}

/// Packages a flushed group as a [`TrendRecord`].
///
/// Sub-terms are ranked by key and given a velocity; provenance keeps
/// its encounter order. `total` is left untouched.
pub fn assemble(total: &TermTotal, interval: u32) -> TrendRecord {
    TrendRecord {
        term: total.term.clone(),
        word_counts: ranked_counts(total.counts.clone(), interval),
        sources: total.sources.clone(),
    }
}

/// Collapses occurrences into one count per term, ignoring document and
/// group boundaries, then ranks, applies velocity, and truncates.
pub fn aggregate_root(rows: &[Occurrence], interval: u32, limit: Option<usize>) -> Vec<WordCount> {
    let mut totals: HashMap<String, i64> = HashMap::new();
    for row in rows {
        let total = totals.entry(row.term.clone()).or_insert(0);
        *total = total.saturating_add(row.count);
    }
    let mut counts = ranked_counts(totals, interval);
    if let Some(limit) = limit {
        counts.truncate(limit);
    }
    counts
}

fn ranked_counts(counts: HashMap<String, i64>, interval: u32) -> Vec<WordCount> {
    rank_by_key(counts)
        .into_iter()
        .map(|(term, occurrences)| WordCount {
            velocity: velocity(occurrences, interval),
            term,
            occurrences,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, DocumentInsert, NewDocument, NewOccurrence};
    use crate::store::memory::InMemoryStore;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 8, 4, hour, 0, 0).unwrap()
    }

    fn occurrence(term: &str, doc: i64, count: i64) -> Occurrence {
        Occurrence {
            id: 0,
            document_id: doc,
            term: term.to_string(),
            count,
            timestamp: at(10),
            location: "nairobi".to_string(),
        }
    }

    async fn insert_doc(store: &InMemoryStore, uri: &str, label: &str) -> i64 {
        store
            .insert_document_if_absent(&NewDocument {
                origin_uri: uri.to_string(),
                location: "Nairobi".to_string(),
                captured_at: at(12),
                published_at: at(10),
                origin_label: label.to_string(),
            })
            .await
            .unwrap()
            .id
    }

    async fn insert_occ(store: &InMemoryStore, doc: i64, term: &str, count: i64, hour: u32) {
        store
            .insert_occurrence(&NewOccurrence {
                document_id: doc,
                term: term.to_string(),
                count,
                timestamp: at(hour),
                location: "Nairobi".to_string(),
            })
            .await
            .unwrap();
    }

    fn term_request(term: &str, interval: u32) -> TrendRequest {
        TrendRequest {
            filter: OccurrenceFilter {
                term: Some(term.to_string()),
                ..Default::default()
            },
            params: TrendParams {
                interval,
                ..Default::default()
            },
        }
    }

    /// Store whose every call fails, or whose documents are all missing.
    struct BrokenStore {
        missing_documents: bool,
    }

    #[async_trait]
    impl Store for BrokenStore {
        async fn fetch_occurrences(&self, _filter: &OccurrenceFilter) -> Result<Vec<Occurrence>> {
            if self.missing_documents {
                Ok(vec![occurrence("gps", 7, 1)])
            } else {
                bail!("connection refused")
            }
        }
        async fn fetch_document(&self, _id: i64) -> Result<Option<Document>> {
            Ok(None)
        }
        async fn document_terms(&self, _document_id: i64) -> Result<Vec<(String, i64)>> {
            Ok(Vec::new())
        }
        async fn insert_document_if_absent(&self, _doc: &NewDocument) -> Result<DocumentInsert> {
            bail!("read only")
        }
        async fn insert_occurrence(&self, _occurrence: &NewOccurrence) -> Result<i64> {
            bail!("read only")
        }
        async fn insert_document_with_terms(
            &self,
            _doc: &NewDocument,
            _terms: &[(String, i64)],
        ) -> Result<DocumentInsert> {
            bail!("read only")
        }
    }

    #[test]
    fn assemble_ranks_and_applies_velocity() {
        let mut total = TermTotal::new("gps");
        total.counts.insert("satellite".to_string(), 2);
        total.counts.insert("gps".to_string(), 8);

        let record = assemble(&total, 2);
        assert_eq!(record.term, "gps");
        assert_eq!(
            record.word_counts,
            vec![
                WordCount { term: "gps".to_string(), occurrences: 8, velocity: 4.0 },
                WordCount { term: "satellite".to_string(), occurrences: 2, velocity: 1.0 },
            ]
        );
        assert_eq!(total.counts.len(), 2);
    }

    #[test]
    fn root_aggregation_sums_across_documents() {
        let rows = vec![
            occurrence("water", 1, 3),
            occurrence("gps", 1, 4),
            occurrence("water", 2, 5),
        ];
        let counts = aggregate_root(&rows, 0, None);
        assert_eq!(
            counts,
            vec![
                WordCount { term: "gps".to_string(), occurrences: 4, velocity: 4.0 },
                WordCount { term: "water".to_string(), occurrences: 8, velocity: 8.0 },
            ]
        );
    }

    #[test]
    fn root_totals_saturate() {
        let rows = vec![occurrence("gps", 1, i64::MAX), occurrence("gps", 2, 1)];
        let counts = aggregate_root(&rows, 1, None);
        assert_eq!(counts[0].occurrences, i64::MAX);
    }

    #[test]
    fn root_limit_truncates_ranked_order() {
        let rows = vec![occurrence("water", 2, 8), occurrence("gps", 1, 4)];
        let counts = aggregate_root(&rows, 1, Some(1));
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].term, "gps");
    }

    #[tokio::test]
    async fn gps_and_water_scenario() {
        let store = InMemoryStore::new();
        let doc1 = insert_doc(&store, "http://example.com/doc1", "twitter").await;
        let doc2 = insert_doc(&store, "http://example.com/doc2", "blog").await;
        insert_occ(&store, doc1, "gps", 4, 9).await;
        insert_occ(&store, doc1, "satellite", 1, 9).await;
        insert_occ(&store, doc2, "water", 8, 11).await;

        let gps = trends(&store, &term_request("gps", 1)).await.unwrap();
        let water = trends(&store, &term_request("water", 1)).await.unwrap();

        let TrendResponse::Terms(gps) = gps else { panic!("expected term records") };
        assert_eq!(gps.len(), 1);
        assert_eq!(gps[0].term, "gps");
        assert_eq!(
            gps[0].word_counts,
            vec![
                WordCount { term: "gps".to_string(), occurrences: 4, velocity: 4.0 },
                WordCount { term: "satellite".to_string(), occurrences: 1, velocity: 1.0 },
            ]
        );
        assert_eq!(gps[0].sources.len(), 1);
        assert_eq!(gps[0].sources[0].source_uri, "http://example.com/doc1");
        assert_eq!(gps[0].sources[0].source, "twitter");

        let TrendResponse::Terms(water) = water else { panic!("expected term records") };
        assert_eq!(water[0].word_counts.len(), 1);
        assert_eq!(water[0].word_counts[0].occurrences, 8);

        // A match-all pattern gives doc1 a "gps" run and a "satellite" run.
        let all = trends(&store, &term_request("%", 1)).await.unwrap();
        let TrendResponse::Terms(all) = all else { panic!("expected term records") };
        let terms: Vec<&str> = all.iter().map(|r| r.term.as_str()).collect();
        assert_eq!(terms, vec!["gps", "satellite", "water"]);
    }

    #[tokio::test]
    async fn repeated_rows_from_one_document_expand_once() {
        let store = InMemoryStore::new();
        let doc1 = insert_doc(&store, "http://example.com/doc1", "twitter").await;
        insert_occ(&store, doc1, "gps", 4, 9).await;
        insert_occ(&store, doc1, "gps", 1, 9).await;

        let response = trends(&store, &term_request("gps", 0)).await.unwrap();
        let TrendResponse::Terms(records) = response else { panic!("expected term records") };
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].word_counts[0].occurrences, 5);
        assert_eq!(records[0].sources.len(), 1);
    }

    #[tokio::test]
    async fn empty_input_yields_empty_records() {
        let store = InMemoryStore::new();
        let req = TrendRequest {
            params: TrendParams {
                on_upstream_error: UpstreamErrorPolicy::Propagate,
                ..Default::default()
            },
            ..term_request("gps", 1)
        };
        let response = trends(&store, &req).await.unwrap();
        assert_eq!(response, TrendResponse::Terms(Vec::new()));
    }

    #[tokio::test]
    async fn root_query_without_term() {
        let store = InMemoryStore::new();
        let doc1 = insert_doc(&store, "http://example.com/doc1", "twitter").await;
        let doc2 = insert_doc(&store, "http://example.com/doc2", "blog").await;
        insert_occ(&store, doc1, "gps", 4, 9).await;
        insert_occ(&store, doc2, "water", 8, 11).await;

        let req = TrendRequest {
            params: TrendParams {
                interval: 2,
                limit: Some(1),
                ..Default::default()
            },
            ..Default::default()
        };
        let response = trends(&store, &req).await.unwrap();
        assert_eq!(
            response,
            TrendResponse::Root(vec![WordCount {
                term: "gps".to_string(),
                occurrences: 4,
                velocity: 2.0,
            }])
        );
    }

    #[tokio::test]
    async fn upstream_failure_emits_empty_by_default() {
        let store = BrokenStore { missing_documents: false };
        let response = trends(&store, &term_request("gps", 1)).await.unwrap();
        assert!(response.is_empty());

        let root = trends(&store, &TrendRequest::default()).await.unwrap();
        assert_eq!(root, TrendResponse::Root(Vec::new()));
    }

    #[tokio::test]
    async fn upstream_failure_propagates_when_configured() {
        let store = BrokenStore { missing_documents: false };
        let mut req = term_request("gps", 1);
        req.params.on_upstream_error = UpstreamErrorPolicy::Propagate;
        let err = trends(&store, &req).await.unwrap_err();
        assert!(matches!(err, TrendError::UpstreamUnavailable(_)));
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn missing_document_aborts_request() {
        let store = BrokenStore { missing_documents: true };
        let mut req = term_request("gps", 1);
        assert!(trends(&store, &req).await.unwrap().is_empty());

        req.params.on_upstream_error = UpstreamErrorPolicy::Propagate;
        let err = trends(&store, &req).await.unwrap_err();
        assert!(matches!(err, TrendError::NotFound(7)));
    }

    #[tokio::test]
    async fn min_velocity_is_a_pass_through() {
        let store = InMemoryStore::new();
        let doc1 = insert_doc(&store, "http://example.com/doc1", "twitter").await;
        insert_occ(&store, doc1, "gps", 1, 9).await;

        let mut req = term_request("gps", 1);
        req.params.min_velocity = Some(100.0);
        assert_eq!(trends(&store, &req).await.unwrap().len(), 1);
    }

    #[test]
    fn parses_upstream_policy() {
        assert_eq!(
            "propagate".parse::<UpstreamErrorPolicy>().unwrap(),
            UpstreamErrorPolicy::Propagate
        );
        assert!("retry".parse::<UpstreamErrorPolicy>().is_err());
    }
}
