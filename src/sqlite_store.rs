//! SQLite-backed [`Store`] implementation.
//!
//! Maps each [`Store`] operation onto the `documents` and `occurrences`
//! tables created by [`migrate`](crate::migrate). Timestamps are stored
//! as Unix seconds.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use udadisi_core::models::{
    Document, DocumentInsert, NewDocument, NewOccurrence, Occurrence, OccurrenceFilter,
};
use udadisi_core::store::Store;

/// SQLite implementation of the [`Store`] trait.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

pub fn from_ts(ts: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0).ok_or_else(|| anyhow!("timestamp out of range: {}", ts))
}

fn occurrence_from_row(row: &SqliteRow) -> Result<Occurrence> {
    Ok(Occurrence {
        id: row.get("id"),
        document_id: row.get("document_id"),
        term: row.get("term"),
        count: row.get("word_count"),
        timestamp: from_ts(row.get("posted"))?,
        location: row.get("location"),
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn fetch_occurrences(&self, filter: &OccurrenceFilter) -> Result<Vec<Occurrence>> {
        let rows = sqlx::query(
            r#"
            SELECT o.id, o.document_id, o.term, o.word_count, o.posted, o.location
            FROM occurrences o
            JOIN documents d ON d.id = o.document_id
            WHERE (?1 IS NULL OR LOWER(d.location) LIKE '%' || LOWER(?1) || '%')
              AND (?2 IS NULL OR LOWER(o.term) LIKE LOWER(?2))
              AND (?3 IS NULL OR LOWER(d.source) = LOWER(?3))
              AND (?4 IS NULL OR o.posted >= ?4)
              AND (?5 IS NULL OR o.posted <= ?5)
            ORDER BY o.posted, o.term, o.id
            "#,
        )
        .bind(filter.location())
        .bind(filter.term())
        .bind(filter.source())
        .bind(filter.from.map(|t| t.timestamp()))
        .bind(filter.to.map(|t| t.timestamp()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(occurrence_from_row).collect()
    }

    async fn fetch_document(&self, id: i64) -> Result<Option<Document>> {
        let row = sqlx::query(
            "SELECT id, source_uri, location, source, mined, posted FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| -> Result<Document> {
            Ok(Document {
                id: r.get("id"),
                origin_uri: r.get("source_uri"),
                location: r.get("location"),
                captured_at: from_ts(r.get("mined"))?,
                published_at: from_ts(r.get("posted"))?,
                origin_label: r.get("source"),
            })
        })
        .transpose()
    }

    async fn document_terms(&self, document_id: i64) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query(
            "SELECT term, word_count FROM occurrences WHERE document_id = ? ORDER BY id ASC",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| (r.get("term"), r.get("word_count")))
            .collect())
    }

    async fn insert_document_if_absent(&self, doc: &NewDocument) -> Result<DocumentInsert> {
        let inserted: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO documents (source_uri, location, source, mined, posted)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(source_uri, location) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&doc.origin_uri)
        .bind(&doc.location)
        .bind(&doc.origin_label)
        .bind(doc.captured_at.timestamp())
        .bind(doc.published_at.timestamp())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(id) = inserted {
            return Ok(DocumentInsert { id, created: true });
        }

        let id: i64 =
            sqlx::query_scalar("SELECT id FROM documents WHERE source_uri = ? AND location = ?")
                .bind(&doc.origin_uri)
                .bind(&doc.location)
                .fetch_one(&self.pool)
                .await?;

        Ok(DocumentInsert { id, created: false })
    }

    async fn insert_occurrence(&self, occurrence: &NewOccurrence) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO occurrences (document_id, term, word_count, posted, location)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(occurrence.document_id)
        .bind(occurrence.term.to_lowercase())
        .bind(occurrence.count)
        .bind(occurrence.timestamp.timestamp())
        .bind(&occurrence.location)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn insert_document_with_terms(
        &self,
        doc: &NewDocument,
        terms: &[(String, i64)],
    ) -> Result<DocumentInsert> {
        let mut tx = self.pool.begin().await?;

        let inserted: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO documents (source_uri, location, source, mined, posted)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(source_uri, location) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&doc.origin_uri)
        .bind(&doc.location)
        .bind(&doc.origin_label)
        .bind(doc.captured_at.timestamp())
        .bind(doc.published_at.timestamp())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(id) = inserted else {
            let id: i64 =
                sqlx::query_scalar("SELECT id FROM documents WHERE source_uri = ? AND location = ?")
                    .bind(&doc.origin_uri)
                    .bind(&doc.location)
                    .fetch_one(&mut *tx)
                    .await?;
            tx.commit().await?;
            return Ok(DocumentInsert { id, created: false });
        };

        for (term, count) in terms {
            sqlx::query(
                "INSERT INTO occurrences (document_id, term, word_count, posted, location) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(id)
            .bind(term.to_lowercase())
            .bind(*count)
            .bind(doc.published_at.timestamp())
            .bind(&doc.location)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(DocumentInsert { id, created: true })
    }
}
