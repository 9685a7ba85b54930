use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    create_tables(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Drop and recreate the document and occurrence tables.
///
/// Miners are kept: they describe where to mine, not what was mined.
pub async fn reset_data(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    sqlx::query("DROP TABLE IF EXISTS occurrences")
        .execute(&pool)
        .await?;
    sqlx::query("DROP TABLE IF EXISTS documents")
        .execute(&pool)
        .await?;
    create_tables(&pool).await?;
    pool.close().await;
    Ok(())
}

pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    // One document per (source_uri, location); ingestion relies on the
    // constraint for idempotent inserts.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_uri TEXT NOT NULL,
            location TEXT NOT NULL,
            source TEXT NOT NULL,
            mined INTEGER NOT NULL,
            posted INTEGER NOT NULL,
            UNIQUE(source_uri, location)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS occurrences (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            document_id INTEGER NOT NULL,
            term TEXT NOT NULL,
            word_count INTEGER NOT NULL CHECK (word_count > 0),
            posted INTEGER NOT NULL,
            location TEXT NOT NULL,
            FOREIGN KEY (document_id) REFERENCES documents(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS miners (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            source TEXT NOT NULL,
            location TEXT NOT NULL,
            url TEXT NOT NULL,
            latitude REAL,
            longitude REAL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_occurrences_posted_term ON occurrences(posted, term)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_occurrences_document_id ON occurrences(document_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_location ON documents(location)")
        .execute(pool)
        .await?;

    Ok(())
}
