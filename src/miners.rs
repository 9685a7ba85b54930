//! Miner registry: where text is mined from, per location.
//!
//! Backs `udadisi miner add`, `udadisi locations` and `GET /v1/locations`.

use anyhow::{bail, Result};
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;

/// A configured miner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Miner {
    pub id: i64,
    pub name: String,
    pub source: String,
    pub location: String,
    pub url: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Fields for a new miner.
#[derive(Debug, Clone)]
pub struct NewMiner {
    pub name: String,
    pub source: String,
    pub location: String,
    pub url: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

pub async fn insert_miner(pool: &SqlitePool, miner: &NewMiner) -> Result<i64> {
    if miner.name.trim().is_empty() || miner.location.trim().is_empty() {
        bail!("miner name and location must not be empty");
    }
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO miners (name, source, location, url, latitude, longitude)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&miner.name)
    .bind(&miner.source)
    .bind(&miner.location)
    .bind(&miner.url)
    .bind(miner.latitude)
    .bind(miner.longitude)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// All miners, ordered by location then name.
pub async fn list_miners(pool: &SqlitePool) -> Result<Vec<Miner>> {
    let rows = sqlx::query(
        "SELECT id, name, source, location, url, latitude, longitude FROM miners ORDER BY location, name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|r| Miner {
            id: r.get("id"),
            name: r.get("name"),
            source: r.get("source"),
            location: r.get("location"),
            url: r.get("url"),
            latitude: r.get("latitude"),
            longitude: r.get("longitude"),
        })
        .collect())
}

pub async fn run_add_miner(config: &Config, miner: NewMiner) -> Result<()> {
    let pool = db::connect(config).await?;
    let id = insert_miner(&pool, &miner).await?;
    pool.close().await;
    println!("Added miner {} ({}) for {}", id, miner.name, miner.location);
    Ok(())
}

pub async fn run_list_locations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let miners = list_miners(&pool).await?;
    pool.close().await;

    if miners.is_empty() {
        println!("No miners configured.");
        return Ok(());
    }

    println!("{:<20} {:<20} {:<12} URL", "LOCATION", "NAME", "SOURCE");
    for m in &miners {
        println!("{:<20} {:<20} {:<12} {}", m.location, m.name, m.source, m.url);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    use crate::migrate::create_tables;

    fn miner(name: &str, location: &str) -> NewMiner {
        NewMiner {
            name: name.to_string(),
            source: "twitter".to_string(),
            location: location.to_string(),
            url: format!("http://example.com/{}", name),
            latitude: Some(-1.29),
            longitude: None,
        }
    }

    #[tokio::test]
    async fn lists_miners_by_location() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        create_tables(&pool).await.unwrap();

        insert_miner(&pool, &miner("b", "Nairobi")).await.unwrap();
        insert_miner(&pool, &miner("a", "Nairobi")).await.unwrap();
        insert_miner(&pool, &miner("z", "Lagos")).await.unwrap();

        let miners = list_miners(&pool).await.unwrap();
        let names: Vec<&str> = miners.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["z", "a", "b"]);
        assert_eq!(miners[0].latitude, Some(-1.29));
        assert_eq!(miners[0].longitude, None);

        assert!(insert_miner(&pool, &miner("", "Lagos")).await.is_err());
    }
}
