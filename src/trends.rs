//! Trend queries: raw boundary parameters → [`TrendRequest`] → engine.
//!
//! Used by both `udadisi trends` and the `/v1/trends` HTTP routes. All
//! parameters are taken as strings and parsed leniently: a malformed
//! number falls back to the configured default and a malformed time
//! bound is treated as absent.

use anyhow::Result;
use serde::Deserialize;
use tracing::warn;

use udadisi_core::models::OccurrenceFilter;
use udadisi_core::window::TimeWindow;
use udadisi_core::{trends, TrendParams, TrendRequest, TrendResponse};

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Raw query parameters as they arrive from the CLI or a query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrendQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub interval: Option<String>,
    pub limit: Option<String>,
    pub velocity: Option<String>,
    pub source: Option<String>,
}

fn lenient<T: std::str::FromStr>(name: &str, raw: Option<&str>) -> Option<T> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(param = name, value = raw, "ignoring malformed query parameter");
            None
        }
    }
}

/// Resolves raw parameters against config defaults.
pub fn build_request(
    config: &Config,
    location: &str,
    term: Option<&str>,
    query: &TrendQuery,
) -> TrendRequest {
    let defaults = &config.trends;
    let interval = lenient("interval", query.interval.as_deref()).unwrap_or(defaults.default_interval);
    let limit = lenient::<usize>("limit", query.limit.as_deref())
        .filter(|l| *l > 0)
        .or(defaults.default_limit);
    let window = TimeWindow::resolve(query.from.as_deref(), query.to.as_deref(), interval);

    TrendRequest {
        filter: OccurrenceFilter {
            location: Some(location.to_string()),
            term: term.map(str::to_string),
            from: window.from,
            to: window.to,
            source: query.source.clone(),
        },
        params: TrendParams {
            interval,
            limit,
            min_velocity: lenient("velocity", query.velocity.as_deref()),
            grouping: defaults.grouping_mode(),
            on_upstream_error: defaults.upstream_policy(),
        },
    }
}

pub async fn run_trends(
    config: &Config,
    location: &str,
    term: Option<&str>,
    query: &TrendQuery,
) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let req = build_request(config, location, term, query);

    let response: TrendResponse = trends(&store, &req).await?;
    pool.close().await;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
