//! # Udadisi
//!
//! **Trend aggregation over mined term occurrences.**
//!
//! Miners capture documents per location and record how often each term
//! occurs in them. Udadisi stores those occurrences and answers trend
//! queries: per-term totals, velocity over a time window, and the source
//! documents behind each term.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ JSONL mined │──▶│   ingest    │──▶│    SQLite    │
//! │   records   │   │ word counts │   │ docs + occs  │
//! └─────────────┘   └─────────────┘   └──────┬───────┘
//!                                            │ Store
//!                                     ┌──────▼───────┐
//!                                     │ udadisi-core │
//!                                     │ group · rank │
//!                                     │  velocity    │
//!                                     └──────┬───────┘
//!                          ┌─────────────────┤
//!                          ▼                 ▼
//!                     ┌─────────┐      ┌──────────┐
//!                     │   CLI   │      │   HTTP   │
//!                     └─────────┘      └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`db`] | SQLite connection pool with WAL mode |
//! | [`migrate`] | Schema creation and data reset |
//! | [`sqlite_store`] | SQLite implementation of the core `Store` trait |
//! | [`ingest`] | JSON Lines ingestion with idempotent document inserts |
//! | [`miners`] | Miner registry and location listing |
//! | [`trends`] | Query parameter resolution and the `trends` command |
//! | [`server`] | HTTP API (Axum) with CORS |

pub mod config;
pub mod db;
pub mod ingest;
pub mod migrate;
pub mod miners;
pub mod server;
pub mod sqlite_store;
pub mod trends;

pub use udadisi_core::{GroupingMode, TrendError, TrendResponse, UpstreamErrorPolicy};
