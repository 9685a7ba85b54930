//! # Udadisi Core
//!
//! The trend aggregation engine: data models, the grouping accumulator,
//! velocity, deterministic ranking, the store abstraction, and the
//! `trends` entry point that ties them together.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or other
//! native-only dependencies.

pub mod accumulator;
pub mod error;
pub mod models;
pub mod rank;
pub mod store;
pub mod trend;
pub mod velocity;
pub mod window;

pub use accumulator::{GroupingAccumulator, GroupingMode};
pub use error::TrendError;
pub use trend::{trends, TrendParams, TrendRequest, TrendResponse, UpstreamErrorPolicy};
