//! HTTP API server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/v1/locations` | Configured miners, ordered by location |
//! | `GET`  | `/v1/trends/{location}` | Ranked term totals with velocity |
//! | `GET`  | `/v1/trends/{location}/{term}` | Per-term records with sub-term breakdown and sources |
//!
//! Trend routes accept `from`, `to`, `interval`, `limit`, `velocity` and
//! `source` query parameters; see [`crate::trends`].
//!
//! # Error Contract
//!
//! With the default `on_upstream_error = "emit_empty"` policy a failed
//! aggregation answers `200 []`. Under `"propagate"` errors use:
//!
//! ```json
//! { "error": { "code": "upstream_unavailable", "message": "..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404),
//! `upstream_unavailable` (502), `internal` (500).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use udadisi_core::{trends, TrendError, TrendResponse, UpstreamErrorPolicy};

use crate::config::Config;
use crate::db;
use crate::miners::{list_miners, Miner};
use crate::sqlite_store::SqliteStore;
use crate::trends::{build_request, TrendQuery};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: SqliteStore,
}

impl AppState {
    pub fn new(config: Config, store: SqliteStore) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}

/// Builds the router with all routes and CORS applied.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/v1/locations", get(handle_locations))
        .route("/v1/trends/{location}", get(handle_root_trends))
        .route("/v1/trends/{location}/{term}", get(handle_term_trends))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` and runs until terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    let state = AppState::new(config.clone(), SqliteStore::new(pool));
    let bind_addr = config.server.bind.clone();

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %listener.local_addr()?, "udadisi server listening");
    println!("Udadisi server listening on http://{}", bind_addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<TrendError> for AppError {
    fn from(err: TrendError) -> Self {
        let status = match err {
            TrendError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            TrendError::NotFound(_) => StatusCode::NOT_FOUND,
            TrendError::InvalidWindow(_) => StatusCode::BAD_REQUEST,
        };
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /v1/locations ============

async fn handle_locations(State(state): State<AppState>) -> Result<Json<Vec<Miner>>, AppError> {
    match list_miners(state.store.pool()).await {
        Ok(miners) => Ok(Json(miners)),
        Err(e) => match state.config.trends.upstream_policy() {
            UpstreamErrorPolicy::EmitEmpty => {
                warn!(error = %e, "listing miners failed; returning empty result");
                Ok(Json(Vec::new()))
            }
            UpstreamErrorPolicy::Propagate => Err(internal(e.to_string())),
        },
    }
}

// ============ GET /v1/trends/... ============

async fn handle_root_trends(
    State(state): State<AppState>,
    Path(location): Path<String>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<TrendResponse>, AppError> {
    let req = build_request(&state.config, &location, None, &query);
    Ok(Json(trends(&state.store, &req).await?))
}

async fn handle_term_trends(
    State(state): State<AppState>,
    Path((location, term)): Path<(String, String)>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<TrendResponse>, AppError> {
    let req = build_request(&state.config, &location, Some(&term), &query);
    Ok(Json(trends(&state.store, &req).await?))
}
