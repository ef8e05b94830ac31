//! Diagnostics endpoints
//!
//! Explicit introspection over the loader: health, counters and cache
//! invalidation.

use crate::loader::{CacheStats, HealthReport};
use crate::{ApiResult, AppState};
use axum::{
    extract::{Query, State},
    routing::{delete, get},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Module name ("folio-timeline")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Timeline host reachability
    pub upstream: HealthReport,
}

/// GET /health
///
/// Always 200; upstream problems are reported in the body.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let upstream = state.loader.health_check().await;

    Json(HealthResponse {
        module: "folio-timeline".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime.num_seconds().max(0) as u64,
        upstream,
    })
}

/// Stats response: counters plus the current cache keys
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    pub cache_keys: Vec<String>,
}

/// GET /stats
pub async fn cache_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        stats: state.loader.get_cache_stats().await,
        cache_keys: state.loader.cache_keys().await,
    })
}

#[derive(Debug, Deserialize)]
pub struct ClearCacheParams {
    /// Regex over cache keys; absent clears everything
    pub pattern: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub removed: usize,
}

/// DELETE /cache?pattern=^project-
///
/// **Errors:**
/// - 400 Bad Request: pattern is not a valid regex
pub async fn clear_cache(
    State(state): State<AppState>,
    Query(params): Query<ClearCacheParams>,
) -> ApiResult<Json<ClearCacheResponse>> {
    let removed = state.loader.clear_cache(params.pattern.as_deref()).await?;
    info!(removed, "Cache cleared via diagnostics API");
    Ok(Json(ClearCacheResponse { removed }))
}

/// Build diagnostics routes
pub fn diagnostics_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(cache_stats))
        .route("/cache", delete(clear_cache))
}
