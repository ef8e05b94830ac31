//! folio-timeline library interface
//!
//! Timeline data loading for the portfolio site: the cached, single-flight
//! [`TimelineLoader`], image auto-detection, project sources with a bundled
//! fallback, and an HTTP diagnostics router.

pub mod api;
pub mod error;
pub mod images;
pub mod loader;
pub mod models;
pub mod source;

pub use crate::error::{ApiError, ApiResult, LoaderError, LoaderResult};
pub use crate::loader::TimelineLoader;
pub use crate::source::{FallbackSource, ProjectSource, RemoteSource, StaticSource};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across diagnostics handlers
#[derive(Clone)]
pub struct AppState {
    /// Loader used for health, stats, cache and image endpoints
    pub loader: TimelineLoader,
    /// Source used for data endpoints (normally remote with static fallback)
    pub source: Arc<dyn ProjectSource>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(loader: TimelineLoader, source: Arc<dyn ProjectSource>) -> Self {
        Self {
            loader,
            source,
            startup_time: Utc::now(),
        }
    }

    /// Remote source over `loader`, falling back to the bundled dataset
    pub fn with_bundled_fallback(loader: TimelineLoader) -> LoaderResult<Self> {
        let remote: Arc<dyn ProjectSource> = Arc::new(RemoteSource::new(loader.clone()));
        let bundled: Arc<dyn ProjectSource> = Arc::new(StaticSource::bundled()?);
        let source = Arc::new(FallbackSource::new(remote, bundled));
        Ok(Self::new(loader, source))
    }
}

/// Build the diagnostics router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::diagnostics_routes())
        .merge(api::timeline_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
