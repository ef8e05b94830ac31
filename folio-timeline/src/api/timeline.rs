//! Read-only timeline data endpoints
//!
//! Index and project reads go through the configured [`ProjectSource`]
//! (remote with bundled fallback in the binary). Image detection and year
//! meta always ask the loader directly.
//!
//! [`ProjectSource`]: crate::source::ProjectSource

use crate::models::{is_valid_slug, ProjectDescriptor, TimelineIndex, YearMeta};
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

/// GET /timeline
pub async fn get_index(State(state): State<AppState>) -> ApiResult<Json<Arc<TimelineIndex>>> {
    Ok(Json(state.source.index().await?))
}

/// GET /projects
pub async fn get_all_projects(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Arc<ProjectDescriptor>>>> {
    Ok(Json(state.source.all_projects().await?))
}

/// GET /projects/:year
pub async fn get_year_projects(
    State(state): State<AppState>,
    Path(year): Path<i32>,
) -> ApiResult<Json<Vec<Arc<ProjectDescriptor>>>> {
    Ok(Json(state.source.year_projects(year).await?))
}

/// GET /projects/:year/:slug
///
/// **Errors:**
/// - 400 Bad Request: malformed slug
/// - 404 Not Found: no such project upstream or in the bundled data
pub async fn get_project(
    State(state): State<AppState>,
    Path((year, slug)): Path<(i32, String)>,
) -> ApiResult<Json<Arc<ProjectDescriptor>>> {
    if !is_valid_slug(&slug) {
        return Err(ApiError::BadRequest(format!("invalid project slug '{}'", slug)));
    }

    match state.source.project(year, &slug).await {
        Ok(project) => Ok(Json(project)),
        Err(crate::LoaderError::Http { status: 404, .. }) => {
            Err(ApiError::NotFound(format!("project {}/{}", year, slug)))
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Serialize)]
pub struct ImagesResponse {
    pub year: i32,
    pub slug: String,
    pub images: Vec<String>,
}

/// GET /projects/:year/:slug/images
pub async fn get_project_images(
    State(state): State<AppState>,
    Path((year, slug)): Path<(i32, String)>,
) -> ApiResult<Json<ImagesResponse>> {
    if !is_valid_slug(&slug) {
        return Err(ApiError::BadRequest(format!("invalid project slug '{}'", slug)));
    }

    let images = state.loader.auto_detect_images(year, &slug).await;
    Ok(Json(ImagesResponse { year, slug, images }))
}

/// GET /years/:year/meta
pub async fn get_year_meta(State(state): State<AppState>, Path(year): Path<i32>) -> Json<YearMeta> {
    Json(state.loader.get_year_config(year).await)
}

/// Build timeline data routes
pub fn timeline_routes() -> Router<AppState> {
    Router::new()
        .route("/timeline", get(get_index))
        .route("/projects", get(get_all_projects))
        .route("/projects/:year", get(get_year_projects))
        .route("/projects/:year/:slug", get(get_project))
        .route("/projects/:year/:slug/images", get(get_project_images))
        .route("/years/:year/meta", get(get_year_meta))
}
