//! Project sources
//!
//! Callers read timeline data through [`ProjectSource`]. Two backings exist:
//! - [`RemoteSource`]: live HTTP data through a [`TimelineLoader`]
//! - [`StaticSource`]: a dataset compiled into the binary
//!
//! [`FallbackSource`] pairs them so a remote failure degrades to bundled
//! content instead of an error.

use crate::error::{LoaderError, LoaderResult};
use crate::loader::TimelineLoader;
use crate::models::{ProjectDescriptor, TimelineIndex};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

/// Dataset shipped with the binary
const BUNDLED_DATASET: &str = include_str!("../data/fallback.json");

/// Read access to timeline data
#[async_trait]
pub trait ProjectSource: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    async fn index(&self) -> LoaderResult<Arc<TimelineIndex>>;

    async fn project(&self, year: i32, slug: &str) -> LoaderResult<Arc<ProjectDescriptor>>;

    async fn all_projects(&self) -> LoaderResult<Vec<Arc<ProjectDescriptor>>>;

    async fn year_projects(&self, year: i32) -> LoaderResult<Vec<Arc<ProjectDescriptor>>>;
}

/// Live data from the timeline host
#[derive(Debug, Clone)]
pub struct RemoteSource {
    loader: TimelineLoader,
}

impl RemoteSource {
    pub fn new(loader: TimelineLoader) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl ProjectSource for RemoteSource {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn index(&self) -> LoaderResult<Arc<TimelineIndex>> {
        self.loader.load_index().await
    }

    async fn project(&self, year: i32, slug: &str) -> LoaderResult<Arc<ProjectDescriptor>> {
        self.loader.load_project(year, slug).await
    }

    async fn all_projects(&self) -> LoaderResult<Vec<Arc<ProjectDescriptor>>> {
        self.loader.load_all_projects().await
    }

    async fn year_projects(&self, year: i32) -> LoaderResult<Vec<Arc<ProjectDescriptor>>> {
        self.loader.load_year_projects(year).await
    }
}

#[derive(Deserialize)]
struct StaticDataset {
    index: TimelineIndex,
    projects: Vec<ProjectDescriptor>,
}

/// In-memory dataset, immutable after construction
#[derive(Debug, Clone)]
pub struct StaticSource {
    index: Arc<TimelineIndex>,
    projects: Vec<Arc<ProjectDescriptor>>,
}

impl StaticSource {
    /// The dataset compiled into the binary
    pub fn bundled() -> LoaderResult<Self> {
        Self::from_json(BUNDLED_DATASET)
    }

    /// Parse `{ "index": ..., "projects": [...] }`
    pub fn from_json(json: &str) -> LoaderResult<Self> {
        let dataset: StaticDataset = serde_json::from_str(json)
            .map_err(|e| LoaderError::Internal(format!("invalid static dataset: {}", e)))?;

        Ok(Self {
            index: Arc::new(dataset.index),
            projects: dataset.projects.into_iter().map(Arc::new).collect(),
        })
    }

    /// Projects in index order; slugs without a descriptor are skipped
    fn ordered(&self, year: Option<i32>) -> Vec<Arc<ProjectDescriptor>> {
        self.index
            .project_refs()
            .into_iter()
            .filter(|r| year.map_or(true, |y| r.year == y))
            .filter_map(|r| self.find(r.year, &r.slug))
            .collect()
    }

    fn find(&self, year: i32, slug: &str) -> Option<Arc<ProjectDescriptor>> {
        self.projects
            .iter()
            .find(|p| p.year == year && p.id == slug)
            .cloned()
    }
}

#[async_trait]
impl ProjectSource for StaticSource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn index(&self) -> LoaderResult<Arc<TimelineIndex>> {
        Ok(Arc::clone(&self.index))
    }

    async fn project(&self, year: i32, slug: &str) -> LoaderResult<Arc<ProjectDescriptor>> {
        self.find(year, slug).ok_or_else(|| LoaderError::Http {
            status: 404,
            url: format!("static:{}/{}", year, slug),
        })
    }

    async fn all_projects(&self) -> LoaderResult<Vec<Arc<ProjectDescriptor>>> {
        Ok(self.ordered(None))
    }

    async fn year_projects(&self, year: i32) -> LoaderResult<Vec<Arc<ProjectDescriptor>>> {
        Ok(self.ordered(Some(year)))
    }
}

/// Primary source with a fallback used whenever the primary fails
pub struct FallbackSource {
    primary: Arc<dyn ProjectSource>,
    fallback: Arc<dyn ProjectSource>,
}

impl FallbackSource {
    pub fn new(primary: Arc<dyn ProjectSource>, fallback: Arc<dyn ProjectSource>) -> Self {
        Self { primary, fallback }
    }

    fn log_fallback(&self, operation: &str, err: &LoaderError) {
        warn!(
            primary = self.primary.name(),
            fallback = self.fallback.name(),
            operation,
            error = %err,
            "Primary source failed, serving fallback data"
        );
    }
}

#[async_trait]
impl ProjectSource for FallbackSource {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn index(&self) -> LoaderResult<Arc<TimelineIndex>> {
        match self.primary.index().await {
            Ok(index) => Ok(index),
            Err(e) => {
                self.log_fallback("index", &e);
                self.fallback.index().await
            }
        }
    }

    async fn project(&self, year: i32, slug: &str) -> LoaderResult<Arc<ProjectDescriptor>> {
        match self.primary.project(year, slug).await {
            Ok(project) => Ok(project),
            Err(e @ LoaderError::InvalidInput(_)) => Err(e),
            Err(e) => {
                self.log_fallback("project", &e);
                self.fallback.project(year, slug).await
            }
        }
    }

    async fn all_projects(&self) -> LoaderResult<Vec<Arc<ProjectDescriptor>>> {
        match self.primary.all_projects().await {
            Ok(projects) => Ok(projects),
            Err(e) => {
                self.log_fallback("all_projects", &e);
                self.fallback.all_projects().await
            }
        }
    }

    async fn year_projects(&self, year: i32) -> LoaderResult<Vec<Arc<ProjectDescriptor>>> {
        match self.primary.year_projects(year).await {
            Ok(projects) => Ok(projects),
            Err(e) => {
                self.log_fallback("year_projects", &e);
                self.fallback.year_projects(year).await
            }
        }
    }
}
