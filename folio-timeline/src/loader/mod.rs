//! Timeline loader
//!
//! Cached, de-duplicated, retried access to the timeline JSON resources:
//! - `{base}/projects.json` (cache key `timeline-index`)
//! - `{base}/{year}/{slug}/project.json` (cache key `project-{year}-{slug}`)
//!
//! At most one fetch per cache key is in flight at any time. Concurrent
//! callers for the same key await one shared result. The fetch runs on its
//! own task, so a caller that stops waiting does not cancel it and the
//! result still lands in the cache.

pub mod cache;
pub mod fetch;
pub mod stats;

pub use cache::{CacheEntry, TtlCache};
pub use stats::{CacheStats, HealthReport, HealthStatus, LoaderStats};

use crate::error::{LoaderError, LoaderResult};
use crate::images;
use crate::models::{default_year_meta, is_valid_slug, ProjectDescriptor, TimelineIndex, YearMeta};
use chrono::Utc;
use folio_common::LoaderSettings;
use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use regex::Regex;
use reqwest::Client;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Cache key of the timeline index
pub const INDEX_CACHE_KEY: &str = "timeline-index";

const USER_AGENT: &str = concat!("folio-timeline/", env!("CARGO_PKG_VERSION"));

/// Cache key of one project descriptor
pub fn project_cache_key(year: i32, slug: &str) -> String {
    format!("project-{}-{}", year, slug)
}

/// Values held in the cache and handed out by shared loads
#[derive(Debug, Clone)]
enum CachedValue {
    Index(Arc<TimelineIndex>),
    Project(Arc<ProjectDescriptor>),
}

type SharedLoad = Shared<BoxFuture<'static, LoaderResult<CachedValue>>>;

struct LoaderInner {
    settings: LoaderSettings,
    client: Client,
    cache: Mutex<TtlCache<CachedValue>>,
    in_flight: Mutex<HashMap<String, SharedLoad>>,
    stats: LoaderStats,
}

impl LoaderInner {
    fn index_url(&self) -> String {
        format!("{}/projects.json", self.settings.base_url)
    }

    fn project_url(&self, year: i32, slug: &str) -> String {
        format!("{}/{}/{}/project.json", self.settings.base_url, year, slug)
    }

    fn year_meta_url(&self, year: i32) -> String {
        format!("{}/{}/meta.json", self.settings.base_url, year)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.settings.request_timeout_ms)
    }
}

/// Timeline data service.
///
/// Cheap to clone; clones share cache, in-flight map and counters.
#[derive(Clone)]
pub struct TimelineLoader {
    inner: Arc<LoaderInner>,
}

impl std::fmt::Debug for TimelineLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineLoader")
            .field("base_url", &self.inner.settings.base_url)
            .finish()
    }
}

impl TimelineLoader {
    pub fn new(settings: LoaderSettings) -> LoaderResult<Self> {
        let settings = settings.normalized();
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .build()
            .map_err(|e| LoaderError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            inner: Arc::new(LoaderInner {
                cache: Mutex::new(TtlCache::new(Duration::from_millis(settings.cache_expiry_ms))),
                in_flight: Mutex::new(HashMap::new()),
                stats: LoaderStats::default(),
                client,
                settings,
            }),
        })
    }

    pub fn settings(&self) -> &LoaderSettings {
        &self.inner.settings
    }

    /// HEAD the index. Never fails; problems become an `unhealthy` report.
    pub async fn health_check(&self) -> HealthReport {
        let inner = &self.inner;
        let url = inner.index_url();
        let started = Instant::now();

        let outcome = inner
            .client
            .head(&url)
            .timeout(inner.request_timeout())
            .send()
            .await
            .map_err(|e| LoaderError::from_reqwest(&url, inner.settings.request_timeout_ms, e))
            .and_then(|response| {
                let status = response.status();
                if status.is_success() {
                    Ok(())
                } else {
                    Err(LoaderError::Http {
                        status: status.as_u16(),
                        url: url.clone(),
                    })
                }
            });

        let timestamp = Utc::now();
        inner.stats.record_health_check(timestamp);

        match outcome {
            Ok(()) => {
                let response_time_ms = started.elapsed().as_millis() as u64;
                debug!(url = %url, response_time_ms, "Health check passed");
                HealthReport {
                    status: HealthStatus::Healthy,
                    response_time_ms: Some(response_time_ms),
                    error: None,
                    timestamp,
                }
            }
            Err(err) => {
                inner.stats.record_error();
                warn!(url = %url, error = %err, "Health check failed");
                HealthReport {
                    status: HealthStatus::Unhealthy,
                    response_time_ms: None,
                    error: Some(err.to_string()),
                    timestamp,
                }
            }
        }
    }

    /// Load `projects.json`
    pub async fn load_index(&self) -> LoaderResult<Arc<TimelineIndex>> {
        let value = self
            .load_shared(INDEX_CACHE_KEY.to_string(), fetch_index)
            .await?;

        match value {
            CachedValue::Index(index) => Ok(index),
            CachedValue::Project(_) => Err(LoaderError::Internal(
                "index cache key holds a project".to_string(),
            )),
        }
    }

    /// Load one project descriptor, auto-detecting images when it names none
    pub async fn load_project(&self, year: i32, slug: &str) -> LoaderResult<Arc<ProjectDescriptor>> {
        if !is_valid_slug(slug) {
            return Err(LoaderError::InvalidInput(format!(
                "invalid project slug '{}'",
                slug
            )));
        }

        let slug_owned = slug.to_string();
        let value = self
            .load_shared(project_cache_key(year, slug), move |inner| {
                fetch_project(inner, year, slug_owned)
            })
            .await?;

        match value {
            CachedValue::Project(project) => Ok(project),
            CachedValue::Index(_) => Err(LoaderError::Internal(
                "project cache key holds the index".to_string(),
            )),
        }
    }

    /// Load every project listed in the index, `batch_size` at a time.
    ///
    /// Projects that fail are logged and left out; only an index failure
    /// fails the whole call.
    pub async fn load_all_projects(&self) -> LoaderResult<Vec<Arc<ProjectDescriptor>>> {
        let index = self.load_index().await?;
        let refs = index.project_refs();
        let mut projects = Vec::with_capacity(refs.len());

        for batch in refs.chunks(self.inner.settings.batch_size) {
            let loads = batch.iter().map(|project| async move {
                match self.load_project(project.year, &project.slug).await {
                    Ok(descriptor) => Some(descriptor),
                    Err(e) => {
                        warn!(
                            year = project.year,
                            slug = %project.slug,
                            error = %e,
                            "Failed to load project, omitting it"
                        );
                        None
                    }
                }
            });

            projects.extend(join_all(loads).await.into_iter().flatten());
        }

        info!(loaded = projects.len(), listed = refs.len(), "Loaded all projects");
        Ok(projects)
    }

    /// Load one year's projects sequentially, skipping failures.
    ///
    /// A year absent from the index yields an empty list.
    pub async fn load_year_projects(&self, year: i32) -> LoaderResult<Vec<Arc<ProjectDescriptor>>> {
        let index = self.load_index().await?;
        let Some(slugs) = index.year_slugs(year) else {
            warn!(year, "Year not present in timeline index");
            return Ok(Vec::new());
        };

        let mut projects = Vec::with_capacity(slugs.len());
        for slug in &slugs {
            match self.load_project(year, slug).await {
                Ok(descriptor) => projects.push(descriptor),
                Err(e) => warn!(year, slug = %slug, error = %e, "Failed to load project, skipping"),
            }
        }

        Ok(projects)
    }

    /// Load `{year}/meta.json`, falling back to the synthesized default on
    /// any failure.
    pub async fn get_year_config(&self, year: i32) -> YearMeta {
        let inner = &self.inner;
        let url = inner.year_meta_url(year);

        let loaded = fetch::fetch_json(&inner.client, &url, inner.request_timeout())
            .await
            .and_then(|value| {
                serde_json::from_value::<YearMeta>(value).map_err(|e| LoaderError::Parse {
                    url: url.clone(),
                    message: e.to_string(),
                })
            });

        match loaded {
            Ok(meta) => meta.complete_for(year),
            Err(e) => {
                debug!(year, error = %e, "Year meta unavailable, using default");
                default_year_meta(year)
            }
        }
    }

    /// Probe `{slug}_{n}.webp` images for a project; never fails
    pub async fn auto_detect_images(&self, year: i32, slug: &str) -> Vec<String> {
        images::auto_detect_images(&self.inner.client, &self.inner.settings, year, slug).await
    }

    /// Clear the whole cache, or only keys matching `pattern` (a regex).
    ///
    /// Returns the number of entries removed.
    pub async fn clear_cache(&self, pattern: Option<&str>) -> LoaderResult<usize> {
        let mut cache = self.inner.cache.lock().await;
        let removed = match pattern {
            None => cache.clear(),
            Some(pattern) => {
                let regex = Regex::new(pattern).map_err(|e| {
                    LoaderError::InvalidInput(format!("invalid cache pattern '{}': {}", pattern, e))
                })?;
                cache.clear_matching(&regex)
            }
        };

        info!(pattern = pattern.unwrap_or("*"), removed, "Cache cleared");
        Ok(removed)
    }

    /// Counters plus cache size, hit rate and in-flight request count
    pub async fn get_cache_stats(&self) -> CacheStats {
        let cache_size = self.inner.cache.lock().await.len();
        let active_requests = self.inner.in_flight.lock().await.len();
        self.inner.stats.snapshot(cache_size, active_requests)
    }

    /// Current cache keys, sorted
    pub async fn cache_keys(&self) -> Vec<String> {
        self.inner.cache.lock().await.keys()
    }

    /// Cache lookup, then join or start the single in-flight load for `key`
    async fn load_shared<F, Fut>(&self, key: String, fetch: F) -> LoaderResult<CachedValue>
    where
        F: FnOnce(Arc<LoaderInner>) -> Fut,
        Fut: Future<Output = LoaderResult<CachedValue>> + Send + 'static,
    {
        let inner = &self.inner;
        inner.stats.record_request();

        if let Some(value) = inner.cache.lock().await.get(&key) {
            inner.stats.record_hit();
            debug!(key = %key, "Cache hit");
            return Ok(value);
        }

        let pending = {
            let mut in_flight = inner.in_flight.lock().await;

            if let Some(pending) = in_flight.get(&key) {
                debug!(key = %key, "Joining in-flight request");
                pending.clone()
            } else {
                // A load may have finished between the first lookup and here
                let cached = inner.cache.lock().await.get(&key);
                if let Some(value) = cached {
                    inner.stats.record_hit();
                    return Ok(value);
                }

                debug!(key = %key, "Cache miss, starting fetch");
                let pending = spawn_load(Arc::clone(inner), key.clone(), fetch(Arc::clone(inner)));
                in_flight.insert(key, pending.clone());
                pending
            }
        };

        pending.await
    }
}

/// Run `work` on its own task; cache the result and leave the in-flight map
/// when done, whether or not anyone is still waiting.
fn spawn_load<Fut>(inner: Arc<LoaderInner>, key: String, work: Fut) -> SharedLoad
where
    Fut: Future<Output = LoaderResult<CachedValue>> + Send + 'static,
{
    let handle = tokio::spawn(async move {
        let result = work.await;
        match &result {
            Ok(value) => inner.cache.lock().await.insert(key.clone(), value.clone()),
            Err(e) => {
                inner.stats.record_error();
                warn!(key = %key, error = %e, "Load failed");
            }
        }
        inner.in_flight.lock().await.remove(&key);
        result
    });

    async move {
        handle
            .await
            .unwrap_or_else(|e| Err(LoaderError::Internal(format!("load task failed: {}", e))))
    }
    .boxed()
    .shared()
}

async fn fetch_index(inner: Arc<LoaderInner>) -> LoaderResult<CachedValue> {
    let url = inner.index_url();

    let index = fetch::fetch_with_retry(&inner.client, &url, &inner.settings, |value| {
        TimelineIndex::check_structure(&value)?;
        serde_json::from_value::<TimelineIndex>(value).map_err(|e| LoaderError::Parse {
            url: url.clone(),
            message: e.to_string(),
        })
    })
    .await?;

    info!(years = index.years.len(), "Loaded timeline index");
    Ok(CachedValue::Index(Arc::new(index)))
}

async fn fetch_project(inner: Arc<LoaderInner>, year: i32, slug: String) -> LoaderResult<CachedValue> {
    let url = inner.project_url(year, &slug);

    let mut descriptor = fetch::fetch_with_retry(&inner.client, &url, &inner.settings, |value| {
        ProjectDescriptor::check_required(&value)?;
        let mut descriptor =
            serde_json::from_value::<ProjectDescriptor>(value).map_err(|e| LoaderError::Parse {
                url: url.clone(),
                message: e.to_string(),
            })?;
        descriptor.validate_for(year, &slug)?;
        Ok(descriptor)
    })
    .await?;

    if descriptor.needs_image_detection() {
        let detected = images::auto_detect_images(&inner.client, &inner.settings, year, &slug).await;
        descriptor.apply_images(detected);
    }

    info!(year, slug = %slug, "Loaded project");
    Ok(CachedValue::Project(Arc::new(descriptor)))
}
