//! Loader counters and health reporting
//!
//! Counters live for the lifetime of the loader; nothing is persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Process-wide counters mutated by every cache/fetch operation
#[derive(Debug, Default)]
pub struct LoaderStats {
    requests: AtomicU64,
    cache_hits: AtomicU64,
    errors: AtomicU64,
    last_health_check: Mutex<Option<DateTime<Utc>>>,
}

impl LoaderStats {
    /// One cached-resource lookup (hit or miss)
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_health_check(&self, at: DateTime<Utc>) {
        if let Ok(mut last) = self.last_health_check.lock() {
            *last = Some(at);
        }
    }

    /// Counter snapshot combined with cache/in-flight sizes
    pub fn snapshot(&self, cache_size: usize, active_requests: usize) -> CacheStats {
        let requests = self.requests.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let last_health_check = self.last_health_check.lock().ok().and_then(|last| *last);

        CacheStats {
            requests,
            cache_hits,
            errors: self.errors.load(Ordering::Relaxed),
            last_health_check,
            cache_size,
            hit_rate: hit_rate(cache_hits, requests),
            active_requests,
        }
    }
}

/// Hit percentage, 0 when nothing has been requested
pub fn hit_rate(cache_hits: u64, requests: u64) -> f64 {
    if requests == 0 {
        0.0
    } else {
        cache_hits as f64 / requests as f64 * 100.0
    }
}

/// Read-only view returned by `TimelineLoader::get_cache_stats`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub requests: u64,
    pub cache_hits: u64,
    pub errors: u64,
    pub last_health_check: Option<DateTime<Utc>>,
    pub cache_size: usize,
    /// Percentage in 0.0..=100.0
    pub hit_rate: f64,
    pub active_requests: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Outcome of a HEAD request against the timeline index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}
