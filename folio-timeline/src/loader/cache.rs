//! In-memory TTL cache
//!
//! Entries expire lazily: an expired entry is removed by the read that
//! finds it, never by a background sweep.

use regex::Regex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Cached value plus its insertion time
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: Instant,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            timestamp: Instant::now(),
        }
    }

    /// Entry age has reached the expiry window
    pub fn is_expired(&self, expiry: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.timestamp) >= expiry
    }
}

/// Key → entry map with a fixed expiry window
#[derive(Debug)]
pub struct TtlCache<T> {
    entries: HashMap<String, CacheEntry<T>>,
    expiry: Duration,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(expiry: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            expiry,
        }
    }

    /// Fresh value for `key`, evicting it if it has expired
    pub fn get(&mut self, key: &str) -> Option<T> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&mut self, key: &str, now: Instant) -> Option<T> {
        let expired = self.entries.get(key)?.is_expired(self.expiry, now);
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|entry| entry.data.clone())
    }

    pub fn insert(&mut self, key: impl Into<String>, data: T) {
        self.entries.insert(key.into(), CacheEntry::new(data));
    }

    /// Drop every entry
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    /// Drop entries whose key matches `pattern`; returns how many went
    pub fn clear_matching(&mut self, pattern: &Regex) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !pattern.is_match(key));
        before - self.entries.len()
    }

    /// Entry count, including expired entries not yet read
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }
}
