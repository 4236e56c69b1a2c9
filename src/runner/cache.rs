//! # Per-unit TTL report cache.
//!
//! Written on every genuine successful execution, read-checked before any
//! new physical computation, lazily evicted on read once
//! `now - written_at > ttl`. Keys come from the engine's `cache_key()`
//! (the unit id unless overridden).
//!
//! Uses `tokio::time::Instant` so tests under a paused clock can advance
//! time deterministically.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::report::Report;

/// One cached report with its write time and time-to-live.
#[derive(Clone, Debug)]
struct CacheEntry {
    report: Report,
    written_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.written_at) <= self.ttl
    }
}

/// TTL store of the last good report per cache key.
#[derive(Default, Debug)]
pub(crate) struct ReportCache {
    entries: HashMap<String, CacheEntry>,
}

impl ReportCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the cached report when present and within TTL.
    ///
    /// Expired entries are evicted here (lazy eviction).
    pub(crate) fn get(&mut self, key: &str) -> Option<Report> {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if entry.is_fresh(now) => Some(entry.report.clone()),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores a report under the key with the given TTL.
    pub(crate) fn put(&mut self, key: &str, report: Report, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                report,
                written_at: Instant::now(),
                ttl,
            },
        );
    }
}
