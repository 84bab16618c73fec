//! Compiled-statement cache.
//!
//! Queries that differ only in their bound values translate to the same
//! text. The cache keeps one [`StatementTemplate`] per structural key so
//! repeated shapes skip translation entirely.
//!
//! # Design
//!
//! - Lock-free reads and inserts on a `DashMap`
//! - Concurrent misses on one key may both compile; the last insert wins
//! - Bounded: once `max_entries` is reached new templates are not retained

mod hash;
pub use hash::{compute_hash, statement_key};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use log::{debug, trace};

use crate::compile::StatementTemplate;

/// Default bound on retained templates.
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

/// Thread-safe template cache with hit/miss counters.
#[derive(Debug)]
pub struct StatementCache {
    entries: DashMap<String, Arc<StatementTemplate>>,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for StatementCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl StatementCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<StatementTemplate>> {
        match self.entries.get(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!("statement cache hit {}", &key[..key.len().min(12)]);
                Some(Arc::clone(entry.value()))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("statement cache miss {}", &key[..key.len().min(12)]);
                None
            }
        }
    }

    /// Store a template. Replaces an existing entry for the same key; drops
    /// the template when the cache is full.
    pub fn insert(&self, key: String, template: Arc<StatementTemplate>) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            debug!(
                "statement cache full ({} entries), not retaining template",
                self.max_entries
            );
            return;
        }
        self.entries.insert(key, template);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Drop every template. Counters are kept.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Hits over lookups, 0.0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
