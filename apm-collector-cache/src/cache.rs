use apm_collector_types::{IdKey, SurrogateId};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::{
    num::NonZeroUsize,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, MutexGuard,
    },
};

pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    capacity: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl CacheOptions {
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Maximum number of mappings kept. At least 1.
    pub fn set_capacity(&mut self, capacity: usize) -> &mut Self {
        self.capacity = capacity.max(1);
        self
    }
}

#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheMetrics {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// 0.0 to 1.0
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total == 0.0 {
            0.0
        } else {
            hits / total
        }
    }
}

/// A bounded map of identifier mappings, evicting the least recently used.
///
/// Only resolved ids are cached; a miss is never remembered.
pub struct IdCache {
    entries: Mutex<LruCache<IdKey, SurrogateId>>,
    metrics: CacheMetrics,
}

impl std::fmt::Debug for IdCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdCache")
            .field("len", &self.len())
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl IdCache {
    pub fn new(options: &CacheOptions) -> Self {
        let capacity = NonZeroUsize::new(options.capacity()).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            metrics: CacheMetrics::default(),
        }
    }

    pub fn get(&self, key: &IdKey) -> Option<SurrogateId> {
        let id = self.lock().get(key).copied();
        match id {
            Some(_) => self.metrics.hits.fetch_add(1, Ordering::Relaxed),
            None => self.metrics.misses.fetch_add(1, Ordering::Relaxed),
        };
        id
    }

    pub fn put(&self, key: IdKey, id: SurrogateId) {
        self.lock().put(key, id);
    }

    pub fn invalidate(&self, key: &IdKey) {
        self.lock().pop(key);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<IdKey, SurrogateId>> {
        // entries stay consistent even if a holder panicked
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
