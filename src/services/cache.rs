// src/services/cache.rs
// DOCUMENTATION: In-memory TTL cache for Places API responses
// PURPOSE: Avoid repeat lookups for the same query inside the freshness window

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Cache entry stamped with its fetch time
#[derive(Clone, Debug)]
struct CacheEntry<T> {
    data: T,
    stored_at: Instant,
}

impl<T> CacheEntry<T> {
    fn new(data: T) -> Self {
        Self {
            data,
            stored_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() >= ttl
    }
}

/// Thread-safe cache with a single TTL
/// DOCUMENTATION: Entries older than the TTL read as absent and get replaced on the
/// next fetch. Values are written if-absent in practice, so concurrent writers for
/// one key are interchangeable.
pub struct TtlCache<T> {
    name: &'static str,
    store: Arc<RwLock<HashMap<String, CacheEntry<T>>>>,
    ttl: Duration,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            store: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Key for lookups that are parameterized by a point (nearby searches)
    pub fn point_key(kind: &str, lat: f64, lng: f64, radius: u32) -> String {
        format!(
            "{}:{}:{}:{}",
            kind,
            (lat * 10000.0).round() as i64, // ~10m precision
            (lng * 10000.0).round() as i64,
            radius
        )
    }

    /// Get a fresh value
    pub async fn get(&self, key: &str) -> Option<T> {
        let store = self.store.read().await;

        match store.get(key) {
            Some(entry) if !entry.is_expired(self.ttl) => {
                log::debug!("{} cache HIT for key: {}", self.name, key);
                Some(entry.data.clone())
            }
            Some(_) => {
                log::debug!("{} cache EXPIRED for key: {}", self.name, key);
                None
            }
            None => {
                log::debug!("{} cache MISS for key: {}", self.name, key);
                None
            }
        }
    }

    pub async fn set(&self, key: String, value: T) {
        let mut store = self.store.write().await;
        log::debug!("{} cache SET for key: {} (TTL: {}s)", self.name, key, self.ttl.as_secs());
        store.insert(key, CacheEntry::new(value));
    }

    /// Clear expired entries
    pub async fn cleanup(&self) {
        let mut store = self.store.write().await;
        let before_count = store.len();
        let ttl = self.ttl;
        store.retain(|_, entry| !entry.is_expired(ttl));
        let after_count = store.len();

        if before_count > after_count {
            log::info!(
                "{} cache cleanup: removed {} expired entries ({} remaining)",
                self.name,
                before_count - after_count,
                after_count
            );
        }
    }

    pub async fn stats(&self) -> CacheStats {
        let store = self.store.read().await;
        let total = store.len();
        let expired = store.values().filter(|e| e.is_expired(self.ttl)).count();

        CacheStats {
            name: self.name.to_string(),
            total_entries: total,
            expired_entries: expired,
            active_entries: total - expired,
        }
    }

    pub async fn clear(&self) {
        let mut store = self.store.write().await;
        let count = store.len();
        store.clear();
        log::info!("{} cache cleared: {} entries removed", self.name, count);
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub name: String,
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
}

/// Anything with expired entries to sweep
#[async_trait::async_trait]
pub trait Sweepable: Send + Sync {
    async fn sweep(&self);
}

#[async_trait::async_trait]
impl<T: Clone + Send + Sync> Sweepable for TtlCache<T> {
    async fn sweep(&self) {
        self.cleanup().await;
    }
}

/// Start background cleanup task
/// DOCUMENTATION: Periodically removes expired entries
pub fn start_cleanup_task(target: Arc<dyn Sweepable>, interval_seconds: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds.max(1)));

        loop {
            interval.tick().await;
            target.sweep().await;
        }
    });
}
