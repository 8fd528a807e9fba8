//! In-memory resource cache using moka.
//!
//! Wraps `moka::future::Cache` for an async-safe, lock-free cache with
//! automatic size-based LRU eviction: entries are weighed by payload size,
//! reads don't block writers, and eviction needs no explicit locking.

use std::time::Duration;

use moka::future::Cache as MokaCache;

use super::{BoxFuture, CacheError, CachedResource, ResourceCache};

/// In-memory resource cache with byte-weighted LRU eviction.
pub struct MemoryResourceCache {
    cache: MokaCache<String, CachedResource>,
}

impl MemoryResourceCache {
    /// Create a cache bounded to `max_size_bytes` of payload data.
    pub fn new(max_size_bytes: u64) -> Self {
        Self::build(max_size_bytes, None)
    }

    /// Create a cache that additionally drops entries after `ttl`.
    pub fn with_ttl(max_size_bytes: u64, ttl: Duration) -> Self {
        Self::build(max_size_bytes, Some(ttl))
    }

    fn build(max_size_bytes: u64, ttl: Option<Duration>) -> Self {
        let mut builder = MokaCache::builder()
            // Weight each entry by its payload size; moka weights are u32.
            .weigher(|_key: &String, entry: &CachedResource| -> u32 {
                entry.size_bytes().min(u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes);

        if let Some(ttl) = ttl {
            builder = builder.time_to_live(ttl);
        }

        Self {
            cache: builder.build(),
        }
    }

    /// Current number of entries.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Current weighted size in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.cache.weighted_size()
    }

    /// Run pending maintenance tasks (eviction bookkeeping).
    ///
    /// Moka is eventually consistent; tests call this to observe a settled
    /// entry count.
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }
}

impl ResourceCache for MemoryResourceCache {
    fn get(&self, url: &str) -> BoxFuture<'_, Result<Option<CachedResource>, CacheError>> {
        let key = url.to_string();
        Box::pin(async move { Ok(self.cache.get(&key).await) })
    }

    fn put(&self, url: &str, entry: CachedResource) -> BoxFuture<'_, Result<(), CacheError>> {
        let key = url.to_string();
        Box::pin(async move {
            self.cache.insert(key, entry).await;
            Ok(())
        })
    }

    fn remove(&self, url: &str) -> BoxFuture<'_, Result<bool, CacheError>> {
        let key = url.to_string();
        Box::pin(async move {
            let existed = self.cache.contains_key(&key);
            self.cache.remove(&key).await;
            Ok(existed)
        })
    }
}
