//! Resource cache abstraction.
//!
//! The [`ResourceCache`] trait is the minimal key-value interface a
//! [`CachedResourceProvider`](crate::provider::CachedResourceProvider)
//! consults before touching the network. Keys are the resource URLs
//! (human-readable in logs, consistent across backends); values carry the
//! payload together with its cache-validation metadata.
//!
//! The trait uses `Pin<Box<dyn Future>>` returns so implementations can be
//! shared as `Arc<dyn ResourceCache>` trait objects.

mod memory;

pub use memory::MemoryResourceCache;

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use thiserror::Error;

use crate::resource::Freshness;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors that can occur during cache operations.
///
/// Cache failures are absorbed by callers (a failing lookup degrades to a
/// miss); they exist so disk-backed implementations can report I/O problems
/// for logging.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error during cache operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific error.
    #[error("cache backend error: {0}")]
    Backend(String),
}

/// A cached payload together with its validators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResource {
    /// The payload bytes.
    pub data: Bytes,
    /// Validators recorded when the payload was stored.
    pub freshness: Freshness,
}

impl CachedResource {
    /// Create an entry.
    pub fn new(data: Bytes, freshness: Freshness) -> Self {
        Self { data, freshness }
    }

    /// Size of the payload in bytes.
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// Key-value store for fetched resources.
///
/// All implementations must be `Send + Sync` for use across async tasks.
pub trait ResourceCache: Send + Sync {
    /// Retrieve the entry stored under `url`, if any.
    fn get(&self, url: &str) -> BoxFuture<'_, Result<Option<CachedResource>, CacheError>>;

    /// Store an entry under `url`, replacing any previous one.
    fn put(&self, url: &str, entry: CachedResource) -> BoxFuture<'_, Result<(), CacheError>>;

    /// Remove the entry stored under `url`.
    ///
    /// Returns `true` if an entry existed.
    fn remove(&self, url: &str) -> BoxFuture<'_, Result<bool, CacheError>>;
}
