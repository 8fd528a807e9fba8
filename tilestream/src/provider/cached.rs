//! Cache-and-network resource provider.
//!
//! [`CachedResourceProvider`] is the concrete [`ResourceProvider`]: it
//! consults a [`ResourceCache`] and an [`HttpClient`] according to each
//! descriptor's [`LoadStrategy`], running every request as its own tokio
//! task. Cancellation is cooperative: each task selects on the request's
//! token and re-checks it before the completion callback fires, so a
//! cancelled request never reports back even when the fetch itself already
//! finished.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::http::HttpClient;
use super::types::{
    CompletionCallback, RequestHandle, ResourceError, ResourceProvider, ResourceResponse,
};
use crate::cache::{CachedResource, ResourceCache};
use crate::loader::{CacheDisposition, RevalidationPolicy, UpdateParameters};
use crate::resource::{Freshness, LoadStrategy, Resource};

/// Resource provider backed by a cache and an HTTP client.
///
/// One instance is shared across all loaders of a tile source. Requests are
/// spawned onto the tokio runtime the provider was created in.
pub struct CachedResourceProvider<H: HttpClient> {
    cache: Arc<dyn ResourceCache>,
    http: Arc<H>,
    policy: RevalidationPolicy,
    runtime: tokio::runtime::Handle,
}

impl<H: HttpClient> CachedResourceProvider<H> {
    /// Create a provider on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime; use
    /// [`with_runtime`](Self::with_runtime) from synchronous contexts.
    pub fn new(cache: Arc<dyn ResourceCache>, http: Arc<H>) -> Self {
        Self::with_runtime(cache, http, tokio::runtime::Handle::current())
    }

    /// Create a provider spawning its requests onto `runtime`.
    pub fn with_runtime(
        cache: Arc<dyn ResourceCache>,
        http: Arc<H>,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        Self {
            cache,
            http,
            policy: RevalidationPolicy::default(),
            runtime,
        }
    }

    /// Override the policy deciding when a cached entry short-circuits a
    /// cache-and-network request.
    pub fn with_policy(mut self, policy: RevalidationPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl<H: HttpClient> ResourceProvider for CachedResourceProvider<H> {
    fn request(&self, resource: &Resource, on_complete: CompletionCallback) -> RequestHandle {
        let token = CancellationToken::new();
        let worker_token = token.child_token();
        let worker = Worker {
            cache: Arc::clone(&self.cache),
            http: Arc::clone(&self.http),
            policy: self.policy,
            resource: resource.clone(),
        };

        self.runtime.spawn(async move {
            let response = tokio::select! {
                _ = worker_token.cancelled() => return,
                response = worker.fulfill() => response,
            };
            // The fetch may have finished in the same instant the caller
            // cancelled; the caller's view wins.
            if worker_token.is_cancelled() {
                debug!(url = %worker.resource.url, "request cancelled after fetch completed");
                return;
            }
            on_complete(response);
        });

        RequestHandle::new(token)
    }
}

/// The per-request fetch state moved into the spawned task.
struct Worker<H> {
    cache: Arc<dyn ResourceCache>,
    http: Arc<H>,
    policy: RevalidationPolicy,
    resource: Resource,
}

impl<H: HttpClient> Worker<H> {
    async fn fulfill(&self) -> ResourceResponse {
        match self.resource.strategy {
            LoadStrategy::CacheOnly => match self.lookup_cache().await {
                Some(entry) => found(entry),
                None => ResourceResponse::NotFound,
            },
            LoadStrategy::NetworkOnly => self.fetch_network(None).await,
            LoadStrategy::CacheAndNetwork => {
                let cached = self.lookup_cache().await;
                if let Some(entry) = &cached {
                    let fresh = self.policy.classify(
                        &entry.freshness,
                        &UpdateParameters::default(),
                        chrono::Utc::now(),
                    ) == CacheDisposition::Fresh;
                    if fresh {
                        return found(entry.clone());
                    }
                }
                self.fetch_network(cached).await
            }
        }
    }

    async fn lookup_cache(&self) -> Option<CachedResource> {
        match self.cache.get(&self.resource.url).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(url = %self.resource.url, error = %e, "cache lookup failed");
                None
            }
        }
    }

    /// Fetch from the network, revalidating against `cached` (or, absent a
    /// cached entry, the descriptor's prior validators).
    async fn fetch_network(&self, cached: Option<CachedResource>) -> ResourceResponse {
        let prior_etag = cached
            .as_ref()
            .and_then(|entry| entry.freshness.etag.clone())
            .or_else(|| self.resource.prior_etag.clone());

        let response = match self.http.get(&self.resource.url, prior_etag.as_deref()).await {
            Ok(response) => response,
            Err(e) => return ResourceResponse::Error(e),
        };

        if response.is_not_modified() {
            // The origin confirmed our copy; refresh its validators. The
            // cached entry may have been evicted since the lookup, in which
            // case there is nothing to deliver.
            let Some(entry) = self.reload_cached(cached).await else {
                return ResourceResponse::Error(ResourceError::Other(
                    "not-modified response without a cached payload".to_string(),
                ));
            };
            let freshness = Freshness {
                etag: prior_etag,
                expires: response.expires.or(self.resource.prior_expires),
                received_at: chrono::Utc::now(),
            };
            let refreshed = CachedResource::new(entry.data.clone(), freshness);
            self.store(&refreshed).await;
            return found(refreshed);
        }

        if !response.is_success() {
            return ResourceResponse::Error(match response.status {
                429 => ResourceError::RateLimited,
                code => ResourceError::Status { code },
            });
        }

        let entry = CachedResource::new(
            response.body,
            Freshness::new(response.etag, response.expires),
        );
        self.store(&entry).await;
        found(entry)
    }

    async fn reload_cached(&self, cached: Option<CachedResource>) -> Option<CachedResource> {
        match cached {
            Some(entry) => Some(entry),
            None => self.lookup_cache().await,
        }
    }

    async fn store(&self, entry: &CachedResource) {
        if let Err(e) = self.cache.put(&self.resource.url, entry.clone()).await {
            warn!(url = %self.resource.url, error = %e, "cache store failed");
        }
    }
}

fn found(entry: CachedResource) -> ResourceResponse {
    ResourceResponse::Found {
        data: entry.data,
        freshness: entry.freshness,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryResourceCache;
    use crate::provider::http::tests::MockHttpClient;
    use bytes::Bytes;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn provider(
        cache: Arc<MemoryResourceCache>,
        http: Arc<MockHttpClient>,
    ) -> CachedResourceProvider<MockHttpClient> {
        CachedResourceProvider::new(cache, http)
    }

    async fn complete(
        provider: &CachedResourceProvider<MockHttpClient>,
        resource: &Resource,
    ) -> ResourceResponse {
        let (tx, rx) = oneshot::channel();
        let _handle = provider.request(
            resource,
            Box::new(move |response| {
                let _ = tx.send(response);
            }),
        );
        rx.await.expect("completion callback dropped")
    }

    fn cached_entry(data: &'static [u8], expires_in_secs: i64) -> CachedResource {
        CachedResource::new(
            Bytes::from_static(data),
            Freshness::new(
                Some("\"v1\"".to_string()),
                Some(Utc::now() + ChronoDuration::seconds(expires_in_secs)),
            ),
        )
    }

    #[tokio::test]
    async fn test_cache_only_hit() {
        let cache = Arc::new(MemoryResourceCache::new(1_000_000));
        let http = Arc::new(MockHttpClient::new());
        cache
            .put("https://a/t", cached_entry(b"tile", 600))
            .await
            .unwrap();
        let provider = provider(cache, http.clone());

        let response = complete(&provider, &Resource::cache_only("https://a/t")).await;

        match response {
            ResourceResponse::Found { data, .. } => assert_eq!(data, Bytes::from_static(b"tile")),
            other => panic!("expected Found, got {:?}", other),
        }
        assert!(http.requests().is_empty(), "cache-only must not touch HTTP");
    }

    #[tokio::test]
    async fn test_cache_only_miss() {
        let cache = Arc::new(MemoryResourceCache::new(1_000_000));
        let http = Arc::new(MockHttpClient::new());
        let provider = provider(cache, http.clone());

        let response = complete(&provider, &Resource::cache_only("https://a/t")).await;

        assert!(matches!(response, ResourceResponse::NotFound));
        assert!(http.requests().is_empty());
    }

    #[tokio::test]
    async fn test_network_only_stores_to_cache() {
        let cache = Arc::new(MemoryResourceCache::new(1_000_000));
        let http = Arc::new(MockHttpClient::new());
        http.push(Ok(MockHttpClient::ok(b"fresh", Some("\"v2\""), 300)));
        let provider = provider(cache.clone(), http.clone());

        let response = complete(&provider, &Resource::network_only("https://a/t")).await;

        match response {
            ResourceResponse::Found { data, freshness } => {
                assert_eq!(data, Bytes::from_static(b"fresh"));
                assert_eq!(freshness.etag.as_deref(), Some("\"v2\""));
            }
            other => panic!("expected Found, got {:?}", other),
        }
        let stored = cache.get("https://a/t").await.unwrap().unwrap();
        assert_eq!(stored.data, Bytes::from_static(b"fresh"));
    }

    #[tokio::test]
    async fn test_network_error_statuses() {
        let cache = Arc::new(MemoryResourceCache::new(1_000_000));
        let http = Arc::new(MockHttpClient::new());
        http.push(Ok(crate::provider::HttpResponse {
            status: 503,
            body: Bytes::new(),
            etag: None,
            expires: None,
        }));
        http.push(Ok(crate::provider::HttpResponse {
            status: 429,
            body: Bytes::new(),
            etag: None,
            expires: None,
        }));
        let provider = provider(cache, http);

        let resource = Resource::network_only("https://a/t");
        let first = complete(&provider, &resource).await;
        assert!(matches!(
            first,
            ResourceResponse::Error(ResourceError::Status { code: 503 })
        ));

        let second = complete(&provider, &resource).await;
        assert!(matches!(
            second,
            ResourceResponse::Error(ResourceError::RateLimited)
        ));
    }

    #[tokio::test]
    async fn test_cache_and_network_short_circuits_on_fresh_entry() {
        let cache = Arc::new(MemoryResourceCache::new(1_000_000));
        let http = Arc::new(MockHttpClient::new());
        cache
            .put("https://a/t", cached_entry(b"tile", 600))
            .await
            .unwrap();
        let provider = provider(cache, http.clone());

        let response = complete(&provider, &Resource::cache_and_network("https://a/t")).await;

        assert!(matches!(response, ResourceResponse::Found { .. }));
        assert!(http.requests().is_empty(), "fresh hit must not revalidate");
    }

    #[tokio::test]
    async fn test_cache_and_network_revalidates_stale_entry() {
        let cache = Arc::new(MemoryResourceCache::new(1_000_000));
        let http = Arc::new(MockHttpClient::new());
        cache
            .put("https://a/t", cached_entry(b"stale", -10))
            .await
            .unwrap();
        http.push(Ok(MockHttpClient::ok(b"newer", Some("\"v2\""), 300)));
        let provider = provider(cache.clone(), http.clone());

        let response = complete(&provider, &Resource::cache_and_network("https://a/t")).await;

        match response {
            ResourceResponse::Found { data, .. } => {
                assert_eq!(data, Bytes::from_static(b"newer"))
            }
            other => panic!("expected Found, got {:?}", other),
        }
        let requests = http.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prior_etag.as_deref(), Some("\"v1\""));
    }

    #[tokio::test]
    async fn test_not_modified_merges_cached_payload() {
        let cache = Arc::new(MemoryResourceCache::new(1_000_000));
        let http = Arc::new(MockHttpClient::new());
        cache
            .put("https://a/t", cached_entry(b"tile", -10))
            .await
            .unwrap();
        http.push(Ok(MockHttpClient::not_modified(300)));
        let provider = provider(cache.clone(), http);

        let response = complete(&provider, &Resource::cache_and_network("https://a/t")).await;

        match response {
            ResourceResponse::Found { data, freshness } => {
                assert_eq!(data, Bytes::from_static(b"tile"));
                assert_eq!(freshness.etag.as_deref(), Some("\"v1\""));
                assert!(!freshness.is_expired(Utc::now()));
            }
            other => panic!("expected Found, got {:?}", other),
        }
        // The stored entry's validators were refreshed too.
        let stored = cache.get("https://a/t").await.unwrap().unwrap();
        assert!(!stored.freshness.is_expired(Utc::now()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancellation_suppresses_completion() {
        let cache = Arc::new(MemoryResourceCache::new(1_000_000));
        // Empty queue: the mock's GET future never resolves.
        let http = Arc::new(MockHttpClient::new());
        let provider = provider(cache, http);

        let (tx, mut rx) = oneshot::channel::<ResourceResponse>();
        let handle = provider.request(
            &Resource::network_only("https://a/t"),
            Box::new(move |response| {
                let _ = tx.send(response);
            }),
        );
        handle.cancel();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(
            rx.try_recv().is_err(),
            "cancelled request must not complete"
        );
    }
}
