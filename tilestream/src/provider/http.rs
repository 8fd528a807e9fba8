//! HTTP client abstraction for testability.
//!
//! The [`HttpClient`] trait decouples network transport from fetch policy so
//! providers can be exercised against mock clients in tests. The real
//! implementation is [`ReqwestClient`].

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use reqwest::header;

use super::types::ResourceError;
use crate::cache::BoxFuture;

/// A raw HTTP response, reduced to what fetch policy needs.
///
/// Transport success and protocol status are separate concerns: the client
/// returns `Ok` for any response it received, whatever the status code, and
/// `Err` only when no response was obtained at all.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body (empty for 304).
    pub body: Bytes,
    /// `ETag` header, if present.
    pub etag: Option<String>,
    /// Expiry derived from `Cache-Control`/`Expires` headers, if present.
    pub expires: Option<DateTime<Utc>>,
}

impl HttpResponse {
    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns true for 304 Not Modified.
    pub fn is_not_modified(&self) -> bool {
        self.status == 304
    }
}

/// Trait for HTTP transport operations.
pub trait HttpClient: Send + Sync + 'static {
    /// Performs an HTTP GET request.
    ///
    /// When `prior_etag` is given the request is conditional
    /// (`If-None-Match`), allowing the origin to answer 304.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError` only for transport failures; error statuses
    /// are returned as a normal [`HttpResponse`].
    fn get(
        &self,
        url: &str,
        prior_etag: Option<&str>,
    ) -> BoxFuture<'static, Result<HttpResponse, ResourceError>>;
}

/// Real HTTP client implementation using reqwest.
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with default configuration.
    pub fn new() -> Result<Self, ResourceError> {
        Self::with_timeout(30)
    }

    /// Creates a new ReqwestClient with custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, ResourceError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ResourceError::Other(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(
        &self,
        url: &str,
        prior_etag: Option<&str>,
    ) -> BoxFuture<'static, Result<HttpResponse, ResourceError>> {
        let client = self.client.clone();
        let url = url.to_string();
        let prior_etag = prior_etag.map(str::to_string);

        Box::pin(async move {
            let mut request = client.get(&url);
            if let Some(etag) = prior_etag {
                request = request.header(header::IF_NONE_MATCH, etag);
            }

            let response = request.send().await.map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    ResourceError::Connection(e.to_string())
                } else {
                    ResourceError::Other(e.to_string())
                }
            })?;

            let status = response.status().as_u16();
            let etag = header_str(&response, header::ETAG);
            let expires = expires_from_headers(
                header_str(&response, header::CACHE_CONTROL).as_deref(),
                header_str(&response, header::EXPIRES).as_deref(),
                Utc::now(),
            );

            let body = response
                .bytes()
                .await
                .map_err(|e| ResourceError::Connection(format!("failed to read body: {}", e)))?;

            Ok(HttpResponse {
                status,
                body,
                etag,
                expires,
            })
        })
    }
}

fn header_str(response: &reqwest::Response, name: header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

/// Derive an expiry timestamp from cache headers.
///
/// `Cache-Control: max-age` wins over `Expires`; `no-cache`/`no-store` make
/// the response immediately stale.
fn expires_from_headers(
    cache_control: Option<&str>,
    expires: Option<&str>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if let Some(cc) = cache_control {
        let cc = cc.to_ascii_lowercase();
        if cc.contains("no-cache") || cc.contains("no-store") {
            return Some(now);
        }
        if let Some(max_age) = cc
            .split(',')
            .map(str::trim)
            .find_map(|d| d.strip_prefix("max-age="))
            .and_then(|v| v.parse::<i64>().ok())
        {
            return Some(now + Duration::seconds(max_age));
        }
    }

    expires
        .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
