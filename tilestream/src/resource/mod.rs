//! Resource descriptors for tile fetch attempts.
//!
//! A [`Resource`] is an immutable description of one fetch attempt: the
//! address, the [`LoadStrategy`] that sequences cache and network access,
//! a scheduling [`Priority`], and the validators carried over from a prior
//! delivery. Loaders rebuild the descriptor whenever their intent changes;
//! a descriptor is never mutated in place, so a completion can always be
//! checked against the intent it was issued for.

use chrono::{DateTime, Duration, Utc};

/// How a resource request sequences cache and network access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadStrategy {
    /// Answer from the local cache only; a miss is not an error.
    CacheOnly,
    /// Go straight to the network, bypassing the cache lookup.
    NetworkOnly,
    /// Consult the cache first and fall through to the network when the
    /// cached entry is missing or needs revalidation.
    CacheAndNetwork,
}

/// Scheduling priority for a resource request.
///
/// Providers may use this to order queued work; it carries no semantics
/// inside the loader beyond reflecting the tile's current necessity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    /// The tile is required for display.
    Regular,
    /// The tile is merely retained (backfill); fetch conservatively.
    Low,
}

/// Cache-validation metadata attached to a delivered payload.
///
/// Recorded on every delivery and replayed as prior validators on
/// revalidation requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Freshness {
    /// Entity tag reported by the origin, if any.
    pub etag: Option<String>,
    /// Expiry timestamp derived from cache headers, if any.
    pub expires: Option<DateTime<Utc>>,
    /// When the payload was received.
    pub received_at: DateTime<Utc>,
}

impl Freshness {
    /// Freshness for a payload received now with the given validators.
    pub fn new(etag: Option<String>, expires: Option<DateTime<Utc>>) -> Self {
        Self {
            etag,
            expires,
            received_at: Utc::now(),
        }
    }

    /// Age of the payload at `now`.
    ///
    /// Clock skew can make `received_at` lie in the future; the age is
    /// clamped to zero in that case.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.received_at).max(Duration::zero())
    }

    /// Returns true if the payload's expiry has passed at `now`.
    ///
    /// A payload without an expiry never reports expired here; whether it
    /// still counts as fresh is a policy decision.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires, Some(expires) if expires <= now)
    }
}

/// An immutable description of one fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// The resource address.
    pub url: String,
    /// Cache/network sequencing for this attempt.
    pub strategy: LoadStrategy,
    /// Scheduling priority hint.
    pub priority: Priority,
    /// Entity tag from a prior delivery, sent as `If-None-Match`.
    pub prior_etag: Option<String>,
    /// Expiry from a prior delivery, kept for merge on a not-modified
    /// response.
    pub prior_expires: Option<DateTime<Utc>>,
}

impl Resource {
    /// A cache-only lookup for `url`.
    pub fn cache_only(url: impl Into<String>) -> Self {
        Self::new(url, LoadStrategy::CacheOnly)
    }

    /// A network-only fetch for `url`.
    pub fn network_only(url: impl Into<String>) -> Self {
        Self::new(url, LoadStrategy::NetworkOnly)
    }

    /// A cache-then-network fetch for `url`.
    pub fn cache_and_network(url: impl Into<String>) -> Self {
        Self::new(url, LoadStrategy::CacheAndNetwork)
    }

    fn new(url: impl Into<String>, strategy: LoadStrategy) -> Self {
        Self {
            url: url.into(),
            strategy,
            priority: Priority::Regular,
            prior_etag: None,
            prior_expires: None,
        }
    }

    /// Sets the scheduling priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Carries the validators of a previously delivered payload, turning
    /// the attempt into a conditional request.
    pub fn with_prior_freshness(mut self, freshness: &Freshness) -> Self {
        self.prior_etag = freshness.etag.clone();
        self.prior_expires = freshness.expires;
        self
    }
}
