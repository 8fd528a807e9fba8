//! Cache revalidation policy.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::state::UpdateParameters;
use crate::resource::Freshness;

/// What a cached payload is worth without consulting the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDisposition {
    /// The payload can be used as-is; no network attempt is warranted.
    Fresh,
    /// The payload is usable for display but the origin should be asked
    /// whether a newer version exists.
    Revalidate,
}

/// Decides when cached data is fresh and when it must be revalidated.
///
/// A payload is [`Fresh`](CacheDisposition::Fresh) only if its expiry lies
/// in the future *and*, when a revalidation-interval override is active, its
/// age is within that interval. Everything else revalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevalidationPolicy {
    /// Whether payloads without an expiry are treated as needing
    /// revalidation. Origins that never send cache headers get one network
    /// round-trip per fetch cycle out of this.
    pub revalidate_unknown_expiry: bool,
}

impl Default for RevalidationPolicy {
    fn default() -> Self {
        Self {
            revalidate_unknown_expiry: true,
        }
    }
}

impl RevalidationPolicy {
    /// Classify a cached payload under the given parameters at `now`.
    pub fn classify(
        &self,
        freshness: &Freshness,
        params: &UpdateParameters,
        now: DateTime<Utc>,
    ) -> CacheDisposition {
        if let Some(interval) = params.revalidation_interval {
            let interval = Duration::from_std(interval).unwrap_or(Duration::MAX);
            if freshness.age(now) > interval {
                return CacheDisposition::Revalidate;
            }
        }

        match freshness.expires {
            Some(expires) if expires > now => CacheDisposition::Fresh,
            Some(_) => CacheDisposition::Revalidate,
            None => {
                if self.revalidate_unknown_expiry {
                    CacheDisposition::Revalidate
                } else {
                    CacheDisposition::Fresh
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    fn freshness(age_secs: i64, expires_in_secs: Option<i64>) -> Freshness {
        let now = Utc::now();
        Freshness {
            etag: None,
            expires: expires_in_secs.map(|s| now + Duration::seconds(s)),
            received_at: now - Duration::seconds(age_secs),
        }
    }

    #[test]
    fn test_unexpired_entry_is_fresh() {
        let policy = RevalidationPolicy::default();
        let disposition = policy.classify(
            &freshness(10, Some(600)),
            &UpdateParameters::default(),
            Utc::now(),
        );
        assert_eq!(disposition, CacheDisposition::Fresh);
    }

    #[test]
    fn test_expired_entry_revalidates() {
        let policy = RevalidationPolicy::default();
        let disposition = policy.classify(
            &freshness(700, Some(-100)),
            &UpdateParameters::default(),
            Utc::now(),
        );
        assert_eq!(disposition, CacheDisposition::Revalidate);
    }

    #[test]
    fn test_unknown_expiry_follows_policy() {
        let strict = RevalidationPolicy::default();
        let lax = RevalidationPolicy {
            revalidate_unknown_expiry: false,
        };
        let f = freshness(10, None);
        let params = UpdateParameters::default();

        assert_eq!(
            strict.classify(&f, &params, Utc::now()),
            CacheDisposition::Revalidate
        );
        assert_eq!(lax.classify(&f, &params, Utc::now()), CacheDisposition::Fresh);
    }

    #[test]
    fn test_interval_override_beats_expiry() {
        let policy = RevalidationPolicy::default();
        let params = UpdateParameters {
            revalidation_interval: Some(StdDuration::from_secs(60)),
            network_available: true,
        };
        // Unexpired, but older than the override interval.
        let disposition = policy.classify(&freshness(120, Some(600)), &params, Utc::now());
        assert_eq!(disposition, CacheDisposition::Revalidate);

        // Within the interval and unexpired: fresh.
        let disposition = policy.classify(&freshness(30, Some(600)), &params, Utc::now());
        assert_eq!(disposition, CacheDisposition::Fresh);
    }
}
