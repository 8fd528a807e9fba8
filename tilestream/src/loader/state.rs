//! Loader state types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How aggressively a tile's data should be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Necessity {
    /// The tile is part of the currently desired view; fetch aggressively.
    Required,
    /// The tile is retained (backfill); no new network work.
    Optional,
}

/// Where a loader is in its fetch sequence.
///
/// Observable through [`TileLoader::phase`](super::TileLoader::phase) so
/// embedders and tests can assert on progress without hooking the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// Nothing outstanding and nothing current to show for the last attempt.
    Idle,
    /// A cache-only lookup is in flight.
    CacheLookupPending,
    /// A network attempt is in flight.
    NetworkPending,
    /// A payload was delivered and nothing is outstanding.
    Delivered,
    /// The loader was destroyed; terminal.
    Aborted,
}

/// Externally supplied fetch-environment parameters.
///
/// Typically updated on connectivity changes. A change can retroactively
/// invalidate a loader's assumption that delivered data is still fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateParameters {
    /// Overrides how long delivered data may be reused before it must be
    /// revalidated. `None` defers entirely to origin expiry headers.
    pub revalidation_interval: Option<Duration>,
    /// Whether network fetches are currently worth attempting.
    pub network_available: bool,
}

impl Default for UpdateParameters {
    fn default() -> Self {
        Self {
            revalidation_interval: None,
            network_available: true,
        }
    }
}
