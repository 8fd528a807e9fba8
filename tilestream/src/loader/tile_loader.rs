//! The per-tile resource loading orchestrator.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, trace, warn};

use super::guard::AbortGuard;
use super::observer::TileObserver;
use super::policy::{CacheDisposition, RevalidationPolicy};
use super::state::{LoadPhase, Necessity, UpdateParameters};
use crate::coord::OverscaledTileCoord;
use crate::provider::{RequestHandle, ResourceError, ResourceProvider, ResourceResponse};
use crate::resource::{Freshness, Resource};
use crate::tileset::{TilesetDescriptor, TilesetError};

/// Orchestrates cache and network fetching for one tile's data.
///
/// A loader is owned outright by the tile it serves and mediates between
/// the tile's changing [`Necessity`] and a shared [`ResourceProvider`]. It
/// keeps at most one request in flight, escalates from cache lookup to
/// network fetch as needed, and guarantees that once it is dropped no
/// completion ever reaches the [`TileObserver`], even if a provider
/// completion races the drop from another thread.
///
/// All methods return immediately; fetch work happens inside the provider.
///
/// # Example
///
/// ```ignore
/// let loader = TileLoader::new(observer, coord, provider, &tileset)?;
/// loader.set_necessity(Necessity::Required);
/// // ... later, when the tile leaves the visible set:
/// loader.set_necessity(Necessity::Optional);
/// drop(loader); // cancels in-flight work, observer is never called again
/// ```
pub struct TileLoader<T: TileObserver> {
    shared: Arc<Shared<T>>,
    coord: OverscaledTileCoord,
}

/// State shared between the loader and its completion callbacks.
///
/// Callbacks capture this `Arc`, so it outlives the loader for as long as a
/// completion could still arrive; the guard's abort flag keeps those late
/// completions away from the observer.
struct Shared<T> {
    observer: T,
    provider: Arc<dyn ResourceProvider>,
    policy: RevalidationPolicy,
    url: String,
    guard: AbortGuard<Core>,
}

/// The mutable core, accessed only through the guard.
struct Core {
    /// Most recently issued intent.
    resource: Resource,
    necessity: Option<Necessity>,
    params: UpdateParameters,
    phase: LoadPhase,
    /// Handle for the single in-flight request, if any.
    request: Option<RequestHandle>,
    /// Stamp of the current request; completions carrying an older stamp
    /// were superseded and are discarded.
    generation: u64,
    /// Whether the cache was consulted during this fetch cycle.
    tried_cache: bool,
    /// Validators of the most recently delivered payload.
    delivered: Option<Freshness>,
}

impl Core {
    fn priority(&self) -> crate::resource::Priority {
        match self.necessity {
            Some(Necessity::Required) => crate::resource::Priority::Regular,
            _ => crate::resource::Priority::Low,
        }
    }

    fn wants_network(&self) -> bool {
        self.necessity == Some(Necessity::Required) && self.params.network_available
    }
}

impl<T: TileObserver> TileLoader<T> {
    /// Create a loader for `coord`, seeding its address from `tileset`.
    ///
    /// No request is issued; necessity starts undefined until the first
    /// [`set_necessity`](Self::set_necessity) call.
    ///
    /// # Errors
    ///
    /// Returns `TilesetError` if the tileset cannot produce an address for
    /// this tile.
    pub fn new(
        observer: T,
        coord: OverscaledTileCoord,
        provider: Arc<dyn ResourceProvider>,
        tileset: &TilesetDescriptor,
    ) -> Result<Self, TilesetError> {
        Self::with_policy(observer, coord, provider, tileset, RevalidationPolicy::default())
    }

    /// Create a loader with a custom revalidation policy.
    pub fn with_policy(
        observer: T,
        coord: OverscaledTileCoord,
        provider: Arc<dyn ResourceProvider>,
        tileset: &TilesetDescriptor,
        policy: RevalidationPolicy,
    ) -> Result<Self, TilesetError> {
        let url = tileset.tile_url(&coord)?;
        let core = Core {
            resource: Resource::cache_only(url.clone()),
            necessity: None,
            params: UpdateParameters::default(),
            phase: LoadPhase::Idle,
            request: None,
            generation: 0,
            tried_cache: false,
            delivered: None,
        };
        Ok(Self {
            shared: Arc::new(Shared {
                observer,
                provider,
                policy,
                url,
                guard: AbortGuard::new(core),
            }),
            coord,
        })
    }

    /// The tile this loader serves.
    pub fn coord(&self) -> OverscaledTileCoord {
        self.coord
    }

    /// Where the loader is in its fetch sequence.
    pub fn phase(&self) -> LoadPhase {
        self.shared.guard.lock().phase
    }

    /// The current necessity, once set.
    pub fn necessity(&self) -> Option<Necessity> {
        self.shared.guard.lock().necessity
    }

    /// Update how aggressively this tile's data should be fetched.
    ///
    /// Becoming `Required` starts (or resumes) the fetch sequence: cache
    /// lookup first, straight to the network if the cache already missed or
    /// went stale. Becoming `Optional` cancels an outstanding network
    /// request while retaining any delivered data; a cache-only lookup in
    /// flight is left to finish.
    ///
    /// Setting the value it already has is a no-op while a request is in
    /// flight or a current payload stands; re-asserting `Required` on a
    /// loader parked after a network failure resumes fetching.
    pub fn set_necessity(&self, necessity: Necessity) {
        let shared = &self.shared;
        let mut core = shared.guard.lock();
        if core.necessity == Some(necessity) {
            let parked = necessity == Necessity::Required && core.phase == LoadPhase::Idle;
            if !parked {
                return;
            }
        }
        core.necessity = Some(necessity);
        match necessity {
            Necessity::Required => shared.make_required(&mut core),
            Necessity::Optional => shared.make_optional(&mut core),
        }
    }

    /// Apply new fetch-environment parameters.
    ///
    /// If the change implies previously delivered data is now stale (the
    /// revalidation interval tightened, or the network came back after
    /// being marked unavailable) and the tile is `Required`, any
    /// outstanding request is superseded and the sequence re-enters from
    /// the cache-lookup step.
    pub fn set_update_parameters(&self, params: UpdateParameters) {
        let shared = &self.shared;
        let mut core = shared.guard.lock();
        if core.params == params {
            return;
        }
        let previous = std::mem::replace(&mut core.params, params);
        if core.necessity != Some(Necessity::Required) {
            return;
        }

        let network_regained = params.network_available && !previous.network_available;
        let interval_tightened = match (
            previous.revalidation_interval,
            params.revalidation_interval,
        ) {
            (Some(old), Some(new)) => new < old,
            (None, Some(_)) => true,
            _ => false,
        };
        if !network_regained && !interval_tightened {
            return;
        }

        // Nothing delivered yet counts as stale: the sequence is worth
        // re-entering now that the environment improved or tightened.
        let stale = core
            .delivered
            .as_ref()
            .map(|f| shared.policy.classify(f, &core.params, Utc::now()) == CacheDisposition::Revalidate)
            .unwrap_or(true);
        if !stale {
            return;
        }

        debug!(url = %shared.url, "update parameters invalidated current data");
        shared.cancel_in_flight(&mut core);
        core.tried_cache = false;
        shared.make_required(&mut core);
    }
}

impl<T: TileObserver> Drop for TileLoader<T> {
    fn drop(&mut self) {
        // Ordered against deliveries by the guard: once this runs, no
        // completion reaches the observer, and the handle is released with
        // provider-side cancellation requested.
        self.shared.guard.abort(|core| {
            core.phase = LoadPhase::Aborted;
            if let Some(request) = core.request.take() {
                request.cancel();
            }
        });
    }
}

impl<T: TileObserver> Shared<T> {
    fn make_required(self: &Arc<Self>, core: &mut Core) {
        match core.phase {
            // Already fetching; the outstanding request keeps its course.
            LoadPhase::CacheLookupPending | LoadPhase::NetworkPending => {}
            LoadPhase::Idle | LoadPhase::Delivered => {
                if !core.tried_cache {
                    self.issue_cache_lookup(core);
                } else if let Some(freshness) = core.delivered.clone() {
                    let disposition =
                        self.policy.classify(&freshness, &core.params, Utc::now());
                    if disposition == CacheDisposition::Revalidate && core.params.network_available
                    {
                        self.issue_network(core, Some(freshness));
                    } else {
                        core.phase = LoadPhase::Delivered;
                    }
                } else if core.params.network_available {
                    // The cache already missed this cycle.
                    self.issue_network(core, None);
                }
            }
            LoadPhase::Aborted => debug_assert!(false, "operation on aborted loader"),
        }
    }

    fn make_optional(&self, core: &mut Core) {
        // A cache-only lookup is cheap; let it finish. Network work stops.
        if core.phase == LoadPhase::NetworkPending {
            self.cancel_in_flight(core);
        }
    }

    fn issue_cache_lookup(self: &Arc<Self>, core: &mut Core) {
        debug_assert!(core.request.is_none(), "two live requests for one loader");
        core.generation = core.generation.wrapping_add(1);
        let generation = core.generation;
        core.resource = Resource::cache_only(&*self.url).with_priority(core.priority());
        core.phase = LoadPhase::CacheLookupPending;
        debug!(url = %self.url, generation, "issuing cache lookup");

        let shared = Arc::clone(self);
        let handle = self.provider.request(
            &core.resource,
            Box::new(move |response| shared.on_cache_response(generation, response)),
        );
        core.request = Some(handle);
    }

    fn issue_network(self: &Arc<Self>, core: &mut Core, prior: Option<Freshness>) {
        debug_assert!(core.request.is_none(), "two live requests for one loader");
        core.generation = core.generation.wrapping_add(1);
        let generation = core.generation;
        core.resource = match &prior {
            // Revalidating a known payload: let the provider answer from its
            // cache on 304 by carrying the prior validators.
            Some(freshness) => {
                Resource::cache_and_network(&*self.url).with_prior_freshness(freshness)
            }
            None => Resource::network_only(&*self.url),
        }
        .with_priority(core.priority());
        core.phase = LoadPhase::NetworkPending;
        debug!(
            url = %self.url,
            generation,
            strategy = ?core.resource.strategy,
            "issuing network fetch"
        );

        let shared = Arc::clone(self);
        let handle = self.provider.request(
            &core.resource,
            Box::new(move |response| shared.on_network_response(generation, response)),
        );
        core.request = Some(handle);
    }

    fn cancel_in_flight(&self, core: &mut Core) {
        if let Some(request) = core.request.take() {
            debug!(url = %self.url, id = request.id(), "cancelling in-flight request");
            request.cancel();
            // A completion racing the cancellation now carries a stale
            // generation and is discarded.
            core.generation = core.generation.wrapping_add(1);
            if matches!(
                core.phase,
                LoadPhase::CacheLookupPending | LoadPhase::NetworkPending
            ) {
                core.phase = LoadPhase::Idle;
            }
        }
    }

    fn on_cache_response(self: Arc<Self>, generation: u64, response: ResourceResponse) {
        self.guard.deliver(|core| {
            if core.generation != generation {
                trace!(generation, current = core.generation, "discarding superseded cache result");
                return;
            }
            core.request = None;
            core.tried_cache = true;
            match response {
                ResourceResponse::Found { data, freshness } => {
                    let disposition =
                        self.policy.classify(&freshness, &core.params, Utc::now());
                    core.delivered = Some(freshness.clone());
                    core.phase = LoadPhase::Delivered;
                    self.observer.apply_loaded(data, freshness.clone());
                    if disposition == CacheDisposition::Revalidate && core.wants_network() {
                        self.issue_network(core, Some(freshness));
                    }
                }
                ResourceResponse::NotFound => {
                    if core.wants_network() {
                        self.issue_network(core, None);
                    } else {
                        core.phase = LoadPhase::Idle;
                    }
                }
                ResourceResponse::Error(error) => {
                    warn!(url = %self.url, error = %error, "cache lookup failed; treating as miss");
                    if core.wants_network() {
                        self.issue_network(core, None);
                    } else {
                        core.phase = LoadPhase::Idle;
                    }
                }
            }
        });
    }

    fn on_network_response(self: Arc<Self>, generation: u64, response: ResourceResponse) {
        self.guard.deliver(|core| {
            if core.generation != generation {
                trace!(generation, current = core.generation, "discarding superseded network result");
                return;
            }
            core.request = None;
            match response {
                ResourceResponse::Found { data, freshness } => {
                    core.delivered = Some(freshness.clone());
                    core.phase = LoadPhase::Delivered;
                    debug!(url = %self.url, "network payload delivered");
                    self.observer.apply_loaded(data, freshness);
                }
                ResourceResponse::NotFound => {
                    // Network attempts report missing resources as an HTTP
                    // status; treat a bare NotFound the same way.
                    core.phase = LoadPhase::Idle;
                    self.observer.apply_error(ResourceError::Status { code: 404 });
                }
                ResourceResponse::Error(error) => {
                    core.phase = LoadPhase::Idle;
                    self.observer.apply_error(error);
                }
            }
        });
    }
}
