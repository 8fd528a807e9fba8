//! Per-tile resource loading orchestration.
//!
//! [`TileLoader`] decides, for a single displayable tile, whether its data
//! requirement is satisfied from cache, from the network, or from a
//! cache-then-network sequence, while the tile's [`Necessity`] changes over
//! the request's lifetime and provider completions arrive from other
//! threads.
//!
//! # Lifecycle
//!
//! The tile owner constructs a loader bound to a tileset and a shared
//! provider, then drives it with [`TileLoader::set_necessity`] and
//! [`TileLoader::set_update_parameters`]. At most one request is in flight
//! per loader at any instant; a newer intent supersedes an older request
//! rather than queueing behind it. Dropping the loader cancels outstanding
//! work and guarantees the owner's [`TileObserver`] is never called again.
//!
//! # Fetch sequence
//!
//! ```text
//!            set_necessity(Required)
//! Idle ──────────────────────────────► CacheLookupPending
//!                                          │
//!                      hit, fresh          │   miss / hit needing
//!                   ┌──────────────────────┤   revalidation
//!                   ▼                      ▼
//!               Delivered ◄──────── NetworkPending ───► Idle (on failure,
//!                                          │            caller resumes)
//!                                          │ set_necessity(Optional)
//!                                          ▼
//!                                   Idle (data retained)
//! ```

mod guard;
mod observer;
mod policy;
mod state;
mod tile_loader;

pub use observer::TileObserver;
pub use policy::{CacheDisposition, RevalidationPolicy};
pub use state::{LoadPhase, Necessity, UpdateParameters};
pub use tile_loader::TileLoader;
