//! TileStream - per-tile resource loading and caching for map renderers
//!
//! This library provides the orchestration layer a map-rendering engine uses
//! to obtain the raw data backing each displayable tile: cache-versus-network
//! sequencing, cancellation as tiles move in and out of the visible set, and
//! lifetime safety for completions that arrive after a tile is gone.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                     Tile owner                            │
//! │        owns a TileLoader, receives via TileObserver       │
//! └───────────────────────────────────────────────────────────┘
//!                  │ set_necessity / set_update_parameters
//!                  ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │                     TileLoader                            │
//! │   state machine + pending-request guard (loader module)   │
//! └───────────────────────────────────────────────────────────┘
//!                  │ request(Resource, callback) -> handle
//!                  ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │          ResourceProvider (shared across loaders)         │
//! │    CachedResourceProvider = ResourceCache + HttpClient    │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Decoding of payloads, style evaluation, rendering, and tile-pyramid
//! selection are the embedding engine's concern; this crate hands the owner
//! payload bytes plus freshness metadata and nothing else.

pub mod cache;
pub mod coord;
pub mod loader;
pub mod provider;
pub mod resource;
pub mod tileset;

pub use coord::{OverscaledTileCoord, TileCoord};
pub use loader::{Necessity, RevalidationPolicy, TileLoader, TileObserver, UpdateParameters};
pub use provider::{CachedResourceProvider, ResourceError, ResourceProvider};
pub use resource::{Freshness, LoadStrategy, Resource};
pub use tileset::{Scheme, TilesetDescriptor};
