//! Tile coordinate types.
//!
//! Provides the coordinate key that binds a loader to the tile it serves:
//! a position in the Web Mercator / Slippy Map grid, optionally overscaled
//! (rendered at a zoom level higher than its data zoom).

mod types;

pub use types::{CoordError, OverscaledTileCoord, TileCoord, MAX_ZOOM, MIN_ZOOM};
