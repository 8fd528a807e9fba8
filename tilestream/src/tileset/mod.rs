//! Tileset descriptors.
//!
//! A [`TilesetDescriptor`] is the externally supplied, read-only description
//! of where a tile source's data lives: one or more URL templates, the zoom
//! range they cover, and the Y-axis [`Scheme`]. Loaders read it once at
//! construction to seed their resource address.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coord::OverscaledTileCoord;

/// Y-axis convention used by the tile endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Row 0 at the north (Slippy Map / Google convention).
    #[default]
    Xyz,
    /// Row 0 at the south; the row is flipped when building URLs.
    Tms,
}

/// Errors that can occur when resolving a tile address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TilesetError {
    /// The descriptor carries no URL templates.
    #[error("tileset has no URL templates")]
    NoTemplates,

    /// The tile's data zoom falls outside the tileset's zoom range.
    #[error("zoom {zoom} outside tileset range {min}..={max}")]
    ZoomOutOfRange { zoom: u8, min: u8, max: u8 },
}

/// Read-only description of a tile source.
///
/// Templates use `{x}`, `{y}` and `{z}` placeholders, e.g.
/// `https://tiles.example.com/{z}/{x}/{y}.pbf`. Multiple templates are
/// rotated across endpoints deterministically by tile coordinate.
///
/// # Example
///
/// ```
/// use tilestream::coord::{OverscaledTileCoord, TileCoord};
/// use tilestream::tileset::{Scheme, TilesetDescriptor};
///
/// let tileset = TilesetDescriptor::new(
///     vec!["https://tiles.example.com/{z}/{x}/{y}.pbf".to_string()],
///     0,
///     14,
///     Scheme::Xyz,
/// );
/// let tile = OverscaledTileCoord::from_coord(TileCoord::new(5448, 8185, 14).unwrap());
/// let url = tileset.tile_url(&tile).unwrap();
/// assert_eq!(url, "https://tiles.example.com/14/8185/5448.pbf");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilesetDescriptor {
    /// URL templates with `{x}`/`{y}`/`{z}` placeholders.
    pub url_templates: Vec<String>,
    /// Lowest zoom level the source provides data for.
    pub min_zoom: u8,
    /// Highest zoom level the source provides data for.
    pub max_zoom: u8,
    /// Y-axis convention of the endpoint.
    #[serde(default)]
    pub scheme: Scheme,
}

impl TilesetDescriptor {
    /// Create a descriptor.
    pub fn new(url_templates: Vec<String>, min_zoom: u8, max_zoom: u8, scheme: Scheme) -> Self {
        Self {
            url_templates,
            min_zoom,
            max_zoom,
            scheme,
        }
    }

    /// Resolve the address for a tile.
    ///
    /// The data zoom (not the overscaled zoom) selects the template values:
    /// an overscaled tile requests the same bytes as its data tile.
    ///
    /// # Errors
    ///
    /// Returns `TilesetError` if the descriptor has no templates or the data
    /// zoom falls outside the tileset's range.
    pub fn tile_url(&self, tile: &OverscaledTileCoord) -> Result<String, TilesetError> {
        if self.url_templates.is_empty() {
            return Err(TilesetError::NoTemplates);
        }
        let coord = tile.coord;
        if coord.zoom < self.min_zoom || coord.zoom > self.max_zoom {
            return Err(TilesetError::ZoomOutOfRange {
                zoom: coord.zoom,
                min: self.min_zoom,
                max: self.max_zoom,
            });
        }

        // Distribute tiles across endpoints the same way every time so a
        // given tile always hits the same host (and the same cache key).
        let index = ((coord.row as u64 + coord.col as u64) % self.url_templates.len() as u64)
            as usize;
        let template = &self.url_templates[index];

        let row = match self.scheme {
            Scheme::Xyz => coord.row,
            Scheme::Tms => (1u32 << coord.zoom) - 1 - coord.row,
        };

        Ok(template
            .replace("{z}", &coord.zoom.to_string())
            .replace("{x}", &coord.col.to_string())
            .replace("{y}", &row.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileCoord;

    fn tile(row: u32, col: u32, zoom: u8) -> OverscaledTileCoord {
        OverscaledTileCoord::from_coord(TileCoord::new(row, col, zoom).unwrap())
    }

    #[test]
    fn test_tile_url_xyz() {
        let tileset = TilesetDescriptor::new(
            vec!["https://a.example.com/{z}/{x}/{y}.pbf".to_string()],
            0,
            14,
            Scheme::Xyz,
        );
        let url = tileset.tile_url(&tile(5448, 8185, 14)).unwrap();
        assert_eq!(url, "https://a.example.com/14/8185/5448.pbf");
    }

    #[test]
    fn test_tile_url_tms_flips_row() {
        let tileset = TilesetDescriptor::new(
            vec!["https://a.example.com/{z}/{x}/{y}.png".to_string()],
            0,
            4,
            Scheme::Tms,
        );
        // At zoom 2 the grid is 4 rows tall: row 1 becomes 4 - 1 - 1 = 2.
        let url = tileset.tile_url(&tile(1, 3, 2)).unwrap();
        assert_eq!(url, "https://a.example.com/2/3/2.png");
    }

    #[test]
    fn test_tile_url_overscaled_uses_data_zoom() {
        let tileset = TilesetDescriptor::new(
            vec!["https://a.example.com/{z}/{x}/{y}.pbf".to_string()],
            0,
            14,
            Scheme::Xyz,
        );
        let coord = TileCoord::new(5448, 8185, 14).unwrap();
        let over = OverscaledTileCoord::new(16, coord).unwrap();
        let url = tileset.tile_url(&over).unwrap();
        assert_eq!(url, "https://a.example.com/14/8185/5448.pbf");
    }

    #[test]
    fn test_tile_url_rotates_endpoints_deterministically() {
        let tileset = TilesetDescriptor::new(
            vec![
                "https://a.example.com/{z}/{x}/{y}".to_string(),
                "https://b.example.com/{z}/{x}/{y}".to_string(),
            ],
            0,
            14,
            Scheme::Xyz,
        );
        let first = tileset.tile_url(&tile(0, 0, 10)).unwrap();
        let again = tileset.tile_url(&tile(0, 0, 10)).unwrap();
        assert_eq!(first, again);

        let other = tileset.tile_url(&tile(0, 1, 10)).unwrap();
        assert_ne!(first, other);
    }

    #[test]
    fn test_tile_url_no_templates() {
        let tileset = TilesetDescriptor::new(vec![], 0, 14, Scheme::Xyz);
        assert_eq!(
            tileset.tile_url(&tile(0, 0, 10)),
            Err(TilesetError::NoTemplates)
        );
    }

    #[test]
    fn test_tile_url_zoom_out_of_range() {
        let tileset = TilesetDescriptor::new(
            vec!["https://a.example.com/{z}/{x}/{y}".to_string()],
            4,
            14,
            Scheme::Xyz,
        );
        let err = tileset.tile_url(&tile(0, 0, 2)).unwrap_err();
        assert_eq!(
            err,
            TilesetError::ZoomOutOfRange {
                zoom: 2,
                min: 4,
                max: 14
            }
        );
    }

    #[test]
    fn test_descriptor_json_round_trip() {
        let tileset = TilesetDescriptor::new(
            vec!["https://a.example.com/{z}/{x}/{y}.pbf".to_string()],
            0,
            14,
            Scheme::Tms,
        );
        let json = serde_json::to_string(&tileset).unwrap();
        let back: TilesetDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tileset);
    }

    #[test]
    fn test_descriptor_scheme_defaults_to_xyz() {
        let json = r#"{"url_templates":["https://a/{z}/{x}/{y}"],"min_zoom":0,"max_zoom":10}"#;
        let tileset: TilesetDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(tileset.scheme, Scheme::Xyz);
    }
}
