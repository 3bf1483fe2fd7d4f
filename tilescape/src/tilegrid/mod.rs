//! Tile-pyramid addressing over a resolution ladder.
//!
//! A [`TileGrid`] maps between continuous world coordinates at a resolution
//! and discrete [`TileCoord`] addresses. The render loop asks it which tile
//! range covers the current view extent, then resolves each tile through the
//! image cache.
//!
//! # Edge assignment
//!
//! Converting an extent's corners to tile indices applies opposite policies
//! to the two corners: the min corner floors, the max corner uses the
//! reverse intersection policy (`ceil - 1`). A point exactly on a tile edge
//! is therefore assigned deterministically whichever side it is scanned
//! from, and a tile's own extent round-trips to a range containing exactly
//! that tile, with no off-by-one over-coverage.

mod coord;
mod range;

pub use coord::TileCoord;
pub use range::{TileRange, TileRangeIterator};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extent::{Coordinate, Extent};
use crate::view::{linear_find_nearest, NearestDirection};

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: f64 = 256.0;

/// Tile dimensions in pixels; square unless constructed from a pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileSize {
    pub width: f64,
    pub height: f64,
}

impl TileSize {
    /// Create a rectangular tile size.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Create a square tile size.
    pub fn square(edge: f64) -> Self {
        Self::new(edge, edge)
    }
}

impl Default for TileSize {
    fn default() -> Self {
        Self::square(DEFAULT_TILE_SIZE)
    }
}

impl From<f64> for TileSize {
    fn from(edge: f64) -> Self {
        Self::square(edge)
    }
}

impl From<[f64; 2]> for TileSize {
    fn from(wh: [f64; 2]) -> Self {
        Self::new(wh[0], wh[1])
    }
}

/// Errors from tile grid construction and lookups.
#[derive(Debug, Error, PartialEq)]
pub enum TileGridError {
    /// The resolutions ladder is empty or not strictly decreasing.
    #[error("resolutions ladder must be non-empty and strictly decreasing")]
    InvalidResolutions,

    /// Requested zoom level lies outside `[min_zoom, max_zoom]`.
    #[error("zoom level {z} outside [{min}, {max}]")]
    ZoomOutOfRange { z: u8, min: u8, max: u8 },

    /// Neither an origin nor an extent to derive one from was supplied.
    #[error("tile grid needs an explicit origin or an extent")]
    MissingOrigin,
}

/// Configuration for [`TileGrid::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileGridOptions {
    /// Resolution ladder, coarsest first and finest last. Required.
    pub resolutions: Vec<f64>,
    /// Tile dimensions in pixels.
    pub tile_size: TileSize,
    /// Lowest addressable zoom level.
    pub min_zoom: u8,
    /// World point tiles count from; defaults to the extent's top-left.
    pub origin: Option<Coordinate>,
    /// World extent of the pyramid.
    pub extent: Option<Extent>,
}

impl TileGridOptions {
    /// Options with defaults for everything but the ladder.
    pub fn new(resolutions: Vec<f64>) -> Self {
        Self {
            resolutions,
            tile_size: TileSize::default(),
            min_zoom: 0,
            origin: None,
            extent: None,
        }
    }
}

/// Addressing scheme of a multi-resolution tile pyramid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileGrid {
    resolutions: Vec<f64>,
    tile_size: TileSize,
    min_zoom: u8,
    max_zoom: u8,
    origin: Coordinate,
    extent: Option<Extent>,
}

/// Decimal tolerance applied before flooring/ceiling a tile index, so edge
/// coordinates survive float noise from the extent math.
const INDEX_DECIMALS: f64 = 1e5;

fn floor_tolerant(value: f64) -> f64 {
    ((value * INDEX_DECIMALS).round() / INDEX_DECIMALS).floor()
}

fn ceil_tolerant(value: f64) -> f64 {
    ((value * INDEX_DECIMALS).round() / INDEX_DECIMALS).ceil()
}

impl TileGrid {
    /// Build a grid, validating the ladder and deriving the origin.
    pub fn new(options: TileGridOptions) -> Result<Self, TileGridError> {
        if options.resolutions.is_empty()
            || options.resolutions.windows(2).any(|w| w[1] >= w[0])
        {
            return Err(TileGridError::InvalidResolutions);
        }
        let origin = options
            .origin
            .or_else(|| options.extent.as_ref().map(Extent::top_left))
            .ok_or(TileGridError::MissingOrigin)?;
        let max_zoom = (options.resolutions.len() - 1) as u8;
        if options.min_zoom > max_zoom {
            return Err(TileGridError::ZoomOutOfRange {
                z: options.min_zoom,
                min: 0,
                max: max_zoom,
            });
        }
        Ok(Self {
            resolutions: options.resolutions,
            tile_size: options.tile_size,
            min_zoom: options.min_zoom,
            max_zoom,
            origin,
            extent: options.extent,
        })
    }

    /// The grid's resolution ladder.
    pub fn resolutions(&self) -> &[f64] {
        &self.resolutions
    }

    /// Tile dimensions in pixels.
    pub fn tile_size(&self) -> TileSize {
        self.tile_size
    }

    /// Lowest addressable zoom level.
    pub fn min_zoom(&self) -> u8 {
        self.min_zoom
    }

    /// Highest addressable zoom level (`resolutions.len() - 1`).
    pub fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    /// World point tiles count from.
    pub fn origin(&self) -> Coordinate {
        self.origin
    }

    /// World extent of the pyramid, when configured.
    pub fn extent(&self) -> Option<Extent> {
        self.extent
    }

    /// Resolution at zoom `z`.
    ///
    /// Fails fast with [`TileGridError::ZoomOutOfRange`] outside
    /// `[min_zoom, max_zoom]`; a bad zoom is a caller bug, not a recoverable
    /// condition.
    pub fn resolution(&self, z: u8) -> Result<f64, TileGridError> {
        if z < self.min_zoom || z > self.max_zoom {
            return Err(TileGridError::ZoomOutOfRange {
                z,
                min: self.min_zoom,
                max: self.max_zoom,
            });
        }
        Ok(self.resolutions[z as usize])
    }

    /// Zoom level whose resolution is nearest to `resolution`, clamped to
    /// `min_zoom`.
    pub fn z_for_resolution(&self, resolution: f64, direction: NearestDirection) -> u8 {
        let z = linear_find_nearest(&self.resolutions, resolution, direction) as u8;
        z.max(self.min_zoom)
    }

    /// World extent of one tile:
    /// `origin + tile_index * tile_size * resolution`, sized
    /// `tile_size * resolution` per axis.
    pub fn tile_coord_extent(&self, coord: &TileCoord) -> Result<Extent, TileGridError> {
        let resolution = self.resolution(coord.z)?;
        let span_x = self.tile_size.width * resolution;
        let span_y = self.tile_size.height * resolution;
        let xmin = self.origin[0] + f64::from(coord.x) * span_x;
        let ymin = self.origin[1] + f64::from(coord.y) * span_y;
        Ok(Extent::new(xmin, ymin, xmin + span_x, ymin + span_y))
    }

    /// Tile containing the world point `(x, y)` at `resolution` (floor
    /// policy on both axes).
    pub fn tile_coord_for_xy_and_resolution(&self, x: f64, y: f64, resolution: f64) -> TileCoord {
        self.tile_coord_with_policy(x, y, resolution, false)
    }

    /// The tile range covering `extent` at `resolution`.
    ///
    /// The min corner floors and the max corner applies the reverse
    /// intersection policy, so scanning the same edge from either side
    /// assigns it to the same tile.
    pub fn tile_range_for_extent_and_resolution(
        &self,
        extent: &Extent,
        resolution: f64,
    ) -> TileRange {
        let min = self.tile_coord_with_policy(extent.xmin, extent.ymin, resolution, false);
        let max = self.tile_coord_with_policy(extent.xmax, extent.ymax, resolution, true);
        TileRange::new(min.x, max.x, min.y, max.y)
    }

    fn tile_coord_with_policy(
        &self,
        x: f64,
        y: f64,
        resolution: f64,
        reverse_intersection_policy: bool,
    ) -> TileCoord {
        let z = self.z_for_resolution(resolution, NearestDirection::Nearest);
        let z_resolution = self.resolutions[z as usize];
        let scale = resolution / z_resolution;

        let tile_x = scale * (x - self.origin[0]) / (resolution * self.tile_size.width);
        let tile_y = scale * (y - self.origin[1]) / (resolution * self.tile_size.height);

        let (tile_x, tile_y) = if reverse_intersection_policy {
            (ceil_tolerant(tile_x) - 1.0, ceil_tolerant(tile_y) - 1.0)
        } else {
            (floor_tolerant(tile_x), floor_tolerant(tile_y))
        };
        TileCoord::new(z, tile_x as i32, tile_y as i32)
    }
}
