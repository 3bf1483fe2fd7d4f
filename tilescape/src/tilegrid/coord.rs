//! Discrete tile addresses in the pyramid.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Address of one tile: zoom level and column/row indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level (index into the grid's resolution ladder).
    pub z: u8,
    /// Column, counting east from the grid origin.
    pub x: i32,
    /// Row, counting down from the grid origin.
    pub y: i32,
}

impl TileCoord {
    /// Create a tile coordinate.
    pub fn new(z: u8, x: i32, y: i32) -> Self {
        Self { z, x, y }
    }

    /// Non-cryptographic hash `(x << z) + y`.
    ///
    /// Collisions across zoom levels are tolerated; the value is only used
    /// for cache keying where a collision costs a refetch, not correctness.
    pub fn hash(&self) -> i64 {
        ((self.x as i64) << self.z) + self.y as i64
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}
