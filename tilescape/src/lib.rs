//! Tilescape - viewport, spatial index, and tile pyramid core
//!
//! This library decides, for a given view (center, resolution, canvas size),
//! which vector objects and which pre-rendered image tiles must be drawn,
//! and manages a bounded memory cache for decoded tiles. Canvas drawing,
//! style resolution, and file parsing live in collaborator layers that only
//! consume the bounding boxes, transforms, and query results produced here.
//!
//! A render pass reads the [`view::View`], computes a pixel/world transform
//! pair, queries the [`quadtree::QuadTree`] for on-screen vector objects and
//! the [`tilegrid::TileGrid`] for the tile set covering the extent, then
//! resolves each tile through the [`cache::ImageCache`].
//!
//! Everything here is single-threaded by design: structures are mutated from
//! one logical execution context, and the only asynchronous boundary is tile
//! decode completion, absorbed by the [`tile::ImageTile`] state machine.

pub mod cache;
pub mod extent;
pub mod quadtree;
pub mod tile;
pub mod tilegrid;
pub mod transform;
pub mod util;
pub mod view;

pub use cache::{ImageCache, LruCache};
pub use extent::{Coordinate, Extent};
pub use quadtree::{Bounded, QuadTree};
pub use tile::{ImageTile, TileSource, TileState};
pub use tilegrid::{TileCoord, TileGrid, TileGridOptions, TileRange, TileSize};
pub use transform::{Transform, TransformError};
pub use util::IdAllocator;
pub use view::{FrameState, NearestDirection, Size, View, ViewOptions};
