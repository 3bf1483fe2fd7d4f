//! Arena node storage for the quadtree.

use serde::{Deserialize, Serialize};

use crate::extent::Extent;

/// Rectangular region covered by one quadtree node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NodeBounds {
    /// Create bounds from an origin and dimensions.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Floored half-width, used for both child sizing and midline tests so
    /// the two never disagree.
    pub(crate) fn sub_width(&self) -> f64 {
        (self.width / 2.0).floor()
    }

    /// Floored half-height.
    pub(crate) fn sub_height(&self) -> f64 {
        (self.height / 2.0).floor()
    }
}

impl From<Extent> for NodeBounds {
    fn from(extent: Extent) -> Self {
        Self::new(extent.xmin, extent.ymin, extent.width(), extent.height())
    }
}

/// One node in the arena.
///
/// `parent` and `children` are slot indices into the owning tree's arena, so
/// there is no ownership cycle: the arena vector owns every node and the
/// back-reference is a plain non-owning index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node<T> {
    pub(crate) bounds: NodeBounds,
    pub(crate) objects: Vec<T>,
    /// Child slots in quadrant order NE, NW, SW, SE; `None` for a leaf.
    pub(crate) children: Option<[usize; 4]>,
    pub(crate) level: u32,
    pub(crate) parent: Option<usize>,
}

impl<T> Node<T> {
    pub(crate) fn new(bounds: NodeBounds, level: u32, parent: Option<usize>) -> Self {
        Self {
            bounds,
            objects: Vec::new(),
            children: None,
            level,
            parent,
        }
    }

    /// Whether this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// The region this node covers.
    pub fn bounds(&self) -> NodeBounds {
        self.bounds
    }

    /// Objects stored directly at this node.
    pub fn objects(&self) -> &[T] {
        &self.objects
    }
}
