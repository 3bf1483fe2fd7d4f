//! Quadtree spatial index over object bounding boxes.
//!
//! The tree is used for both hit-testing and viewport range queries. It is
//! built once per full dataset load and read-only afterward; any data
//! mutation triggers a full [`QuadTree::build`], never incremental repair.
//!
//! # Placement
//!
//! An object lives at the shallowest node whose quadrant fully contains its
//! bounding box. Objects straddling a quadrant midline stay at an ancestor
//! indefinitely, even when deeper splits happen below them. Under adversarial
//! inserts (many large overlapping boxes) one ancestor's object list can grow
//! without bound; this is a known scalability limit of the design and is
//! preserved as-is.
//!
//! # Storage
//!
//! Nodes live in a flat arena addressed by slot index. Parent links are
//! non-owning indices, so the structure has no reference cycles and
//! serializes directly.

mod node;

pub use node::{Node, NodeBounds};

use serde::{Deserialize, Serialize};

use crate::extent::Extent;

/// Default maximum tree depth.
pub const DEFAULT_MAX_LEVELS: u32 = 5;

/// Default object capacity of a node before it splits.
pub const DEFAULT_MAX_OBJECTS: usize = 10;

const ROOT: usize = 0;

/// Capability the quadtree requires of its element type: a bounding box.
pub trait Bounded {
    /// Axis-aligned bounding box of the object in world coordinates.
    fn bbox(&self) -> Extent;
}

/// Spatial index over objects with bounding boxes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuadTree<T> {
    nodes: Vec<Node<T>>,
    max_objects: usize,
    max_levels: u32,
}

impl<T: Bounded> QuadTree<T> {
    /// Create an empty tree covering `extent` with default limits.
    pub fn new(extent: Extent) -> Self {
        Self::with_limits(extent, DEFAULT_MAX_OBJECTS, DEFAULT_MAX_LEVELS)
    }

    /// Create an empty tree with explicit split capacity and depth limits.
    pub fn with_limits(extent: Extent, max_objects: usize, max_levels: u32) -> Self {
        Self {
            nodes: vec![Node::new(NodeBounds::from(extent), 0, None)],
            max_objects,
            max_levels,
        }
    }

    /// Number of nodes in the arena.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of stored objects.
    pub fn object_count(&self) -> usize {
        self.nodes.iter().map(|n| n.objects.len()).sum()
    }

    /// Insert one object.
    ///
    /// An object with an empty or non-finite bounding box is logged and
    /// ignored; the tree is never corrupted by a malformed insert.
    pub fn insert(&mut self, object: T) {
        let bbox = object.bbox();
        if bbox.is_empty() || !bbox.is_finite() {
            tracing::warn!(?bbox, "ignoring insert of object with malformed bbox");
            return;
        }

        // Descend to the shallowest node whose quadrant fully contains the
        // bbox. Straddlers stop at the current node.
        let mut id = ROOT;
        while let Some(children) = self.nodes[id].children {
            match self.quadrant_index(id, &bbox) {
                Some(q) => id = children[q],
                None => break,
            }
        }
        self.nodes[id].objects.push(object);
        self.redistribute_overflow(id);
    }

    /// Insert every object from an iterator.
    pub fn extend<I: IntoIterator<Item = T>>(&mut self, objects: I) {
        for object in objects {
            self.insert(object);
        }
    }

    /// Rebuild the index from scratch over `objects`.
    pub fn build<I: IntoIterator<Item = T>>(&mut self, objects: I) {
        self.clear();
        self.extend(objects);
    }

    /// Recursively empty the tree, keeping only a bare root.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[ROOT].objects.clear();
        self.nodes[ROOT].children = None;
    }

    /// Quadrant of `node` that fully contains `bbox`: 0 NE, 1 NW, 2 SW,
    /// 3 SE, or `None` when the bbox straddles a midline.
    ///
    /// Midlines use the same floored half-dimensions as [`split`], and the
    /// comparisons are strict, so a bbox touching a midline straddles.
    fn quadrant_index(&self, node: usize, bbox: &Extent) -> Option<usize> {
        let bounds = self.nodes[node].bounds;
        let vmid = bounds.x + bounds.sub_width();
        let hmid = bounds.y + bounds.sub_height();

        let top = bbox.ymin < hmid && bbox.ymax < hmid;
        let bottom = bbox.ymin > hmid;
        let left = bbox.xmin < vmid && bbox.xmax < vmid;
        let right = bbox.xmin > vmid;

        match (left, right, top, bottom) {
            (_, true, true, _) => Some(0),
            (true, _, true, _) => Some(1),
            (true, _, _, true) => Some(2),
            (_, true, _, true) => Some(3),
            _ => None,
        }
    }

    /// Split `node` into 4 equal children (NE, NW, SW, SE) at `level + 1`.
    fn split(&mut self, node: usize) -> [usize; 4] {
        let bounds = self.nodes[node].bounds;
        let level = self.nodes[node].level;
        let sub_w = bounds.sub_width();
        let sub_h = bounds.sub_height();

        let quadrants = [
            NodeBounds::new(bounds.x + sub_w, bounds.y, sub_w, sub_h),
            NodeBounds::new(bounds.x, bounds.y, sub_w, sub_h),
            NodeBounds::new(bounds.x, bounds.y + sub_h, sub_w, sub_h),
            NodeBounds::new(bounds.x + sub_w, bounds.y + sub_h, sub_w, sub_h),
        ];

        let mut children = [0usize; 4];
        for (slot, quadrant) in children.iter_mut().zip(quadrants) {
            *slot = self.nodes.len();
            self.nodes.push(Node::new(quadrant, level + 1, Some(node)));
        }
        self.nodes[node].children = Some(children);
        children
    }

    /// Split over-capacity nodes and push down objects that now fit wholly
    /// inside one child. Straddlers remain where they are permanently.
    fn redistribute_overflow(&mut self, node: usize) {
        let mut pending = vec![node];
        while let Some(id) = pending.pop() {
            if self.nodes[id].objects.len() <= self.max_objects
                || self.nodes[id].level >= self.max_levels
            {
                continue;
            }
            let children = match self.nodes[id].children {
                Some(children) => children,
                None => self.split(id),
            };

            let objects = std::mem::take(&mut self.nodes[id].objects);
            let mut kept = Vec::new();
            for object in objects {
                match self.quadrant_index(id, &object.bbox()) {
                    Some(q) => {
                        let child = children[q];
                        self.nodes[child].objects.push(object);
                        if !pending.contains(&child) {
                            pending.push(child);
                        }
                    }
                    None => kept.push(object),
                }
            }
            self.nodes[id].objects = kept;
        }
    }

    /// All objects whose bounding box is contained in or intersects `extent`.
    ///
    /// Descends to the smallest node fully containing the query region,
    /// collects that node's entire subtree, then walks every ancestor outward
    /// collecting their straddling objects, and filters the union against the
    /// query.
    pub fn query(&self, extent: &Extent) -> Vec<&T> {
        // Deepest node whose quadrant chain fully contains the query.
        let mut id = ROOT;
        while let Some(children) = self.nodes[id].children {
            match self.quadrant_index(id, extent) {
                Some(q) => id = children[q],
                None => break,
            }
        }

        let matches =
            |object: &T| -> bool {
                let bbox = object.bbox();
                extent.contains_extent(&bbox) || extent.intersects(&bbox)
            };

        let mut results = Vec::new();

        // The subtree below (and including) the matching node.
        let mut stack = vec![id];
        while let Some(nid) = stack.pop() {
            results.extend(self.nodes[nid].objects.iter().filter(|o| matches(o)));
            if let Some(children) = self.nodes[nid].children {
                stack.extend(children);
            }
        }

        // Straddling objects held by every ancestor, outward to the root.
        let mut parent = self.nodes[id].parent;
        while let Some(pid) = parent {
            results.extend(self.nodes[pid].objects.iter().filter(|o| matches(o)));
            parent = self.nodes[pid].parent;
        }

        results
    }
}
