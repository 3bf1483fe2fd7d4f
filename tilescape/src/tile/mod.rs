//! Tile wrappers at the decode boundary.
//!
//! Requesting a tile returns a placeholder immediately; the decoded payload
//! arrives through a later completion callback. [`ImageTile`] is the state
//! machine that absorbs that asynchrony: all spatial and tile arithmetic
//! stays synchronous, and a completion that arrives late (after the view
//! moved away or the entry was aborted) is refused without corrupting
//! anything. An errored tile is represented by its state; the drawing layer
//! maps it to a placeholder image, so no failure propagates upward from here.

use serde::{Deserialize, Serialize};

use crate::tilegrid::TileCoord;

/// Lifecycle state of a tile request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileState {
    /// Created, nothing requested yet.
    Idle,
    /// Fetch/decode in flight.
    Loading,
    /// Payload available.
    Loaded,
    /// Fetch or decode failed; drawn as a placeholder.
    Error,
    /// Source has no content for this address.
    Empty,
    /// Caller moved away before completion.
    Abort,
}

/// A tile placeholder plus its decoded payload once available.
///
/// Transitions return `false` when refused. Refusals are how stale
/// completions are tolerated: a decode callback firing after
/// [`ImageTile::abort`] finds its transition rejected and the tile state
/// intact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageTile<D> {
    coord: TileCoord,
    uid: u64,
    state: TileState,
    data: Option<D>,
}

impl<D> ImageTile<D> {
    /// Create an idle tile for `coord` with a caller-allocated uid.
    pub fn new(coord: TileCoord, uid: u64) -> Self {
        Self {
            coord,
            uid,
            state: TileState::Idle,
            data: None,
        }
    }

    /// The tile's pyramid address.
    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    /// Unique id for cache bookkeeping and logging.
    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TileState {
        self.state
    }

    /// The decoded payload, present only in the loaded state.
    pub fn data(&self) -> Option<&D> {
        self.data.as_ref()
    }

    /// Begin loading. Only an idle tile can start.
    pub fn load(&mut self) -> bool {
        self.transition(TileState::Idle, TileState::Loading)
    }

    /// Complete with a decoded payload. Only a loading tile can finish;
    /// anything else is a stale completion and is refused.
    pub fn finish(&mut self, data: D) -> bool {
        if self.transition(TileState::Loading, TileState::Loaded) {
            self.data = Some(data);
            true
        } else {
            false
        }
    }

    /// Complete with a failure.
    pub fn fail(&mut self) -> bool {
        self.transition(TileState::Loading, TileState::Error)
    }

    /// Complete with "source has nothing here".
    pub fn mark_empty(&mut self) -> bool {
        self.transition(TileState::Loading, TileState::Empty)
    }

    /// Give up on an in-flight load. The fetch itself cannot be cancelled;
    /// its eventual completion will be refused as stale.
    pub fn abort(&mut self) -> bool {
        self.transition(TileState::Loading, TileState::Abort)
    }

    fn transition(&mut self, from: TileState, to: TileState) -> bool {
        if self.state == from {
            self.state = to;
            true
        } else {
            tracing::trace!(
                tile = %self.coord,
                current = ?self.state,
                refused = ?to,
                "refused stale tile transition"
            );
            false
        }
    }
}

/// Collaborator seam for tile providers.
///
/// A source hands out [`ImageTile`] placeholders synchronously and updates
/// them when decode completes. The drawing layer only ever sees the state
/// machine.
pub trait TileSource {
    /// Decoded payload type held by this source's tiles.
    type Data;

    /// The tile at `(z, x, y)`, created idle on first request.
    fn get_tile(&mut self, z: u8, x: i32, y: i32) -> &mut ImageTile<Self::Data>;

    /// A previously requested tile by cache key, if still known.
    fn get_tile_by_key(&mut self, key: &str) -> Option<&mut ImageTile<Self::Data>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile() -> ImageTile<Vec<u8>> {
        ImageTile::new(TileCoord::new(3, 1, 2), 7)
    }

    #[test]
    fn test_new_tile_is_idle() {
        let t = tile();
        assert_eq!(t.state(), TileState::Idle);
        assert_eq!(t.coord(), TileCoord::new(3, 1, 2));
        assert_eq!(t.uid(), 7);
        assert!(t.data().is_none());
    }

    #[test]
    fn test_happy_path_load_then_finish() {
        let mut t = tile();
        assert!(t.load());
        assert_eq!(t.state(), TileState::Loading);
        assert!(t.finish(vec![1, 2, 3]));
        assert_eq!(t.state(), TileState::Loaded);
        assert_eq!(t.data(), Some(&vec![1, 2, 3]));
    }

    #[test]
    fn test_failure_path() {
        let mut t = tile();
        t.load();
        assert!(t.fail());
        assert_eq!(t.state(), TileState::Error);
        assert!(t.data().is_none());
    }

    #[test]
    fn test_empty_path() {
        let mut t = tile();
        t.load();
        assert!(t.mark_empty());
        assert_eq!(t.state(), TileState::Empty);
    }

    #[test]
    fn test_stale_completion_after_abort_is_refused() {
        let mut t = tile();
        t.load();
        assert!(t.abort());
        // The fetch completes anyway; the late callback must change nothing
        assert!(!t.finish(vec![9, 9, 9]));
        assert_eq!(t.state(), TileState::Abort);
        assert!(t.data().is_none());
    }

    #[test]
    fn test_double_finish_is_refused() {
        let mut t = tile();
        t.load();
        assert!(t.finish(vec![1]));
        assert!(!t.finish(vec![2]));
        assert_eq!(t.data(), Some(&vec![1]), "first payload is kept");
    }

    #[test]
    fn test_cannot_finish_without_loading() {
        let mut t = tile();
        assert!(!t.finish(vec![1]));
        assert_eq!(t.state(), TileState::Idle);
    }

    #[test]
    fn test_cannot_abort_idle_tile() {
        let mut t = tile();
        assert!(!t.abort());
        assert_eq!(t.state(), TileState::Idle);
    }

    #[test]
    fn test_double_load_is_refused() {
        let mut t = tile();
        assert!(t.load());
        assert!(!t.load());
        assert_eq!(t.state(), TileState::Loading);
    }
}
