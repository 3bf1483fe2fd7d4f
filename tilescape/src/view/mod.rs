//! View state: center, resolution, and the zoom ladder.
//!
//! A [`View`] is the single mutable description of what the user is looking
//! at. The render loop reads it once per frame through
//! [`View::calculate_frame_state`] and threads the resulting [`FrameState`]
//! through every spatial and tile query. Whichever renderer instance holds
//! the view exclusively mutates it.
//!
//! # Resolution model
//!
//! Resolution is world-units per pixel; smaller is more zoomed in. Bounds are
//! derived once at construction, either from an explicit decreasing
//! `resolutions` ladder (coarsest first) or from a world extent, the canvas
//! size, and a zoom factor. After any setter the current resolution lies in
//! `[min_resolution / scale_constrain / 2, max_resolution * scale_constrain]`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extent::{Coordinate, Extent};
use crate::transform::Transform;

/// Zoom factor between adjacent ladder-less zoom levels.
pub const DEFAULT_ZOOM_FACTOR: f64 = 2.0;

/// Number of zoom levels assumed when deriving bounds from an extent.
pub const DEFAULT_ZOOM_LEVELS: u32 = 5;

/// Canvas size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    /// Create a new size.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Errors from view construction.
#[derive(Debug, Error, PartialEq)]
pub enum ViewError {
    /// Neither a ladder, an extent, nor explicit min/max resolutions were
    /// supplied, so resolution bounds cannot be derived.
    #[error("view needs a resolutions ladder, an extent, or explicit min/max resolutions")]
    NoResolutionSource,

    /// The supplied resolutions ladder is empty or not strictly decreasing.
    #[error("resolutions ladder must be non-empty and strictly decreasing")]
    InvalidResolutions,
}

/// Tie-break direction for [`linear_find_nearest`].
///
/// The ladder is monotonically decreasing, so "floor" and "ceil" are stated
/// in terms of what the caller wants: a coarser (larger) or finer (smaller)
/// resolution than the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NearestDirection {
    /// Pick whichever neighbor is closest; ties go to the finer entry.
    Nearest,
    /// Round toward the coarser (larger) resolution.
    Coarser,
    /// Round toward the finer (smaller) resolution.
    Finer,
}

/// Find the index of the ladder entry nearest to `target`.
///
/// `ladder` must be monotonically decreasing (coarsest first). Values outside
/// the ladder clamp to the first or last index.
pub fn linear_find_nearest(ladder: &[f64], target: f64, direction: NearestDirection) -> usize {
    debug_assert!(!ladder.is_empty(), "ladder must not be empty");
    let n = ladder.len();
    if n == 0 || ladder[0] <= target {
        return 0;
    }
    if target <= ladder[n - 1] {
        return n - 1;
    }
    for i in 1..n {
        if ladder[i] == target {
            return i;
        }
        if ladder[i] < target {
            return match direction {
                NearestDirection::Coarser => i - 1,
                NearestDirection::Finer => i,
                NearestDirection::Nearest => {
                    if ladder[i - 1] - target < target - ladder[i] {
                        i - 1
                    } else {
                        i
                    }
                }
            };
        }
    }
    n - 1
}

/// Configuration for [`View::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewOptions {
    /// Initial center in world coordinates.
    pub center: Coordinate,
    /// Initial resolution; defaults to the derived maximum.
    pub resolution: Option<f64>,
    /// Initial fractional zoom; used only when `resolution` is absent.
    pub zoom: Option<f64>,
    /// Explicit resolution ladder, coarsest first.
    pub resolutions: Option<Vec<f64>>,
    /// Override for the derived maximum resolution.
    pub max_resolution: Option<f64>,
    /// Override for the derived minimum resolution.
    pub min_resolution: Option<f64>,
    /// Ratio between adjacent zoom levels when no ladder is present.
    pub zoom_factor: f64,
    /// Widens the legal resolution band beyond `[min, max]`.
    pub resolution_scale_constrain: f64,
    /// World extent used to derive bounds and optionally constrain the center.
    pub extent: Option<Extent>,
    /// When true and `extent` is set, `set_center` clamps into the extent.
    pub extent_constrain: bool,
    /// Canvas size in pixels.
    pub size: Size,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            center: [0.0, 0.0],
            resolution: None,
            zoom: None,
            resolutions: None,
            max_resolution: None,
            min_resolution: None,
            zoom_factor: DEFAULT_ZOOM_FACTOR,
            resolution_scale_constrain: 1.0,
            extent: None,
            extent_constrain: false,
            size: Size::new(1024.0, 768.0),
        }
    }
}

/// Per-frame state bundle produced once per render pass.
///
/// Collaborator layers thread this through every query instead of touching
/// the view directly, so a pass sees one consistent snapshot.
#[derive(Debug, Clone)]
pub struct FrameState {
    pub extent: Extent,
    pub size: Size,
    pub resolution: f64,
    pub center: Coordinate,
    pub coordinate_to_pixel_transform: Transform,
    pub pixel_to_coordinate_transform: Transform,
}

/// Viewport state machine over center and resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct View {
    center: Coordinate,
    resolution: f64,
    resolutions: Option<Vec<f64>>,
    max_resolution: f64,
    min_resolution: f64,
    zoom_factor: f64,
    scale_constrain: f64,
    constrain_extent: Option<Extent>,
    size: Size,
}

impl View {
    /// Build a view from options, deriving resolution bounds.
    ///
    /// Bounds come from the ladder's first/last entries when a ladder is
    /// given, otherwise from `extent` + canvas size + `zoom_factor` with a
    /// [`DEFAULT_ZOOM_LEVELS`]-step ladder, otherwise from explicit
    /// overrides. Explicit `max_resolution`/`min_resolution` always win.
    pub fn new(options: ViewOptions) -> Result<Self, ViewError> {
        if let Some(ladder) = &options.resolutions {
            if ladder.is_empty() || ladder.windows(2).any(|w| w[1] >= w[0]) {
                return Err(ViewError::InvalidResolutions);
            }
        }

        let (max_resolution, min_resolution) = if let Some(ladder) = &options.resolutions {
            (
                options.max_resolution.unwrap_or(ladder[0]),
                options.min_resolution.unwrap_or(ladder[ladder.len() - 1]),
            )
        } else if let Some(extent) = &options.extent {
            let fit = (extent.width() / options.size.width)
                .max(extent.height() / options.size.height);
            let max = options.max_resolution.unwrap_or(fit);
            let min = options
                .min_resolution
                .unwrap_or(max / options.zoom_factor.powi(DEFAULT_ZOOM_LEVELS as i32 - 1));
            (max, min)
        } else if let (Some(max), Some(min)) = (options.max_resolution, options.min_resolution) {
            (max, min)
        } else {
            return Err(ViewError::NoResolutionSource);
        };

        let constrain_extent = if options.extent_constrain {
            options.extent
        } else {
            None
        };

        let mut view = Self {
            center: options.center,
            resolution: max_resolution,
            resolutions: options.resolutions,
            max_resolution,
            min_resolution,
            zoom_factor: options.zoom_factor,
            scale_constrain: options.resolution_scale_constrain,
            constrain_extent,
            size: options.size,
        };

        let initial = match (options.resolution, options.zoom) {
            (Some(resolution), _) => resolution,
            (None, Some(zoom)) => view.resolution_for_zoom(zoom),
            (None, None) => max_resolution,
        };
        view.set_resolution(initial);
        Ok(view)
    }

    /// Current center in world coordinates.
    pub fn center(&self) -> Coordinate {
        self.center
    }

    /// Move the center, clamping into the constrain extent when configured.
    pub fn set_center(&mut self, center: Coordinate) {
        self.center = match &self.constrain_extent {
            Some(extent) => [
                center[0].clamp(extent.xmin, extent.xmax),
                center[1].clamp(extent.ymin, extent.ymax),
            ],
            None => center,
        };
    }

    /// Current resolution in world-units per pixel.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Canvas size in pixels.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Update the canvas size.
    pub fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    /// The legal resolution band `[lo, hi]`.
    fn resolution_bounds(&self) -> (f64, f64) {
        (
            self.min_resolution / self.scale_constrain / 2.0,
            self.max_resolution * self.scale_constrain,
        )
    }

    /// Clamp `resolution` into the legal band.
    pub fn constrain_resolution(&self, resolution: f64) -> f64 {
        let (lo, hi) = self.resolution_bounds();
        resolution.clamp(lo, hi)
    }

    /// Set the resolution, clamping into the legal band.
    ///
    /// Returns `true` when `resolution` was already in bounds. Zoom callers
    /// use the return value to decide whether to also recompute the center:
    /// a clamped zoom must not drift the anchor.
    pub fn set_resolution(&mut self, resolution: f64) -> bool {
        let constrained = self.constrain_resolution(resolution);
        let in_bounds = constrained == resolution;
        if !in_bounds {
            tracing::debug!(
                requested = resolution,
                constrained,
                "resolution clamped into legal band"
            );
        }
        self.resolution = constrained;
        in_bounds
    }

    /// The world extent currently covered by the canvas:
    /// `center ± resolution * size / 2` per axis.
    pub fn extent(&self) -> Extent {
        let half_w = self.resolution * self.size.width / 2.0;
        let half_h = self.resolution * self.size.height / 2.0;
        Extent::new(
            self.center[0] - half_w,
            self.center[1] - half_h,
            self.center[0] + half_w,
            self.center[1] + half_h,
        )
    }

    /// The center that keeps `anchor` at the same screen position after
    /// zooming to `resolution`.
    pub fn calculate_center_zoom(&self, resolution: f64, anchor: Coordinate) -> Coordinate {
        [
            anchor[0] - resolution * (anchor[0] - self.center[0]) / self.resolution,
            anchor[1] - resolution * (anchor[1] - self.center[1]) / self.resolution,
        ]
    }

    /// Current fractional zoom level.
    ///
    /// With a ladder, the integer part is the nearest coarser rung and the
    /// fraction is the log-ratio toward the next finer rung. Without one,
    /// `zoom = ln(max_resolution / resolution) / ln(zoom_factor)`.
    pub fn zoom(&self) -> f64 {
        match &self.resolutions {
            Some(ladder) => {
                let i = linear_find_nearest(ladder, self.resolution, NearestDirection::Coarser);
                let factor = if i + 1 < ladder.len() {
                    ladder[i] / ladder[i + 1]
                } else {
                    self.zoom_factor
                };
                i as f64 + (ladder[i] / self.resolution).ln() / factor.ln()
            }
            None => (self.max_resolution / self.resolution).ln() / self.zoom_factor.ln(),
        }
    }

    /// The resolution corresponding to fractional zoom `zoom`.
    pub fn resolution_for_zoom(&self, zoom: f64) -> f64 {
        match &self.resolutions {
            Some(ladder) => {
                let i = (zoom.floor().max(0.0) as usize).min(ladder.len() - 1);
                let factor = if i + 1 < ladder.len() {
                    ladder[i] / ladder[i + 1]
                } else {
                    self.zoom_factor
                };
                ladder[i] / factor.powf(zoom - i as f64)
            }
            None => self.max_resolution / self.zoom_factor.powf(zoom),
        }
    }

    /// Set the view to fractional zoom `zoom` (clamped like any resolution).
    pub fn set_zoom(&mut self, zoom: f64) -> bool {
        let resolution = self.resolution_for_zoom(zoom);
        self.set_resolution(resolution)
    }

    /// Fit `extent` into a canvas of `size`: resolution becomes
    /// `max(width / size.width, height / size.height)` and the center moves
    /// to the extent's center. Also adopts `size` as the canvas size.
    pub fn fit(&mut self, extent: &Extent, size: Size) {
        self.size = size;
        self.set_resolution((extent.width() / size.width).max(extent.height() / size.height));
        self.set_center(extent.center());
    }

    /// Snapshot the view into a [`FrameState`] for one render pass.
    pub fn calculate_frame_state(&self) -> FrameState {
        let mut coordinate_to_pixel = Transform::identity();
        coordinate_to_pixel.compose(
            self.size.width / 2.0,
            self.size.height / 2.0,
            1.0 / self.resolution,
            1.0 / self.resolution,
            0.0,
            -self.center[0],
            -self.center[1],
        );
        let mut pixel_to_coordinate = Transform::identity();
        pixel_to_coordinate.compose(
            self.center[0],
            self.center[1],
            self.resolution,
            self.resolution,
            0.0,
            -self.size.width / 2.0,
            -self.size.height / 2.0,
        );
        FrameState {
            extent: self.extent(),
            size: self.size,
            resolution: self.resolution,
            center: self.center,
            coordinate_to_pixel_transform: coordinate_to_pixel,
            pixel_to_coordinate_transform: pixel_to_coordinate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder_view() -> View {
        View::new(ViewOptions {
            center: [100.0, 100.0],
            resolutions: Some(vec![8.0, 4.0, 2.0, 1.0]),
            ..Default::default()
        })
        .expect("ladder view should build")
    }

    #[test]
    fn test_bounds_from_ladder_first_and_last() {
        let view = ladder_view();
        // scale_constrain = 1: band is [min / 2, max]
        assert_eq!(view.constrain_resolution(100.0), 8.0);
        assert_eq!(view.constrain_resolution(0.01), 0.5);
        assert_eq!(view.constrain_resolution(3.0), 3.0);
    }

    #[test]
    fn test_bounds_from_extent_and_default_ladder() {
        let view = View::new(ViewOptions {
            extent: Some(Extent::new(0.0, 0.0, 2048.0, 2048.0)),
            size: Size::new(256.0, 256.0),
            ..Default::default()
        })
        .expect("extent view should build");
        // max = 2048 / 256 = 8; min = max / 2^(5-1) = 0.5
        assert_eq!(view.resolution(), 8.0);
        assert_eq!(view.constrain_resolution(100.0), 8.0);
        assert_eq!(view.constrain_resolution(0.0), 0.25); // min / 2
    }

    #[test]
    fn test_missing_resolution_source_fails() {
        let err = View::new(ViewOptions::default()).unwrap_err();
        assert_eq!(err, ViewError::NoResolutionSource);
    }

    #[test]
    fn test_non_decreasing_ladder_rejected() {
        let err = View::new(ViewOptions {
            resolutions: Some(vec![4.0, 4.0, 2.0]),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, ViewError::InvalidResolutions);
    }

    #[test]
    fn test_set_resolution_reports_in_bounds() {
        let mut view = ladder_view();
        assert!(view.set_resolution(3.0), "3.0 is inside [0.5, 8]");
        assert_eq!(view.resolution(), 3.0);
        assert!(!view.set_resolution(20.0), "20.0 must clamp");
        assert_eq!(view.resolution(), 8.0);
        assert!(!view.set_resolution(0.1));
        assert_eq!(view.resolution(), 0.5);
    }

    #[test]
    fn test_set_resolution_idempotent_for_clamped_value() {
        let mut view = ladder_view();
        view.set_resolution(2.0);
        let center = view.center();
        let resolution = view.resolution();
        assert!(view.set_resolution(2.0));
        assert_eq!(view.center(), center);
        assert_eq!(view.resolution(), resolution);
    }

    #[test]
    fn test_extent_from_center_resolution_size() {
        let mut view = ladder_view();
        view.set_size(Size::new(100.0, 50.0));
        view.set_resolution(2.0);
        let extent = view.extent();
        assert_eq!(extent, Extent::new(0.0, 50.0, 200.0, 150.0));
    }

    #[test]
    fn test_calculate_center_zoom_preserves_anchor() {
        let mut view = ladder_view();
        view.set_resolution(4.0);
        let anchor = [150.0, 80.0];

        // Anchor's screen offset before the zoom
        let before = view.calculate_frame_state();
        let screen_before = before.coordinate_to_pixel_transform.apply(anchor);

        let new_resolution = 2.0;
        let new_center = view.calculate_center_zoom(new_resolution, anchor);
        view.set_resolution(new_resolution);
        view.set_center(new_center);

        let after = view.calculate_frame_state();
        let screen_after = after.coordinate_to_pixel_transform.apply(anchor);

        assert!(
            (screen_before[0] - screen_after[0]).abs() < 1e-9
                && (screen_before[1] - screen_after[1]).abs() < 1e-9,
            "anchor moved on screen: {:?} vs {:?}",
            screen_before,
            screen_after
        );
    }

    #[test]
    fn test_zoom_round_trip_with_ladder() {
        let mut view = ladder_view();
        for z in [0.0, 0.5, 1.0, 1.5, 2.0, 3.0] {
            view.set_zoom(z);
            assert!(
                (view.zoom() - z).abs() < 1e-9,
                "zoom {} round tripped to {}",
                z,
                view.zoom()
            );
        }
    }

    #[test]
    fn test_zoom_without_ladder_uses_log_formula() {
        let mut view = View::new(ViewOptions {
            max_resolution: Some(16.0),
            min_resolution: Some(1.0),
            ..Default::default()
        })
        .expect("explicit-bounds view should build");
        view.set_resolution(4.0);
        // zoom = ln(16 / 4) / ln(2) = 2
        assert!((view.zoom() - 2.0).abs() < 1e-12);
        view.set_zoom(3.0);
        assert_eq!(view.resolution(), 2.0);
    }

    #[test]
    fn test_fit_extent_to_window() {
        let mut view = ladder_view();
        view.fit(
            &Extent::new(0.0, 0.0, 800.0, 400.0),
            Size::new(200.0, 200.0),
        );
        assert_eq!(view.resolution(), 4.0);
        assert_eq!(view.center(), [400.0, 200.0]);
    }

    #[test]
    fn test_set_center_clamps_into_constrain_extent() {
        let mut view = View::new(ViewOptions {
            resolutions: Some(vec![8.0, 4.0, 2.0, 1.0]),
            extent: Some(Extent::new(0.0, 0.0, 1000.0, 1000.0)),
            extent_constrain: true,
            ..Default::default()
        })
        .expect("constrained view should build");
        view.set_center([-50.0, 1200.0]);
        assert_eq!(view.center(), [0.0, 1000.0]);
        view.set_center([500.0, 500.0]);
        assert_eq!(view.center(), [500.0, 500.0]);
    }

    #[test]
    fn test_frame_state_transforms_are_inverses() {
        let mut view = ladder_view();
        view.set_resolution(2.0);
        let state = view.calculate_frame_state();
        // Center maps to the canvas midpoint
        let center_px = state.coordinate_to_pixel_transform.apply(view.center());
        assert_eq!(center_px, [512.0, 384.0]);
        // Round trip an arbitrary world point
        let world = [123.0, -456.0];
        let back = state
            .pixel_to_coordinate_transform
            .apply(state.coordinate_to_pixel_transform.apply(world));
        assert!((back[0] - world[0]).abs() < 1e-9 && (back[1] - world[1]).abs() < 1e-9);
    }

    #[test]
    fn test_linear_find_nearest_directions() {
        let ladder = [8.0, 4.0, 2.0, 1.0];
        // Exact hits
        assert_eq!(linear_find_nearest(&ladder, 4.0, NearestDirection::Nearest), 1);
        // Clamping at both ends
        assert_eq!(linear_find_nearest(&ladder, 100.0, NearestDirection::Nearest), 0);
        assert_eq!(linear_find_nearest(&ladder, 0.5, NearestDirection::Nearest), 3);
        // Between 4 and 2: coarser picks index 1, finer picks index 2
        assert_eq!(linear_find_nearest(&ladder, 3.0, NearestDirection::Coarser), 1);
        assert_eq!(linear_find_nearest(&ladder, 3.0, NearestDirection::Finer), 2);
        // Nearest: 3.9 is closer to 4 than to 2
        assert_eq!(linear_find_nearest(&ladder, 3.9, NearestDirection::Nearest), 1);
        assert_eq!(linear_find_nearest(&ladder, 2.1, NearestDirection::Nearest), 2);
        // Equidistant (3.0): ties go to the finer entry
        assert_eq!(linear_find_nearest(&ladder, 3.0, NearestDirection::Nearest), 2);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_set_resolution_always_lands_in_band(r in 0.0..1000.0_f64) {
                let mut view = ladder_view();
                view.set_resolution(r);
                let got = view.resolution();
                prop_assert!((0.5..=8.0).contains(&got), "resolution {} outside band", got);
            }

            #[test]
            fn test_zoom_resolution_round_trip(z in 0.0..3.0_f64) {
                let view = ladder_view();
                let r = view.resolution_for_zoom(z);
                let mut v = ladder_view();
                v.set_resolution(r);
                prop_assert!((v.zoom() - z).abs() < 1e-9, "zoom {} became {}", z, v.zoom());
            }

            #[test]
            fn test_center_zoom_formula_anchor_invariant(
                cx in -1e3..1e3_f64,
                cy in -1e3..1e3_f64,
                ax in -1e3..1e3_f64,
                ay in -1e3..1e3_f64,
                new_res in 0.5..8.0_f64,
            ) {
                let mut view = ladder_view();
                view.set_center([cx, cy]);
                view.set_resolution(4.0);
                // World offset of the anchor, in pixels, must be unchanged
                let before = [(ax - cx) / 4.0, (ay - cy) / 4.0];
                let center = view.calculate_center_zoom(new_res, [ax, ay]);
                let after = [(ax - center[0]) / new_res, (ay - center[1]) / new_res];
                prop_assert!((before[0] - after[0]).abs() < 1e-6);
                prop_assert!((before[1] - after[1]).abs() < 1e-6);
            }
        }
    }
}
