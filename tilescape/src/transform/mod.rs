//! 2D affine transforms between world and pixel space.
//!
//! A [`Transform`] holds the six coefficients `[a, b, c, d, e, f]` of the
//! matrix
//!
//! ```text
//! | a c e |
//! | b d f |
//! | 0 0 1 |
//! ```
//!
//! mapping `(x, y)` to `(a*x + c*y + e, b*x + d*y + f)`. Composing operations
//! mutate in place and return `&mut Self`, so a render pass can thread one
//! transform through a chain of placements without allocating. The transform
//! is owned by whichever object last composed into it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extent::Coordinate;

/// Errors from transform operations.
#[derive(Debug, Error, PartialEq)]
pub enum TransformError {
    /// The matrix has zero determinant and cannot be inverted.
    #[error("transform is singular (determinant is 0)")]
    SingularMatrix,
}

/// A 2D affine transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Create a transform from its six coefficients.
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Overwrite all six coefficients in place.
    pub fn set(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> &mut Self {
        self.a = a;
        self.b = b;
        self.c = c;
        self.d = d;
        self.e = e;
        self.f = f;
        self
    }

    /// The coefficients as `[a, b, c, d, e, f]`.
    pub fn coefficients(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    /// Compose `other` into this transform: `self = self ∘ other`.
    ///
    /// Applying the result maps a point through `other` first, then through
    /// the previous value of `self`.
    pub fn multiply(&mut self, other: &Transform) -> &mut Self {
        let Transform { a, b, c, d, e, f } = *self;
        self.a = a * other.a + c * other.b;
        self.b = b * other.a + d * other.b;
        self.c = a * other.c + c * other.d;
        self.d = b * other.c + d * other.d;
        self.e = a * other.e + c * other.f + e;
        self.f = b * other.e + d * other.f + f;
        self
    }

    /// Map a point through this transform.
    pub fn apply(&self, point: Coordinate) -> Coordinate {
        let [x, y] = point;
        [
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        ]
    }

    /// Map a point through this transform, rounding each component to
    /// `decimals` decimal places.
    ///
    /// Renderers round to whole or half pixels to keep tile seams crisp.
    pub fn apply_rounded(&self, point: Coordinate, decimals: u32) -> Coordinate {
        let factor = 10f64.powi(decimals as i32);
        let [x, y] = self.apply(point);
        [(x * factor).round() / factor, (y * factor).round() / factor]
    }

    /// Post-compose a rotation by `angle` radians.
    pub fn rotate(&mut self, angle: f64) -> &mut Self {
        let (sin, cos) = angle.sin_cos();
        self.multiply(&Transform::new(cos, sin, -sin, cos, 0.0, 0.0))
    }

    /// Post-compose an anisotropic scale.
    pub fn scale(&mut self, sx: f64, sy: f64) -> &mut Self {
        self.multiply(&Transform::new(sx, 0.0, 0.0, sy, 0.0, 0.0))
    }

    /// Post-compose a skew by `ax`/`ay` radians along each axis.
    pub fn skew(&mut self, ax: f64, ay: f64) -> &mut Self {
        self.multiply(&Transform::new(1.0, ay.tan(), ax.tan(), 1.0, 0.0, 0.0))
    }

    /// Post-compose a translation.
    pub fn translate(&mut self, dx: f64, dy: f64) -> &mut Self {
        self.multiply(&Transform::new(1.0, 0.0, 0.0, 1.0, dx, dy))
    }

    /// Set this transform to translate ∘ rotate ∘ scale ∘ translate-back in
    /// one call.
    ///
    /// Places content at target origin `(dx1, dy1)` with the given scale and
    /// rotation, reading source coordinates relative to `(dx2, dy2)`. This is
    /// the single-call placement used for tiles and vector objects.
    #[allow(clippy::too_many_arguments)]
    pub fn compose(
        &mut self,
        dx1: f64,
        dy1: f64,
        sx: f64,
        sy: f64,
        angle: f64,
        dx2: f64,
        dy2: f64,
    ) -> &mut Self {
        let (sin, cos) = angle.sin_cos();
        self.a = sx * cos;
        self.b = sx * sin;
        self.c = -sy * sin;
        self.d = sy * cos;
        self.e = dx2 * sx * cos - dy2 * sy * sin + dx1;
        self.f = dx2 * sx * sin + dy2 * sy * cos + dy1;
        self
    }

    /// The determinant `a*d - c*b`.
    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.c * self.b
    }

    /// Replace this transform with its inverse.
    ///
    /// Fails with [`TransformError::SingularMatrix`] when the determinant is
    /// zero; the transform is left unchanged in that case.
    pub fn invert(&mut self) -> Result<&mut Self, TransformError> {
        let det = self.determinant();
        if det == 0.0 {
            return Err(TransformError::SingularMatrix);
        }
        let Transform { a, b, c, d, e, f } = *self;
        self.a = d / det;
        self.b = -b / det;
        self.c = -c / det;
        self.d = a / det;
        self.e = (c * f - d * e) / det;
        self.f = (b * e - a * f) / det;
        Ok(self)
    }

    /// The uniform scale factor `sqrt(|determinant|)`.
    pub fn get_scale(&self) -> f64 {
        self.determinant().abs().sqrt()
    }

    /// The rotation angle `atan2(b, d)` in radians.
    pub fn rotation_angle(&self) -> f64 {
        self.b.atan2(self.d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn assert_close(actual: Coordinate, expected: Coordinate) {
        assert!(
            (actual[0] - expected[0]).abs() < 1e-9 && (actual[1] - expected[1]).abs() < 1e-9,
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn test_identity_maps_point_to_itself() {
        let t = Transform::identity();
        assert_eq!(t.apply([3.0, -7.0]), [3.0, -7.0]);
    }

    #[test]
    fn test_translate_then_apply() {
        let mut t = Transform::identity();
        t.translate(10.0, 20.0);
        assert_close(t.apply([1.0, 2.0]), [11.0, 22.0]);
    }

    #[test]
    fn test_scale_then_apply() {
        let mut t = Transform::identity();
        t.scale(2.0, 3.0);
        assert_close(t.apply([1.0, 1.0]), [2.0, 3.0]);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let mut t = Transform::identity();
        t.rotate(FRAC_PI_2);
        // y-down world: a quarter turn maps +x onto +y
        assert_close(t.apply([1.0, 0.0]), [0.0, 1.0]);
    }

    #[test]
    fn test_multiply_applies_right_operand_first() {
        // self = translate, other = scale: point goes through scale first
        let mut t = Transform::identity();
        t.translate(100.0, 0.0);
        let mut s = Transform::identity();
        s.scale(2.0, 2.0);
        t.multiply(&s);
        assert_close(t.apply([3.0, 4.0]), [106.0, 8.0]);
    }

    #[test]
    fn test_skew_uses_tangents() {
        let mut t = Transform::identity();
        t.skew(PI / 4.0, 0.0);
        // tan(45 deg) = 1, so x picks up y
        assert_close(t.apply([0.0, 1.0]), [1.0, 1.0]);
    }

    #[test]
    fn test_invert_round_trips_points() {
        let mut t = Transform::identity();
        t.translate(5.0, -3.0).rotate(0.7).scale(2.0, 0.5);
        let forward = t;
        t.invert().expect("transform should be invertible");
        let p = forward.apply([12.0, 34.0]);
        assert_close(t.apply(p), [12.0, 34.0]);
    }

    #[test]
    fn test_invert_singular_fails_and_preserves_state() {
        let mut t = Transform::new(0.0, 0.0, 0.0, 0.0, 5.0, 6.0);
        let before = t;
        assert_eq!(t.invert().unwrap_err(), TransformError::SingularMatrix);
        assert_eq!(t, before, "failed invert must leave the transform intact");
    }

    #[test]
    fn test_compose_matches_explicit_chain() {
        // Non-uniform scale pins the operand order of the closed form
        let mut composed = Transform::identity();
        composed.compose(50.0, 60.0, 2.0, 0.5, 0.3, -10.0, -20.0);

        let mut chained = Transform::identity();
        chained
            .translate(50.0, 60.0)
            .rotate(0.3)
            .scale(2.0, 0.5)
            .translate(-10.0, -20.0);

        for p in [[0.0, 0.0], [1.0, 0.0], [7.0, -3.0]] {
            assert_close(composed.apply(p), chained.apply(p));
        }
    }

    #[test]
    fn test_apply_rounded() {
        let mut t = Transform::identity();
        t.translate(0.123456, 0.98765);
        assert_eq!(t.apply_rounded([0.0, 0.0], 2), [0.12, 0.99]);
        assert_eq!(t.apply_rounded([0.0, 0.0], 0), [0.0, 1.0]);
    }

    #[test]
    fn test_determinant_scale_and_rotation_accessors() {
        let mut t = Transform::identity();
        t.rotate(0.5).scale(3.0, 3.0);
        assert!((t.determinant() - 9.0).abs() < 1e-9);
        assert!((t.get_scale() - 3.0).abs() < 1e-9);
        assert!((t.rotation_angle() - 0.5).abs() < 1e-9);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_invert_round_trip_property(
                dx in -1e4..1e4_f64,
                dy in -1e4..1e4_f64,
                angle in -PI..PI,
                s in 0.01..100.0_f64,
                px in -1e3..1e3_f64,
                py in -1e3..1e3_f64,
            ) {
                let mut t = Transform::identity();
                t.translate(dx, dy).rotate(angle).scale(s, s);
                let forward = t;
                prop_assert!(t.invert().is_ok());
                let [x, y] = t.apply(forward.apply([px, py]));
                prop_assert!((x - px).abs() < 1e-6, "x round trip failed: {} vs {}", x, px);
                prop_assert!((y - py).abs() < 1e-6, "y round trip failed: {} vs {}", y, py);
            }

            #[test]
            fn test_get_scale_of_uniform_scale(
                s in 0.01..1000.0_f64,
                angle in -PI..PI,
            ) {
                let mut t = Transform::identity();
                t.rotate(angle).scale(s, s);
                prop_assert!((t.get_scale() - s).abs() < 1e-6);
            }
        }
    }
}
