//! The current transformation matrix: a 3×2 affine, row-major as
//! `m[0][0] m[0][1] m[1][0] m[1][1] m[2][0] m[2][1]` (spec.md §4.4).

use serde_derive::{Deserialize, Serialize};

/// A 3×2 affine transform. `Raw` holds an arbitrary matrix (e.g. one
/// produced by `apply_transform`/`set_transform`); the named variants are
/// the canvas-API helpers (`identity`, `translate`, `scale`, `rotate`).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "type", content = "data")]
pub enum Transform {
    Translate(f32, f32),
    /// Counter-clockwise rotation, in radians.
    Rotate(f32),
    Scale(f32, f32),
    Raw([f32; 6]),
    Identity,
}

impl Default for Transform {
    fn default() -> Self {
        Transform::Identity
    }
}

impl Transform {
    pub fn as_array(&self) -> [f32; 6] {
        use Transform::*;
        match self {
            Translate(x, y) => [1.0, 0.0, 0.0, 1.0, *x, *y],
            Rotate(rad) => [rad.cos(), rad.sin(), -rad.sin(), rad.cos(), 0.0, 0.0],
            Scale(x, y) => [*x, 0.0, 0.0, *y, 0.0, 0.0],
            Raw(r) => *r,
            Identity => [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        }
    }

    /// Post-multiplies this transform by `other`: applying the result to a
    /// point is equivalent to applying `self` first, then `other`.
    pub fn apply_transform(&self, other: &Transform) -> Transform {
        Transform::Raw(Self::combine_matrix(self.as_array(), other.as_array()))
    }

    /// Applies the transform to a point (includes translation).
    pub fn apply_to_point(&self, x: f32, y: f32) -> (f32, f32) {
        let m = self.as_array();
        (mul_add(m[0], x, mul_add(m[2], y, m[4])), mul_add(m[1], x, mul_add(m[3], y, m[5])))
    }

    /// Applies the linear part only — drops the translation components, so
    /// a vector transforms the way a distance/direction should (spec.md
    /// §4.4: "`user_to_device_distance`... applies the linear part only").
    pub fn apply_to_distance(&self, dx: f32, dy: f32) -> (f32, f32) {
        let m = self.as_array();
        (mul_add(m[0], dx, m[2] * dy), mul_add(m[1], dx, m[3] * dy))
    }

    /// Analytic inverse of the 3×2 affine. A determinant in `(-1e-7, 1e-7)`
    /// yields the identity-adjacent zero matrix — defensive, so subsequent
    /// transforms behave as no-ops rather than blowing up on division by a
    /// near-zero determinant (spec.md §4.4).
    pub fn invert(&self) -> Transform {
        let m = self.as_array();
        let det = m[0] * m[3] - m[1] * m[2];
        if det > -1e-7 && det < 1e-7 {
            return Transform::Raw([0.0; 6]);
        }
        let inv_det = 1.0 / det;
        let a = m[3] * inv_det;
        let b = -m[1] * inv_det;
        let c = -m[2] * inv_det;
        let d = m[0] * inv_det;
        let e = -(m[4] * a + m[5] * c);
        let f = -(m[4] * b + m[5] * d);
        Transform::Raw([a, b, c, d, e, f])
    }

    /// Combines two 3×2 affines by embedding them in 4×4 matrices, per the
    /// teacher's technique for avoiding hand-writing the 2×2-block math
    /// twice.
    pub fn combine_matrix(a: [f32; 6], b: [f32; 6]) -> [f32; 6] {
        let a = [
            [a[0], a[1], 0.0, 0.0],
            [a[2], a[3], 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [a[4], a[5], 0.0, 1.0],
        ];

        let b = [
            [b[0], b[1], 0.0, 0.0],
            [b[2], b[3], 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [b[4], b[5], 0.0, 1.0],
        ];

        let result = [
            [
                mul_add(a[0][0], b[0][0], mul_add(a[0][1], b[1][0], mul_add(a[0][2], b[2][0], a[0][3] * b[3][0]))),
                mul_add(a[0][0], b[0][1], mul_add(a[0][1], b[1][1], mul_add(a[0][2], b[2][1], a[0][3] * b[3][1]))),
                mul_add(a[0][0], b[0][2], mul_add(a[0][1], b[1][2], mul_add(a[0][2], b[2][2], a[0][3] * b[3][2]))),
                mul_add(a[0][0], b[0][3], mul_add(a[0][1], b[1][3], mul_add(a[0][2], b[2][3], a[0][3] * b[3][3]))),
            ],
            [
                mul_add(a[1][0], b[0][0], mul_add(a[1][1], b[1][0], mul_add(a[1][2], b[2][0], a[1][3] * b[3][0]))),
                mul_add(a[1][0], b[0][1], mul_add(a[1][1], b[1][1], mul_add(a[1][2], b[2][1], a[1][3] * b[3][1]))),
                mul_add(a[1][0], b[0][2], mul_add(a[1][1], b[1][2], mul_add(a[1][2], b[2][2], a[1][3] * b[3][2]))),
                mul_add(a[1][0], b[0][3], mul_add(a[1][1], b[1][3], mul_add(a[1][2], b[2][3], a[1][3] * b[3][3]))),
            ],
            [
                mul_add(a[2][0], b[0][0], mul_add(a[2][1], b[1][0], mul_add(a[2][2], b[2][0], a[2][3] * b[3][0]))),
                mul_add(a[2][0], b[0][1], mul_add(a[2][1], b[1][1], mul_add(a[2][2], b[2][1], a[2][3] * b[3][1]))),
                mul_add(a[2][0], b[0][2], mul_add(a[2][1], b[1][2], mul_add(a[2][2], b[2][2], a[2][3] * b[3][2]))),
                mul_add(a[2][0], b[0][3], mul_add(a[2][1], b[1][3], mul_add(a[2][2], b[2][3], a[2][3] * b[3][3]))),
            ],
            [
                mul_add(a[3][0], b[0][0], mul_add(a[3][1], b[1][0], mul_add(a[3][2], b[2][0], a[3][3] * b[3][0]))),
                mul_add(a[3][0], b[0][1], mul_add(a[3][1], b[1][1], mul_add(a[3][2], b[2][1], a[3][3] * b[3][1]))),
                mul_add(a[3][0], b[0][2], mul_add(a[3][1], b[1][2], mul_add(a[3][2], b[2][2], a[3][3] * b[3][2]))),
                mul_add(a[3][0], b[0][3], mul_add(a[3][1], b[1][3], mul_add(a[3][2], b[2][3], a[3][3] * b[3][3]))),
            ],
        ];

        [result[0][0], result[0][1], result[1][0], result[1][1], result[3][0], result[3][1]]
    }
}

/// Multiply-add. Computes `(a * b) + c` with a workaround for
/// arm-unknown-linux-gnueabi, where `{f32, f64}::mul_add` is broken
/// (rust-lang/rust#46950).
#[inline(always)]
fn mul_add(a: f32, b: f32, c: f32) -> f32 {
    if cfg!(all(target_arch = "arm", target_os = "linux", target_env = "gnu")) {
        (a * b) + c
    } else {
        a.mul_add(b, c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_helpers_match_their_array_form() {
        assert_eq!(Transform::Translate(150.0, 50.0).as_array(), [1.0, 0.0, 0.0, 1.0, 150.0, 50.0]);
        assert_eq!(Transform::Scale(2.0, 4.0).as_array(), [2.0, 0.0, 0.0, 4.0, 0.0, 0.0]);
        assert_eq!(Transform::Identity.as_array(), [1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn invert_undoes_translate_and_scale() {
        let t = Transform::Raw(Transform::combine_matrix(
            Transform::Scale(2.0, 4.0).as_array(),
            Transform::Translate(10.0, 20.0).as_array(),
        ));
        let inv = t.invert();
        let (x, y) = t.apply_to_point(3.0, 5.0);
        let (x2, y2) = inv.apply_to_point(x, y);
        assert!((x2 - 3.0).abs() < 1e-4);
        assert!((y2 - 5.0).abs() < 1e-4);
    }

    #[test]
    fn near_singular_determinant_yields_zero_matrix() {
        let degenerate = Transform::Raw([1.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
        assert_eq!(degenerate.invert().as_array(), [0.0; 6]);
    }

    #[test]
    fn distance_drops_translation() {
        let t = Transform::Translate(100.0, 200.0);
        assert_eq!(t.apply_to_distance(3.0, 5.0), (3.0, 5.0));
    }
}
