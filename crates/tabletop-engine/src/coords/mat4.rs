use core::ops::Mul;

/// 4×4 `f32` matrix, column-major.
///
/// `cols[c][r]` is the entry in row `r` of column `c`. Every constructor and
/// operation returns a new value; nothing is mutated in place, so `a * b` never
/// aliases either operand.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat4 {
    pub cols: [[f32; 4]; 4],
}

impl Mat4 {
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    #[inline]
    pub const fn from_cols(cols: [[f32; 4]; 4]) -> Self {
        Self { cols }
    }

    /// Entry at (`row`, `col`) in conventional math notation.
    #[inline]
    pub fn at(&self, row: usize, col: usize) -> f32 {
        self.cols[col][row]
    }

    /// Translation by `(x, y, z)`.
    pub fn translation(x: f32, y: f32, z: f32) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[3] = [x, y, z, 1.0];
        m
    }

    /// Right-handed rotation about the +X axis.
    ///
    /// ```text
    /// | 1  0   0  0 |
    /// | 0  c  -s  0 |
    /// | 0  s   c  0 |
    /// | 0  0   0  1 |
    /// ```
    pub fn rotation_x(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        Self::from_cols([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, c, s, 0.0],
            [0.0, -s, c, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// GL-style right-handed perspective projection.
    ///
    /// `fov_y_degrees` is the full vertical field of view. Maps view-space depth
    /// `[-near, -far]` to NDC `[-1, 1]`; `w` receives `-z` (entry `cols[2][3] = -1`).
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let f = 1.0 / (fov_y_degrees.to_radians() / 2.0).tan();
        let range = far - near;

        Self::from_cols([
            [f / aspect, 0.0, 0.0, 0.0],
            [0.0, f, 0.0, 0.0],
            [0.0, 0.0, -(far + near) / range, -1.0],
            [0.0, 0.0, -(2.0 * far * near) / range, 0.0],
        ])
    }

    /// GL-style orthographic projection of the given view volume onto NDC.
    pub fn orthographic(
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let w = right - left;
        let h = top - bottom;
        let d = far - near;

        Self::from_cols([
            [2.0 / w, 0.0, 0.0, 0.0],
            [0.0, 2.0 / h, 0.0, 0.0],
            [0.0, 0.0, -2.0 / d, 0.0],
            [-(right + left) / w, -(top + bottom) / h, -(far + near) / d, 1.0],
        ])
    }

    /// Flattens to 16 floats in column-major order (uniform upload layout).
    #[inline]
    pub fn to_cols_array(&self) -> [f32; 16] {
        let mut out = [0.0; 16];
        for (c, col) in self.cols.iter().enumerate() {
            out[c * 4..c * 4 + 4].copy_from_slice(col);
        }
        out
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Mat4 {
    type Output = Mat4;

    /// Standard composition: `(self * rhs)` applies `rhs` first, then `self`.
    fn mul(self, rhs: Mat4) -> Mat4 {
        let mut out = [[0.0f32; 4]; 4];
        for (c, out_col) in out.iter_mut().enumerate() {
            for (r, cell) in out_col.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.cols[k][r] * rhs.cols[c][k]).sum();
            }
        }
        Mat4::from_cols(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() <= EPS
    }

    fn assert_mat_approx(a: &Mat4, b: &Mat4) {
        for c in 0..4 {
            for r in 0..4 {
                assert!(
                    approx(a.cols[c][r], b.cols[c][r]),
                    "mismatch at row {r} col {c}: {} vs {}",
                    a.cols[c][r],
                    b.cols[c][r]
                );
            }
        }
    }

    fn apply(m: &Mat4, p: [f32; 4]) -> [f32; 4] {
        let mut out = [0.0; 4];
        for (r, o) in out.iter_mut().enumerate() {
            *o = (0..4).map(|k| m.at(r, k) * p[k]).sum();
        }
        out
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn identity_times_anything_is_unchanged() {
        let t = Mat4::translation(1.0, 2.0, 3.0);
        assert_eq!(Mat4::IDENTITY * t, t);
        assert_eq!(t * Mat4::IDENTITY, t);
    }

    #[test]
    fn translation_moves_points_not_directions() {
        let t = Mat4::translation(0.0, 0.0, -2.5);
        assert_eq!(apply(&t, [1.0, 2.0, 0.0, 1.0]), [1.0, 2.0, -2.5, 1.0]);
        assert_eq!(apply(&t, [1.0, 2.0, 0.0, 0.0]), [1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn rotation_x_is_right_handed() {
        // +90° about X takes +Y to +Z.
        let r = Mat4::rotation_x(90f32.to_radians());
        let p = apply(&r, [0.0, 1.0, 0.0, 1.0]);
        assert!(approx(p[0], 0.0) && approx(p[1], 0.0) && approx(p[2], 1.0));
        assert!(approx(r.at(1, 2), -1.0));
        assert!(approx(r.at(2, 1), 1.0));
    }

    // ── perspective ───────────────────────────────────────────────────────

    #[test]
    fn perspective_45_square_aspect_entries() {
        let p = Mat4::perspective(45.0, 1.0, 1.0, 10.0);
        let cot = 1.0 / 22.5f32.to_radians().tan();

        assert!(approx(p.cols[1][1], cot));
        assert!(approx(p.cols[1][1], 2.4142137));
        assert!(approx(p.cols[0][0], cot));
        assert_eq!(p.cols[2][3], -1.0);
        assert!(approx(p.cols[2][2], -11.0 / 9.0));
        assert!(approx(p.cols[3][2], -20.0 / 9.0));
        assert_eq!(p.cols[3][3], 0.0);
    }

    #[test]
    fn perspective_divides_x_scale_by_aspect() {
        let p = Mat4::perspective(45.0, 2.0, 1.0, 10.0);
        assert!(approx(p.cols[0][0] * 2.0, p.cols[1][1]));
    }

    #[test]
    fn perspective_maps_near_and_far_planes_to_ndc_bounds() {
        let p = Mat4::perspective(45.0, 1.0, 1.0, 10.0);
        let near = apply(&p, [0.0, 0.0, -1.0, 1.0]);
        let far = apply(&p, [0.0, 0.0, -10.0, 1.0]);
        assert!(approx(near[2] / near[3], -1.0));
        assert!(approx(far[2] / far[3], 1.0));
    }

    // ── orthographic ──────────────────────────────────────────────────────

    #[test]
    fn orthographic_maps_volume_corners_to_unit_cube() {
        let o = Mat4::orthographic(-2.0, 2.0, -1.0, 1.0, -1.0, 1.0);
        assert_eq!(apply(&o, [2.0, 1.0, 0.0, 1.0]), [1.0, 1.0, 0.0, 1.0]);
        assert_eq!(apply(&o, [-2.0, -1.0, 0.0, 1.0]), [-1.0, -1.0, 0.0, 1.0]);
    }

    // ── composition ───────────────────────────────────────────────────────

    #[test]
    fn multiply_applies_right_operand_first() {
        let t = Mat4::translation(0.0, 0.0, -2.5);
        let r = Mat4::rotation_x(90f32.to_radians());

        // R·T: translate then rotate; the pushed-back origin swings onto -Y.
        let p = apply(&(r * t), [0.0, 0.0, 0.0, 1.0]);
        assert!(approx(p[1], 2.5) && approx(p[2], 0.0));

        // T·R: rotate in place then translate; origin ends at z = -2.5.
        let q = apply(&(t * r), [0.0, 0.0, 0.0, 1.0]);
        assert!(approx(q[1], 0.0) && approx(q[2], -2.5));
    }

    #[test]
    fn multiply_matches_row_by_column_formula() {
        let a = Mat4::perspective(45.0, 1.5, 1.0, 10.0);
        let b = Mat4::rotation_x(30f32.to_radians()) * Mat4::translation(0.0, 0.0, -2.5);
        let ab = a * b;
        for row in 0..4 {
            for col in 0..4 {
                let expected: f32 = (0..4).map(|k| a.at(row, k) * b.at(k, col)).sum();
                assert!(approx(ab.at(row, col), expected));
            }
        }
    }

    #[test]
    fn multiply_is_associative_within_tolerance() {
        let a = Mat4::perspective(45.0, 1.0, 1.0, 10.0);
        let b = Mat4::translation(0.0, 0.0, -2.5);
        let c = Mat4::rotation_x(-60f32.to_radians());
        assert_mat_approx(&((a * b) * c), &(a * (b * c)));
    }

    #[test]
    fn cols_array_is_column_major() {
        let t = Mat4::translation(4.0, 5.0, 6.0);
        let flat = t.to_cols_array();
        assert_eq!(&flat[12..15], &[4.0, 5.0, 6.0]);
        assert_eq!(flat[15], 1.0);
        assert_eq!(flat[3], 0.0);
    }
}
