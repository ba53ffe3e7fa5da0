//! 4x4 texture-coordinate transforms.
//!
//! Matrices are stored column-major, the layout `glUniformMatrix4fv` expects
//! with `transpose = GL_FALSE` and the layout camera producers hand out
//! (e.g. `SurfaceTexture.getTransformMatrix`). They transform texture
//! coordinates, not vertex positions.

use std::ops::Mul;

/// A column-major 4x4 float matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformMatrix([f32; 16]);

impl TransformMatrix {
    pub const IDENTITY: Self = Self([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0, //
    ]);

    /// Vertical flip combined with a mirror, applied when copying a camera
    /// texture (top-left origin) into a GL texture (bottom-left origin).
    pub const CAMERA_FLIP: Self = Self([
        0.0, -1.0, 0.0, 0.0, //
        -1.0, 0.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        1.0, 1.0, 0.0, 1.0, //
    ]);

    pub const fn from_cols_array(values: [f32; 16]) -> Self {
        Self(values)
    }

    pub fn as_array(&self) -> &[f32; 16] {
        &self.0
    }

    /// Element at `row`, `col`.
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.0[col * 4 + row]
    }

    /// Rotation by `quarter_turns * 90°` counter-clockwise around the texture
    /// centre `(0.5, 0.5)`. Negative values rotate clockwise.
    pub fn rotation(quarter_turns: i32) -> Self {
        let (sin, cos) = match quarter_turns.rem_euclid(4) {
            0 => return Self::IDENTITY,
            1 => (1.0, 0.0),
            2 => (0.0, -1.0),
            _ => (-1.0, 0.0),
        };
        Self::translation(0.5, 0.5)
            * Self([
                cos, sin, 0.0, 0.0, //
                -sin, cos, 0.0, 0.0, //
                0.0, 0.0, 1.0, 0.0, //
                0.0, 0.0, 0.0, 1.0, //
            ])
            * Self::translation(-0.5, -0.5)
    }

    /// Horizontal mirror around `u = 0.5`.
    pub fn mirror_horizontal() -> Self {
        Self([
            -1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            1.0, 0.0, 0.0, 1.0, //
        ])
    }

    pub fn translation(x: f32, y: f32) -> Self {
        let mut m = Self::IDENTITY;
        m.0[12] = x;
        m.0[13] = y;
        m
    }

    /// Apply to a texture coordinate.
    pub fn transform_point(&self, u: f32, v: f32) -> (f32, f32) {
        let x = self.get(0, 0) * u + self.get(0, 1) * v + self.get(0, 3);
        let y = self.get(1, 0) * u + self.get(1, 1) * v + self.get(1, 3);
        (x, y)
    }
}

impl Default for TransformMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<[f32; 16]> for TransformMatrix {
    fn from(values: [f32; 16]) -> Self {
        Self(values)
    }
}

impl From<TransformMatrix> for [f32; 16] {
    fn from(m: TransformMatrix) -> Self {
        m.0
    }
}

impl Mul for TransformMatrix {
    type Output = TransformMatrix;

    fn mul(self, rhs: TransformMatrix) -> TransformMatrix {
        let mut out = [0.0; 16];
        for col in 0..4 {
            for row in 0..4 {
                out[col * 4 + row] = (0..4).map(|k| self.get(row, k) * rhs.get(k, col)).sum();
            }
        }
        TransformMatrix(out)
    }
}
