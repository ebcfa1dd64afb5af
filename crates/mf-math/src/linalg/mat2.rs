//! 2x2 matrix type for covariance propagation.

use serde::{Deserialize, Serialize};

use super::safe_recip;

/// A 2x2 matrix of f64, row-major.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mat2 {
    pub m: [[f64; 2]; 2],
}

impl Mat2 {
    pub fn new(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self { m: [[a, b], [c, d]] }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0)
    }

    /// Diagonal matrix `diag(a, d)`.
    pub fn diagonal(a: f64, d: f64) -> Self {
        Self::new(a, 0.0, 0.0, d)
    }

    pub fn mul(&self, other: &Mat2) -> Mat2 {
        Mat2::new(
            self.m[0][0] * other.m[0][0] + self.m[0][1] * other.m[1][0],
            self.m[0][0] * other.m[0][1] + self.m[0][1] * other.m[1][1],
            self.m[1][0] * other.m[0][0] + self.m[1][1] * other.m[1][0],
            self.m[1][0] * other.m[0][1] + self.m[1][1] * other.m[1][1],
        )
    }

    pub fn transpose(&self) -> Mat2 {
        Mat2::new(self.m[0][0], self.m[1][0], self.m[0][1], self.m[1][1])
    }

    pub fn add(&self, other: &Mat2) -> Mat2 {
        Mat2::new(
            self.m[0][0] + other.m[0][0],
            self.m[0][1] + other.m[0][1],
            self.m[1][0] + other.m[1][0],
            self.m[1][1] + other.m[1][1],
        )
    }

    pub fn sub(&self, other: &Mat2) -> Mat2 {
        Mat2::new(
            self.m[0][0] - other.m[0][0],
            self.m[0][1] - other.m[0][1],
            self.m[1][0] - other.m[1][0],
            self.m[1][1] - other.m[1][1],
        )
    }

    pub fn scale(&self, s: f64) -> Mat2 {
        Mat2::new(
            self.m[0][0] * s,
            self.m[0][1] * s,
            self.m[1][0] * s,
            self.m[1][1] * s,
        )
    }

    /// Matrix-vector product (2x2 times 2x1).
    pub fn mul_vec(&self, v: [f64; 2]) -> [f64; 2] {
        [
            self.m[0][0] * v[0] + self.m[0][1] * v[1],
            self.m[1][0] * v[0] + self.m[1][1] * v[1],
        ]
    }

    pub fn determinant(&self) -> f64 {
        self.m[0][0] * self.m[1][1] - self.m[0][1] * self.m[1][0]
    }

    /// Scalar-safe inverse.
    ///
    /// Returns `None` for a (near-)singular or non-finite matrix rather than
    /// producing an inverse full of garbage.
    pub fn inverse(&self, eps: f64) -> Option<Mat2> {
        if !self.is_finite() {
            return None;
        }
        let det_inv = safe_recip(self.determinant(), eps)?;
        Some(Mat2::new(
            self.m[1][1] * det_inv,
            -self.m[0][1] * det_inv,
            -self.m[1][0] * det_inv,
            self.m[0][0] * det_inv,
        ))
    }

    /// `(M + M^T) / 2`. Covariance matrices drift off symmetric after
    /// repeated predict/update cycles; this pulls them back.
    pub fn symmetrized(&self) -> Mat2 {
        let off = 0.5 * (self.m[0][1] + self.m[1][0]);
        Mat2::new(self.m[0][0], off, off, self.m[1][1])
    }

    pub fn diag(&self) -> [f64; 2] {
        [self.m[0][0], self.m[1][1]]
    }

    pub fn is_finite(&self) -> bool {
        self.m.iter().flatten().all(|v| v.is_finite())
    }

    /// Whether this is a usable covariance: finite, symmetric within `tol`,
    /// with non-negative diagonal entries.
    pub fn is_valid_covariance(&self, tol: f64) -> bool {
        self.is_finite()
            && (self.m[0][1] - self.m[1][0]).abs() <= tol
            && self.m[0][0] >= 0.0
            && self.m[1][1] >= 0.0
    }
}
