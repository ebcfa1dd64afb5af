//! Fixed-size (2x2, 2x1, 1x1) operations used by the estimator.
//!
//! The filter is deliberately non-generic: the state is always [level, trend],
//! so everything here is sized for the 2-state model and nothing more.

pub mod mat2;

/// Default near-zero threshold for scalar inversion.
///
/// Matches the innovation-covariance guard in the filter update: anything
/// with magnitude below this is treated as numerically singular.
pub const DEFAULT_EPS: f64 = 1e-10;

/// Scalar-safe reciprocal: the 1x1 inverse.
///
/// Returns `None` when `x` is non-finite or within `eps` of zero, so callers
/// must decide on a fallback instead of dividing by near-zero.
pub fn safe_recip(x: f64, eps: f64) -> Option<f64> {
    if !x.is_finite() || x.abs() < eps {
        None
    } else {
        Some(1.0 / x)
    }
}
