//! Metricflow linear algebra kernel.

pub mod linalg;

pub use linalg::mat2::Mat2;
pub use linalg::{safe_recip, DEFAULT_EPS};
