//! Error types for Metricflow.

use thiserror::Error;

/// Result type alias for Metricflow operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Metricflow.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("dimensionally inconsistent {matrix} matrix: expected {expected}, got {actual}")]
    MatrixShape {
        matrix: String,
        expected: String,
        actual: String,
    },

    // Observation errors (20-29)
    #[error("invalid observation from source '{source_name}': {reason}")]
    InvalidObservation { source_name: String, reason: String },

    #[error("empty observation batch for key {key}")]
    EmptyBatch { key: String },

    // Numerical errors (30-39)
    //
    // Near-singular innovation covariance is NOT represented here: that case
    // is recovered locally with the K = 0 fallback and never surfaces as an
    // error. This variant covers genuinely non-finite inputs.
    #[error("numerical instability for key {key}: {detail} (scalar = {scalar})")]
    NumericalInstability {
        key: String,
        detail: String,
        scalar: f64,
    },

    // Calibration errors (40-49)
    #[error("insufficient data for calibration: need {required} estimates, have {actual}")]
    InsufficientData { required: usize, actual: usize },

    // Persistence errors (50-59)
    #[error("persistence conflict for key {key}: expected version {expected_version}, found {actual_version}")]
    PersistenceConflict {
        key: String,
        expected_version: u64,
        actual_version: u64,
    },

    #[error("no state found for key {key}")]
    StateNotFound { key: String },

    #[error("persistence failure: {0}")]
    Persistence(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    /// Used for detailed error reporting in JSON output.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::MatrixShape { .. } => 11,
            Error::InvalidObservation { .. } => 20,
            Error::EmptyBatch { .. } => 21,
            Error::NumericalInstability { .. } => 30,
            Error::InsufficientData { .. } => 40,
            Error::PersistenceConflict { .. } => 50,
            Error::StateNotFound { .. } => 51,
            Error::Persistence(_) => 52,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Whether the caller should retry with a fresh read of the state record.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::PersistenceConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_grouped_by_family() {
        let conflict = Error::PersistenceConflict {
            key: "u1:revenue".into(),
            expected_version: 3,
            actual_version: 4,
        };
        assert_eq!(conflict.code(), 50);
        assert!(conflict.is_retryable());

        let gate = Error::InsufficientData {
            required: 10,
            actual: 9,
        };
        assert_eq!(gate.code(), 40);
        assert!(!gate.is_retryable());
    }

    #[test]
    fn conflict_message_names_both_versions() {
        let err = Error::PersistenceConflict {
            key: "u1:revenue".into(),
            expected_version: 1,
            actual_version: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("expected version 1"));
        assert!(msg.contains("found 2"));
    }
}
