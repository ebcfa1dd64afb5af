//! Persisted-record schema and versioning.
//!
//! The filter state is stored one record per (user, metric) key. Loading a
//! persisted record and immediately running a predict step must reproduce
//! the same numbers as if the process had never stopped, so this type keeps
//! the exact field layout the store sees and nothing derived.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Current schema version for all persisted records and JSON outputs.
///
/// Follows semver: MAJOR.MINOR.PATCH
/// - MAJOR: Breaking changes (field removals, type changes)
/// - MINOR: Additive changes (new optional fields)
/// - PATCH: Bug fixes, documentation
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Check if a schema version is compatible with current.
pub fn is_compatible(version: &str) -> bool {
    let current_major = SCHEMA_VERSION
        .split('.')
        .next()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(0);

    let other_major = version
        .split('.')
        .next()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(0);

    current_major == other_major
}

/// Wire shape of one persisted filter state record.
///
/// `state_vector` is `[level, trend]`; `covariance_matrix` is the 2x2 state
/// covariance in row-major order. `kalman_gain` and `signal_to_noise_ratio`
/// are the values from the last processed observation, kept so a read-only
/// `get_state` call can report them without re-running the filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PersistedState {
    pub schema_version: String,
    pub state_vector: [f64; 2],
    pub covariance_matrix: [[f64; 2]; 2],
    pub kalman_gain: [f64; 2],
    pub signal_to_noise_ratio: f64,
    pub last_updated_at: DateTime<Utc>,
}
