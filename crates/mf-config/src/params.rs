//! Engine parameter types.
//!
//! The defaults here are the tuned values the engine ships with. The anomaly
//! thresholds and forecast decay are heuristics, not derived bounds, which is
//! exactly why they live in configuration instead of being hard-coded in the
//! detector and forecaster.

use serde::{Deserialize, Serialize};
use std::path::Path;

use mf_common::Result;

/// Kalman filter noise parameters for the local linear trend model.
///
/// The transition and observation matrices are fixed by the model
/// (`F = [[1,1],[0,1]]`, `H = [1,0]`); only the noise terms are tunable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    /// Process noise covariance Q (2x2, row-major).
    pub process_noise: [[f64; 2]; 2],
    /// Measurement noise variance R (the 1x1 observation model).
    pub measurement_noise: f64,
    /// Wide-prior level variance used when a key is first seen, and as the
    /// reset target if covariance goes numerically bad.
    pub initial_level_variance: f64,
    /// Wide-prior trend variance.
    pub initial_trend_variance: f64,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            process_noise: [[100.0, 0.0], [0.0, 10.0]],
            measurement_noise: 1000.0,
            initial_level_variance: 1.0e6,
            initial_trend_variance: 1.0e4,
        }
    }
}

/// Innovation-based anomaly classification thresholds, in standard deviations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyThresholds {
    /// Above this (exclusive), an observation is a measurement outlier.
    pub outlier_sigma: f64,
    /// Above this (exclusive), it is a severe outlier.
    pub severe_sigma: f64,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            outlier_sigma: 2.5,
            severe_sigma: 4.0,
        }
    }
}

/// Forecast horizon and confidence decay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastParams {
    /// Horizon (days) used when the caller does not specify one.
    pub default_horizon: u32,
    /// Per-step linear decay of model confidence.
    pub confidence_decay: f64,
    /// Floor for model confidence; far-future steps are never reported as
    /// less reliable than this.
    pub confidence_floor: f64,
}

impl Default for ForecastParams {
    fn default() -> Self {
        Self {
            default_horizon: 30,
            confidence_decay: 0.02,
            confidence_floor: 0.5,
        }
    }
}

/// Calibration analysis window and guidance thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParams {
    /// Minimum number of historical estimates required for a report.
    pub min_samples: usize,
    /// Innovation variance above `inflation_factor * R` suggests the filter
    /// is under-reacting (Q too small or R mis-specified).
    pub variance_inflation_factor: f64,
    /// Innovation variance below `deflation_factor * R` counts as near-zero
    /// for bias detection.
    pub variance_deflation_factor: f64,
    /// Fraction of same-signed innovations that counts as persistently
    /// one-signed.
    pub sign_agreement: f64,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            min_samples: 10,
            variance_inflation_factor: 2.0,
            variance_deflation_factor: 0.1,
            sign_agreement: 0.9,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub filter: FilterParams,
    #[serde(default)]
    pub anomaly: AnomalyThresholds,
    #[serde(default)]
    pub forecast: ForecastParams,
    #[serde(default)]
    pub calibration: CalibrationParams,
    /// How many times the service re-reads and retries after a persistence
    /// version conflict before surfacing it.
    #[serde(default = "default_max_commit_retries")]
    pub max_commit_retries: u32,
}

fn default_max_commit_retries() -> u32 {
    3
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            filter: FilterParams::default(),
            anomaly: AnomalyThresholds::default(),
            forecast: ForecastParams::default(),
            calibration: CalibrationParams::default(),
            max_commit_retries: default_max_commit_retries(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&raw)?;
        crate::validate::validate(&config)?;
        Ok(config)
    }
}
