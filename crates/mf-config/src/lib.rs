//! Metricflow engine configuration.
//!
//! This crate provides:
//! - Typed structs for the filter, anomaly, forecast, and calibration knobs
//! - JSON file loading
//! - Fail-fast semantic validation (bad configuration is rejected before any
//!   state is touched)

pub mod params;
pub mod validate;

pub use params::{
    AnomalyThresholds, CalibrationParams, EngineConfig, FilterParams, ForecastParams,
};
pub use validate::validate;
