//! Metricflow core: per-metric state estimation and forecasting.
//!
//! The engine ingests noisy, multi-source observations of a business metric
//! and maintains a running [level, trend] estimate with a local linear trend
//! Kalman filter. Around the numerical core sit an innovation-based anomaly
//! detector, a decaying-confidence forecaster, a noise-calibration analyzer,
//! and the [`service::EstimationService`] entry point that orchestrates them
//! over optimistically-versioned persisted state.
//!
//! Rendering, identity, and narrative generation are external collaborators;
//! nothing in this crate blocks on I/O beyond the [`store::StateStore`]
//! calls made by the service.

pub mod anomaly;
pub mod calibrate;
pub mod filter;
pub mod forecast;
pub mod service;
pub mod state;
pub mod store;

pub use service::{EstimateResponse, EstimationService, StateSnapshot};
pub use state::{
    Anomaly, AnomalyKind, CalibrationReport, ConfidenceInterval, Estimate, Forecast, MetricState,
    Observation, Severity, TuningGuidance,
};
pub use store::{CommitRequest, MemoryStore, StateRecord, StateStore};
