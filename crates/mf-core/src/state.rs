//! Domain records: filter state, observations, estimates, forecasts,
//! anomalies, and calibration reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mf_common::{Error, EstimateId, PersistedState, Result, SCHEMA_VERSION};
use mf_config::FilterParams;
use mf_math::Mat2;

/// In-memory filter state for one (user, metric) key.
///
/// `kalman_gain` and `signal_to_noise_ratio` are carried from the last
/// processed observation so read-only callers can report them without
/// re-running the filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricState {
    /// State vector [level, trend].
    pub state: [f64; 2],
    /// State covariance.
    pub covariance: Mat2,
    /// Gain from the last update.
    pub kalman_gain: [f64; 2],
    /// Heuristic estimate-reliability ratio from the last update.
    pub signal_to_noise_ratio: f64,
    /// Timestamp of the newest observation folded in.
    pub last_updated_at: DateTime<Utc>,
}

impl MetricState {
    /// Fresh state for a key's first observation: level seeded from the
    /// observed value, zero trend, wide prior covariance.
    pub fn wide_prior(level: f64, params: &FilterParams, at: DateTime<Utc>) -> Self {
        Self {
            state: [level, 0.0],
            covariance: Mat2::diagonal(
                params.initial_level_variance,
                params.initial_trend_variance,
            ),
            kalman_gain: [0.0, 0.0],
            signal_to_noise_ratio: 0.0,
            last_updated_at: at,
        }
    }

    pub fn level(&self) -> f64 {
        self.state[0]
    }

    pub fn trend(&self) -> f64 {
        self.state[1]
    }

    /// Convert to the wire shape the store persists.
    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            schema_version: SCHEMA_VERSION.to_string(),
            state_vector: self.state,
            covariance_matrix: self.covariance.m,
            kalman_gain: self.kalman_gain,
            signal_to_noise_ratio: self.signal_to_noise_ratio,
            last_updated_at: self.last_updated_at,
        }
    }

    /// Rebuild from a persisted record. Must be exact: a reloaded state runs
    /// the next predict step with the same numbers as a live one.
    pub fn from_persisted(record: &PersistedState) -> Self {
        Self {
            state: record.state_vector,
            covariance: Mat2 {
                m: record.covariance_matrix,
            },
            kalman_gain: record.kalman_gain,
            signal_to_noise_ratio: record.signal_to_noise_ratio,
            last_updated_at: record.last_updated_at,
        }
    }
}

/// One timestamped measurement of the metric from some source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Observed value.
    pub value: f64,
    /// Source identifier (e.g., "billing_export", "manual_entry").
    pub source: String,
    /// Source confidence in (0, 1]; lower confidence widens the effective
    /// measurement noise.
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

impl Observation {
    /// Reject unusable observations before any state is touched.
    pub fn validate(&self) -> Result<()> {
        if !self.value.is_finite() {
            return Err(Error::InvalidObservation {
                source_name: self.source.clone(),
                reason: format!("non-finite value {}", self.value),
            });
        }
        if !self.confidence.is_finite() || self.confidence <= 0.0 || self.confidence > 1.0 {
            return Err(Error::InvalidObservation {
                source_name: self.source.clone(),
                reason: format!("confidence {} outside (0, 1]", self.confidence),
            });
        }
        Ok(())
    }
}

/// A symmetric confidence interval around the estimated level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    pub fn around(center: f64, half_width: f64) -> Self {
        Self {
            lower: center - half_width,
            upper: center + half_width,
        }
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Snapshot produced once per processed batch of observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub id: EstimateId,
    pub estimated_value: f64,
    pub trend: f64,
    pub confidence_interval_95: ConfidenceInterval,
    pub confidence_interval_68: ConfidenceInterval,
    /// Innovation from the last observation in the batch.
    pub innovation: f64,
    /// Gain from the last observation in the batch.
    pub kalman_gain: [f64; 2],
    pub signal_to_noise_ratio: f64,
    /// Bounded reliability score in [0, 1), monotone in SNR.
    pub data_quality_score: f64,
    /// Observations folded into this estimate.
    pub observation_count: usize,
    pub computed_at: DateTime<Utc>,
}

/// One forecast step. `day` is 1-indexed distance from the posterior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub day: u32,
    pub predicted_value: f64,
    pub lower_95: f64,
    pub upper_95: f64,
    /// Decays linearly with horizon distance, floor-clamped; never reported
    /// as fully unreliable nor fully certain.
    pub model_confidence: f64,
}

/// Anomaly classification for one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    MeasurementOutlier,
    SevereOutlier,
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnomalyKind::MeasurementOutlier => write!(f, "measurement_outlier"),
            AnomalyKind::SevereOutlier => write!(f, "severe_outlier"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// An observation whose innovation was too large for the predicted
/// uncertainty, attached to the observation that triggered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub severity: Severity,
    /// Innovation in units of predicted standard deviation.
    pub sigma: f64,
    /// Raw innovation (observed minus predicted).
    pub innovation: f64,
    pub observed_value: f64,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

/// Qualitative tuning guidance from the calibration analyzer. Turning these
/// into prose is the narrator's job, not ours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TuningGuidance {
    /// Innovation statistics look consistent with the configured noise.
    WellTuned,
    /// Innovation variance is high relative to R: Q is too small (the model
    /// under-reacts) or R is mis-specified.
    ProcessNoiseTooLow,
    /// Near-zero innovation variance with persistently one-signed
    /// innovations: the model is systematically biased.
    SystematicBias,
}

impl std::fmt::Display for TuningGuidance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TuningGuidance::WellTuned => write!(f, "well_tuned"),
            TuningGuidance::ProcessNoiseTooLow => write!(f, "process_noise_too_low"),
            TuningGuidance::SystematicBias => write!(f, "systematic_bias"),
        }
    }
}

/// Raw statistics over a window of historical estimates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub sample_size: usize,
    pub mean_innovation: f64,
    pub innovation_variance: f64,
    pub guidance: TuningGuidance,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn persisted_conversion_is_lossless() {
        let state = MetricState {
            state: [104553.5714, 44.6428],
            covariance: Mat2::new(910.7142, 8.9285, 8.9285, 109.1071),
            kalman_gain: [0.9107, 0.0089],
            signal_to_noise_ratio: 1.098,
            last_updated_at: ts(),
        };
        let back = MetricState::from_persisted(&state.to_persisted());
        assert_eq!(back, state);
    }

    #[test]
    fn wide_prior_seeds_level_and_covariance() {
        let params = FilterParams::default();
        let state = MetricState::wide_prior(100_000.0, &params, ts());
        assert_eq!(state.level(), 100_000.0);
        assert_eq!(state.trend(), 0.0);
        assert_eq!(state.covariance.m[0][0], params.initial_level_variance);
        assert_eq!(state.covariance.m[1][1], params.initial_trend_variance);
        assert_eq!(state.covariance.m[0][1], 0.0);
    }

    #[test]
    fn observation_validation_bounds_confidence() {
        let mut obs = Observation {
            value: 42.0,
            source: "billing".into(),
            confidence: 1.0,
            timestamp: ts(),
        };
        assert!(obs.validate().is_ok());

        obs.confidence = 0.0;
        assert!(obs.validate().is_err());
        obs.confidence = 1.5;
        assert!(obs.validate().is_err());
        obs.confidence = 0.5;
        obs.value = f64::NAN;
        assert!(obs.validate().is_err());
    }

    #[test]
    fn interval_helpers() {
        let ci = ConfidenceInterval::around(100.0, 5.0);
        assert_eq!(ci.lower, 95.0);
        assert_eq!(ci.upper, 105.0);
        assert_eq!(ci.width(), 10.0);
    }
}
