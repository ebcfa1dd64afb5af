//! Semantic validation of engine configuration.
//!
//! Malformed noise matrices or threshold orderings are configuration
//! failures: they are rejected here, before the estimator touches any
//! persisted state.

use mf_common::{Error, Result};

use crate::params::EngineConfig;

/// Validate a complete engine configuration. Fails fast on the first problem
/// with enough structured detail to reproduce it in a test.
pub fn validate(config: &EngineConfig) -> Result<()> {
    validate_filter(config)?;
    validate_anomaly(config)?;
    validate_forecast(config)?;
    validate_calibration(config)?;
    Ok(())
}

fn validate_filter(config: &EngineConfig) -> Result<()> {
    let f = &config.filter;

    let q = &f.process_noise;
    if q.iter().flatten().any(|v| !v.is_finite()) {
        return Err(Error::MatrixShape {
            matrix: "Q".into(),
            expected: "finite 2x2".into(),
            actual: format!("{q:?}"),
        });
    }
    if q[0][1] != q[1][0] {
        return Err(Error::MatrixShape {
            matrix: "Q".into(),
            expected: "symmetric".into(),
            actual: format!("q01 = {}, q10 = {}", q[0][1], q[1][0]),
        });
    }
    if q[0][0] < 0.0 || q[1][1] < 0.0 {
        return Err(Error::Config(format!(
            "process noise diagonal must be non-negative, got [{}, {}]",
            q[0][0], q[1][1]
        )));
    }

    if !f.measurement_noise.is_finite() || f.measurement_noise <= 0.0 {
        return Err(Error::Config(format!(
            "measurement noise R must be finite and > 0, got {}",
            f.measurement_noise
        )));
    }

    for (name, v) in [
        ("initial_level_variance", f.initial_level_variance),
        ("initial_trend_variance", f.initial_trend_variance),
    ] {
        if !v.is_finite() || v <= 0.0 {
            return Err(Error::Config(format!(
                "{name} must be finite and > 0, got {v}"
            )));
        }
    }

    Ok(())
}

fn validate_anomaly(config: &EngineConfig) -> Result<()> {
    let a = &config.anomaly;
    if !a.outlier_sigma.is_finite() || a.outlier_sigma <= 0.0 {
        return Err(Error::Config(format!(
            "outlier_sigma must be finite and > 0, got {}",
            a.outlier_sigma
        )));
    }
    if !a.severe_sigma.is_finite() || a.severe_sigma <= a.outlier_sigma {
        return Err(Error::Config(format!(
            "severe_sigma ({}) must exceed outlier_sigma ({})",
            a.severe_sigma, a.outlier_sigma
        )));
    }
    Ok(())
}

fn validate_forecast(config: &EngineConfig) -> Result<()> {
    let f = &config.forecast;
    if f.default_horizon == 0 {
        return Err(Error::Config("default_horizon must be >= 1".into()));
    }
    if !f.confidence_decay.is_finite() || !(0.0..1.0).contains(&f.confidence_decay) {
        return Err(Error::Config(format!(
            "confidence_decay must be in [0, 1), got {}",
            f.confidence_decay
        )));
    }
    if !f.confidence_floor.is_finite() || !(0.0..=1.0).contains(&f.confidence_floor) {
        return Err(Error::Config(format!(
            "confidence_floor must be in [0, 1], got {}",
            f.confidence_floor
        )));
    }
    Ok(())
}

fn validate_calibration(config: &EngineConfig) -> Result<()> {
    let c = &config.calibration;
    if c.min_samples < 2 {
        return Err(Error::Config(format!(
            "calibration min_samples must be >= 2, got {}",
            c.min_samples
        )));
    }
    if c.variance_inflation_factor <= c.variance_deflation_factor {
        return Err(Error::Config(format!(
            "variance_inflation_factor ({}) must exceed variance_deflation_factor ({})",
            c.variance_inflation_factor, c.variance_deflation_factor
        )));
    }
    if !(0.5..=1.0).contains(&c.sign_agreement) {
        return Err(Error::Config(format!(
            "sign_agreement must be in [0.5, 1], got {}",
            c.sign_agreement
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::EngineConfig;

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn asymmetric_q_is_a_shape_error() {
        let mut config = EngineConfig::default();
        config.filter.process_noise = [[100.0, 1.0], [2.0, 10.0]];
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, Error::MatrixShape { .. }));
        assert_eq!(err.code(), 11);
    }

    #[test]
    fn non_positive_r_is_rejected() {
        let mut config = EngineConfig::default();
        config.filter.measurement_noise = 0.0;
        assert!(validate(&config).is_err());
        config.filter.measurement_noise = f64::NAN;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn threshold_ordering_is_enforced() {
        let mut config = EngineConfig::default();
        config.anomaly.severe_sigma = 2.0; // below outlier_sigma
        assert!(validate(&config).is_err());
    }

    #[test]
    fn decay_outside_unit_interval_is_rejected() {
        let mut config = EngineConfig::default();
        config.forecast.confidence_decay = 1.0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn tiny_calibration_window_is_rejected() {
        let mut config = EngineConfig::default();
        config.calibration.min_samples = 1;
        assert!(validate(&config).is_err());
    }
}
