//! Noise-calibration analysis over a window of historical estimates.
//!
//! The analyzer reports raw innovation statistics plus deterministic
//! qualitative guidance. A well-tuned filter produces innovations that are
//! roughly zero-mean with variance on the order of the measurement noise;
//! departures in either direction point at specific mis-tunings.

use mf_common::{Error, Result};
use mf_config::{CalibrationParams, FilterParams};

use crate::state::{CalibrationReport, Estimate, TuningGuidance};

/// Analyze a window of historical estimates.
///
/// Fewer than `min_samples` estimates is an error, not a best-effort guess:
/// no partial report is returned.
pub fn analyze(
    estimates: &[Estimate],
    calibration: &CalibrationParams,
    filter: &FilterParams,
) -> Result<CalibrationReport> {
    if estimates.len() < calibration.min_samples {
        return Err(Error::InsufficientData {
            required: calibration.min_samples,
            actual: estimates.len(),
        });
    }

    let n = estimates.len();
    let innovations: Vec<f64> = estimates.iter().map(|e| e.innovation).collect();

    let mean = innovations.iter().sum::<f64>() / n as f64;
    // Sample variance; n >= min_samples >= 2 so the divisor is safe.
    let variance =
        innovations.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0);

    let guidance = classify(&innovations, mean, variance, calibration, filter);

    Ok(CalibrationReport {
        sample_size: n,
        mean_innovation: mean,
        innovation_variance: variance,
        guidance,
    })
}

fn classify(
    innovations: &[f64],
    mean: f64,
    variance: f64,
    calibration: &CalibrationParams,
    filter: &FilterParams,
) -> TuningGuidance {
    let r = filter.measurement_noise;

    if variance > calibration.variance_inflation_factor * r {
        return TuningGuidance::ProcessNoiseTooLow;
    }

    if variance < calibration.variance_deflation_factor * r {
        let n = innovations.len() as f64;
        let positive = innovations.iter().filter(|v| **v > 0.0).count() as f64;
        let negative = innovations.iter().filter(|v| **v < 0.0).count() as f64;
        let dominant = positive.max(negative) / n;
        if dominant >= calibration.sign_agreement && mean != 0.0 {
            return TuningGuidance::SystematicBias;
        }
    }

    TuningGuidance::WellTuned
}
