//! Forecast generation: roll the model forward with no further measurements.
//!
//! Each step is a plain predict with no update, so the covariance grows by Q
//! every day and the 95% band widens accordingly. Model confidence decays
//! linearly with horizon distance and is floor-clamped; the far future is
//! reported as neither fully unreliable nor fully certain.

use mf_config::{FilterParams, ForecastParams};
use mf_math::Mat2;

use crate::filter;
use crate::state::Forecast;

/// Generate exactly `horizon` forecast records from a posterior `(x, P)`.
pub fn generate(
    state: [f64; 2],
    covariance: &Mat2,
    horizon: u32,
    forecast: &ForecastParams,
    filter_params: &FilterParams,
) -> Vec<Forecast> {
    let mut out = Vec::with_capacity(horizon as usize);
    let mut x = state;
    let mut p = *covariance;

    for day in 1..=horizon {
        let pred = filter::predict(x, &p, filter_params);
        x = pred.state;
        p = pred.covariance;

        let half_width = 1.96 * p.m[0][0].max(0.0).sqrt();
        let model_confidence =
            (1.0 - forecast.confidence_decay * day as f64).max(forecast.confidence_floor);

        out.push(Forecast {
            day,
            predicted_value: x[0],
            lower_95: x[0] - half_width,
            upper_95: x[0] + half_width,
            model_confidence,
        });
    }

    out
}
