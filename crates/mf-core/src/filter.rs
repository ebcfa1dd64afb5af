//! Local linear trend Kalman filter.
//!
//! State is `x = [level, trend]` with fixed transition `F = [[1,1],[0,1]]`
//! (the level accumulates the trend each step) and observation `H = [1, 0]`
//! (only the level is observed). `predict` and `update` are pure functions:
//! the mutable `(x, P)` pair is threaded explicitly and all tunables come in
//! through an immutable [`FilterParams`].
//!
//! Batches fold sequentially, predict → update per observation, because each
//! update's posterior is the next predict's prior. This chain is never
//! parallelized within one metric key.

use mf_config::FilterParams;
use mf_math::{safe_recip, Mat2, DEFAULT_EPS};

/// Prior produced by a predict step.
#[derive(Debug, Clone, Copy)]
pub struct Prediction {
    pub state: [f64; 2],
    pub covariance: Mat2,
}

/// Posterior produced by an update step.
#[derive(Debug, Clone, Copy)]
pub struct UpdateOutcome {
    pub state: [f64; 2],
    pub covariance: Mat2,
    /// Observed value minus predicted level.
    pub innovation: f64,
    pub gain: [f64; 2],
    /// Innovation covariance S, kept for observability.
    pub innovation_covariance: f64,
    /// Near-singular S: the K = 0 fallback was taken and the observation
    /// left the estimate unchanged.
    pub degenerate: bool,
    /// The posterior covariance went numerically bad and was reset to the
    /// wide prior.
    pub covariance_reset: bool,
}

fn transition() -> Mat2 {
    Mat2::new(1.0, 1.0, 0.0, 1.0)
}

/// Predict one step ahead: `x' = F·x`, `P' = F·P·Fᵗ + Q`.
///
/// Always succeeds for finite inputs; the covariance is re-symmetrized so
/// repeated cycles cannot drift it off symmetric.
pub fn predict(state: [f64; 2], covariance: &Mat2, params: &FilterParams) -> Prediction {
    let f = transition();
    let q = Mat2 {
        m: params.process_noise,
    };
    Prediction {
        state: f.mul_vec(state),
        covariance: f.mul(covariance).mul(&f.transpose()).add(&q).symmetrized(),
    }
}

/// Fold one observation into a predicted prior.
///
/// `confidence` scales the effective measurement noise (`R_eff = R / c`), so
/// low-confidence sources pull less. When `|S|` is below the singularity
/// threshold the update degrades to `K = 0` instead of dividing by
/// near-zero; when the posterior covariance comes out non-finite or with a
/// negative diagonal it is reset to the wide prior instead of propagating
/// garbage. Both fallbacks are flagged on the outcome.
///
/// For finite `R_eff > 0` the posterior covariance diagonal never exceeds
/// the prior's, and `gain[0]` stays within [0, 1].
pub fn update(
    observed: f64,
    confidence: f64,
    pred: &Prediction,
    params: &FilterParams,
) -> UpdateOutcome {
    let innovation = observed - pred.state[0];
    let r_eff = params.measurement_noise / confidence;
    let s = pred.covariance.m[0][0] + r_eff;

    let s_inv = match safe_recip(s, DEFAULT_EPS) {
        Some(v) => v,
        None => {
            return UpdateOutcome {
                state: pred.state,
                covariance: pred.covariance,
                innovation,
                gain: [0.0, 0.0],
                innovation_covariance: s,
                degenerate: true,
                covariance_reset: false,
            };
        }
    };

    // K = P'·Hᵗ / S
    let gain = [
        pred.covariance.m[0][0] * s_inv,
        pred.covariance.m[1][0] * s_inv,
    ];

    let state = [
        pred.state[0] + gain[0] * innovation,
        pred.state[1] + gain[1] * innovation,
    ];

    // P = (I - K·H)·P'
    let kh = Mat2::new(gain[0], 0.0, gain[1], 0.0);
    let mut covariance = Mat2::identity()
        .sub(&kh)
        .mul(&pred.covariance)
        .symmetrized();

    let mut covariance_reset = false;
    if !covariance.is_valid_covariance(1e-6) {
        covariance = Mat2::diagonal(params.initial_level_variance, params.initial_trend_variance);
        covariance_reset = true;
    }

    UpdateOutcome {
        state,
        covariance,
        innovation,
        gain,
        innovation_covariance: s,
        degenerate: false,
        covariance_reset,
    }
}

/// Heuristic signal-to-noise ratio: measurement noise relative to posterior
/// level variance. Converged filters (small level variance) score high.
pub fn signal_to_noise(params: &FilterParams, level_variance: f64) -> f64 {
    params.measurement_noise / level_variance.max(1e-12)
}

/// Bounded reliability score in [0, 1), monotone in SNR.
pub fn data_quality_score(snr: f64) -> f64 {
    let snr = snr.max(0.0);
    snr / (1.0 + snr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> FilterParams {
        FilterParams::default()
    }

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    // Worked single-observation example: x = [100000, 0],
    // P = diag(10000, 100), Q = diag(100, 10), R = 1000, z = 105000 at
    // confidence 1. Expected numbers computed by hand.
    #[test]
    fn single_observation_reference_values() {
        let p = FilterParams {
            process_noise: [[100.0, 0.0], [0.0, 10.0]],
            measurement_noise: 1000.0,
            ..params()
        };
        let covariance = Mat2::diagonal(10_000.0, 100.0);

        let pred = predict([100_000.0, 0.0], &covariance, &p);
        assert_eq!(pred.state, [100_000.0, 0.0]);
        assert!(approx(pred.covariance.m[0][0], 10_200.0, 1e-9));
        assert!(approx(pred.covariance.m[0][1], 100.0, 1e-9));
        assert!(approx(pred.covariance.m[1][0], 100.0, 1e-9));
        assert!(approx(pred.covariance.m[1][1], 110.0, 1e-9));

        let out = update(105_000.0, 1.0, &pred, &p);
        assert!(approx(out.innovation, 5000.0, 1e-9));
        assert!(approx(out.innovation_covariance, 11_200.0, 1e-9));
        assert!(approx(out.gain[0], 0.910_714, 1e-2));
        assert!(approx(out.gain[1], 0.008_929, 1e-2));
        assert!(approx(out.state[0], 104_553.57, 1e-2));
        assert!(approx(out.state[1], 44.64, 1e-2));
        assert!(approx(out.covariance.m[0][0], 910.714, 1e-2));
        assert!(approx(out.covariance.m[0][1], 8.929, 1e-2));
        assert!(approx(out.covariance.m[1][0], 8.929, 1e-2));
        assert!(approx(out.covariance.m[1][1], 109.107, 1e-2));
        assert!(!out.degenerate);
        assert!(!out.covariance_reset);
    }

    #[test]
    fn measurement_never_increases_uncertainty() {
        let p = params();
        let pred = predict([500.0, 2.0], &Mat2::diagonal(5_000.0, 50.0), &p);
        let out = update(480.0, 0.7, &pred, &p);
        assert!(out.covariance.m[0][0] <= pred.covariance.m[0][0]);
        assert!(out.covariance.m[1][1] <= pred.covariance.m[1][1]);
    }

    #[test]
    fn low_confidence_pulls_less() {
        let p = params();
        let prior = Mat2::diagonal(10_000.0, 100.0);
        let pred = predict([100.0, 0.0], &prior, &p);

        let trusted = update(200.0, 1.0, &pred, &p);
        let doubted = update(200.0, 0.1, &pred, &p);
        assert!(trusted.gain[0] > doubted.gain[0]);
        assert!((trusted.state[0] - 100.0).abs() > (doubted.state[0] - 100.0).abs());
    }

    #[test]
    fn near_singular_s_falls_back_to_zero_gain() {
        // Force S under the threshold: zero prior level variance plus an
        // effectively-zero R cannot happen through validated config, so
        // build the degenerate prior directly.
        let mut p = params();
        p.measurement_noise = 1e-30;
        let pred = Prediction {
            state: [100.0, 1.0],
            covariance: Mat2::diagonal(0.0, 10.0),
        };
        let out = update(150.0, 1.0, &pred, &p);
        assert!(out.degenerate);
        assert_eq!(out.gain, [0.0, 0.0]);
        assert_eq!(out.state, pred.state);
        assert_eq!(out.covariance, pred.covariance);
        // The surprise is still reported even though it was ignored.
        assert!(approx(out.innovation, 50.0, 1e-12));
    }

    #[test]
    fn non_finite_posterior_resets_to_wide_prior() {
        let p = params();
        let pred = Prediction {
            state: [100.0, 0.0],
            covariance: Mat2::new(f64::INFINITY, 0.0, 0.0, 100.0),
        };
        let out = update(105.0, 1.0, &pred, &p);
        assert!(out.covariance_reset);
        assert_eq!(out.covariance.m[0][0], p.initial_level_variance);
        assert_eq!(out.covariance.m[1][1], p.initial_trend_variance);
    }

    #[test]
    fn predict_accumulates_trend_into_level() {
        let p = params();
        let pred = predict([100.0, 7.0], &Mat2::diagonal(10.0, 1.0), &p);
        assert_eq!(pred.state, [107.0, 7.0]);
    }

    #[test]
    fn data_quality_is_bounded_and_monotone() {
        assert_eq!(data_quality_score(0.0), 0.0);
        let low = data_quality_score(0.5);
        let high = data_quality_score(50.0);
        assert!(low < high);
        assert!(high < 1.0);
        assert_eq!(data_quality_score(-3.0), 0.0);
    }
}
