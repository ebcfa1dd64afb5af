//! Innovation-based anomaly classification.
//!
//! Each update's innovation is compared against the uncertainty the filter
//! predicted for it: `normalized = |innovation| / sqrt(P_pred[0][0])`. The
//! thresholds are tuned heuristics and come in through configuration.

use mf_config::AnomalyThresholds;

use crate::state::{AnomalyKind, Severity};

/// Classification of a single innovation, before observation context is
/// attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub kind: AnomalyKind,
    pub severity: Severity,
    /// Innovation in predicted standard deviations.
    pub sigma: f64,
}

/// Classify one innovation against the predicted level variance.
///
/// Returns `None` for unremarkable innovations, and also when the predicted
/// variance is non-positive or non-finite (nothing meaningful to normalize
/// against). The boundary is exclusive: exactly `outlier_sigma` standard
/// deviations is not flagged.
pub fn classify(
    innovation: f64,
    predicted_level_variance: f64,
    thresholds: &AnomalyThresholds,
) -> Option<Classification> {
    if !predicted_level_variance.is_finite() || predicted_level_variance <= 0.0 {
        return None;
    }
    if !innovation.is_finite() {
        return None;
    }

    let sigma = innovation.abs() / predicted_level_variance.sqrt();
    if sigma <= thresholds.outlier_sigma {
        None
    } else if sigma <= thresholds.severe_sigma {
        Some(Classification {
            kind: AnomalyKind::MeasurementOutlier,
            severity: Severity::Medium,
            sigma,
        })
    } else {
        Some(Classification {
            kind: AnomalyKind::SevereOutlier,
            severity: Severity::High,
            sigma,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> AnomalyThresholds {
        AnomalyThresholds::default()
    }

    // Variance of 1.0 makes sigma equal the raw innovation.
    #[test]
    fn exactly_at_the_outlier_boundary_is_not_flagged() {
        assert!(classify(2.5, 1.0, &thresholds()).is_none());
        assert!(classify(-2.5, 1.0, &thresholds()).is_none());
    }

    #[test]
    fn just_past_the_boundary_is_a_medium_outlier() {
        let c = classify(2.6, 1.0, &thresholds()).unwrap();
        assert_eq!(c.kind, AnomalyKind::MeasurementOutlier);
        assert_eq!(c.severity, Severity::Medium);
        assert!((c.sigma - 2.6).abs() < 1e-12);
    }

    #[test]
    fn boundary_between_medium_and_severe_is_at_four_sigma() {
        let medium = classify(4.0, 1.0, &thresholds()).unwrap();
        assert_eq!(medium.kind, AnomalyKind::MeasurementOutlier);

        let severe = classify(5.0, 1.0, &thresholds()).unwrap();
        assert_eq!(severe.kind, AnomalyKind::SevereOutlier);
        assert_eq!(severe.severity, Severity::High);
    }

    #[test]
    fn normalization_uses_predicted_variance() {
        // innovation 50 over std-dev sqrt(100) = 10 is 5 sigma.
        let c = classify(50.0, 100.0, &thresholds()).unwrap();
        assert_eq!(c.kind, AnomalyKind::SevereOutlier);
        assert!((c.sigma - 5.0).abs() < 1e-12);
    }

    #[test]
    fn unusable_variance_yields_no_classification() {
        assert!(classify(1000.0, 0.0, &thresholds()).is_none());
        assert!(classify(1000.0, -5.0, &thresholds()).is_none());
        assert!(classify(1000.0, f64::NAN, &thresholds()).is_none());
        assert!(classify(f64::NAN, 100.0, &thresholds()).is_none());
    }
}
