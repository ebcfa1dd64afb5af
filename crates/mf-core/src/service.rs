//! Estimation service: the entry point external callers use.
//!
//! Each invocation is one read-modify-write over the persisted per-key
//! state: load (or initialize) the prior, fold the observation batch through
//! predict/update with anomaly classification, generate forecasts from the
//! posterior, and commit everything atomically under an optimistic version
//! check. A version conflict means another caller won the race for this key;
//! the whole computation is retried from a fresh read, up to a configured
//! bound. Nothing is persisted on any failure path.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use mf_common::{Error, EstimateId, MetricKey, Result};
use mf_config::EngineConfig;

use crate::state::{
    Anomaly, CalibrationReport, ConfidenceInterval, Estimate, Forecast, MetricState, Observation,
};
use crate::store::{CommitRequest, StateRecord, StateStore};
use crate::{anomaly, calibrate, filter, forecast};

/// How many historical records `get_state` and `calibrate` pull.
const HISTORY_WINDOW: usize = 50;

/// Result of one processed batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateResponse {
    pub estimate: Estimate,
    pub state: MetricState,
    pub forecasts: Vec<Forecast>,
    pub anomalies: Vec<Anomaly>,
    /// Observations skipped by the near-singular-S fallback (estimate
    /// unchanged for those, recorded here for observability).
    pub degraded_observations: usize,
    /// Version the posterior was committed at.
    pub version: u64,
}

/// Read-only view of a key's current state and recent history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub state: MetricState,
    pub version: u64,
    pub recent_estimates: Vec<Estimate>,
    pub recent_forecasts: Vec<Forecast>,
    pub recent_anomalies: Vec<Anomaly>,
}

/// Per-metric estimation service over a pluggable record store.
pub struct EstimationService<S: StateStore> {
    store: S,
    config: EngineConfig,
}

impl<S: StateStore> EstimationService<S> {
    /// Build a service. The configuration is validated here, before any
    /// request can touch state.
    pub fn new(store: S, config: EngineConfig) -> Result<Self> {
        mf_config::validate(&config)?;
        Ok(Self { store, config })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Process a batch of observations for one key and persist the result.
    ///
    /// `horizon` defaults to the configured forecast horizon. The batch is
    /// validated up front and rejected before any state is read; partial
    /// persistence cannot happen because the store commit is all-or-nothing.
    pub fn estimate(
        &self,
        key: &MetricKey,
        observations: &[Observation],
        horizon: Option<u32>,
    ) -> Result<EstimateResponse> {
        if observations.is_empty() {
            return Err(Error::EmptyBatch {
                key: key.to_string(),
            });
        }
        for obs in observations {
            obs.validate()?;
        }
        let horizon = horizon.unwrap_or(self.config.forecast.default_horizon);

        let mut attempt = 0;
        loop {
            match self.try_estimate(key, observations, horizon) {
                Err(err) if err.is_retryable() && attempt < self.config.max_commit_retries => {
                    attempt += 1;
                    debug!(%key, attempt, "commit conflict, retrying with fresh read");
                }
                Ok(response) => {
                    info!(
                        %key,
                        version = response.version,
                        observations = observations.len(),
                        anomalies = response.anomalies.len(),
                        "estimate committed"
                    );
                    return Ok(response);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Read-only snapshot of current state plus recent history. No mutation.
    pub fn get_state(&self, key: &MetricKey) -> Result<StateSnapshot> {
        let record = self.store.load_state(key)?.ok_or_else(|| Error::StateNotFound {
            key: key.to_string(),
        })?;
        Ok(StateSnapshot {
            state: record.state,
            version: record.version,
            recent_estimates: self.store.recent_estimates(key, HISTORY_WINDOW)?,
            recent_forecasts: self.store.recent_forecasts(key)?,
            recent_anomalies: self.store.recent_anomalies(key, HISTORY_WINDOW)?,
        })
    }

    /// Analyze noise calibration from the key's recent estimate history.
    pub fn calibrate(&self, key: &MetricKey) -> Result<CalibrationReport> {
        let estimates = self.store.recent_estimates(key, HISTORY_WINDOW)?;
        calibrate::analyze(&estimates, &self.config.calibration, &self.config.filter)
    }

    fn try_estimate(
        &self,
        key: &MetricKey,
        observations: &[Observation],
        horizon: u32,
    ) -> Result<EstimateResponse> {
        let prior = self.store.load_state(key)?;

        let (mut state, mut covariance, expected_version, remaining) = match prior {
            Some(StateRecord { state, version }) => (
                state.state,
                state.covariance,
                Some(version),
                observations,
            ),
            None => {
                // First observation for this key seeds the series.
                let first = &observations[0];
                debug!(%key, level = first.value, "initializing state with wide prior");
                let seeded =
                    MetricState::wide_prior(first.value, &self.config.filter, first.timestamp);
                (seeded.state, seeded.covariance, None, &observations[1..])
            }
        };

        let mut anomalies = Vec::new();
        let mut degraded = 0usize;
        let mut last_innovation = 0.0;
        let mut last_gain = [0.0, 0.0];

        // Sequential fold: each posterior is the next predict's prior.
        for obs in remaining {
            let pred = filter::predict(state, &covariance, &self.config.filter);
            let outcome = filter::update(obs.value, obs.confidence, &pred, &self.config.filter);

            if outcome.degenerate {
                degraded += 1;
                warn!(
                    %key,
                    source = %obs.source,
                    innovation_covariance = outcome.innovation_covariance,
                    "near-singular innovation covariance, observation ignored"
                );
            }
            if outcome.covariance_reset {
                warn!(%key, "posterior covariance reset to wide prior");
            }

            if let Some(c) =
                anomaly::classify(outcome.innovation, pred.covariance.m[0][0], &self.config.anomaly)
            {
                anomalies.push(Anomaly {
                    kind: c.kind,
                    severity: c.severity,
                    sigma: c.sigma,
                    innovation: outcome.innovation,
                    observed_value: obs.value,
                    source: obs.source.clone(),
                    timestamp: obs.timestamp,
                });
            }

            state = outcome.state;
            covariance = outcome.covariance;
            last_innovation = outcome.innovation;
            last_gain = outcome.gain;
        }

        let snr = filter::signal_to_noise(&self.config.filter, covariance.m[0][0]);
        let level_std = covariance.m[0][0].max(0.0).sqrt();
        let last_updated_at = observations
            .iter()
            .map(|o| o.timestamp)
            .max()
            .unwrap_or_else(Utc::now);

        let estimate = Estimate {
            id: EstimateId::new(),
            estimated_value: state[0],
            trend: state[1],
            confidence_interval_95: ConfidenceInterval::around(state[0], 1.96 * level_std),
            confidence_interval_68: ConfidenceInterval::around(state[0], level_std),
            innovation: last_innovation,
            kalman_gain: last_gain,
            signal_to_noise_ratio: snr,
            data_quality_score: filter::data_quality_score(snr),
            observation_count: observations.len(),
            computed_at: Utc::now(),
        };

        let forecasts = forecast::generate(
            state,
            &covariance,
            horizon,
            &self.config.forecast,
            &self.config.filter,
        );

        let posterior = MetricState {
            state,
            covariance,
            kalman_gain: last_gain,
            signal_to_noise_ratio: snr,
            last_updated_at,
        };

        let version = self.store.commit(CommitRequest {
            key,
            expected_version,
            state: &posterior,
            estimate: &estimate,
            forecasts: &forecasts,
            anomalies: &anomalies,
        })?;

        Ok(EstimateResponse {
            estimate,
            state: posterior,
            forecasts,
            anomalies,
            degraded_observations: degraded,
            version,
        })
    }
}
