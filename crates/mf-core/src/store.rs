//! Persistence interface for per-key filter state and history.
//!
//! The real record store lives outside this crate; the engine only defines
//! the contract it needs: versioned reads, and an atomic all-or-nothing
//! commit of one processed batch (posterior state + estimate + forecasts +
//! anomalies) gated by an optimistic version check. Two concurrent
//! read-modify-write cycles on the same key cannot interleave: the loser's
//! commit fails with a conflict and is retried from a fresh read, never
//! blindly overwritten.
//!
//! [`MemoryStore`] is the in-process implementation backing tests and the
//! CLI. It persists the wire-shape [`PersistedState`] rather than the
//! runtime type, so every load/commit cycle exercises the exact round-trip
//! the real store would.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Mutex;

use mf_common::{Error, MetricKey, PersistedState, Result};

use crate::state::{Anomaly, Estimate, Forecast, MetricState};

/// A loaded state record with its version.
#[derive(Debug, Clone, PartialEq)]
pub struct StateRecord {
    pub state: MetricState,
    pub version: u64,
}

/// One atomic write: everything a processed batch produced.
///
/// `expected_version` is `None` when the key is being created; a conflict is
/// reported if the record appeared in the meantime.
#[derive(Debug)]
pub struct CommitRequest<'a> {
    pub key: &'a MetricKey,
    pub expected_version: Option<u64>,
    pub state: &'a MetricState,
    pub estimate: &'a Estimate,
    pub forecasts: &'a [Forecast],
    pub anomalies: &'a [Anomaly],
}

/// Contract the engine requires from the record store.
pub trait StateStore: Send + Sync {
    /// Load the current state record for a key, if the key exists.
    fn load_state(&self, key: &MetricKey) -> Result<Option<StateRecord>>;

    /// Atomically persist one processed batch. Returns the new version.
    ///
    /// Fails with [`Error::PersistenceConflict`] when `expected_version`
    /// does not match the stored version; in that case nothing is written.
    fn commit(&self, request: CommitRequest<'_>) -> Result<u64>;

    /// Most recent estimates, newest first.
    fn recent_estimates(&self, key: &MetricKey, limit: usize) -> Result<Vec<Estimate>>;

    /// Forecast curve from the most recent commit.
    fn recent_forecasts(&self, key: &MetricKey) -> Result<Vec<Forecast>>;

    /// Most recent anomalies, newest first.
    fn recent_anomalies(&self, key: &MetricKey, limit: usize) -> Result<Vec<Anomaly>>;
}

#[derive(Debug)]
struct Series {
    record: PersistedState,
    version: u64,
    estimates: Vec<Estimate>,
    forecasts: Vec<Forecast>,
    anomalies: Vec<Anomaly>,
}

impl Series {
    fn new(record: PersistedState) -> Self {
        Self {
            record,
            version: 1,
            estimates: Vec::new(),
            forecasts: Vec::new(),
            anomalies: Vec::new(),
        }
    }
}

/// Mutex-guarded in-memory store with per-key version counters.
#[derive(Debug, Default)]
pub struct MemoryStore {
    series: Mutex<HashMap<String, Series>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a key with an existing persisted record (e.g., one exported from
    /// another store). Returns the version assigned to it.
    pub fn seed_state(&self, key: &MetricKey, record: PersistedState) -> u64 {
        let mut series = self.series.lock().expect("store mutex poisoned");
        match series.entry(key.storage_key()) {
            Entry::Occupied(mut occupied) => {
                let s = occupied.get_mut();
                s.record = record;
                s.version += 1;
                s.version
            }
            Entry::Vacant(vacant) => vacant.insert(Series::new(record)).version,
        }
    }
}

impl StateStore for MemoryStore {
    fn load_state(&self, key: &MetricKey) -> Result<Option<StateRecord>> {
        let series = self.series.lock().expect("store mutex poisoned");
        Ok(series.get(&key.storage_key()).map(|s| StateRecord {
            state: MetricState::from_persisted(&s.record),
            version: s.version,
        }))
    }

    fn commit(&self, request: CommitRequest<'_>) -> Result<u64> {
        let mut series = self.series.lock().expect("store mutex poisoned");
        let storage_key = request.key.storage_key();
        let current_version = series.get(&storage_key).map(|s| s.version);

        match (request.expected_version, current_version) {
            (None, None) => {}
            (Some(expected), Some(actual)) if expected == actual => {}
            (expected, actual) => {
                return Err(Error::PersistenceConflict {
                    key: request.key.to_string(),
                    expected_version: expected.unwrap_or(0),
                    actual_version: actual.unwrap_or(0),
                });
            }
        }

        let entry = match series.entry(storage_key) {
            Entry::Occupied(occupied) => {
                let s = occupied.into_mut();
                s.record = request.state.to_persisted();
                s.version += 1;
                s
            }
            Entry::Vacant(vacant) => vacant.insert(Series::new(request.state.to_persisted())),
        };
        entry.estimates.push(request.estimate.clone());
        entry.forecasts = request.forecasts.to_vec();
        entry.anomalies.extend_from_slice(request.anomalies);
        Ok(entry.version)
    }

    fn recent_estimates(&self, key: &MetricKey, limit: usize) -> Result<Vec<Estimate>> {
        let series = self.series.lock().expect("store mutex poisoned");
        Ok(series
            .get(&key.storage_key())
            .map(|s| s.estimates.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn recent_forecasts(&self, key: &MetricKey) -> Result<Vec<Forecast>> {
        let series = self.series.lock().expect("store mutex poisoned");
        Ok(series
            .get(&key.storage_key())
            .map(|s| s.forecasts.clone())
            .unwrap_or_default())
    }

    fn recent_anomalies(&self, key: &MetricKey, limit: usize) -> Result<Vec<Anomaly>> {
        let series = self.series.lock().expect("store mutex poisoned");
        Ok(series
            .get(&key.storage_key())
            .map(|s| s.anomalies.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mf_common::EstimateId;
    use mf_config::FilterParams;

    use crate::state::ConfidenceInterval;

    fn key() -> MetricKey {
        MetricKey::new("u1", "revenue")
    }

    fn state() -> MetricState {
        MetricState::wide_prior(1000.0, &FilterParams::default(), Utc::now())
    }

    fn estimate() -> Estimate {
        Estimate {
            id: EstimateId::new(),
            estimated_value: 1000.0,
            trend: 0.0,
            confidence_interval_95: ConfidenceInterval::around(1000.0, 10.0),
            confidence_interval_68: ConfidenceInterval::around(1000.0, 5.0),
            innovation: 0.0,
            kalman_gain: [0.0, 0.0],
            signal_to_noise_ratio: 0.0,
            data_quality_score: 0.0,
            observation_count: 1,
            computed_at: Utc::now(),
        }
    }

    fn commit(store: &MemoryStore, expected_version: Option<u64>) -> Result<u64> {
        let k = key();
        let s = state();
        let e = estimate();
        store.commit(CommitRequest {
            key: &k,
            expected_version,
            state: &s,
            estimate: &e,
            forecasts: &[],
            anomalies: &[],
        })
    }

    #[test]
    fn create_then_update_bumps_version() {
        let store = MemoryStore::new();
        assert!(store.load_state(&key()).unwrap().is_none());

        let v1 = commit(&store, None).unwrap();
        assert_eq!(v1, 1);
        let v2 = commit(&store, Some(1)).unwrap();
        assert_eq!(v2, 2);

        let record = store.load_state(&key()).unwrap().unwrap();
        assert_eq!(record.version, 2);
    }

    #[test]
    fn stale_version_conflicts_and_writes_nothing() {
        let store = MemoryStore::new();
        commit(&store, None).unwrap();
        commit(&store, Some(1)).unwrap();

        let err = commit(&store, Some(1)).unwrap_err();
        assert!(matches!(
            err,
            Error::PersistenceConflict {
                expected_version: 1,
                actual_version: 2,
                ..
            }
        ));
        // The losing commit appended no estimate.
        assert_eq!(store.recent_estimates(&key(), 10).unwrap().len(), 2);
    }

    #[test]
    fn create_conflicts_when_record_already_exists() {
        let store = MemoryStore::new();
        commit(&store, None).unwrap();
        let err = commit(&store, None).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn load_round_trips_through_the_wire_shape() {
        let store = MemoryStore::new();
        let k = key();
        let s = state();
        let e = estimate();
        store
            .commit(CommitRequest {
                key: &k,
                expected_version: None,
                state: &s,
                estimate: &e,
                forecasts: &[],
                anomalies: &[],
            })
            .unwrap();

        let loaded = store.load_state(&k).unwrap().unwrap();
        assert_eq!(loaded.state, s);
    }

    #[test]
    fn seeded_state_is_loadable() {
        let store = MemoryStore::new();
        let s = state();
        let version = store.seed_state(&key(), s.to_persisted());
        assert_eq!(version, 1);
        let loaded = store.load_state(&key()).unwrap().unwrap();
        assert_eq!(loaded.state, s);
    }

    #[test]
    fn keys_are_independent() {
        let store = MemoryStore::new();
        commit(&store, None).unwrap();

        let other = MetricKey::new("u2", "revenue");
        assert!(store.load_state(&other).unwrap().is_none());
    }
}
