//! Metric and estimate identity types.
//!
//! A metric series is uniquely identified by the (user, metric name) pair.
//! Every processed batch also gets an `EstimateId` so an estimate in the
//! history can be tied back to the log lines that produced it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Owning user of a metric series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

/// Key for one persisted metric series: (user, metric name).
///
/// All filter state, estimates, forecasts, and anomalies are stored and
/// locked per key. Requests for different keys are fully independent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricKey {
    pub user: UserId,
    pub metric: String,
}

impl MetricKey {
    pub fn new(user: impl Into<String>, metric: impl Into<String>) -> Self {
        Self {
            user: UserId(user.into()),
            metric: metric.into(),
        }
    }

    /// Canonical storage-key string, `<user>:<metric>`.
    pub fn storage_key(&self) -> String {
        format!("{}:{}", self.user, self.metric)
    }

    /// Parse a `<user>:<metric>` string back into a key.
    pub fn parse(s: &str) -> Option<Self> {
        let (user, metric) = s.split_once(':')?;
        if user.is_empty() || metric.is_empty() {
            return None;
        }
        Some(Self::new(user, metric))
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user, self.metric)
    }
}

/// Identifier for one produced estimate (one per processed batch).
///
/// Format: `est-<date>-<time>-<random>`
/// Example: `est-20260825-143022-abc123`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EstimateId(pub String);

impl EstimateId {
    /// Generate a new estimate ID.
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        let random: String = uuid::Uuid::new_v4().to_string().chars().take(6).collect();
        EstimateId(format!("est-{}-{}", now.format("%Y%m%d-%H%M%S"), random))
    }

    /// Parse an existing estimate ID string.
    pub fn parse(s: &str) -> Option<Self> {
        if s.starts_with("est-") && s.len() > 20 {
            Some(EstimateId(s.to_string()))
        } else {
            None
        }
    }
}

impl Default for EstimateId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EstimateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
