//! Metricflow common types, keys, and errors.
//!
//! This crate provides foundational types shared across mf-core modules:
//! - Metric identity types (user + metric name keys)
//! - Persisted-record schema and versioning
//! - Common error types
//! - Output format specifications

pub mod error;
pub mod id;
pub mod output;
pub mod schema;

pub use error::{Error, Result};
pub use id::{EstimateId, MetricKey, UserId};
pub use output::OutputFormat;
pub use schema::{PersistedState, SCHEMA_VERSION};
