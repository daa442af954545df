//! Metrics Backend
//!
//! The contract shared by the native Prometheus adapter and the in-memory store.

use super::types::{BackendMode, Exposition, MetricKey};
use thiserror::Error;

/// Failure inside a metrics backend. Never surfaced past the aggregator.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[cfg(feature = "native-metrics")]
    #[error("prometheus: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("metric {0} is not registered with this backend")]
    UnknownMetric(String),

    #[error("failed to encode exposition: {0}")]
    Encode(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// A store for counter and histogram series
pub trait MetricsBackend: Send + Sync {
    /// Which mode this backend represents
    fn mode(&self) -> BackendMode;

    /// Add `amount` to the counter identified by `key`
    fn inc_counter(&self, key: &MetricKey, amount: f64) -> Result<(), MetricsError>;

    /// Record one sample into the histogram identified by `key`
    fn observe(&self, key: &MetricKey, value: f64) -> Result<(), MetricsError>;

    /// Render every series into an exposition payload
    fn render(&self) -> Result<Exposition, MetricsError>;
}
