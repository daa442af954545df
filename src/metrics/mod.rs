//! Metrics Module
//!
//! Handles request metrics collection and exposition.

pub mod backend;
pub mod collector;
pub mod fallback;
#[cfg(feature = "native-metrics")]
pub mod native;
pub mod types;

pub use backend::{MetricsBackend, MetricsError};
pub use collector::Metrics;
pub use fallback::FallbackStore;
#[cfg(feature = "native-metrics")]
pub use native::PrometheusBackend;
pub use types::{
    BackendMode, Exposition, FallbackSnapshot, HistogramAggregate, MetricKey, MetricName,
    RecordOutcome,
};
