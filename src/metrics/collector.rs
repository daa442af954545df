//! Metrics Collector
//!
//! Records request counts, error counts and latencies keyed by
//! (route, method, status), and renders them for the `/metrics` endpoint.
//!
//! The backend is chosen once, at construction. When the native Prometheus
//! backend is compiled in, enabled and initializes cleanly, it receives every
//! observation; otherwise the in-memory [`FallbackStore`] does. A native
//! failure on an individual call is logged and that observation is written to
//! the fallback store instead, so nothing is lost and nothing reaches the
//! caller.

use super::backend::{MetricsBackend, MetricsError};
use super::fallback::FallbackStore;
use super::types::{
    BackendMode, Exposition, FallbackSnapshot, MetricKey, MetricName, RecordOutcome,
};
use crate::config::MetricsConfig;
use tracing::{error, info, warn};

/// Request metrics aggregator shared by every request handler
pub struct Metrics {
    native: Option<Box<dyn MetricsBackend>>,
    fallback: FallbackStore,
}

impl Metrics {
    /// Create a collector, using the native backend when it is available
    pub fn new() -> Self {
        Self::with_config(&MetricsConfig::default())
    }

    /// Create a collector honouring `metrics.native_backend`
    pub fn with_config(config: &MetricsConfig) -> Self {
        let native = if config.native_backend {
            match detect_native_backend() {
                Ok(backend) => {
                    info!("Prometheus metrics backend initialized");
                    Some(backend)
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        "Native metrics backend unavailable, using in-memory store"
                    );
                    None
                }
            }
        } else {
            info!("Native metrics backend disabled by configuration");
            None
        };

        Self {
            native,
            fallback: FallbackStore::new(),
        }
    }

    /// Create a collector that only ever uses the in-memory store
    pub fn fallback_only() -> Self {
        Self {
            native: None,
            fallback: FallbackStore::new(),
        }
    }

    /// Create a collector around an already constructed native backend
    pub fn with_backend(backend: Box<dyn MetricsBackend>) -> Self {
        Self {
            native: Some(backend),
            fallback: FallbackStore::new(),
        }
    }

    pub fn is_native_backend_available(&self) -> bool {
        self.mode() == BackendMode::Native
    }

    pub fn mode(&self) -> BackendMode {
        self.native
            .as_ref()
            .map_or(BackendMode::Fallback, |backend| backend.mode())
    }

    /// Add `amount` to `requests_total{route,method,status}`
    pub fn increment_requests(
        &self,
        route: &str,
        method: &str,
        status: &str,
        amount: f64,
    ) -> RecordOutcome {
        let key = MetricKey::new(MetricName::RequestsTotal, route, method, status);
        self.increment(&key, amount)
    }

    /// Add `amount` to `errors_total{route,method,status}`
    pub fn increment_errors(
        &self,
        route: &str,
        method: &str,
        status: &str,
        amount: f64,
    ) -> RecordOutcome {
        let key = MetricKey::new(MetricName::ErrorsTotal, route, method, status);
        self.increment(&key, amount)
    }

    /// Record one latency sample. `seconds` is not validated.
    pub fn observe_latency(
        &self,
        route: &str,
        method: &str,
        status: &str,
        seconds: f64,
    ) -> RecordOutcome {
        let key = MetricKey::new(MetricName::RequestLatencySeconds, route, method, status);

        if let Some(native) = &self.native {
            match native.observe(&key, seconds) {
                Ok(()) => return RecordOutcome::Native,
                Err(e) => {
                    error!(
                        error = %e,
                        metric = %key,
                        "Native histogram observe failed, using fallback store"
                    );
                }
            }
        }

        self.fallback.record(&key, seconds);
        RecordOutcome::Fallback
    }

    fn increment(&self, key: &MetricKey, amount: f64) -> RecordOutcome {
        if !amount.is_finite() || amount < 0.0 {
            warn!(
                metric = %key,
                amount = amount,
                "Dropping counter increment that is negative or not finite"
            );
            return RecordOutcome::Dropped;
        }

        if let Some(native) = &self.native {
            match native.inc_counter(key, amount) {
                Ok(()) => return RecordOutcome::Native,
                Err(e) => {
                    error!(
                        error = %e,
                        metric = %key,
                        "Native counter increment failed, using fallback store"
                    );
                }
            }
        }

        self.fallback.add(key, amount);
        RecordOutcome::Fallback
    }

    /// Render the current state for the `/metrics` endpoint. Never fails.
    pub fn render_exposition(&self) -> Exposition {
        if let Some(native) = &self.native {
            match native.render() {
                Ok(exposition) => return exposition,
                Err(e) => {
                    error!(error = %e, "Failed to render native metrics, falling back to JSON");
                }
            }
        }

        self.fallback.render_json()
    }

    /// Copy of the in-memory store.
    ///
    /// In native mode this only holds observations the native backend failed
    /// to record.
    pub fn snapshot(&self) -> FallbackSnapshot {
        self.fallback.snapshot()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("mode", &self.mode())
            .field("fallback_series", &self.fallback.series_count())
            .finish()
    }
}

#[cfg(feature = "native-metrics")]
fn detect_native_backend() -> Result<Box<dyn MetricsBackend>, MetricsError> {
    let backend = super::native::PrometheusBackend::new()?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "native-metrics"))]
fn detect_native_backend() -> Result<Box<dyn MetricsBackend>, MetricsError> {
    Err(MetricsError::Unavailable(
        "built without the native-metrics feature".to_string(),
    ))
}
