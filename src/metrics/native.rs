//! Native Prometheus Backend

use super::backend::{MetricsBackend, MetricsError};
use super::types::{BackendMode, Exposition, MetricKey, MetricName, LABEL_NAMES};
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};

/// Prometheus registry holding the request counters and latency histogram
pub struct PrometheusBackend {
    registry: Registry,
    requests_total: CounterVec,
    errors_total: CounterVec,
    request_latency_seconds: HistogramVec,
}

impl PrometheusBackend {
    /// Build a private registry and register all three series with it
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let requests_total = counter_vec(MetricName::RequestsTotal)?;
        let errors_total = counter_vec(MetricName::ErrorsTotal)?;
        let request_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                MetricName::RequestLatencySeconds.as_str(),
                MetricName::RequestLatencySeconds.help(),
            ),
            &LABEL_NAMES,
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;
        registry.register(Box::new(request_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            errors_total,
            request_latency_seconds,
        })
    }

    fn counter_for(&self, name: MetricName) -> Result<&CounterVec, MetricsError> {
        match name {
            MetricName::RequestsTotal => Ok(&self.requests_total),
            MetricName::ErrorsTotal => Ok(&self.errors_total),
            other => Err(MetricsError::UnknownMetric(other.to_string())),
        }
    }
}

fn counter_vec(name: MetricName) -> Result<CounterVec, MetricsError> {
    Ok(CounterVec::new(
        Opts::new(name.as_str(), name.help()),
        &LABEL_NAMES,
    )?)
}

impl MetricsBackend for PrometheusBackend {
    fn mode(&self) -> BackendMode {
        BackendMode::Native
    }

    fn inc_counter(&self, key: &MetricKey, amount: f64) -> Result<(), MetricsError> {
        let counter = self
            .counter_for(key.name())?
            .get_metric_with_label_values(&key.label_values())?;
        counter.inc_by(amount);
        Ok(())
    }

    fn observe(&self, key: &MetricKey, value: f64) -> Result<(), MetricsError> {
        if key.name() != MetricName::RequestLatencySeconds {
            return Err(MetricsError::UnknownMetric(key.name().to_string()));
        }
        self.request_latency_seconds
            .get_metric_with_label_values(&key.label_values())?
            .observe(value);
        Ok(())
    }

    fn render(&self) -> Result<Exposition, MetricsError> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| MetricsError::Encode(e.to_string()))?;

        Ok(Exposition::new(encoder.format_type(), buffer))
    }
}
